use crate::constants::LINK_CLAMP;
use crate::data::{DataSplit, Dataset};
use crate::distribution::{AdaBoost, Bernoulli, Gamma, Gaussian, Laplace, Poisson, TDist};
use crate::tree::Tree;
use crate::utils::min_max;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The contract every loss family fulfils for the boosting loop.
///
/// `f` always holds one current prediction per row of the dataset, without
/// the offset. Only training rows are read unless a method says otherwise.
pub trait LossFunction: Send + Sync {
    /// Negative gradient of the loss, written into `z` for every training row.
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]);
    /// Constant prediction minimizing the loss over the training rows.
    fn init_f(&self, data: &Dataset) -> f64;
    /// Replace the mean-residual predictions of the terminal nodes with the
    /// loss-optimal constants. Returns how many predictions had to be capped.
    fn fit_best_constant(
        &self,
        data: &Dataset,
        f: &[f64],
        z: &[f64],
        node_assign: &[usize],
        tree: &mut Tree,
        min_obs_in_node: usize,
    ) -> usize;
    /// Weighted mean loss on the training or validation rows.
    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64;
    /// Loss reduction on the out-of-bag training rows from adding `shrinkage * fadj`.
    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64;
}

#[derive(Serialize, Deserialize, Clone, Default)]
pub enum Distribution {
    #[default]
    Gaussian,
    Bernoulli,
    Poisson,
    Laplace,
    TDist {
        nu: f64,
    },
    AdaBoost,
    Gamma,
    #[serde(skip)]
    Custom(Arc<dyn LossFunction>),
}

impl std::fmt::Debug for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Gaussian => write!(f, "Gaussian"),
            Distribution::Bernoulli => write!(f, "Bernoulli"),
            Distribution::Poisson => write!(f, "Poisson"),
            Distribution::Laplace => write!(f, "Laplace"),
            Distribution::TDist { nu } => write!(f, "TDist {{ nu: {} }}", nu),
            Distribution::AdaBoost => write!(f, "AdaBoost"),
            Distribution::Gamma => write!(f, "Gamma"),
            Distribution::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl Distribution {
    pub fn new_custom<T>(loss: T) -> Self
    where
        T: LossFunction + 'static,
    {
        Distribution::Custom(Arc::new(loss))
    }

    /// Build the loss function of this family.
    pub fn create(&self) -> Arc<dyn LossFunction> {
        match self {
            Distribution::Gaussian => Arc::new(Gaussian::default()),
            Distribution::Bernoulli => Arc::new(Bernoulli::default()),
            Distribution::Poisson => Arc::new(Poisson::default()),
            Distribution::Laplace => Arc::new(Laplace::default()),
            Distribution::TDist { nu } => Arc::new(TDist { nu: *nu }),
            Distribution::AdaBoost => Arc::new(AdaBoost::default()),
            Distribution::Gamma => Arc::new(Gamma::default()),
            Distribution::Custom(arc) => Arc::clone(arc),
        }
    }
}

/// Prediction plus offset of a row.
#[inline]
pub(crate) fn link(data: &Dataset, f: &[f64], row: usize) -> f64 {
    f[row] + data.offset_at(row)
}

/// `num / den`, or `0.0` when there is no weight to average over.
#[inline]
pub(crate) fn weighted_mean(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Training rows outside the bag.
pub(crate) fn out_of_bag<'a>(data: &'a Dataset<'a>) -> impl Iterator<Item = usize> + 'a {
    (0..data.n_train()).filter(|i| !data.in_bag(*i))
}

/// Residuals and weights of the bagged rows of each terminal node.
pub(crate) fn terminal_residuals(
    data: &Dataset,
    f: &[f64],
    node_assign: &[usize],
    n_terminal: usize,
) -> Vec<(Vec<f64>, Vec<f64>)> {
    let mut groups = vec![(Vec::new(), Vec::new()); n_terminal];
    let (y, w) = (data.y(), data.weights());
    for (row, node) in node_assign.iter().enumerate().take(data.n_train()) {
        if data.in_bag(row) {
            groups[*node].0.push(y[row] - link(data, f, row));
            groups[*node].1.push(w[row]);
        }
    }
    groups
}

/// Set each terminal prediction to `log(num / den)` for the log link families.
///
/// Nodes without response get `-LINK_CLAMP`, nodes without weight get `0.0`.
/// Predictions are clamped so that `F` stays within `LINK_CLAMP` of the range
/// of the current training predictions. Returns the number of clamped nodes.
pub(crate) fn set_log_ratio_predictions(
    tree: &mut Tree,
    f: &[f64],
    n_train: usize,
    num: &[f64],
    den: &[f64],
) -> usize {
    let (f_min, f_max) = min_max(&f[..n_train]).unwrap_or((0.0, 0.0));
    let (lower, upper) = (-LINK_CLAMP - f_min, LINK_CLAMP - f_max);
    let mut n_clamped = 0;
    for node in 0..num.len() {
        let mut prediction = if num[node] == 0.0 {
            -LINK_CLAMP
        } else if den[node] == 0.0 {
            0.0
        } else {
            (num[node] / den[node]).ln()
        };
        if prediction < lower {
            prediction = lower;
            n_clamped += 1;
        } else if prediction > upper {
            prediction = upper;
            n_clamped += 1;
        }
        tree.set_terminal_prediction(node, prediction);
    }
    n_clamped
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::data::Matrix;

    fn all_distributions() -> Vec<Distribution> {
        vec![
            Distribution::Gaussian,
            Distribution::Bernoulli,
            Distribution::Poisson,
            Distribution::Laplace,
            Distribution::TDist { nu: 4.0 },
            Distribution::AdaBoost,
            Distribution::Gamma,
        ]
    }

    #[test]
    fn test_init_f_is_minimal() {
        for dist in all_distributions() {
            let y: &[f64] = match dist {
                Distribution::Bernoulli | Distribution::AdaBoost => &[0., 1., 1., 1., 0., 1.],
                _ => YPOS,
            };
            let data = dataset(y);
            let loss = dist.create();
            let f0 = loss.init_f(&data);
            let d_init = loss.deviance(&data, &[f0; 6], DataSplit::Train);
            for shift in [-2.0, 2.0] {
                let d_off = loss.deviance(&data, &[f0 + shift; 6], DataSplit::Train);
                assert!(d_init <= d_off, "{:?}: {} > {}", dist, d_init, d_off);
            }
        }
    }

    #[test]
    fn test_boosting_step_improves_deviance() {
        for dist in all_distributions() {
            let y: &[f64] = match dist {
                Distribution::Bernoulli | Distribution::AdaBoost => Y01,
                _ => YPOS,
            };
            let data = dataset(y);
            let loss = dist.create();
            let f = vec![loss.init_f(&data); 6];
            let mut z = vec![0.0; 6];
            loss.compute_working_response(&data, &f, &mut z);
            let (mut tree, assign) = grown_tree(&data, &z);
            loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1);
            let mut fadj = vec![0.0; 6];
            tree.adjust(&assign, &mut fadj, 1).unwrap();
            let shrinkage = 0.1;
            let f_next: Vec<f64> = f.iter().zip(&fadj).map(|(a, b)| a + shrinkage * b).collect();
            let before = loss.deviance(&data, &f, DataSplit::Train);
            let after = loss.deviance(&data, &f_next, DataSplit::Train);
            assert!(after < before, "{:?}: {} >= {}", dist, after, before);
        }
    }

    #[test]
    fn test_bag_improvement_out_of_bag_only() {
        let y = YPOS;
        let mut data = dataset(y);
        data.set_bag(vec![true, false, true, false, true, false]).unwrap();
        let loss = Distribution::Gaussian.create();
        let f = vec![3.0; 6];
        // Moving towards y on out-of-bag rows only.
        let fadj: Vec<f64> = y.iter().map(|v| v - 3.0).collect();
        assert!(loss.bag_improvement(&data, &f, 0.5, &fadj) > 0.0);
        let zero = vec![0.0; 6];
        assert_eq!(loss.bag_improvement(&data, &f, 0.5, &zero), 0.0);
    }

    #[test]
    fn test_validation_deviance() {
        let x = [0., 1., 2., 3.];
        let y = [1., 1., 5., 5.];
        let data = Dataset::new(Matrix::new(&x, 4, 1), &y, 2, 1.0).unwrap();
        let loss = Distribution::Gaussian.create();
        let f = vec![1.0; 4];
        assert_eq!(loss.deviance(&data, &f, DataSplit::Train), 0.0);
        assert_eq!(loss.deviance(&data, &f, DataSplit::Validation), 16.0);
    }

    #[test]
    fn test_custom_distribution() {
        let custom = Distribution::new_custom(Gaussian::default());
        let data = dataset(YPOS);
        assert_eq!(custom.create().init_f(&data), 17.0 / 6.0);
        assert_eq!(format!("{:?}", custom), "Custom");
    }

    #[test]
    fn test_distribution_serde() {
        let d = Distribution::TDist { nu: 3.0 };
        let s = serde_json::to_string(&d).unwrap();
        let d2: Distribution = serde_json::from_str(&s).unwrap();
        assert!(matches!(d2, Distribution::TDist { nu } if nu == 3.0));
    }
}
