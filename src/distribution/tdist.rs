use crate::constants::{LOCATION_M_ITER_LIMIT, MAD_SCALE, NEWTON_TOLERANCE, SCALE_EPS};
use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, terminal_residuals, weighted_mean, LossFunction};
use crate::tree::Tree;
use crate::utils::weighted_median;
use serde::{Deserialize, Serialize};

/// Student t loss with `nu` degrees of freedom, robust to heavy tailed noise.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TDist {
    pub nu: f64,
}

impl Default for TDist {
    fn default() -> Self {
        TDist { nu: 4.0 }
    }
}

impl TDist {
    pub fn new(nu: f64) -> Self {
        TDist { nu }
    }

    /// Location M-estimate of `v` under t weights, started from the weighted
    /// median and refined by iteratively reweighted means.
    pub fn location_m(&self, v: &[f64], w: &[f64]) -> Option<f64> {
        let mut beta = weighted_median(v, w)?;
        let deviations: Vec<f64> = v.iter().map(|x| (x - beta).abs()).collect();
        let scale = (MAD_SCALE * weighted_median(&deviations, w)?).max(SCALE_EPS);

        for _ in 0..LOCATION_M_ITER_LIMIT {
            let (mut num, mut den) = (0.0, 0.0);
            for (x, wi) in v.iter().zip(w) {
                let r = (x - beta) / scale;
                let psi = wi / (self.nu + r * r);
                num += psi * x;
                den += psi;
            }
            if den <= 0.0 {
                break;
            }
            let next = num / den;
            let delta = (next - beta).abs();
            beta = next;
            if delta <= NEWTON_TOLERANCE {
                break;
            }
        }
        Some(beta)
    }
}

impl LossFunction for TDist {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            let u = y[i] - link(data, f, i);
            z[i] = 2.0 * u / (self.nu + u * u);
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let n = data.n_train();
        let residuals: Vec<f64> = (0..n).map(|i| data.y()[i] - data.offset_at(i)).collect();
        self.location_m(&residuals, &data.weights()[..n]).unwrap_or(0.0)
    }

    fn fit_best_constant(
        &self,
        data: &Dataset,
        f: &[f64],
        _z: &[f64],
        node_assign: &[usize],
        tree: &mut Tree,
        min_obs_in_node: usize,
    ) -> usize {
        let n_terminal = tree.terminal_nodes().len();
        let groups = terminal_residuals(data, f, node_assign, n_terminal);
        for (node, (residuals, weights)) in groups.iter().enumerate() {
            if tree.terminal_node(node).count < min_obs_in_node {
                continue;
            }
            if let Some(location) = self.location_m(residuals, weights) {
                tree.set_terminal_prediction(node, location);
            }
        }
        0
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            let u = y[i] - link(data, f, i);
            loss += w[i] * (self.nu + u * u).ln();
            total_weight += w[i];
        }
        weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let u = y[i] - link(data, f, i);
            let v = u - shrinkage * fadj[i];
            improvement += w[i] * ((self.nu + u * u).ln() - (self.nu + v * v).ln());
            total_weight += w[i];
        }
        weighted_mean(improvement, total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::loss::test_support::*;

    #[test]
    fn test_location_m_is_robust() {
        let t = TDist::new(4.0);
        let v = [1., 2., 3., 4., 100.];
        let w = [1.0; 5];
        let loc = t.location_m(&v, &w).unwrap();
        assert!(loc > 2.0 && loc < 4.0, "{}", loc);
        assert_eq!(t.location_m(&[], &[]), None);
        // Constant input stays put.
        assert_eq!(t.location_m(&[3., 3., 3.], &[1., 2., 1.]), Some(3.0));
    }

    #[test]
    fn test_tdist_working_response() {
        let data = dataset(YPOS);
        let t = TDist::new(2.0);
        let mut z = vec![0.0; 6];
        t.compute_working_response(&data, &[2.0; 6], &mut z);
        assert_eq!(z, vec![-2.0 / 3.0, 0.0, -2.0 / 3.0, 4.0 / 6.0, 6.0 / 11.0, 4.0 / 6.0]);
    }

    #[test]
    fn test_tdist_fit_best_constant() {
        let data = dataset(YPOS);
        let t = TDist::default();
        let f = vec![0.0; 6];
        let z = vec![-1., -1., -1., 1., 1., 1.];
        let (mut tree, assign) = grown_tree(&data, &z);
        assert_eq!(t.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1), 0);
        let left = tree.terminal_node(0).prediction;
        let right = tree.terminal_node(1).prediction;
        assert!(left >= 1.0 && left <= 2.0);
        assert!(right >= 4.0 && right <= 5.0);
    }
}
