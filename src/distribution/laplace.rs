use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, terminal_residuals, weighted_mean, LossFunction};
use crate::tree::Tree;
use crate::utils::weighted_median;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Absolute error loss, terminal nodes predict the weighted median residual.
pub struct Laplace {}

impl LossFunction for Laplace {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            z[i] = if y[i] - link(data, f, i) > 0.0 { 1.0 } else { -1.0 };
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let n = data.n_train();
        let residuals: Vec<f64> = (0..n).map(|i| data.y()[i] - data.offset_at(i)).collect();
        weighted_median(&residuals, &data.weights()[..n]).unwrap_or(0.0)
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
            if let Some(median) = weighted_median(residuals, weights) {
                tree.set_terminal_prediction(node, median);
            }
        }
        0
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            loss += w[i] * (y[i] - link(data, f, i)).abs();
            total_weight += w[i];
        }
        weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let r = y[i] - link(data, f, i);
            improvement += w[i] * (r.abs() - (r - shrinkage * fadj[i]).abs());
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
    fn test_laplace_medians() {
        let data = dataset(YPOS);
        let loss = Laplace::default();
        assert_eq!(loss.init_f(&data), 2.0);
        let f = vec![0.0; 6];
        let mut z = vec![0.0; 6];
        loss.compute_working_response(&data, &f, &mut z);
        assert!(z.iter().all(|v| *v == 1.0));

        let z = vec![-1., -1., -1., 1., 1., 1.];
        let (mut tree, assign) = grown_tree(&data, &z);
        loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1);
        assert_eq!(tree.terminal_node(0).prediction, 1.0);
        assert_eq!(tree.terminal_node(1).prediction, 4.0);
    }

    #[test]
    fn test_laplace_small_nodes_keep_mean() {
        let data = dataset(YPOS);
        let loss = Laplace::default();
        let f = vec![0.0; 6];
        let z = vec![-1., -1., -1., 1., 1., 1.];
        let (mut tree, assign) = grown_tree(&data, &z);
        loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 4);
        assert_eq!(tree.terminal_node(0).prediction, -1.0);
        assert_eq!(tree.terminal_node(1).prediction, 1.0);
    }
}
