use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, set_log_ratio_predictions, weighted_mean, LossFunction};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Poisson deviance for counts, log link.
pub struct Poisson {}

impl LossFunction for Poisson {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            z[i] = y[i] - link(data, f, i).exp();
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut sum, mut denom) = (0.0, 0.0);
        for i in 0..data.n_train() {
            sum += w[i] * y[i];
            denom += w[i] * data.offset_at(i).exp();
        }
        (sum / denom).ln()
    }

    fn fit_best_constant(
        &self,
        data: &Dataset,
        f: &[f64],
        _z: &[f64],
        node_assign: &[usize],
        tree: &mut Tree,
        _min_obs_in_node: usize,
    ) -> usize {
        let n_terminal = tree.terminal_nodes().len();
        let mut num = vec![0.0; n_terminal];
        let mut den = vec![0.0; n_terminal];
        let (y, w) = (data.y(), data.weights());
        for i in 0..data.n_train() {
            if data.in_bag(i) {
                num[node_assign[i]] += w[i] * y[i];
                den[node_assign[i]] += w[i] * link(data, f, i).exp();
            }
        }
        set_log_ratio_predictions(tree, f, data.n_train(), &num, &den)
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            let v = link(data, f, i);
            loss += w[i] * (y[i] * v - v.exp());
            total_weight += w[i];
        }
        -2.0 * weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let v = link(data, f, i);
            let step = shrinkage * fadj[i];
            improvement += w[i] * (y[i] * step - (v + step).exp() + v.exp());
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
    fn test_poisson_init() {
        let data = dataset(YPOS);
        // mean count is 17 / 6
        let f0 = Poisson::default().init_f(&data);
        assert!((f0 - (17.0_f64 / 6.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_poisson_fit_best_constant() {
        let y = [0., 0., 0., 2., 2., 2.];
        let data = dataset(&y);
        let loss = Poisson::default();
        let f = vec![0.0; 6];
        let mut z = vec![0.0; 6];
        loss.compute_working_response(&data, &f, &mut z);
        let (mut tree, assign) = grown_tree(&data, &z);
        assert_eq!(loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1), 0);
        // No counts on the left gives the lowest allowed rate.
        assert_eq!(tree.terminal_node(0).prediction, -19.0);
        assert!((tree.terminal_node(1).prediction - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_poisson_clamps_to_link_range() {
        let y = [0., 0., 0., 2., 2., 2.];
        let data = dataset(&y);
        let loss = Poisson::default();
        let f = vec![0.0, 0.0, 0.0, 0.0, 0.0, 5.0];
        let mut z = vec![0.0; 6];
        loss.compute_working_response(&data, &vec![0.0; 6], &mut z);
        let (mut tree, assign) = grown_tree(&data, &z);
        assert_eq!(loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1), 0);
        // min F is 0 so -19 is still allowed, a wider spread would clamp.
        let f = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        assert_eq!(loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1), 0);
        let f = vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
        // The empty missing leaf is clamped along with the left one.
        assert_eq!(loss.fit_best_constant(&data, &f, &z, &assign, &mut tree, 1), 2);
        assert_eq!(tree.terminal_node(0).prediction, -18.0);
        assert_eq!(tree.terminal_node(2).prediction, -18.0);
    }
}
