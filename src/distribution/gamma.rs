use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, set_log_ratio_predictions, weighted_mean, LossFunction};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Gamma deviance for positive responses, log link.
pub struct Gamma {}

impl LossFunction for Gamma {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            z[i] = y[i] * (-link(data, f, i)).exp() - 1.0;
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut sum, mut total_weight) = (0.0, 0.0);
        for i in 0..data.n_train() {
            sum += w[i] * y[i] * (-data.offset_at(i)).exp();
            total_weight += w[i];
        }
        (sum / total_weight).ln()
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
                num[node_assign[i]] += w[i] * y[i] * (-link(data, f, i)).exp();
                den[node_assign[i]] += w[i];
            }
        }
        set_log_ratio_predictions(tree, f, data.n_train(), &num, &den)
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            let v = link(data, f, i);
            loss += w[i] * (y[i] * (-v).exp() + v);
            total_weight += w[i];
        }
        2.0 * weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let v = link(data, f, i);
            let step = shrinkage * fadj[i];
            improvement += w[i] * (y[i] * ((-v).exp() - (-(v + step)).exp()) - step);
            total_weight += w[i];
        }
        weighted_mean(improvement, total_weight)
    }
}
