use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, weighted_mean, LossFunction};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Exponential loss for 0/1 responses.
pub struct AdaBoost {}

/// Response recoded to `-1` or `+1`.
#[inline]
fn signed(y: f64) -> f64 {
    2.0 * y - 1.0
}

impl LossFunction for AdaBoost {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            let s = signed(y[i]);
            z[i] = s * (-s * link(data, f, i)).exp();
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut num, mut den) = (0.0, 0.0);
        for i in 0..data.n_train() {
            let o = data.offset_at(i);
            if y[i] == 1.0 {
                num += w[i] * (-o).exp();
            } else {
                den += w[i] * o.exp();
            }
        }
        0.5 * (num / den).ln()
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
                let s = signed(y[i]);
                let e = w[i] * (-s * link(data, f, i)).exp();
                num[node_assign[i]] += s * e;
                den[node_assign[i]] += e;
            }
        }
        for node in 0..n_terminal {
            let prediction = if den[node] == 0.0 { 0.0 } else { num[node] / den[node] };
            tree.set_terminal_prediction(node, prediction);
        }
        0
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            loss += w[i] * (-signed(y[i]) * link(data, f, i)).exp();
            total_weight += w[i];
        }
        weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let s = signed(y[i]);
            let v = link(data, f, i);
            improvement += w[i] * ((-s * v).exp() - (-s * (v + shrinkage * fadj[i])).exp());
            total_weight += w[i];
        }
        weighted_mean(improvement, total_weight)
    }
}
