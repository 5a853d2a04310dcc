//! Gaussian (squared error) loss.
use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, weighted_mean, LossFunction};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Squared error loss, minimizes `(y - offset - f)²`.
pub struct Gaussian {}

impl LossFunction for Gaussian {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            z[i] = y[i] - link(data, f, i);
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let mut sum = 0.0;
        let mut total_weight = 0.0;
        for i in 0..data.n_train() {
            sum += w[i] * (y[i] - data.offset_at(i));
            total_weight += w[i];
        }
        weighted_mean(sum, total_weight)
    }

    fn fit_best_constant(
        &self,
        _data: &Dataset,
        _f: &[f64],
        _z: &[f64],
        _node_assign: &[usize],
        _tree: &mut Tree,
        _min_obs_in_node: usize,
    ) -> usize {
        // Terminal nodes already hold the mean residual.
        0
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            let r = y[i] - link(data, f, i);
            loss += w[i] * r * r;
            total_weight += w[i];
        }
        weighted_mean(loss, total_weight)
    }

    fn bag_improvement(&self, data: &Dataset, f: &[f64], shrinkage: f64, fadj: &[f64]) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut improvement, mut total_weight) = (0.0, 0.0);
        for i in out_of_bag(data) {
            let step = shrinkage * fadj[i];
            improvement += w[i] * step * (2.0 * (y[i] - link(data, f, i)) - step);
            total_weight += w[i];
        }
        weighted_mean(improvement, total_weight)
    }
}
