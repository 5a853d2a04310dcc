//! Bernoulli (logistic) loss for 0/1 responses.
use crate::constants::{BERNOULLI_PRED_CAP, NEWTON_ITER_LIMIT, NEWTON_TOLERANCE};
use crate::data::{DataSplit, Dataset};
use crate::distribution::loss::{link, out_of_bag, weighted_mean, LossFunction};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Binomial deviance on the log-odds scale.
pub struct Bernoulli {}

#[inline]
fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

impl LossFunction for Bernoulli {
    fn compute_working_response(&self, data: &Dataset, f: &[f64], z: &mut [f64]) {
        let y = data.y();
        for i in 0..data.n_train() {
            z[i] = y[i] - sigmoid(link(data, f, i));
        }
    }

    fn init_f(&self, data: &Dataset) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let n = data.n_train();
        if data.offset().is_none() {
            let (mut sum, mut total) = (0.0, 0.0);
            for i in 0..n {
                sum += w[i] * y[i];
                total += w[i];
            }
            return (sum / (total - sum)).ln();
        }

        // Newton steps for F, usually converges in a handful of iterations.
        let mut init_f = 0.0;
        for _ in 0..NEWTON_ITER_LIMIT {
            let (mut num, mut den) = (0.0, 0.0);
            for i in 0..n {
                let p = sigmoid(data.offset_at(i) + init_f);
                num += w[i] * (y[i] - p);
                den += w[i] * p * (1.0 - p);
            }
            if den <= 0.0 {
                break;
            }
            let step = num / den;
            init_f += step;
            if step.abs() <= NEWTON_TOLERANCE {
                break;
            }
        }
        init_f
    }

    fn fit_best_constant(
        &self,
        data: &Dataset,
        _f: &[f64],
        z: &[f64],
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
                let node = node_assign[i];
                num[node] += w[i] * z[i];
                den[node] += w[i] * (y[i] - z[i]) * (1.0 - y[i] + z[i]);
            }
        }

        let mut n_capped = 0;
        for node in 0..n_terminal {
            let prediction = if den[node] == 0.0 {
                0.0
            } else {
                let step = num[node] / den[node];
                // Avoid large jumps on the log odds scale.
                if step.abs() > BERNOULLI_PRED_CAP {
                    n_capped += 1;
                    step.clamp(-BERNOULLI_PRED_CAP, BERNOULLI_PRED_CAP)
                } else {
                    step
                }
            };
            tree.set_terminal_prediction(node, prediction);
        }
        n_capped
    }

    fn deviance(&self, data: &Dataset, f: &[f64], split: DataSplit) -> f64 {
        let (y, w) = (data.y(), data.weights());
        let (mut loss, mut total_weight) = (0.0, 0.0);
        for i in data.view(split).rows() {
            let v = link(data, f, i);
            loss += w[i] * (y[i] * v - (1.0 + v.exp()).ln());
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
            if y[i] == 1.0 {
                improvement += w[i] * step;
            }
            improvement += w[i] * ((1.0 + v.exp()).ln() - (1.0 + (v + step).exp()).ln());
            total_weight += w[i];
        }
        weighted_mean(improvement, total_weight)
    }
}
