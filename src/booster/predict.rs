//! Prediction Methods
//!
//! Predictions of a fitted booster on the link scale, offsets excluded.
use crate::booster::GbmBooster;
use crate::data::Matrix;
use rayon::prelude::*;

impl GbmBooster {
    /// Generate predictions for the given data.
    ///
    /// * `data` - The feature matrix, missing values are NaN.
    /// * `parallel` - If `true`, predictions are computed in parallel using Rayon.
    ///
    /// Returns the initial value plus the shrunken prediction of every tree.
    /// Callers fitting with an offset add it themselves.
    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Vec<f64> {
        let mut init_preds = vec![self.init_f; data.rows];
        self.trees.iter().for_each(|tree| {
            for (p_, val) in init_preds.iter_mut().zip(tree.predict(data, parallel)) {
                *p_ += val;
            }
        });
        init_preds
    }

    /// Predictions after each of the first `n_trees` trees, one vector per
    /// stage, for picking the number of trees after the fit.
    pub fn predict_staged(&self, data: &Matrix<f64>, n_trees: usize, parallel: bool) -> Vec<Vec<f64>> {
        let mut current = vec![self.init_f; data.rows];
        self.trees
            .iter()
            .take(n_trees)
            .map(|tree| {
                for (p_, val) in current.iter_mut().zip(tree.predict(data, parallel)) {
                    *p_ += val;
                }
                current.clone()
            })
            .collect()
    }

    /// Prediction for a single row given as a slice of feature values.
    ///
    /// Columns past the end of `row` are treated as missing.
    pub fn predict_row_from_row_slice(&self, row: &[f64]) -> f64 {
        self.init_f + self.trees.iter().map(|t| t.predict_row_from_row_slice(row)).sum::<f64>()
    }

    /// Predictions for many rows given as slices, scored in parallel.
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|r| self.predict_row_from_row_slice(r)).collect()
    }
}
