use crate::booster::config::*;
use crate::constraints::constraints_from_map;
use crate::data::{DataSplit, Dataset};
use crate::distribution::Distribution;
use crate::errors::GbmError;
use crate::sampler::{BagSampler, Sampler};
use crate::tree::{FlatTree, Tree};
use hashbrown::HashMap;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Per-tree record of the fit, one entry per tree in each vector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Deviance of the training rows after adding each tree.
    pub train_deviance: Vec<f64>,
    /// Deviance of the validation rows after adding each tree, `0.0` without validation rows.
    pub valid_deviance: Vec<f64>,
    /// Loss reduction of the out-of-bag rows from each tree.
    pub oob_improvement: Vec<f64>,
}

impl TrainingHistory {
    fn clear(&mut self) {
        self.train_deviance.clear();
        self.valid_deviance.clear();
        self.oob_improvement.clear();
    }
}

/// Gradient boosting machine
#[derive(Clone, Serialize, Deserialize)]
pub struct GbmBooster {
    pub cfg: BoosterConfig,
    pub init_f: f64,
    pub trees: Vec<Tree>,
    pub history: TrainingHistory,
    /// Variable class of every column seen at fit time.
    pub var_classes: Vec<usize>,
}

impl Default for GbmBooster {
    fn default() -> Self {
        GbmBooster {
            cfg: BoosterConfig::default(),
            init_f: 0.0,
            trees: Vec::new(),
            history: TrainingHistory::default(),
            var_classes: Vec::new(),
        }
    }
}

impl BoosterIO for GbmBooster {}

impl GbmBooster {
    /// Gradient boosting machine
    ///
    /// * `distribution` - Loss family to optimize.
    /// * `n_trees` - Number of trees to fit.
    /// * `shrinkage` - Learning rate applied to every tree.
    /// * `interaction_depth` - Number of splits in each tree.
    /// * `min_obs_in_node` - Smallest number of bagged rows in a left or right child.
    /// * `bag_fraction` - Fraction of the training rows drawn for each tree.
    /// * `seed` - Integer value used to seed any randomness used in the algorithm.
    pub fn new(
        distribution: Distribution,
        n_trees: usize,
        shrinkage: f64,
        interaction_depth: usize,
        min_obs_in_node: usize,
        bag_fraction: f64,
        seed: u64,
    ) -> Result<Self, GbmError> {
        let cfg = BoosterConfig {
            distribution,
            n_trees,
            shrinkage,
            interaction_depth,
            min_obs_in_node,
            bag_fraction,
            seed,
            ..Default::default()
        };
        cfg.validate()?;
        Ok(GbmBooster {
            cfg,
            ..Default::default()
        })
    }

    /// Fit the booster, replacing any trees from an earlier fit.
    ///
    /// Rows of `data` past its training rows are scored after every tree
    /// and recorded in the validation deviance.
    pub fn fit(&mut self, data: &mut Dataset) -> Result<(), GbmError> {
        self.cfg.validate()?;
        data.set_bag_fraction(self.cfg.bag_fraction)?;
        if let Some(map) = &self.cfg.monotone_constraints {
            data.set_monotone(constraints_from_map(map, data.n_cols()))?;
        }

        let loss = self.cfg.distribution.create();
        let mut rng = StdRng::seed_from_u64(self.cfg.seed);
        let (n_rows, n_train) = (data.n_rows(), data.n_train());
        let shrinkage = self.cfg.shrinkage;
        let min_obs = self.cfg.min_obs_in_node;

        self.trees.clear();
        self.history.clear();
        self.var_classes = data.var_classes().to_vec();
        self.init_f = loss.init_f(data);

        let mut f = vec![self.init_f; n_rows];
        let mut z = vec![0.0; n_train];
        let mut node_assign = vec![0; n_train];
        let mut fadj = vec![0.0; n_rows];
        let mut sampler = BagSampler::new(data.total_in_bag());
        let mut n_capped = 0;

        for i in 0..self.cfg.n_trees {
            sampler.sample(&mut rng, data.bag_mut());
            loss.compute_working_response(data, &f, &mut z);

            let mut tree = Tree::new(self.cfg.interaction_depth, shrinkage);
            tree.grow(&z, data, min_obs, self.cfg.max_categories, &mut node_assign, &mut rng)?;
            n_capped += loss.fit_best_constant(data, &f, &z, &node_assign, &mut tree, min_obs);
            tree.adjust(&node_assign, &mut fadj[..n_train], min_obs)?;

            let oob_improvement = loss.bag_improvement(data, &f, shrinkage, &fadj);
            for (f_, adj) in f.iter_mut().zip(fadj.iter()).take(n_train) {
                *f_ += shrinkage * adj;
            }
            let train_deviance = loss.deviance(data, &f, DataSplit::Train);

            tree.predict_validation(data, &mut fadj)?;
            for row in data.view(DataSplit::Validation).rows() {
                f[row] += fadj[row];
            }
            let valid_deviance = loss.deviance(data, &f, DataSplit::Validation);

            if self.cfg.log_iterations > 0 && i % self.cfg.log_iterations == 0 {
                info!(
                    "round {:0>3}, train deviance: {:.6}, valid deviance: {:.6}, oob improvement: {:.6}",
                    i, train_deviance, valid_deviance, oob_improvement
                );
            }
            self.history.train_deviance.push(train_deviance);
            self.history.valid_deviance.push(valid_deviance);
            self.history.oob_improvement.push(oob_improvement);
            self.trees.push(tree);
        }

        if n_capped > 0 {
            warn!(
                "{} terminal node predictions were capped, the response may be poorly scaled for {:?}.",
                n_capped, self.cfg.distribution
            );
        }
        if self.cfg.log_iterations > 0 {
            info!(
                "Finished training a booster with {} trees, train deviance {:.6}.",
                self.trees.len(),
                self.history.train_deviance.last().copied().unwrap_or(f64::NAN)
            );
        }
        Ok(())
    }

    /// Sum of the split improvements of each variable over all trees.
    ///
    /// * `normalize` - Scale the importances to sum to 100.
    pub fn feature_importance(&self, normalize: bool) -> Result<HashMap<usize, f64>, GbmError> {
        let mut totals = vec![0.0; self.var_classes.len()];
        for tree in self.trees.iter() {
            tree.accumulate_variable_importance(&mut totals)?;
        }
        let scale = if normalize {
            let total: f64 = totals.iter().sum();
            if total > 0.0 {
                100.0 / total
            } else {
                0.0
            }
        } else {
            1.0
        };
        Ok(totals
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .map(|(k, v)| (k, v * scale))
            .collect())
    }

    /// Flat form of every tree, and the categorical split table shared by all of them.
    pub fn export_trees(&self) -> Result<(Vec<FlatTree>, Vec<Vec<i32>>), GbmError> {
        let mut split_codes = Vec::new();
        let flat = self
            .trees
            .iter()
            .map(|tree| tree.export_flat(&self.var_classes, &mut split_codes, 0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((flat, split_codes))
    }
}
