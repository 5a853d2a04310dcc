use crate::booster::GbmBooster;
use crate::constraints::ConstraintMap;
use crate::distribution::Distribution;

impl GbmBooster {
    // Set methods for paramters

    /// Set the distribution on the booster.
    /// * `distribution` - The loss family of the booster.
    pub fn set_distribution(mut self, distribution: Distribution) -> Self {
        self.cfg.distribution = distribution;
        self
    }

    /// Set the number of trees on the booster.
    /// * `n_trees` - Number of trees to fit.
    pub fn set_n_trees(mut self, n_trees: usize) -> Self {
        self.cfg.n_trees = n_trees;
        self
    }

    /// Set the shrinkage on the booster.
    /// * `shrinkage` - Learning rate, smaller values need more trees.
    pub fn set_shrinkage(mut self, shrinkage: f64) -> Self {
        self.cfg.shrinkage = shrinkage;
        self
    }

    /// Set the interaction depth on the booster.
    /// * `interaction_depth` - Number of splits in each tree.
    pub fn set_interaction_depth(mut self, interaction_depth: usize) -> Self {
        self.cfg.interaction_depth = interaction_depth;
        self
    }

    /// Set the minimum node size on the booster.
    /// * `min_obs_in_node` - Smallest number of bagged rows in a left or right child.
    pub fn set_min_obs_in_node(mut self, min_obs_in_node: usize) -> Self {
        self.cfg.min_obs_in_node = min_obs_in_node;
        self
    }

    /// Set the bag fraction on the booster.
    /// * `bag_fraction` - Fraction of the training rows drawn for each tree.
    pub fn set_bag_fraction(mut self, bag_fraction: f64) -> Self {
        self.cfg.bag_fraction = bag_fraction;
        self
    }

    /// Set the monotone_constraints on the booster.
    /// * `monotone_constraints` - The monotone constraints of the booster, applied to the dataset at fit time.
    pub fn set_monotone_constraints(mut self, monotone_constraints: Option<ConstraintMap>) -> Self {
        self.cfg.monotone_constraints = monotone_constraints;
        self
    }

    /// Set the categorical capacity on the booster.
    /// * `max_categories` - Largest number of levels accepted for a categorical variable.
    pub fn set_max_categories(mut self, max_categories: usize) -> Self {
        self.cfg.max_categories = max_categories;
        self
    }

    /// Set the seed on the booster.
    /// * `seed` - Integer value used to seed any randomness used in the algorithm.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the log iterations on the booster.
    /// * `log_iterations` - Log training progress every N trees, `0` for none.
    pub fn set_log_iterations(mut self, log_iterations: usize) -> Self {
        self.cfg.log_iterations = log_iterations;
        self
    }
}
