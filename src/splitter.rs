//! Splitter
//!
//! Incremental, exact split search for one terminal node. Observations of a
//! variable are streamed in presorted order, every distinct threshold is
//! scored as it goes by, and the best split over all variables is kept.
use crate::categorical::CategoricalGrouping;
use crate::constraints::Constraint;
use crate::errors::GbmError;
use crate::split::{PartitionStats, SplitCandidate};
use crate::utils::is_missing;

pub struct NodeSplitSearch {
    node: PartitionStats,
    noise_floor: f64,
    proposed: SplitCandidate,
    best: SplitCandidate,
    groups: CategoricalGrouping,
    last_x: f64,
    seen_value: bool,
    n_incorporated: usize,
    best_from_current: bool,
    min_obs_in_node: usize,
    max_categories: usize,
}

impl NodeSplitSearch {
    /// Create a new split search.
    ///
    /// * `min_obs_in_node` - Minimum observation count of the left and right children.
    /// * `max_categories` - Largest number of levels accepted for a categorical variable.
    pub fn new(min_obs_in_node: usize, max_categories: usize) -> Self {
        NodeSplitSearch {
            node: PartitionStats::default(),
            noise_floor: 0.0,
            proposed: SplitCandidate::default(),
            best: SplitCandidate::default(),
            groups: CategoricalGrouping::default(),
            last_x: f64::NEG_INFINITY,
            seen_value: false,
            n_incorporated: 0,
            best_from_current: false,
            min_obs_in_node,
            max_categories,
        }
    }

    /// Start searching a node. Discards any previous best split.
    pub fn begin_node(&mut self, node: PartitionStats) {
        self.node = node;
        self.noise_floor = noise_floor(&node);
        self.best = SplitCandidate::new(node, 0, 0);
        self.proposed = SplitCandidate::new(node, 0, 0);
        self.best_from_current = false;
    }

    /// Start a new variable, `var_class == 0` for continuous, otherwise the number of levels.
    pub fn begin_variable(&mut self, split_var: usize, var_class: usize) -> Result<(), GbmError> {
        if var_class > self.max_categories {
            return Err(GbmError::InvalidArgument(format!(
                "variable {} has {} classes, at most {} are supported",
                split_var, var_class, self.max_categories
            )));
        }
        self.proposed = SplitCandidate::new(self.node, split_var, var_class);
        self.groups.reset(var_class);
        self.last_x = f64::NEG_INFINITY;
        self.seen_value = false;
        self.n_incorporated = 0;
        self.best_from_current = false;
        Ok(())
    }

    /// Add one observation of the current variable.
    ///
    /// Continuous variables must arrive with missing values first, then in
    /// ascending order of `x`. Each new distinct value scores the split at the
    /// midpoint to the previous value before the observation moves left.
    pub fn incorporate(&mut self, x: f64, z: f64, w: f64, monotone: Constraint) -> Result<(), GbmError> {
        self.n_incorporated += 1;
        if is_missing(&x) {
            if self.seen_value && !self.proposed.is_categorical() {
                return Err(GbmError::DataIntegrity(format!(
                    "missing value of variable {} arrived after non-missing values",
                    self.proposed.split_var
                )));
            }
            self.proposed.move_to_missing(w * z, w, 1);
        } else if !self.proposed.is_categorical() {
            if self.last_x > x {
                return Err(GbmError::DataIntegrity(
                    "Observations are not in order. Unable to build an index for the design matrix.".to_string(),
                ));
            }
            self.seen_value = true;
            self.proposed.split_value = 0.5 * (self.last_x + x);
            if self.last_x != x
                && self.proposed.has_min_obs(self.min_obs_in_node)
                && self.proposed.is_monotone(monotone.direction())
            {
                let improvement = self.proposed.compute_improvement();
                if self.beats_best(improvement) {
                    self.commit_proposed();
                }
            }
            self.proposed.move_to_left(w * z, w, 1);
            self.last_x = x;
        } else {
            let n_levels = self.proposed.var_class;
            if x < 0.0 || x.fract() != 0.0 || x >= n_levels as f64 {
                return Err(GbmError::DataIntegrity(format!(
                    "category {} of variable {} is outside 0..{}",
                    x, self.proposed.split_var, n_levels
                )));
            }
            self.seen_value = true;
            self.groups.accumulate(x as usize, w * z, w);
        }
        Ok(())
    }

    /// Search the nested category groupings of the current categorical variable.
    pub fn evaluate_categorical_split(&mut self) -> Result<(), GbmError> {
        if !self.proposed.is_categorical() {
            return Err(GbmError::InvalidArgument(format!(
                "variable {} is not categorical",
                self.proposed.split_var
            )));
        }
        if self.n_incorporated == 0 {
            return Err(GbmError::InvalidArgument(format!(
                "no observations incorporated for categorical variable {}",
                self.proposed.split_var
            )));
        }
        let n_finite = self.groups.rank();
        for i in 0..n_finite.saturating_sub(1) {
            let cat = self.groups.ranked_category(i);
            let stats = self.groups.stats(cat);
            self.proposed.split_value = i as f64;
            self.proposed
                .move_to_left(stats.sum_residual, stats.weight, stats.count);
            let improvement = self.proposed.compute_improvement();
            if self.proposed.has_min_obs(self.min_obs_in_node) && self.beats_best(improvement) {
                self.commit_proposed();
                self.best.left_categories = self.groups.left_categories(i);
            }
        }
        Ok(())
    }

    /// Settle the missing partition of the best split if it came from the current variable.
    ///
    /// With no missing observations the missing partition takes the node's
    /// statistics with a count of zero.
    pub fn finish_variable(&mut self) {
        if !self.best_from_current {
            return;
        }
        self.best.missing = if self.proposed.missing.count > 0 {
            self.proposed.missing
        } else {
            PartitionStats::new(self.node.sum_residual, self.node.weight, 0)
        };
        self.best_from_current = false;
    }

    pub fn best_split(&self) -> &SplitCandidate {
        &self.best
    }

    pub fn best_improvement(&self) -> f64 {
        self.best.improvement
    }

    pub fn node(&self) -> PartitionStats {
        self.node
    }

    /// Whether any observation reached the search since the last `begin_variable`.
    pub fn has_observations(&self) -> bool {
        self.n_incorporated > 0
    }

    pub(crate) fn proposed(&self) -> &SplitCandidate {
        &self.proposed
    }

    #[inline]
    fn beats_best(&self, improvement: f64) -> bool {
        improvement > self.noise_floor && improvement > self.best.improvement
    }

    fn commit_proposed(&mut self) {
        self.best = self.proposed.clone();
        self.best.left_categories.clear();
        self.best_from_current = true;
    }
}

/// Largest improvement explained by rounding in the node's running sums.
///
/// The partition means of a node carry a relative error of about
/// `count * EPSILON`, so two means that agree up to that error are equal.
fn noise_floor(node: &PartitionStats) -> f64 {
    if node.weight <= 0.0 {
        return 0.0;
    }
    let spread = 4.0 * node.count as f64 * f64::EPSILON * node.mean();
    node.weight * spread * spread
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn node_of(z: &[f64], w: &[f64]) -> PartitionStats {
        PartitionStats::new(
            z.iter().zip(w).map(|(a, b)| a * b).sum(),
            w.iter().sum(),
            z.len(),
        )
    }

    fn search_continuous(x: &[f64], z: &[f64], w: &[f64], min_obs: usize, monotone: Constraint) -> NodeSplitSearch {
        let mut s = NodeSplitSearch::new(min_obs, 1024);
        s.begin_node(node_of(z, w));
        s.begin_variable(0, 0).unwrap();
        for i in 0..x.len() {
            s.incorporate(x[i], z[i], w[i], monotone).unwrap();
        }
        s.finish_variable();
        s
    }

    #[test]
    fn test_perfect_split() {
        let s = search_continuous(
            &[0., 1., 2., 3.],
            &[0., 0., 1., 1.],
            &[1.; 4],
            1,
            Constraint::Unconstrained,
        );
        let best = s.best_split();
        assert_eq!(best.split_value, 1.5);
        assert_eq!(best.left.mean(), 0.0);
        assert_eq!(best.right.mean(), 1.0);
        assert!(best.improvement > 0.0);
        // No missing rows, missing takes the node statistics.
        assert_eq!(best.missing, PartitionStats::new(2.0, 4.0, 0));
    }

    #[test]
    fn test_ties_are_not_split() {
        let s = search_continuous(
            &[1., 1., 1., 1.],
            &[0., 1., 0., 1.],
            &[1.; 4],
            1,
            Constraint::Unconstrained,
        );
        assert_eq!(s.best_improvement(), 0.0);
    }

    #[test]
    fn test_constant_response_is_not_split() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let s = search_continuous(&x, &[0.7; 20], &[1.; 20], 1, Constraint::Unconstrained);
        assert_eq!(s.best_improvement(), 0.0);
    }

    #[test]
    fn test_zero_weight_missing_row() {
        let x = [f64::NAN, 0., 1., 2., 3.];
        let z = [0., 0., 0., 1., 1.];
        let w = [0., 1., 1., 1., 1.];
        let s = search_continuous(&x, &z, &w, 1, Constraint::Unconstrained);
        let best = s.best_split();
        assert_eq!(best.split_value, 1.5);
        assert_eq!(best.improvement, 1.0);
        assert_eq!(best.missing, PartitionStats::new(0.0, 0.0, 1));
    }

    #[test]
    fn test_out_of_order_is_fatal() {
        let mut s = NodeSplitSearch::new(1, 1024);
        s.begin_node(PartitionStats::new(0.0, 2.0, 2));
        s.begin_variable(0, 0).unwrap();
        s.incorporate(2.0, 0.0, 1.0, Constraint::Unconstrained).unwrap();
        let err = s.incorporate(1.0, 0.0, 1.0, Constraint::Unconstrained);
        assert!(matches!(err, Err(GbmError::DataIntegrity(_))));
    }

    #[test]
    fn test_missing_after_values_is_fatal() {
        let mut s = NodeSplitSearch::new(1, 1024);
        s.begin_node(PartitionStats::new(0.0, 2.0, 2));
        s.begin_variable(0, 0).unwrap();
        s.incorporate(2.0, 0.0, 1.0, Constraint::Unconstrained).unwrap();
        let err = s.incorporate(f64::NAN, 0.0, 1.0, Constraint::Unconstrained);
        assert!(matches!(err, Err(GbmError::DataIntegrity(_))));
    }

    #[test]
    fn test_missing_partition() {
        let x = [f64::NAN, f64::NAN, 0., 1., 2., 3.];
        let z = [5., 5., 0., 0., 1., 1.];
        let s = search_continuous(&x, &z, &[1.; 6], 1, Constraint::Unconstrained);
        let best = s.best_split();
        assert_eq!(best.split_value, 1.5);
        assert_eq!(best.missing, PartitionStats::new(10.0, 2.0, 2));
        assert_eq!(best.left.count, 2);
        assert_eq!(best.right.count, 2);
    }

    #[test]
    fn test_min_obs_respected() {
        let s = search_continuous(
            &[0., 1., 2., 3., 4., 5.],
            &[9., 0., 0., 0., 0., 0.],
            &[1.; 6],
            2,
            Constraint::Unconstrained,
        );
        let best = s.best_split();
        assert!(best.left.count >= 2 && best.right.count >= 2);
        assert_eq!(best.split_value, 1.5);
    }

    #[test]
    fn test_monotone_rejects_decreasing() {
        let x = [0., 1., 2., 3.];
        let z = [1., 1., 0., 0.];
        let s = search_continuous(&x, &z, &[1.; 4], 1, Constraint::Positive);
        assert_eq!(s.best_improvement(), 0.0);
        let s = search_continuous(&x, &z, &[1.; 4], 1, Constraint::Negative);
        assert_eq!(s.best_split().split_value, 1.5);
    }

    #[test]
    fn test_monotone_random() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let n = 30;
            let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
            let z: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect();
            let w: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() + 0.1).collect();
            for m in [Constraint::Positive, Constraint::Negative] {
                let s = search_continuous(&x, &z, &w, 2, m);
                let best = s.best_split();
                if best.improvement > 0.0 {
                    let (l, r) = (best.left.mean(), best.right.mean());
                    match m {
                        Constraint::Positive => assert!(l <= r),
                        _ => assert!(l >= r),
                    }
                }
            }
        }
    }

    #[test]
    fn test_mass_conserved_while_streaming() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 40;
        let mut x: Vec<f64> = (0..n).map(|_| (rng.gen::<f64>() * 10.0).floor()).collect();
        x[..5].iter_mut().for_each(|v| *v = f64::NAN);
        x[5..].sort_by(|a, b| a.total_cmp(b));
        let z: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
        let w: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() + 0.5).collect();
        let node = node_of(&z, &w);

        let mut s = NodeSplitSearch::new(1, 1024);
        s.begin_node(node);
        s.begin_variable(0, 0).unwrap();
        for i in 0..n {
            s.incorporate(x[i], z[i], w[i], Constraint::Unconstrained).unwrap();
            let total = s.proposed().total();
            assert!((total.weight - node.weight).abs() < 1e-9);
            assert!((total.sum_residual - node.sum_residual).abs() < 1e-9);
            assert_eq!(total.count, node.count);
        }
    }

    #[test]
    fn test_categorical_split() {
        // Category means 5, 1 and 3.
        let x = [0., 0., 1., 1., 2., 2.];
        let z = [5., 5., 1., 1., 3., 3.];
        let w = [1.; 6];
        let mut s = NodeSplitSearch::new(1, 1024);
        s.begin_node(node_of(&z, &w));
        s.begin_variable(0, 3).unwrap();
        for i in 0..x.len() {
            s.incorporate(x[i], z[i], w[i], Constraint::Unconstrained).unwrap();
        }
        s.evaluate_categorical_split().unwrap();
        s.finish_variable();
        let best = s.best_split();
        assert!(best.is_categorical());
        assert!(best.improvement > 0.0);
        // {1} against {2, 0} and {1, 2} against {0} tie, the first one found is kept.
        assert_eq!(best.left_categories, vec![1]);
        assert_eq!(best.split_value, 0.0);

        // Three levels give the two nested groups {1} and {1, 2}, the last
        // ranked level never moves left.
        assert_eq!(s.groups.ranked_categories().collect::<Vec<_>>(), vec![1, 2, 0]);
        assert_eq!(s.groups.left_categories(1), vec![1, 2]);
        let proposed = s.proposed();
        assert_eq!(proposed.split_value, 1.0);
        assert_eq!(proposed.left, PartitionStats::new(8.0, 4.0, 4));
        assert_eq!(proposed.right, PartitionStats::new(10.0, 2.0, 2));
    }

    #[test]
    fn test_categorical_errors() {
        let mut s = NodeSplitSearch::new(1, 2);
        s.begin_node(PartitionStats::new(0.0, 1.0, 1));
        assert!(matches!(s.begin_variable(0, 3), Err(GbmError::InvalidArgument(_))));

        s.begin_variable(0, 0).unwrap();
        assert!(matches!(s.evaluate_categorical_split(), Err(GbmError::InvalidArgument(_))));

        s.begin_variable(1, 2).unwrap();
        assert!(matches!(s.evaluate_categorical_split(), Err(GbmError::InvalidArgument(_))));
        assert!(matches!(
            s.incorporate(2.0, 0.0, 1.0, Constraint::Unconstrained),
            Err(GbmError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_single_finite_category_has_no_split() {
        let mut s = NodeSplitSearch::new(1, 1024);
        s.begin_node(PartitionStats::new(2.0, 2.0, 2));
        s.begin_variable(0, 4).unwrap();
        s.incorporate(3.0, 1.0, 1.0, Constraint::Unconstrained).unwrap();
        s.incorporate(3.0, 1.0, 1.0, Constraint::Unconstrained).unwrap();
        s.evaluate_categorical_split().unwrap();
        s.finish_variable();
        assert_eq!(s.best_improvement(), 0.0);
    }
}
