//! Split candidates
//!
//! Running left/right/missing statistics of one candidate split and the
//! weighted variance-reduction score computed from them.
use serde::{Deserialize, Serialize};

/// Weighted residual sum, weight and observation count of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub sum_residual: f64,
    pub weight: f64,
    pub count: usize,
}

impl PartitionStats {
    pub fn new(sum_residual: f64, weight: f64, count: usize) -> Self {
        PartitionStats {
            sum_residual,
            weight,
            count,
        }
    }

    /// Weighted mean residual of the partition.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.sum_residual / self.weight
    }

    #[inline]
    fn add(&mut self, sum_residual: f64, weight: f64, count: usize) {
        self.sum_residual += sum_residual;
        self.weight += weight;
        self.count += count;
    }

    #[inline]
    fn remove(&mut self, sum_residual: f64, weight: f64, count: usize) {
        self.sum_residual -= sum_residual;
        self.weight -= weight;
        self.count -= count;
    }
}

/// A candidate binary split with a separate partition for missing values.
///
/// Every observation starts in `right` and is moved into `left` or `missing`
/// as the search advances, so the three partitions always sum to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitCandidate {
    pub left: PartitionStats,
    pub right: PartitionStats,
    pub missing: PartitionStats,
    pub split_var: usize,
    /// Threshold for a continuous variable, rank of the last left category for a categorical one.
    pub split_value: f64,
    /// `0` for a continuous variable, the number of levels otherwise.
    pub var_class: usize,
    /// Categories routed left, in ascending order of their mean residual.
    pub left_categories: Vec<usize>,
    pub improvement: f64,
}

impl Default for SplitCandidate {
    fn default() -> Self {
        SplitCandidate::new(PartitionStats::default(), 0, 0)
    }
}

impl SplitCandidate {
    /// A candidate with every observation of the node in the right partition.
    pub fn new(node: PartitionStats, split_var: usize, var_class: usize) -> Self {
        SplitCandidate {
            left: PartitionStats::default(),
            right: node,
            missing: PartitionStats::default(),
            split_var,
            split_value: 0.0,
            var_class,
            left_categories: Vec::new(),
            improvement: 0.0,
        }
    }

    pub fn is_categorical(&self) -> bool {
        self.var_class > 0
    }

    /// Move an observation (or a group of them) from right to left.
    #[inline]
    pub fn move_to_left(&mut self, sum_residual: f64, weight: f64, count: usize) {
        self.left.add(sum_residual, weight, count);
        self.right.remove(sum_residual, weight, count);
    }

    /// Move an observation from right to missing.
    #[inline]
    pub fn move_to_missing(&mut self, sum_residual: f64, weight: f64, count: usize) {
        self.missing.add(sum_residual, weight, count);
        self.right.remove(sum_residual, weight, count);
    }

    /// Compute and store the weighted between-group sum of squares.
    ///
    /// The order of the floating point operations is fixed, results are
    /// reproducible bit for bit.
    pub fn compute_improvement(&mut self) -> f64 {
        let (l, r, m) = (&self.left, &self.right, &self.missing);
        let result = if m.weight == 0.0 {
            let d = l.sum_residual / l.weight - r.sum_residual / r.weight;
            l.weight * r.weight * d * d / (l.weight + r.weight)
        } else {
            let mut result = 0.0;
            let d = l.sum_residual / l.weight - r.sum_residual / r.weight;
            result += l.weight * r.weight * d * d;
            let d = l.sum_residual / l.weight - m.sum_residual / m.weight;
            result += l.weight * m.weight * d * d;
            let d = r.sum_residual / r.weight - m.sum_residual / m.weight;
            result += r.weight * m.weight * d * d;
            result / (l.weight + r.weight + m.weight)
        };
        self.improvement = result;
        result
    }

    /// Both the left and the right partition hold at least `min_obs` observations.
    #[inline]
    pub fn has_min_obs(&self, min_obs: usize) -> bool {
        self.left.count >= min_obs && self.right.count >= min_obs
    }

    /// `direction` is `+1` for increasing, `-1` for decreasing and `0` for unconstrained.
    #[inline]
    pub fn is_monotone(&self, direction: i8) -> bool {
        let weighted_grad = self.right.sum_residual * self.left.weight - self.left.sum_residual * self.right.weight;
        direction == 0 || f64::from(direction) * weighted_grad > 0.0
    }

    /// Combined statistics of all three partitions.
    pub fn total(&self) -> PartitionStats {
        PartitionStats {
            sum_residual: self.left.sum_residual + self.right.sum_residual + self.missing.sum_residual,
            weight: self.left.weight + self.right.weight + self.missing.weight,
            count: self.left.count + self.right.count + self.missing.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_way_improvement() {
        let mut c = SplitCandidate::new(PartitionStats::new(2.0, 4.0, 4), 0, 0);
        c.move_to_left(0.0, 1.0, 1);
        c.move_to_left(0.0, 1.0, 1);
        // left mean 0, right mean 1, 2 * 2 * 1 / 4
        assert_eq!(c.compute_improvement(), 1.0);
        assert_eq!(c.improvement, 1.0);
        assert!(c.has_min_obs(2));
        assert!(!c.has_min_obs(3));
    }

    #[test]
    fn test_three_way_improvement() {
        let mut c = SplitCandidate::new(PartitionStats::new(6.0, 6.0, 6), 0, 0);
        c.move_to_missing(4.0, 2.0, 2);
        c.move_to_left(0.0, 2.0, 2);
        // means: left 0, right 1, missing 2
        // (2*2*1 + 2*2*4 + 2*2*1) / 6
        assert_eq!(c.compute_improvement(), 24.0 / 6.0);
    }

    #[test]
    fn test_improvement_non_negative() {
        let z = [0.3, -1.2, 2.5, 0.0, 4.1, -0.7, 1.1];
        let w = [1.0, 0.5, 2.0, 1.5, 0.25, 1.0, 3.0];
        let sum: f64 = z.iter().zip(w.iter()).map(|(a, b)| a * b).sum();
        let weight: f64 = w.iter().sum();
        let mut c = SplitCandidate::new(PartitionStats::new(sum, weight, z.len()), 0, 0);
        c.move_to_missing(z[0] * w[0], w[0], 1);
        for i in 1..z.len() - 1 {
            c.move_to_left(z[i] * w[i], w[i], 1);
            assert!(c.compute_improvement() >= 0.0);
        }
    }

    #[test]
    fn test_zero_weight_missing_uses_two_way() {
        let mut c = SplitCandidate::new(PartitionStats::new(2.0, 4.0, 5), 0, 0);
        c.move_to_missing(0.0, 0.0, 1);
        c.move_to_left(0.0, 1.0, 1);
        c.move_to_left(0.0, 1.0, 1);
        assert_eq!(c.compute_improvement(), 1.0);
    }

    #[test]
    fn test_monotone() {
        let mut c = SplitCandidate::new(PartitionStats::new(2.0, 4.0, 4), 0, 0);
        c.move_to_left(0.0, 2.0, 2);
        // Left mean 0 < right mean 1.
        assert!(c.is_monotone(0));
        assert!(c.is_monotone(1));
        assert!(!c.is_monotone(-1));
    }

    #[test]
    fn test_mass_conservation() {
        let node = PartitionStats::new(3.0, 5.0, 5);
        let mut c = SplitCandidate::new(node, 1, 0);
        c.move_to_missing(1.0, 1.0, 1);
        c.move_to_left(0.5, 2.0, 2);
        let total = c.total();
        assert!((total.weight - node.weight).abs() < 1e-12);
        assert!((total.sum_residual - node.sum_residual).abs() < 1e-12);
        assert_eq!(total.count, node.count);
    }
}
