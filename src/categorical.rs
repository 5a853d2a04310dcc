//! Categorical grouping
//!
//! Per-category residual statistics for one categorical variable at one node,
//! and the ordering of categories by mean residual used to turn the search
//! over subsets into a search over nested prefixes.
use crate::split::PartitionStats;

#[derive(Debug, Default, Clone)]
pub struct CategoricalGrouping {
    sum_residual: Vec<f64>,
    weight: Vec<f64>,
    count: Vec<usize>,
    // (mean residual, category)
    ranked: Vec<(f64, usize)>,
}

impl CategoricalGrouping {
    pub fn new(n_levels: usize) -> Self {
        let mut grouping = CategoricalGrouping::default();
        grouping.reset(n_levels);
        grouping
    }

    /// Clear the statistics and size the buffers for `n_levels` categories.
    pub fn reset(&mut self, n_levels: usize) {
        self.sum_residual.clear();
        self.sum_residual.resize(n_levels, 0.0);
        self.weight.clear();
        self.weight.resize(n_levels, 0.0);
        self.count.clear();
        self.count.resize(n_levels, 0);
        self.ranked.clear();
    }

    pub fn n_levels(&self) -> usize {
        self.count.len()
    }

    /// Add one weighted observation to category `cat`.
    #[inline]
    pub fn accumulate(&mut self, cat: usize, sum_residual: f64, weight: f64) {
        self.sum_residual[cat] += sum_residual;
        self.weight[cat] += weight;
        self.count[cat] += 1;
    }

    pub fn stats(&self, cat: usize) -> PartitionStats {
        PartitionStats::new(self.sum_residual[cat], self.weight[cat], self.count[cat])
    }

    /// Sort the categories by ascending mean residual and return how many have
    /// a finite mean. Categories without weight get `+inf` and rank last, ties
    /// are broken by category index.
    pub fn rank(&mut self) -> usize {
        self.ranked.clear();
        let mut n_finite = 0;
        for cat in 0..self.n_levels() {
            let mean = if self.weight[cat] != 0.0 {
                n_finite += 1;
                self.sum_residual[cat] / self.weight[cat]
            } else {
                f64::INFINITY
            };
            self.ranked.push((mean, cat));
        }
        self.ranked
            .sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        n_finite
    }

    /// Categories in ranked order, valid after `rank`.
    pub fn ranked_categories(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranked.iter().map(|(_, cat)| *cat)
    }

    /// Category at position `i` of the ranking.
    #[inline]
    pub fn ranked_category(&self, i: usize) -> usize {
        self.ranked[i].1
    }

    /// The first `i + 1` categories of the ranking.
    pub fn left_categories(&self, i: usize) -> Vec<usize> {
        self.ranked_categories().take(i + 1).collect()
    }
}
