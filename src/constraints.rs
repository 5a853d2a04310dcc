use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Monotonicity constraint for a feature.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Constraint {
    /// Constrain the relationship to be monotonically increasing.
    Positive,
    /// Constrain the relationship to be monotonically decreasing.
    Negative,
    /// No monotonicity constraint.
    #[default]
    Unconstrained,
}

impl Constraint {
    /// Signed direction used by the split search, `+1`, `-1` or `0`.
    pub fn direction(&self) -> i8 {
        match self {
            Constraint::Positive => 1,
            Constraint::Negative => -1,
            Constraint::Unconstrained => 0,
        }
    }
}

/// A map covering the constraints for each feature, key is the feature index.
pub type ConstraintMap = HashMap<usize, Constraint>;

/// Expand a sparse constraint map into one constraint per column.
pub fn constraints_from_map(map: &ConstraintMap, n_cols: usize) -> Vec<Constraint> {
    (0..n_cols)
        .map(|c| map.get(&c).copied().unwrap_or_default())
        .collect()
}
