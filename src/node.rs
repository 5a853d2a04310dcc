use crate::split::{PartitionStats, SplitCandidate};
use crate::utils::is_missing;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a node routes rows to its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SplitRule {
    Terminal,
    /// Rows with `x < threshold` go left.
    Continuous { threshold: f64 },
    /// Rows whose category is in `left_categories` go left, every other category goes right.
    Categorical { left_categories: Vec<usize> },
}

/// Child a row is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Missing,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Node {
    pub num: usize,
    pub prediction: f64,
    pub weight: f64,
    pub count: usize,
    pub improvement: f64,
    pub split_feature: usize,
    pub rule: SplitRule,
    pub left_child: usize,
    pub right_child: usize,
    pub missing_node: usize,
}

impl Node {
    /// Create a terminal node from the statistics of its rows.
    pub fn leaf(num: usize, prediction: f64, weight: f64, count: usize) -> Self {
        Node {
            num,
            prediction,
            weight,
            count,
            improvement: 0.0,
            split_feature: 0,
            rule: SplitRule::Terminal,
            left_child: 0,
            right_child: 0,
            missing_node: 0,
        }
    }

    /// Terminal node for one partition of a split, falling back to `fallback`
    /// when the partition carries no weight.
    pub fn from_partition(num: usize, stats: &PartitionStats, fallback: f64) -> Self {
        let prediction = if stats.weight > 0.0 { stats.mean() } else { fallback };
        Node::leaf(num, prediction, stats.weight, stats.count)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.rule == SplitRule::Terminal
    }

    /// Turn this terminal node into a split node with the given children.
    pub fn make_parent_node(&mut self, split: &SplitCandidate, left_child: usize, right_child: usize, missing_node: usize) {
        self.rule = if split.is_categorical() {
            SplitRule::Categorical {
                left_categories: split.left_categories.clone(),
            }
        } else {
            SplitRule::Continuous {
                threshold: split.split_value,
            }
        };
        self.split_feature = split.split_var;
        self.improvement = split.improvement;
        self.left_child = left_child;
        self.right_child = right_child;
        self.missing_node = missing_node;
    }

    /// Get the path that should be traveled down, given a value.
    pub fn direction(&self, v: f64) -> Direction {
        if is_missing(&v) {
            return Direction::Missing;
        }
        match &self.rule {
            SplitRule::Continuous { threshold } => {
                if v < *threshold {
                    Direction::Left
                } else {
                    Direction::Right
                }
            }
            SplitRule::Categorical { left_categories } => {
                if v >= 0.0 && left_categories.contains(&(v as usize)) {
                    Direction::Left
                } else {
                    Direction::Right
                }
            }
            // Traversal and row reassignment stop at leaves before asking for a direction.
            SplitRule::Terminal => {
                debug_assert!(false, "leaf {} has no split to route value {}", self.num, v);
                Direction::Missing
            }
        }
    }

    /// Index of the child a value is routed to.
    pub fn get_child_idx(&self, v: f64) -> usize {
        match self.direction(v) {
            Direction::Left => self.left_child,
            Direction::Right => self.right_child,
            Direction::Missing => self.missing_node,
        }
    }
}

impl fmt::Display for Node {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.rule {
            SplitRule::Terminal => write!(f, "{}:leaf={},weight={}", self.num, self.prediction, self.weight),
            SplitRule::Continuous { threshold } => write!(
                f,
                "{}:[{} < {}] yes={},no={},missing={},improvement={},weight={}",
                self.num,
                self.split_feature,
                threshold,
                self.left_child,
                self.right_child,
                self.missing_node,
                self.improvement,
                self.weight
            ),
            SplitRule::Categorical { left_categories } => write!(
                f,
                "{}:[{} in {:?}] yes={},no={},missing={},improvement={},weight={}",
                self.num,
                self.split_feature,
                left_categories,
                self.left_child,
                self.right_child,
                self.missing_node,
                self.improvement,
                self.weight
            ),
        }
    }
}
