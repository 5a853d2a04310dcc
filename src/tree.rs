use crate::data::{DataSplit, Dataset, Matrix};
use crate::errors::GbmError;
use crate::node::{Direction, Node, SplitRule};
use crate::split::PartitionStats;
use crate::splitter::NodeSplitSearch;
use log::debug;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A regression tree grown to a fixed depth, each split node having a left,
/// a right and a missing child. Nodes live in an arena, the root is node `0`.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Tree {
    pub nodes: Vec<Node>,
    /// Arena index of every terminal node, in the order rows are assigned to them.
    #[serde(skip)]
    terminal_nodes: Vec<usize>,
    pub max_depth: usize,
    pub shrinkage: f64,
    pub initial_error: f64,
}

/// Preorder (node, left, right, missing) parallel-array form of a tree.
///
/// Leaves have `split_var == -1` and child indices of `-1`, their
/// `split_point` holds the scaled prediction. For categorical splits
/// `split_point` is the index of the split's row in the shared category table.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct FlatTree {
    pub split_var: Vec<i32>,
    pub split_point: Vec<f64>,
    pub left_node: Vec<i32>,
    pub right_node: Vec<i32>,
    pub missing_node: Vec<i32>,
    pub error_reduction: Vec<f64>,
    pub weight: Vec<f64>,
    pub prediction: Vec<f64>,
}

impl FlatTree {
    pub fn len(&self) -> usize {
        self.split_var.len()
    }

    pub fn is_empty(&self) -> bool {
        self.split_var.is_empty()
    }
}

impl Tree {
    pub fn new(max_depth: usize, shrinkage: f64) -> Self {
        Tree {
            nodes: Vec::new(),
            terminal_nodes: Vec::new(),
            max_depth,
            shrinkage,
            initial_error: 0.0,
        }
    }

    /// Drop every node, the next `grow` starts from a fresh root.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.terminal_nodes.clear();
        self.initial_error = 0.0;
    }

    /// Grow the tree on the bagged training rows.
    ///
    /// * `z` - Working response, at least one value per training row.
    /// * `data` - Dataset with its presorted orders and bag.
    /// * `min_obs_in_node` - Smallest left or right child a split may produce.
    /// * `max_categories` - Largest categorical cardinality accepted.
    /// * `node_assign` - Output, terminal node index of every training row.
    /// * `rng` - Source of the per-level column permutation.
    pub fn grow(
        &mut self,
        z: &[f64],
        data: &Dataset,
        min_obs_in_node: usize,
        max_categories: usize,
        node_assign: &mut [usize],
        rng: &mut StdRng,
    ) -> Result<(), GbmError> {
        let n_train = data.n_train();
        if self.max_depth < 1 {
            return Err(GbmError::InvalidArgument("tree depth must be at least 1".to_string()));
        }
        if z.len() < n_train || node_assign.len() < n_train {
            return Err(GbmError::InvalidArgument(format!(
                "working response and node assignment need {} training rows",
                n_train
            )));
        }
        self.reset();

        let w = data.weights();
        let (mut sum_z, mut sum_z2, mut total_w, mut n_bagged) = (0.0, 0.0, 0.0, 0);
        for i in 0..n_train {
            node_assign[i] = 0;
            if data.in_bag(i) {
                sum_z += w[i] * z[i];
                sum_z2 += w[i] * z[i] * z[i];
                total_w += w[i];
                n_bagged += 1;
            }
        }
        if total_w <= 0.0 {
            return Err(GbmError::InvalidArgument("bagged rows carry no weight".to_string()));
        }

        self.initial_error = sum_z2 - sum_z * sum_z / total_w;
        self.nodes.push(Node::leaf(0, sum_z / total_w, total_w, n_bagged));
        self.terminal_nodes.reserve(2 * self.max_depth + 1);
        self.terminal_nodes.push(0);

        let mut stats = vec![PartitionStats::new(sum_z, total_w, n_bagged)];
        let mut searches = vec![NodeSplitSearch::new(min_obs_in_node, max_categories)];

        for depth in 0..self.max_depth {
            for (search, node) in searches.iter_mut().zip(stats.iter()) {
                search.begin_node(*node);
            }
            self.find_best_splits(z, data, node_assign, &mut searches, rng)?;

            let mut best_node = 0;
            let mut best_improvement = 0.0;
            for (i, search) in searches.iter().enumerate() {
                if search.best_improvement() > best_improvement {
                    best_node = i;
                    best_improvement = search.best_improvement();
                }
            }
            if best_improvement == 0.0 {
                debug!("No improving split at depth {}, stopping early.", depth);
                break;
            }

            let split = searches[best_node].best_split().clone();
            let parent_idx = self.terminal_nodes[best_node];
            let parent_prediction = self.nodes[parent_idx].prediction;
            let (left_idx, right_idx, missing_idx) = (self.nodes.len(), self.nodes.len() + 1, self.nodes.len() + 2);
            self.nodes.push(Node::from_partition(left_idx, &split.left, parent_prediction));
            self.nodes.push(Node::from_partition(right_idx, &split.right, parent_prediction));
            self.nodes.push(Node::from_partition(missing_idx, &split.missing, parent_prediction));
            self.nodes[parent_idx].make_parent_node(&split, left_idx, right_idx, missing_idx);

            // Left rows keep the parent's terminal index.
            let right_terminal = self.terminal_nodes.len();
            let missing_terminal = right_terminal + 1;
            let parent = &self.nodes[parent_idx];
            for (row, assigned) in node_assign.iter_mut().enumerate().take(n_train) {
                if *assigned == best_node {
                    match parent.direction(data.x_value(row, split.split_var)) {
                        Direction::Left => (),
                        Direction::Right => *assigned = right_terminal,
                        Direction::Missing => *assigned = missing_terminal,
                    }
                }
            }

            self.terminal_nodes[best_node] = left_idx;
            self.terminal_nodes.push(right_idx);
            self.terminal_nodes.push(missing_idx);
            stats[best_node] = split.left;
            stats.push(split.right);
            stats.push(split.missing);
            searches.push(NodeSplitSearch::new(min_obs_in_node, max_categories));
            searches.push(NodeSplitSearch::new(min_obs_in_node, max_categories));
        }

        debug!(
            "Grew tree with {} nodes, initial error {}.",
            self.nodes.len(),
            self.initial_error
        );
        Ok(())
    }

    /// Stream every variable, in random order, through the searches of the terminal nodes.
    fn find_best_splits(
        &self,
        z: &[f64],
        data: &Dataset,
        node_assign: &[usize],
        searches: &mut [NodeSplitSearch],
        rng: &mut StdRng,
    ) -> Result<(), GbmError> {
        let w = data.weights();
        for var in data.random_order(rng) {
            let var_class = data.var_class(var);
            let monotone = data.monotone(var);
            for search in searches.iter_mut() {
                search.begin_variable(var, var_class)?;
            }
            for &row in data.order(var) {
                if data.in_bag(row) {
                    searches[node_assign[row]].incorporate(data.x_value(row, var), z[row], w[row], monotone)?;
                }
            }
            for search in searches.iter_mut() {
                if var_class != 0 && search.has_observations() {
                    search.evaluate_categorical_split()?;
                }
                search.finish_variable();
            }
        }
        Ok(())
    }

    /// Fold undersized missing leaves into their siblings, then write the
    /// terminal prediction of every training row into `fadj`.
    pub fn adjust(&mut self, node_assign: &[usize], fadj: &mut [f64], min_obs_in_node: usize) -> Result<(), GbmError> {
        if self.nodes.is_empty() {
            return Err(GbmError::Structural("cannot adjust a tree without a root".to_string()));
        }
        if fadj.len() < node_assign.len() {
            return Err(GbmError::InvalidArgument(format!(
                "adjustment buffer has length {}, expected at least {}",
                fadj.len(),
                node_assign.len()
            )));
        }
        self.adjust_node(0, min_obs_in_node);
        for (f, t) in fadj.iter_mut().zip(node_assign.iter()) {
            let idx = self.terminal_nodes.get(*t).ok_or_else(|| {
                GbmError::Structural(format!("row assigned to unknown terminal node {}", t))
            })?;
            *f = self.nodes[*idx].prediction;
        }
        Ok(())
    }

    fn adjust_node(&mut self, idx: usize, min_obs_in_node: usize) {
        if self.nodes[idx].is_leaf() {
            return;
        }
        let (l, r, m) = {
            let n = &self.nodes[idx];
            (n.left_child, n.right_child, n.missing_node)
        };
        self.adjust_node(l, min_obs_in_node);
        self.adjust_node(r, min_obs_in_node);

        let (lw, lp) = (self.nodes[l].weight, self.nodes[l].prediction);
        let (rw, rp) = (self.nodes[r].weight, self.nodes[r].prediction);
        if self.nodes[m].is_leaf() && self.nodes[m].count < min_obs_in_node {
            let prediction = (lw * lp + rw * rp) / (lw + rw);
            self.nodes[idx].prediction = prediction;
            self.nodes[m].prediction = prediction;
        } else {
            self.adjust_node(m, min_obs_in_node);
            let (mw, mp) = (self.nodes[m].weight, self.nodes[m].prediction);
            self.nodes[idx].prediction = (lw * lp + rw * rp + mw * mp) / (lw + rw + mw);
        }
    }

    /// Write the shrunken prediction of every validation row into `fadj`.
    pub fn predict_validation(&self, data: &Dataset, fadj: &mut [f64]) -> Result<(), GbmError> {
        if self.nodes.is_empty() {
            return Err(GbmError::Structural("cannot predict with a tree without a root".to_string()));
        }
        if fadj.len() < data.n_rows() {
            return Err(GbmError::InvalidArgument(format!(
                "adjustment buffer has length {}, expected {}",
                fadj.len(),
                data.n_rows()
            )));
        }
        for row in data.view(DataSplit::Validation).rows() {
            fadj[row] = self.predict_row(data.x(), row);
        }
        Ok(())
    }

    fn leaf_for<F: Fn(usize) -> f64>(&self, value_of: F) -> Option<&Node> {
        let mut node = self.nodes.first()?;
        while !node.is_leaf() {
            node = &self.nodes[node.get_child_idx(value_of(node.split_feature))];
        }
        Some(node)
    }

    /// Shrunken prediction for one row, `0.0` if the tree has no root.
    pub fn predict_row(&self, data: &Matrix<f64>, row: usize) -> f64 {
        self.leaf_for(|col| *data.get(row, col))
            .map_or(0.0, |n| n.prediction * self.shrinkage)
    }

    /// Shrunken prediction for a row given as a slice, columns past its end count as missing.
    pub fn predict_row_from_row_slice(&self, row: &[f64]) -> f64 {
        self.leaf_for(|col| row.get(col).copied().unwrap_or(f64::NAN))
            .map_or(0.0, |n| n.prediction * self.shrinkage)
    }

    fn predict_single_threaded(&self, data: &Matrix<f64>) -> Vec<f64> {
        data.index.iter().map(|i| self.predict_row(data, *i)).collect()
    }

    fn predict_parallel(&self, data: &Matrix<f64>) -> Vec<f64> {
        data.index.par_iter().map(|i| self.predict_row(data, *i)).collect()
    }

    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Vec<f64> {
        if parallel {
            self.predict_parallel(data)
        } else {
            self.predict_single_threaded(data)
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Arena indices of the terminal nodes, indexed by the values of the node assignment.
    pub fn terminal_nodes(&self) -> &[usize] {
        &self.terminal_nodes
    }

    pub fn terminal_node(&self, i: usize) -> &Node {
        &self.nodes[self.terminal_nodes[i]]
    }

    pub fn set_terminal_prediction(&mut self, i: usize, prediction: f64) {
        let idx = self.terminal_nodes[i];
        self.nodes[idx].prediction = prediction;
    }

    /// Add the improvement of every split node to the importance of its variable.
    pub fn accumulate_variable_importance(&self, importance: &mut [f64]) -> Result<(), GbmError> {
        for node in self.nodes.iter().filter(|n| !n.is_leaf()) {
            let slot = importance.get_mut(node.split_feature).ok_or_else(|| {
                GbmError::InvalidArgument(format!(
                    "importance buffer too short for variable {}",
                    node.split_feature
                ))
            })?;
            *slot += node.improvement;
        }
        Ok(())
    }

    /// Flatten the tree in preorder.
    ///
    /// * `var_classes` - Variable class of every column, sizes the category codes.
    /// * `split_codes` - Shared table receiving one `-1` (left) / `1` (right) row per categorical split.
    /// * `cat_splits_base` - Number of categorical splits already exported by earlier tables.
    pub fn export_flat(
        &self,
        var_classes: &[usize],
        split_codes: &mut Vec<Vec<i32>>,
        cat_splits_base: usize,
    ) -> Result<FlatTree, GbmError> {
        if self.nodes.is_empty() {
            return Err(GbmError::Structural("cannot export a tree without a root".to_string()));
        }
        let mut flat = FlatTree::default();
        self.export_node(0, var_classes, split_codes, cat_splits_base, &mut flat)?;
        Ok(flat)
    }

    fn export_node(
        &self,
        idx: usize,
        var_classes: &[usize],
        split_codes: &mut Vec<Vec<i32>>,
        cat_splits_base: usize,
        flat: &mut FlatTree,
    ) -> Result<(), GbmError> {
        let node = &self.nodes[idx];
        let this_id = flat.len();
        let scaled = self.shrinkage * node.prediction;
        flat.weight.push(node.weight);
        flat.prediction.push(scaled);
        flat.left_node.push(-1);
        flat.right_node.push(-1);
        flat.missing_node.push(-1);

        match &node.rule {
            SplitRule::Terminal => {
                flat.split_var.push(-1);
                flat.split_point.push(scaled);
                flat.error_reduction.push(0.0);
                return Ok(());
            }
            SplitRule::Continuous { threshold } => {
                flat.split_var.push(node.split_feature as i32);
                flat.split_point.push(*threshold);
                flat.error_reduction.push(node.improvement);
            }
            SplitRule::Categorical { left_categories } => {
                let n_levels = *var_classes.get(node.split_feature).ok_or_else(|| {
                    GbmError::Structural(format!("no variable class for variable {}", node.split_feature))
                })?;
                let mut codes = vec![1; n_levels];
                for cat in left_categories {
                    let code = codes.get_mut(*cat).ok_or_else(|| {
                        GbmError::Structural(format!(
                            "category {} outside the {} levels of variable {}",
                            cat, n_levels, node.split_feature
                        ))
                    })?;
                    *code = -1;
                }
                flat.split_var.push(node.split_feature as i32);
                flat.split_point.push((split_codes.len() + cat_splits_base) as f64);
                flat.error_reduction.push(node.improvement);
                split_codes.push(codes);
            }
        }

        flat.left_node[this_id] = flat.len() as i32;
        self.export_node(node.left_child, var_classes, split_codes, cat_splits_base, flat)?;
        flat.right_node[this_id] = flat.len() as i32;
        self.export_node(node.right_child, var_classes, split_codes, cat_splits_base, flat)?;
        flat.missing_node[this_id] = flat.len() as i32;
        self.export_node(node.missing_node, var_classes, split_codes, cat_splits_base, flat)
    }

    fn fmt_node(&self, idx: usize, indent: usize, r: &mut String) {
        let node = &self.nodes[idx];
        let pad = "  ".repeat(indent);
        let join = |cats: &[usize]| cats.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
        let (go_left, go_right) = match &node.rule {
            SplitRule::Terminal => {
                r.push_str(&format!("{}N={:.6}, Prediction={:.6} *\n", pad, node.weight, node.prediction));
                return;
            }
            SplitRule::Continuous { threshold } => (
                format!("V{} < {:.6}", node.split_feature, threshold),
                format!("V{} > {:.6}", node.split_feature, threshold),
            ),
            SplitRule::Categorical { left_categories } => (
                format!("V{} in {}", node.split_feature, join(left_categories)),
                format!("V{} not in {}", node.split_feature, join(left_categories)),
            ),
        };
        r.push_str(&format!(
            "{}N={:.6}, Improvement={:.6}, Prediction={:.6}, NA pred={:.6}\n",
            pad, node.weight, node.improvement, node.prediction, self.nodes[node.missing_node].prediction
        ));
        r.push_str(&format!("{}{}\n", pad, go_left));
        self.fmt_node(node.left_child, indent + 1, r);
        r.push_str(&format!("{}{}\n", pad, go_right));
        self.fmt_node(node.right_child, indent + 1, r);
        r.push_str(&format!("{}missing\n", pad));
        self.fmt_node(node.missing_node, indent + 1, r);
    }
}

impl Display for Tree {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = String::new();
        if !self.nodes.is_empty() {
            self.fmt_node(0, 0, &mut r);
            r += format!("shrinkage: {:.6}\n", self.shrinkage).as_str();
            r += format!("initial error: {:.6}\n", self.initial_error).as_str();
        }
        write!(f, "{}", r)
    }
}
