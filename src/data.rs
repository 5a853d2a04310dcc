//! Data
//!
//! Column-major matrix container and the training dataset consumed by the
//! tree builder: predictors, response, weights, offsets, per-column
//! variable classes, monotone constraints, presorted row orders and the bag.
use crate::constraints::Constraint;
use crate::errors::GbmError;
use crate::utils::is_missing;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::ops::Range;

/// Contiguous Column Major Matrix data container.
///
/// This structure holds a dense matrix of values in a single contiguous memory block,
/// in column-major order (Fortran-style), which allows for efficient column slicing.
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Indices into the data row-wise.
    pub index: Vec<usize>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[j * self.rows + i]
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.data.iter().skip(row).step_by(self.rows).copied().collect()
    }
}

/// Which part of the rows a computation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSplit {
    Train,
    Validation,
}

/// A contiguous window of rows, `offset..offset + length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataView {
    pub offset: usize,
    pub length: usize,
}

impl DataView {
    pub fn rows(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Training data for the booster.
///
/// The first `n_train` rows are the training set, the remaining rows are the
/// validation set. Only training rows are presorted and bagged.
pub struct Dataset<'a> {
    x: Matrix<'a, f64>,
    y: &'a [f64],
    offset: Option<&'a [f64]>,
    weights: Vec<f64>,
    var_classes: Vec<usize>,
    monotone: Vec<Constraint>,
    order: Vec<usize>,
    n_train: usize,
    bag: Vec<bool>,
    bag_fraction: f64,
    total_in_bag: usize,
}

impl<'a> Dataset<'a> {
    /// Create a dataset with unit weights, all columns continuous and unconstrained.
    ///
    /// * `x` - Predictors, missing values are NaN.
    /// * `y` - Response, one value per row of `x`.
    /// * `n_train` - Number of leading rows used for training.
    /// * `bag_fraction` - Fraction of the training rows drawn into each bag.
    pub fn new(x: Matrix<'a, f64>, y: &'a [f64], n_train: usize, bag_fraction: f64) -> Result<Self, GbmError> {
        if n_train == 0 {
            return Err(GbmError::InvalidArgument("you've <= 0 training instances".to_string()));
        }
        if x.rows < n_train {
            return Err(GbmError::InvalidArgument(format!(
                "the matrix has {} rows but {} training rows were requested",
                x.rows, n_train
            )));
        }
        if y.len() != x.rows {
            return Err(GbmError::InvalidArgument(format!(
                "response has length {}, expected {}",
                y.len(),
                x.rows
            )));
        }
        let total_in_bag = bag_size(bag_fraction, n_train)?;

        let order = (0..x.cols)
            .flat_map(|c| presort_column(&x.get_col(c)[..n_train]))
            .collect();

        Ok(Dataset {
            weights: vec![1.0; x.rows],
            var_classes: vec![0; x.cols],
            monotone: vec![Constraint::Unconstrained; x.cols],
            bag: vec![true; n_train],
            x,
            y,
            offset: None,
            order,
            n_train,
            bag_fraction,
            total_in_bag,
        })
    }

    /// Use per-row weights instead of unit weights.
    pub fn with_weights(mut self, weights: &[f64]) -> Result<Self, GbmError> {
        if weights.len() != self.x.rows {
            return Err(GbmError::InvalidArgument(format!(
                "weights have length {}, expected {}",
                weights.len(),
                self.x.rows
            )));
        }
        if weights.iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(GbmError::InvalidArgument("weights must be non-negative".to_string()));
        }
        self.weights = weights.to_vec();
        Ok(self)
    }

    /// Add a fixed offset to every prediction.
    pub fn with_offset(mut self, offset: &'a [f64]) -> Result<Self, GbmError> {
        if offset.len() != self.x.rows {
            return Err(GbmError::InvalidArgument(format!(
                "offset has length {}, expected {}",
                offset.len(),
                self.x.rows
            )));
        }
        self.offset = Some(offset);
        Ok(self)
    }

    /// Declare variable classes, `0` for continuous, `K > 0` for a categorical with `K` levels.
    pub fn with_var_classes(mut self, var_classes: Vec<usize>) -> Result<Self, GbmError> {
        if var_classes.len() != self.x.cols {
            return Err(GbmError::InvalidArgument(
                "shape mismatch (var classes does not match data)".to_string(),
            ));
        }
        for (col, &k) in var_classes.iter().enumerate() {
            if k == 0 {
                continue;
            }
            let bad = self
                .x
                .get_col(col)
                .iter()
                .find(|v| !is_missing(v) && (**v < 0.0 || v.fract() != 0.0 || **v >= k as f64));
            if let Some(v) = bad {
                return Err(GbmError::InvalidArgument(format!(
                    "column {} has {} levels but contains value {}",
                    col, k, v
                )));
            }
        }
        self.var_classes = var_classes;
        Ok(self)
    }

    /// Declare monotone constraints, one per column.
    pub fn with_monotone(mut self, monotone: Vec<Constraint>) -> Result<Self, GbmError> {
        self.set_monotone(monotone)?;
        Ok(self)
    }

    pub fn set_monotone(&mut self, monotone: Vec<Constraint>) -> Result<(), GbmError> {
        if monotone.len() != self.x.cols {
            return Err(GbmError::InvalidArgument(
                "shape mismatch (monotone does not match data)".to_string(),
            ));
        }
        self.monotone = monotone;
        Ok(())
    }

    /// Replace the presorted row order, `n_cols` consecutive blocks of `n_train` row indices.
    ///
    /// Only the shape is checked here, ordering is verified while splitting.
    pub fn set_order(&mut self, order: Vec<usize>) -> Result<(), GbmError> {
        if order.len() != self.x.cols * self.n_train || order.iter().any(|i| *i >= self.n_train) {
            return Err(GbmError::InvalidArgument(format!(
                "order must hold {} training row indices",
                self.x.cols * self.n_train
            )));
        }
        self.order = order;
        Ok(())
    }

    /// Replace the bag flags of the training rows.
    pub fn set_bag(&mut self, bag: Vec<bool>) -> Result<(), GbmError> {
        if bag.len() != self.n_train {
            return Err(GbmError::InvalidArgument(format!(
                "bag has length {}, expected {}",
                bag.len(),
                self.n_train
            )));
        }
        if !bag.iter().any(|b| *b) {
            return Err(GbmError::InvalidArgument("you have an empty bag!".to_string()));
        }
        self.bag = bag;
        Ok(())
    }

    /// Change the fraction of training rows drawn into each bag.
    pub fn set_bag_fraction(&mut self, bag_fraction: f64) -> Result<(), GbmError> {
        self.total_in_bag = bag_size(bag_fraction, self.n_train)?;
        self.bag_fraction = bag_fraction;
        Ok(())
    }

    pub fn bag_mut(&mut self) -> &mut [bool] {
        &mut self.bag
    }

    pub fn x(&self) -> &Matrix<'a, f64> {
        &self.x
    }

    pub fn x_value(&self, row: usize, col: usize) -> f64 {
        *self.x.get(row, col)
    }

    pub fn y(&self) -> &[f64] {
        self.y
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn offset(&self) -> Option<&[f64]> {
        self.offset
    }

    /// Offset of a row, `0.0` if the dataset has none.
    #[inline]
    pub fn offset_at(&self, row: usize) -> f64 {
        self.offset.map_or(0.0, |o| o[row])
    }

    pub fn n_rows(&self) -> usize {
        self.x.rows
    }

    pub fn n_cols(&self) -> usize {
        self.x.cols
    }

    pub fn n_train(&self) -> usize {
        self.n_train
    }

    pub fn n_valid(&self) -> usize {
        self.x.rows - self.n_train
    }

    pub fn var_class(&self, col: usize) -> usize {
        self.var_classes[col]
    }

    pub fn var_classes(&self) -> &[usize] {
        &self.var_classes
    }

    pub fn monotone(&self, col: usize) -> Constraint {
        self.monotone[col]
    }

    /// Training rows of a column, missing values first then ascending.
    pub fn order(&self, col: usize) -> &[usize] {
        &self.order[col * self.n_train..(col + 1) * self.n_train]
    }

    pub fn bag(&self) -> &[bool] {
        &self.bag
    }

    #[inline]
    pub fn in_bag(&self, row: usize) -> bool {
        self.bag[row]
    }

    pub fn bag_fraction(&self) -> f64 {
        self.bag_fraction
    }

    pub fn total_in_bag(&self) -> usize {
        self.total_in_bag
    }

    pub fn view(&self, split: DataSplit) -> DataView {
        match split {
            DataSplit::Train => DataView {
                offset: 0,
                length: self.n_train,
            },
            DataSplit::Validation => DataView {
                offset: self.n_train,
                length: self.n_valid(),
            },
        }
    }

    /// A uniformly shuffled permutation of the column indices.
    pub fn random_order(&self, rng: &mut StdRng) -> Vec<usize> {
        let mut cols: Vec<usize> = (0..self.x.cols).collect();
        cols.shuffle(rng);
        cols
    }
}

/// Exact number of bagged rows, `floor(bag_fraction * n_train)`.
fn bag_size(bag_fraction: f64, n_train: usize) -> Result<usize, GbmError> {
    if bag_fraction.is_nan() || bag_fraction <= 0.0 || bag_fraction > 1.0 {
        return Err(GbmError::InvalidArgument(format!(
            "bag fraction must be in (0, 1], got {}",
            bag_fraction
        )));
    }
    let total_in_bag = (bag_fraction * n_train as f64) as usize;
    if total_in_bag == 0 {
        return Err(GbmError::InvalidArgument("you have an empty bag!".to_string()));
    }
    Ok(total_in_bag)
}

/// Row indices of `values` with missing values first, then by ascending value.
/// The sort is stable, tied rows keep their original order.
pub fn presort_column(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|a, b| {
        let (va, vb) = (values[*a], values[*b]);
        match (is_missing(&va), is_missing(&vb)) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => va.total_cmp(&vb),
        }
    });
    idx
}
