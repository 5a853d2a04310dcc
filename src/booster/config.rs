//! Booster Configuration
//!
//! Training parameters of the `GbmBooster` and JSON persistence of boosters
//! and configurations.
use crate::constants::MAX_CATEGORIES;
use crate::constraints::ConstraintMap;
use crate::distribution::Distribution;
use crate::errors::GbmError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_n_trees() -> usize {
    100
}
fn default_shrinkage() -> f64 {
    0.001
}
fn default_interaction_depth() -> usize {
    1
}
fn default_min_obs_in_node() -> usize {
    10
}
fn default_bag_fraction() -> f64 {
    0.5
}
fn default_max_categories() -> usize {
    MAX_CATEGORIES
}
fn default_log_iterations() -> usize {
    0
}

/// Configuration for the `GbmBooster`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoosterConfig {
    /// Loss family to optimize.
    #[serde(default)]
    pub distribution: Distribution,
    /// Number of trees to fit.
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    /// Learning rate applied to every tree.
    #[serde(default = "default_shrinkage")]
    pub shrinkage: f64,
    /// Number of splits per tree.
    #[serde(default = "default_interaction_depth")]
    pub interaction_depth: usize,
    /// Smallest number of bagged rows in a left or right child.
    #[serde(default = "default_min_obs_in_node")]
    pub min_obs_in_node: usize,
    /// Fraction of the training rows drawn for each tree.
    #[serde(default = "default_bag_fraction")]
    pub bag_fraction: f64,
    /// Monotonicity constraints, key is the feature index.
    #[serde(default)]
    pub monotone_constraints: Option<ConstraintMap>,
    /// Largest number of levels accepted for a categorical variable.
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
    /// Seed for random number generation.
    #[serde(default)]
    pub seed: u64,
    /// Logging frequency (every N trees), `0` disables the per-tree log.
    #[serde(default = "default_log_iterations")]
    pub log_iterations: usize,
}

// Default booster base configuration
impl Default for BoosterConfig {
    fn default() -> Self {
        BoosterConfig {
            distribution: Distribution::Gaussian,
            n_trees: default_n_trees(),
            shrinkage: default_shrinkage(),
            interaction_depth: default_interaction_depth(),
            min_obs_in_node: default_min_obs_in_node(),
            bag_fraction: default_bag_fraction(),
            monotone_constraints: None,
            max_categories: default_max_categories(),
            seed: 0,
            log_iterations: default_log_iterations(),
        }
    }
}

fn validate_unit_interval(value: f64, parameter: &str) -> Result<(), GbmError> {
    if value.is_nan() || value <= 0.0 || value > 1.0 {
        Err(GbmError::InvalidParameter(
            parameter.to_string(),
            "real value in (0, 1]".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

fn validate_at_least_one(value: usize, parameter: &str) -> Result<(), GbmError> {
    if value < 1 {
        Err(GbmError::InvalidParameter(
            parameter.to_string(),
            "integer of at least 1".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

impl BoosterConfig {
    /// Check every parameter, returning the first one out of range.
    pub fn validate(&self) -> Result<(), GbmError> {
        validate_unit_interval(self.shrinkage, "shrinkage")?;
        validate_unit_interval(self.bag_fraction, "bag_fraction")?;
        validate_at_least_one(self.n_trees, "n_trees")?;
        validate_at_least_one(self.interaction_depth, "interaction_depth")?;
        validate_at_least_one(self.min_obs_in_node, "min_obs_in_node")?;
        validate_at_least_one(self.max_categories, "max_categories")?;
        if let Distribution::TDist { nu } = self.distribution {
            if nu.is_nan() || nu <= 0.0 {
                return Err(GbmError::InvalidParameter(
                    "nu".to_string(),
                    "positive real value".to_string(),
                    nu.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// IO
pub trait BoosterIO: Serialize + DeserializeOwned + Sized {
    /// Save a booster as a json object to a file.
    ///
    /// * `path` - Path to save booster.
    fn save_booster<P: AsRef<Path>>(&self, path: P) -> Result<(), GbmError> {
        fs::write(path, self.json_dump()?).map_err(|e| GbmError::UnableToWrite(e.to_string()))
    }

    /// Dump a booster as a json object
    fn json_dump(&self) -> Result<String, GbmError> {
        serde_json::to_string(self).map_err(|e| GbmError::UnableToWrite(e.to_string()))
    }

    /// Load a booster from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, GbmError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| GbmError::UnableToRead(e.to_string()))
    }

    /// Load a booster from a path to a json booster object.
    ///
    /// * `path` - Path to load booster from.
    fn load_booster<P: AsRef<Path>>(path: P) -> Result<Self, GbmError> {
        let json_str = fs::read_to_string(path).map_err(|e| GbmError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl BoosterIO for BoosterConfig {}
