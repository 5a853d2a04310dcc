// public modules
pub mod config;
pub mod core;
pub mod predict;

// private modules
mod setters;

pub use self::core::{GbmBooster, TrainingHistory};
