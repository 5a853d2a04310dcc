// Modules
pub mod booster;
pub mod categorical;
pub mod constants;
pub mod constraints;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod node;
pub mod sampler;
pub mod split;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use booster::GbmBooster;
pub use data::{Dataset, Matrix};
pub use distribution::Distribution;
