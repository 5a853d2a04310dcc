//! Errors
//!
//! Custom error types used throughout the `gbmtree` crate.
use thiserror::Error;

/// Errors that can occur while growing trees or fitting the booster.
///
/// None of these are retried internally, any of them aborts the current fit.
#[derive(Debug, Error)]
pub enum GbmError {
    /// The presorted order of a column is inconsistent with its values.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),
    /// A required buffer, count or argument is unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// An internal tree invariant does not hold.
    #[error("Structural error: {0}")]
    Structural(String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write model to file.
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model from file.
    #[error("Unable to read model from a file {0}")]
    UnableToRead(String),
}
