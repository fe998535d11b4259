//! Crate-wide error types.

use thiserror::Error;

use crate::coordinator::CheckError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Status coordinator has stopped")]
    CoordinatorStopped,

    #[error("Batch check failed: {0}")]
    Check(#[from] CheckError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error means the coordinator is gone for good.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::CoordinatorStopped)
    }
}
