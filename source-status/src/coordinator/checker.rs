//! Batch status check collaborator.
//!
//! The coordinator never talks to the backend itself. It hands a batch of ids
//! to a [`BatchChecker`] and merges whatever comes back.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{ResourceId, StatusRecord};

/// Trait for batch status checking.
///
/// Implementations must accept any non-empty subset of ids in any order and
/// may return records for fewer ids than requested; ids without a record are
/// simply polled again on the next cycle. Returning `Err` fails the whole
/// batch.
#[async_trait]
pub trait BatchChecker: Send + Sync + 'static {
    /// Check the status of a batch of resources.
    async fn batch_check(
        &self,
        ids: &[ResourceId],
    ) -> Result<HashMap<ResourceId, StatusRecord>, CheckError>;
}

/// Error type for batch check operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    /// Error message.
    pub message: String,
    /// Whether this error is transient (can be retried).
    pub transient: bool,
}

impl CheckError {
    /// Create a transient error (can be retried).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    /// Create a permanent error (should not be retried).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CheckError {}
