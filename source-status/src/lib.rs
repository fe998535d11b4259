//! source-status library crate.
//!
//! Asynchronous liveness polling and caching for data sources. Callers
//! enqueue the sources they care about, a [`StatusCoordinator`] batches the
//! requests towards a [`BatchChecker`], and the latest answers are read
//! synchronously from the [`StatusCache`].

pub mod coordinator;
pub mod domain;
pub mod error;
pub mod monitor;

pub use coordinator::{
    BatchChecker, CheckError, CoordinatorConfig, CoordinatorHandle, CoordinatorMode,
    StatusCoordinator, spawn, spawn_with_token,
};
pub use domain::{ResourceId, SourceStatus, StatusRecord};
pub use error::{Error, Result};
pub use monitor::{StatusCache, StatusEvent};
