//! Domain types for data source status tracking.

mod record;
mod resource;
mod status;

pub use record::StatusRecord;
pub use resource::ResourceId;
pub use status::SourceStatus;
