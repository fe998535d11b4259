//! Cached status snapshots.

use serde::{Deserialize, Serialize};

use super::{ResourceId, SourceStatus};

/// Status snapshot for a single resource, as returned by a batch check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub resource_id: ResourceId,
    pub status: SourceStatus,
    /// Backend error code, when the check failed for this resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Kind of resource (e.g. "mysql", "postgresql").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl StatusRecord {
    pub fn new(resource_id: ResourceId, status: SourceStatus) -> Self {
        Self {
            resource_id,
            status,
            error_code: None,
            error_message: None,
            resource_type: None,
        }
    }

    /// Record for a resource whose status could not be determined.
    pub fn unknown(resource_id: ResourceId, reason: impl Into<String>) -> Self {
        Self::new(resource_id, SourceStatus::Unknown).with_error(None, reason)
    }

    pub fn with_error(mut self, code: Option<String>, message: impl Into<String>) -> Self {
        self.error_code = code;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let record = StatusRecord::new(ResourceId::new(3), SourceStatus::Inactive)
            .with_error(Some("E_CONN".to_string()), "connection refused")
            .with_resource_type("mysql");

        assert!(record.is_terminal());
        assert_eq!(record.error_code.as_deref(), Some("E_CONN"));
        assert_eq!(record.error_message.as_deref(), Some("connection refused"));
        assert_eq!(record.resource_type.as_deref(), Some("mysql"));
    }

    #[test]
    fn test_unknown_is_pending() {
        let record = StatusRecord::unknown(ResourceId::new(1), "timed out");
        assert_eq!(record.status, SourceStatus::Unknown);
        assert!(!record.is_terminal());
        assert_eq!(record.error_code, None);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let record = StatusRecord::new(ResourceId::new(9), SourceStatus::Active);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "resource_id": 9, "status": "ACTIVE" })
        );

        let parsed: StatusRecord =
            serde_json::from_str(r#"{"resource_id":9,"status":"TESTING"}"#).unwrap();
        assert_eq!(parsed.status, SourceStatus::Testing);
        assert_eq!(parsed.error_message, None);
    }
}
