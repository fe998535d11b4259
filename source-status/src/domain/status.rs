//! Data source liveness states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Liveness state of a data source as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    /// Nothing is known about the source yet.
    #[default]
    Unknown,
    /// The backend is still probing the connection.
    Testing,
    /// The connection is reachable.
    Active,
    /// The connection could not be established.
    Inactive,
    /// Credentials are required before the connection can be tested.
    NoPassword,
    /// The source has been disabled.
    Disabled,
}

impl SourceStatus {
    /// All states, in declaration order.
    pub const ALL: [SourceStatus; 6] = [
        Self::Unknown,
        Self::Testing,
        Self::Active,
        Self::Inactive,
        Self::NoPassword,
        Self::Disabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Testing => "TESTING",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::NoPassword => "NO_PASSWORD",
            Self::Disabled => "DISABLED",
        }
    }

    /// Terminal states are not polled again automatically.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Testing)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SourceStatus::Unknown, false)]
    #[case(SourceStatus::Testing, false)]
    #[case(SourceStatus::Active, true)]
    #[case(SourceStatus::Inactive, true)]
    #[case(SourceStatus::NoPassword, true)]
    #[case(SourceStatus::Disabled, true)]
    fn test_is_terminal(#[case] status: SourceStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SourceStatus::NoPassword).unwrap();
        assert_eq!(json, "\"NO_PASSWORD\"");

        let status: SourceStatus = serde_json::from_str("\"DISABLED\"").unwrap();
        assert_eq!(status, SourceStatus::Disabled);
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(SourceStatus::default(), SourceStatus::Unknown);
    }
}
