//! Resource identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a pollable resource (a data source / connection record).
///
/// Ids are issued by the backend and are always positive; zero and negative
/// values stand in for "no id" and are ignored wherever ids are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(i64);

impl ResourceId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this id can name a real resource.
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ResourceId> for i64 {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(ResourceId::new(1).is_valid());
        assert!(!ResourceId::new(0).is_valid());
        assert!(!ResourceId::new(-7).is_valid());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&ResourceId::new(42)).unwrap();
        assert_eq!(json, "42");

        let id: ResourceId = serde_json::from_str("17").unwrap();
        assert_eq!(id, ResourceId::from(17));
    }
}
