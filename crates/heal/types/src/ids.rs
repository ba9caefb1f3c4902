//! Strongly-typed identifiers for HEAL entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an incident
///
/// Generated ids have the form `INC-YYYYMMDD-xxxxxx`, where the date is the
/// creation day and the suffix is six lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(String);

impl IncidentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id stamped with the given creation time
    pub fn generate(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("INC-{}-{}", at.format("%Y%m%d"), &suffix[..6]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for IncidentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_incident_id_generation() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let id1 = IncidentId::generate(at);
        let id2 = IncidentId::generate(at);
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("INC-20260314-"));
        assert_eq!(id1.as_str().len(), "INC-20260314-".len() + 6);
    }

    #[test]
    fn test_incident_id_serializes_as_plain_string() {
        let id = IncidentId::new("INC-20260101-abcdef");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"INC-20260101-abcdef\"");
    }
}
