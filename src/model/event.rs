use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical procedural occurrence on a case.
///
/// Open set: the rule catalog is data-driven and may map documents onto
/// event types this build has never seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    OaReceived,
    ResponseFiled,
    FeePaid,
    ExtensionGranted,
    Other(String),
}

impl EventType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "oa_received" => Self::OaReceived,
            "response_filed" => Self::ResponseFiled,
            "fee_paid" => Self::FeePaid,
            "extension_granted" => Self::ExtensionGranted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OaReceived => "oa_received",
            Self::ResponseFiled => "response_filed",
            Self::FeePaid => "fee_paid",
            Self::ExtensionGranted => "extension_granted",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Idempotency fingerprint preventing duplicate event derivation.
///
/// Two derivation runs over the same document against the same catalog
/// version produce the same key, so the second run is a no-op.
pub fn derivation_key(document_id: Uuid, catalog_version: &str, event_type: &EventType) -> String {
    format!("{document_id}:{catalog_version}:{event_type}")
}

/// A procedural event, derived from a document or logged directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEvent {
    pub id: Uuid,
    pub case_id: Uuid,
    /// Absent for case-internal events logged by hand.
    pub source_document: Option<Uuid>,
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub status: EventStatus,
    /// Set only on derived events; manual events carry no derivation key.
    pub derivation_key: Option<String>,
    /// Prior deadline an extension grant replaces.
    pub extends_deadline: Option<Uuid>,
    /// Length of the granted extension, in calendar days.
    pub extension_days: Option<i64>,
    pub note: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CaseEvent {
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{EventType, derivation_key};

    #[test]
    fn event_type_preserves_catalog_supplied_values() {
        let parsed = EventType::parse("restriction_received");
        assert_eq!(parsed.as_str(), "restriction_received");
        assert_eq!(
            EventType::parse("extension_granted"),
            EventType::ExtensionGranted
        );
    }

    #[test]
    fn derivation_key_is_stable_per_document_and_version() {
        let doc = Uuid::new_v4();
        let a = derivation_key(doc, "2026.1", &EventType::OaReceived);
        let b = derivation_key(doc, "2026.1", &EventType::OaReceived);
        assert_eq!(a, b);
        let bumped = derivation_key(doc, "2026.2", &EventType::OaReceived);
        assert_ne!(a, bumped);
    }
}
