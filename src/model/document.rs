use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of an ingested document.
///
/// The set is open: the rule catalog may introduce new kinds without a
/// rebuild, so unknown strings are preserved in `Other` instead of being
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentKind {
    OfficeAction,
    ApplicantResponse,
    FeeNotice,
    Assignment,
    Other(String),
}

impl DocumentKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "office_action" => Self::OfficeAction,
            "applicant_response" => Self::ApplicantResponse,
            "fee_notice" => Self::FeeNotice,
            "assignment" => Self::Assignment,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OfficeAction => "office_action",
            Self::ApplicantResponse => "applicant_response",
            Self::FeeNotice => "fee_notice",
            Self::Assignment => "assignment",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for DocumentKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DocumentKind> for String {
    fn from(kind: DocumentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who handed the document to the firm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    IssuingOffice,
    Agent,
    Client,
    Internal,
}

impl DocumentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssuingOffice => "issuing_office",
            Self::Agent => "agent",
            Self::Client => "client",
            Self::Internal => "internal",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "issuing_office" => Some(Self::IssuingOffice),
            "agent" => Some(Self::Agent),
            "client" => Some(Self::Client),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

/// An ingested artifact attached to a case.
///
/// Documents are immutable once created; the only later mutation is the
/// `superseded` flag set when a re-classification replaces the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub case_id: Uuid,
    pub kind: DocumentKind,
    pub source: DocumentSource,
    pub title: String,
    pub received_at: DateTime<Utc>,
    /// How the source system names this document (e.g. an office mailing number).
    pub external_ref: Option<String>,
    /// Opaque handle into the external content store.
    pub content_ref: Option<String>,
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
}
