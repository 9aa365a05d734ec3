use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of statutory or regulatory obligation. Open set, catalog-driven.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeadlineType {
    OaResponseDue,
    IssueFeeDue,
    AppealDue,
    Other(String),
}

impl DeadlineType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "oa_response_due" => Self::OaResponseDue,
            "issue_fee_due" => Self::IssueFeeDue,
            "appeal_due" => Self::AppealDue,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OaResponseDue => "oa_response_due",
            Self::IssueFeeDue => "issue_fee_due",
            Self::AppealDue => "appeal_due",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for DeadlineType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DeadlineType> for String {
    fn from(value: DeadlineType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Open,
    Satisfied,
    Cancelled,
    Superseded,
}

impl DeadlineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Satisfied => "satisfied",
            Self::Cancelled => "cancelled",
            Self::Superseded => "superseded",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "satisfied" => Some(Self::Satisfied),
            "cancelled" => Some(Self::Cancelled),
            "superseded" => Some(Self::Superseded),
            _ => None,
        }
    }

    /// True for every status except `Open`; all non-open statuses are terminal.
    pub fn is_terminal(self) -> bool {
        self != Self::Open
    }
}

/// A due date caused by an event. Never exists without its triggering event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    pub id: Uuid,
    pub case_id: Uuid,
    pub triggering_event: Uuid,
    pub deadline_type: DeadlineType,
    pub due_date: NaiveDate,
    pub status: DeadlineStatus,
    /// Replacement deadline, set when an extension supersedes this one.
    pub superseded_by: Option<Uuid>,
    /// Citation of the rule that produced the due date.
    pub rule_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deadline {
    pub fn is_open(&self) -> bool {
        self.status == DeadlineStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::{DeadlineStatus, DeadlineType};

    #[test]
    fn deadline_type_falls_back_to_raw_string() {
        assert_eq!(
            DeadlineType::parse("annuity_due").as_str(),
            "annuity_due"
        );
        assert_eq!(
            DeadlineType::parse("oa_response_due"),
            DeadlineType::OaResponseDue
        );
    }

    #[test]
    fn only_open_is_non_terminal() {
        assert!(!DeadlineStatus::Open.is_terminal());
        assert!(DeadlineStatus::Satisfied.is_terminal());
        assert!(DeadlineStatus::Cancelled.is_terminal());
        assert!(DeadlineStatus::Superseded.is_terminal());
    }
}
