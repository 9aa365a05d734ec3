use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of work item. Open set, catalog-driven.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    DraftOaResponse,
    FileResponse,
    PayFee,
    DocketReview,
    Other(String),
}

impl TaskType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "draft_oa_response" => Self::DraftOaResponse,
            "file_response" => Self::FileResponse,
            "pay_fee" => Self::PayFee,
            "docket_review" => Self::DocketReview,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DraftOaResponse => "draft_oa_response",
            Self::FileResponse => "file_response",
            Self::PayFee => "pay_fee",
            Self::DocketReview => "docket_review",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for TaskType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Pending and in-progress tasks are still workable; done and
    /// cancelled are terminal.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// What caused a task: exactly one of an event or a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskTrigger {
    Event(Uuid),
    Deadline(Uuid),
}

impl TaskTrigger {
    pub fn id(self) -> Uuid {
        match self {
            Self::Event(id) | Self::Deadline(id) => id,
        }
    }
}

/// An actionable work item caused by an event or deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub case_id: Uuid,
    pub trigger: TaskTrigger,
    pub task_type: TaskType,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Internal working due date; for deadline-triggered tasks this sits
    /// `lead_days` before the statutory due date.
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
