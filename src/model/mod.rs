//! Entity types for the docketing core.
//!
//! A case exclusively owns its documents, events, deadlines, and tasks.
//! Cross-entity references are ID lookups inside the same case, never
//! embedded references, which keeps cascade logic a matter of scanning
//! arena maps. Entities are retired by status transition and never removed;
//! the per-case `history` keeps the append-only audit trail of every
//! status change.

mod deadline;
mod document;
mod event;
mod task;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use deadline::{Deadline, DeadlineStatus, DeadlineType};
pub use document::{Document, DocumentKind, DocumentSource};
pub use event::{CaseEvent, EventStatus, EventType, derivation_key};
pub use task::{Task, TaskPriority, TaskStatus, TaskTrigger, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Closed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// One patent matter; the unit of transactional consistency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub jurisdiction: String,
    pub status: CaseStatus,
    pub application_number: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Which entity an audit entry concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Case(Uuid),
    Document(Uuid),
    Event(Uuid),
    Deadline(Uuid),
    Task(Uuid),
}

/// Append-only record of a status transition.
///
/// `from` is absent for creation entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub subject: EntityRef,
    pub from: Option<String>,
    pub to: String,
    pub note: Option<String>,
}

impl AuditEntry {
    pub fn created(at: DateTime<Utc>, subject: EntityRef, status: &str) -> Self {
        Self {
            at,
            subject,
            from: None,
            to: status.to_string(),
            note: None,
        }
    }

    pub fn transition(
        at: DateTime<Utc>,
        subject: EntityRef,
        from: &str,
        to: &str,
        note: Option<String>,
    ) -> Self {
        Self {
            at,
            subject,
            from: Some(from.to_string()),
            to: to.to_string(),
            note,
        }
    }
}

/// Full committed state of one case: the case row, its entity arenas, and
/// the audit history. Reads observe a cloned snapshot; mutations stage a
/// change set against one and commit it atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub case: Case,
    pub documents: HashMap<Uuid, Document>,
    pub events: HashMap<Uuid, CaseEvent>,
    pub deadlines: HashMap<Uuid, Deadline>,
    pub tasks: HashMap<Uuid, Task>,
    pub history: Vec<AuditEntry>,
    /// Monotonic commit counter used by the store's staleness check.
    pub revision: u64,
}

impl CaseSnapshot {
    pub fn new(case: Case) -> Self {
        let created = AuditEntry::created(
            case.created_at,
            EntityRef::Case(case.id),
            case.status.as_str(),
        );
        Self {
            case,
            documents: HashMap::new(),
            events: HashMap::new(),
            deadlines: HashMap::new(),
            tasks: HashMap::new(),
            history: vec![created],
            revision: 0,
        }
    }

    /// Active event carrying the given derivation key, if any.
    pub fn active_event_for_key(&self, key: &str) -> Option<&CaseEvent> {
        self.events
            .values()
            .find(|event| event.is_active() && event.derivation_key.as_deref() == Some(key))
    }

    /// Deadlines caused by one event, in no particular order.
    pub fn deadlines_for_event(&self, event_id: Uuid) -> impl Iterator<Item = &Deadline> {
        self.deadlines
            .values()
            .filter(move |deadline| deadline.triggering_event == event_id)
    }

    /// Tasks caused by one trigger entity, in no particular order.
    pub fn tasks_for_trigger(&self, trigger: TaskTrigger) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(move |task| task.trigger == trigger)
    }
}
