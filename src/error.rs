//! Error taxonomy.
//!
//! Informational outcomes (unmapped document kinds, idempotency hits,
//! per-spec calendar failures) are not errors; they travel inside the
//! derivation report. Everything here either rejects a single operation
//! (validation), flags a defect (integrity), or propagates a collaborator
//! failure.

use thiserror::Error;
use uuid::Uuid;

/// Configuration resolution failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Rule catalog loading/parsing failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read rule catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule catalog TOML: {0}")]
    Parse(String),
    #[error("invalid rule entry: {0}")]
    InvalidRule(String),
}

/// Calendar provider failures. Inside deadline fan-out these are isolated
/// per spec and reported, not propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("unsupported jurisdiction '{0}'")]
    UnsupportedJurisdiction(String),
    #[error("due date calculation failed: {0}")]
    Calculation(String),
}

/// Persistence collaborator failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case {0} not found in store")]
    CaseMissing(Uuid),
    #[error("case {case_id} already exists")]
    CaseExists { case_id: Uuid },
    #[error("stale commit for case {case_id}: expected revision {expected}, store at {found}")]
    RevisionConflict {
        case_id: Uuid,
        expected: u64,
        found: u64,
    },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Entity family, for validation error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Document,
    Event,
    Deadline,
    Task,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Event => "event",
            Self::Deadline => "deadline",
            Self::Task => "task",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broken cross-entity invariant. Must never surface when the
/// components are composed correctly; carrying the invariant name and the
/// offending ids makes the defect diagnosable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("deadline {deadline} references event {event} outside its case")]
    OrphanDeadline { deadline: Uuid, event: Uuid },
    #[error("event {event} references document {document} outside its case")]
    OrphanEvent { event: Uuid, document: Uuid },
    #[error("task {task} references missing trigger {trigger}")]
    OrphanTask { task: Uuid, trigger: Uuid },
    #[error("deadline {deadline} is open but its triggering event {event} is cancelled")]
    OpenDeadlineUnderCancelledEvent { deadline: Uuid, event: Uuid },
    #[error("task {task} is open but its triggering event {event} is cancelled")]
    OpenTaskUnderCancelledEvent { task: Uuid, event: Uuid },
    #[error("task {task} is open but its triggering deadline {deadline} is superseded")]
    OpenTaskUnderSupersededDeadline { task: Uuid, deadline: Uuid },
    #[error("events {first} and {second} share derivation key '{key}'")]
    DuplicateDerivation {
        first: Uuid,
        second: Uuid,
        key: String,
    },
    #[error("deadline {deadline} is superseded but has no superseding deadline")]
    DanglingSupersession { deadline: Uuid },
}

/// Errors surfaced by case aggregate operations.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("case {0} not found")]
    CaseNotFound(Uuid),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("{kind} {id} is already in terminal status {status}")]
    AlreadyTerminal {
        kind: EntityKind,
        id: Uuid,
        status: String,
    },
    #[error("invalid {kind} transition for {id}: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        id: Uuid,
        from: String,
        to: String,
    },
    #[error("deadline {0} is not open")]
    NotOpen(Uuid),
    #[error("case {0} is closed; new events, deadlines, and tasks are forbidden")]
    CaseClosed(Uuid),
    #[error("invariant violation: {0}")]
    Invariant(#[from] IntegrityViolation),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CaseResult<T> = Result<T, CaseError>;
