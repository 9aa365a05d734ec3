//! Persistence collaborator contract.
//!
//! The core is specified against [`CaseStore`], not a database. A store
//! hands out committed snapshots and applies whole [`CaseChangeSet`]s as
//! one transactional unit: either every staged row lands or none does.
//! Revisions give the store a staleness check independent of the
//! aggregate's per-case lock.

mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{AuditEntry, Case, CaseEvent, CaseSnapshot, Deadline, Document, Task};

pub use memory::MemoryStore;

/// Unit of work for one case: entity upserts plus appended audit history,
/// committed against an expected revision.
#[derive(Debug, Clone, Default)]
pub struct CaseChangeSet {
    pub case_id: Uuid,
    pub expected_revision: u64,
    /// Replacement case row, when the case itself changed.
    pub case: Option<Case>,
    pub documents: Vec<Document>,
    pub events: Vec<CaseEvent>,
    pub deadlines: Vec<Deadline>,
    pub tasks: Vec<Task>,
    pub history: Vec<AuditEntry>,
}

impl CaseChangeSet {
    pub fn new(case_id: Uuid, expected_revision: u64) -> Self {
        Self {
            case_id,
            expected_revision,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.case.is_none()
            && self.documents.is_empty()
            && self.events.is_empty()
            && self.deadlines.is_empty()
            && self.tasks.is_empty()
            && self.history.is_empty()
    }

    /// Apply every staged change to a snapshot and bump its revision.
    ///
    /// Both the aggregate (to validate the post-state) and the store (to
    /// commit) run this same routine, so the state that was validated is
    /// the state that lands.
    pub fn apply_to(&self, snapshot: &mut CaseSnapshot) {
        if let Some(case) = &self.case {
            snapshot.case = case.clone();
        }
        for document in &self.documents {
            snapshot.documents.insert(document.id, document.clone());
        }
        for event in &self.events {
            snapshot.events.insert(event.id, event.clone());
        }
        for deadline in &self.deadlines {
            snapshot.deadlines.insert(deadline.id, deadline.clone());
        }
        for task in &self.tasks {
            snapshot.tasks.insert(task.id, task.clone());
        }
        snapshot.history.extend(self.history.iter().cloned());
        snapshot.revision += 1;
    }
}

/// Abstract repository for cases and their owned entities.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Persist a brand-new case snapshot. Fails if the id is taken.
    async fn insert_case(&self, snapshot: CaseSnapshot) -> Result<(), StoreError>;

    /// Committed snapshot of one case, or `None` if unknown. Always
    /// observes a fully-committed state, never a mid-cascade one.
    async fn load_case(&self, case_id: Uuid) -> Result<Option<CaseSnapshot>, StoreError>;

    /// Atomically apply a change set. All-or-nothing: a revision conflict
    /// or backend failure leaves the stored case untouched.
    async fn commit(&self, changes: CaseChangeSet) -> Result<(), StoreError>;

    async fn list_case_ids(&self) -> Result<Vec<Uuid>, StoreError>;
}
