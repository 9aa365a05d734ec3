//! Case aggregate: the single mutation authority.
//!
//! Every mutating operation follows the same shape: take the per-case
//! lock, load the committed snapshot, stage a change set against a
//! working copy (including any slow catalog/calendar calls), validate the
//! cross-entity invariants on the staged post-state, then commit the
//! whole change set through the store's unit of work. Nothing partial is
//! ever observable: a failure anywhere drops the staged copy on the
//! floor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::calendar::CalendarProvider;
use crate::derive::{
    DeadlineComputation, TaskSeed, compute_deadlines, derive_events, generate_tasks,
};
use crate::error::{CaseError, CaseResult, EntityKind, IntegrityViolation};
use crate::model::{
    AuditEntry, Case, CaseEvent, CaseSnapshot, CaseStatus, Deadline, DeadlineStatus, Document,
    DocumentKind, DocumentSource, EntityRef, EventStatus, EventType, Task, TaskStatus,
    TaskTrigger,
};
use crate::rules::RuleCatalog;
use crate::store::{CaseChangeSet, CaseStore};

#[derive(Debug, Clone)]
pub struct CreateCaseParams {
    pub jurisdiction: String,
    pub application_number: Option<String>,
    pub filing_date: Option<NaiveDate>,
}

/// Intake hand-off for one classified document. The intake layer owns
/// classification; the core trusts `kind`.
#[derive(Debug, Clone)]
pub struct SubmitDocument {
    pub kind: DocumentKind,
    pub source: DocumentSource,
    pub title: String,
    pub received_at: DateTime<Utc>,
    pub external_ref: Option<String>,
    pub content_ref: Option<String>,
    /// Event occurrence override; defaults to the received timestamp.
    pub occurred_override: Option<DateTime<Utc>>,
    /// Application number spotted by intake, used to enrich the case.
    pub application_number: Option<String>,
}

/// A case-internal event logged by hand rather than derived.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub extends_deadline: Option<Uuid>,
    pub extension_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipNote {
    pub document_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedNote {
    pub deadline_type: String,
    pub reason: String,
}

/// What one derivation operation did: created/skipped/no-op counts for
/// the caller's visibility. Informational entries (skips, idempotency
/// hits, unresolved specs) live here, never in the error channel.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DerivationReport {
    pub case_id: Uuid,
    pub document_id: Option<Uuid>,
    pub events_created: Vec<Uuid>,
    pub events_already_active: Vec<Uuid>,
    pub skipped: Vec<SkipNote>,
    pub deadlines_created: Vec<Uuid>,
    pub deadlines_superseded: Vec<Uuid>,
    pub unresolved_specs: Vec<UnresolvedNote>,
    pub tasks_created: Vec<Uuid>,
    pub tasks_cancelled: Vec<Uuid>,
}

/// Staged mutation of one case: a working snapshot mutated in place plus
/// the change set mirroring every touched row.
struct Txn {
    snap: CaseSnapshot,
    changes: CaseChangeSet,
    now: DateTime<Utc>,
}

impl Txn {
    fn begin(snapshot: CaseSnapshot, now: DateTime<Utc>) -> Self {
        let changes = CaseChangeSet::new(snapshot.case.id, snapshot.revision);
        Self {
            snap: snapshot,
            changes,
            now,
        }
    }

    fn audit(&mut self, entry: AuditEntry) {
        self.snap.history.push(entry.clone());
        self.changes.history.push(entry);
    }

    fn set_case(&mut self, case: Case) {
        self.snap.case = case.clone();
        self.changes.case = Some(case);
    }

    fn create_document(&mut self, document: Document) {
        self.audit(AuditEntry::created(
            self.now,
            EntityRef::Document(document.id),
            "received",
        ));
        self.changes.documents.push(document.clone());
        self.snap.documents.insert(document.id, document);
    }

    fn create_event(&mut self, event: CaseEvent) {
        self.audit(AuditEntry::created(
            self.now,
            EntityRef::Event(event.id),
            event.status.as_str(),
        ));
        self.changes.events.push(event.clone());
        self.snap.events.insert(event.id, event);
    }

    fn create_deadline(&mut self, deadline: Deadline) {
        self.audit(AuditEntry::created(
            self.now,
            EntityRef::Deadline(deadline.id),
            deadline.status.as_str(),
        ));
        self.changes.deadlines.push(deadline.clone());
        self.snap.deadlines.insert(deadline.id, deadline);
    }

    fn create_task(&mut self, task: Task) {
        self.audit(AuditEntry::created(
            self.now,
            EntityRef::Task(task.id),
            task.status.as_str(),
        ));
        self.changes.tasks.push(task.clone());
        self.snap.tasks.insert(task.id, task);
    }

    fn supersede_document(&mut self, document_id: Uuid) {
        if let Some(document) = self.snap.documents.get_mut(&document_id) {
            document.superseded = true;
            let document = document.clone();
            self.audit(AuditEntry::transition(
                self.now,
                EntityRef::Document(document_id),
                "received",
                "superseded",
                None,
            ));
            self.changes.documents.push(document);
        }
    }

    fn cancel_event(&mut self, event_id: Uuid, reason: &str) {
        if let Some(event) = self.snap.events.get_mut(&event_id) {
            let from = event.status;
            event.status = EventStatus::Cancelled;
            event.cancel_reason = Some(reason.to_string());
            let event = event.clone();
            self.audit(AuditEntry::transition(
                self.now,
                EntityRef::Event(event_id),
                from.as_str(),
                EventStatus::Cancelled.as_str(),
                Some(reason.to_string()),
            ));
            self.changes.events.push(event);
        }
    }

    fn set_deadline_status(&mut self, deadline_id: Uuid, to: DeadlineStatus, note: Option<String>) {
        if let Some(deadline) = self.snap.deadlines.get_mut(&deadline_id) {
            let from = deadline.status;
            deadline.status = to;
            let deadline = deadline.clone();
            self.audit(AuditEntry::transition(
                self.now,
                EntityRef::Deadline(deadline_id),
                from.as_str(),
                to.as_str(),
                note,
            ));
            self.changes.deadlines.push(deadline);
        }
    }

    fn supersede_deadline(&mut self, deadline_id: Uuid, replacement: Uuid) {
        if let Some(deadline) = self.snap.deadlines.get_mut(&deadline_id) {
            deadline.superseded_by = Some(replacement);
        }
        self.set_deadline_status(
            deadline_id,
            DeadlineStatus::Superseded,
            Some(format!("superseded by deadline {replacement}")),
        );
    }

    fn set_task_status(&mut self, task_id: Uuid, to: TaskStatus, note: Option<String>) {
        if let Some(task) = self.snap.tasks.get_mut(&task_id) {
            let from = task.status;
            task.status = to;
            let task = task.clone();
            self.audit(AuditEntry::transition(
                self.now,
                EntityRef::Task(task_id),
                from.as_str(),
                to.as_str(),
                note,
            ));
            self.changes.tasks.push(task);
        }
    }
}

/// Check cross-entity consistency on a staged post-state. A violation
/// here is a composition defect, not a caller mistake.
pub(crate) fn validate_snapshot(snapshot: &CaseSnapshot) -> Result<(), IntegrityViolation> {
    for event in snapshot.events.values() {
        if let Some(document_id) = event.source_document
            && !snapshot.documents.contains_key(&document_id)
        {
            return Err(IntegrityViolation::OrphanEvent {
                event: event.id,
                document: document_id,
            });
        }
    }

    for deadline in snapshot.deadlines.values() {
        let Some(trigger) = snapshot.events.get(&deadline.triggering_event) else {
            return Err(IntegrityViolation::OrphanDeadline {
                deadline: deadline.id,
                event: deadline.triggering_event,
            });
        };
        if deadline.is_open() && trigger.status == EventStatus::Cancelled {
            return Err(IntegrityViolation::OpenDeadlineUnderCancelledEvent {
                deadline: deadline.id,
                event: trigger.id,
            });
        }
        if deadline.status == DeadlineStatus::Superseded
            && !deadline
                .superseded_by
                .is_some_and(|id| snapshot.deadlines.contains_key(&id))
        {
            return Err(IntegrityViolation::DanglingSupersession {
                deadline: deadline.id,
            });
        }
    }

    for task in snapshot.tasks.values() {
        match task.trigger {
            TaskTrigger::Event(event_id) => {
                let Some(event) = snapshot.events.get(&event_id) else {
                    return Err(IntegrityViolation::OrphanTask {
                        task: task.id,
                        trigger: event_id,
                    });
                };
                if task.is_open() && event.status == EventStatus::Cancelled {
                    return Err(IntegrityViolation::OpenTaskUnderCancelledEvent {
                        task: task.id,
                        event: event_id,
                    });
                }
            }
            TaskTrigger::Deadline(deadline_id) => {
                let Some(deadline) = snapshot.deadlines.get(&deadline_id) else {
                    return Err(IntegrityViolation::OrphanTask {
                        task: task.id,
                        trigger: deadline_id,
                    });
                };
                if task.is_open() {
                    if deadline.status == DeadlineStatus::Superseded {
                        return Err(IntegrityViolation::OpenTaskUnderSupersededDeadline {
                            task: task.id,
                            deadline: deadline_id,
                        });
                    }
                    if let Some(event) = snapshot.events.get(&deadline.triggering_event)
                        && event.status == EventStatus::Cancelled
                    {
                        return Err(IntegrityViolation::OpenTaskUnderCancelledEvent {
                            task: task.id,
                            event: event.id,
                        });
                    }
                }
            }
        }
    }

    let mut seen: HashMap<&str, Uuid> = HashMap::new();
    for event in snapshot.events.values() {
        if event.is_active()
            && let Some(key) = event.derivation_key.as_deref()
            && let Some(first) = seen.insert(key, event.id)
        {
            return Err(IntegrityViolation::DuplicateDerivation {
                first,
                second: event.id,
                key: key.to_string(),
            });
        }
    }

    Ok(())
}

/// Orchestrator and invariant enforcer for all cases.
///
/// Mutations on one case are linearized behind a per-case async lock;
/// operations on different cases share nothing and run in parallel.
pub struct CaseAggregate {
    store: Arc<dyn CaseStore>,
    catalog: Arc<RuleCatalog>,
    calendar: Arc<dyn CalendarProvider>,
    locks: StdMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl CaseAggregate {
    pub fn new(
        store: Arc<dyn CaseStore>,
        catalog: Arc<RuleCatalog>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Self {
        Self {
            store,
            catalog,
            calendar,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    fn lock_for(&self, case_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(case_id).or_default().clone()
    }

    async fn load(&self, case_id: Uuid) -> CaseResult<CaseSnapshot> {
        self.store
            .load_case(case_id)
            .await?
            .ok_or(CaseError::CaseNotFound(case_id))
    }

    /// Validate the staged post-state and commit it atomically.
    async fn finish(&self, txn: Txn) -> CaseResult<()> {
        validate_snapshot(&txn.snap)?;
        if txn.changes.is_empty() {
            return Ok(());
        }
        self.store.commit(txn.changes).await?;
        Ok(())
    }

    pub async fn create_case(&self, params: CreateCaseParams) -> CaseResult<Uuid> {
        let now = Utc::now();
        let case = Case {
            id: Uuid::new_v4(),
            jurisdiction: params.jurisdiction.trim().to_ascii_uppercase(),
            status: CaseStatus::Open,
            application_number: params.application_number,
            filing_date: params.filing_date,
            created_at: now,
        };
        let case_id = case.id;
        self.store.insert_case(CaseSnapshot::new(case)).await?;
        tracing::info!(case = %case_id, "case created");
        Ok(case_id)
    }

    /// Committed snapshot of a case. Never observes a mid-cascade state.
    pub async fn case(&self, case_id: Uuid) -> CaseResult<CaseSnapshot> {
        self.load(case_id).await
    }

    /// Persist a document and run the full derivation pipeline for it.
    pub async fn ingest_document(
        &self,
        case_id: Uuid,
        submission: SubmitDocument,
    ) -> CaseResult<DerivationReport> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        if snapshot.case.status == CaseStatus::Closed {
            return Err(CaseError::CaseClosed(case_id));
        }

        let now = Utc::now();
        let mut txn = Txn::begin(snapshot, now);
        let mut report = DerivationReport {
            case_id,
            ..Default::default()
        };

        if txn.snap.case.application_number.is_none() && submission.application_number.is_some() {
            let mut case = txn.snap.case.clone();
            case.application_number = submission.application_number.clone();
            txn.set_case(case);
        }

        let document = Document {
            id: Uuid::new_v4(),
            case_id,
            kind: submission.kind,
            source: submission.source,
            title: submission.title,
            received_at: submission.received_at,
            external_ref: submission.external_ref,
            content_ref: submission.content_ref,
            superseded: false,
            created_at: now,
        };
        report.document_id = Some(document.id);
        txn.create_document(document.clone());

        self.derive_for_document(&mut txn, &document, submission.occurred_override, &mut report)?;

        self.finish(txn).await?;
        tracing::info!(
            case = %case_id,
            events = report.events_created.len(),
            deadlines = report.deadlines_created.len(),
            tasks = report.tasks_created.len(),
            skipped = report.skipped.len(),
            "document ingested"
        );
        Ok(report)
    }

    /// Re-run event derivation for an already-ingested document.
    ///
    /// A no-op when the current catalog version already produced its
    /// events; after a catalog bump or an event cancellation it derives
    /// afresh.
    pub async fn rederive_document(
        &self,
        case_id: Uuid,
        document_id: Uuid,
    ) -> CaseResult<DerivationReport> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        if snapshot.case.status == CaseStatus::Closed {
            return Err(CaseError::CaseClosed(case_id));
        }
        let document = snapshot
            .documents
            .get(&document_id)
            .ok_or(CaseError::NotFound {
                kind: EntityKind::Document,
                id: document_id,
            })?
            .clone();

        let mut txn = Txn::begin(snapshot, Utc::now());
        let mut report = DerivationReport {
            case_id,
            document_id: Some(document_id),
            ..Default::default()
        };
        self.derive_for_document(&mut txn, &document, None, &mut report)?;

        self.finish(txn).await?;
        Ok(report)
    }

    /// Shared deriver invocation for ingest and re-derivation.
    fn derive_for_document(
        &self,
        txn: &mut Txn,
        document: &Document,
        occurred_override: Option<DateTime<Utc>>,
        report: &mut DerivationReport,
    ) -> CaseResult<()> {
        let derived = derive_events(document, &txn.snap, &self.catalog, occurred_override, txn.now);
        report.events_already_active = derived.already_active;
        for skip in derived.skipped {
            report.skipped.push(SkipNote {
                document_id: skip.document_id,
                reason: skip.reason.to_string(),
            });
        }
        for event in derived.created {
            txn.create_event(event.clone());
            report.events_created.push(event.id);
            self.apply_event_effects(txn, &event, report)?;
        }
        Ok(())
    }

    /// Record a case-internal event and derive its consequences.
    pub async fn log_event(&self, case_id: Uuid, entry: LogEvent) -> CaseResult<DerivationReport> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        if snapshot.case.status == CaseStatus::Closed {
            return Err(CaseError::CaseClosed(case_id));
        }

        let now = Utc::now();
        let mut txn = Txn::begin(snapshot, now);
        let mut report = DerivationReport {
            case_id,
            ..Default::default()
        };

        let event = CaseEvent {
            id: Uuid::new_v4(),
            case_id,
            source_document: None,
            event_type: entry.event_type,
            occurred_at: entry.occurred_at,
            status: EventStatus::Active,
            derivation_key: None,
            extends_deadline: entry.extends_deadline,
            extension_days: entry.extension_days,
            note: entry.note,
            cancel_reason: None,
            created_at: now,
        };
        txn.create_event(event.clone());
        report.events_created.push(event.id);
        self.apply_event_effects(&mut txn, &event, &mut report)?;

        self.finish(txn).await?;
        Ok(report)
    }

    /// Cancel an event and synchronously cascade to its open dependents.
    ///
    /// Repeating a cancellation with the identical reason is an
    /// idempotent no-op; a differing reason on an already-cancelled event
    /// is rejected.
    pub async fn cancel_event(
        &self,
        case_id: Uuid,
        event_id: Uuid,
        reason: &str,
    ) -> CaseResult<()> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        let event = snapshot
            .events
            .get(&event_id)
            .ok_or(CaseError::NotFound {
                kind: EntityKind::Event,
                id: event_id,
            })?;
        if event.status == EventStatus::Cancelled {
            if event.cancel_reason.as_deref() == Some(reason) {
                tracing::debug!(case = %case_id, event = %event_id, "repeat cancellation, no-op");
                return Ok(());
            }
            return Err(CaseError::AlreadyTerminal {
                kind: EntityKind::Event,
                id: event_id,
                status: event.status.as_str().to_string(),
            });
        }

        let mut txn = Txn::begin(snapshot, Utc::now());
        txn.cancel_event(event_id, reason);

        // Every deadline of the event is a cascade path for tasks; only
        // the open ones change status themselves, satisfied deadlines
        // stay as they are.
        let all_deadlines: Vec<Uuid> = txn
            .snap
            .deadlines_for_event(event_id)
            .map(|deadline| deadline.id)
            .collect();
        let open_deadlines: Vec<Uuid> = txn
            .snap
            .deadlines_for_event(event_id)
            .filter(|deadline| deadline.is_open())
            .map(|deadline| deadline.id)
            .collect();
        for deadline_id in &open_deadlines {
            txn.set_deadline_status(
                *deadline_id,
                DeadlineStatus::Cancelled,
                Some(format!("triggering event {event_id} cancelled")),
            );
        }

        let mut cascade_triggers: Vec<TaskTrigger> = vec![TaskTrigger::Event(event_id)];
        cascade_triggers.extend(all_deadlines.iter().map(|id| TaskTrigger::Deadline(*id)));
        let open_tasks: Vec<Uuid> = txn
            .snap
            .tasks
            .values()
            .filter(|task| task.is_open() && cascade_triggers.contains(&task.trigger))
            .map(|task| task.id)
            .collect();
        for task_id in open_tasks {
            txn.set_task_status(
                task_id,
                TaskStatus::Cancelled,
                Some(format!("triggering event {event_id} cancelled")),
            );
        }

        self.finish(txn).await?;
        tracing::info!(case = %case_id, event = %event_id, reason, "event cancelled");
        Ok(())
    }

    pub async fn satisfy_deadline(&self, case_id: Uuid, deadline_id: Uuid) -> CaseResult<()> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        let deadline = snapshot
            .deadlines
            .get(&deadline_id)
            .ok_or(CaseError::NotFound {
                kind: EntityKind::Deadline,
                id: deadline_id,
            })?;
        if !deadline.is_open() {
            return Err(CaseError::InvalidTransition {
                kind: EntityKind::Deadline,
                id: deadline_id,
                from: deadline.status.as_str().to_string(),
                to: DeadlineStatus::Satisfied.as_str().to_string(),
            });
        }

        let mut txn = Txn::begin(snapshot, Utc::now());
        txn.set_deadline_status(deadline_id, DeadlineStatus::Satisfied, None);
        self.finish(txn).await
    }

    /// Extend an open deadline: supersede it with a recomputed
    /// replacement and regenerate its tasks.
    pub async fn apply_extension(
        &self,
        case_id: Uuid,
        prior_deadline_id: Uuid,
        extra_days: i64,
    ) -> CaseResult<Uuid> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        if snapshot.case.status == CaseStatus::Closed {
            return Err(CaseError::CaseClosed(case_id));
        }

        let now = Utc::now();
        let mut txn = Txn::begin(snapshot, now);
        let mut report = DerivationReport {
            case_id,
            ..Default::default()
        };

        let event = CaseEvent {
            id: Uuid::new_v4(),
            case_id,
            source_document: None,
            event_type: EventType::ExtensionGranted,
            occurred_at: now,
            status: EventStatus::Active,
            derivation_key: None,
            extends_deadline: Some(prior_deadline_id),
            extension_days: Some(extra_days),
            note: Some(format!("{extra_days}-day extension granted")),
            cancel_reason: None,
            created_at: now,
        };
        txn.create_event(event.clone());
        self.apply_event_effects(&mut txn, &event, &mut report)?;

        let Some(replacement_id) = report.deadlines_created.last().copied() else {
            return Err(IntegrityViolation::DanglingSupersession {
                deadline: prior_deadline_id,
            }
            .into());
        };

        self.finish(txn).await?;
        tracing::info!(
            case = %case_id,
            prior = %prior_deadline_id,
            replacement = %replacement_id,
            extra_days,
            "deadline extended"
        );
        Ok(replacement_id)
    }

    pub async fn start_task(&self, case_id: Uuid, task_id: Uuid) -> CaseResult<()> {
        self.transition_task(case_id, task_id, TaskStatus::InProgress)
            .await
    }

    pub async fn complete_task(&self, case_id: Uuid, task_id: Uuid) -> CaseResult<()> {
        self.transition_task(case_id, task_id, TaskStatus::Done).await
    }

    pub async fn cancel_task(&self, case_id: Uuid, task_id: Uuid) -> CaseResult<()> {
        self.transition_task(case_id, task_id, TaskStatus::Cancelled)
            .await
    }

    /// Mark a document superseded by a re-classification. The corrected
    /// replacement arrives through a fresh `ingest_document` call.
    pub async fn supersede_document(&self, case_id: Uuid, document_id: Uuid) -> CaseResult<()> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        let document = snapshot
            .documents
            .get(&document_id)
            .ok_or(CaseError::NotFound {
                kind: EntityKind::Document,
                id: document_id,
            })?;
        if document.superseded {
            return Ok(());
        }

        let mut txn = Txn::begin(snapshot, Utc::now());
        txn.supersede_document(document_id);
        self.finish(txn).await
    }

    /// Close the case. Existing entities stay correctable; creating new
    /// ones is rejected from here on. Idempotent.
    pub async fn close_case(&self, case_id: Uuid) -> CaseResult<()> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        if snapshot.case.status == CaseStatus::Closed {
            return Ok(());
        }

        let mut txn = Txn::begin(snapshot, Utc::now());
        let mut case = txn.snap.case.clone();
        case.status = CaseStatus::Closed;
        txn.set_case(case);
        txn.audit(AuditEntry::transition(
            txn.now,
            EntityRef::Case(case_id),
            CaseStatus::Open.as_str(),
            CaseStatus::Closed.as_str(),
            None,
        ));
        self.finish(txn).await
    }

    /// Deadline and task fan-out for one newly created event.
    fn apply_event_effects(
        &self,
        txn: &mut Txn,
        event: &CaseEvent,
        report: &mut DerivationReport,
    ) -> CaseResult<()> {
        match compute_deadlines(event, &txn.snap, &self.catalog, self.calendar.as_ref(), txn.now)?
        {
            DeadlineComputation::Fresh { created, unresolved } => {
                for deadline in created {
                    txn.create_deadline(deadline.clone());
                    report.deadlines_created.push(deadline.id);
                    for task in
                        generate_tasks(TaskSeed::Deadline(&deadline), &txn.snap, &self.catalog, txn.now)
                    {
                        report.tasks_created.push(task.id);
                        txn.create_task(task);
                    }
                }
                for spec in unresolved {
                    report.unresolved_specs.push(UnresolvedNote {
                        deadline_type: spec.deadline_type.as_str().to_string(),
                        reason: spec.error.to_string(),
                    });
                }
            }
            DeadlineComputation::Extension { prior, replacement } => {
                txn.supersede_deadline(prior, replacement.id);
                report.deadlines_superseded.push(prior);

                let superseded_tasks: Vec<Uuid> = txn
                    .snap
                    .tasks_for_trigger(TaskTrigger::Deadline(prior))
                    .filter(|task| task.is_open())
                    .map(|task| task.id)
                    .collect();
                for task_id in superseded_tasks {
                    txn.set_task_status(
                        task_id,
                        TaskStatus::Cancelled,
                        Some(format!("deadline {prior} superseded")),
                    );
                    report.tasks_cancelled.push(task_id);
                }

                txn.create_deadline(replacement.clone());
                report.deadlines_created.push(replacement.id);
                for task in
                    generate_tasks(TaskSeed::Deadline(&replacement), &txn.snap, &self.catalog, txn.now)
                {
                    report.tasks_created.push(task.id);
                    txn.create_task(task);
                }
            }
        }

        for task in generate_tasks(TaskSeed::Event(event), &txn.snap, &self.catalog, txn.now) {
            report.tasks_created.push(task.id);
            txn.create_task(task);
        }
        Ok(())
    }

    async fn transition_task(
        &self,
        case_id: Uuid,
        task_id: Uuid,
        to: TaskStatus,
    ) -> CaseResult<()> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let snapshot = self.load(case_id).await?;
        let task = snapshot.tasks.get(&task_id).ok_or(CaseError::NotFound {
            kind: EntityKind::Task,
            id: task_id,
        })?;

        let allowed = matches!(
            (task.status, to),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
        );
        if !allowed {
            if task.status == TaskStatus::Cancelled && to == TaskStatus::Cancelled {
                return Err(CaseError::AlreadyTerminal {
                    kind: EntityKind::Task,
                    id: task_id,
                    status: task.status.as_str().to_string(),
                });
            }
            return Err(CaseError::InvalidTransition {
                kind: EntityKind::Task,
                id: task_id,
                from: task.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let mut txn = Txn::begin(snapshot, Utc::now());
        txn.set_task_status(task_id, to, None);
        self.finish(txn).await
    }
}
