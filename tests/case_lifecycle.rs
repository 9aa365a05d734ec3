//! Case-level guards, cascades, and cross-case isolation.

mod support;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use patdock::CaseError;
use patdock::model::{
    DeadlineStatus, EventStatus, TaskStatus, TaskTrigger, TaskType,
};

use support::{assignment, engine, new_case, office_action};

#[tokio::test]
async fn cancelling_an_event_cascades_to_open_dependents_only() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;
    let other_case = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    aggregate
        .ingest_document(other_case, office_action())
        .await
        .expect("second case ingests");
    let event_id = report.events_created[0];
    let deadline_id = report.deadlines_created[0];

    aggregate
        .cancel_event(case_id, event_id, "issued in error")
        .await
        .expect("cancellation succeeds");

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    assert_eq!(snapshot.events[&event_id].status, EventStatus::Cancelled);
    assert_eq!(
        snapshot.events[&event_id].cancel_reason.as_deref(),
        Some("issued in error")
    );
    assert_eq!(
        snapshot.deadlines[&deadline_id].status,
        DeadlineStatus::Cancelled
    );
    for task in snapshot.tasks.values() {
        assert_eq!(task.status, TaskStatus::Cancelled);
    }

    // The sibling case is untouched.
    let sibling = aggregate.case(other_case).await.expect("sibling loads");
    assert!(
        sibling
            .events
            .values()
            .all(|e| e.status == EventStatus::Active)
    );
    assert!(sibling.deadlines.values().all(|d| d.is_open()));
}

#[tokio::test]
async fn terminal_entities_survive_a_later_cancel() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let event_id = report.events_created[0];
    let deadline_id = report.deadlines_created[0];

    aggregate
        .satisfy_deadline(case_id, deadline_id)
        .await
        .expect("deadline satisfied");

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    let draft = snapshot
        .tasks
        .values()
        .find(|t| t.task_type == TaskType::DraftOaResponse)
        .expect("draft task exists");
    aggregate
        .start_task(case_id, draft.id)
        .await
        .expect("task starts");
    aggregate
        .complete_task(case_id, draft.id)
        .await
        .expect("task completes");

    aggregate
        .cancel_event(case_id, event_id, "withdrawn by the office")
        .await
        .expect("cancellation succeeds");

    let after = aggregate.case(case_id).await.expect("case loads");
    assert_eq!(
        after.deadlines[&deadline_id].status,
        DeadlineStatus::Satisfied
    );
    assert_eq!(after.tasks[&draft.id].status, TaskStatus::Done);
    // Everything still open was cascaded.
    for task in after.tasks.values() {
        if task.id != draft.id {
            assert_eq!(task.status, TaskStatus::Cancelled);
        }
    }
}

#[tokio::test]
async fn repeat_cancellation_is_idempotent_only_for_the_same_reason() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let event_id = report.events_created[0];

    aggregate
        .cancel_event(case_id, event_id, "issued in error")
        .await
        .expect("first cancellation succeeds");
    aggregate
        .cancel_event(case_id, event_id, "issued in error")
        .await
        .expect("identical repeat is a no-op");

    let err = aggregate
        .cancel_event(case_id, event_id, "different story")
        .await
        .expect_err("a differing reason is rejected");
    assert!(matches!(err, CaseError::AlreadyTerminal { .. }));
}

#[tokio::test]
async fn closed_case_rejects_creation_but_permits_corrections() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let deadline_id = report.deadlines_created[0];
    let document_id = report.document_id.expect("document persisted");

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    let task_id = snapshot
        .tasks
        .values()
        .find(|t| t.task_type == TaskType::FileResponse)
        .expect("file task exists")
        .id;
    aggregate
        .start_task(case_id, task_id)
        .await
        .expect("task starts");

    aggregate.close_case(case_id).await.expect("case closes");
    aggregate
        .close_case(case_id)
        .await
        .expect("closing twice is a no-op");

    let err = aggregate
        .ingest_document(case_id, assignment())
        .await
        .expect_err("ingest on a closed case is rejected");
    assert!(matches!(err, CaseError::CaseClosed(id) if id == case_id));
    let err = aggregate
        .rederive_document(case_id, document_id)
        .await
        .expect_err("re-derivation creates entities too");
    assert!(matches!(err, CaseError::CaseClosed(_)));
    let err = aggregate
        .apply_extension(case_id, deadline_id, 30)
        .await
        .expect_err("extension creates entities too");
    assert!(matches!(err, CaseError::CaseClosed(_)));

    // Record-keeping on existing entities stays allowed.
    aggregate
        .complete_task(case_id, task_id)
        .await
        .expect("task completion after close");
    aggregate
        .satisfy_deadline(case_id, deadline_id)
        .await
        .expect("deadline satisfaction after close");
}

#[tokio::test]
async fn status_machines_reject_invalid_transitions() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let deadline_id = report.deadlines_created[0];

    aggregate
        .satisfy_deadline(case_id, deadline_id)
        .await
        .expect("deadline satisfied");
    let err = aggregate
        .satisfy_deadline(case_id, deadline_id)
        .await
        .expect_err("satisfied is terminal");
    assert!(matches!(err, CaseError::InvalidTransition { .. }));

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    let task_id = snapshot
        .tasks
        .values()
        .find(|t| t.status == TaskStatus::Pending)
        .expect("pending task exists")
        .id;

    let err = aggregate
        .complete_task(case_id, task_id)
        .await
        .expect_err("pending task must be started first");
    assert!(matches!(err, CaseError::InvalidTransition { .. }));

    aggregate
        .start_task(case_id, task_id)
        .await
        .expect("task starts");
    aggregate
        .complete_task(case_id, task_id)
        .await
        .expect("task completes");
    let err = aggregate
        .cancel_task(case_id, task_id)
        .await
        .expect_err("done is terminal");
    assert!(matches!(err, CaseError::InvalidTransition { .. }));

    let err = aggregate
        .satisfy_deadline(case_id, Uuid::new_v4())
        .await
        .expect_err("unknown deadline");
    assert!(matches!(err, CaseError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_cases_do_not_interfere() {
    let (aggregate, _store) = engine();
    let aggregate = std::sync::Arc::new(aggregate);
    let case_a = new_case(&aggregate).await;
    let case_b = new_case(&aggregate).await;

    let left = {
        let aggregate = aggregate.clone();
        async move {
            let report = aggregate
                .ingest_document(case_a, office_action())
                .await
                .expect("case A ingests");
            aggregate
                .cancel_event(case_a, report.events_created[0], "withdrawn")
                .await
                .expect("case A cancels");
        }
    };
    let right = {
        let aggregate = aggregate.clone();
        async move {
            let report = aggregate
                .ingest_document(case_b, office_action())
                .await
                .expect("case B ingests");
            aggregate
                .apply_extension(case_b, report.deadlines_created[0], 60)
                .await
                .expect("case B extends");
        }
    };
    tokio::join!(left, right);

    // Case A is fully cascaded; nothing half-cancelled.
    let a = aggregate.case(case_a).await.expect("case A loads");
    assert!(
        a.events
            .values()
            .all(|e| e.status == EventStatus::Cancelled)
    );
    assert!(
        a.deadlines
            .values()
            .all(|d| d.status == DeadlineStatus::Cancelled)
    );
    assert!(a.tasks.values().all(|t| t.status == TaskStatus::Cancelled));

    // Case B carries one superseded and one open deadline.
    let b = aggregate.case(case_b).await.expect("case B loads");
    let superseded = b
        .deadlines
        .values()
        .filter(|d| d.status == DeadlineStatus::Superseded)
        .count();
    let open = b.deadlines.values().filter(|d| d.is_open()).count();
    assert_eq!((superseded, open), (1, 1));
}

/// Deterministic pseudo-random driver; no property-testing dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[(self.next() as usize) % items.len()])
        }
    }
}

#[tokio::test]
async fn random_operation_sequences_never_leave_orphans() {
    for seed in 1..=8u64 {
        let (aggregate, _store) = engine();
        let case_id = new_case(&aggregate).await;
        let mut rng = Lcg(seed);

        for _ in 0..40 {
            let snapshot = aggregate.case(case_id).await.expect("case loads");
            let mut events: Vec<Uuid> = snapshot.events.keys().copied().collect();
            let mut deadlines: Vec<Uuid> = snapshot.deadlines.keys().copied().collect();
            let mut tasks: Vec<Uuid> = snapshot.tasks.keys().copied().collect();
            events.sort();
            deadlines.sort();
            tasks.sort();

            let outcome = match rng.next() % 7 {
                0 => aggregate
                    .ingest_document(case_id, office_action())
                    .await
                    .map(|_| ()),
                1 => aggregate
                    .ingest_document(case_id, assignment())
                    .await
                    .map(|_| ()),
                2 => match rng.pick(&events) {
                    Some(event_id) => aggregate
                        .cancel_event(case_id, event_id, "randomized correction")
                        .await,
                    None => Ok(()),
                },
                3 => match rng.pick(&deadlines) {
                    Some(deadline_id) => {
                        aggregate.satisfy_deadline(case_id, deadline_id).await
                    }
                    None => Ok(()),
                },
                4 => match rng.pick(&deadlines) {
                    Some(deadline_id) => aggregate
                        .apply_extension(case_id, deadline_id, 30)
                        .await
                        .map(|_| ()),
                    None => Ok(()),
                },
                5 => match rng.pick(&tasks) {
                    Some(task_id) => aggregate.start_task(case_id, task_id).await,
                    None => Ok(()),
                },
                _ => match rng.pick(&tasks) {
                    Some(task_id) => aggregate.complete_task(case_id, task_id).await,
                    None => Ok(()),
                },
            };

            if let Err(err) = outcome {
                // Validation rejections are expected under random input;
                // integrity or collaborator failures are not.
                assert!(
                    !matches!(
                        err,
                        CaseError::Invariant(_) | CaseError::Store(_) | CaseError::Calendar(_)
                    ),
                    "seed {seed}: unexpected failure: {err}"
                );
            }
        }

        let snapshot = aggregate.case(case_id).await.expect("case loads");
        for deadline in snapshot.deadlines.values() {
            let trigger = snapshot
                .events
                .get(&deadline.triggering_event)
                .unwrap_or_else(|| panic!("seed {seed}: orphan deadline {}", deadline.id));
            assert_eq!(trigger.case_id, deadline.case_id);
            if deadline.is_open() {
                assert_eq!(
                    trigger.status,
                    EventStatus::Active,
                    "seed {seed}: open deadline under cancelled event"
                );
            }
            if deadline.status == DeadlineStatus::Superseded {
                let successor = deadline.superseded_by.expect("supersession link set");
                assert!(snapshot.deadlines.contains_key(&successor));
            }
        }
        for task in snapshot.tasks.values() {
            match task.trigger {
                TaskTrigger::Event(event_id) => {
                    let event = snapshot
                        .events
                        .get(&event_id)
                        .unwrap_or_else(|| panic!("seed {seed}: orphan task {}", task.id));
                    if task.is_open() {
                        assert_eq!(event.status, EventStatus::Active);
                    }
                }
                TaskTrigger::Deadline(deadline_id) => {
                    let deadline = snapshot
                        .deadlines
                        .get(&deadline_id)
                        .unwrap_or_else(|| panic!("seed {seed}: orphan task {}", task.id));
                    if task.is_open() {
                        assert_ne!(deadline.status, DeadlineStatus::Superseded);
                        let event = &snapshot.events[&deadline.triggering_event];
                        assert_eq!(event.status, EventStatus::Active);
                    }
                }
            }
        }
    }
}
