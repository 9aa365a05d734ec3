//! End-to-end derivation pipeline: document -> event -> deadline -> task,
//! plus idempotent re-derivation and the extension chain.

mod support;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use patdock::model::{
    DeadlineStatus, DeadlineType, EventStatus, EventType, TaskStatus, TaskTrigger, TaskType,
};
use patdock::rules::RuleCatalog;

use support::{assignment, engine, engine_over, engine_with_catalog, new_case, office_action};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn ingest_builds_the_full_chain() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");

    assert_eq!(report.events_created.len(), 1);
    assert_eq!(report.deadlines_created.len(), 1);
    assert_eq!(report.tasks_created.len(), 3);
    assert!(report.skipped.is_empty());
    assert!(report.unresolved_specs.is_empty());

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    assert_eq!(
        snapshot.case.application_number.as_deref(),
        Some("17/845,221")
    );

    let event = &snapshot.events[&report.events_created[0]];
    assert_eq!(event.event_type, EventType::OaReceived);
    assert_eq!(event.status, EventStatus::Active);
    assert_eq!(event.source_document, report.document_id);

    // 2026-03-02 + 90 days lands on Sunday 2026-05-31, rolled forward.
    let deadline = &snapshot.deadlines[&report.deadlines_created[0]];
    assert_eq!(deadline.deadline_type, DeadlineType::OaResponseDue);
    assert_eq!(deadline.due_date, date(2026, 6, 1));
    assert_eq!(deadline.triggering_event, event.id);

    let draft = snapshot
        .tasks
        .values()
        .find(|t| t.task_type == TaskType::DraftOaResponse)
        .expect("draft task exists");
    assert_eq!(draft.due_date, Some(date(2026, 5, 18)));
    assert_eq!(draft.trigger, TaskTrigger::Deadline(deadline.id));

    let review = snapshot
        .tasks
        .values()
        .find(|t| t.task_type == TaskType::DocketReview)
        .expect("review task exists");
    assert_eq!(review.trigger, TaskTrigger::Event(event.id));
    assert_eq!(review.due_date, None);
}

#[tokio::test]
async fn rederiving_a_document_is_idempotent() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let first = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let document_id = first.document_id.expect("document persisted");

    let second = aggregate
        .rederive_document(case_id, document_id)
        .await
        .expect("re-derivation succeeds");

    assert!(second.events_created.is_empty());
    assert_eq!(second.events_already_active, first.events_created);
    assert!(second.deadlines_created.is_empty());
    assert!(second.tasks_created.is_empty());

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    let active_events = snapshot
        .events
        .values()
        .filter(|e| e.status == EventStatus::Active)
        .count();
    assert_eq!(active_events, 1);
}

#[tokio::test]
async fn catalog_version_bump_allows_rederivation() {
    let (aggregate, store) = engine();
    let case_id = new_case(&aggregate).await;

    let first = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let document_id = first.document_id.expect("document persisted");

    let bumped = {
        let raw = include_str!("../src/rules/default_rules.toml")
            .replace("version = \"2026.1\"", "version = \"2026.2\"");
        RuleCatalog::from_str(&raw).expect("bumped catalog parses")
    };
    let upgraded = engine_over(store, bumped);

    let report = upgraded
        .rederive_document(case_id, document_id)
        .await
        .expect("re-derivation succeeds");
    assert_eq!(report.events_created.len(), 1);
    assert!(report.events_already_active.is_empty());

    let snapshot = upgraded.case(case_id).await.expect("case loads");
    assert_eq!(snapshot.events.len(), 2);
}

#[tokio::test]
async fn unmapped_document_kind_is_reported_not_fatal() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, assignment())
        .await
        .expect("ingest succeeds even without a mapping");

    assert!(report.events_created.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("assignment"));

    let snapshot = aggregate.case(case_id).await.expect("case loads");
    assert_eq!(snapshot.documents.len(), 1);
    assert!(snapshot.events.is_empty());
}

#[tokio::test]
async fn one_unresolvable_spec_does_not_abort_its_siblings() {
    let catalog = RuleCatalog::from_str(
        r#"
        version = "stress-1"

        [[event_rules]]
        document_kind = "office_action"
        jurisdiction = "US"
        event_type = "oa_received"

        [[deadline_rules]]
        event_type = "oa_received"
        jurisdiction = "US"
        deadline_type = "oa_response_due"
        offset_days = 90

        [[deadline_rules]]
        event_type = "oa_received"
        jurisdiction = "US"
        deadline_type = "far_future_review"
        offset_days = 500000000
        "#,
    )
    .expect("catalog parses");
    let (aggregate, _store) = engine_with_catalog(catalog);
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds despite one failing spec");

    assert_eq!(report.deadlines_created.len(), 1);
    assert_eq!(report.unresolved_specs.len(), 1);
    assert_eq!(report.unresolved_specs[0].deadline_type, "far_future_review");
}

#[tokio::test]
async fn extension_supersedes_and_regenerates() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let d1 = report.deadlines_created[0];

    let before = aggregate.case(case_id).await.expect("case loads");
    let old_tasks: Vec<_> = before
        .tasks
        .values()
        .filter(|t| t.trigger == TaskTrigger::Deadline(d1))
        .map(|t| t.id)
        .collect();
    assert_eq!(old_tasks.len(), 2);

    let d2 = aggregate
        .apply_extension(case_id, d1, 120)
        .await
        .expect("extension succeeds");

    let after = aggregate.case(case_id).await.expect("case loads");
    let prior = &after.deadlines[&d1];
    assert_eq!(prior.status, DeadlineStatus::Superseded);
    assert_eq!(prior.superseded_by, Some(d2));

    let replacement = &after.deadlines[&d2];
    assert_eq!(replacement.status, DeadlineStatus::Open);
    assert_eq!(replacement.deadline_type, DeadlineType::OaResponseDue);
    // Trigger date 2026-03-02 + 120 days = Tuesday 2026-06-30.
    assert_eq!(replacement.due_date, date(2026, 6, 30));

    for task_id in &old_tasks {
        assert_eq!(after.tasks[task_id].status, TaskStatus::Cancelled);
    }
    let regenerated: Vec<_> = after
        .tasks
        .values()
        .filter(|t| t.trigger == TaskTrigger::Deadline(d2))
        .collect();
    assert_eq!(regenerated.len(), 2);
    assert!(regenerated.iter().all(|t| t.status == TaskStatus::Pending));

    let grant = after
        .events
        .values()
        .find(|e| e.event_type == EventType::ExtensionGranted)
        .expect("extension event recorded");
    assert_eq!(grant.extends_deadline, Some(d1));
    assert_eq!(replacement.triggering_event, grant.id);
}

#[tokio::test]
async fn extending_a_superseded_deadline_is_rejected() {
    let (aggregate, _store) = engine();
    let case_id = new_case(&aggregate).await;

    let report = aggregate
        .ingest_document(case_id, office_action())
        .await
        .expect("ingest succeeds");
    let d1 = report.deadlines_created[0];

    aggregate
        .apply_extension(case_id, d1, 30)
        .await
        .expect("first extension succeeds");
    let err = aggregate
        .apply_extension(case_id, d1, 60)
        .await
        .expect_err("superseded deadline cannot be extended again");
    assert!(matches!(err, patdock::CaseError::NotOpen(id) if id == d1));
}
