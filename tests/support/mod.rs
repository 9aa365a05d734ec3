//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use patdock::aggregate::{CaseAggregate, CreateCaseParams, SubmitDocument};
use patdock::calendar::OfficeCalendar;
use patdock::model::{DocumentKind, DocumentSource};
use patdock::rules::RuleCatalog;
use patdock::store::MemoryStore;

pub fn engine() -> (CaseAggregate, Arc<MemoryStore>) {
    engine_with_catalog(RuleCatalog::bundled().expect("bundled catalog parses"))
}

pub fn engine_with_catalog(catalog: RuleCatalog) -> (CaseAggregate, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let aggregate = CaseAggregate::new(
        store.clone(),
        Arc::new(catalog),
        Arc::new(OfficeCalendar::new(["US", "EP"])),
    );
    (aggregate, store)
}

/// Second aggregate over the same store, e.g. after a catalog bump.
pub fn engine_over(store: Arc<MemoryStore>, catalog: RuleCatalog) -> CaseAggregate {
    CaseAggregate::new(
        store,
        Arc::new(catalog),
        Arc::new(OfficeCalendar::new(["US", "EP"])),
    )
}

pub async fn new_case(aggregate: &CaseAggregate) -> Uuid {
    aggregate
        .create_case(CreateCaseParams {
            jurisdiction: "US".to_string(),
            application_number: None,
            filing_date: None,
        })
        .await
        .expect("case creation succeeds")
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// A US office action received Monday 2026-03-02.
pub fn office_action() -> SubmitDocument {
    SubmitDocument {
        kind: DocumentKind::OfficeAction,
        source: DocumentSource::IssuingOffice,
        title: "Non-final office action".to_string(),
        received_at: at(2026, 3, 2),
        external_ref: Some("OA-2026-0117".to_string()),
        content_ref: None,
        occurred_override: None,
        application_number: Some("17/845,221".to_string()),
    }
}

/// A document kind the bundled catalog has no event rule for.
pub fn assignment() -> SubmitDocument {
    SubmitDocument {
        kind: DocumentKind::Assignment,
        source: DocumentSource::Client,
        title: "Assignment recordation".to_string(),
        received_at: at(2026, 3, 4),
        external_ref: None,
        content_ref: None,
        occurred_override: None,
        application_number: None,
    }
}
