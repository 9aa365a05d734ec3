use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{
    CaseEvent, CaseSnapshot, Document, EventStatus, derivation_key,
};
use crate::rules::RuleCatalog;

/// Why a document produced no event. Informational, never fatal; surfaced
/// to the caller for manual triage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnmappedDocumentKind {
        kind: String,
        jurisdiction: String,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmappedDocumentKind { kind, jurisdiction } => write!(
                f,
                "no event rule for document kind '{kind}' in jurisdiction '{jurisdiction}'"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub document_id: Uuid,
    pub reason: SkipReason,
}

/// Outcome of deriving events from one document.
#[derive(Debug, Clone, Default)]
pub struct EventDerivation {
    pub created: Vec<CaseEvent>,
    /// Events that already existed for the same derivation key; the call
    /// was a no-op for them.
    pub already_active: Vec<Uuid>,
    pub skipped: Vec<SkippedDocument>,
}

/// Derive the canonical event(s) a document represents.
///
/// Consults the rule catalog for (document kind, case jurisdiction). An
/// unmapped pair is reported under `skipped`. An ACTIVE event already
/// carrying the same derivation key makes the call idempotent: it is
/// reported under `already_active` and nothing new is created.
pub fn derive_events(
    document: &Document,
    snapshot: &CaseSnapshot,
    catalog: &RuleCatalog,
    occurred_override: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> EventDerivation {
    let mut derivation = EventDerivation::default();

    let Some(event_type) = catalog.event_type_for(&document.kind, &snapshot.case.jurisdiction)
    else {
        tracing::debug!(
            document = %document.id,
            kind = %document.kind,
            jurisdiction = %snapshot.case.jurisdiction,
            "document kind has no event rule; skipping"
        );
        derivation.skipped.push(SkippedDocument {
            document_id: document.id,
            reason: SkipReason::UnmappedDocumentKind {
                kind: document.kind.as_str().to_string(),
                jurisdiction: snapshot.case.jurisdiction.clone(),
            },
        });
        return derivation;
    };

    let key = derivation_key(document.id, catalog.version(), event_type);
    if let Some(existing) = snapshot.active_event_for_key(&key) {
        derivation.already_active.push(existing.id);
        return derivation;
    }

    derivation.created.push(CaseEvent {
        id: Uuid::new_v4(),
        case_id: snapshot.case.id,
        source_document: Some(document.id),
        event_type: event_type.clone(),
        occurred_at: occurred_override.unwrap_or(document.received_at),
        status: EventStatus::Active,
        derivation_key: Some(key),
        extends_deadline: None,
        extension_days: None,
        note: None,
        cancel_reason: None,
        created_at: now,
    });
    derivation
}
