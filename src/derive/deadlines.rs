use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::calendar::{CalendarProvider, DeadlinePeriod};
use crate::error::{CalendarError, CaseError, EntityKind};
use crate::model::{CaseEvent, CaseSnapshot, Deadline, DeadlineStatus, DeadlineType, EventType};
use crate::rules::RuleCatalog;

/// A deadline spec the calendar could not resolve. Isolated per spec so
/// one failure does not abort sibling specs.
#[derive(Debug, Clone)]
pub struct UnresolvedSpec {
    pub deadline_type: DeadlineType,
    pub error: CalendarError,
}

/// Structured output of the deadline calculator.
///
/// The extension variant is the one place the pipeline asks for a mutation
/// of an existing row; it is returned as an instruction instead of applied
/// here so the aggregate can commit the supersession atomically.
#[derive(Debug, Clone)]
pub enum DeadlineComputation {
    Fresh {
        created: Vec<Deadline>,
        unresolved: Vec<UnresolvedSpec>,
    },
    Extension {
        prior: Uuid,
        replacement: Deadline,
    },
}

/// Compute the deadlines an event creates.
///
/// Ordinary events fan out over the catalog's deadline specs for
/// (event type, jurisdiction). An extension grant referencing a prior
/// deadline instead recomputes that obligation: the result names the
/// superseded row and carries its open replacement.
pub fn compute_deadlines(
    event: &CaseEvent,
    snapshot: &CaseSnapshot,
    catalog: &RuleCatalog,
    calendar: &dyn CalendarProvider,
    now: DateTime<Utc>,
) -> Result<DeadlineComputation, CaseError> {
    if event.event_type == EventType::ExtensionGranted
        && let Some(prior_id) = event.extends_deadline
    {
        return compute_extension(event, snapshot, calendar, prior_id, now);
    }

    let jurisdiction = &snapshot.case.jurisdiction;
    let mut created = Vec::new();
    let mut unresolved = Vec::new();

    for spec in catalog.deadline_specs(&event.event_type, jurisdiction) {
        let period = DeadlinePeriod {
            days: spec.offset_days,
            court_days: spec.court_days,
        };
        match calendar.due_date(event.occurred_at.date_naive(), period, jurisdiction) {
            Ok(due_date) => created.push(Deadline {
                id: Uuid::new_v4(),
                case_id: snapshot.case.id,
                triggering_event: event.id,
                deadline_type: spec.deadline_type.clone(),
                due_date,
                status: DeadlineStatus::Open,
                superseded_by: None,
                rule_ref: spec.citation.clone(),
                created_at: now,
            }),
            Err(error) => {
                tracing::warn!(
                    event = %event.id,
                    deadline_type = %spec.deadline_type,
                    %error,
                    "calendar could not resolve deadline spec"
                );
                unresolved.push(UnresolvedSpec {
                    deadline_type: spec.deadline_type.clone(),
                    error,
                });
            }
        }
    }

    Ok(DeadlineComputation::Fresh { created, unresolved })
}

fn compute_extension(
    event: &CaseEvent,
    snapshot: &CaseSnapshot,
    calendar: &dyn CalendarProvider,
    prior_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DeadlineComputation, CaseError> {
    let prior = snapshot
        .deadlines
        .get(&prior_id)
        .ok_or(CaseError::NotFound {
            kind: EntityKind::Deadline,
            id: prior_id,
        })?;
    if !prior.is_open() {
        return Err(CaseError::NotOpen(prior_id));
    }

    let trigger = snapshot
        .events
        .get(&prior.triggering_event)
        .ok_or(CaseError::NotFound {
            kind: EntityKind::Event,
            id: prior.triggering_event,
        })?;

    let extra_days = event.extension_days.ok_or_else(|| {
        CaseError::Calendar(CalendarError::Calculation(
            "extension grant carries no duration".to_string(),
        ))
    })?;

    // The replacement runs from the original trigger date, lengthened by
    // the grant; a single failing computation aborts the operation.
    let due_date = calendar.due_date(
        trigger.occurred_at.date_naive(),
        DeadlinePeriod::calendar_days(extra_days),
        &snapshot.case.jurisdiction,
    )?;

    Ok(DeadlineComputation::Extension {
        prior: prior_id,
        replacement: Deadline {
            id: Uuid::new_v4(),
            case_id: snapshot.case.id,
            triggering_event: event.id,
            deadline_type: prior.deadline_type.clone(),
            due_date,
            status: DeadlineStatus::Open,
            superseded_by: None,
            rule_ref: prior.rule_ref.clone(),
            created_at: now,
        },
    })
}
