//! Versioned, data-driven rule catalog.
//!
//! The catalog is external configuration: three lookup tables loaded from
//! TOML. The derivation components consult it but never interpret legal
//! meaning themselves. The `version` stamp feeds the event derivation key,
//! so republishing the tables re-derives instead of hitting the
//! idempotency guard.

use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::model::{DeadlineType, DocumentKind, EventType, TaskPriority, TaskType};

/// Maps a classified document onto the event it represents.
#[derive(Debug, Clone)]
pub struct EventRule {
    pub document_kind: DocumentKind,
    pub jurisdiction: String,
    pub event_type: EventType,
}

/// One deadline obligation created by an event.
#[derive(Debug, Clone)]
pub struct DeadlineRule {
    pub event_type: EventType,
    pub jurisdiction: String,
    pub deadline_type: DeadlineType,
    pub citation: Option<String>,
    pub offset_days: i64,
    pub court_days: bool,
}

/// What entity type a task template hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRuleTrigger {
    Event(EventType),
    Deadline(DeadlineType),
}

/// One work item template fired by a trigger.
#[derive(Debug, Clone)]
pub struct TaskRule {
    pub trigger: TaskRuleTrigger,
    pub task_type: TaskType,
    pub title: String,
    pub priority: TaskPriority,
    /// Days before the statutory due date the work should be finished.
    pub lead_days: i64,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    version: String,
    #[serde(default)]
    event_rules: Vec<RawEventRule>,
    #[serde(default)]
    deadline_rules: Vec<RawDeadlineRule>,
    #[serde(default)]
    task_rules: Vec<RawTaskRule>,
}

#[derive(Debug, Deserialize)]
struct RawEventRule {
    document_kind: String,
    jurisdiction: String,
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct RawDeadlineRule {
    event_type: String,
    jurisdiction: String,
    deadline_type: String,
    citation: Option<String>,
    offset_days: i64,
    #[serde(default)]
    court_days: bool,
}

#[derive(Debug, Deserialize)]
struct RawTaskRule {
    trigger: String,
    task_type: String,
    title: String,
    priority: String,
    #[serde(default)]
    lead_days: i64,
}

#[derive(Debug, Clone)]
pub struct RuleCatalog {
    version: String,
    event_rules: Vec<EventRule>,
    deadline_rules: Vec<DeadlineRule>,
    task_rules: Vec<TaskRule>,
}

static BUNDLED: LazyLock<Result<RuleCatalog, CatalogError>> =
    LazyLock::new(|| RuleCatalog::from_str(include_str!("default_rules.toml")));

impl RuleCatalog {
    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        match &*BUNDLED {
            Ok(catalog) => Ok(catalog.clone()),
            Err(err) => Err(CatalogError::Parse(err.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&raw)
    }

    pub fn from_str(raw: &str) -> Result<Self, CatalogError> {
        let parsed: RawCatalog =
            toml::from_str(raw).map_err(|e| CatalogError::Parse(e.to_string()))?;

        if parsed.version.trim().is_empty() {
            return Err(CatalogError::InvalidRule(
                "catalog version must not be empty".to_string(),
            ));
        }

        let event_rules = parsed
            .event_rules
            .into_iter()
            .map(|rule| {
                Ok(EventRule {
                    document_kind: DocumentKind::parse(&rule.document_kind),
                    jurisdiction: normalize_jurisdiction(&rule.jurisdiction)?,
                    event_type: EventType::parse(&rule.event_type),
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let deadline_rules = parsed
            .deadline_rules
            .into_iter()
            .map(|rule| {
                if rule.offset_days < 0 {
                    return Err(CatalogError::InvalidRule(format!(
                        "deadline rule for '{}' has negative offset_days {}",
                        rule.event_type, rule.offset_days
                    )));
                }
                Ok(DeadlineRule {
                    event_type: EventType::parse(&rule.event_type),
                    jurisdiction: normalize_jurisdiction(&rule.jurisdiction)?,
                    deadline_type: DeadlineType::parse(&rule.deadline_type),
                    citation: rule.citation,
                    offset_days: rule.offset_days,
                    court_days: rule.court_days,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let task_rules = parsed
            .task_rules
            .into_iter()
            .map(|rule| {
                let priority = TaskPriority::from_db_value(&rule.priority).ok_or_else(|| {
                    CatalogError::InvalidRule(format!(
                        "invalid priority '{}' in task rule '{}'",
                        rule.priority, rule.trigger
                    ))
                })?;
                if rule.lead_days < 0 {
                    return Err(CatalogError::InvalidRule(format!(
                        "task rule '{}' has negative lead_days {}",
                        rule.trigger, rule.lead_days
                    )));
                }
                Ok(TaskRule {
                    trigger: parse_trigger(&rule.trigger)?,
                    task_type: TaskType::parse(&rule.task_type),
                    title: rule.title,
                    priority,
                    lead_days: rule.lead_days,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        Ok(Self {
            version: parsed.version,
            event_rules,
            deadline_rules,
            task_rules,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Event type a (document kind, jurisdiction) pair maps onto, if any.
    pub fn event_type_for(
        &self,
        kind: &DocumentKind,
        jurisdiction: &str,
    ) -> Option<&EventType> {
        let jurisdiction = jurisdiction.to_ascii_uppercase();
        self.event_rules
            .iter()
            .find(|rule| rule.document_kind == *kind && rule.jurisdiction == jurisdiction)
            .map(|rule| &rule.event_type)
    }

    /// All deadline specs firing for (event type, jurisdiction). Empty is
    /// valid: not every event creates an obligation.
    pub fn deadline_specs(
        &self,
        event_type: &EventType,
        jurisdiction: &str,
    ) -> Vec<&DeadlineRule> {
        let jurisdiction = jurisdiction.to_ascii_uppercase();
        self.deadline_rules
            .iter()
            .filter(|rule| rule.event_type == *event_type && rule.jurisdiction == jurisdiction)
            .collect()
    }

    /// Task templates for an event trigger.
    pub fn event_task_templates(&self, event_type: &EventType) -> Vec<&TaskRule> {
        self.task_rules
            .iter()
            .filter(|rule| rule.trigger == TaskRuleTrigger::Event(event_type.clone()))
            .collect()
    }

    /// Task templates for a deadline trigger.
    pub fn deadline_task_templates(&self, deadline_type: &DeadlineType) -> Vec<&TaskRule> {
        self.task_rules
            .iter()
            .filter(|rule| rule.trigger == TaskRuleTrigger::Deadline(deadline_type.clone()))
            .collect()
    }
}

fn normalize_jurisdiction(raw: &str) -> Result<String, CatalogError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidRule(
            "jurisdiction must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

fn parse_trigger(raw: &str) -> Result<TaskRuleTrigger, CatalogError> {
    match raw.split_once(':') {
        Some(("event", value)) if !value.trim().is_empty() => {
            Ok(TaskRuleTrigger::Event(EventType::parse(value)))
        }
        Some(("deadline", value)) if !value.trim().is_empty() => {
            Ok(TaskRuleTrigger::Deadline(DeadlineType::parse(value)))
        }
        _ => Err(CatalogError::InvalidRule(format!(
            "task trigger '{raw}' must be 'event:<type>' or 'deadline:<type>'"
        ))),
    }
}
