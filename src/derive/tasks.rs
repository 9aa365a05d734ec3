use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::model::{CaseEvent, CaseSnapshot, Deadline, Task, TaskStatus, TaskTrigger};
use crate::rules::RuleCatalog;

/// The entity a task generation run hangs work off.
#[derive(Debug, Clone, Copy)]
pub enum TaskSeed<'a> {
    Event(&'a CaseEvent),
    Deadline(&'a Deadline),
}

/// Generate the work items a trigger calls for.
///
/// One task per matching template, starting PENDING. Deadline-triggered
/// tasks carry an internal due date `lead_days` before the statutory due
/// date; event-triggered tasks carry none. Mirrors the event deriver's
/// idempotency: a (trigger, task type) pair that already has an open task
/// yields nothing new.
pub fn generate_tasks(
    seed: TaskSeed<'_>,
    snapshot: &CaseSnapshot,
    catalog: &RuleCatalog,
    now: DateTime<Utc>,
) -> Vec<Task> {
    let (trigger, templates, due_for) = match seed {
        TaskSeed::Event(event) => (
            TaskTrigger::Event(event.id),
            catalog.event_task_templates(&event.event_type),
            None,
        ),
        TaskSeed::Deadline(deadline) => (
            TaskTrigger::Deadline(deadline.id),
            catalog.deadline_task_templates(&deadline.deadline_type),
            Some(deadline.due_date),
        ),
    };

    let mut tasks = Vec::new();
    for template in templates {
        let duplicate = snapshot
            .tasks_for_trigger(trigger)
            .any(|task| task.is_open() && task.task_type == template.task_type);
        if duplicate {
            continue;
        }

        tasks.push(Task {
            id: Uuid::new_v4(),
            case_id: snapshot.case.id,
            trigger,
            task_type: template.task_type.clone(),
            title: template.title.clone(),
            status: TaskStatus::Pending,
            priority: template.priority,
            due_date: due_for.map(|due| due - Duration::days(template.lead_days)),
            assignee: None,
            created_at: now,
        });
    }
    tasks
}
