//! The derivation pipeline: document -> event -> deadline -> task.
//!
//! Each component is a pure function of (input entity, case snapshot, rule
//! catalog, calendar). None of them mutates shared state or persists
//! anything; they return structured results the case aggregate applies
//! transactionally.

mod deadlines;
mod events;
mod tasks;

pub use deadlines::{DeadlineComputation, UnresolvedSpec, compute_deadlines};
pub use events::{EventDerivation, SkipReason, SkippedDocument, derive_events};
pub use tasks::{TaskSeed, generate_tasks};
