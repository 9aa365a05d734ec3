//! One-shot docketing CLI.
//!
//! Creates a case, ingests a single classified document, and prints the
//! derivation result — the thin adapter over the case aggregate. Real
//! deployments wire the aggregate to their own intake and persistence.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use patdock::aggregate::{CaseAggregate, CreateCaseParams, SubmitDocument};
use patdock::config::EngineConfig;
use patdock::model::{DocumentKind, DocumentSource};
use patdock::store::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "patdock", version, about = "Patent prosecution docketing engine")]
struct Cli {
    /// Alternate rule catalog TOML (defaults to the bundled catalog).
    #[arg(long, env = "PATDOCK_RULES_PATH")]
    rules: Option<PathBuf>,

    /// Case jurisdiction.
    #[arg(long, env = "PATDOCK_JURISDICTION")]
    jurisdiction: Option<String>,

    /// Document kind as classified by intake (e.g. office_action).
    #[arg(long)]
    kind: String,

    /// Document source: issuing_office, agent, client, or internal.
    #[arg(long, default_value = "issuing_office")]
    source: String,

    /// Document title.
    #[arg(long)]
    title: String,

    /// Received timestamp (RFC 3339) or date (YYYY-MM-DD); defaults to now.
    #[arg(long)]
    received: Option<String>,

    /// External reference label from the source system.
    #[arg(long)]
    external_ref: Option<String>,

    /// Application number spotted during intake.
    #[arg(long)]
    application_number: Option<String>,

    /// Emit the derivation report and docket as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_received(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date: NaiveDate = raw
        .parse()
        .with_context(|| format!("'{raw}' is neither RFC 3339 nor YYYY-MM-DD"))?;
    let Some(midnight) = date.and_hms_opt(0, 0, 0) else {
        bail!("'{raw}' has no valid midnight");
    };
    Ok(midnight.and_utc())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::resolve()?;
    if cli.rules.is_some() {
        config.rules_path = cli.rules.clone();
    }
    let jurisdiction = cli
        .jurisdiction
        .clone()
        .unwrap_or_else(|| config.default_jurisdiction.clone());

    let source = DocumentSource::from_db_value(&cli.source)
        .with_context(|| format!("unknown document source '{}'", cli.source))?;
    let received_at = match cli.received.as_deref() {
        Some(raw) => parse_received(raw)?,
        None => Utc::now(),
    };

    let catalog = Arc::new(config.load_catalog()?);
    let calendar = Arc::new(config.build_calendar());
    let store = Arc::new(MemoryStore::new());
    let aggregate = CaseAggregate::new(store, catalog, calendar);

    let case_id = aggregate
        .create_case(CreateCaseParams {
            jurisdiction,
            application_number: None,
            filing_date: None,
        })
        .await?;

    let report = aggregate
        .ingest_document(
            case_id,
            SubmitDocument {
                kind: DocumentKind::parse(&cli.kind),
                source,
                title: cli.title.clone(),
                received_at,
                external_ref: cli.external_ref.clone(),
                content_ref: None,
                occurred_override: None,
                application_number: cli.application_number.clone(),
            },
        )
        .await?;

    let snapshot = aggregate.case(case_id).await?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": report,
                "case": snapshot,
            }))?
        );
        return Ok(());
    }

    println!("Case {case_id} ({})", snapshot.case.jurisdiction);
    if let Some(number) = &snapshot.case.application_number {
        println!("  application number: {number}");
    }
    println!(
        "  events: {} created, {} already active",
        report.events_created.len(),
        report.events_already_active.len()
    );
    for skip in &report.skipped {
        println!("  skipped: {}", skip.reason);
    }
    for deadline_id in &report.deadlines_created {
        if let Some(deadline) = snapshot.deadlines.get(deadline_id) {
            println!(
                "  deadline: {} due {}{}",
                deadline.deadline_type,
                deadline.due_date,
                deadline
                    .rule_ref
                    .as_deref()
                    .map(|rule| format!(" ({rule})"))
                    .unwrap_or_default()
            );
        }
    }
    for note in &report.unresolved_specs {
        println!("  unresolved: {} ({})", note.deadline_type, note.reason);
    }
    for task_id in &report.tasks_created {
        if let Some(task) = snapshot.tasks.get(task_id) {
            let due = task
                .due_date
                .map(|d| format!(" due {d}"))
                .unwrap_or_default();
            println!(
                "  task: {} [{}]{due}",
                task.title,
                task.priority.as_str()
            );
        }
    }
    Ok(())
}
