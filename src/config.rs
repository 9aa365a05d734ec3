//! Engine configuration.
//!
//! Resolved from environment variables with secure defaults; a `.env`
//! file is honored when the CLI loads one. The rule catalog itself is
//! data, not configuration — this only decides where it comes from.

use std::path::PathBuf;

use crate::calendar::OfficeCalendar;
use crate::error::{CatalogError, ConfigError};
use crate::rules::RuleCatalog;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Alternate rule catalog file; the bundled catalog applies when absent.
    pub rules_path: Option<PathBuf>,
    /// Jurisdiction assigned to new cases when the caller names none.
    pub default_jurisdiction: String,
    /// Jurisdictions the office calendar recognizes.
    pub calendar_jurisdictions: Vec<String>,
}

impl EngineConfig {
    pub fn resolve() -> Result<Self, ConfigError> {
        Self::resolve_from(&|key| std::env::var(key).ok())
    }

    fn resolve_from(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let rules_path = env("PATDOCK_RULES_PATH")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let default_jurisdiction = match env("PATDOCK_JURISDICTION") {
            Some(raw) => {
                let trimmed = raw.trim().to_ascii_uppercase();
                if trimmed.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "PATDOCK_JURISDICTION".to_string(),
                        message: "jurisdiction must not be empty".to_string(),
                    });
                }
                trimmed
            }
            None => "US".to_string(),
        };

        let calendar_jurisdictions = match env("PATDOCK_CALENDAR_JURISDICTIONS") {
            Some(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_ascii_uppercase)
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "PATDOCK_CALENDAR_JURISDICTIONS".to_string(),
                        message: "expected a comma-separated jurisdiction list".to_string(),
                    });
                }
                parsed
            }
            None => vec!["US".to_string(), "EP".to_string()],
        };

        Ok(Self {
            rules_path,
            default_jurisdiction,
            calendar_jurisdictions,
        })
    }

    /// The configured catalog: the file when one is named, otherwise the
    /// bundled tables.
    pub fn load_catalog(&self) -> Result<RuleCatalog, CatalogError> {
        match &self.rules_path {
            Some(path) => RuleCatalog::from_path(path),
            None => RuleCatalog::bundled(),
        }
    }

    pub fn build_calendar(&self) -> OfficeCalendar {
        OfficeCalendar::new(&self.calendar_jurisdictions)
    }
}
