//! CLI subcommand implementations for the `court` binary.

pub mod cache_cmd;
pub mod cause_list_cmd;
pub mod doctor;
pub mod listing_cmd;
pub mod output;
pub mod refresh_cmd;
pub mod search_cmd;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use court_vision::TesseractCli;

use crate::audit::AuditLogger;
use crate::cache::{FileCache, ResultCache};
use crate::config::EngineConfig;
use crate::extraction::dates::parse_date;
use crate::orchestrator::Orchestrator;
use crate::types::CaseQuery;

/// Flags shared by every engine-backed command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub no_audit: bool,
}

impl GlobalOptions {
    pub fn load_config(&self) -> Result<EngineConfig> {
        EngineConfig::load(self.config_path.as_deref()).context("failed to load configuration")
    }

    pub fn open_cache(&self, config: &EngineConfig) -> Result<FileCache> {
        let dir = config.resolved_cache_dir();
        FileCache::open(&dir).with_context(|| format!("failed to open cache at {}", dir.display()))
    }

    /// Wire up the engine the way the binary runs it: file cache, the
    /// tesseract CLI when present, and the audit log unless disabled.
    pub fn build_orchestrator(&self) -> Result<Orchestrator> {
        let config = self.load_config()?;
        let cache: Arc<dyn ResultCache> = Arc::new(self.open_cache(&config)?);
        let mut builder = Orchestrator::builder(config.clone()).cache(cache);

        if config.captcha.enabled {
            match TesseractCli::locate(config.captcha.tesseract_path.as_deref()) {
                Ok(tesseract) => {
                    tracing::debug!("using tesseract at {}", tesseract.binary().display());
                    builder = builder.ocr_engine(Arc::new(tesseract.psm(config.captcha.psm)));
                }
                Err(e) => tracing::warn!("challenge solving disabled: {e}"),
            }
        }

        if !self.no_audit {
            let path = config.resolved_audit_log();
            match AuditLogger::open(&path) {
                Ok(logger) => builder = builder.audit_logger(logger),
                Err(e) => tracing::warn!("audit log disabled: {e:#}"),
            }
        }

        Ok(builder.build()?)
    }
}

/// Today in local time; court calendars are local.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Accept `today`, `tomorrow`, ISO dates and the portal spellings.
pub fn parse_cli_date(raw: &str) -> Result<NaiveDate> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "today" => return Ok(today()),
        "tomorrow" => return Ok(today() + chrono::Duration::days(1)),
        _ => {}
    }
    match parse_date(raw) {
        Some(date) => Ok(date),
        None => bail!("unrecognized date {raw:?} (try YYYY-MM-DD or DD/MM/YYYY)"),
    }
}

/// Parse `TYPE/NUMBER/YEAR`, e.g. `WP/123/2024`.
pub fn parse_case_spec(raw: &str) -> Result<CaseQuery> {
    let mut parts = raw.rsplitn(3, '/');
    let (Some(year), Some(number), Some(case_type)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("expected TYPE/NUMBER/YEAR, got {raw:?}");
    };
    let year: i32 = year
        .trim()
        .parse()
        .with_context(|| format!("invalid year in {raw:?}"))?;
    Ok(CaseQuery::new(case_type, number, year)?)
}
