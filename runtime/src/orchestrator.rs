//! Multi-portal acquisition for one logical request.
//!
//! Portals are tried strictly in sequence with a fresh session per
//! request. Every attempt lands in the request's [`AuditTrail`]; no portal
//! failure escapes. When nothing authentic is found, a synthetic result is
//! returned instead, and either way the answer is cached.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use court_vision::OcrEngine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::acquisition::captcha::{detect, CaptchaOutcome, CaptchaPipeline};
use crate::acquisition::http_client::{HttpResponse, SessionManager};
use crate::audit::{AuditLogger, AuditRecord};
use crate::cache::{CacheStats, MemoryCache, ResultCache};
use crate::config::EngineConfig;
use crate::error::{CacheError, EngineError};
use crate::fallback::{synthesize_case, synthesize_cause_list};
use crate::portals::{self, Portal, PortalRequest};
use crate::types::{
    AttemptOutcome, AuditTrail, CaseQuery, CaseRecord, CauseListEntry, CauseListQuery,
    RequestKind, ScrapeAttempt,
};

/// Answer to [`Orchestrator::search_case`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSearchOutcome {
    pub request_id: Uuid,
    pub record: CaseRecord,
    pub elapsed_ms: u64,
    pub cached: bool,
    pub attempts: Vec<ScrapeAttempt>,
}

/// Answer to [`Orchestrator::cause_list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseListOutcome {
    pub request_id: Uuid,
    pub query: CauseListQuery,
    pub entries: Vec<CauseListEntry>,
    /// Entries per court name.
    pub court_wise_count: BTreeMap<String, usize>,
    pub elapsed_ms: u64,
    pub cached: bool,
    pub attempts: Vec<ScrapeAttempt>,
}

impl CauseListOutcome {
    /// Whether the entries are a synthesized placeholder batch.
    pub fn is_synthetic(&self) -> bool {
        self.entries.iter().any(|e| e.data_source.is_synthetic())
    }
}

fn court_wise_count(entries: &[CauseListEntry]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.court_name.clone()).or_insert(0) += 1;
    }
    counts
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u64::MAX as u128) as u64
}

/// Assembles an [`Orchestrator`].
pub struct OrchestratorBuilder {
    config: EngineConfig,
    portals: Option<Vec<Arc<dyn Portal>>>,
    cache: Option<Arc<dyn ResultCache>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    audit: Option<AuditLogger>,
}

impl OrchestratorBuilder {
    /// Use these portals instead of the ones named in the config.
    pub fn portals(mut self, portals: Vec<Arc<dyn Portal>>) -> Self {
        self.portals = Some(portals);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn build(self) -> Result<Orchestrator, EngineError> {
        self.config.validate()?;
        let portals = match self.portals {
            Some(portals) => portals,
            None => portals::from_config(&self.config)?,
        };
        let ocr = if self.config.captcha.enabled { self.ocr } else { None };

        Ok(Orchestrator {
            config: Arc::new(self.config),
            portals,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn ResultCache>),
            captcha: CaptchaPipeline::new(ocr),
            audit: self.audit.map(Mutex::new),
        })
    }
}

/// Sequences portal attempts, caching and fallback.
pub struct Orchestrator {
    config: Arc<EngineConfig>,
    portals: Vec<Arc<dyn Portal>>,
    cache: Arc<dyn ResultCache>,
    captcha: CaptchaPipeline,
    audit: Option<Mutex<AuditLogger>>,
}

impl Orchestrator {
    pub fn builder(config: EngineConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            portals: None,
            cache: None,
            ocr: None,
            audit: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn portal_ids(&self) -> Vec<String> {
        self.portals.iter().map(|p| p.id().to_string()).collect()
    }

    pub fn has_ocr_engine(&self) -> bool {
        self.captcha.has_engine()
    }

    /// Find a case: cache, then each portal in order, then synthesis.
    pub async fn search_case(&self, query: &CaseQuery) -> Result<CaseSearchOutcome, EngineError> {
        let started = Instant::now();
        let key = query.cache_key();
        let mut trail = AuditTrail::new(RequestKind::CaseSearch);

        if let Some(record) = self.cached::<CaseRecord>(&key)? {
            tracing::debug!(key, "case served from cache");
            return Ok(self.finish_case(trail, &key, record, true, started));
        }

        let session = SessionManager::new(&self.config)?;
        let mut found = None;

        for portal in &self.portals {
            tracing::info!(portal = portal.id(), case = %query.display_name(), "searching portal");
            let request = portal.case_search_request(query);
            let Some(fetched) = self.fetch_page(&session, portal.as_ref(), &request, &mut trail).await
            else {
                continue;
            };

            let page = &fetched.response;
            let page_url = Url::parse(&page.final_url).ok();
            match portal.extract_case(&page.body, page_url.as_ref()) {
                Some(details) => {
                    trail.record(
                        portal.id(),
                        AttemptOutcome::Success,
                        format!("case found at {}", page.final_url),
                    );
                    found = Some(CaseRecord::from_portal(query.clone(), portal.id(), details));
                    break;
                }
                None => fetched.record_miss(
                    portal.id(),
                    "page has no recognizable case fields",
                    &mut trail,
                ),
            }
        }

        let record = match found {
            Some(record) => record,
            None => {
                let reason = fallback_reason("no portal returned case data", trail.attempts());
                tracing::warn!(case = %query.display_name(), "{reason}; synthesizing placeholder");
                synthesize_case(query, &reason, Utc::now().date_naive())
            }
        };

        let bytes = serde_json::to_vec(&record).map_err(CacheError::from)?;
        self.cache.set(&key, &bytes, self.config.case_ttl())?;

        Ok(self.finish_case(trail, &key, record, false, started))
    }

    /// One day's hearings: cache, then the union of every portal, then
    /// the court filter, then synthesis if nothing is left.
    pub async fn cause_list(&self, query: &CauseListQuery) -> Result<CauseListOutcome, EngineError> {
        let started = Instant::now();
        let key = query.cache_key();
        let mut trail = AuditTrail::new(RequestKind::CauseList);

        if let Some(entries) = self.cached::<Vec<CauseListEntry>>(&key)? {
            tracing::debug!(key, "cause list served from cache");
            return Ok(self.finish_cause_list(trail, &key, query, entries, true, started));
        }

        let session = SessionManager::new(&self.config)?;
        let date = query.hearing_date;
        let mut extracted = Vec::new();

        for (i, portal) in self.portals.iter().enumerate() {
            if i > 0 && !self.config.portal_delay().is_zero() {
                tokio::time::sleep(self.config.portal_delay()).await;
            }
            tracing::info!(portal = portal.id(), %date, "fetching cause list");
            let request = portal.cause_list_request(date);
            let Some(fetched) = self.fetch_page(&session, portal.as_ref(), &request, &mut trail).await
            else {
                continue;
            };

            let entries = portal.extract_cause_list(&fetched.response.body, date);
            if entries.is_empty() {
                fetched.record_miss(portal.id(), "page has no cause-list rows", &mut trail);
            } else {
                trail.record(
                    portal.id(),
                    AttemptOutcome::Success,
                    format!("{} entries", entries.len()),
                );
                extracted.extend(entries);
            }
        }

        let total = extracted.len();
        let admitted: Vec<CauseListEntry> = extracted
            .into_iter()
            .filter(|e| query.admits(&e.court_name))
            .collect();

        let entries = if admitted.is_empty() {
            let reason = if total == 0 {
                fallback_reason("no portal returned entries", trail.attempts())
            } else {
                format!("no entries matched court filter ({total} extracted)")
            };
            tracing::warn!(%date, "{reason}; synthesizing placeholder list");
            synthesize_cause_list(query, &reason)
        } else {
            admitted
        };

        let bytes = serde_json::to_vec(&entries).map_err(CacheError::from)?;
        self.cache.set(&key, &bytes, self.config.cause_list_ttl())?;

        Ok(self.finish_cause_list(trail, &key, query, entries, false, started))
    }

    /// Drop a case's cached answer. Returns whether one existed.
    pub fn invalidate_case(&self, query: &CaseQuery) -> Result<bool, EngineError> {
        Ok(self.cache.invalidate(&query.cache_key())?)
    }

    /// Drop a cause list's cached answer. Returns whether one existed.
    pub fn invalidate_cause_list(&self, query: &CauseListQuery) -> Result<bool, EngineError> {
        Ok(self.cache.invalidate(&query.cache_key())?)
    }

    pub fn clear_cache(&self) -> Result<usize, EngineError> {
        Ok(self.cache.clear()?)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch one portal page, clearing a challenge if there is one.
    ///
    /// Transport failures and non-2xx pages are recorded in `trail` and
    /// yield `None`. A page whose challenge stays unsolved is still
    /// returned for extraction, marked with the reason.
    async fn fetch_page(
        &self,
        session: &SessionManager,
        portal: &dyn Portal,
        request: &PortalRequest,
        trail: &mut AuditTrail,
    ) -> Option<FetchedPage> {
        let page = self.fetch_checked(session, portal, request, trail).await?;

        let page_url = Url::parse(&page.final_url).ok();
        let Some(mut challenge) = detect(&page.body, page_url.as_ref()) else {
            return Some(FetchedPage::clear(page));
        };

        tracing::info!(portal = portal.id(), "portal presented a challenge");
        match self.captcha.solve(session, &mut challenge).await {
            CaptchaOutcome::Solved {
                field_name,
                solution,
            } => {
                let retry = request.with_field(&field_name, &solution);
                let answered = self.fetch_checked(session, portal, &retry, trail).await?;
                let answered_url = Url::parse(&answered.final_url).ok();
                if detect(&answered.body, answered_url.as_ref()).is_some() {
                    tracing::debug!(portal = portal.id(), "page still challenged after answering");
                    return Some(FetchedPage::challenged(
                        answered,
                        format!("solution {solution:?} rejected: portal challenged again"),
                    ));
                }
                Some(FetchedPage::clear(answered))
            }
            CaptchaOutcome::Unsolved { reason } => Some(FetchedPage::challenged(page, reason)),
        }
    }

    async fn fetch_checked(
        &self,
        session: &SessionManager,
        portal: &dyn Portal,
        request: &PortalRequest,
        trail: &mut AuditTrail,
    ) -> Option<HttpResponse> {
        match session
            .fetch(&request.url, request.method, request.form_fields())
            .await
        {
            Ok(page) if page.is_success() => Some(page),
            Ok(page) => {
                trail.record(
                    portal.id(),
                    AttemptOutcome::NoData,
                    format!("HTTP {} from {}", page.status, page.final_url),
                );
                None
            }
            Err(e) => {
                tracing::warn!(portal = portal.id(), "portal unreachable: {e}");
                trail.record(portal.id(), AttemptOutcome::NetworkError, e.to_string());
                None
            }
        }
    }

    /// Cached value for `key`. Undecodable entries are dropped and missed.
    fn cached<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EngineError> {
        let Some(bytes) = self.cache.get(key)? else {
            tracing::debug!(key, "cache miss");
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, "dropping undecodable cache entry: {e}");
                self.cache.invalidate(key)?;
                Ok(None)
            }
        }
    }

    fn finish_case(
        &self,
        trail: AuditTrail,
        key: &str,
        record: CaseRecord,
        cached: bool,
        started: Instant,
    ) -> CaseSearchOutcome {
        let elapsed_ms = elapsed_ms(started);
        self.write_audit(&trail, key, record.data_source.label(), cached, elapsed_ms);
        tracing::info!(
            case = %record.query.display_name(),
            source = %record.data_source.label(),
            cached,
            elapsed_ms,
            "case search finished"
        );
        CaseSearchOutcome {
            request_id: trail.request_id,
            record,
            elapsed_ms,
            cached,
            attempts: trail.attempts().to_vec(),
        }
    }

    fn finish_cause_list(
        &self,
        trail: AuditTrail,
        key: &str,
        query: &CauseListQuery,
        entries: Vec<CauseListEntry>,
        cached: bool,
        started: Instant,
    ) -> CauseListOutcome {
        let elapsed_ms = elapsed_ms(started);
        let label = entries
            .first()
            .map(|e| e.data_source.label())
            .unwrap_or_else(|| "EMPTY".to_string());
        self.write_audit(&trail, key, label, cached, elapsed_ms);
        tracing::info!(
            date = %query.hearing_date,
            entries = entries.len(),
            cached,
            elapsed_ms,
            "cause list finished"
        );
        CauseListOutcome {
            request_id: trail.request_id,
            query: query.clone(),
            court_wise_count: court_wise_count(&entries),
            entries,
            elapsed_ms,
            cached,
            attempts: trail.attempts().to_vec(),
        }
    }

    fn write_audit(&self, trail: &AuditTrail, key: &str, label: String, cached: bool, elapsed_ms: u64) {
        let Some(audit) = &self.audit else {
            return;
        };
        let record = AuditRecord::from_trail(trail, key, label, cached, elapsed_ms);
        match audit.lock() {
            Ok(mut logger) => {
                if let Err(e) = logger.log(&record) {
                    tracing::warn!("failed to write audit record: {e:#}");
                }
            }
            Err(_) => tracing::warn!("audit logger lock poisoned; record dropped"),
        }
    }
}

/// A 2xx portal page and whether a challenge on it is still standing.
struct FetchedPage {
    response: HttpResponse,
    unsolved_challenge: Option<String>,
}

impl FetchedPage {
    fn clear(response: HttpResponse) -> Self {
        Self {
            response,
            unsolved_challenge: None,
        }
    }

    fn challenged(response: HttpResponse, reason: String) -> Self {
        Self {
            response,
            unsolved_challenge: Some(reason),
        }
    }

    /// Record an extraction miss. A standing challenge explains the miss.
    fn record_miss(&self, portal_id: &str, no_data_detail: &str, trail: &mut AuditTrail) {
        match &self.unsolved_challenge {
            Some(reason) => trail.record(portal_id, AttemptOutcome::CaptchaUnsolved, reason.clone()),
            None => trail.record(portal_id, AttemptOutcome::NoData, no_data_detail),
        }
    }
}

/// Reason string for a synthetic result, summarizing each attempt.
fn fallback_reason(headline: &str, attempts: &[ScrapeAttempt]) -> String {
    if attempts.is_empty() {
        return headline.to_string();
    }
    let summary: Vec<String> = attempts
        .iter()
        .map(|a| format!("{}: {}", a.portal_id, a.outcome.as_str()))
        .collect();
    format!("{headline} ({})", summary.join(", "))
}
