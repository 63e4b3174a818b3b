//! Entry points for an external scheduler, plus the listing check.
//!
//! Nothing here schedules anything: each function does one batch of work
//! against an [`Orchestrator`] and returns what happened.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::EngineError;
use crate::orchestrator::{CaseSearchOutcome, Orchestrator};
use crate::types::{CaseQuery, CauseListEntry, CauseListQuery};

/// Days after `start` fetched by the daily job.
pub const DEFAULT_PREFETCH_DAYS: u32 = 3;

/// Result of prefetching one date.
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchSummary {
    pub hearing_date: NaiveDate,
    pub entries: usize,
    pub synthetic: bool,
    pub cached: bool,
    pub elapsed_ms: u64,
}

/// Whether a case appears in a day's cause list.
#[derive(Debug, Clone, Serialize)]
pub struct ListingCheck {
    pub query: CaseQuery,
    pub hearing_date: NaiveDate,
    pub listed: bool,
    pub listings: Vec<CauseListEntry>,
    /// The day's list itself was synthesized, so absence proves nothing.
    pub list_unavailable: bool,
}

/// Hearing dates `start..=start + days`.
pub fn date_range(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    start.iter_days().take(days as usize + 1).collect()
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Warm the cache with the unfiltered cause lists of `start` and the
/// `days` following dates, pausing between dates.
pub async fn prefetch_cause_lists(
    orchestrator: &Orchestrator,
    start: NaiveDate,
    days: u32,
) -> Result<Vec<PrefetchSummary>, EngineError> {
    let delay = orchestrator.config().portal_delay();
    let mut summaries = Vec::new();

    for (i, date) in date_range(start, days).into_iter().enumerate() {
        if i > 0 {
            pause(delay).await;
        }
        let outcome = orchestrator.cause_list(&CauseListQuery::new(date, None)).await?;
        if outcome.is_synthetic() {
            tracing::warn!(%date, "no authentic cause list available");
        } else {
            tracing::info!(%date, entries = outcome.entries.len(), "cause list prefetched");
        }
        summaries.push(PrefetchSummary {
            hearing_date: date,
            entries: outcome.entries.len(),
            synthetic: outcome.is_synthetic(),
            cached: outcome.cached,
            elapsed_ms: outcome.elapsed_ms,
        });
    }

    Ok(summaries)
}

/// Re-acquire each case from the portals, bypassing the cache.
pub async fn refresh_cases(
    orchestrator: &Orchestrator,
    queries: &[CaseQuery],
) -> Result<Vec<CaseSearchOutcome>, EngineError> {
    let delay = orchestrator.config().portal_delay();
    let mut outcomes = Vec::with_capacity(queries.len());

    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            pause(delay).await;
        }
        orchestrator.invalidate_case(query)?;
        let outcome = orchestrator.search_case(query).await?;
        tracing::info!(
            case = %query.display_name(),
            source = %outcome.record.data_source.label(),
            "case refreshed"
        );
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// Look `query` up in the full cause list for `date`.
///
/// Synthetic entries never count as listings.
pub async fn find_listing(
    orchestrator: &Orchestrator,
    query: &CaseQuery,
    date: NaiveDate,
) -> Result<ListingCheck, EngineError> {
    let outcome = orchestrator.cause_list(&CauseListQuery::new(date, None)).await?;
    let list_unavailable = outcome.is_synthetic();

    let listings: Vec<CauseListEntry> = outcome
        .entries
        .into_iter()
        .filter(|e| !e.data_source.is_synthetic() && e.matches(query))
        .collect();

    Ok(ListingCheck {
        query: query.clone(),
        hearing_date: date,
        listed: !listings.is_empty(),
        listings,
        list_unavailable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_crosses_year_end() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let dates = date_range(start, DEFAULT_PREFETCH_DAYS);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[0], start);
        assert_eq!(dates[3], NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(date_range(start, 0), vec![start]);
    }
}
