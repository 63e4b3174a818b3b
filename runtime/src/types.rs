//! Data model shared by every stage of the acquisition pipeline.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueryError;

/// Oldest filing year a query may name.
pub const MIN_CASE_YEAR: i32 = 1950;
/// Newest filing year a query may name.
pub const MAX_CASE_YEAR: i32 = 2030;
/// Longest case number accepted.
pub const MAX_CASE_NUMBER_LEN: usize = 100;

/// Identity of a case: what the caller asks for, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseQuery {
    pub case_type: String,
    pub case_number: String,
    pub year: i32,
}

impl CaseQuery {
    /// Normalize and validate a case identity.
    ///
    /// The case type is upper-cased with inner whitespace collapsed; the
    /// case number is trimmed.
    pub fn new(case_type: &str, case_number: &str, year: i32) -> Result<Self, QueryError> {
        let case_type = case_type
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if case_type.is_empty() {
            return Err(QueryError::EmptyCaseType);
        }

        let case_number = case_number.trim().to_string();
        if case_number.is_empty() {
            return Err(QueryError::EmptyCaseNumber);
        }
        if case_number.chars().count() > MAX_CASE_NUMBER_LEN {
            return Err(QueryError::CaseNumberTooLong(case_number.chars().count()));
        }

        if !(MIN_CASE_YEAR..=MAX_CASE_YEAR).contains(&year) {
            return Err(QueryError::YearOutOfRange(year));
        }

        Ok(Self {
            case_type,
            case_number,
            year,
        })
    }

    /// Deterministic cache key for this case.
    pub fn cache_key(&self) -> String {
        format!("case:{}:{}:{}", self.case_type, self.case_number, self.year)
    }

    /// Human-readable form, e.g. `WP 123/2024`.
    pub fn display_name(&self) -> String {
        format!("{} {}/{}", self.case_type, self.case_number, self.year)
    }
}

/// A request for one day's cause list, optionally narrowed to some courts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CauseListQuery {
    pub hearing_date: NaiveDate,
    pub court_name: Option<String>,
}

impl CauseListQuery {
    /// Build a query; a blank court filter means "all courts".
    pub fn new(hearing_date: NaiveDate, court_name: Option<&str>) -> Self {
        let court_name = court_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        Self {
            hearing_date,
            court_name,
        }
    }

    /// Reject dates more than five years before the start of this year or
    /// after the end of next year.
    pub fn validate_window(&self, today: NaiveDate) -> Result<(), QueryError> {
        let earliest = NaiveDate::from_ymd_opt(today.year() - 5, 1, 1).unwrap_or(NaiveDate::MIN);
        let latest = NaiveDate::from_ymd_opt(today.year() + 1, 12, 31).unwrap_or(NaiveDate::MAX);
        if self.hearing_date < earliest || self.hearing_date > latest {
            return Err(QueryError::HearingDateOutOfWindow {
                date: self.hearing_date,
                earliest,
                latest,
            });
        }
        Ok(())
    }

    /// Deterministic cache key for this date and filter.
    pub fn cache_key(&self) -> String {
        let filter = self
            .court_name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "all".to_string());
        format!("cause_list:{}:{}", self.hearing_date.format("%Y-%m-%d"), filter)
    }

    /// Whether `court_name` passes the case-insensitive substring filter.
    pub fn admits(&self, court_name: &str) -> bool {
        match &self.court_name {
            Some(filter) => court_name.to_lowercase().contains(&filter.to_lowercase()),
            None => true,
        }
    }
}

/// Tier of the court a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourtType {
    HighCourt,
    DistrictCourt,
}

impl CourtType {
    pub fn as_str(self) -> &'static str {
        match self {
            CourtType::HighCourt => "HIGH_COURT",
            CourtType::DistrictCourt => "DISTRICT_COURT",
        }
    }
}

/// Where a record's content came from.
///
/// Synthetic data always carries the reason it was generated, so it can
/// never be confused with extracted data once serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    RealPortal { portal: String },
    SyntheticFallback { reason: String },
}

impl DataSource {
    pub fn real(portal: &str) -> Self {
        DataSource::RealPortal {
            portal: portal.to_string(),
        }
    }

    pub fn synthetic(reason: impl Into<String>) -> Self {
        DataSource::SyntheticFallback {
            reason: reason.into(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::SyntheticFallback { .. })
    }

    /// Flat label, e.g. `REAL_PORTAL:high_court` or
    /// `SYNTHETIC_FALLBACK:no portal returned data`.
    pub fn label(&self) -> String {
        match self {
            DataSource::RealPortal { portal } => format!("REAL_PORTAL:{portal}"),
            DataSource::SyntheticFallback { reason } => format!("SYNTHETIC_FALLBACK:{reason}"),
        }
    }
}

/// Kind of a linked court document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JudgmentKind {
    Judgment,
    Order,
}

/// A judgment or order linked from a case page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub kind: JudgmentKind,
    pub url: String,
    pub text: String,
    pub date: Option<NaiveDate>,
}

/// Descriptive fields of a found case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetails {
    pub petitioner: Option<String>,
    pub respondent: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub next_hearing_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub court_name: Option<String>,
    pub court_type: CourtType,
    pub judge_name: Option<String>,
    pub court_hall: Option<String>,
    pub case_category: Option<String>,
    pub judgments: Vec<Judgment>,
}

/// The answer to a case search.
///
/// `found` is derived from `details`: a record without details carries no
/// descriptive fields at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub query: CaseQuery,
    pub found: bool,
    pub data_source: DataSource,
    pub details: Option<CaseDetails>,
}

impl CaseRecord {
    /// A record built strictly from one portal's extractor output.
    pub fn from_portal(query: CaseQuery, portal: &str, details: CaseDetails) -> Self {
        Self {
            query,
            found: true,
            data_source: DataSource::real(portal),
            details: Some(details),
        }
    }

    /// A record built strictly by the fallback synthesis policy.
    pub fn synthetic(query: CaseQuery, reason: &str, details: CaseDetails) -> Self {
        Self {
            query,
            found: true,
            data_source: DataSource::synthetic(reason),
            details: Some(details),
        }
    }
}

/// One hearing in a day's cause list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseListEntry {
    pub court_name: String,
    pub court_type: CourtType,
    pub case_number: String,
    pub case_type: String,
    pub case_year: Option<i32>,
    pub parties: String,
    pub hearing_date: NaiveDate,
    pub hearing_time: Option<String>,
    pub court_hall: Option<String>,
    pub judge_name: Option<String>,
    pub hearing_purpose: Option<String>,
    pub data_source: DataSource,
}

impl CauseListEntry {
    /// Whether this listing is for `query`.
    ///
    /// Case type and year must agree, and the case-number cell must carry
    /// the queried number as one of its numeric tokens.
    pub fn matches(&self, query: &CaseQuery) -> bool {
        if !self.case_type.trim().eq_ignore_ascii_case(&query.case_type) {
            return false;
        }
        if self.case_year.is_some_and(|y| y != query.year) {
            return false;
        }
        if self.case_number.trim() == query.case_number {
            return true;
        }
        let wanted = query.case_number.trim_start_matches('0');
        self.case_number
            .split(|c: char| !c.is_ascii_digit())
            .filter(|t| !t.is_empty())
            .any(|t| t.trim_start_matches('0') == wanted)
    }
}

/// How one portal attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Success,
    NoData,
    CaptchaUnsolved,
    NetworkError,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "SUCCESS",
            AttemptOutcome::NoData => "NO_DATA",
            AttemptOutcome::CaptchaUnsolved => "CAPTCHA_UNSOLVED",
            AttemptOutcome::NetworkError => "NETWORK_ERROR",
        }
    }
}

/// Audit record of a single portal attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeAttempt {
    pub portal_id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub detail: String,
}

/// Which public operation produced an audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    CaseSearch,
    CauseList,
}

/// Append-only attempt log for one logical request.
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub request_id: Uuid,
    pub kind: RequestKind,
    pub started_at: DateTime<Utc>,
    attempts: Vec<ScrapeAttempt>,
}

impl AuditTrail {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
            attempts: Vec::new(),
        }
    }

    pub fn record(&mut self, portal_id: &str, outcome: AttemptOutcome, detail: impl Into<String>) {
        self.attempts.push(ScrapeAttempt {
            portal_id: portal_id.to_string(),
            timestamp: Utc::now(),
            outcome,
            detail: detail.into(),
        });
    }

    pub fn attempts(&self) -> &[ScrapeAttempt] {
        &self.attempts
    }
}
