//! Error types for the acquisition engine.
//!
//! Portal-level failures (network, missing data, unsolved challenges) are
//! recorded as attempt outcomes and never abort a request. Only
//! [`EngineError`] escapes the orchestrator, and only when a dependency the
//! engine cannot work without (cache, configuration) is broken.

use chrono::NaiveDate;

/// A fetch that could not produce a response.
#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    /// Every allowed attempt hit a transient failure.
    #[error("{method} {url} failed after {attempts} attempts: {last_failure}")]
    Exhausted {
        method: &'static str,
        url: String,
        attempts: u32,
        last_failure: String,
    },

    /// The request itself is malformed; retrying cannot help.
    #[error("{method} {url} could not be sent: {reason}")]
    Rejected {
        method: &'static str,
        url: String,
        reason: String,
    },

    /// Headers arrived but the body could not be read.
    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Input that does not describe a plausible case or hearing date.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("case type must not be empty")]
    EmptyCaseType,

    #[error("case number must not be empty")]
    EmptyCaseNumber,

    #[error("case number is {0} characters long (max {max})", max = crate::types::MAX_CASE_NUMBER_LEN)]
    CaseNumberTooLong(usize),

    #[error("year {0} is outside {min}..={max}", min = crate::types::MIN_CASE_YEAR, max = crate::types::MAX_CASE_YEAR)]
    YearOutOfRange(i32),

    #[error("hearing date {date} is outside the accepted window {earliest}..={latest}")]
    HearingDateOutOfWindow {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
}

/// The result cache could not be read or written.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Configuration that cannot drive the engine.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal failures of the orchestrator itself.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("session setup failed: {0}")]
    Session(#[from] NetworkError),
}
