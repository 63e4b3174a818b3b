//! JSONL audit logger: one line per logical request.
//!
//! Features:
//! - Append-only JSONL format for easy parsing
//! - Automatic log rotation when the file exceeds `MAX_LOG_SIZE` (100MB)
//! - Rotated files named `.1`, `.2`, etc. (max 5 rotations)

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AuditTrail, RequestKind, ScrapeAttempt};

/// Maximum audit log size before rotation (100 MB).
const MAX_LOG_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum number of rotated log files to keep.
const MAX_ROTATIONS: u32 = 5;

/// What happened to one logical request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_id: Uuid,
    pub kind: RequestKind,
    pub cache_key: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Final data-source label, e.g. `REAL_PORTAL:high_court`.
    pub data_source: String,
    pub cached: bool,
    pub attempts: Vec<ScrapeAttempt>,
}

impl AuditRecord {
    pub fn from_trail(
        trail: &AuditTrail,
        cache_key: &str,
        data_source: String,
        cached: bool,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            request_id: trail.request_id,
            kind: trail.kind,
            cache_key: cache_key.to_string(),
            started_at: trail.started_at,
            elapsed_ms,
            data_source,
            cached,
            attempts: trail.attempts().to_vec(),
        }
    }
}

/// Append-only JSONL audit logger with automatic rotation.
pub struct AuditLogger {
    file: File,
    path: PathBuf,
    max_size: u64,
    /// Approximate current size (may drift slightly; re-checked on rotation).
    current_size: u64,
}

impl AuditLogger {
    /// Open or create the audit log file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(path)
            .with_context(|| format!("failed to open audit log: {}", path.display()))?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            max_size: MAX_LOG_SIZE,
            current_size,
        })
    }

    /// Rotate at `max_size` bytes instead of the default.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn log(&mut self, record: &AuditRecord) -> Result<()> {
        if self.current_size >= self.max_size {
            self.rotate()?;
        }

        let json = serde_json::to_string(record)?;
        writeln!(self.file, "{json}").context("failed to append audit record")?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    /// Rotate log files: audit.jsonl → audit.jsonl.1, .1 → .2, etc.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        // Drop the oldest generation first so the shift below never
        // overwrites anything still wanted.
        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }
        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, rotation_path(&self.path, i + 1));
            }
        }
        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        self.file = open_append(&self.path).context("failed to reopen audit log after rotation")?;
        self.current_size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Build path for a rotated log file: `audit.jsonl.1`, `audit.jsonl.2`, etc.
fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audit.jsonl")
    );
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttemptOutcome;

    fn record() -> AuditRecord {
        let mut trail = AuditTrail::new(RequestKind::CaseSearch);
        trail.record("high_court", AttemptOutcome::NetworkError, "HTTP 503 x4");
        trail.record("district_court", AttemptOutcome::Success, "found");
        AuditRecord::from_trail(&trail, "case:WP:1:2024", "REAL_PORTAL:district_court".into(), false, 120)
    }

    #[test]
    fn test_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut logger = AuditLogger::open(&path).unwrap();
        logger.log(&record()).unwrap();
        logger.log(&record()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.attempts.len(), 2);
        assert_eq!(parsed.attempts[0].outcome, AttemptOutcome::NetworkError);
        assert_eq!(parsed.cache_key, "case:WP:1:2024");
    }

    #[test]
    fn test_rotation_keeps_bounded_generations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut logger = AuditLogger::open(&path).unwrap().with_max_size(1);
        for _ in 0..(MAX_ROTATIONS + 3) {
            logger.log(&record()).unwrap();
        }

        assert!(path.exists());
        for i in 1..=MAX_ROTATIONS {
            assert!(rotation_path(&path, i).exists(), "generation {i}");
        }
        assert!(!rotation_path(&path, MAX_ROTATIONS + 1).exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
