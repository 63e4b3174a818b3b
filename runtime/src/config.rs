//! Engine configuration: defaults, JSON file, environment overrides.
//!
//! The resolved [`EngineConfig`] is an immutable value handed to the
//! orchestrator at construction. Resolution order, later wins:
//!
//! 1. built-in defaults
//! 2. a JSON file (`--config`, else `COURT_CONFIG`, else
//!    `~/.court/config.json` when present)
//! 3. `COURT_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_HIGH_COURT_URL: &str = "https://hcservices.ecourts.gov.in/hcservices/main.php";
const DEFAULT_DISTRICT_COURT_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6/";
const DEFAULT_DELHI_HC_URL: &str = "https://delhihighcourt.nic.in/app/case-status";

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

/// Which extractor family a portal uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalKind {
    HighCourt,
    DistrictCourt,
    DelhiHighCourt,
}

impl PortalKind {
    /// Stable identifier used in audit trails and data-source labels.
    pub fn id(self) -> &'static str {
        match self {
            PortalKind::HighCourt => "high_court",
            PortalKind::DistrictCourt => "district_court",
            PortalKind::DelhiHighCourt => "delhi_high_court",
        }
    }
}

/// One target portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub kind: PortalKind,
    pub base_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Challenge-solving settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub enabled: bool,
    /// Explicit tesseract binary; otherwise located on `PATH`.
    pub tesseract_path: Option<PathBuf>,
    /// Tesseract page segmentation mode.
    pub psm: u8,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_path: None,
            psm: 7,
        }
    }
}

/// Everything the engine reads at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Portals in the order they are tried.
    pub portals: Vec<PortalConfig>,
    /// Base pause before every request.
    pub request_delay_ms: u64,
    /// Upper bound of the uniform jitter added to the base pause.
    pub jitter_ms: u64,
    /// Retries after the first attempt on transient failures.
    pub max_retries: u32,
    /// Backoff unit: retry `n` waits `n * retry_interval_ms`.
    pub retry_interval_ms: u64,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Pause between portals during a cause-list sweep.
    pub portal_delay_ms: u64,
    pub case_cache_ttl_hours: u64,
    pub cause_list_cache_ttl_hours: u64,
    pub user_agents: Vec<String>,
    /// Directory of the file-backed result cache.
    pub cache_dir: Option<PathBuf>,
    /// JSONL audit log path.
    pub audit_log: Option<PathBuf>,
    pub captcha: CaptchaConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            portals: vec![
                PortalConfig {
                    kind: PortalKind::HighCourt,
                    base_url: DEFAULT_HIGH_COURT_URL.to_string(),
                    enabled: true,
                },
                PortalConfig {
                    kind: PortalKind::DistrictCourt,
                    base_url: DEFAULT_DISTRICT_COURT_URL.to_string(),
                    enabled: true,
                },
                PortalConfig {
                    kind: PortalKind::DelhiHighCourt,
                    base_url: DEFAULT_DELHI_HC_URL.to_string(),
                    enabled: false,
                },
            ],
            request_delay_ms: 2000,
            jitter_ms: 1000,
            max_retries: 3,
            retry_interval_ms: 1000,
            request_timeout_ms: 30_000,
            portal_delay_ms: 2000,
            case_cache_ttl_hours: 24,
            cause_list_cache_ttl_hours: 6,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            cache_dir: None,
            audit_log: None,
            captcha: CaptchaConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Resolve the full configuration from file and process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `COURT_*` overrides looked up through `lookup`.
    ///
    /// Unparsable numeric values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read_u64 = |name: &str| -> Option<u64> {
            let raw = lookup(name)?;
            match raw.trim().parse::<u64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("ignoring {name}={raw:?}: not an unsigned integer");
                    None
                }
            }
        };

        if let Some(v) = read_u64("COURT_REQUEST_DELAY_MS") {
            self.request_delay_ms = v;
        }
        if let Some(v) = read_u64("COURT_JITTER_MS") {
            self.jitter_ms = v;
        }
        if let Some(v) = read_u64("COURT_MAX_RETRIES") {
            self.max_retries = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = read_u64("COURT_RETRY_INTERVAL_MS") {
            self.retry_interval_ms = v;
        }
        if let Some(v) = read_u64("COURT_TIMEOUT_MS") {
            self.request_timeout_ms = v;
        }
        if let Some(v) = read_u64("COURT_CASE_TTL_HOURS") {
            self.case_cache_ttl_hours = v;
        }
        if let Some(v) = read_u64("COURT_CAUSE_LIST_TTL_HOURS") {
            self.cause_list_cache_ttl_hours = v;
        }

        for (name, kind) in [
            ("COURT_HIGH_COURT_URL", PortalKind::HighCourt),
            ("COURT_DISTRICT_COURT_URL", PortalKind::DistrictCourt),
            ("COURT_DELHI_HC_URL", PortalKind::DelhiHighCourt),
        ] {
            if let Some(url) = lookup(name).map(|v| v.trim().to_string()) {
                if url.is_empty() {
                    continue;
                }
                match self.portals.iter_mut().find(|p| p.kind == kind) {
                    Some(portal) => {
                        portal.base_url = url;
                        portal.enabled = true;
                    }
                    None => self.portals.push(PortalConfig {
                        kind,
                        base_url: url,
                        enabled: true,
                    }),
                }
            }
        }

        if let Some(dir) = lookup("COURT_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(path) = lookup("COURT_AUDIT_LOG").filter(|v| !v.trim().is_empty()) {
            self.audit_log = Some(PathBuf::from(path.trim()));
        }
        if let Some(path) = lookup("COURT_TESSERACT_PATH").filter(|v| !v.trim().is_empty()) {
            self.captcha.tesseract_path = Some(PathBuf::from(path.trim()));
        }
    }

    /// Check that this configuration can drive the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let enabled: Vec<_> = self.enabled_portals().collect();
        if enabled.is_empty() {
            return Err(ConfigError::Invalid("no portal is enabled".to_string()));
        }
        for portal in enabled {
            url::Url::parse(&portal.base_url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "portal {} has an invalid base_url {:?}: {e}",
                    portal.kind.id(),
                    portal.base_url
                ))
            })?;
        }
        if self.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::Invalid("user_agents must not be empty".to_string()));
        }
        if self.case_cache_ttl_hours == 0 || self.cause_list_cache_ttl_hours == 0 {
            return Err(ConfigError::Invalid("cache TTLs must be at least one hour".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Enabled portals, in configured order.
    pub fn enabled_portals(&self) -> impl Iterator<Item = &PortalConfig> {
        self.portals.iter().filter(|p| p.enabled)
    }

    pub fn case_ttl(&self) -> Duration {
        Duration::from_secs(self.case_cache_ttl_hours * 3600)
    }

    pub fn cause_list_ttl(&self) -> Duration {
        Duration::from_secs(self.cause_list_cache_ttl_hours * 3600)
    }

    pub fn portal_delay(&self) -> Duration {
        Duration::from_millis(self.portal_delay_ms)
    }

    /// Cache directory, defaulting to `~/.court/cache`.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| court_home().join("cache"))
    }

    /// Audit log path, defaulting to `~/.court/audit.jsonl`.
    pub fn resolved_audit_log(&self) -> PathBuf {
        self.audit_log
            .clone()
            .unwrap_or_else(|| court_home().join("audit.jsonl"))
    }
}

fn default_true() -> bool {
    true
}

fn court_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".court")
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var("COURT_CONFIG") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path.trim()));
        }
    }
    let home_config = court_home().join("config.json");
    home_config.exists().then_some(home_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.case_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.cause_list_ttl(), Duration::from_secs(6 * 3600));
        let ids: Vec<_> = config.enabled_portals().map(|p| p.kind.id()).collect();
        assert_eq!(ids, vec!["high_court", "district_court"]);
    }

    #[test]
    fn test_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("COURT_MAX_RETRIES", "5"),
            ("COURT_REQUEST_DELAY_MS", " 250 "),
            ("COURT_JITTER_MS", "lots"),
            ("COURT_DELHI_HC_URL", "http://127.0.0.1:9000/delhi"),
            ("COURT_CACHE_DIR", "/var/cache/court"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_delay_ms, 250);
        assert_eq!(config.jitter_ms, 1000, "unparsable value is ignored");
        let delhi = config
            .portals
            .iter()
            .find(|p| p.kind == PortalKind::DelhiHighCourt)
            .unwrap();
        assert!(delhi.enabled);
        assert_eq!(delhi.base_url, "http://127.0.0.1:9000/delhi");
        assert_eq!(config.resolved_cache_dir(), PathBuf::from("/var/cache/court"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_retries": 1, "portals": [{"kind": "district_court", "base_url": "http://localhost/dc"}]}"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.case_cache_ttl_hours, 24);
        assert_eq!(config.portals.len(), 1);
        assert!(config.portals[0].enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_broken_configs() {
        let mut no_portals = EngineConfig::default();
        no_portals.portals.iter_mut().for_each(|p| p.enabled = false);
        assert!(no_portals.validate().is_err());

        let mut bad_url = EngineConfig::default();
        bad_url.portals[0].base_url = "not a url".to_string();
        assert!(bad_url.validate().is_err());

        let mut no_agents = EngineConfig::default();
        no_agents.user_agents.clear();
        assert!(no_agents.validate().is_err());

        let mut zero_ttl = EngineConfig::default();
        zero_ttl.case_cache_ttl_hours = 0;
        assert!(zero_ttl.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
