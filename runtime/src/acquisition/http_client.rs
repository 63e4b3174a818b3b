//! Paced, retrying HTTP session for court portals.
//!
//! One [`SessionManager`] serves one logical request: it keeps a cookie
//! jar across the search page, challenge image and resubmission, rotates
//! the user agent per request, sleeps a jittered delay before every send
//! and retries transient failures with linear backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::EngineConfig;
use crate::error::NetworkError;

/// Statuses that are retried instead of returned.
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-IN,en;q=0.9,hi;q=0.8",
    "en-GB,en;q=0.9",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Request method understood by the portals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

/// A response whose body was read as text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Linear backoff: retry `n` waits `n * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// Total sends allowed for one fetch.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self, retry: u32) -> Duration {
        self.interval.saturating_mul(retry)
    }
}

/// Pause taken before every request: `base + uniform(0..=jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub base: Duration,
    pub jitter: Duration,
}

impl Pacing {
    fn sample(&self, rng: &mut impl Rng) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rng.gen_range(0..=jitter_ms)
        };
        self.base + Duration::from_millis(extra)
    }
}

/// Cookie-holding HTTP session with pacing, rotation and retry.
#[derive(Clone)]
pub struct SessionManager {
    client: reqwest::Client,
    user_agents: Arc<[String]>,
    pacing: Pacing,
    retry: RetryPolicy,
}

impl SessionManager {
    /// Build a fresh session (empty cookie jar) from engine settings.
    pub fn new(config: &EngineConfig) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;

        let user_agents: Arc<[String]> = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();

        Ok(Self {
            client,
            user_agents,
            pacing: Pacing {
                base: Duration::from_millis(config.request_delay_ms),
                jitter: Duration::from_millis(config.jitter_ms),
            },
            retry: RetryPolicy {
                max_retries: config.max_retries,
                interval: Duration::from_millis(config.retry_interval_ms),
            },
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch a page as text. Non-transient statuses (including 4xx) are
    /// returned as responses; the caller decides what they mean.
    pub async fn fetch(
        &self,
        url: &str,
        method: RequestMethod,
        form: Option<&[(String, String)]>,
    ) -> Result<HttpResponse, NetworkError> {
        let resp = self.send_with_retry(url, method, form).await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| NetworkError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(url, status, bytes = body.len(), "fetched page");
        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }

    /// Fetch raw bytes (challenge images). Returns the status with the body.
    pub async fn fetch_bytes(&self, url: &str) -> Result<(u16, Vec<u8>), NetworkError> {
        let resp = self.send_with_retry(url, RequestMethod::Get, None).await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| NetworkError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok((status, bytes.to_vec()))
    }

    async fn send_with_retry(
        &self,
        url: &str,
        method: RequestMethod,
        form: Option<&[(String, String)]>,
    ) -> Result<reqwest::Response, NetworkError> {
        let max_attempts = self.retry.max_attempts();
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.backoff(attempt - 1)).await;
            }

            let (user_agent, language, pause) = {
                let mut rng = rand::thread_rng();
                let ua = self.user_agents.choose(&mut rng).cloned().unwrap_or_default();
                let lang = ACCEPT_LANGUAGES.choose(&mut rng).copied().unwrap_or("en-US");
                (ua, lang, self.pacing.sample(&mut rng))
            };
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let mut builder = match method {
                RequestMethod::Get => self.client.get(url),
                RequestMethod::Post => self.client.post(url),
            };
            builder = builder
                .header(reqwest::header::USER_AGENT, user_agent)
                .header(reqwest::header::ACCEPT, ACCEPT_HTML)
                .header(reqwest::header::ACCEPT_LANGUAGE, language);
            if let Some(fields) = form {
                builder = builder.form(fields);
            }

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if is_transient_status(status) {
                        tracing::warn!(
                            url,
                            status,
                            attempt,
                            max_attempts,
                            "transient status from portal"
                        );
                        last_failure = format!("HTTP {status}");
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_builder() => {
                    return Err(NetworkError::Rejected {
                        method: method.as_str(),
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(url, attempt, max_attempts, error = %e, "request failed");
                    last_failure = e.to_string();
                }
            }
        }

        Err(NetworkError::Exhausted {
            method: method.as_str(),
            url: url.to_string(),
            attempts: max_attempts,
            last_failure,
        })
    }
}

/// Whether a status should be retried rather than returned.
pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_transient_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_transient_status(status), "{status}");
        }
        for status in [200, 302, 400, 403, 404, 501] {
            assert!(!is_transient_status(status), "{status}");
        }
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy {
            max_retries: 3,
            interval: Duration::from_millis(500),
        };
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(1500));
    }

    #[test]
    fn test_pacing_stays_within_bounds() {
        let pacing = Pacing {
            base: Duration::from_millis(2000),
            jitter: Duration::from_millis(1000),
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let pause = pacing.sample(&mut rng);
            assert!(pause >= Duration::from_millis(2000));
            assert!(pause <= Duration::from_millis(3000));
        }

        let flat = Pacing {
            base: Duration::ZERO,
            jitter: Duration::ZERO,
        };
        assert_eq!(flat.sample(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_session_from_defaults() {
        let session = SessionManager::new(&EngineConfig::default()).unwrap();
        assert_eq!(session.retry_policy().max_retries, 3);
        assert_eq!(session.user_agents.len(), 5);
    }
}
