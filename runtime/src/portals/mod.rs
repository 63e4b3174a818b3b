//! Court portals: how to ask each one, and how to read its answer.
//!
//! A [`Portal`] is pure description. It builds requests and parses
//! markup; the orchestrator owns the network and the retries.

pub mod delhi;
pub mod ecourts;

use std::sync::Arc;

use chrono::NaiveDate;
use url::Url;

use crate::acquisition::http_client::RequestMethod;
use crate::config::{EngineConfig, PortalKind};
use crate::error::ConfigError;
use crate::types::{CaseDetails, CaseQuery, CauseListEntry, CourtType};

pub use delhi::DelhiHighCourtPortal;
pub use ecourts::EcourtsPortal;

/// A request a portal wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub url: String,
    pub method: RequestMethod,
    pub form: Vec<(String, String)>,
}

impl PortalRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            form: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Post,
            form,
        }
    }

    /// The same request with one more form field (a solved challenge).
    /// A GET becomes a POST so the field is submitted as a form.
    pub fn with_field(&self, name: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.form.retain(|(k, _)| k != name);
        next.form.push((name.to_string(), value.to_string()));
        next.method = RequestMethod::Post;
        next
    }

    /// Form fields for the session, `None` for a bare GET.
    pub fn form_fields(&self) -> Option<&[(String, String)]> {
        (!self.form.is_empty()).then_some(self.form.as_slice())
    }
}

/// One external court website.
pub trait Portal: Send + Sync {
    /// Stable identifier used in attempts and data-source labels.
    fn id(&self) -> &str;

    /// Court name given to entries and records the page does not name.
    fn court_name(&self) -> &str;

    fn court_type(&self) -> CourtType;

    fn case_search_request(&self, query: &CaseQuery) -> PortalRequest;

    fn cause_list_request(&self, date: NaiveDate) -> PortalRequest;

    /// Parse a case page. `None` means the page holds no case.
    fn extract_case(&self, markup: &str, page_url: Option<&Url>) -> Option<CaseDetails>;

    /// Parse a cause-list page.
    fn extract_cause_list(&self, markup: &str, date: NaiveDate) -> Vec<CauseListEntry>;
}

/// Build the enabled portals, in configured order.
pub fn from_config(config: &EngineConfig) -> Result<Vec<Arc<dyn Portal>>, ConfigError> {
    config
        .enabled_portals()
        .map(|p| -> Result<Arc<dyn Portal>, ConfigError> {
            Ok(match p.kind {
                PortalKind::HighCourt => Arc::new(EcourtsPortal::high_court(&p.base_url)?),
                PortalKind::DistrictCourt => Arc::new(EcourtsPortal::district_court(&p.base_url)?),
                PortalKind::DelhiHighCourt => Arc::new(DelhiHighCourtPortal::new(&p.base_url)?),
            })
        })
        .collect()
}

pub(crate) fn parse_base_url(kind: PortalKind, base_url: &str) -> Result<Url, ConfigError> {
    Url::parse(base_url).map_err(|e| {
        ConfigError::Invalid(format!(
            "portal {} has an invalid base_url {base_url:?}: {e}",
            kind.id()
        ))
    })
}

/// Form value for a hearing date, as the portals expect it.
pub(crate) fn form_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
