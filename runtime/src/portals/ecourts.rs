//! The generic eCourts portals (High Court and District Court services).
//!
//! Both share one page family: a `p=` route selects the screen, search
//! forms post `case_type`, `case_no` and `case_year`, and results are
//! plain label/value tables.

use chrono::NaiveDate;
use scraper::Html;
use url::Url;

use crate::config::PortalKind;
use crate::error::ConfigError;
use crate::extraction::case_details::extract_case_details;
use crate::extraction::cause_list::{extract_cause_list, ListContext};
use crate::portals::{form_date, parse_base_url, Portal, PortalRequest};
use crate::types::{CaseDetails, CaseQuery, CauseListEntry, CourtType};

/// An eCourts services portal.
#[derive(Debug, Clone)]
pub struct EcourtsPortal {
    kind: PortalKind,
    base: Url,
    court_name: &'static str,
    court_type: CourtType,
    case_route: &'static str,
    cause_list_route: &'static str,
}

impl EcourtsPortal {
    pub fn high_court(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            kind: PortalKind::HighCourt,
            base: parse_base_url(PortalKind::HighCourt, base_url)?,
            court_name: "High Court",
            court_type: CourtType::HighCourt,
            case_route: "case_status",
            cause_list_route: "cause_list",
        })
    }

    pub fn district_court(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            kind: PortalKind::DistrictCourt,
            base: parse_base_url(PortalKind::DistrictCourt, base_url)?,
            court_name: "District Court",
            court_type: CourtType::DistrictCourt,
            case_route: "casestatus/index",
            cause_list_route: "cause_list/index",
        })
    }

    fn route(&self, route: &str) -> String {
        let mut url = self.base.clone();
        url.set_query(Some(&format!("p={route}")));
        url.to_string()
    }
}

impl Portal for EcourtsPortal {
    fn id(&self) -> &str {
        self.kind.id()
    }

    fn court_name(&self) -> &str {
        self.court_name
    }

    fn court_type(&self) -> CourtType {
        self.court_type
    }

    fn case_search_request(&self, query: &CaseQuery) -> PortalRequest {
        PortalRequest::post(
            self.route(self.case_route),
            vec![
                ("case_type".to_string(), query.case_type.clone()),
                ("case_no".to_string(), query.case_number.clone()),
                ("case_year".to_string(), query.year.to_string()),
            ],
        )
    }

    fn cause_list_request(&self, date: NaiveDate) -> PortalRequest {
        PortalRequest::post(
            self.route(self.cause_list_route),
            vec![("date".to_string(), form_date(date))],
        )
    }

    fn extract_case(&self, markup: &str, page_url: Option<&Url>) -> Option<CaseDetails> {
        let doc = Html::parse_document(markup);
        let mut details = extract_case_details(&doc, self.court_type, page_url.or(Some(&self.base)))?;
        details
            .court_name
            .get_or_insert_with(|| self.court_name.to_string());
        Some(details)
    }

    fn extract_cause_list(&self, markup: &str, date: NaiveDate) -> Vec<CauseListEntry> {
        let doc = Html::parse_document(markup);
        extract_cause_list(
            &doc,
            &ListContext {
                portal_id: self.id(),
                court_name: self.court_name,
                court_type: self.court_type,
                hearing_date: date,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::http_client::RequestMethod;

    #[test]
    fn test_high_court_requests() {
        let portal =
            EcourtsPortal::high_court("https://hcservices.ecourts.gov.in/hcservices/main.php").unwrap();
        let query = CaseQuery::new("wp", "123", 2024).unwrap();

        let search = portal.case_search_request(&query);
        assert_eq!(
            search.url,
            "https://hcservices.ecourts.gov.in/hcservices/main.php?p=case_status"
        );
        assert_eq!(search.method, RequestMethod::Post);
        assert!(search.form.contains(&("case_type".to_string(), "WP".to_string())));
        assert!(search.form.contains(&("case_year".to_string(), "2024".to_string())));

        let list = portal.cause_list_request(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(list.url.ends_with("main.php?p=cause_list"));
        assert_eq!(list.form, vec![("date".to_string(), "15/03/2024".to_string())]);
    }

    #[test]
    fn test_district_routes() {
        let portal = EcourtsPortal::district_court("https://services.ecourts.gov.in/ecourtindia_v6/").unwrap();
        let query = CaseQuery::new("OS", "7", 2020).unwrap();
        assert_eq!(
            portal.case_search_request(&query).url,
            "https://services.ecourts.gov.in/ecourtindia_v6/?p=casestatus/index"
        );
        assert_eq!(portal.id(), "district_court");
    }

    #[test]
    fn test_missing_court_name_is_filled() {
        let portal = EcourtsPortal::district_court("http://localhost/dc/").unwrap();
        let details = portal
            .extract_case("<table><tr><td>Status</td><td>Pending</td></tr></table>", None)
            .unwrap();
        assert_eq!(details.court_name.as_deref(), Some("District Court"));
        assert_eq!(details.court_type, CourtType::DistrictCourt);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(EcourtsPortal::high_court("::not a url::").is_err());
    }
}
