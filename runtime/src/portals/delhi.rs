//! Delhi High Court portal.
//!
//! Case pages wrap everything in a `case-content`/`main-content` block
//! with a labelled status line, a details table and a party section.
//! When the block is missing or thin, the generic table walk fills in.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::PortalKind;
use crate::error::ConfigError;
use crate::extraction::case_details::{element_text, CaseDetailsBuilder, CaseField};
use crate::extraction::cause_list::{extract_cause_list, ListContext};
use crate::extraction::dates::normalize_value;
use crate::portals::{form_date, parse_base_url, Portal, PortalRequest};
use crate::types::{CaseDetails, CaseQuery, CauseListEntry, CourtType};

const COURT_NAME: &str = "Delhi High Court";

/// Longest text still treated as a field label.
const MAX_LABEL_LEN: usize = 40;

struct Patterns {
    content_class: Regex,
    details_class: Regex,
    party_class: Regex,
    status: Regex,
    petitioner: Regex,
    respondent: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| Patterns {
        content_class: Regex::new(r"(?i)case.*content|main.*content")
            .expect("content class regex is valid"),
        details_class: Regex::new(r"(?i)case.*details|details.*table")
            .expect("details class regex is valid"),
        party_class: Regex::new(r"(?i)part.*detail").expect("party class regex is valid"),
        status: Regex::new(r"(?i)status").expect("status regex is valid"),
        petitioner: Regex::new(r"(?i)petition").expect("petitioner regex is valid"),
        respondent: Regex::new(r"(?i)respond").expect("respondent regex is valid"),
    })
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn class_matches(el: &ElementRef<'_>, re: &Regex) -> bool {
    el.value().attr("class").is_some_and(|c| re.is_match(c))
}

fn is_leaf(el: &ElementRef<'_>) -> bool {
    el.children().all(|c| !c.value().is_element())
}

/// Value of the first short leaf under `root` whose text matches `label`.
///
/// Inline values (`Status: Pending`) are read from the label itself;
/// otherwise the next `div` or `span` in document order holds the value.
fn labelled_value(root: ElementRef<'_>, label: &Regex) -> Option<String> {
    let elements: Vec<ElementRef<'_>> = root.descendants().filter_map(ElementRef::wrap).collect();
    let pos = elements.iter().position(|el| {
        let text = element_text(*el);
        is_leaf(el) && text.len() <= MAX_LABEL_LEN && label.is_match(&text)
    })?;

    let label_text = element_text(elements[pos]);
    if let Some((_, inline)) = label_text.split_once(':') {
        if let Some(value) = normalize_value(inline) {
            return Some(value);
        }
    }

    elements[pos + 1..]
        .iter()
        .find(|el| matches!(el.value().name(), "div" | "span"))
        .and_then(|el| normalize_value(&element_text(*el)))
}

/// The Delhi High Court case-status site.
#[derive(Debug, Clone)]
pub struct DelhiHighCourtPortal {
    base: Url,
}

impl DelhiHighCourtPortal {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base: parse_base_url(PortalKind::DelhiHighCourt, base_url)?,
        })
    }

    fn absorb_content_block(&self, builder: &mut CaseDetailsBuilder, doc: &Html) {
        let p = patterns();
        let Some(content) = doc
            .select(&selector("div"))
            .find(|el| class_matches(el, &p.content_class))
        else {
            return;
        };

        if let Some(status) = labelled_value(content, &p.status) {
            builder.offer_field(CaseField::Status, &status);
        }

        if let Some(table) = content
            .select(&selector("table"))
            .find(|el| class_matches(el, &p.details_class))
        {
            builder.absorb_tables(table);
        }

        if let Some(parties) = content
            .select(&selector("div, section"))
            .find(|el| class_matches(el, &p.party_class))
        {
            if let Some(petitioner) = labelled_value(parties, &p.petitioner) {
                builder.offer_field(CaseField::Petitioner, &petitioner);
            }
            if let Some(respondent) = labelled_value(parties, &p.respondent) {
                builder.offer_field(CaseField::Respondent, &respondent);
            }
        }
    }
}

impl Portal for DelhiHighCourtPortal {
    fn id(&self) -> &str {
        PortalKind::DelhiHighCourt.id()
    }

    fn court_name(&self) -> &str {
        COURT_NAME
    }

    fn court_type(&self) -> CourtType {
        CourtType::HighCourt
    }

    fn case_search_request(&self, query: &CaseQuery) -> PortalRequest {
        PortalRequest::post(
            self.base.to_string(),
            vec![
                ("case_type".to_string(), query.case_type.clone()),
                ("case_number".to_string(), query.case_number.clone()),
                ("case_year".to_string(), query.year.to_string()),
            ],
        )
    }

    fn cause_list_request(&self, date: NaiveDate) -> PortalRequest {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("cause_list_date", &form_date(date));
        PortalRequest::get(url.to_string())
    }

    fn extract_case(&self, markup: &str, page_url: Option<&Url>) -> Option<CaseDetails> {
        let doc = Html::parse_document(markup);
        let mut builder = CaseDetailsBuilder::new(CourtType::HighCourt);

        self.absorb_content_block(&mut builder, &doc);
        builder.absorb_tables(doc.root_element());
        builder.absorb_judgments(doc.root_element(), page_url.or(Some(&self.base)));

        let mut details = builder.finish()?;
        details
            .court_name
            .get_or_insert_with(|| COURT_NAME.to_string());
        Some(details)
    }

    fn extract_cause_list(&self, markup: &str, date: NaiveDate) -> Vec<CauseListEntry> {
        let doc = Html::parse_document(markup);
        extract_cause_list(
            &doc,
            &ListContext {
                portal_id: self.id(),
                court_name: COURT_NAME,
                court_type: CourtType::HighCourt,
                hearing_date: date,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portal() -> DelhiHighCourtPortal {
        DelhiHighCourtPortal::new("https://delhihighcourt.example/app/case-status").unwrap()
    }

    #[test]
    fn test_content_block() {
        let page = r#"
          <div class="main-content">
            <div class="row"><span class="lbl">Case Status</span><span class="val">Pending</span></div>
            <table class="case-details-table">
              <tr><td>Filing Date</td><td>12/01/2022</td></tr>
              <tr><td>Coram</td><td>Justice P. Singh</td></tr>
            </table>
            <section class="party-details">
              <div><strong>Petitioner</strong><div>Meera Nair</div></div>
              <div><strong>Respondent</strong><span>GNCTD</span></div>
            </section>
          </div>"#;
        let details = portal().extract_case(page, None).unwrap();
        assert_eq!(details.status.as_deref(), Some("Pending"));
        assert_eq!(details.petitioner.as_deref(), Some("Meera Nair"));
        assert_eq!(details.respondent.as_deref(), Some("GNCTD"));
        assert_eq!(details.filing_date, NaiveDate::from_ymd_opt(2022, 1, 12));
        assert_eq!(details.judge_name.as_deref(), Some("Justice P. Singh"));
        assert_eq!(details.court_name.as_deref(), Some("Delhi High Court"));
    }

    #[test]
    fn test_inline_status_label() {
        let page = r#"<div class="case-content"><p>Status: Disposed</p></div>"#;
        let details = portal().extract_case(page, None).unwrap();
        assert_eq!(details.status.as_deref(), Some("Disposed"));
    }

    #[test]
    fn test_falls_back_to_generic_tables() {
        let page = "<table><tr><td>Petitioner</td><td>Ravi</td></tr></table>";
        let details = portal().extract_case(page, None).unwrap();
        assert_eq!(details.petitioner.as_deref(), Some("Ravi"));
        assert!(portal().extract_case("<p>nothing</p>", None).is_none());
    }

    #[test]
    fn test_cause_list_request_is_a_get() {
        let req = portal().cause_list_request(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(
            req.url,
            "https://delhihighcourt.example/app/case-status?cause_list_date=15%2F03%2F2024"
        );
        assert!(req.form_fields().is_none());
    }
}
