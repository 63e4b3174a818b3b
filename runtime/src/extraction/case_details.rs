//! Label-driven extraction of case details from portal tables.
//!
//! Portals render a case as two-column rows (`label | value`). Labels vary
//! between portals and revisions, so each row is classified by keyword.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extraction::dates::{extract_date_token, normalize_value, parse_date};
use crate::types::{CaseDetails, CourtType, Judgment, JudgmentKind};

/// A descriptive field a row label can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseField {
    Petitioner,
    Respondent,
    FilingDate,
    NextHearingDate,
    Status,
    CourtHall,
    CourtName,
    Judge,
    Category,
}

/// Keyword taxonomy, checked in order; the first group that matches wins.
/// Hall labels precede the generic court label so "Court No." is a hall.
const TAXONOMY: &[(CaseField, &[&str])] = &[
    (CaseField::Petitioner, &["petitioner", "appellant", "plaintiff"]),
    (CaseField::Respondent, &["respondent", "defendant", "appellee"]),
    (CaseField::FilingDate, &["filing", "filed", "registration"]),
    (CaseField::NextHearingDate, &["next hearing", "hearing date", "next date"]),
    (CaseField::Status, &["status", "stage"]),
    (CaseField::CourtHall, &["hall", "room", "court no", "court number"]),
    (CaseField::CourtName, &["court", "bench"]),
    (CaseField::Judge, &["judge", "coram", "before"]),
    (CaseField::Category, &["category", "nature", "type"]),
];

/// Labels describing counsel rather than the parties themselves.
const COUNSEL_MARKERS: &[&str] = &["advocate", "counsel"];

const JUDGMENT_KEYWORDS: &[&str] = &["judgment", "order", "decree"];

/// Classify a row label. Case-insensitive.
pub fn classify_label(label: &str) -> Option<CaseField> {
    let label = label.to_lowercase();
    if COUNSEL_MARKERS.iter().any(|m| label.contains(m)) {
        return None;
    }
    TAXONOMY
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
        .map(|(field, _)| *field)
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Text content of an element with whitespace collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accumulates field values from any number of sources.
///
/// The first usable value offered for a field is kept; later ones are
/// ignored. Placeholders and unparsable dates are never usable.
#[derive(Debug, Clone)]
pub struct CaseDetailsBuilder {
    court_type: CourtType,
    petitioner: Option<String>,
    respondent: Option<String>,
    filing_date: Option<NaiveDate>,
    next_hearing_date: Option<NaiveDate>,
    status: Option<String>,
    court_name: Option<String>,
    judge_name: Option<String>,
    court_hall: Option<String>,
    case_category: Option<String>,
    judgments: Vec<Judgment>,
}

impl CaseDetailsBuilder {
    pub fn new(court_type: CourtType) -> Self {
        Self {
            court_type,
            petitioner: None,
            respondent: None,
            filing_date: None,
            next_hearing_date: None,
            status: None,
            court_name: None,
            judge_name: None,
            court_hall: None,
            case_category: None,
            judgments: Vec::new(),
        }
    }

    /// Offer a `label | value` pair. Returns whether it was classified.
    pub fn offer(&mut self, label: &str, value: &str) -> bool {
        match classify_label(label) {
            Some(field) => {
                self.offer_field(field, value);
                true
            }
            None => false,
        }
    }

    /// Offer a value for a known field.
    pub fn offer_field(&mut self, field: CaseField, value: &str) {
        fn keep_text(slot: &mut Option<String>, value: &str) {
            if slot.is_none() {
                *slot = normalize_value(value);
            }
        }
        fn keep_date(slot: &mut Option<NaiveDate>, value: &str) {
            if slot.is_none() {
                *slot = parse_date(value);
            }
        }

        match field {
            CaseField::Petitioner => keep_text(&mut self.petitioner, value),
            CaseField::Respondent => keep_text(&mut self.respondent, value),
            CaseField::FilingDate => keep_date(&mut self.filing_date, value),
            CaseField::NextHearingDate => keep_date(&mut self.next_hearing_date, value),
            CaseField::Status => keep_text(&mut self.status, value),
            CaseField::CourtHall => keep_text(&mut self.court_hall, value),
            CaseField::CourtName => keep_text(&mut self.court_name, value),
            CaseField::Judge => keep_text(&mut self.judge_name, value),
            CaseField::Category => keep_text(&mut self.case_category, value),
        }
    }

    /// Walk every table row below `root` with at least two cells.
    pub fn absorb_tables(&mut self, root: ElementRef<'_>) {
        let rows = selector("tr");
        let cells = selector("td, th");
        for row in root.select(&rows) {
            let cols: Vec<ElementRef<'_>> = row.select(&cells).collect();
            if cols.len() >= 2 {
                self.offer(&element_text(cols[0]), &element_text(cols[1]));
            }
        }
    }

    /// Collect judgment and order links below `root`.
    pub fn absorb_judgments(&mut self, root: ElementRef<'_>, base: Option<&Url>) {
        let anchors = selector("a[href]");
        for link in root.select(&anchors) {
            let text = element_text(link);
            let lowered = text.to_lowercase();
            if !JUDGMENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                continue;
            }
            let href = link.value().attr("href").unwrap_or_default().trim();
            if href.is_empty() {
                continue;
            }
            let url = match base.map(|b| b.join(href)) {
                Some(Ok(joined)) => joined.to_string(),
                _ => href.to_string(),
            };
            let kind = if lowered.contains("judgment") {
                JudgmentKind::Judgment
            } else {
                JudgmentKind::Order
            };
            if self.judgments.iter().any(|j| j.url == url) {
                continue;
            }
            self.judgments.push(Judgment {
                kind,
                url,
                date: extract_date_token(&text),
                text,
            });
        }
    }

    /// Finish the record. A page is a case page only when it names a
    /// petitioner or a status.
    pub fn finish(self) -> Option<CaseDetails> {
        if self.petitioner.is_none() && self.status.is_none() {
            return None;
        }
        Some(CaseDetails {
            petitioner: self.petitioner,
            respondent: self.respondent,
            filing_date: self.filing_date,
            next_hearing_date: self.next_hearing_date,
            status: self.status,
            court_name: self.court_name,
            court_type: self.court_type,
            judge_name: self.judge_name,
            court_hall: self.court_hall,
            case_category: self.case_category,
            judgments: self.judgments,
        })
    }
}

/// Generic table heuristics over a whole document.
pub fn extract_case_details(
    doc: &Html,
    court_type: CourtType,
    base: Option<&Url>,
) -> Option<CaseDetails> {
    let mut builder = CaseDetailsBuilder::new(court_type);
    builder.absorb_tables(doc.root_element());
    builder.absorb_judgments(doc.root_element(), base);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(markup: &str) -> Option<CaseDetails> {
        extract_case_details(&Html::parse_document(markup), CourtType::HighCourt, None)
    }

    #[test]
    fn test_two_row_table() {
        let details = extract(
            "<table><tr><td>Petitioner</td><td>Ram Kumar</td></tr>\
             <tr><td>Respondent</td><td>State</td></tr></table>",
        )
        .unwrap();
        assert_eq!(details.petitioner.as_deref(), Some("Ram Kumar"));
        assert_eq!(details.respondent.as_deref(), Some("State"));
        assert_eq!(details.status, None);
    }

    #[test]
    fn test_full_case_page() {
        let details = extract(
            r#"<html><body>
            <table>
              <tr><th>Appellant</th><td> Sunita   Devi </td></tr>
              <tr><th>Defendant</th><td>Union of India</td></tr>
              <tr><td>Petitioner Advocate</td><td>R. Mehta</td></tr>
              <tr><td>Registration Date</td><td>04-01-2023</td></tr>
              <tr><td>Next Hearing Date</td><td>15 Mar 2024</td></tr>
              <tr><td>Case Status</td><td>Pending</td></tr>
              <tr><td>Court No.</td><td>12</td></tr>
              <tr><td>Bench</td><td>Principal Bench</td></tr>
              <tr><td>Coram</td><td>Hon'ble Justice A. Rao</td></tr>
              <tr><td>Case Type</td><td>Civil</td></tr>
              <tr><td>Single cell row</td></tr>
            </table>
            <a href="/docs/j1.pdf">Judgment dated 02/11/2023</a>
            <a href="/docs/o1.pdf">Interim Order 05-06-2023</a>
            <a href="/help">Help</a>
            </body></html>"#,
        )
        .unwrap();

        assert_eq!(details.petitioner.as_deref(), Some("Sunita Devi"));
        assert_eq!(details.respondent.as_deref(), Some("Union of India"));
        assert_eq!(details.filing_date, NaiveDate::from_ymd_opt(2023, 1, 4));
        assert_eq!(details.next_hearing_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(details.status.as_deref(), Some("Pending"));
        assert_eq!(details.court_hall.as_deref(), Some("12"));
        assert_eq!(details.court_name.as_deref(), Some("Principal Bench"));
        assert_eq!(details.judge_name.as_deref(), Some("Hon'ble Justice A. Rao"));
        assert_eq!(details.case_category.as_deref(), Some("Civil"));

        assert_eq!(details.judgments.len(), 2);
        assert_eq!(details.judgments[0].kind, JudgmentKind::Judgment);
        assert_eq!(details.judgments[0].date, NaiveDate::from_ymd_opt(2023, 11, 2));
        assert_eq!(details.judgments[1].kind, JudgmentKind::Order);
        assert_eq!(details.judgments[1].url, "/docs/o1.pdf");
    }

    #[test]
    fn test_first_usable_value_wins() {
        let details = extract(
            "<table><tr><td>Petitioner</td><td>N/A</td></tr>\
             <tr><td>Petitioner(s)</td><td>Asha</td></tr>\
             <tr><td>Petitioner Name</td><td>Someone Else</td></tr>\
             <tr><td>Status</td><td>-</td></tr></table>",
        )
        .unwrap();
        assert_eq!(details.petitioner.as_deref(), Some("Asha"));
        assert_eq!(details.status, None);
    }

    #[test]
    fn test_page_without_anchor_fields_yields_nothing() {
        assert_eq!(
            extract("<table><tr><td>Respondent</td><td>State</td></tr></table>"),
            None
        );
        assert_eq!(extract("<p>No records found</p>"), None);
    }

    #[test]
    fn test_status_alone_is_enough() {
        let details = extract("<table><tr><td>Stage</td><td>Disposed</td></tr></table>").unwrap();
        assert_eq!(details.status.as_deref(), Some("Disposed"));
        assert_eq!(details.petitioner, None);
    }

    #[test]
    fn test_classify_label() {
        assert_eq!(classify_label("Court Hall"), Some(CaseField::CourtHall));
        assert_eq!(classify_label("Court Name"), Some(CaseField::CourtName));
        assert_eq!(classify_label("Filed On"), Some(CaseField::FilingDate));
        assert_eq!(classify_label("Respondent Counsel"), None);
        assert_eq!(classify_label("Serial"), None);
    }

    #[test]
    fn test_relative_judgment_links_resolve() {
        let base = Url::parse("https://hc.example/cases/view.php").unwrap();
        let doc = Html::parse_document(
            "<table><tr><td>Status</td><td>Disposed</td></tr></table>\
             <a href='orders/1.pdf'>Final Order</a>",
        );
        let details = extract_case_details(&doc, CourtType::HighCourt, Some(&base)).unwrap();
        assert_eq!(details.judgments[0].url, "https://hc.example/cases/orders/1.pdf");
    }
}
