//! Positional extraction of cause-list tables.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::extraction::case_details::element_text;
use crate::extraction::dates::normalize_value;
use crate::types::{CauseListEntry, CourtType, DataSource};

/// Fewest cells a data row needs: case number, case type, parties.
const MIN_CELLS: usize = 3;

/// Fixed facts attached to every entry from one page.
#[derive(Debug, Clone)]
pub struct ListContext<'a> {
    pub portal_id: &'a str,
    pub court_name: &'a str,
    pub court_type: CourtType,
    pub hearing_date: NaiveDate,
}

/// Four-digit year after a slash in a case number, e.g. `WP 123/2024`.
pub fn case_year_from_number(case_number: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"/(\d{4})").expect("case year regex is valid"));
    re.captures(case_number)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Every table's rows after the first, mapped positionally to
/// case number, case type, parties, hall, judge, time and purpose.
pub fn extract_cause_list(doc: &Html, ctx: &ListContext<'_>) -> Vec<CauseListEntry> {
    let tables = Selector::parse("table").expect("static selector is valid");
    let rows = Selector::parse("tr").expect("static selector is valid");
    let cells = Selector::parse("td, th").expect("static selector is valid");

    let mut entries = Vec::new();
    for table in doc.select(&tables) {
        // Nested tables are visited on their own; only direct rows count here.
        let own_rows = table
            .select(&rows)
            .filter(|row| closest_table(*row).is_some_and(|t| t.id() == table.id()));

        for row in own_rows.skip(1) {
            let cols: Vec<String> = row
                .select(&cells)
                .filter(|cell| closest_table(*cell).is_some_and(|t| t.id() == table.id()))
                .map(element_text)
                .collect();
            if let Some(entry) = row_to_entry(&cols, ctx) {
                entries.push(entry);
            }
        }
    }

    tracing::info!(
        portal = ctx.portal_id,
        entries = entries.len(),
        "parsed cause list"
    );
    entries
}

fn closest_table(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

fn row_to_entry(cols: &[String], ctx: &ListContext<'_>) -> Option<CauseListEntry> {
    if cols.len() < MIN_CELLS {
        return None;
    }
    let cell = |i: usize| cols.get(i).map(String::as_str).unwrap_or_default();

    let case_number = cell(0).trim().to_string();
    let parties = cell(2).trim().to_string();
    if case_number.is_empty() || parties.is_empty() {
        return None;
    }

    Some(CauseListEntry {
        court_name: ctx.court_name.to_string(),
        court_type: ctx.court_type,
        case_year: case_year_from_number(&case_number),
        case_number,
        case_type: cell(1).trim().to_string(),
        parties,
        hearing_date: ctx.hearing_date,
        court_hall: normalize_value(cell(3)),
        judge_name: normalize_value(cell(4)),
        hearing_time: normalize_value(cell(5)),
        hearing_purpose: normalize_value(cell(6)),
        data_source: DataSource::real(ctx.portal_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ListContext<'static> {
        ListContext {
            portal_id: "high_court",
            court_name: "High Court of Judicature",
            court_type: CourtType::HighCourt,
            hearing_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    fn extract(markup: &str) -> Vec<CauseListEntry> {
        extract_cause_list(&Html::parse_document(markup), &ctx())
    }

    #[test]
    fn test_three_cell_row() {
        let entries = extract(
            "<table><tr><th>Case</th><th>Type</th><th>Parties</th></tr>\
             <tr><td>WP 123/2024</td><td>WP</td><td>A vs B</td></tr></table>",
        );
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.case_number, "WP 123/2024");
        assert_eq!(entry.case_type, "WP");
        assert_eq!(entry.parties, "A vs B");
        assert_eq!(entry.case_year, Some(2024));
        assert_eq!(entry.court_hall, None);
        assert_eq!(entry.court_name, "High Court of Judicature");
        assert_eq!(entry.data_source, DataSource::real("high_court"));
    }

    #[test]
    fn test_full_row_and_discarded_rows() {
        let entries = extract(
            "<table>\
             <tr><td>Sr</td><td>Type</td><td>Parties</td><td>Hall</td><td>Judge</td><td>Time</td><td>Purpose</td></tr>\
             <tr><td>CRL.A 9/2021</td><td>CRL.A</td><td>X vs State</td><td>4</td><td>Justice Y</td><td>10:30 AM</td><td>Arguments</td></tr>\
             <tr><td></td><td>WP</td><td>Missing number</td></tr>\
             <tr><td>WP 5/2020</td><td>WP</td><td> </td></tr>\
             <tr><td>only</td><td>two</td></tr>\
             <tr><td>OS 77</td><td>OS</td><td>P vs Q</td><td>-</td></tr>\
             </table>",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].case_year, Some(2021));
        assert_eq!(entries[0].court_hall.as_deref(), Some("4"));
        assert_eq!(entries[0].judge_name.as_deref(), Some("Justice Y"));
        assert_eq!(entries[0].hearing_time.as_deref(), Some("10:30 AM"));
        assert_eq!(entries[0].hearing_purpose.as_deref(), Some("Arguments"));
        assert_eq!(entries[1].case_year, None);
        assert_eq!(entries[1].court_hall, None);
    }

    #[test]
    fn test_each_table_skips_its_header() {
        let entries = extract(
            "<table><tr><td>WP 1/2024</td><td>WP</td><td>header-looking</td></tr>\
             <tr><td>WP 2/2024</td><td>WP</td><td>C vs D</td></tr></table>\
             <table><tr><td>h</td><td>h</td><td>h</td></tr>\
             <tr><td>WP 3/2024</td><td>WP</td><td>E vs F</td></tr></table>",
        );
        let numbers: Vec<_> = entries.iter().map(|e| e.case_number.as_str()).collect();
        assert_eq!(numbers, vec!["WP 2/2024", "WP 3/2024"]);
    }

    #[test]
    fn test_nested_table_cells_stay_with_their_own_row() {
        let entries = extract(
            "<table><tr><th>Case</th><th>Type</th><th>Parties</th><th>Hall</th></tr>\
             <tr><td>WP 8/2024</td><td>WP</td>\
             <td><table><tr><td>Asha</td><td>vs</td><td>State</td></tr></table></td>\
             <td>7</td></tr></table>",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].case_number, "WP 8/2024");
        assert_eq!(entries[0].parties, "Asha vs State");
        assert_eq!(entries[0].court_hall.as_deref(), Some("7"));
        assert_eq!(entries[0].judge_name, None);
    }

    #[test]
    fn test_case_year_from_number() {
        assert_eq!(case_year_from_number("WP(C) 1234/2019"), Some(2019));
        assert_eq!(case_year_from_number("1234-2019"), None);
    }
}
