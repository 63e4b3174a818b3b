//! Tolerant parsing of the date spellings court portals use.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Earliest year a portal date is believed (computerized records).
pub const MIN_PARSED_YEAR: i32 = 1990;

/// Latest year a portal date is believed.
pub const MAX_PARSED_YEAR: i32 = 2030;

/// Formats tried in order. Four-digit forms come first so that a
/// two-digit year is only read as such when nothing else fits.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d %b %Y",
    "%d %B %Y",
];

const PLACEHOLDERS: &[&str] = &["n/a", "na", "nil", "-"];

/// Trim and collapse whitespace; placeholders and empty text are absent.
pub fn normalize_value(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || is_placeholder(&collapsed) {
        None
    } else {
        Some(collapsed)
    }
}

/// Whether `value` is one of the "nothing here" markers portals print.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || PLACEHOLDERS.iter().any(|p| v.eq_ignore_ascii_case(p))
}

/// Parse a portal date. Unparsable or implausible input is absent, never
/// an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = normalize_value(raw)?;

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&value, fmt) {
            if (MIN_PARSED_YEAR..=MAX_PARSED_YEAR).contains(&date.year()) {
                return Some(date);
            }
        }
    }

    tracing::warn!("could not parse date: {value:?}");
    None
}

/// Find and parse the first `D/M/YYYY`-like token inside free text.
pub fn extract_date_token(text: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{4})\b").expect("date token regex is valid")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_date(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_spellings_agree() {
        let expected = Some(ymd(2024, 3, 15));
        for raw in ["15/03/2024", "15-03-2024", "15.03.2024", "2024-03-15", " 15/03/2024 "] {
            assert_eq!(parse_date(raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_two_digit_years_and_month_names() {
        assert_eq!(parse_date("15/03/24"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15-03-24"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15 Mar 2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("15 March 2024"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("5/3/2024"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn test_placeholders_and_garbage_are_absent() {
        for raw in ["N/A", "na", "NIL", "-", "", "   ", "next week", "31/02/2024"] {
            assert_eq!(parse_date(raw), None, "{raw}");
        }
    }

    #[test]
    fn test_out_of_range_years_are_absent() {
        assert_eq!(parse_date("15/03/1985"), None);
        assert_eq!(parse_date("15/03/2031"), None);
        assert_eq!(parse_date("01/01/1990"), Some(ymd(1990, 1, 1)));
    }

    #[test]
    fn test_token_inside_text() {
        assert_eq!(
            extract_date_token("Final Judgment dated 02-11-2023 (PDF)"),
            Some(ymd(2023, 11, 2))
        );
        assert_eq!(extract_date_token("Order copy"), None);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  Ram   Kumar \n"), Some("Ram Kumar".to_string()));
        assert_eq!(normalize_value("n/a"), None);
        assert_eq!(normalize_value(""), None);
    }
}
