//! Output helpers shared by the CLI commands.

use serde::Serialize;

use crate::types::{CaseRecord, CauseListEntry, ScrapeAttempt};

/// Whether `--json` was given.
pub fn is_json() -> bool {
    std::env::var("COURT_JSON").is_ok_and(|v| v == "1")
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn print_case(record: &CaseRecord) {
    println!("  Case:        {}", record.query.display_name());
    println!("  Source:      {}", record.data_source.label());
    if record.data_source.is_synthetic() {
        println!("  [!!] No portal returned this case. The fields below are PLACEHOLDERS.");
    }
    let Some(d) = &record.details else {
        println!("  Not found.");
        return;
    };
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%d-%m-%Y").to_string());
    println!("  Petitioner:  {}", or_dash(d.petitioner.as_deref()));
    println!("  Respondent:  {}", or_dash(d.respondent.as_deref()));
    println!("  Status:      {}", or_dash(d.status.as_deref()));
    println!("  Filed:       {}", or_dash(date(d.filing_date).as_deref()));
    println!("  Next date:   {}", or_dash(date(d.next_hearing_date).as_deref()));
    println!("  Court:       {} ({})", or_dash(d.court_name.as_deref()), d.court_type.as_str());
    println!("  Hall:        {}", or_dash(d.court_hall.as_deref()));
    println!("  Judge:       {}", or_dash(d.judge_name.as_deref()));
    println!("  Category:    {}", or_dash(d.case_category.as_deref()));
    for j in &d.judgments {
        let when = date(j.date).unwrap_or_default();
        println!("  - {:?} {when} {} <{}>", j.kind, j.text, j.url);
    }
}

pub fn print_entries(entries: &[CauseListEntry]) {
    for e in entries {
        println!(
            "  {:<22} {:<10} {:<40} hall {:<6} {:<9} {}",
            e.case_number,
            e.case_type,
            e.parties,
            or_dash(e.court_hall.as_deref()),
            or_dash(e.hearing_time.as_deref()),
            e.court_name,
        );
    }
}

pub fn print_attempts(attempts: &[ScrapeAttempt]) {
    for a in attempts {
        println!("  [{}] {}: {}", a.outcome.as_str(), a.portal_id, a.detail);
    }
}
