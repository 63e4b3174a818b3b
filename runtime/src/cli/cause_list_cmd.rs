//! `court cause-list`: one day's hearings.

use anyhow::Result;

use crate::cli::output::{is_json, print_attempts, print_entries, print_json};
use crate::cli::{parse_cli_date, today, GlobalOptions};
use crate::types::CauseListQuery;

pub async fn run(opts: &GlobalOptions, date: &str, court: Option<&str>) -> Result<()> {
    let query = CauseListQuery::new(parse_cli_date(date)?, court);
    query.validate_window(today())?;

    let orchestrator = opts.build_orchestrator()?;
    let outcome = orchestrator.cause_list(&query).await?;

    if is_json() {
        print_json(&outcome);
        return Ok(());
    }

    println!(
        "  Cause list for {} ({} entries{})",
        query.hearing_date.format("%d-%m-%Y"),
        outcome.entries.len(),
        if outcome.cached { ", cached" } else { "" }
    );
    if outcome.is_synthetic() {
        if let Some(first) = outcome.entries.first() {
            println!("  [!!] PLACEHOLDER DATA: {}", first.data_source.label());
        }
    }
    println!();
    print_entries(&outcome.entries);
    println!();
    println!("  By court:");
    for (court, count) in &outcome.court_wise_count {
        println!("    {court:<30} {count}");
    }
    if !outcome.cached {
        println!();
        println!("  Attempts ({} ms):", outcome.elapsed_ms);
        print_attempts(&outcome.attempts);
    }
    Ok(())
}
