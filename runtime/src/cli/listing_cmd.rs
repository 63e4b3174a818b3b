//! `court check-listing`: is a case on a day's cause list?

use anyhow::Result;

use crate::cli::output::{is_json, print_entries, print_json};
use crate::cli::{parse_case_spec, parse_cli_date, today, GlobalOptions};
use crate::jobs::find_listing;
use crate::types::CauseListQuery;

pub async fn run(opts: &GlobalOptions, case: &str, date: &str) -> Result<()> {
    let query = parse_case_spec(case)?;
    let date = parse_cli_date(date)?;
    CauseListQuery::new(date, None).validate_window(today())?;

    let orchestrator = opts.build_orchestrator()?;
    let check = find_listing(&orchestrator, &query, date).await?;

    if is_json() {
        print_json(&check);
        return Ok(());
    }

    let day = date.format("%d-%m-%Y");
    if check.listed {
        println!("  {} is listed on {day}:", query.display_name());
        print_entries(&check.listings);
    } else if check.list_unavailable {
        println!("  No portal returned a cause list for {day}; listing status unknown.");
    } else {
        println!("  {} is not listed on {day}.", query.display_name());
    }
    Ok(())
}
