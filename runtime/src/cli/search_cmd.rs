//! `court search`: look a case up across the portals.

use anyhow::Result;

use crate::cli::output::{is_json, print_attempts, print_case, print_json};
use crate::cli::GlobalOptions;
use crate::types::CaseQuery;

pub async fn run(opts: &GlobalOptions, case_type: &str, case_number: &str, year: i32) -> Result<()> {
    let query = CaseQuery::new(case_type, case_number, year)?;
    let orchestrator = opts.build_orchestrator()?;
    let outcome = orchestrator.search_case(&query).await?;

    if is_json() {
        print_json(&outcome);
        return Ok(());
    }

    print_case(&outcome.record);
    println!();
    if outcome.cached {
        println!("  (from cache, {} ms)", outcome.elapsed_ms);
    } else {
        println!("  Attempts ({} ms):", outcome.elapsed_ms);
        print_attempts(&outcome.attempts);
    }
    Ok(())
}
