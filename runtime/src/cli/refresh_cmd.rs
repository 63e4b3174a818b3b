//! `court refresh`: re-acquire cases and prefetch upcoming cause lists.

use anyhow::{bail, Result};

use crate::cli::output::{is_json, print_json};
use crate::cli::{parse_case_spec, parse_cli_date, today, GlobalOptions};
use crate::jobs::{prefetch_cause_lists, refresh_cases};

pub async fn run(
    opts: &GlobalOptions,
    cases: &[String],
    cause_lists: bool,
    from: Option<&str>,
    days: u32,
) -> Result<()> {
    if cases.is_empty() && !cause_lists {
        bail!("nothing to refresh: pass case specs (TYPE/NUMBER/YEAR) and/or --cause-lists");
    }
    let queries = cases
        .iter()
        .map(|c| parse_case_spec(c))
        .collect::<Result<Vec<_>>>()?;
    let start = match from {
        Some(raw) => parse_cli_date(raw)?,
        None => today(),
    };

    let orchestrator = opts.build_orchestrator()?;
    let refreshed = refresh_cases(&orchestrator, &queries).await?;
    let prefetched = if cause_lists {
        prefetch_cause_lists(&orchestrator, start, days).await?
    } else {
        Vec::new()
    };

    if is_json() {
        print_json(&serde_json::json!({
            "cases": refreshed,
            "cause_lists": prefetched,
        }));
        return Ok(());
    }

    for outcome in &refreshed {
        println!(
            "  {:<24} {} ({} ms)",
            outcome.record.query.display_name(),
            outcome.record.data_source.label(),
            outcome.elapsed_ms
        );
    }
    for summary in &prefetched {
        println!(
            "  {}  {:>4} entries{}",
            summary.hearing_date.format("%d-%m-%Y"),
            summary.entries,
            if summary.synthetic { "  [placeholder]" } else { "" }
        );
    }
    Ok(())
}
