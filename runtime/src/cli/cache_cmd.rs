//! `court cache`: inspect and prune the result cache.

use anyhow::{bail, Result};

use crate::cache::ResultCache;
use crate::cli::output::{is_json, print_json};
use crate::cli::{parse_case_spec, parse_cli_date, GlobalOptions};
use crate::types::CauseListQuery;

pub fn run_stats(opts: &GlobalOptions) -> Result<()> {
    let config = opts.load_config()?;
    let cache = opts.open_cache(&config)?;
    let stats = cache.stats();

    if is_json() {
        print_json(&serde_json::json!({
            "cache_dir": cache.cache_dir(),
            "entries": stats.entries,
        }));
        return Ok(());
    }
    println!("  Cache dir: {}", cache.cache_dir().display());
    println!("  Entries:   {}", stats.entries);
    Ok(())
}

pub fn run_invalidate(
    opts: &GlobalOptions,
    case: Option<&str>,
    date: Option<&str>,
    court: Option<&str>,
) -> Result<()> {
    let key = match (case, date) {
        (Some(case), None) => parse_case_spec(case)?.cache_key(),
        (None, Some(date)) => CauseListQuery::new(parse_cli_date(date)?, court).cache_key(),
        _ => bail!("pass exactly one of --case or --date"),
    };

    let config = opts.load_config()?;
    let removed = opts.open_cache(&config)?.invalidate(&key)?;

    if is_json() {
        print_json(&serde_json::json!({ "key": key, "removed": removed }));
    } else if removed {
        println!("  Removed {key}");
    } else {
        println!("  Nothing cached under {key}");
    }
    Ok(())
}

pub fn run_clear(opts: &GlobalOptions) -> Result<()> {
    let config = opts.load_config()?;
    let removed = opts.open_cache(&config)?.clear()?;
    if is_json() {
        print_json(&serde_json::json!({ "removed": removed }));
    } else {
        println!("  Removed {removed} cached entries");
    }
    Ok(())
}
