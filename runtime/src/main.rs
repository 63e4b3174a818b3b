// Copyright 2026 Court Scout Contributors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use court_runtime::cli::{self, GlobalOptions};
use court_runtime::jobs::DEFAULT_PREFETCH_DAYS;

#[derive(Parser)]
#[command(
    name = "court",
    about = "Court Scout: case status and cause lists from court portals",
    version,
    after_help = "Run 'court <command> --help' for details on each command."
)]
struct Cli {
    /// Path to a JSON config file (default: $COURT_CONFIG or ~/.court/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "court=info,court_runtime=info")]
    log_level: String,

    /// Do not append to the audit log
    #[arg(long, global = true)]
    no_audit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a case by type, number and year
    Search {
        /// Case type (e.g. "WP", "CRL.A", "OS")
        case_type: String,
        /// Case number
        case_number: String,
        /// Registration year
        year: i32,
    },
    /// Fetch the cause list for a hearing date
    CauseList {
        /// Hearing date (YYYY-MM-DD, DD/MM/YYYY, "today", "tomorrow")
        #[arg(long, default_value = "today")]
        date: String,
        /// Only keep entries whose court name contains this text
        #[arg(long)]
        court: Option<String>,
    },
    /// Check whether a case is listed on a date
    CheckListing {
        /// Case as TYPE/NUMBER/YEAR (e.g. "WP/123/2024")
        case: String,
        /// Hearing date
        #[arg(long, default_value = "today")]
        date: String,
    },
    /// Re-acquire cases and prefetch upcoming cause lists
    Refresh {
        /// Cases as TYPE/NUMBER/YEAR
        cases: Vec<String>,
        /// Also prefetch cause lists
        #[arg(long)]
        cause_lists: bool,
        /// First date to prefetch (default: today)
        #[arg(long)]
        from: Option<String>,
        /// Days after the first date to prefetch
        #[arg(long, default_value_t = DEFAULT_PREFETCH_DAYS)]
        days: u32,
    },
    /// Inspect and prune the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location and size
    Stats,
    /// Drop one cached case or cause list
    Invalidate {
        /// Case as TYPE/NUMBER/YEAR
        #[arg(long, conflicts_with = "date")]
        case: Option<String>,
        /// Cause-list hearing date
        #[arg(long)]
        date: Option<String>,
        /// Court filter the cause list was fetched with
        #[arg(long, requires = "date")]
        court: Option<String>,
    },
    /// Remove every cached entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("COURT_JSON", "1");
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = GlobalOptions {
        config_path: cli.config,
        no_audit: cli.no_audit,
    };

    let result = match cli.command {
        Commands::Search {
            case_type,
            case_number,
            year,
        } => cli::search_cmd::run(&opts, &case_type, &case_number, year).await,
        Commands::CauseList { date, court } => {
            cli::cause_list_cmd::run(&opts, &date, court.as_deref()).await
        }
        Commands::CheckListing { case, date } => cli::listing_cmd::run(&opts, &case, &date).await,
        Commands::Refresh {
            cases,
            cause_lists,
            from,
            days,
        } => cli::refresh_cmd::run(&opts, &cases, cause_lists, from.as_deref(), days).await,
        Commands::Cache { action } => match action {
            CacheAction::Stats => cli::cache_cmd::run_stats(&opts),
            CacheAction::Invalidate { case, date, court } => cli::cache_cmd::run_invalidate(
                &opts,
                case.as_deref(),
                date.as_deref(),
                court.as_deref(),
            ),
            CacheAction::Clear => cli::cache_cmd::run_clear(&opts),
        },
        Commands::Doctor => cli::doctor::run(&opts),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "court", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
