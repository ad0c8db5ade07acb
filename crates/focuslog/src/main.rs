mod export;
mod render;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use focuslog_core::session::{default_db_path, today};
use focuslog_core::{aggregate, RuleSet, SessionStore};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "focuslog", about = "Daily category, app and window-title totals from the FocusLog database")]
struct Args {
    /// SQLite file path (default: <local data dir>/FocusLog/activity_log.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Day to summarize, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// JSON rule file replacing the built-in categorization rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Also list every session of the day
    #[arg(long)]
    raw: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Write the day's sessions as CSV (default file: activity_<date>.csv)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export_csv: Option<Option<PathBuf>>,

    /// Re-run the report every N seconds until interrupted
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.watch == Some(0) {
        bail!("--watch must be greater than zero");
    }

    let rules = RuleSet::load_or_default(args.rules.as_deref())?;
    let db_path = args.db.clone().unwrap_or_else(default_db_path);
    let store = SessionStore::open_read_only(&db_path)?;

    let Some(every) = args.watch else {
        return report(&args, &store, &rules);
    };
    loop {
        println!("--- refreshed {} ---", Local::now().format("%H:%M:%S"));
        report(&args, &store, &rules)?;
        thread::sleep(Duration::from_secs(every));
    }
}

fn report(args: &Args, store: &SessionStore, rules: &RuleSet) -> Result<()> {
    let date = args.date.unwrap_or_else(today);
    let records = store.scan_day(date)?;
    let summary = aggregate(&records, date, rules);

    if args.json {
        println!("{}", render::render_json(&summary, args.raw)?);
    } else {
        print!("{}", render::render_text(&summary, args.raw));
    }

    if let Some(path) = &args.export_csv {
        let path = path.clone().unwrap_or_else(|| export::default_export_path(date));
        let written = export::write_csv(&path, &summary.rows)?;
        info!("exported {written} session(s) to {}", path.display());
    }
    Ok(())
}
