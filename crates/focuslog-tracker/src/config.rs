use anyhow::{bail, Result};
use clap::Parser;
use focuslog_core::session::default_db_path;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "focuslog-tracker", about = "Records which window has focus into the FocusLog database")]
struct Args {
    /// SQLite file path (default: <local data dir>/FocusLog/activity_log.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Idle threshold in seconds
    #[arg(long, default_value_t = 300)]
    idle_secs: u64,

    /// JSON rule file replacing the built-in categorization rules
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub poll_interval: Duration,
    pub idle_threshold: Duration,
    pub rules_path: Option<PathBuf>,
}

impl Config {
    pub fn from_args() -> Result<Self> {
        Self::from_parsed(Args::parse())
    }

    fn from_parsed(args: Args) -> Result<Self> {
        if args.poll_ms == 0 {
            bail!("--poll-ms must be greater than zero");
        }
        if args.idle_secs == 0 {
            bail!("--idle-secs must be greater than zero");
        }

        Ok(Self {
            db_path: args.db.unwrap_or_else(default_db_path),
            poll_interval: Duration::from_millis(args.poll_ms),
            idle_threshold: Duration::from_secs(args.idle_secs),
            rules_path: args.rules,
        })
    }
}
