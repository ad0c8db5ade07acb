mod config;
mod observer;

use anyhow::{Context, Result};
use chrono::Local;
use focuslog_core::{RuleSet, Segmenter, SessionStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::observer::platform_source;

/// Upper bound on one sleep slice so Ctrl+C is noticed promptly with long poll intervals.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::from_args()?;
    let rules = RuleSet::load_or_default(config.rules_path.as_deref())?;
    let mut source = platform_source().context("failed to initialize focus observation")?;
    let store = SessionStore::open(&config.db_path)?;
    let mut segmenter = Segmenter::new(store, rules, config.idle_threshold);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || {
        shutdown_signal.store(true, Ordering::SeqCst);
    }) {
        warn!("ctrlc handler registration failed: {err}");
    }

    info!(
        "FocusLog tracker started | source={} | db={} | poll={}ms | idle={}s | rules={}",
        source.name(),
        config.db_path.display(),
        config.poll_interval.as_millis(),
        config.idle_threshold.as_secs(),
        config
            .rules_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_owned()),
    );

    while !shutdown.load(Ordering::Relaxed) {
        let observation = source.observe();
        segmenter.poll(observation, Local::now());
        sleep_unless_shutdown(config.poll_interval, &shutdown);
    }

    segmenter.shutdown(Local::now());
    info!("FocusLog tracker stopped");
    Ok(())
}

fn sleep_unless_shutdown(interval: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(SHUTDOWN_CHECK));
    }
}
