use anyhow::{Context, Result};
use focuslog_core::Observation;
use regex::Regex;
use tracing::debug;

use super::{command_stdout, ObservationSource};

const FRONT_APP: &str =
    r#"tell application "System Events" to get name of (processes where frontmost is true)"#;
const FRONT_TITLE: &str =
    r#"tell application "System Events" to get title of front window of (processes where frontmost is true)"#;

/// macOS focus via `osascript`, idle via the `HIDIdleTime` counter from `ioreg`.
pub struct MacSource {
    hid_idle: Regex,
}

impl MacSource {
    pub fn new() -> Result<Self> {
        command_stdout("osascript", &["-e", "return 1"]).context("osascript is required to read the focused window")?;
        Ok(Self {
            hid_idle: Regex::new(r#""HIDIdleTime" = (\d+)"#)?,
        })
    }

    fn focus(&self) -> Result<(String, String)> {
        let app = command_stdout("osascript", &["-e", FRONT_APP])?;
        let title = command_stdout("osascript", &["-e", FRONT_TITLE])?;
        Ok((app, title))
    }

    fn idle_seconds(&self) -> f64 {
        command_stdout("ioreg", &["-c", "IOHIDSystem"])
            .ok()
            .and_then(|out| {
                self.hid_idle
                    .captures(&out)
                    .and_then(|caps| caps[1].parse::<u64>().ok())
            })
            .map(|nanos| nanos as f64 / 1_000_000_000.0)
            .unwrap_or(0.0)
    }
}

impl ObservationSource for MacSource {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn observe(&mut self) -> Observation {
        let idle_seconds = self.idle_seconds();
        match self.focus() {
            Ok((app_name, window_title)) => Observation::new(app_name, window_title, idle_seconds),
            Err(err) => {
                debug!("focus query failed: {err:#}");
                Observation {
                    idle_seconds,
                    ..Observation::unknown()
                }
            }
        }
    }
}
