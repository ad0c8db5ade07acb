use anyhow::{Context, Result};
use focuslog_core::Observation;
use regex::Regex;
use tracing::{debug, warn};

use super::{command_stdout, ObservationSource};

/// X11 focus and idle via `xdotool`, `xprop` and `xprintidle`.
pub struct X11Source {
    wm_class: Regex,
    wm_name: Regex,
    idle_warned: bool,
}

impl X11Source {
    pub fn new() -> Result<Self> {
        command_stdout("xdotool", &["version"]).context("xdotool is required to read the focused window")?;
        if let Err(err) = command_stdout("xprintidle", &[]) {
            warn!("xprintidle unavailable, idle detection disabled: {err:#}");
        }

        Ok(Self {
            wm_class: Regex::new(r#"WM_CLASS\([^)]*\) = "([^"]*)", "([^"]*)""#)?,
            wm_name: Regex::new(r#"WM_NAME\([^)]*\) = "(.*)""#)?,
            idle_warned: false,
        })
    }

    fn focus(&self) -> Result<(String, String)> {
        let window_id = command_stdout("xdotool", &["getactivewindow"])?;
        let class = command_stdout("xprop", &["-id", &window_id, "WM_CLASS"])?;
        let name = command_stdout("xprop", &["-id", &window_id, "WM_NAME"])?;
        Ok((parse_wm_class(&self.wm_class, &class), parse_wm_name(&self.wm_name, &name)))
    }

    fn idle_seconds(&mut self) -> f64 {
        match command_stdout("xprintidle", &[]).and_then(|out| Ok(out.parse::<f64>()?)) {
            Ok(millis) => millis / 1000.0,
            Err(err) => {
                if !self.idle_warned {
                    warn!("idle query failed, assuming active: {err:#}");
                    self.idle_warned = true;
                }
                0.0
            }
        }
    }
}

impl ObservationSource for X11Source {
    fn name(&self) -> &'static str {
        "x11"
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

/// The second WM_CLASS string, lower-cased.
fn parse_wm_class(re: &Regex, output: &str) -> String {
    re.captures(output)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| Observation::UNKNOWN.to_owned())
}

fn parse_wm_name(re: &Regex, output: &str) -> String {
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| Observation::UNKNOWN.to_owned())
}
