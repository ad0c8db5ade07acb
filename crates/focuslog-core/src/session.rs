use chrono::{Local, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use thiserror::Error;

use crate::rules::Category;

/// Timestamp layout written to the `start_time` / `end_time` columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layouts accepted when reading timestamps back. The first entry is what we write;
/// the rest cover rows produced by older tools or hand-edited logs. All of them start
/// with `YYYY-MM-DD` so a day scan by text prefix finds every row they parse.
const ACCEPTED_TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// One polled snapshot of the focused window.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub app_name: String,
    pub window_title: String,
    pub idle_seconds: f64,
}

impl Observation {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn new(app_name: impl Into<String>, window_title: impl Into<String>, idle_seconds: f64) -> Self {
        Self {
            app_name: app_name.into(),
            window_title: window_title.into(),
            idle_seconds,
        }
    }

    /// Sentinel produced when the platform could not report focus state.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN, Self::UNKNOWN, 0.0)
    }
}

/// A finalized period of continuous focus on one (app, title) pair.
///
/// Times are local wall-clock values with second precision; `duration_seconds` is the
/// active time between them, which excludes idle stretches the session spanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub app_name: String,
    pub window_title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_seconds: f64,
    pub category: Category,
}

impl Session {
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// A row as it sits in the store, before any validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSession {
    pub id: i64,
    pub app_name: String,
    pub window_title: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: Option<f64>,
    pub category: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("row {id}: unparsable start_time {value:?}")]
    BadStartTime { id: i64, value: String },
    #[error("row {id}: unparsable end_time {value:?}")]
    BadEndTime { id: i64, value: String },
    #[error("row {id}: duration is missing or not a number")]
    BadDuration { id: i64 },
    #[error("row {id}: negative duration {value}")]
    NegativeDuration { id: i64, value: f64 },
    #[error("row {id}: end_time precedes start_time")]
    EndBeforeStart { id: i64 },
}

impl TryFrom<&StoredSession> for Session {
    type Error = RecordError;

    fn try_from(row: &StoredSession) -> Result<Self, Self::Error> {
        let start_time = parse_timestamp(&row.start_time).ok_or_else(|| RecordError::BadStartTime {
            id: row.id,
            value: row.start_time.clone(),
        })?;
        let end_time = parse_timestamp(&row.end_time).ok_or_else(|| RecordError::BadEndTime {
            id: row.id,
            value: row.end_time.clone(),
        })?;
        let duration_seconds = row
            .duration
            .filter(|value| value.is_finite())
            .ok_or(RecordError::BadDuration { id: row.id })?;
        if duration_seconds < 0.0 {
            return Err(RecordError::NegativeDuration {
                id: row.id,
                value: duration_seconds,
            });
        }
        if end_time < start_time {
            return Err(RecordError::EndBeforeStart { id: row.id });
        }

        Ok(Self {
            app_name: row.app_name.clone(),
            window_title: row.window_title.clone(),
            start_time,
            end_time,
            duration_seconds,
            category: row.category.parse().unwrap_or_default(),
        })
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    ACCEPTED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// `HH:MM:SS`, hours unbounded.
pub fn format_hms(seconds: f64) -> String {
    let secs = whole_seconds(seconds);
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// `1h 2m 3s`, used in tracker log lines.
pub fn format_human(seconds: f64) -> String {
    let secs = whole_seconds(seconds);
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn default_db_path() -> PathBuf {
    if let Some(local) = dirs::data_local_dir() {
        return local.join("FocusLog").join("activity_log.db");
    }
    PathBuf::from("data").join("activity_log.db")
}
