use anyhow::{Context, Result};
use chrono::NaiveDate;
use focuslog_core::session::{format_hms, format_timestamp};
use focuslog_core::ReportRow;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One raw session as shown to the user: the stored columns plus `HH:MM:SS`.
///
/// `category` is the category under the current rules.
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    pub app_name: &'a str,
    pub window_title: &'a str,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: f64,
    pub category: &'static str,
    pub duration: String,
}

impl<'a> From<&'a ReportRow> for ExportRow<'a> {
    fn from(row: &'a ReportRow) -> Self {
        let session = &row.session;
        Self {
            app_name: &session.app_name,
            window_title: &session.window_title,
            start_time: format_timestamp(&session.start_time),
            end_time: format_timestamp(&session.end_time),
            duration_seconds: session.duration_seconds,
            category: row.current_category.as_str(),
            duration: format_hms(session.duration_seconds),
        }
    }
}

pub fn default_export_path(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("activity_{}.csv", date.format("%Y-%m-%d")))
}

pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create CSV file: {}", path.display()))?;
    for row in rows {
        writer
            .serialize(ExportRow::from(row))
            .with_context(|| format!("failed to write CSV row: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush CSV file: {}", path.display()))?;
    Ok(rows.len())
}
