use focuslog_core::session::format_hms;
use focuslog_core::{Bucket, DailySummary};
use serde::Serialize;

use crate::export::ExportRow;

const KEY_WIDTH: usize = 48;

#[derive(Serialize)]
struct SummaryJson<'a> {
    date: String,
    total_seconds: f64,
    by_category: &'a [Bucket],
    by_app: &'a [Bucket],
    by_title: &'a [Bucket],
    skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<ExportRow<'a>>>,
}

pub fn render_json(summary: &DailySummary, raw: bool) -> serde_json::Result<String> {
    let doc = SummaryJson {
        date: summary.date.format("%Y-%m-%d").to_string(),
        total_seconds: summary.total_seconds(),
        by_category: &summary.by_category,
        by_app: &summary.by_app,
        by_title: &summary.by_title,
        skipped: summary.skipped,
        rows: raw.then(|| summary.rows.iter().map(ExportRow::from).collect()),
    };
    serde_json::to_string_pretty(&doc)
}

pub fn render_text(summary: &DailySummary, raw: bool) -> String {
    let total = summary.total_seconds();
    let mut lines = vec![format!("Summary for {}  (tracked {})", summary.date, format_hms(total))];
    if summary.skipped > 0 {
        lines.push(format!("{} malformed row(s) skipped", summary.skipped));
    }

    section(&mut lines, "Categories");
    for bucket in &summary.by_category {
        let share = if total > 0.0 {
            bucket.total_duration_seconds / total * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "  {:<width$} {:>10} {:>6.1}%",
            clip(&bucket.group_key),
            format_hms(bucket.total_duration_seconds),
            share,
            width = KEY_WIDTH
        ));
    }

    section(&mut lines, "Applications");
    buckets(&mut lines, &summary.by_app);

    section(&mut lines, "Top window titles");
    buckets(&mut lines, &summary.by_title);

    if raw {
        section(&mut lines, "Sessions");
        lines.extend(summary.rows.iter().map(|row| {
            let s = &row.session;
            format!(
                "  {} - {}  {:>10}  {:<14} {} | {}",
                s.start_time.format("%H:%M:%S"),
                s.end_time.format("%H:%M:%S"),
                format_hms(s.duration_seconds),
                row.current_category.as_str(),
                s.app_name,
                s.window_title
            )
        }));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(title.to_owned());
}

fn buckets(lines: &mut Vec<String>, buckets: &[Bucket]) {
    if buckets.is_empty() {
        lines.push("  (no activity)".to_owned());
    }
    lines.extend(buckets.iter().map(|bucket| {
        format!(
            "  {:<width$} {:>10}",
            clip(&bucket.group_key),
            format_hms(bucket.total_duration_seconds),
            width = KEY_WIDTH
        )
    }));
}

fn clip(text: &str) -> String {
    let text = if text.trim().is_empty() { "(untitled)" } else { text };
    if text.chars().count() <= KEY_WIDTH {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(KEY_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use focuslog_core::{aggregate, RuleSet, StoredSession};

    fn summary() -> DailySummary {
        let records = vec![
            StoredSession {
                id: 1,
                app_name: "chrome".to_owned(),
                window_title: "youtube tutorial".to_owned(),
                start_time: "2024-01-01 10:00:00".to_owned(),
                end_time: "2024-01-01 10:05:00".to_owned(),
                duration: Some(300.0),
                category: "Learning".to_owned(),
            },
            StoredSession {
                id: 2,
                app_name: "code.exe".to_owned(),
                window_title: "main.py".to_owned(),
                start_time: "2024-01-01 10:05:00".to_owned(),
                end_time: "2024-01-01 10:20:00".to_owned(),
                duration: Some(900.0),
                category: "Productive".to_owned(),
            },
        ];
        aggregate(&records, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &RuleSet::default())
    }

    #[test]
    fn text_report_lists_groups() {
        let text = render_text(&summary(), true);
        assert!(text.contains("Summary for 2024-01-01  (tracked 00:20:00)"));
        assert!(text.contains("Productive"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("10:05:00 - 10:20:00"));
    }

    #[test]
    fn text_report_has_one_line_per_entry() {
        let text = render_text(&summary(), true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Summary for 2024-01-01  (tracked 00:20:00)");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Categories");
        assert!(lines[3].trim_start().starts_with("Productive"));
        assert!(text.ends_with("code.exe | main.py\n"));
    }

    #[test]
    fn empty_day_renders() {
        let empty = aggregate(&[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &RuleSet::default());
        let text = render_text(&empty, false);
        assert!(text.contains("(no activity)"));
    }

    #[test]
    fn json_report_shape() {
        let json = render_json(&summary(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["date"], "2024-01-01");
        assert_eq!(value["total_seconds"], 1200.0);
        assert_eq!(value["by_category"][0]["group_key"], "Productive");
        assert_eq!(value["by_category"][0]["total_duration_seconds"], 900.0);
        assert!(value.get("rows").is_none());

        let with_rows: serde_json::Value = serde_json::from_str(&render_json(&summary(), true).unwrap()).unwrap();
        assert_eq!(with_rows["rows"][1]["duration"], "00:15:00");
    }

    #[test]
    fn long_keys_are_clipped() {
        let long = "x".repeat(100);
        assert_eq!(clip(&long).chars().count(), KEY_WIDTH);
        assert_eq!(clip(""), "(untitled)");
    }
}
