use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::rules::{Category, RuleSet};
use crate::session::{Session, StoredSession};

/// How many apps / titles survive in the per-app and per-title groupings.
pub const TOP_GROUPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub group_key: String,
    pub total_duration_seconds: f64,
}

/// A session of the queried day together with the category the current rules give it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub session: Session,
    pub current_category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub by_category: Vec<Bucket>,
    pub by_app: Vec<Bucket>,
    pub by_title: Vec<Bucket>,
    pub rows: Vec<ReportRow>,
    pub skipped: usize,
}

impl DailySummary {
    pub fn total_seconds(&self) -> f64 {
        self.by_category.iter().map(|b| b.total_duration_seconds).sum()
    }
}

/// Sums durations per key, remembering first-appearance order for ties.
#[derive(Default)]
struct Grouping {
    index: HashMap<String, usize>,
    buckets: Vec<Bucket>,
}

impl Grouping {
    fn add(&mut self, key: &str, seconds: f64) {
        let idx = match self.index.get(key) {
            Some(idx) => *idx,
            None => {
                self.buckets.push(Bucket {
                    group_key: key.to_owned(),
                    total_duration_seconds: 0.0,
                });
                self.index.insert(key.to_owned(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[idx].total_duration_seconds += seconds;
    }

    fn into_sorted(self, limit: Option<usize>) -> Vec<Bucket> {
        let mut buckets = self.buckets;
        // Stable: equal totals keep first-appearance order.
        buckets.sort_by(|a, b| b.total_duration_seconds.total_cmp(&a.total_duration_seconds));
        if let Some(limit) = limit {
            buckets.truncate(limit);
        }
        buckets
    }
}

/// Builds the per-category, per-app and per-title totals for one local calendar date.
///
/// Categories are re-derived from `rules`; whatever category was stored with a row is
/// ignored. Rows that cannot be parsed are skipped with a warning.
pub fn aggregate(records: &[StoredSession], date: NaiveDate, rules: &RuleSet) -> DailySummary {
    let mut by_category = Grouping::default();
    let mut by_app = Grouping::default();
    let mut by_title = Grouping::default();
    let mut rows = Vec::new();
    let mut skipped = 0;

    for record in records {
        let session = match Session::try_from(record) {
            Ok(session) => session,
            Err(err) => {
                warn!("skipping malformed session: {err}");
                skipped += 1;
                continue;
            }
        };
        if session.date() != date {
            continue;
        }

        let current_category = rules.categorize(&session.app_name, &session.window_title);
        by_category.add(current_category.as_str(), session.duration_seconds);
        by_app.add(&session.app_name, session.duration_seconds);
        by_title.add(&session.window_title, session.duration_seconds);
        rows.push(ReportRow {
            session,
            current_category,
        });
    }

    rows.sort_by(|a, b| a.session.start_time.cmp(&b.session.start_time));

    DailySummary {
        date,
        by_category: by_category.into_sorted(None),
        by_app: by_app.into_sorted(Some(TOP_GROUPS)),
        by_title: by_title.into_sorted(Some(TOP_GROUPS)),
        rows,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(app: &str, title: &str, start: &str, end: &str, duration: f64, category: &str) -> StoredSession {
        StoredSession {
            id: 0,
            app_name: app.to_owned(),
            window_title: title.to_owned(),
            start_time: start.to_owned(),
            end_time: end.to_owned(),
            duration: Some(duration),
            category: category.to_owned(),
        }
    }

    fn jan1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn totals(buckets: &[Bucket]) -> Vec<(&str, f64)> {
        buckets
            .iter()
            .map(|b| (b.group_key.as_str(), b.total_duration_seconds))
            .collect()
    }

    #[test]
    fn end_to_end_category_totals() {
        let records = vec![
            record("chrome", "youtube tutorial", "2024-01-01T10:00:00", "2024-01-01T10:05:00", 300.0, "Learning"),
            record("code.exe", "main.py", "2024-01-01T10:05:00", "2024-01-01T10:20:00", 900.0, "Productive"),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());

        assert_eq!(totals(&summary.by_category), vec![("Productive", 900.0), ("Learning", 300.0)]);
        assert_eq!(totals(&summary.by_app), vec![("code.exe", 900.0), ("chrome", 300.0)]);
        assert_eq!(summary.total_seconds(), 1200.0);
        assert_eq!(summary.rows.len(), 2);
    }

    #[test]
    fn categories_are_rederived_at_read_time() {
        let records = vec![
            record("code", "lib.rs", "2024-01-01 08:00:00", "2024-01-01 08:01:00", 60.0, "Uncategorized"),
            record("code", "main.rs", "2024-01-01 08:01:00", "2024-01-01 08:03:00", 120.0, "Uncategorized"),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());

        assert_eq!(totals(&summary.by_category), vec![("Productive", 180.0)]);
        assert!(summary
            .rows
            .iter()
            .all(|row| row.session.category == Category::Uncategorized
                && row.current_category == Category::Productive));
    }

    #[test]
    fn other_dates_are_filtered_out() {
        let records = vec![
            record("code", "a", "2023-12-31 23:59:00", "2024-01-01 00:10:00", 660.0, "Productive"),
            record("code", "b", "2024-01-01 00:10:00", "2024-01-01 00:20:00", 600.0, "Productive"),
            record("code", "c", "2024-01-02 00:00:00", "2024-01-02 00:20:00", 1200.0, "Productive"),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());
        assert_eq!(totals(&summary.by_title), vec![("b", 600.0)]);
    }

    #[test]
    fn empty_day_gives_empty_groupings() {
        let summary = aggregate(&[], jan1(), &RuleSet::default());
        assert!(summary.by_category.is_empty());
        assert!(summary.by_app.is_empty());
        assert!(summary.by_title.is_empty());
        assert!(summary.rows.is_empty());
    }

    #[test]
    fn top_ten_with_first_seen_tie_break() {
        // 12 apps, durations 100, 95, ..., with app "k" tying app "j" at the 10th place.
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"];
        let mut durations: Vec<f64> = (0..12).map(|i| 100.0 - 5.0 * i as f64).collect();
        durations[10] = durations[9];
        let records: Vec<StoredSession> = names
            .iter()
            .zip(&durations)
            .enumerate()
            .map(|(i, (name, secs))| {
                let start = format!("2024-01-01 10:{:02}:00", i);
                record(name, name, &start, "2024-01-01 23:00:00", *secs, "Uncategorized")
            })
            .collect();

        let summary = aggregate(&records, jan1(), &RuleSet::default());
        let apps: Vec<&str> = summary.by_app.iter().map(|b| b.group_key.as_str()).collect();
        assert_eq!(apps, vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        assert_eq!(summary.by_title.len(), TOP_GROUPS);
        assert_eq!(summary.by_category.len(), 1);
    }

    #[test]
    fn tie_break_follows_input_order_not_name() {
        let records = vec![
            record("zeta", "t", "2024-01-01 10:00:00", "2024-01-01 10:00:10", 10.0, ""),
            record("alpha", "t", "2024-01-01 11:00:00", "2024-01-01 11:00:10", 10.0, ""),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());
        assert_eq!(totals(&summary.by_app), vec![("zeta", 10.0), ("alpha", 10.0)]);
    }

    #[test]
    fn category_grouping_is_not_truncated() {
        let apps = [
            ("code", "x"),
            ("vlc", "x"),
            ("zoom", "x"),
            ("discord", "x"),
            ("chrome", "news"),
            ("chrome", "shorts"),
            ("mystery", "x"),
        ];
        let records: Vec<StoredSession> = apps
            .iter()
            .map(|(app, title)| record(app, title, "2024-01-01 10:00:00", "2024-01-01 10:00:01", 1.0, ""))
            .collect();
        let summary = aggregate(&records, jan1(), &RuleSet::default());
        assert_eq!(summary.by_category.len(), 7);
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let mut bad_duration = record("code", "x", "2024-01-01 10:00:00", "2024-01-01 10:01:00", 0.0, "");
        bad_duration.duration = None;
        let records = vec![
            record("code", "x", "not a time", "2024-01-01 10:01:00", 60.0, ""),
            bad_duration,
            record("code", "x", "2024-01-01 10:00:00", "2024-01-01 10:01:00", 60.0, ""),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());
        assert_eq!(summary.skipped, 2);
        assert_eq!(totals(&summary.by_app), vec![("code", 60.0)]);
    }

    #[test]
    fn rows_come_back_in_start_order() {
        let records = vec![
            record("b", "", "2024-01-01 12:00:00", "2024-01-01 12:00:05", 5.0, ""),
            record("a", "", "2024-01-01 09:00:00", "2024-01-01 09:00:05", 5.0, ""),
        ];
        let summary = aggregate(&records, jan1(), &RuleSet::default());
        let apps: Vec<&str> = summary.rows.iter().map(|r| r.session.app_name.as_str()).collect();
        assert_eq!(apps, vec!["a", "b"]);
    }
}
