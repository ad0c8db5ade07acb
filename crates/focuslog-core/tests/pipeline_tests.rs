use chrono::{DateTime, Local, NaiveDate, TimeZone};
use focuslog_core::{aggregate, Observation, RuleSet, Segmenter, SessionStore, DEFAULT_IDLE_THRESHOLD};
use rusqlite::Connection;
use tempfile::tempdir;

fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 1, h, m, s).single().unwrap()
}

#[test]
fn tracked_run_aggregates_by_category_app_and_title() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("activity_log.db");
    let store = SessionStore::open(&db_path).unwrap();
    let mut seg = Segmenter::new(store, RuleSet::default(), DEFAULT_IDLE_THRESHOLD);

    seg.poll(Observation::new("chrome", "Rust tutorial - YouTube", 0.0), at(10, 0, 0));
    seg.poll(Observation::new("chrome", "Rust tutorial - YouTube", 2.0), at(10, 2, 0));
    seg.poll(Observation::new("code.exe", "main.py", 0.0), at(10, 5, 0));
    seg.poll(Observation::new("code.exe", "main.py", 0.0), at(10, 15, 0));
    seg.shutdown(at(10, 20, 0));

    let store = seg.into_sink();
    let records = store.scan_all().unwrap();
    assert_eq!(records.len(), 2);

    let summary = aggregate(
        &records,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        &RuleSet::default(),
    );
    let by_category: Vec<(&str, f64)> = summary
        .by_category
        .iter()
        .map(|b| (b.group_key.as_str(), b.total_duration_seconds))
        .collect();
    assert_eq!(by_category, vec![("Productive", 900.0), ("Learning", 300.0)]);
    assert_eq!(summary.by_title[0].group_key, "main.py");
    assert_eq!(summary.total_seconds(), 1200.0);
}

#[test]
fn stale_stored_categories_are_reported_under_current_rules() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("activity_log.db");
    drop(SessionStore::open(&db_path).unwrap());

    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "INSERT INTO activity_log (app_name, window_title, start_time, end_time, duration, category) VALUES
           ('firefox', 'serde - GitHub', '2024-01-01 09:00:00', '2024-01-01 09:10:00', 600, 'Uncategorized'),
           ('firefox', 'tokio - GitHub', '2024-01-01 09:10:00', '2024-01-01 09:15:00', 300, 'Uncategorized'),
           ('firefox', 'broken', 'not-a-date', '2024-01-01 09:20:00', 300, 'Uncategorized');",
    )
    .unwrap();
    drop(conn);

    let store = SessionStore::open(&db_path).unwrap();
    let summary = aggregate(
        &store.scan_all().unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        &RuleSet::default(),
    );
    assert_eq!(summary.by_category.len(), 1);
    assert_eq!(summary.by_category[0].group_key, "Productive");
    assert_eq!(summary.by_category[0].total_duration_seconds, 900.0);
    assert_eq!(summary.skipped, 1);

    // The log itself is untouched.
    let categories: Vec<String> = store.scan_all().unwrap().into_iter().map(|r| r.category).collect();
    assert!(categories.iter().all(|c| c == "Uncategorized"));
}
