use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use std::time::Duration;

use crate::segmenter::SessionSink;
use crate::session::{format_timestamp, Session, StoredSession};

const SELECT_COLUMNS: &str = "\
    SELECT id, app_name, window_title, start_time, end_time, duration, category
    FROM activity_log";

/// Append-only SQLite log of sessions.
///
/// WAL mode lets a reader process scan while the tracker appends.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create SQLite directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    /// Opens an existing log for reading only. Never creates the file or the schema.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open database read-only: {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("failed to set busy timeout")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .context("failed to set busy timeout")?;

        conn.execute_batch(
            "\
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS activity_log (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              app_name TEXT,
              window_title TEXT,
              start_time TEXT,
              end_time TEXT,
              duration REAL,
              category TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_activity_log_start ON activity_log(start_time);",
        )
        .context("failed to initialize schema")?;

        Ok(Self { conn })
    }

    pub fn insert(&self, session: &Session) -> Result<i64> {
        self.conn
            .execute(
                "\
                INSERT INTO activity_log (
                  app_name,
                  window_title,
                  start_time,
                  end_time,
                  duration,
                  category
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.app_name,
                    session.window_title,
                    format_timestamp(&session.start_time),
                    format_timestamp(&session.end_time),
                    session.duration_seconds,
                    session.category.as_str(),
                ],
            )
            .context("failed to insert session")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn scan_all(&self) -> Result<Vec<StoredSession>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare full scan")?;
        let rows = stmt
            .query_map([], stored_session_from_row)
            .context("failed to scan sessions")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read session row")
    }

    /// Rows whose `start_time` text begins with the given date.
    pub fn scan_day(&self, date: NaiveDate) -> Result<Vec<StoredSession>> {
        let sql = format!("{SELECT_COLUMNS} WHERE start_time LIKE ?1 ORDER BY id ASC");
        let prefix = format!("{}%", date.format("%Y-%m-%d"));
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare day scan")?;
        let rows = stmt
            .query_map(params![prefix], stored_session_from_row)
            .with_context(|| format!("failed to scan sessions for {date}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read session row")
    }
}

impl SessionSink for SessionStore {
    fn insert(&mut self, session: &Session) -> Result<()> {
        SessionStore::insert(self, session).map(|_| ())
    }
}

fn stored_session_from_row(row: &Row<'_>) -> rusqlite::Result<StoredSession> {
    Ok(StoredSession {
        id: row.get(0)?,
        app_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        window_title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        start_time: text_column(row, 3)?,
        end_time: text_column(row, 4)?,
        duration: numeric_column(row, 5)?,
        category: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

// Timestamps written by other tools may have been stored with any affinity.
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Null | ValueRef::Blob(_) => String::new(),
    })
}

fn numeric_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Real(v) => Some(v),
        ValueRef::Integer(v) => Some(v as f64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}
