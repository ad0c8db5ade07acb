use anyhow::Result;
use chrono::{DateTime, Local, SubsecRound, TimeDelta};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::rules::RuleSet;
use crate::session::{format_human, Observation, Session};

pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(300);

/// Destination for closed sessions.
pub trait SessionSink {
    fn insert(&mut self, session: &Session) -> Result<()>;
}

impl SessionSink for Vec<Session> {
    fn insert(&mut self, session: &Session) -> Result<()> {
        self.push(session.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OpenSession {
    app_name: String,
    window_title: String,
    start: DateTime<Local>,
    /// Idle stretches sat through while this session stayed open.
    idle_excluded: TimeDelta,
}

/// Turns polled observations into closed, non-overlapping sessions.
///
/// Session boundaries are truncated to whole seconds. A session's duration is the time
/// between its boundaries minus any idle stretch it spanned.
pub struct Segmenter<S: SessionSink> {
    sink: S,
    rules: RuleSet,
    idle_threshold_secs: f64,
    current: Option<OpenSession>,
    last_end: Option<DateTime<Local>>,
    last_active: Option<DateTime<Local>>,
    idle: bool,
}

impl<S: SessionSink> Segmenter<S> {
    pub fn new(sink: S, rules: RuleSet, idle_threshold: Duration) -> Self {
        Self {
            sink,
            rules,
            idle_threshold_secs: idle_threshold.as_secs_f64(),
            current: None,
            last_end: None,
            last_active: None,
            idle: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Feeds one observation. Returns the session persisted by this poll, if any.
    ///
    /// While the user is idle the engine is frozen: nothing is closed, opened or extended
    /// and focus changes are ignored. The first active poll afterwards is handled like
    /// any other active poll, so the same focus keeps the open session going. The idle
    /// stretch is left out of that session's duration either way.
    pub fn poll(&mut self, observation: Observation, now: DateTime<Local>) -> Option<Session> {
        if observation.idle_seconds > self.idle_threshold_secs {
            if !self.idle {
                debug!(idle_secs = observation.idle_seconds, "user idle, segmentation paused");
                self.idle = true;
            }
            return None;
        }

        let Observation {
            app_name,
            window_title,
            ..
        } = observation;

        if self.idle {
            debug!("user active again, segmentation resumed");
            self.idle = false;
            self.exclude_idle_stretch(now);
        }

        self.last_active = Some(now.trunc_subsecs(0));
        let Some(current) = self.current.as_ref() else {
            self.open(app_name, window_title, now);
            return None;
        };
        if current.app_name == app_name && current.window_title == window_title {
            return None;
        }

        let closed = self.close(now);
        self.open(app_name, window_title, now);
        closed
    }

    /// Closes the in-progress session, if any. Call before exiting.
    pub fn shutdown(&mut self, now: DateTime<Local>) -> Option<Session> {
        if self.idle {
            return self.close_at_last_active();
        }
        self.close(now)
    }

    fn close_at_last_active(&mut self) -> Option<Session> {
        let end = self.current.as_ref().map(|current| self.last_active.unwrap_or(current.start))?;
        self.close(end)
    }

    fn exclude_idle_stretch(&mut self, now: DateTime<Local>) {
        let (Some(current), Some(last_active)) = (self.current.as_mut(), self.last_active) else {
            return;
        };
        let stretch = now.trunc_subsecs(0) - last_active;
        if stretch > TimeDelta::zero() {
            current.idle_excluded = current.idle_excluded + stretch;
        }
    }

    fn open(&mut self, app_name: String, window_title: String, now: DateTime<Local>) {
        let mut start = now.trunc_subsecs(0);
        if let Some(last_end) = self.last_end {
            start = start.max(last_end);
        }
        self.last_active = Some(start);
        self.current = Some(OpenSession {
            app_name,
            window_title,
            start,
            idle_excluded: TimeDelta::zero(),
        });
    }

    fn close(&mut self, now: DateTime<Local>) -> Option<Session> {
        let current = self.current.take()?;
        // A wall clock stepping backwards must not produce an overlap.
        let end = now.trunc_subsecs(0).max(current.start);
        let active = (end - current.start - current.idle_excluded).max(TimeDelta::zero());
        let duration_seconds = active.num_milliseconds() as f64 / 1000.0;
        let category = self.rules.categorize(&current.app_name, &current.window_title);

        let session = Session {
            app_name: current.app_name,
            window_title: current.window_title,
            start_time: current.start.naive_local(),
            end_time: end.naive_local(),
            duration_seconds,
            category,
        };

        self.last_end = Some(end);

        match self.sink.insert(&session) {
            Ok(()) => {
                info!(
                    "logged: {} | {} | {} | {}",
                    session.app_name,
                    session.window_title,
                    session.category,
                    format_human(session.duration_seconds)
                );
                Some(session)
            }
            Err(err) => {
                warn!(
                    app = %session.app_name,
                    title = %session.window_title,
                    start = %session.start_time,
                    end = %session.end_time,
                    "dropping session, store rejected insert: {err:#}"
                );
                None
            }
        }
    }
}
