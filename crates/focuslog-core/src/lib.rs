//! Focus tracking core: session segmentation, categorization rules, daily aggregation
//! and the SQLite session log.

pub mod aggregate;
pub mod rules;
pub mod segmenter;
pub mod session;
pub mod store;

pub use aggregate::{aggregate, Bucket, DailySummary, ReportRow};
pub use rules::{Category, Rule, RuleSet};
pub use segmenter::{Segmenter, SessionSink, DEFAULT_IDLE_THRESHOLD};
pub use session::{Observation, RecordError, Session, StoredSession};
pub use store::SessionStore;
