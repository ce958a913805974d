use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    New,
    Edit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::New => "new",
            EventKind::Edit => "edit",
        }
    }
}

/// One raw message event pulled from the inbound stream, already typed at the
/// ingestion boundary. Field aliasing from the loose source map is resolved
/// before this struct exists; business logic never sees alternate field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub kind: EventKind,
    pub channel_id: String,
    pub channel_username: Option<String>,
    pub channel_title: Option<String>,
    pub msg_id: i64,
    /// Edit counter; 1 for the first delivery, incremented by the listener on edits.
    pub revision: i64,
    pub ts_utc: Option<DateTime<Utc>>,
    pub sender_id: Option<String>,
    pub text: String,
    pub ts_ingest: Option<DateTime<Utc>>,
}

impl SignalEvent {
    /// Source-side identity. Immutable once dequeued.
    pub fn identity(&self) -> (&str, i64, i64) {
        (&self.channel_id, self.msg_id, self.revision)
    }
}
