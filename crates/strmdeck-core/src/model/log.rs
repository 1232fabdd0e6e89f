// ── Log domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use strmdeck_api::models::LogRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
    /// Server-side timestamp, verbatim.
    pub timestamp: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl From<LogRecord> for LogEntry {
    fn from(r: LogRecord) -> Self {
        Self {
            level: r.level.to_ascii_lowercase(),
            message: r.message,
            timestamp: r.timestamp,
            received_at: Utc::now(),
        }
    }
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        matches!(self.level.as_str(), "error" | "critical")
    }
}
