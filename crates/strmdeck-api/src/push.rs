// Push-channel message schema.
//
// Every frame is a JSON object discriminated by `type`. The service emits
// two payload layouts for the same tags, a `data` envelope and a keyed
// one (`task`, `stats`, or flat fields), and both decode to the same event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::Error;
use crate::models::{LogRecord, TaskPatch};

/// Frame the client sends to keep the channel alive.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

// ── Tags ─────────────────────────────────────────────────────────────

/// Recognized `type` tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Log,
    TaskUpdate,
    StatsUpdate,
    Alert,
    Pong,
}

// ── Payloads ─────────────────────────────────────────────────────────

/// Aggregate counters pushed by `stats_update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsPayload {
    pub total_tasks: u64,
    pub running_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
}

/// Resource-monitor alert: `{type: "memory", data: {level, message, ...}, timestamp}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type", default)]
    pub source: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AlertPayload {
    /// `warning`, `critical`, ... as reported by the monitor.
    pub fn level(&self) -> Option<&str> {
        self.data.get("level").and_then(Value::as_str)
    }

    /// Human-readable alert text, falling back to the alert source.
    pub fn text(&self) -> String {
        if let Some(message) = self.data.get("message").and_then(Value::as_str) {
            return message.to_owned();
        }
        match (&self.source, self.level()) {
            (Some(source), Some(level)) => format!("{source} alert ({level})"),
            (Some(source), None) => format!("{source} alert"),
            _ => "resource alert".to_owned(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(v: OneOrMany<T>) -> Self {
        match v {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

// ── Event ────────────────────────────────────────────────────────────

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Log(LogRecord),
    TaskUpdate(Vec<TaskPatch>),
    StatsUpdate(StatsPayload),
    Alert(AlertPayload),
    Pong,
    /// A tag this client does not know. Valid, and ignored downstream.
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl PushEvent {
    /// Decode one text frame.
    ///
    /// Unknown tags decode to [`PushEvent::Unknown`]. A frame that is not a
    /// tagged object, or whose payload does not fit its tag, is an
    /// `Error::Deserialization`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let frame: Frame =
            serde_json::from_str(text).map_err(|e| Error::deserialization(&e, text))?;

        let Ok(kind) = frame.kind.parse::<EventKind>() else {
            return Ok(Self::Unknown { kind: frame.kind });
        };

        let rest = frame.rest;
        let event = match kind {
            EventKind::Log => Self::Log(decode_payload(rest, None, text)?),
            EventKind::TaskUpdate => {
                let patches: OneOrMany<TaskPatch> = decode_payload(rest, Some("task"), text)?;
                Self::TaskUpdate(patches.into())
            }
            EventKind::StatsUpdate => Self::StatsUpdate(decode_payload(rest, Some("stats"), text)?),
            // `data` holds the monitor record, itself shaped `{type, data, timestamp}`.
            EventKind::Alert => Self::Alert(decode_payload(rest, None, text)?),
            EventKind::Pong => Self::Pong,
        };
        Ok(event)
    }

    /// Tag of a recognized event.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Log(_) => Some(EventKind::Log),
            Self::TaskUpdate(_) => Some(EventKind::TaskUpdate),
            Self::StatsUpdate(_) => Some(EventKind::StatsUpdate),
            Self::Alert(_) => Some(EventKind::Alert),
            Self::Pong => Some(EventKind::Pong),
            Self::Unknown { .. } => None,
        }
    }

    /// Tag as it appeared on the wire.
    pub fn tag(&self) -> &str {
        match self {
            Self::Unknown { kind } => kind,
            known => known.kind().map_or("unknown", Into::into),
        }
    }
}

/// Pick the payload out of the frame: `data` first, then the keyed field,
/// then the remaining top-level fields themselves.
fn decode_payload<T: serde::de::DeserializeOwned>(
    mut rest: Map<String, Value>,
    key: Option<&str>,
    raw: &str,
) -> Result<T, Error> {
    let value = match rest.remove("data") {
        Some(data) if !data.is_null() => data,
        _ => match key.and_then(|k| rest.remove(k)) {
            Some(keyed) => keyed,
            None => Value::Object(rest),
        },
    };
    serde_json::from_value(value).map_err(|e| Error::deserialization(&e, raw))
}
