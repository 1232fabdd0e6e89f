// Request and response schemas for the command surface.
//
// Every response body is decoded into one of these types at the boundary.
// Field names follow the service's snake_case JSON. Timestamps are the
// service's naive local ISO-8601 strings.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

// ── Tasks ───────────────────────────────────────────────────────────

/// Lifecycle state of an organize task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// No further progress will be reported for a task in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// How the service lays out organized files.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrganizeStrategy {
    #[default]
    Category,
    Type,
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    Flat,
}

/// A task as returned by `GET /api/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub name: String,
    pub source_path: String,
    pub destination_path: String,
    #[serde(default)]
    pub organize_strategy: OrganizeStrategy,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub processed_files: u64,
    #[serde(default)]
    pub failed_files: u64,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub source_path: String,
    pub destination_path: String,
    #[serde(default)]
    pub organize_strategy: OrganizeStrategy,
}

/// Incremental task fields carried by `task_update` push events.
///
/// Only `id` is mandatory; absent fields leave the mirrored task untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub processed_files: Option<u64>,
    #[serde(default)]
    pub failed_files: Option<u64>,
    #[serde(default)]
    pub started_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

/// Lifecycle actions exposed as `POST /api/tasks/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TaskAction {
    Start,
    Pause,
    Cancel,
    Retry,
}

/// `{ "success": true, "task_id": 7 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreateTaskAck {
    #[serde(default = "default_true")]
    pub success: bool,
    pub task_id: i64,
}

/// `{ "success": true }` with an optional retry counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActionAck {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub retry_count: Option<u64>,
}

fn default_true() -> bool {
    true
}

// ── Scrapers ────────────────────────────────────────────────────────

/// A metadata source as returned by `GET /api/scraper-configs`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfigRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub cookie: Option<SecretString>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_scraper_timeout")]
    pub timeout: u32,
    #[serde(default = "default_scraper_retries")]
    pub retry_count: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_scraper_timeout() -> u32 {
    30
}

fn default_scraper_retries() -> u32 {
    3
}

/// Body of `PUT /api/scraper-configs/{id}`. The service replaces every field.
#[derive(Debug, Clone, Serialize)]
pub struct ScraperConfigUpdate {
    pub name: String,
    pub enabled: bool,
    #[serde(serialize_with = "expose_optional")]
    pub api_key: Option<SecretString>,
    #[serde(serialize_with = "expose_optional")]
    pub cookie: Option<SecretString>,
    pub priority: i32,
    pub timeout: u32,
    pub retry_count: u32,
}

impl From<&ScraperConfigRecord> for ScraperConfigUpdate {
    fn from(r: &ScraperConfigRecord) -> Self {
        Self {
            name: r.name.clone(),
            enabled: r.enabled,
            api_key: r.api_key.clone(),
            cookie: r.cookie.clone(),
            priority: r.priority,
            timeout: r.timeout,
            retry_count: r.retry_count,
        }
    }
}

/// Outcome of `POST /api/scraper-configs/{id}/test` and `POST /api/proxy/test`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub ip: Option<String>,
}

// ── Settings ────────────────────────────────────────────────────────

/// A key/value row from `GET /api/system-configs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfigEntry {
    #[serde(default)]
    pub id: i64,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Body of `PUT /api/system-configs` (upsert by key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemConfigUpdate {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Http,
    Https,
    Socks5,
}

/// Body of `PUT /api/proxy/config`.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(serialize_with = "expose_optional")]
    pub password: Option<SecretString>,
    pub test_url: String,
    pub timeout: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: ProxyKind::Http,
            host: "localhost".into(),
            port: 8080,
            username: None,
            password: None,
            test_url: "https://httpbin.org/ip".into(),
            timeout: 10,
        }
    }
}

/// `GET /api/proxy/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: ProxyKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub is_working: bool,
    #[serde(default)]
    pub last_test: Option<String>,
}

/// Body of `PUT /api/memory/config`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub max_memory_mb: u32,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 1024,
            warning_threshold: 0.8,
            critical_threshold: 0.95,
        }
    }
}

/// `GET /api/memory/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatus {
    pub max_memory_mb: u32,
    #[serde(default)]
    pub warning_threshold: f64,
    #[serde(default)]
    pub critical_threshold: f64,
    #[serde(default)]
    pub last_check: Option<String>,
    /// Remaining measurements (`rss_mb`, `percent`, ...) vary by platform.
    #[serde(flatten)]
    pub measurements: BTreeMap<String, serde_json::Value>,
}

// ── Stats ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIo {
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_recv: u64,
    #[serde(default)]
    pub packets_sent: u64,
    #[serde(default)]
    pub packets_recv: u64,
}

/// `GET /api/stats/system`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    #[serde(default)]
    pub disk_usage: BTreeMap<String, DiskUsage>,
    #[serde(default)]
    pub network_io: NetworkIo,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET /api/stats/tasks`, counts keyed by status name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub tasks: BTreeMap<String, u64>,
    #[serde(default)]
    pub files: BTreeMap<String, u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl TaskStats {
    pub fn count(&self, status: TaskStatus) -> u64 {
        self.tasks.get(status.as_ref()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.tasks.values().sum()
    }
}

// ── Logs ────────────────────────────────────────────────────────────

/// A service log line, from `GET /api/logs` or a `log` push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn default_log_level() -> String {
    "info".into()
}

/// Filter for `GET /api/logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub level: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /api/logs` answers either a bare array or `{ "logs": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LogsResponse {
    Bare(Vec<LogRecord>),
    Wrapped { logs: Vec<LogRecord> },
}

impl LogsResponse {
    pub fn into_records(self) -> Vec<LogRecord> {
        match self {
            Self::Bare(logs) | Self::Wrapped { logs } => logs,
        }
    }
}

// ── Health ──────────────────────────────────────────────────────────

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

// ── Helpers ─────────────────────────────────────────────────────────

#[allow(clippy::ref_option)]
fn expose_optional<S: Serializer>(value: &Option<SecretString>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(secret) => s.serialize_some(secret.expose_secret()),
        None => s.serialize_none(),
    }
}
