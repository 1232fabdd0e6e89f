//! Resilient session layer between `strmdeck-api` and its consumers.
//!
//! This crate keeps a client's view of a STRM Poller service current and
//! recovers from failures on its own:
//!
//! - **[`Session`]**: central facade. [`connect()`](Session::connect) opens
//!   the push channel, [`switch_page()`](Session::switch_page) loads what a
//!   view displays, and every task, scraper, settings, and log operation
//!   goes through it.
//!
//! - **[`ConnectionManager`]**: push-channel supervisor with bounded
//!   exponential reconnection and a client heartbeat.
//!
//! - **[`RequestClient`]**: command calls with a per-attempt deadline.
//!   Only timeouts and network failures are retried.
//!
//! - **[`EventRouter`]**: dispatches push events by tag. Unknown tags and
//!   malformed payloads are dropped.
//!
//! - **[`StateStore`]**: reactive mirror built on `DashMap` and
//!   `tokio::sync::watch`. Full loads replace; push events patch.
//!
//! - **[`Notifier`]**: transient user-visible messages with auto-dismissal.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod model;
pub mod notify;
pub mod request;
pub mod router;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::Backoff;
pub use config::{ReconnectPolicy, RetryPolicy, SessionConfig};
pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus};
pub use error::CoreError;
pub use notify::{Notification, Notifier, Severity};
pub use request::RequestClient;
pub use router::{Dispatch, EventRouter};
pub use session::Session;
pub use store::StateStore;
pub use stream::EntityStream;

pub use model::{
    DataKind, LogEntry, OrganizeStrategy, Page, PatchOutcome, ScraperConfig, SettingEntry,
    Settings, Stats, Task, TaskStatus,
};

// Wire types callers build requests from.
pub use strmdeck_api::models::{
    ActionAck, HealthStatus, LogQuery, MemoryConfig, NewTask, ProbeResult, ProxyConfig, ProxyKind,
    ScraperConfigUpdate, TaskAction,
};
