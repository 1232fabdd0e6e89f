// ── Runtime session configuration ──
//
// These types describe *how* the session talks to the service: where it
// lives, how long to wait, how often to retry. They never touch disk.
// The CLI builds a `SessionConfig` from its profile and hands it in.

use std::time::Duration;

use url::Url;

use crate::backoff::Backoff;
use crate::error::CoreError;

/// Command-call retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for one attempt.
    pub timeout: Duration,
    /// Retries after the first attempt (so `max_retries + 1` attempts total).
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff: Backoff::retry(),
        }
    }
}

/// Push-channel reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub backoff: Backoff,
    /// Consecutive failed reconnects before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::reconnect(),
            max_attempts: 5,
        }
    }
}

/// Configuration for one session against one service.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service base URL (e.g., `http://nas.local:8000`).
    pub server: Url,
    /// Push-channel path, appended to the server URL.
    pub push_path: String,
    /// Accept self-signed certificates.
    pub insecure: bool,
    pub retry: RetryPolicy,
    pub reconnect: ReconnectPolicy,
    /// Client ping interval. `None` disables the heartbeat.
    pub heartbeat: Option<Duration>,
    /// Dashboard stats refresh interval.
    pub stats_refresh: Duration,
    /// How long a notification stays visible.
    pub notification_ttl: Duration,
    /// Log lines kept in the mirror.
    pub log_capacity: usize,
}

impl SessionConfig {
    /// Defaults for `server`.
    pub fn new(server: Url) -> Self {
        Self {
            server,
            push_path: "/ws".into(),
            insecure: false,
            retry: RetryPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            heartbeat: Some(Duration::from_secs(25)),
            stats_refresh: Duration::from_secs(30),
            notification_ttl: Duration::from_secs(3),
            log_capacity: 500,
        }
    }

    /// Parse `server` and apply defaults.
    pub fn for_server(server: &str) -> Result<Self, CoreError> {
        let url = Url::parse(server).map_err(|e| CoreError::Config {
            message: format!("invalid server URL {server:?}: {e}"),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self::new(url)),
            other => Err(CoreError::Config {
                message: format!("unsupported scheme {other:?} (expected http or https)"),
            }),
        }
    }

    /// Push URL derived from the server URL.
    pub fn push_url(&self) -> Result<Url, CoreError> {
        Ok(strmdeck_api::websocket::push_url(
            &self.server,
            &self.push_path,
        )?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let cfg = SessionConfig::for_server("http://nas.local:8000").unwrap();

        assert_eq!(cfg.retry.timeout, Duration::from_secs(10));
        assert_eq!(cfg.retry.max_retries, 2);
        assert_eq!(cfg.reconnect.max_attempts, 5);
        assert_eq!(cfg.reconnect.backoff.cap, Some(Duration::from_secs(30)));
        assert_eq!(cfg.notification_ttl, Duration::from_secs(3));
        assert_eq!(cfg.push_url().unwrap().as_str(), "ws://nas.local:8000/ws");
    }

    #[test]
    fn rejects_non_http_servers() {
        assert!(SessionConfig::for_server("ftp://nas.local").is_err());
        assert!(SessionConfig::for_server("not a url").is_err());
    }
}
