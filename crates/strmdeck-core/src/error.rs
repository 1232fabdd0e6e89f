// ── Core error types ──
//
// The failure taxonomy the session layer reports to its host. Consumers
// never see reqwest or tungstenite errors directly; the
// `From<strmdeck_api::Error>` impl classifies transport-layer failures.

use std::time::Duration;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transient (recovered locally until the budget runs out) ──────
    /// The push channel closed or failed to open.
    #[error("Push channel unavailable: {reason}")]
    Connection { reason: String },

    /// Every attempt of a command call hit its deadline.
    #[error("Request timed out after {attempts} attempt(s) of {}ms", .timeout.as_millis())]
    Timeout { attempts: u32, timeout: Duration },

    /// Every attempt failed before reaching the service.
    #[error("Network failure after {attempts} attempt(s): {reason}")]
    Network { attempts: u32, reason: String },

    // ── Surfaced immediately ─────────────────────────────────────────
    /// The service answered with a failure. `message` is its detail text.
    #[error("{message}")]
    Application {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// A name the caller supplied matches nothing in the mirror.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// A response body did not match its schema.
    #[error("Unexpected response from service: {message}")]
    Parse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Timeout and network failures: the only kinds a retry can fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Application { status: 404, .. } | Self::NotFound { .. }
        )
    }

    /// Record how many attempts a transient failure consumed.
    #[must_use]
    pub fn after_attempts(self, n: u32) -> Self {
        match self {
            Self::Timeout { timeout, .. } => Self::Timeout {
                attempts: n,
                timeout,
            },
            Self::Network { reason, .. } => Self::Network { attempts: n, reason },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<strmdeck_api::Error> for CoreError {
    fn from(err: strmdeck_api::Error) -> Self {
        use strmdeck_api::Error as Api;

        match err {
            Api::Timeout { timeout } => CoreError::Timeout {
                attempts: 1,
                timeout,
            },
            Api::Transport(ref e) => match e.status() {
                Some(status) => CoreError::Application {
                    status: status.as_u16(),
                    message: e.to_string(),
                    code: None,
                },
                None => CoreError::Network {
                    attempts: 1,
                    reason: e.to_string(),
                },
            },
            Api::Api {
                status,
                message,
                code,
                details: _,
            } => CoreError::Application {
                status,
                message,
                code,
            },
            Api::Deserialization { message, body: _ } => CoreError::Parse { message },
            Api::WebSocketConnect(reason) => CoreError::Connection { reason },
            Api::WebSocketClosed { code, reason } => CoreError::Connection {
                reason: format!("closed with code {code}: {reason}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::ClientBuild(message) => CoreError::Config { message },
            Api::InvalidBody(message) => CoreError::Internal(message),
        }
    }
}
