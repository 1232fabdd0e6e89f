use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `strmdeck-api` crate.
///
/// Covers every failure mode of a single wire interaction: command calls,
/// push-channel frames, and the WebSocket handshake. Retry decisions are
/// made one layer up; this type only classifies.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The call did not complete before its deadline and was aborted.
    #[error("Request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Application ─────────────────────────────────────────────────
    /// The service answered with a failure status (or an error body).
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        details: Option<serde_json::Value>,
    },

    /// A request body could not be encoded to JSON.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    // ── Push channel ────────────────────────────────────────────────
    /// WebSocket connection failed (handshake, I/O, protocol).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed by the peer.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the call never produced a server answer and is
    /// therefore safe to re-issue: deadline expiry or a connection-level
    /// failure before any response arrived.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => {
                e.status().is_none() && (e.is_timeout() || e.is_connect() || e.is_request())
            }
            _ => false,
        }
    }

    /// Returns `true` if the failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" answer from the service.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// HTTP status of an application-level failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        let err = Error::Timeout {
            timeout: Duration::from_secs(10),
        };
        assert!(err.is_retryable());
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out after 10000ms");
    }

    #[test]
    fn application_errors_are_not_retryable() {
        let err = Error::Api {
            status: 404,
            message: "task not found".into(),
            code: None,
            details: None,
        };
        assert!(!err.is_retryable());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "task not found");
    }

    #[test]
    fn parse_failures_are_not_retryable() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status(), None);
    }
}
