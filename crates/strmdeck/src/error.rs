//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use strmdeck_config::ConfigError;
use strmdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the service at {url}: {reason}")]
    #[diagnostic(
        code(strmdeck::connection_failed),
        help(
            "Check that STRM Poller is running and reachable.\n\
             URL: {url}\n\
             Try: strmdeck stats --server {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(strmdeck::timeout),
        help("Increase the per-attempt deadline with --timeout or check service load.")
    )]
    Timeout { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(strmdeck::not_found),
        help("Run: strmdeck {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    /// The service refused the request; `message` is its detail verbatim.
    #[error("{message}")]
    #[diagnostic(code(strmdeck::api_error))]
    ApiError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected response from service: {message}")]
    #[diagnostic(
        code(strmdeck::unexpected_response),
        help("The service version may not match this client.")
    )]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(strmdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(strmdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: strmdeck config init <url> --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No service configured")]
    #[diagnostic(
        code(strmdeck::no_config),
        help(
            "Create a profile with: strmdeck config init <url>\n\
             Or pass --server / set STRMDECK_SERVER.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(strmdeck::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(strmdeck::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(strmdeck::internal))]
    Internal(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::ApiError { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the service URL to connection failures.
    #[must_use]
    pub fn at_url(self, server: &str) -> Self {
        match self {
            Self::ConnectionFailed { reason, .. } => Self::ConnectionFailed {
                url: server.trim_end_matches('/').to_owned(),
                reason,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },

            CoreError::Network { reason, .. } | CoreError::Connection { reason } => {
                CliError::ConnectionFailed {
                    url: "(service)".into(),
                    reason,
                }
            }

            CoreError::NotFound { kind, name } => CliError::NotFound {
                list_command: format!("{kind}s list"),
                resource_type: kind,
                identifier: name,
            },

            CoreError::Application {
                status,
                message,
                code,
            } => CliError::ApiError {
                status,
                code,
                message,
            },

            CoreError::Parse { message } => CliError::UnexpectedResponse { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
