//! CLI error types with miette diagnostics.
//!
//! Maps config, transport and request failures into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use reelhouse_config::ConfigError;
use reelhouse_core::Failure;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach {url}")]
    #[diagnostic(
        code(reelhouse::connection_failed),
        help(
            "Check the website URL and your network connection.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Realtime channel did not connect within {seconds}s")]
    #[diagnostic(
        code(reelhouse::timeout),
        help("Increase the timeout with --timeout or check that the broker is reachable.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Not signed in")]
    #[diagnostic(
        code(reelhouse::no_credentials),
        help("Run: reelhouse login")
    )]
    NoCredentials,

    #[error("Session expired")]
    #[diagnostic(
        code(reelhouse::session_expired),
        help("The stored token was rejected and has been removed.\nRun: reelhouse login")
    )]
    SessionExpired,

    #[error("Token store error: {message}")]
    #[diagnostic(
        code(reelhouse::token_store),
        help("The system keyring could not be used. Pass --token to skip it for one call.")
    )]
    TokenStore { message: String },

    // ── Requests ─────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(reelhouse::request_failed))]
    RequestFailed { message: String },

    #[error("The request did not complete")]
    #[diagnostic(code(reelhouse::request_failed), help("Re-run with -v for details."))]
    Reported,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(reelhouse::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No website URL configured")]
    #[diagnostic(
        code(reelhouse::no_config),
        help(
            "Set one with: reelhouse config set-url https://stream.example.com\n\
             Or pass --url, or set REELHOUSE_WEBSITE_URL.\n\
             Config file: {path}"
        )
    )]
    NoWebsiteUrl { path: String },

    #[error(transparent)]
    #[diagnostic(code(reelhouse::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(reelhouse::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(reelhouse::json), help("Message bodies must be valid JSON."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NoCredentials | Self::SessionExpired | Self::TokenStore { .. } => {
                exit_code::AUTH
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingWebsiteUrl => Self::NoWebsiteUrl {
                path: reelhouse_config::config_path().display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<Failure> for CliError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::SessionExpired => Self::SessionExpired,
            Failure::Transport { message } => Self::ConnectionFailed {
                url: "the website".into(),
                reason: message,
            },
            Failure::Rejected { message, .. } | Failure::Unknown { message } => {
                Self::RequestFailed { message }
            }
        }
    }
}

impl From<reelhouse_api::Error> for CliError {
    fn from(err: reelhouse_api::Error) -> Self {
        match err {
            reelhouse_api::Error::TokenStore(message) => Self::TokenStore { message },
            reelhouse_api::Error::InvalidToken(reason) => Self::Validation {
                field: "token".into(),
                reason,
            },
            other => Failure::from(other).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_failures_exit_with_auth_code() {
        assert_eq!(CliError::from(Failure::SessionExpired).exit_code(), exit_code::AUTH);
        assert_eq!(CliError::NoCredentials.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn transport_failures_exit_with_connection_code() {
        let err = CliError::from(Failure::Transport {
            message: "connection refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn rejected_requests_keep_server_text() {
        let err = CliError::from(Failure::Rejected {
            status: 400,
            message: "Playlist name taken".into(),
        });
        assert_eq!(err.to_string(), "Playlist name taken");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn missing_url_is_a_config_hint() {
        let err = CliError::from(ConfigError::MissingWebsiteUrl);
        assert!(matches!(err, CliError::NoWebsiteUrl { .. }));
    }
}
