use thiserror::Error;

/// Top-level error type for the `reelhouse-api` crate.
///
/// Covers every failure mode across the REST client, the token store and
/// the realtime channel. `reelhouse-core` folds these into the smaller
/// `Failure` taxonomy that callers see.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The backend rejected the credential. By the time this is returned
    /// the token has been removed and the login redirect has been issued.
    #[error("Session expired (HTTP {status}) -- sign in again")]
    SessionExpired { status: u16 },

    /// The token store could not be read or written.
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// The stored token cannot be used as a header value.
    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-success status that is not a session expiry.
    ///
    /// `server_message` carries the `error` (or `message`) field of a JSON
    /// error body when the backend supplied one.
    #[error("Request failed with status code {status}")]
    Http {
        status: u16,
        server_message: Option<String>,
        body: String,
    },

    // ── Realtime ────────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The broker sent an ERROR frame or a frame we could not parse.
    #[error("STOMP protocol error: {0}")]
    Stomp(String),

    /// No frame or heart-beat arrived within the negotiated window.
    #[error("No heart-beat from broker for {elapsed_ms}ms")]
    HeartbeatTimeout { elapsed_ms: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the credential was rejected.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if this is a network-level error rather than a
    /// response the backend produced.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Tls(_)
                | Self::WebSocketConnect(_)
                | Self::WebSocketClosed { .. }
                | Self::HeartbeatTimeout { .. }
        )
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { status } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The human-readable error message the backend put in the body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { server_message, .. } => server_message.as_deref(),
            _ => None,
        }
    }
}
