// ── Failure taxonomy ──
//
// What a caller of the request facade can learn about a failed call. This
// is deliberately smaller than `reelhouse_api::Error`: consumers only ever
// need to tell "signed out" apart from "network" apart from "the backend
// said no".

use thiserror::Error;

/// Fallback text when neither the backend nor the transport said anything.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Failure {
    /// The credential was rejected. The token is already gone and the
    /// login redirect has been issued.
    #[error("Session expired")]
    SessionExpired,

    /// Network-level failure: refused, DNS, timeout, dropped socket.
    #[error("{message}")]
    Transport { message: String },

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Anything else, including undecodable payloads.
    #[error("{message}")]
    Unknown { message: String },
}

impl Failure {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: non_empty(message.into()),
        }
    }

    /// The text shown to the user for this failure.
    pub fn message(&self) -> &str {
        match self {
            Self::SessionExpired => "Session expired",
            Self::Transport { message }
            | Self::Rejected { message, .. }
            | Self::Unknown { message } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_owned()
    } else {
        message
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<reelhouse_api::Error> for Failure {
    fn from(err: reelhouse_api::Error) -> Self {
        use reelhouse_api::Error as E;

        if err.is_session_expired() {
            return Self::SessionExpired;
        }
        if err.is_transport() {
            return Self::Transport {
                message: non_empty(err.to_string()),
            };
        }

        match &err {
            // Server-supplied text wins over our own description of the status.
            E::Http {
                status,
                server_message,
                ..
            } => {
                let message = server_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| err.to_string());
                Self::Rejected {
                    status: *status,
                    message: non_empty(message),
                }
            }
            _ => Self::unknown(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelhouse_api::Error as ApiError;

    #[test]
    fn server_message_preferred() {
        let failure = Failure::from(ApiError::Http {
            status: 400,
            server_message: Some("Playlist name taken".into()),
            body: String::new(),
        });
        assert_eq!(
            failure,
            Failure::Rejected {
                status: 400,
                message: "Playlist name taken".into()
            }
        );
    }

    #[test]
    fn falls_back_to_error_text() {
        let failure = Failure::from(ApiError::Http {
            status: 404,
            server_message: None,
            body: "Not Found".into(),
        });
        assert_eq!(failure.message(), "Request failed with status code 404");
        assert_eq!(failure.status(), Some(404));
    }

    #[test]
    fn blank_messages_fall_through() {
        assert_eq!(Failure::unknown("  ").message(), UNKNOWN_ERROR);
        let failure = Failure::from(ApiError::Http {
            status: 502,
            server_message: Some(String::new()),
            body: String::new(),
        });
        assert_eq!(failure.message(), "Request failed with status code 502");
    }

    #[test]
    fn classifies_expiry_and_transport() {
        assert!(Failure::from(ApiError::SessionExpired { status: 401 }).is_session_expired());
        assert!(matches!(
            Failure::from(ApiError::HeartbeatTimeout { elapsed_ms: 1 }),
            Failure::Transport { .. }
        ));
        assert!(matches!(
            Failure::from(ApiError::Deserialization {
                message: "expected value".into(),
                body: "<html>".into(),
            }),
            Failure::Unknown { .. }
        ));
    }
}
