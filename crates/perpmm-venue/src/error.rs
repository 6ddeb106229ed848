//! Venue error taxonomy.
//!
//! Transport failures are recoverable and never escalate past a log line;
//! logical 4xx responses carry semantic meaning the executor acts on.

use thiserror::Error;

/// Semantic meaning of a 4xx venue response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalErrorKind {
    /// The order was filled or closed before the request landed.
    AlreadyFilledOrClosed,
    /// The venue does not know the order ID.
    OrderUnknown,
    /// The auth challenge expired before verification.
    ChallengeExpired,
    /// The signature did not verify.
    InvalidSignature,
    /// The settlement was already applied.
    AlreadySettled,
}

/// Venue error types.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Connection, timeout, or 5xx. Logged and counted, not escalated.
    #[error("Transport error: {0}")]
    Transport(String),

    /// 4xx with semantic meaning.
    #[error("Venue logical error ({kind:?}): {message}")]
    Logical {
        kind: LogicalErrorKind,
        message: String,
    },

    /// Bearer token rejected; the next cycle refreshes.
    #[error("Token expired")]
    TokenExpired,

    /// Cooperative cancellation observed at a suspension point.
    #[error("Operation cancelled")]
    Cancelled,

    /// Key material or auth configuration problems. Fatal at startup.
    #[error("Auth configuration error: {0}")]
    AuthConfig(String),
}

impl VenueError {
    /// Whether a cancel failure means the order is no longer live, which
    /// counts as success for slot bookkeeping.
    #[must_use]
    pub fn is_order_gone(&self) -> bool {
        matches!(
            self,
            Self::Logical {
                kind: LogicalErrorKind::AlreadyFilledOrClosed | LogicalErrorKind::OrderUnknown,
                ..
            }
        )
    }

    /// Classify an HTTP error response by status and body text.
    #[must_use]
    pub fn classify_http(status: u16, body: &str) -> Self {
        if status == 401 {
            return Self::TokenExpired;
        }

        if (400..500).contains(&status) {
            let lower = body.to_ascii_lowercase();
            let kind = if lower.contains("already filled") || lower.contains("closed") {
                Some(LogicalErrorKind::AlreadyFilledOrClosed)
            } else if lower.contains("not found") || lower.contains("unknown") {
                Some(LogicalErrorKind::OrderUnknown)
            } else if lower.contains("challenge") && lower.contains("expired") {
                Some(LogicalErrorKind::ChallengeExpired)
            } else if lower.contains("invalid signature") {
                Some(LogicalErrorKind::InvalidSignature)
            } else if lower.contains("already settled") {
                Some(LogicalErrorKind::AlreadySettled)
            } else {
                None
            };

            if let Some(kind) = kind {
                return Self::Logical {
                    kind,
                    message: body.to_string(),
                };
            }
        }

        Self::Transport(format!("HTTP {status}: {body}"))
    }
}

impl From<reqwest::Error> for VenueError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Result type alias for venue operations.
pub type VenueResult<T> = std::result::Result<T, VenueError>;
