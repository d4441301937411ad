//! Wire shapes of the cross-tab messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a logout was forced.
///
/// The serialized form doubles as the `?reason=` query parameter the
/// login page renders a message for, so the snake_case names are part of
/// the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The idle deadline passed with no activity.
    IdleTimeout,
    /// The session record was missing or unreadable at validation time.
    SessionExpired,
    /// The user (or the host application) asked to log out.
    Manual,
}

impl LogoutReason {
    /// The query-parameter value for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::IdleTimeout => "idle_timeout",
            LogoutReason::SessionExpired => "session_expired",
            LogoutReason::Manual => "manual",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity announcement: the absolute timestamp of the interaction.
///
/// Carrying the absolute time (not "reset now") makes delivery order and
/// latency irrelevant — receivers recompute their deadline from `ts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMessage {
    /// Epoch milliseconds of the interaction.
    pub ts: i64,
}

/// Logout announcement.
///
/// `(reason, ts)` together identify the logout, letting receivers drop
/// duplicate deliveries of the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutMessage {
    pub reason: LogoutReason,
    /// Epoch milliseconds at which the logout was decided.
    pub ts: i64,
}

impl ActivityMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Lenient decode: an unreadable payload is logged and ignored.
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(msg) => Some(msg),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed activity message");
                None
            }
        }
    }
}

impl LogoutMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Lenient decode: an unreadable payload is logged and ignored.
    pub fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(msg) => Some(msg),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed logout message");
                None
            }
        }
    }
}
