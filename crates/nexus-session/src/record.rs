//! The session record: what the client remembers about its own login.
//!
//! This is independent of the auth provider's token. It exists so the
//! idle-timeout machinery has a durable anchor for "when did this user
//! last do something", surviving reloads within the cookie's window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The client-held session metadata, serialized into the session cookie
/// and mirrored to shared storage.
///
/// Field names are part of the wire format — the cookie value decodes to
/// exactly this JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque unique id, generated client-side.
    pub session_id: String,

    /// The authenticated principal, when known.
    pub user_id: Option<String>,

    /// When this record was created.
    pub created_at: DateTime<Utc>,

    /// Most recent observed activity. Monotonically non-decreasing under
    /// normal operation; the idle timer anchors on it after a reload.
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    /// `last_activity` as epoch milliseconds, the unit the timer and the
    /// cross-tab broadcasts speak.
    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity.timestamp_millis()
    }
}

/// Generates a fresh session id.
#[cfg(feature = "uuid-ids")]
pub fn generate_session_id(_now_ms: i64) -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generates a fresh session id without the UUID dependency: 64 bits of
/// randomness plus the current time, mirroring the non-UUID fallback of
/// the original client.
#[cfg(not(feature = "uuid-ids"))]
pub fn generate_session_id(now_ms: i64) -> String {
    use rand::Rng;
    let bytes: [u8; 8] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("session_{hex}{now_ms}")
}
