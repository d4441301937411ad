//! Client-side session bookkeeping for Nexus Connect.
//!
//! This crate owns the locally synthesized session record:
//!
//! 1. **The record itself** — [`SessionRecord`]: id, owner, creation and
//!    last-activity timestamps.
//! 2. **The cookie codec** — JSON, percent-encoded, then base64, so the
//!    value is cookie-safe regardless of content.
//! 3. **The store** — [`SessionStore`]: create/ensure/read/update/clear
//!    against the cookie jar, mirrored to shared storage.
//!
//! The record is a client convenience, not a security boundary: nothing
//! here is validated server-side, and a corrupt or missing record is
//! always treated as "no session", never as an error.

mod codec;
mod error;
mod record;
mod store;

pub use codec::{decode_cookie_value, encode_cookie_value};
pub use error::SessionError;
pub use record::{SessionRecord, generate_session_id};
pub use store::SessionStore;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Shared-storage mirror of the session record.
pub const SESSION_META_KEY: &str = "nexus-session-meta";

/// Shared-storage key carrying cross-tab activity broadcasts.
pub const ACTIVITY_KEY: &str = "nexus-connect-last-activity";

/// Shared-storage key carrying cross-tab logout broadcasts.
pub const LOGOUT_EVENT_KEY: &str = "nexus-connect-auth-logout";

/// The auth provider's own persisted-session key, wiped on logout.
pub const AUTH_STORAGE_KEY: &str = "nexus-connect-auth";

/// Session cookie lifetime: one hour, renewed on every activity.
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 60 * 60;
