//! Browsing-context platform abstraction for Nexus Connect.
//!
//! The idle-session subsystem runs inside a "browsing context" (one tab of
//! a browser, or one embedded view). Everything that context provides —
//! a wall clock, a key-value store shared with sibling contexts, a cookie
//! jar, navigation — is modeled here behind explicit types so the layers
//! above never touch a runtime global.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)   ← wires timers, session store, broadcasts
//!     ↕
//! Session / Broadcast   ← persist and announce through these handles
//!     ↕
//! Context (this crate)  ← clock, shared storage, cookies, navigation
//! ```
//!
//! One [`SharedStorage`] and one [`CookieJar`] represent the origin; each
//! simulated tab gets its own [`StorageHandle`] (with a unique
//! [`ContextId`]) so that storage change events are delivered to every
//! context *except* the one that wrote them, exactly like the browser's
//! `storage` event.

mod clock;
mod cookies;
mod error;
mod navigator;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cookies::{CookieAttributes, CookieJar, SameSite};
pub use error::StorageError;
pub use navigator::{Navigator, RouteLog};
pub use storage::{
    ContextId, SharedStorage, StorageEvent, StorageEvents, StorageHandle,
};

use std::fmt;

/// A user-visible activity signal observed by the host embedding.
///
/// The host (a real DOM integration, or a test) pushes these into the
/// coordinator's activity channel. Any of them counts as "the user is
/// still here"; `VisibilityChanged { visible: true }` covers returning to
/// a backgrounded tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerMove,
    PointerDown,
    KeyDown,
    TouchStart,
    Scroll,
    VisibilityChanged { visible: bool },
}

/// URL scheme of the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// The origin a context belongs to. Drives the `Secure` cookie flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: Scheme,
    pub host: String,
}

impl Origin {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
        }
    }

    /// HTTPS origins and localhost count as secure contexts.
    pub fn is_secure_context(&self) -> bool {
        self.scheme == Scheme::Https || self.host == "localhost"
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        write!(f, "{scheme}://{}", self.host)
    }
}
