//! Nexus Connect — client-side idle-session lifecycle.
//!
//! This crate ties the lower layers together into one long-lived actor,
//! built by [`IdleCoordinatorBuilder`] and driven through
//! [`IdleCoordinatorHandle`]: it watches authentication state, anchors an
//! idle deadline on the user's last activity, shows a warning countdown
//! before the deadline, forces a logout when it passes, and keeps every
//! sibling tab of the origin in agreement through storage broadcasts.
//!
//! # The stack
//!
//! ```text
//! nexus-connect    ← this crate: the coordinator actor and auth seam
//! nexus-idle       ← deadline timer and warning countdown
//! nexus-broadcast  ← cross-tab activity/logout messages
//! nexus-session    ← cookie-backed session record
//! nexus-http       ← interceptable client + network activity tap
//! nexus-context    ← clock, shared storage, cookies, navigation
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nexus_connect::{IdleConfig, IdleCoordinatorBuilder, InMemoryAuth};
//! use nexus_context::{
//!     ActivityEvent, CookieJar, Origin, RouteLog, Scheme, SharedStorage,
//!     SystemClock,
//! };
//!
//! # async fn run() {
//! let clock = Arc::new(SystemClock);
//! let storage = SharedStorage::new();
//! let cookies = CookieJar::new(clock.clone());
//! let auth = Arc::new(InMemoryAuth::new());
//!
//! let handle = IdleCoordinatorBuilder::new(
//!     auth.clone(),
//!     storage.context(),
//!     cookies,
//!     Origin::new(Scheme::Https, "localhost"),
//!     Arc::new(RouteLog::new()),
//! )
//! .config(IdleConfig::new(5, 60))
//! .build();
//!
//! auth.login("user-1");
//! handle.report_activity(ActivityEvent::PointerMove).unwrap();
//! # }
//! ```

mod auth;
mod coordinator;
mod error;
mod routes;

pub use auth::{AuthProvider, AuthState, InMemoryAuth};
pub use coordinator::{
    IdleCoordinatorBuilder, IdleCoordinatorHandle, IdleWarning,
};
pub use error::NexusError;
pub use routes::{RedirectRoutes, logout_message, parse_reason};

// The vocabulary of the lower layers, re-exported so embedders depend on
// one crate.
pub use nexus_broadcast::{ActivityMessage, LogoutMessage, LogoutReason};
pub use nexus_idle::{IdleConfig, IdleEvent, IdlePhase, IdleTimer};
pub use nexus_session::{SessionRecord, SessionStore};
