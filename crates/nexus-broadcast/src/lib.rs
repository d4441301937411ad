//! Cross-tab broadcast layer for Nexus Connect.
//!
//! Two kinds of messages travel between sibling tabs, both as JSON values
//! written to well-known shared-storage keys:
//!
//! * **Activity** — "the user just did something at timestamp `ts`".
//!   Receiving tabs re-anchor their idle timers on `ts` without
//!   re-broadcasting, so one interaction quiets every tab.
//! * **Logout** — "this tab forced a logout for `reason` at `ts`".
//!   Receiving tabs tear down and navigate to the login route.
//!
//! Sends are best-effort: a tab whose storage is unavailable keeps its
//! own timer running and simply stops participating in cross-tab sync.

mod broadcaster;
mod message;

pub use broadcaster::ActivityBroadcaster;
pub use message::{ActivityMessage, LogoutMessage, LogoutReason};
