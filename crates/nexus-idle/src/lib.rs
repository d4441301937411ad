//! Idle deadline tracking for Nexus Connect.
//!
//! The timer in this crate answers one question: given the timestamp of
//! the user's last activity, when do we warn and when do we log out?
//!
//! Everything is computed from **absolute** epoch-millisecond deadlines,
//! never from relative countdowns. That choice makes the timer immune to
//! suspended tabs and throttled timers: whenever the task wakes up, it
//! re-reads the clock and recomputes where it stands, so a wakeup that
//! arrives late jumps straight to the right phase instead of drifting.
//!
//! The timer is single-owner state driven by the coordinator's select
//! loop; it is not a spawned task of its own.

mod config;
mod timer;

pub use config::IdleConfig;
pub use timer::{IdleEvent, IdlePhase, IdleTimer};
