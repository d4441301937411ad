//! Idle-timeout configuration.

use std::env;

/// How long a session may sit idle, and how much of that window is spent
/// showing the warning countdown.
///
/// Values are clamped rather than rejected: a deployment that sets a
/// nonsense value gets a usable timer and a warning in the logs, not a
/// broken login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleConfig {
    /// Minutes of inactivity before forced logout. Minimum 1.
    pub idle_minutes: u64,
    /// Seconds of warning countdown before the deadline. Minimum 5,
    /// capped at the idle window itself.
    pub warning_seconds: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_minutes: 5,
            warning_seconds: 60,
        }
    }
}

impl IdleConfig {
    pub const MIN_IDLE_MINUTES: u64 = 1;
    pub const MIN_WARNING_SECONDS: u64 = 5;

    pub fn new(idle_minutes: u64, warning_seconds: u64) -> Self {
        Self {
            idle_minutes,
            warning_seconds,
        }
        .validated()
    }

    /// Clamps both values into their legal ranges.
    pub fn validated(self) -> Self {
        let idle_minutes = self.idle_minutes.max(Self::MIN_IDLE_MINUTES);
        let warning_seconds =
            self.warning_seconds.max(Self::MIN_WARNING_SECONDS);
        if idle_minutes != self.idle_minutes
            || warning_seconds != self.warning_seconds
        {
            tracing::warn!(
                requested_idle_minutes = self.idle_minutes,
                requested_warning_seconds = self.warning_seconds,
                "idle configuration below minimums, clamping"
            );
        }
        Self {
            idle_minutes,
            warning_seconds,
        }
    }

    /// Reads the configuration from the environment, falling back to the
    /// defaults for anything missing or unparseable.
    ///
    /// `NEXUS_IDLE_TIMEOUT_MINUTES` / `NEXUS_IDLE_WARNING_SECONDS` win
    /// over the older `NEXUS_SESSION_IDLE_MINUTES` /
    /// `NEXUS_SESSION_WARNING_SECONDS` names, which remain accepted.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            idle_minutes: env_u64("NEXUS_IDLE_TIMEOUT_MINUTES")
                .or_else(|| env_u64("NEXUS_SESSION_IDLE_MINUTES"))
                .unwrap_or(defaults.idle_minutes),
            warning_seconds: env_u64("NEXUS_IDLE_WARNING_SECONDS")
                .or_else(|| env_u64("NEXUS_SESSION_WARNING_SECONDS"))
                .unwrap_or(defaults.warning_seconds),
        }
        .validated()
    }

    /// The full idle window in milliseconds.
    pub fn idle_duration_ms(&self) -> i64 {
        self.idle_minutes as i64 * 60 * 1_000
    }

    /// The warning window in milliseconds, never longer than the idle
    /// window itself.
    pub fn warning_duration_ms(&self) -> i64 {
        (self.warning_seconds as i64 * 1_000).min(self.idle_duration_ms())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(name, raw, "unparseable idle setting, ignoring");
            None
        }
    }
}
