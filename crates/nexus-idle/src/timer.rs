//! The idle timer proper.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use nexus_context::Clock;

use crate::IdleConfig;

/// Where the timer currently stands relative to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePhase {
    /// Counting down silently; no warning visible.
    Active,
    /// Inside the warning window; a countdown is being shown.
    Warning,
    /// The deadline has passed.
    Expired,
}

/// What [`IdleTimer::wait_for_event`] resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// The warning window was just entered.
    WarningShown { seconds_remaining: u64 },
    /// One second of warning countdown elapsed.
    CountdownTick { seconds_remaining: u64 },
    /// The idle deadline passed.
    Expired,
}

/// Deadline-anchored idle timer.
///
/// The timer holds at most one absolute deadline: last activity plus the
/// idle window. `wait_for_event` sleeps until the next interesting moment
/// (warning entry, countdown tick, or expiry) and then *re-reads the
/// clock* before deciding what happened, so late wakeups resolve to the
/// correct event instead of replaying missed intermediate ones.
///
/// A stopped timer (no deadline) or an expired one pends forever until
/// the owner calls [`reset`](Self::reset) again; expiry fires exactly
/// once per deadline.
pub struct IdleTimer {
    idle_ms: i64,
    warning_ms: i64,
    deadline_ms: Option<i64>,
    phase: IdlePhase,
    /// Last countdown value handed to the caller; a wakeup that finds a
    /// lower value reports it immediately instead of waiting for the
    /// next grid point.
    last_reported_secs: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl IdleTimer {
    pub fn new(config: &IdleConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            idle_ms: config.idle_duration_ms(),
            warning_ms: config.warning_duration_ms(),
            deadline_ms: None,
            phase: IdlePhase::Active,
            last_reported_secs: None,
            clock,
        }
    }

    /// Anchors the deadline on activity happening right now.
    pub fn reset(&mut self) -> IdlePhase {
        let now = self.clock.now_ms();
        self.reset_at(now)
    }

    /// Anchors the deadline on activity at `reference_ms` (epoch millis).
    ///
    /// Used when the anchor comes from elsewhere: a persisted record
    /// after a reload, or a sibling tab's broadcast. A reference so old
    /// that the deadline has already passed leaves the timer expired and
    /// reports it, letting the caller log out immediately.
    pub fn reset_at(&mut self, reference_ms: i64) -> IdlePhase {
        let deadline = reference_ms + self.idle_ms;
        self.deadline_ms = Some(deadline);
        self.last_reported_secs = None;
        if deadline <= self.clock.now_ms() {
            self.phase = IdlePhase::Expired;
            tracing::debug!(
                reference_ms,
                deadline,
                "reset anchor is already past the deadline"
            );
        } else {
            self.phase = IdlePhase::Active;
        }
        self.phase
    }

    /// Detaches the timer; it will pend until the next reset.
    pub fn stop(&mut self) {
        self.deadline_ms = None;
        self.phase = IdlePhase::Active;
        self.last_reported_secs = None;
    }

    pub fn phase(&self) -> IdlePhase {
        self.phase
    }

    pub fn warning_visible(&self) -> bool {
        self.phase == IdlePhase::Warning
    }

    /// Whole seconds left until the deadline, rounded up so the countdown
    /// never displays zero while time actually remains.
    pub fn seconds_remaining(&self) -> u64 {
        let Some(deadline) = self.deadline_ms else {
            return 0;
        };
        let remaining = (deadline - self.clock.now_ms()).max(0);
        ((remaining + 999) / 1_000) as u64
    }

    /// Waits for the next phase change or countdown tick.
    ///
    /// Cancellation-safe: dropping the future and calling again computes
    /// a fresh wait from the current clock and phase.
    pub async fn wait_for_event(&mut self) -> IdleEvent {
        let Some(deadline) = self.deadline_ms else {
            return future::pending().await;
        };
        let due = match self.phase {
            IdlePhase::Active => deadline - self.warning_ms,
            IdlePhase::Warning => {
                let current = self.seconds_remaining();
                match self.last_reported_secs {
                    // The countdown has moved since we last reported;
                    // surface it without further delay.
                    Some(last) if current < last => self.clock.now_ms(),
                    // Otherwise sleep to the moment the displayed value
                    // drops, anchored on the deadline grid.
                    _ => deadline - (current as i64 - 1) * 1_000,
                }
            }
            IdlePhase::Expired => return future::pending().await,
        };
        self.sleep_until(due).await;

        let now = self.clock.now_ms();
        if now >= deadline {
            self.phase = IdlePhase::Expired;
            return IdleEvent::Expired;
        }
        let seconds_remaining = self.seconds_remaining();
        self.last_reported_secs = Some(seconds_remaining);
        match self.phase {
            IdlePhase::Active => {
                self.phase = IdlePhase::Warning;
                IdleEvent::WarningShown { seconds_remaining }
            }
            IdlePhase::Warning => {
                IdleEvent::CountdownTick { seconds_remaining }
            }
            // now < deadline, so the phase cannot be Expired here.
            IdlePhase::Expired => unreachable!(),
        }
    }

    /// Sleeps until the clock reads at least `due_ms`.
    ///
    /// The runtime's sleep and the injected clock can disagree (paused
    /// runtime, suspended host), so after every wakeup the clock is
    /// consulted again and the remainder re-slept.
    async fn sleep_until(&self, due_ms: i64) {
        loop {
            let now = self.clock.now_ms();
            if now >= due_ms {
                return;
            }
            let wait = (due_ms - now) as u64;
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_context::ManualClock;

    fn timer_at(
        start_ms: i64,
        idle_minutes: u64,
        warning_seconds: u64,
    ) -> (IdleTimer, ManualClock) {
        let clock = ManualClock::new(start_ms);
        let timer = IdleTimer::new(
            &IdleConfig::new(idle_minutes, warning_seconds),
            Arc::new(clock.clone()),
        );
        (timer, clock)
    }

    #[test]
    fn test_fresh_timer_has_no_deadline() {
        let (timer, _clock) = timer_at(0, 5, 60);
        assert_eq!(timer.phase(), IdlePhase::Active);
        assert_eq!(timer.seconds_remaining(), 0);
        assert!(!timer.warning_visible());
    }

    #[test]
    fn test_reset_arms_full_idle_window() {
        let (mut timer, _clock) = timer_at(0, 5, 60);
        assert_eq!(timer.reset(), IdlePhase::Active);
        assert_eq!(timer.seconds_remaining(), 300);
    }

    #[test]
    fn test_reset_at_stale_reference_reports_expired() {
        let (mut timer, _clock) = timer_at(600_000, 5, 60);
        // Anchor 10 minutes ago with a 5 minute window.
        assert_eq!(timer.reset_at(0), IdlePhase::Expired);
        assert_eq!(timer.seconds_remaining(), 0);
    }

    #[test]
    fn test_reset_at_deadline_exactly_now_is_expired() {
        let (mut timer, _clock) = timer_at(300_000, 5, 60);
        assert_eq!(timer.reset_at(0), IdlePhase::Expired);
    }

    #[test]
    fn test_seconds_remaining_rounds_up() {
        let (mut timer, clock) = timer_at(0, 5, 60);
        timer.reset();
        clock.advance(299_001);
        // 999ms left still displays as one second.
        assert_eq!(timer.seconds_remaining(), 1);
    }

    #[test]
    fn test_stop_clears_deadline() {
        let (mut timer, _clock) = timer_at(0, 5, 60);
        timer.reset();
        timer.stop();
        assert_eq!(timer.seconds_remaining(), 0);
        assert_eq!(timer.phase(), IdlePhase::Active);
    }
}
