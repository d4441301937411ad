//! Timer behavior over a controlled clock and a paused runtime.
//!
//! Tests advance a [`ManualClock`] explicitly; the paused tokio runtime
//! auto-advances its own virtual time through the timer's sleeps, and
//! the timer re-checks the manual clock after every wakeup. Every await
//! is bounded so a wrong pending state fails the test instead of
//! hanging it.

use std::sync::Arc;
use std::time::Duration;

use nexus_context::ManualClock;
use nexus_idle::{IdleConfig, IdleEvent, IdleTimer};
use tokio::time::timeout;

const EVENT_WAIT: Duration = Duration::from_secs(600);
const PEND_CHECK: Duration = Duration::from_millis(50);

fn minute_timer(start_ms: i64) -> (IdleTimer, ManualClock) {
    // One minute idle, five second warning: warning opens at 55s.
    let clock = ManualClock::new(start_ms);
    let timer =
        IdleTimer::new(&IdleConfig::new(1, 5), Arc::new(clock.clone()));
    (timer, clock)
}

async fn next_event(timer: &mut IdleTimer) -> IdleEvent {
    timeout(EVENT_WAIT, timer.wait_for_event())
        .await
        .expect("timer should produce an event")
}

async fn assert_pending(timer: &mut IdleTimer) {
    assert!(
        timeout(PEND_CHECK, timer.wait_for_event()).await.is_err(),
        "timer should stay pending"
    );
}

#[tokio::test(start_paused = true)]
async fn test_wait_enters_warning_at_window_boundary() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();

    clock.advance(55_000);
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::WarningShown { seconds_remaining: 5 });
    assert!(timer.warning_visible());
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_down_each_second() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    clock.advance(55_000);
    next_event(&mut timer).await;

    clock.advance(1_000);
    let first = next_event(&mut timer).await;
    clock.advance(1_000);
    let second = next_event(&mut timer).await;

    assert_eq!(first, IdleEvent::CountdownTick { seconds_remaining: 4 });
    assert_eq!(second, IdleEvent::CountdownTick { seconds_remaining: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_countdown_recomputes_after_lost_time() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    clock.advance(55_000);
    next_event(&mut timer).await;

    // The host was suspended for three seconds; the next wakeup jumps
    // straight to the recomputed value instead of replaying 4 and 3.
    clock.advance(3_000);
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::CountdownTick { seconds_remaining: 2 });
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fires_expired() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    clock.advance(55_000);
    next_event(&mut timer).await;

    clock.advance(5_000);
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_large_jump_skips_straight_to_expired() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();

    // Two full minutes at once: no warning, no ticks, just expiry.
    clock.advance(120_000);
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_expired_timer_fires_exactly_once() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    clock.advance(120_000);
    assert_eq!(next_event(&mut timer).await, IdleEvent::Expired);

    clock.advance(120_000);
    assert_pending(&mut timer).await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_warning_rearms_full_window() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    clock.advance(55_000);
    next_event(&mut timer).await;
    assert!(timer.warning_visible());

    timer.reset();

    assert!(!timer.warning_visible());
    assert_eq!(timer.seconds_remaining(), 60);
    clock.advance(55_000);
    let event = next_event(&mut timer).await;
    assert_eq!(event, IdleEvent::WarningShown { seconds_remaining: 5 });
}

#[tokio::test(start_paused = true)]
async fn test_stopped_timer_stays_pending() {
    let (mut timer, clock) = minute_timer(0);
    timer.reset();
    timer.stop();

    clock.advance(600_000);
    assert_pending(&mut timer).await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_anchored_in_warning_window_warns_immediately() {
    let (mut timer, clock) = minute_timer(0);
    clock.advance(57_000);

    // Anchor at t=0: 57s of the 60s window already gone.
    timer.reset_at(0);
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::WarningShown { seconds_remaining: 3 });
}

#[tokio::test(start_paused = true)]
async fn test_warning_spanning_whole_window_warns_at_reset() {
    // A warning longer than the idle window is capped to it, so the
    // countdown starts the moment the timer is armed.
    let clock = ManualClock::new(0);
    let mut timer =
        IdleTimer::new(&IdleConfig::new(1, 600), Arc::new(clock.clone()));

    timer.reset();
    let event = next_event(&mut timer).await;

    assert_eq!(event, IdleEvent::WarningShown { seconds_remaining: 60 });
}
