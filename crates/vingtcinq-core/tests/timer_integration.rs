//! Integration tests for the focus timer driven through the tracker.
//!
//! Time only moves when the test advances the manual clock, so every
//! assertion is exact up to the one-second display rounding.

use std::sync::Arc;

use proptest::prelude::*;
use vingtcinq_core::storage::MemoryCounter;
use vingtcinq_core::{
    Event, ManualClock, SessionHistory, SqliteSessionStore, StaticIdentity, TimerState, Tracker,
};

const T0: u64 = 1_700_000_000_000;

fn tracker() -> (ManualClock, Tracker<ManualClock>) {
    let clock = ManualClock::new(T0);
    let history = SessionHistory::new(
        Arc::new(SqliteSessionStore::open_memory().unwrap()),
        Arc::new(StaticIdentity::anonymous()),
        Box::new(MemoryCounter::new()),
    );
    (clock.clone(), Tracker::new(clock, history))
}

fn assert_total_invariant(t: &Tracker<ManualClock>) {
    let data = t.timer().session_data();
    assert_eq!(data.total_secs, data.active_secs + data.extra_secs);
}

#[test]
fn test_single_tick_catches_up_after_suspend() {
    let (clock, mut t) = tracker();
    t.set_remaining(1500);
    t.start();
    // Suspended for ten minutes, far longer than any cadence.
    clock.advance_secs(600);
    assert!(t.tick().is_empty());
    assert_eq!(t.timer().remaining_secs(), 900);
    assert_eq!(t.timer().session_data().active_secs, 600.0);
}

#[test]
fn test_pause_resume_does_not_double_count() {
    let (clock, mut t) = tracker();
    t.set_remaining(100);
    t.start();
    clock.advance_secs(10);
    t.tick();
    t.pause();
    clock.advance_secs(5);
    t.tick();
    t.start();
    clock.advance_secs(10);
    t.tick();

    let data = t.timer().session_data();
    assert_eq!(data.active_secs, 20.0);
    assert_eq!(data.pause_secs, 5.0);
    assert_eq!(t.timer().remaining_secs(), 80);
    assert_total_invariant(&t);
}

#[test]
fn test_pause_time_accumulates_without_ticks() {
    let (clock, mut t) = tracker();
    t.set_remaining(100);
    t.start();
    clock.advance_secs(10);
    t.pause();
    // No periodic recomputation while paused: resuming still flushes it.
    clock.advance_secs(42);
    t.start();
    assert_eq!(t.timer().session_data().pause_secs, 42.0);
    assert_eq!(t.timer().session_data().total_secs, 10.0);
}

#[test]
fn test_completion_is_lazy() {
    let (clock, mut t) = tracker();
    t.set_remaining(1);
    let number_before = t.current_session_number();
    t.start();
    clock.advance_secs(1);

    let events = t.tick();
    assert!(matches!(events.as_slice(), [Event::TimerCompleted { .. }]));
    assert_eq!(t.timer().remaining_secs(), 0);
    assert!(!t.timer().is_running());
    assert_eq!(t.timer().state(), TimerState::Completed);
    assert!(t.history().is_empty());

    // Further ticks do not finalize anything either.
    clock.advance_secs(30);
    assert!(t.tick().is_empty());
    assert!(t.history().is_empty());

    match t.start() {
        Some(Event::SessionCompleted { session }) => {
            assert_eq!(session.session_number, number_before);
            assert_eq!(session.data.active_secs, 1.0);
        }
        other => panic!("Expected SessionCompleted, got {other:?}"),
    }
    assert_eq!(t.history().len(), 1);
    assert_eq!(t.timer().state(), TimerState::Idle);
    assert!(!t.timer().has_started());
}

#[test]
fn test_extra_time_moves_end_in_place() {
    let (clock, mut t) = tracker();
    t.set_remaining(60);
    t.start();
    clock.advance_secs(10);
    t.tick();
    assert_eq!(t.timer().remaining_secs(), 50);
    let end_before = t.timer().end_ms().unwrap();

    t.add_extra_time(30);
    assert_eq!(t.timer().remaining_secs(), 80);
    assert_eq!(t.timer().end_ms(), Some(end_before + 30_000));
    assert!(t.timer().is_running());

    t.tick();
    assert_eq!(t.timer().remaining_secs(), 80);
    let data = t.timer().session_data();
    assert_eq!(data.extra_secs, 30.0);
    assert_eq!(data.total_secs, 40.0);
}

#[test]
fn test_extra_time_after_completion_keeps_pending_rollover() {
    let (clock, mut t) = tracker();
    t.set_remaining(2);
    t.start();
    clock.advance_secs(2);
    t.tick();
    t.add_extra_time(300);
    assert_eq!(t.timer().remaining_secs(), 300);
    assert_eq!(t.timer().state(), TimerState::Completed);

    // The next start still rolls over the finished session first.
    assert!(matches!(t.start(), Some(Event::SessionCompleted { .. })));
    assert_eq!(t.history().len(), 1);
    assert_eq!(t.timer().remaining_secs(), 300);
    assert!(matches!(t.start(), Some(Event::TimerStarted { remaining_secs: 300, .. })));
}

#[test]
fn test_start_new_session_captures_paused_session() {
    let (clock, mut t) = tracker();
    t.set_remaining(600);
    t.start();
    clock.advance_secs(100);
    t.pause();
    clock.advance_secs(20);

    match t.start_new_session() {
        Some(Event::SessionCompleted { session }) => {
            assert_eq!(session.data.active_secs, 100.0);
            assert_eq!(session.data.pause_secs, 20.0);
        }
        other => panic!("Expected SessionCompleted, got {other:?}"),
    }
    assert_eq!(t.timer().remaining_secs(), 0);
    assert!(t.set_remaining(60));
}

#[test]
fn test_invalid_inputs_are_clamped_or_ignored() {
    let (clock, mut t) = tracker();
    assert!(t.set_remaining(-30));
    assert_eq!(t.timer().remaining_secs(), 0);
    assert!(t.set_time_string("not a time"));
    assert_eq!(t.timer().remaining_secs(), 0);

    t.set_remaining(100);
    t.start();
    clock.advance_secs(5);
    assert!(!t.set_remaining(10));
    t.add_extra_time(-1000);
    assert_eq!(t.timer().remaining_secs(), 0);
    assert_eq!(t.timer().session_data().extra_secs, 0.0);
}

#[test]
fn test_clock_jumps_are_absorbed_by_recomputation() {
    let (clock, mut t) = tracker();
    t.set_remaining(60);
    t.start();
    // Wall clock set back: the countdown follows, active time never goes negative.
    clock.set(T0 - 30_000);
    t.tick();
    assert_eq!(t.timer().remaining_secs(), 90);
    assert_eq!(t.timer().session_data().active_secs, 0.0);
    // Wall clock jumps far ahead: clamped at zero in one step.
    clock.set(T0 + 100_000);
    assert!(matches!(t.tick().as_slice(), [Event::TimerCompleted { .. }]));
    assert_eq!(t.timer().remaining_secs(), 0);
    assert_eq!(t.timer().session_data().active_secs, 100.0);
}

#[test]
fn test_break_is_independent_of_statistics() {
    let (clock, mut t) = tracker();
    t.start_break(vingtcinq_core::BreakKind::Short);
    clock.advance_secs(300);
    let events = t.tick();
    assert!(matches!(events.as_slice(), [Event::BreakCompleted { .. }]));
    assert!(t.breaks().is_completed());
    assert_eq!(t.timer().session_data().total_secs, 0.0);
    assert!(t.history().is_empty());
}

proptest! {
    #[test]
    fn prop_one_tick_yields_exact_remaining(
        original in 1u64..20_000,
        delta_ms in 0u64..40_000_000,
    ) {
        let (clock, mut t) = tracker();
        t.set_remaining(original as i64);
        t.start();
        clock.advance(std::time::Duration::from_millis(delta_ms));
        t.tick();
        let expected = (original * 1000).saturating_sub(delta_ms).div_ceil(1000);
        prop_assert_eq!(t.timer().remaining_secs(), expected);
    }

    #[test]
    fn prop_total_is_active_plus_extra(
        steps in prop::collection::vec((0u8..5, 0u64..120, -60i64..120), 1..40),
    ) {
        let (clock, mut t) = tracker();
        t.set_remaining(600);
        for (op, secs, extra) in steps {
            clock.advance_secs(secs);
            match op {
                0 => { t.start(); }
                1 => { t.pause(); }
                2 => { t.tick(); }
                3 => { t.add_extra_time(extra); }
                _ => { t.toggle(); }
            }
            let data = t.timer().session_data();
            prop_assert_eq!(data.total_secs, data.active_secs + data.extra_secs);
            prop_assert!(data.active_secs >= 0.0 && data.pause_secs >= 0.0 && data.extra_secs >= 0.0);
        }
    }
}
