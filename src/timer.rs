//! Sit timer
//!
//! Accumulates sitting time across pause/resume cycles. Elapsed time is always
//! computed from clock deltas, never by counting ticks, so a throttled or
//! skipped periodic callback cannot make the timer drift.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic clock anchored when it is created
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Settable clock shared between clones.
///
/// Hosts that replay recorded data (and tests) advance it explicitly.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
}

/// Timer bookkeeping plus the alert fire markers that `reset` clears
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub status: TimerStatus,
    /// Clock reading at the last `start`, while running
    pub start_ms: Option<u64>,
    /// Time accumulated by earlier running windows
    pub carry_ms: u64,
    pub last_soft_fire_at_sec: Option<u64>,
    pub last_hard_fire_at_sec: Option<u64>,
}

/// Pause/resume stopwatch for sitting duration
pub struct SitTimer {
    state: TimerState,
    clock: Box<dyn Clock>,
}

impl Default for SitTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SitTimer {
    /// Create a stopped timer on the system clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            state: TimerState::default(),
            clock,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.status == TimerStatus::Running
    }

    /// Start counting. No-op while already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.state.start_ms = Some(self.clock.now_ms());
        self.state.status = TimerStatus::Running;
        log::debug!("sit timer started at {}s", self.elapsed_seconds());
    }

    /// Pause counting, keeping the time accumulated so far. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Some(start) = self.state.start_ms.take() {
            let delta = self.clock.now_ms().saturating_sub(start);
            self.state.carry_ms = self.state.carry_ms.saturating_add(delta);
        }
        self.state.status = TimerStatus::Stopped;
        log::debug!("sit timer stopped at {}s", self.elapsed_seconds());
    }

    /// Stop, zero the accumulated time, and clear both fire markers
    pub fn reset(&mut self) {
        self.state = TimerState::default();
        log::debug!("sit timer reset");
    }

    /// Whole seconds of sitting time
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_ms() / 1000
    }

    pub fn elapsed_ms(&self) -> u64 {
        match (self.state.status, self.state.start_ms) {
            (TimerStatus::Running, Some(start)) => self
                .clock
                .now_ms()
                .saturating_sub(start)
                .saturating_add(self.state.carry_ms),
            _ => self.state.carry_ms,
        }
    }
}

/// Format seconds as `HH:MM:SS`
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Compact minute label for a threshold, e.g. `45m` or `1h30m`
pub fn format_threshold(seconds: u64) -> String {
    let minutes = (seconds + 30) / 60;
    if minutes >= 60 {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manual_timer() -> (SitTimer, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        (SitTimer::with_clock(Box::new(clock.clone())), clock)
    }

    #[test]
    fn test_starts_stopped_at_zero() {
        let (timer, clock) = manual_timer();
        clock.advance_secs(100);
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_seconds(), 0);
    }

    #[test]
    fn test_running_elapsed_floors() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance_ms(2_999);
        assert_eq!(timer.elapsed_seconds(), 2);
        clock.advance_ms(1);
        assert_eq!(timer.elapsed_seconds(), 3);
    }

    #[test]
    fn test_pause_resume_accumulates() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance_ms(1_500);
        timer.stop();
        assert_eq!(timer.state().carry_ms, 1_500);

        // Time while stopped does not count
        clock.advance_secs(3600);
        assert_eq!(timer.elapsed_seconds(), 1);

        timer.start();
        clock.advance_ms(600);
        assert_eq!(timer.elapsed_seconds(), 2);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance_secs(10);
        timer.start();
        assert_eq!(timer.elapsed_seconds(), 10);

        timer.stop();
        clock.advance_secs(10);
        timer.stop();
        assert_eq!(timer.elapsed_seconds(), 10);
        assert_eq!(timer.state().carry_ms, 10_000);
    }

    #[test]
    fn test_monotonic_across_start_stop() {
        let (mut timer, clock) = manual_timer();
        let mut last = 0;
        for step in 0..20u64 {
            if step % 3 == 0 {
                timer.start();
            } else if step % 5 == 0 {
                timer.stop();
            }
            clock.advance_ms(700 + step * 37);
            let now = timer.elapsed_seconds();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut timer, clock) = manual_timer();
        timer.start();
        clock.advance_secs(50);
        timer.state_mut().last_soft_fire_at_sec = Some(40);
        timer.state_mut().last_hard_fire_at_sec = Some(45);

        timer.reset();
        assert_eq!(timer.state(), &TimerState::default());
        assert_eq!(timer.elapsed_seconds(), 0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(3661), "01:01:01");
        assert_eq!(format_clock(100 * 3600), "100:00:00");
    }

    #[test]
    fn test_format_threshold() {
        assert_eq!(format_threshold(30 * 60), "30m");
        assert_eq!(format_threshold(60 * 60), "1h00m");
        assert_eq!(format_threshold(90 * 60), "1h30m");
        assert_eq!(format_threshold(89), "1m");
    }
}
