//! Threshold alert state machine
//!
//! Observes elapsed sitting time and fires soft/hard alerts, each severity
//! with its own repeat-suppression window. Once elapsed time reaches the hard
//! threshold the soft alert is never evaluated again until the timer resets.

use crate::config::{ThresholdConfig, ThresholdUpdate};
use crate::error::SenseError;
use crate::timer::TimerState;
use crate::types::{AlertEvent, AlertKind};

/// Threshold evaluator.
///
/// Fire markers live in [`TimerState`] so that a timer reset clears them in
/// the same step that zeroes the elapsed time.
#[derive(Debug, Clone, Default)]
pub struct ThresholdAlerts {
    config: ThresholdConfig,
}

impl ThresholdAlerts {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Update thresholds. Fire markers are untouched, so the new values apply
    /// from the next evaluation on.
    pub fn set_thresholds(&mut self, update: &ThresholdUpdate) -> Result<(), SenseError> {
        let result = self.config.apply(update);
        log::debug!("thresholds now {:?}", self.config);
        result
    }

    /// Evaluate one tick at `elapsed` seconds, updating the fire markers.
    ///
    /// At most one alert is returned. The hard range preempts soft evaluation
    /// even when the hard alert is still inside its repeat window.
    pub fn evaluate(&self, elapsed: u64, state: &mut TimerState) -> Option<AlertEvent> {
        if elapsed >= self.config.hard_sec() {
            if due(state.last_hard_fire_at_sec, elapsed, self.config.repeat_hard_sec()) {
                state.last_hard_fire_at_sec = Some(elapsed);
                return Some(AlertEvent {
                    kind: AlertKind::Hard,
                    elapsed,
                });
            }
            return None;
        }

        if elapsed >= self.config.soft_sec()
            && due(state.last_soft_fire_at_sec, elapsed, self.config.repeat_soft_sec())
        {
            state.last_soft_fire_at_sec = Some(elapsed);
            return Some(AlertEvent {
                kind: AlertKind::Soft,
                elapsed,
            });
        }

        None
    }
}

fn due(last_fire: Option<u64>, elapsed: u64, repeat: u64) -> bool {
    match last_fire {
        None => true,
        Some(last) => elapsed.saturating_sub(last) >= repeat,
    }
}

/// Handle returned by [`AlertBus::subscribe`]; pass it back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type AlertListener = Box<dyn FnMut(&AlertEvent)>;

/// Publish/subscribe fan-out for alert events
#[derive(Default)]
pub struct AlertBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, AlertListener)>,
}

impl AlertBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&AlertEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order
    pub fn publish(&mut self, event: &AlertEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn alerts() -> ThresholdAlerts {
        ThresholdAlerts::new(ThresholdConfig::new(1800, 3600, 900, 1800).unwrap())
    }

    /// Evaluate every second in `range`, collecting fired alerts
    fn run(
        alerts: &ThresholdAlerts,
        state: &mut TimerState,
        range: std::ops::RangeInclusive<u64>,
    ) -> Vec<AlertEvent> {
        range.filter_map(|t| alerts.evaluate(t, state)).collect()
    }

    #[test]
    fn test_nothing_before_soft() {
        let mut state = TimerState::default();
        assert!(run(&alerts(), &mut state, 0..=1799).is_empty());
    }

    #[test]
    fn test_soft_then_repeat_then_hard() {
        let mut state = TimerState::default();
        let fired = run(&alerts(), &mut state, 0..=7200);

        let expected = vec![
            AlertEvent { kind: AlertKind::Soft, elapsed: 1800 },
            AlertEvent { kind: AlertKind::Soft, elapsed: 2700 },
            AlertEvent { kind: AlertKind::Hard, elapsed: 3600 },
            AlertEvent { kind: AlertKind::Hard, elapsed: 5400 },
            AlertEvent { kind: AlertKind::Hard, elapsed: 7200 },
        ];
        assert_eq!(fired, expected);
    }

    #[test]
    fn test_hard_preempts_soft_inside_repeat_window() {
        let a = alerts();
        let mut state = TimerState::default();
        assert!(a.evaluate(3600, &mut state).is_some());

        // Soft would be due (never fired) but hard range blocks it
        for t in 3601..5400 {
            assert_eq!(a.evaluate(t, &mut state), None);
        }
        assert_eq!(state.last_soft_fire_at_sec, None);
    }

    #[test]
    fn test_skipped_ticks_fire_once() {
        let a = alerts();
        let mut state = TimerState::default();

        // Host was backgrounded from 0s to 4000s: a single catch-up check
        let fired = a.evaluate(4000, &mut state);
        assert_eq!(fired, Some(AlertEvent { kind: AlertKind::Hard, elapsed: 4000 }));
        assert_eq!(a.evaluate(4000, &mut state), None);
    }

    #[test]
    fn test_lowered_hard_threshold_fires_without_reset() {
        let mut a = alerts();
        let mut state = TimerState::default();
        assert!(a.evaluate(1800, &mut state).is_some());

        a.set_thresholds(&ThresholdUpdate {
            hard: Some(2000),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(a.evaluate(1999, &mut state), None);
        assert_eq!(
            a.evaluate(2000, &mut state),
            Some(AlertEvent { kind: AlertKind::Hard, elapsed: 2000 })
        );
        assert_eq!(state.last_soft_fire_at_sec, Some(1800));
    }

    #[test]
    fn test_repeat_window_respected_after_threshold_change() {
        let mut a = alerts();
        let mut state = TimerState::default();
        a.evaluate(3600, &mut state);

        a.set_thresholds(&ThresholdUpdate {
            hard: Some(3700),
            ..Default::default()
        })
        .unwrap();
        // Last hard fire at 3600, repeat 1800: not due until 5400
        assert_eq!(a.evaluate(3700, &mut state), None);
        assert!(a.evaluate(5400, &mut state).is_some());
    }

    #[test]
    fn test_bus_subscribe_publish_unsubscribe() {
        let mut bus = AlertBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |e| sink.borrow_mut().push(*e));
        let other = bus.subscribe(|_| {});
        assert_eq!(bus.subscriber_count(), 2);

        let event = AlertEvent { kind: AlertKind::Soft, elapsed: 1800 };
        bus.publish(&event);
        assert_eq!(*seen.borrow(), vec![event]);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&event);
        assert_eq!(seen.borrow().len(), 1);
        assert!(bus.unsubscribe(other));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
