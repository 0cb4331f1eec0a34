//! Countdown primitives shared by every system that waits on simulated time.
//!
//! Timers never observe wall-clock time. Callers advance a [`TimerSet`] once
//! per tick and branch on [`TimerSet::ready`].

use std::{collections::BTreeMap, time::Duration};

/// Single countdown tracked by a [`TimerSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timer {
    remaining: Duration,
    total: Duration,
}

impl Timer {
    /// Creates a timer that expires after the provided duration.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            total: duration,
        }
    }

    /// Time left before the timer expires.
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Duration the timer was armed with.
    #[must_use]
    pub const fn total(&self) -> Duration {
        self.total
    }

    /// Reports whether the countdown reached zero.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Fraction of the countdown still outstanding, in `[0, 1]`.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.total.is_zero() {
            return 0.0;
        }
        (self.remaining.as_secs_f32() / self.total.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// Keyed collection of countdowns advanced together.
///
/// Keys that were never armed, or whose countdown already expired, are
/// reported as ready. Expired timers are dropped from the set by
/// [`TimerSet::tick`], which makes "first use is free" cooldowns fall out of
/// the representation: a cooldown only exists once it was started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerSet<K: Copy + Ord> {
    timers: BTreeMap<K, Timer>,
}

impl<K: Copy + Ord> Default for TimerSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Ord> TimerSet<K> {
    /// Creates an empty timer set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
        }
    }

    /// Arms or re-arms the timer identified by `key`.
    ///
    /// A zero duration removes the key, leaving it ready.
    pub fn start(&mut self, key: K, duration: Duration) {
        if duration.is_zero() {
            let _ = self.timers.remove(&key);
            return;
        }
        let _ = self.timers.insert(key, Timer::new(duration));
    }

    /// Time left on the timer, or zero when the key is not armed.
    #[must_use]
    pub fn remaining(&self, key: K) -> Duration {
        self.timers
            .get(&key)
            .map_or(Duration::ZERO, Timer::remaining)
    }

    /// Reports whether the timer identified by `key` has no time left.
    #[must_use]
    pub fn ready(&self, key: K) -> bool {
        self.timers.get(&key).map_or(true, Timer::ready)
    }

    /// Reports whether the key currently holds a running countdown.
    #[must_use]
    pub fn is_running(&self, key: K) -> bool {
        !self.ready(key)
    }

    /// Returns the timer registered under `key`, if it is still running.
    #[must_use]
    pub fn timer(&self, key: K) -> Option<Timer> {
        self.timers.get(&key).copied()
    }

    /// Brings the expiry of a running timer closer by `amount`.
    ///
    /// The timer stays registered even when shortened to zero so the next
    /// [`TimerSet::tick`] reports it as expired.
    pub fn shorten(&mut self, key: K, amount: Duration) {
        if let Some(timer) = self.timers.get_mut(&key) {
            timer.remaining = timer.remaining.saturating_sub(amount);
        }
    }

    /// Stops the timer identified by `key` and returns its last state.
    pub fn cancel(&mut self, key: K) -> Option<Timer> {
        self.timers.remove(&key)
    }

    /// Stops every timer whose key does not satisfy the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(K) -> bool) {
        self.timers.retain(|key, _| keep(*key));
    }

    /// Removes every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Number of running timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Reports whether no timer is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Iterates over running timers in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, Timer)> + '_ {
        self.timers.iter().map(|(key, timer)| (*key, *timer))
    }

    /// Decrements every timer by `dt` and returns the keys that expired.
    ///
    /// Expired keys are reported in key order and removed from the set.
    pub fn tick(&mut self, dt: Duration) -> Vec<K> {
        let mut expired = Vec::new();
        for (key, timer) in &mut self.timers {
            timer.remaining = timer.remaining.saturating_sub(dt);
            if timer.remaining.is_zero() {
                expired.push(*key);
            }
        }
        for key in &expired {
            let _ = self.timers.remove(key);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    enum Key {
        Early,
        Late,
    }

    #[test]
    fn unarmed_keys_are_ready() {
        let timers: TimerSet<Key> = TimerSet::new();
        assert!(timers.ready(Key::Early));
        assert_eq!(timers.remaining(Key::Early), Duration::ZERO);
    }

    #[test]
    fn tick_reports_expired_keys_once() {
        let mut timers = TimerSet::new();
        timers.start(Key::Late, Duration::from_millis(300));
        timers.start(Key::Early, Duration::from_millis(100));

        assert!(timers.tick(Duration::from_millis(50)).is_empty());
        assert_eq!(timers.tick(Duration::from_millis(100)), vec![Key::Early]);
        assert_eq!(timers.remaining(Key::Late), Duration::from_millis(150));
        assert_eq!(timers.tick(Duration::from_secs(5)), vec![Key::Late]);
        assert!(timers.tick(Duration::from_secs(5)).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn remaining_never_underflows() {
        let mut timers = TimerSet::new();
        timers.start(Key::Early, Duration::from_millis(10));
        timers.shorten(Key::Early, Duration::from_secs(1));
        assert_eq!(timers.remaining(Key::Early), Duration::ZERO);
        assert_eq!(timers.tick(Duration::ZERO), vec![Key::Early]);
    }

    #[test]
    fn restart_resets_total_for_ratio() {
        let mut timers = TimerSet::new();
        timers.start(Key::Early, Duration::from_secs(4));
        let _ = timers.tick(Duration::from_secs(1));
        let timer = timers.timer(Key::Early).expect("running");
        assert!((timer.ratio() - 0.75).abs() < 1e-6);

        timers.start(Key::Early, Duration::from_secs(2));
        let timer = timers.timer(Key::Early).expect("running");
        assert_eq!(timer.total(), Duration::from_secs(2));
        assert!((timer.ratio() - 1.0).abs() < 1e-6);
    }
}
