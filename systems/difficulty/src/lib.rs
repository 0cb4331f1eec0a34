#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty controller deriving spawn pacing from play time and score.
//!
//! The tier is the higher of the score tier (number of thresholds reached)
//! and the time tier (one step per elapsed period). Enemy speed grows with the
//! time level independently of the tier.

use std::time::Duration;

use spellfall_core::{Difficulty, Event};
use tracing::info;

/// Configuration parameters required to construct the difficulty controller.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    score_thresholds: Vec<u64>,
    intervals: Vec<Duration>,
    interval_floor: Duration,
    period: Duration,
    base_speed: f32,
    speed_step: f32,
    speed_cap: f32,
}

impl Config {
    /// Creates a configuration from a tier table.
    ///
    /// `intervals[tier]` is the regular spawn interval of each tier; tier `n`
    /// is reached by score once `score_thresholds[n - 1]` points are banked.
    #[must_use]
    pub fn new(score_thresholds: Vec<u64>, intervals: Vec<Duration>) -> Self {
        Self {
            score_thresholds,
            intervals,
            ..Self::default()
        }
    }

    /// Overrides the shortest interval any tier may use.
    #[must_use]
    pub fn with_interval_floor(mut self, floor: Duration) -> Self {
        self.interval_floor = floor;
        self
    }

    /// Overrides the play time needed to climb one time tier.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Overrides the enemy speed curve: `base + min(cap, step * level)`.
    #[must_use]
    pub fn with_speed(mut self, base: f32, step: f32, cap: f32) -> Self {
        self.base_speed = base;
        self.speed_step = step;
        self.speed_cap = cap;
        self
    }

    /// Score thresholds separating the tiers.
    #[must_use]
    pub fn score_thresholds(&self) -> &[u64] {
        &self.score_thresholds
    }

    /// Regular spawn interval of every tier.
    #[must_use]
    pub fn intervals(&self) -> &[Duration] {
        &self.intervals
    }

    /// Play time needed to climb one time tier.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            score_thresholds: vec![1_000, 3_000, 5_000],
            intervals: vec![
                Duration::from_secs(5),
                Duration::from_secs(4),
                Duration::from_secs(3),
                Duration::from_secs(2),
            ],
            interval_floor: Duration::from_secs(2),
            period: Duration::from_secs(30),
            base_speed: 60.0,
            speed_step: 8.0,
            speed_cap: 40.0,
        }
    }
}

/// Pure controller translating elapsed time and score into [`Difficulty`].
#[derive(Debug)]
pub struct DifficultyController {
    config: Config,
    current: Option<Difficulty>,
}

impl DifficultyController {
    /// Creates a new controller using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Computes the difficulty for the provided progress without side effects.
    #[must_use]
    pub fn evaluate(&self, elapsed: Duration, score: u64) -> Difficulty {
        let score_tier = self
            .config
            .score_thresholds
            .iter()
            .take_while(|threshold| score >= **threshold)
            .count();
        let level = self.time_level(elapsed);
        let last_tier = self.config.intervals.len().saturating_sub(1);
        let tier = score_tier.max(level).min(last_tier);

        let regular_interval = self
            .config
            .intervals
            .get(tier)
            .copied()
            .unwrap_or(self.config.interval_floor)
            .max(self.config.interval_floor);

        let boost = (self.config.speed_step * (level as f32 + 1.0)).min(self.config.speed_cap);
        let enemy_speed = self.config.base_speed + boost;
        let speed_multiplier = if self.config.base_speed > 0.0 {
            enemy_speed / self.config.base_speed
        } else {
            1.0
        };

        Difficulty {
            tier,
            regular_interval,
            enemy_speed,
            speed_multiplier,
        }
    }

    /// Re-evaluates the difficulty, emitting [`Event::DifficultyChanged`] when
    /// the tier moved since the previous update.
    pub fn update(
        &mut self,
        elapsed: Duration,
        score: u64,
        out_events: &mut Vec<Event>,
    ) -> Difficulty {
        let next = self.evaluate(elapsed, score);
        let changed = self
            .current
            .map_or(next.tier != 0, |current| current.tier != next.tier);
        if changed {
            info!(
                tier = next.tier,
                interval_ms = next.regular_interval.as_millis() as u64,
                "difficulty_changed"
            );
            out_events.push(Event::DifficultyChanged {
                tier: next.tier,
                regular_interval: next.regular_interval,
            });
        }
        self.current = Some(next);
        next
    }

    /// Difficulty produced by the most recent update.
    #[must_use]
    pub fn current(&self) -> Difficulty {
        self.current.unwrap_or_default()
    }

    fn time_level(&self, elapsed: Duration) -> usize {
        if self.config.period.is_zero() {
            return 0;
        }
        (elapsed.as_nanos() / self.config.period.as_nanos()) as usize
    }
}
