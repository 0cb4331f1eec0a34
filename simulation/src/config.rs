//! Serializable tuning for a simulation session.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use spellfall_core::Arena;
use spellfall_system_behavior as behavior;
use spellfall_system_collision as collision;
use spellfall_system_combat as combat;
use spellfall_system_difficulty as difficulty;
use spellfall_system_physics as physics;
use spellfall_system_spawning as spawning;
use thiserror::Error;

use crate::seed::{derive_labeled_seed, BEHAVIOR_STREAM, COMBAT_STREAM, SPAWNING_STREAM};

/// Reasons a [`SimulationConfig`] is rejected before a session starts.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The arena must have positive, finite dimensions.
    #[error("arena must be positive, got {width}x{height}")]
    InvalidArena {
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
    },
    /// The difficulty table needs at least one spawn interval.
    #[error("difficulty table has no spawn intervals")]
    EmptyTierTable,
    /// Score thresholds must be strictly increasing.
    #[error("difficulty score thresholds must be strictly increasing")]
    UnorderedThresholds,
    /// Every threshold opens exactly one further tier.
    #[error("{thresholds} score thresholds need one more interval, got {intervals}")]
    TierMismatch {
        /// Number of thresholds.
        thresholds: usize,
        /// Number of intervals.
        intervals: usize,
    },
    /// A duration that drives a countdown was zero.
    #[error("`{field}` must be greater than zero")]
    NonPositiveInterval {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The pickup window ends before it starts.
    #[error("pickup window is inverted: {min_ms} ms > {max_ms} ms")]
    InvertedPickupWindow {
        /// Lower bound of the window.
        min_ms: u64,
        /// Upper bound of the window.
        max_ms: u64,
    },
    /// Boss weights must be finite, non-negative and not all zero.
    #[error("boss weights must be non-negative with a positive sum")]
    InvalidBossWeights,
    /// A restitution coefficient left `[0, 1]`.
    #[error("`{field}` must lie within [0, 1], got {value}")]
    InvalidRestitution {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: f32,
    },
    /// A collision threshold was not positive.
    #[error("`{field}` must be positive, got {value}")]
    NonPositiveThreshold {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: f32,
    },
    /// A probability left `[0, 1]`.
    #[error("ultimate charge chance must lie within [0, 1], got {0}")]
    InvalidChance(f64),
}

/// Complete tuning of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed every system generator is derived from.
    pub seed: u64,
    /// Playfield dimensions.
    pub arena: ArenaConfig,
    /// Score and time pacing.
    pub difficulty: DifficultyConfig,
    /// Boss and pickup scheduling.
    pub spawning: SpawningConfig,
    /// Pickup physics.
    pub physics: PhysicsConfig,
    /// Hit distances.
    pub collision: CollisionConfig,
    /// Troll shake reach.
    pub behavior: BehaviorConfig,
    /// Kill rewards.
    pub combat: CombatConfig,
}

/// Playfield dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let arena = Arena::default();
        Self {
            width: arena.width,
            height: arena.height,
        }
    }
}

/// Score thresholds, spawn intervals and enemy speed scaling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Scores that open each tier after the first.
    pub score_thresholds: Vec<u64>,
    /// Regular spawn interval per tier, in milliseconds.
    pub intervals_ms: Vec<u64>,
    /// Lower bound of the regular spawn interval, in milliseconds.
    pub interval_floor_ms: u64,
    /// Play time per time-driven level, in milliseconds.
    pub period_ms: u64,
    /// Enemy speed before any boost.
    pub base_speed: f32,
    /// Speed added per time-driven level.
    pub speed_step: f32,
    /// Largest total speed boost.
    pub speed_cap: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            score_thresholds: vec![1_000, 3_000, 5_000],
            intervals_ms: vec![5_000, 4_000, 3_000, 2_000],
            interval_floor_ms: 2_000,
            period_ms: 30_000,
            base_speed: 60.0,
            speed_step: 8.0,
            speed_cap: 40.0,
        }
    }
}

/// Boss schedule and pickup window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Initial interval between spawns of each boss kind, in milliseconds.
    pub boss_interval_ms: u64,
    /// Shortest boss interval, in milliseconds.
    pub boss_interval_floor_ms: u64,
    /// Amount removed from every boss interval per boss defeat.
    pub boss_interval_step_ms: u64,
    /// Relative weight of lucius, bellatrix, troll and dementor.
    pub boss_weights: [f32; 4],
    /// Shortest pickup interval, in milliseconds.
    pub pickup_interval_min_ms: u64,
    /// Longest pickup interval, in milliseconds.
    pub pickup_interval_max_ms: u64,
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            boss_interval_ms: 45_000,
            boss_interval_floor_ms: 30_000,
            boss_interval_step_ms: 5_000,
            boss_weights: [1.0; 4],
            pickup_interval_min_ms: 15_000,
            pickup_interval_max_ms: 30_000,
        }
    }
}

/// Gravity and bounce response of pickups.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration in pixels per second squared.
    pub gravity: f32,
    /// Restitution of bounces off enemies.
    pub restitution: f32,
    /// Restitution of player contact impulses.
    pub contact_restitution: f32,
    /// Multiplier applied to player contact impulses.
    pub bounce_multiplier: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 100.0,
            restitution: 0.6,
            contact_restitution: 0.8,
            bounce_multiplier: 1.5,
        }
    }
}

/// Center distance thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Threshold for ordinary pairs.
    pub default_threshold: f32,
    /// Threshold for anything touching a troll.
    pub troll_threshold: f32,
    /// Threshold for ultimate orbs.
    pub orb_threshold: f32,
    /// Threshold for pickups.
    pub pickup_threshold: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            default_threshold: 50.0,
            troll_threshold: 70.0,
            orb_threshold: 90.0,
            pickup_threshold: 60.0,
        }
    }
}

/// Behavior tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Distance within which a troll shake hurts; unlimited when absent.
    pub shake_radius: Option<f32>,
}

/// Kill rewards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Chance that a kill grants an ultimate charge.
    pub ultimate_chance: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            ultimate_chance: 0.1,
        }
    }
}

impl SimulationConfig {
    /// Checks every section, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ArenaConfig { width, height } = self.arena;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidArena { width, height });
        }

        let tiers = &self.difficulty;
        if tiers.intervals_ms.is_empty() {
            return Err(ConfigError::EmptyTierTable);
        }
        if tiers
            .score_thresholds
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(ConfigError::UnorderedThresholds);
        }
        if tiers.intervals_ms.len() != tiers.score_thresholds.len() + 1 {
            return Err(ConfigError::TierMismatch {
                thresholds: tiers.score_thresholds.len(),
                intervals: tiers.intervals_ms.len(),
            });
        }
        if tiers.intervals_ms.contains(&0) {
            return Err(ConfigError::NonPositiveInterval {
                field: "difficulty.intervals_ms",
            });
        }
        positive("difficulty.interval_floor_ms", tiers.interval_floor_ms)?;
        positive("difficulty.period_ms", tiers.period_ms)?;

        let spawning = &self.spawning;
        positive("spawning.boss_interval_ms", spawning.boss_interval_ms)?;
        positive("spawning.boss_interval_floor_ms", spawning.boss_interval_floor_ms)?;
        positive("spawning.pickup_interval_min_ms", spawning.pickup_interval_min_ms)?;
        if spawning.pickup_interval_min_ms > spawning.pickup_interval_max_ms {
            return Err(ConfigError::InvertedPickupWindow {
                min_ms: spawning.pickup_interval_min_ms,
                max_ms: spawning.pickup_interval_max_ms,
            });
        }
        let weights = spawning.boss_weights;
        if weights
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
            || weights.iter().sum::<f32>() <= 0.0
        {
            return Err(ConfigError::InvalidBossWeights);
        }

        unit_interval("physics.restitution", self.physics.restitution)?;
        unit_interval(
            "physics.contact_restitution",
            self.physics.contact_restitution,
        )?;

        let collision = &self.collision;
        for (field, value) in [
            ("collision.default_threshold", collision.default_threshold),
            ("collision.troll_threshold", collision.troll_threshold),
            ("collision.orb_threshold", collision.orb_threshold),
            ("collision.pickup_threshold", collision.pickup_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveThreshold { field, value });
            }
        }

        let chance = self.combat.ultimate_chance;
        if !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::InvalidChance(chance));
        }

        Ok(())
    }

    /// Playfield described by the configuration.
    #[must_use]
    pub fn arena(&self) -> Arena {
        Arena::new(self.arena.width, self.arena.height)
    }

    pub(crate) fn difficulty_config(&self) -> difficulty::Config {
        let tiers = &self.difficulty;
        difficulty::Config::new(
            tiers.score_thresholds.clone(),
            tiers
                .intervals_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
        .with_interval_floor(Duration::from_millis(tiers.interval_floor_ms))
        .with_period(Duration::from_millis(tiers.period_ms))
        .with_speed(tiers.base_speed, tiers.speed_step, tiers.speed_cap)
    }

    pub(crate) fn spawning_config(&self) -> spawning::Config {
        let schedule = &self.spawning;
        spawning::Config::new(
            self.arena(),
            derive_labeled_seed(self.seed, SPAWNING_STREAM),
        )
        .with_boss_schedule(
            Duration::from_millis(schedule.boss_interval_ms),
            Duration::from_millis(schedule.boss_interval_floor_ms),
            Duration::from_millis(schedule.boss_interval_step_ms),
        )
        .with_boss_weights(schedule.boss_weights)
        .with_pickup_window(
            Duration::from_millis(schedule.pickup_interval_min_ms),
            Duration::from_millis(schedule.pickup_interval_max_ms),
        )
    }

    pub(crate) fn behavior_config(&self) -> behavior::Config {
        behavior::Config::new(self.arena(), derive_labeled_seed(self.seed, BEHAVIOR_STREAM))
            .with_shake_radius(self.behavior.shake_radius)
    }

    pub(crate) fn combat_config(&self) -> combat::Config {
        combat::Config::new(derive_labeled_seed(self.seed, COMBAT_STREAM))
            .with_ultimate_chance(self.combat.ultimate_chance)
    }

    pub(crate) fn physics_config(&self) -> physics::Config {
        physics::Config::new(Vec2::new(0.0, self.physics.gravity))
            .with_restitution(self.physics.restitution)
            .with_contact(
                self.physics.contact_restitution,
                self.physics.bounce_multiplier,
            )
    }

    pub(crate) fn collision_config(&self) -> collision::Config {
        let thresholds = &self.collision;
        collision::Config::new(
            thresholds.default_threshold,
            thresholds.troll_threshold,
            thresholds.orb_threshold,
            thresholds.pickup_threshold,
        )
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::NonPositiveInterval { field })
    } else {
        Ok(())
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRestitution { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "seed": 9, "arena": { "width": 1024.0 } }"#)
                .expect("config parses");
        assert_eq!(config.seed, 9);
        assert_eq!(config.arena.width, 1024.0);
        assert_eq!(config.arena.height, 600.0);
        assert_eq!(config.difficulty, DifficultyConfig::default());
    }

    #[test]
    fn tier_tables_must_line_up() {
        let mut config = SimulationConfig::default();
        config.difficulty.score_thresholds = vec![3_000, 1_000, 5_000];
        assert_eq!(config.validate(), Err(ConfigError::UnorderedThresholds));

        config.difficulty.score_thresholds = vec![1_000];
        assert_eq!(
            config.validate(),
            Err(ConfigError::TierMismatch {
                thresholds: 1,
                intervals: 4,
            })
        );

        config.difficulty.score_thresholds.clear();
        config.difficulty.intervals_ms.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyTierTable));
    }
}
