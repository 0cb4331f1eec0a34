#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawn director emitting regular enemies, bosses and pickups.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spellfall_core::{
    Arena, BossKind, Command, Difficulty, Event, MovementPattern, PickupKind, SpawnEvent,
};
use tracing::debug;

const SPAWN_MARGIN: f32 = 50.0;
const FIRST_ATTACK_MIN: Duration = Duration::from_secs(1);
const FIRST_ATTACK_MAX: Duration = Duration::from_secs(2);

/// Configuration parameters required to construct the spawn director.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    arena: Arena,
    rng_seed: u64,
    boss_interval: Duration,
    boss_interval_floor: Duration,
    boss_interval_step: Duration,
    boss_weights: [f32; 4],
    pickup_interval_min: Duration,
    pickup_interval_max: Duration,
}

impl Config {
    /// Creates a new configuration for the provided arena and seed.
    #[must_use]
    pub const fn new(arena: Arena, rng_seed: u64) -> Self {
        Self {
            arena,
            rng_seed,
            boss_interval: Duration::from_secs(45),
            boss_interval_floor: Duration::from_secs(30),
            boss_interval_step: Duration::from_secs(5),
            boss_weights: [1.0; 4],
            pickup_interval_min: Duration::from_secs(15),
            pickup_interval_max: Duration::from_secs(30),
        }
    }

    /// Overrides the boss schedule: starting interval, floor and the amount
    /// removed after every boss defeat.
    #[must_use]
    pub fn with_boss_schedule(
        mut self,
        interval: Duration,
        floor: Duration,
        step: Duration,
    ) -> Self {
        self.boss_interval = interval;
        self.boss_interval_floor = floor;
        self.boss_interval_step = step;
        self
    }

    /// Overrides the relative weights of each boss kind, indexed like
    /// [`BossKind::ALL`].
    #[must_use]
    pub fn with_boss_weights(mut self, weights: [f32; 4]) -> Self {
        self.boss_weights = weights;
        self
    }

    /// Overrides the window the pickup interval is drawn from.
    #[must_use]
    pub fn with_pickup_window(mut self, min: Duration, max: Duration) -> Self {
        self.pickup_interval_min = min;
        self.pickup_interval_max = max;
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct BossSlot {
    kind: BossKind,
    elapsed: Duration,
    interval: Duration,
    weight: f32,
}

impl BossSlot {
    fn is_armed(&self) -> bool {
        self.elapsed >= self.interval
    }
}

/// Pure system that decides when and what to spawn.
#[derive(Debug)]
pub struct SpawnDirector {
    config: Config,
    rng: ChaCha8Rng,
    accumulator: Duration,
    bosses: [BossSlot; 4],
    pickup_elapsed: Duration,
    pickup_interval: Duration,
}

impl SpawnDirector {
    /// Creates a new spawn director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut director = Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            accumulator: Duration::ZERO,
            bosses: boss_slots(&config),
            pickup_elapsed: Duration::ZERO,
            pickup_interval: config.pickup_interval_max,
        };
        director.pickup_interval = director.roll_pickup_interval();
        director
    }

    /// Consumes the tick's events and emits spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        difficulty: &Difficulty,
        boss_present: bool,
        out: &mut Vec<Command>,
    ) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        let mut spawns = Vec::new();
        self.tick(accumulated, difficulty, boss_present, &mut spawns);
        out.extend(spawns.into_iter().map(|spawn| Command::Spawn { spawn }));
    }

    /// Advances every schedule by `dt` and pushes the resulting spawns.
    ///
    /// While `boss_present` is set boss counters keep accumulating but no boss
    /// is chosen and no counter resets.
    pub fn tick(
        &mut self,
        dt: Duration,
        difficulty: &Difficulty,
        boss_present: bool,
        out: &mut Vec<SpawnEvent>,
    ) {
        self.accumulator = self.accumulator.saturating_add(dt);
        let spawn_attempts = self.resolve_spawn_attempts(difficulty.regular_interval);
        for _ in 0..spawn_attempts {
            let spawn = self.roll_regular(difficulty);
            out.push(spawn);
        }

        for slot in &mut self.bosses {
            slot.elapsed = slot.elapsed.saturating_add(dt);
        }
        if !boss_present {
            if let Some(index) = self.select_boss() {
                let x = self.roll_x();
                let slot = &mut self.bosses[index];
                slot.elapsed = Duration::ZERO;
                debug!(boss = ?slot.kind, x, "boss_scheduled");
                out.push(SpawnEvent::Boss { kind: slot.kind, x });
            }
        }

        self.pickup_elapsed = self.pickup_elapsed.saturating_add(dt);
        if self.pickup_elapsed >= self.pickup_interval {
            self.pickup_elapsed = Duration::ZERO;
            self.pickup_interval = self.roll_pickup_interval();
            let kind = self.roll_pickup_kind();
            let x = self.roll_x();
            out.push(SpawnEvent::Pickup { kind, x });
        }
    }

    /// Shortens every boss interval after a boss or dementor was defeated.
    pub fn boss_defeated(&mut self) {
        for slot in &mut self.bosses {
            slot.interval = slot
                .interval
                .saturating_sub(self.config.boss_interval_step)
                .max(self.config.boss_interval_floor);
        }
    }

    /// Current interval of the provided boss kind.
    #[must_use]
    pub fn boss_interval(&self, kind: BossKind) -> Duration {
        self.slot(kind).map_or(Duration::ZERO, |slot| slot.interval)
    }

    /// Time accumulated towards the next spawn of the provided boss kind.
    #[must_use]
    pub fn boss_elapsed(&self, kind: BossKind) -> Duration {
        self.slot(kind).map_or(Duration::ZERO, |slot| slot.elapsed)
    }

    /// Interval the next pickup waits for.
    #[must_use]
    pub fn pickup_interval(&self) -> Duration {
        self.pickup_interval
    }

    fn slot(&self, kind: BossKind) -> Option<&BossSlot> {
        self.bosses.iter().find(|slot| slot.kind == kind)
    }

    fn resolve_spawn_attempts(&mut self, interval: Duration) -> usize {
        if interval.is_zero() {
            return 0;
        }

        let mut attempts = 0;
        while self.accumulator >= interval {
            self.accumulator -= interval;
            attempts += 1;
        }
        attempts
    }

    fn select_boss(&mut self) -> Option<usize> {
        let armed: Vec<usize> = self
            .bosses
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_armed())
            .map(|(index, _)| index)
            .collect();
        let first = *armed.first()?;

        let total: f32 = armed
            .iter()
            .map(|index| self.bosses[*index].weight.max(0.0))
            .sum();
        if total <= 0.0 {
            return Some(first);
        }

        let mut roll = self.rng.gen_range(0.0..total);
        for index in &armed {
            let weight = self.bosses[*index].weight.max(0.0);
            if roll < weight {
                return Some(*index);
            }
            roll -= weight;
        }
        armed.last().copied()
    }

    fn roll_regular(&mut self, difficulty: &Difficulty) -> SpawnEvent {
        let x = self.roll_x();
        let pattern = MovementPattern::ALL[self.rng.gen_range(0..MovementPattern::ALL.len())];
        let first_attack = self.rng.gen_range(FIRST_ATTACK_MIN..=FIRST_ATTACK_MAX);
        debug!(x, ?pattern, speed = difficulty.enemy_speed, "regular_scheduled");
        SpawnEvent::Regular {
            x,
            pattern,
            speed: difficulty.enemy_speed,
            first_attack,
        }
    }

    fn roll_x(&mut self) -> f32 {
        let width = self.config.arena.width;
        if width <= SPAWN_MARGIN * 2.0 {
            return width * 0.5;
        }
        self.rng.gen_range(SPAWN_MARGIN..=width - SPAWN_MARGIN)
    }

    fn roll_pickup_interval(&mut self) -> Duration {
        let min = self.config.pickup_interval_min;
        let max = self.config.pickup_interval_max;
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn roll_pickup_kind(&mut self) -> PickupKind {
        let roll: f32 = self.rng.gen();
        if roll < 0.5 {
            PickupKind::ChocolateFrog
        } else if roll < 0.8 {
            PickupKind::Butterbeer
        } else {
            PickupKind::Chicken
        }
    }
}

fn boss_slots(config: &Config) -> [BossSlot; 4] {
    let mut index = 0;
    BossKind::ALL.map(|kind| {
        let weight = config.boss_weights[index];
        index += 1;
        BossSlot {
            kind,
            elapsed: Duration::ZERO,
            interval: config.boss_interval,
            weight,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spawn_attempts_without_interval() {
        let mut director = SpawnDirector::new(Config::new(Arena::default(), 1));
        director.accumulator = Duration::from_secs(10);
        assert_eq!(director.resolve_spawn_attempts(Duration::ZERO), 0);
    }

    #[test]
    fn boss_intervals_shrink_down_to_the_floor() {
        let mut director = SpawnDirector::new(Config::new(Arena::default(), 1));
        for _ in 0..5 {
            director.boss_defeated();
        }
        for kind in BossKind::ALL {
            assert_eq!(director.boss_interval(kind), Duration::from_secs(30));
        }
    }

    #[test]
    fn pickup_interval_stays_inside_its_window() {
        let mut director = SpawnDirector::new(Config::new(Arena::default(), 9));
        for _ in 0..32 {
            let interval = director.roll_pickup_interval();
            assert!(interval >= Duration::from_secs(15));
            assert!(interval <= Duration::from_secs(30));
        }
    }
}
