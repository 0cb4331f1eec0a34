#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behavior system advancing enemy, boss and helper state machines.
//!
//! The system reads an [`EntityView`] captured at the start of the behavior
//! phase and answers with movement, attack and state commands. Stunned and
//! dying entities are skipped entirely.

use std::time::Duration;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spellfall_core::{
    AiState, Arena, BossKind, Command, CurseKind, DamageSource, DementorPhase, Difficulty,
    EffectKind, EntityKind, EntitySnapshot, EntityView, Event, MovementPattern, ProjectileKind,
    TrollPhase,
};
use tracing::debug;

const FRAME_RATE: f32 = 60.0;

const PING_PONG_PERIOD: Duration = Duration::from_secs(3);
const ZIG_ZAG_FREQUENCY: f32 = 2.0;

const MINOR_CURSE_SPEED: f32 = 200.0;
const MINOR_CURSE_SPREAD: f32 = 50.0;
const ATTACK_COOLDOWN_MIN: Duration = Duration::from_millis(2_500);
const ATTACK_COOLDOWN_MAX: Duration = Duration::from_millis(4_500);
const ATTACK_BOTTOM_MARGIN: f32 = 50.0;

const BOSS_ATTACK_MIN_Y: f32 = 100.0;
const LUCIUS_ENTRY_Y: f32 = 120.0;
const LUCIUS_PATROL_SPEED: f32 = 80.0;
const LUCIUS_PATROL_MARGIN: f32 = 50.0;
const LUCIUS_ATTACK_CHANCE: f32 = 0.02;
const LUCIUS_CURSE_SPEED: f32 = 200.0;
const BELLATRIX_ENTRY_Y: f32 = 150.0;
const BELLATRIX_ATTACK_CHANCE: f32 = 0.015;
const BELLATRIX_CURSE_SPEED: f32 = 220.0;
const BELLATRIX_LEAD: f32 = 0.3;
const CURSE_MUZZLE_OFFSET: f32 = 30.0;

const DEMENTOR_APPROACH_SPEED: f32 = 150.0;
const DEMENTOR_DRAIN_RANGE: f32 = 100.0;
const DEMENTOR_DRAIN_DAMAGE: f32 = 1.0;
const DEMENTOR_RETREAT_SPEED: f32 = 100.0;
const DEMENTOR_RETREAT_TIME: Duration = Duration::from_millis(1_500);
const DEMENTOR_HOLD_TIME: Duration = Duration::from_millis(1_500);

const PATRONUS_SPEED: f32 = 400.0;
const WEAPON_SPEED: f32 = 100.0;
const WEAPON_OFFSET: Vec2 = Vec2::new(60.0, -30.0);

/// Configuration parameters required to construct the behavior system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    arena: Arena,
    rng_seed: u64,
    shake_radius: Option<f32>,
}

impl Config {
    /// Creates a new configuration for the provided arena and seed.
    #[must_use]
    pub const fn new(arena: Arena, rng_seed: u64) -> Self {
        Self {
            arena,
            rng_seed,
            shake_radius: None,
        }
    }

    /// Limits troll shakes to players closer than `radius`.
    ///
    /// Without a radius the shake reaches the whole playfield.
    #[must_use]
    pub fn with_shake_radius(mut self, radius: Option<f32>) -> Self {
        self.shake_radius = radius;
        self
    }
}

/// Pure system that advances every behavior state machine.
#[derive(Debug)]
pub struct Behavior {
    config: Config,
    rng: ChaCha8Rng,
}

impl Behavior {
    /// Creates a new behavior system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes the tick's events and the entity view to emit commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        view: &EntityView,
        difficulty: &Difficulty,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }

        if dt.is_zero() {
            return;
        }

        self.advance(dt, view, difficulty, out);
    }

    /// Advances every live entity by `dt`.
    pub fn advance(
        &mut self,
        dt: Duration,
        view: &EntityView,
        difficulty: &Difficulty,
        out: &mut Vec<Command>,
    ) {
        let player = view.player().filter(|player| !player.dying);
        for snapshot in view.iter() {
            if snapshot.dying || snapshot.stunned {
                continue;
            }
            match (snapshot.kind, snapshot.ai) {
                (EntityKind::Enemy, Some(AiState::Pattern { .. })) => {
                    self.advance_pattern(snapshot, player, dt, out);
                }
                (EntityKind::Boss(BossKind::Lucius), Some(AiState::Patrol { entered, heading })) => {
                    self.advance_lucius(snapshot, entered, heading, dt, out);
                }
                (EntityKind::Boss(BossKind::Bellatrix), Some(AiState::Sentinel { entered })) => {
                    self.advance_bellatrix(snapshot, entered, player, dt, out);
                }
                (EntityKind::Boss(BossKind::Troll), Some(AiState::Troll { phase })) => {
                    self.advance_troll(snapshot, phase, player, out);
                }
                (EntityKind::Boss(BossKind::Dementor), Some(AiState::Dementor { phase, in_phase })) => {
                    advance_dementor(snapshot, phase, in_phase, player, difficulty, dt, out);
                }
                (
                    EntityKind::Projectile(ProjectileKind::Patronus {
                        target: Some(target),
                    }),
                    _,
                ) => {
                    if let Some(dementor) = view.get(target).filter(|target| !target.dying) {
                        let velocity = (dementor.position - snapshot.position).normalize_or_zero()
                            * PATRONUS_SPEED;
                        if velocity != Vec2::ZERO {
                            out.push(Command::SetVelocity {
                                entity: snapshot.id,
                                velocity,
                            });
                        }
                    }
                }
                (EntityKind::Effect(EffectKind::FloatingWeapon { troll }), _) => {
                    advance_weapon(snapshot, view.get(troll), dt, out);
                }
                _ => {}
            }
        }
    }

    fn advance_pattern(
        &mut self,
        snapshot: &EntitySnapshot,
        player: Option<&EntitySnapshot>,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let Some(AiState::Pattern {
            pattern,
            speed,
            clock,
            heading,
        }) = snapshot.ai
        else {
            return;
        };
        let clock = clock.saturating_add(dt);
        let (velocity, heading) = pattern_velocity(pattern, speed, clock, dt, heading, snapshot, player);
        out.push(Command::UpdateAi {
            entity: snapshot.id,
            ai: AiState::Pattern {
                pattern,
                speed,
                clock,
                heading,
            },
            velocity,
        });

        let y = snapshot.position.y;
        let in_band = y > 0.0 && y < self.config.arena.height - ATTACK_BOTTOM_MARGIN;
        if snapshot.action_ready && in_band {
            let spread = self.rng.gen_range(-MINOR_CURSE_SPREAD..=MINOR_CURSE_SPREAD);
            let cooldown = self.rng.gen_range(ATTACK_COOLDOWN_MIN..=ATTACK_COOLDOWN_MAX);
            out.push(Command::FireCurse {
                caster: snapshot.id,
                kind: CurseKind::Minor,
                velocity: Vec2::new(spread, MINOR_CURSE_SPEED),
                cooldown: Some(cooldown),
            });
        }
    }

    fn advance_lucius(
        &mut self,
        snapshot: &EntitySnapshot,
        entered: bool,
        heading: f32,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let (entered, heading, velocity) = if !entered && snapshot.position.y < LUCIUS_ENTRY_Y {
            (false, heading, Vec2::new(0.0, BossKind::Lucius.descent_speed()))
        } else {
            let x = snapshot.position.x;
            let heading = if x <= LUCIUS_PATROL_MARGIN {
                1.0
            } else if x >= self.config.arena.width - LUCIUS_PATROL_MARGIN {
                -1.0
            } else {
                heading
            };
            (true, heading, Vec2::new(heading * LUCIUS_PATROL_SPEED, 0.0))
        };
        out.push(Command::UpdateAi {
            entity: snapshot.id,
            ai: AiState::Patrol { entered, heading },
            velocity,
        });

        if self.boss_attacks(snapshot, LUCIUS_ATTACK_CHANCE, dt) {
            out.push(Command::FireCurse {
                caster: snapshot.id,
                kind: CurseKind::Emerald,
                velocity: Vec2::new(0.0, LUCIUS_CURSE_SPEED),
                cooldown: None,
            });
        }
    }

    fn advance_bellatrix(
        &mut self,
        snapshot: &EntitySnapshot,
        entered: bool,
        player: Option<&EntitySnapshot>,
        dt: Duration,
        out: &mut Vec<Command>,
    ) {
        let entered = entered || snapshot.position.y >= BELLATRIX_ENTRY_Y;
        let velocity = if entered {
            Vec2::ZERO
        } else {
            Vec2::new(0.0, BossKind::Bellatrix.descent_speed())
        };
        out.push(Command::UpdateAi {
            entity: snapshot.id,
            ai: AiState::Sentinel { entered },
            velocity,
        });

        if self.boss_attacks(snapshot, BELLATRIX_ATTACK_CHANCE, dt) {
            let muzzle = snapshot.position + Vec2::new(0.0, CURSE_MUZZLE_OFFSET);
            let aim = player
                .map(|player| player.position + player.velocity * BELLATRIX_LEAD - muzzle)
                .map(Vec2::normalize_or_zero)
                .filter(|direction| *direction != Vec2::ZERO)
                .unwrap_or(Vec2::Y);
            out.push(Command::FireCurse {
                caster: snapshot.id,
                kind: CurseKind::Tracking,
                velocity: aim * BELLATRIX_CURSE_SPEED,
                cooldown: None,
            });
        }
    }

    fn advance_troll(
        &mut self,
        snapshot: &EntitySnapshot,
        phase: TrollPhase,
        player: Option<&EntitySnapshot>,
        out: &mut Vec<Command>,
    ) {
        match phase {
            TrollPhase::Floating { .. } => {
                if snapshot.velocity != Vec2::ZERO {
                    out.push(Command::SetVelocity {
                        entity: snapshot.id,
                        velocity: Vec2::ZERO,
                    });
                }
            }
            TrollPhase::Lumbering => {
                let descent = Vec2::new(0.0, BossKind::Troll.descent_speed());
                if snapshot.velocity != descent {
                    out.push(Command::SetVelocity {
                        entity: snapshot.id,
                        velocity: descent,
                    });
                }
                if snapshot.action_ready {
                    let hits_player = player.is_some_and(|player| {
                        self.config.shake_radius.map_or(true, |radius| {
                            player.position.distance(snapshot.position) <= radius
                        })
                    });
                    debug!(troll = snapshot.id.get(), hits_player, "troll_shake");
                    out.push(Command::TrollShake {
                        troll: snapshot.id,
                        hits_player,
                    });
                }
            }
        }
    }

    fn boss_attacks(&mut self, snapshot: &EntitySnapshot, chance: f32, dt: Duration) -> bool {
        if snapshot.stunned || snapshot.position.y <= BOSS_ATTACK_MIN_Y {
            return false;
        }
        let probability = per_tick_chance(chance, dt);
        probability > 0.0 && self.rng.gen::<f32>() < probability
    }
}

/// Scales a per-frame probability at 60 Hz to a tick of length `dt`.
#[must_use]
pub fn per_tick_chance(per_frame: f32, dt: Duration) -> f32 {
    let frames = dt.as_secs_f32() * FRAME_RATE;
    1.0 - (1.0 - per_frame.clamp(0.0, 1.0)).powf(frames)
}

fn pattern_velocity(
    pattern: MovementPattern,
    speed: f32,
    clock: Duration,
    dt: Duration,
    heading: f32,
    snapshot: &EntitySnapshot,
    player: Option<&EntitySnapshot>,
) -> (Vec2, f32) {
    match pattern {
        MovementPattern::Drift => (Vec2::new(0.0, speed), heading),
        MovementPattern::PingPong => {
            let period = PING_PONG_PERIOD.as_nanos();
            let before = clock.saturating_sub(dt).as_nanos() / period;
            let after = clock.as_nanos() / period;
            let heading = if (after - before) % 2 == 1 {
                -heading
            } else {
                heading
            };
            (Vec2::new(heading * speed * 0.5, speed * 0.5), heading)
        }
        MovementPattern::ZigZag => {
            let t = clock.as_secs_f32();
            (
                Vec2::new((t * ZIG_ZAG_FREQUENCY).sin() * speed, speed * 0.3),
                heading,
            )
        }
        MovementPattern::Homing => {
            let Some(player) = player else {
                return (Vec2::new(0.0, speed * 0.4), heading);
            };
            let delta = player.position - snapshot.position;
            let distance = delta.length();
            if distance <= f32::EPSILON {
                return (Vec2::new(0.0, speed * 0.3), heading);
            }
            let direction = delta / distance;
            (
                Vec2::new(
                    direction.x * speed * 0.6,
                    (direction.y * speed * 0.3).max(speed * 0.3),
                ),
                heading,
            )
        }
    }
}

fn advance_dementor(
    snapshot: &EntitySnapshot,
    phase: DementorPhase,
    in_phase: Duration,
    player: Option<&EntitySnapshot>,
    difficulty: &Difficulty,
    dt: Duration,
    out: &mut Vec<Command>,
) {
    let in_phase = in_phase.saturating_add(dt);
    let (phase, in_phase, velocity) = match (phase, player) {
        (DementorPhase::Approaching, None) => (phase, in_phase, Vec2::ZERO),
        (DementorPhase::Approaching, Some(player)) => {
            let delta = player.position - snapshot.position;
            if delta.length() <= DEMENTOR_DRAIN_RANGE {
                debug!(dementor = snapshot.id.get(), "dementor_drain");
                out.push(Command::DamagePlayer {
                    amount: DEMENTOR_DRAIN_DAMAGE,
                    source: DamageSource::DementorDrain,
                });
                (DementorPhase::Retreating, Duration::ZERO, Vec2::ZERO)
            } else {
                let speed = DEMENTOR_APPROACH_SPEED * difficulty.speed_multiplier;
                (phase, in_phase, delta.normalize_or_zero() * speed)
            }
        }
        (DementorPhase::Retreating, _) if in_phase >= DEMENTOR_RETREAT_TIME => {
            (DementorPhase::Holding, Duration::ZERO, Vec2::ZERO)
        }
        (DementorPhase::Retreating, player) => {
            let away = player
                .map(|player| (snapshot.position - player.position).normalize_or_zero())
                .filter(|direction| *direction != Vec2::ZERO)
                .unwrap_or(Vec2::NEG_Y);
            (phase, in_phase, away * DEMENTOR_RETREAT_SPEED)
        }
        (DementorPhase::Holding, _) if in_phase >= DEMENTOR_HOLD_TIME => {
            (DementorPhase::Approaching, Duration::ZERO, Vec2::ZERO)
        }
        (DementorPhase::Holding, _) => (phase, in_phase, Vec2::ZERO),
    };
    out.push(Command::UpdateAi {
        entity: snapshot.id,
        ai: AiState::Dementor { phase, in_phase },
        velocity,
    });
}

fn advance_weapon(
    snapshot: &EntitySnapshot,
    troll: Option<&EntitySnapshot>,
    dt: Duration,
    out: &mut Vec<Command>,
) {
    let Some(troll) = troll.filter(|troll| !troll.dying) else {
        out.push(Command::Despawn {
            entity: snapshot.id,
        });
        return;
    };

    let delta = troll.position + WEAPON_OFFSET - snapshot.position;
    let distance = delta.length();
    let seconds = dt.as_secs_f32();
    let velocity = if distance <= f32::EPSILON || seconds <= 0.0 {
        Vec2::ZERO
    } else {
        delta / distance * WEAPON_SPEED.min(distance / seconds)
    };
    if velocity != snapshot.velocity {
        out.push(Command::SetVelocity {
            entity: snapshot.id,
            velocity,
        });
    }

    if snapshot.action_ready {
        out.push(Command::WeaponStrike {
            weapon: snapshot.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tick_chance_matches_frame_probability_at_sixty_hertz() {
        let chance = per_tick_chance(0.02, Duration::from_nanos(16_666_667));
        assert!((chance - 0.02).abs() < 1e-4);
        assert_eq!(per_tick_chance(0.5, Duration::ZERO), 0.0);
        assert!(per_tick_chance(0.02, Duration::from_secs(1)) > 0.6);
    }

    #[test]
    fn ping_pong_flips_heading_once_per_period() {
        let snapshot_at = |clock: Duration| {
            pattern_velocity(
                MovementPattern::PingPong,
                60.0,
                clock,
                Duration::from_millis(100),
                1.0,
                &dummy(),
                None,
            )
        };
        assert_eq!(snapshot_at(Duration::from_millis(2_900)).1, 1.0);
        let (velocity, heading) = snapshot_at(Duration::from_millis(3_000));
        assert_eq!(heading, -1.0);
        assert_eq!(velocity, Vec2::new(-30.0, 30.0));
    }

    #[test]
    fn ping_pong_counts_every_boundary_inside_a_long_step() {
        let heading_after = |dt: Duration| {
            pattern_velocity(
                MovementPattern::PingPong,
                60.0,
                Duration::from_millis(1_000) + dt,
                dt,
                1.0,
                &dummy(),
                None,
            )
            .1
        };
        assert_eq!(heading_after(Duration::from_secs(3)), -1.0);
        assert_eq!(heading_after(Duration::from_secs(6)), 1.0);
        assert_eq!(heading_after(Duration::from_secs(9)), -1.0);
    }

    #[test]
    fn homing_never_climbs() {
        let mut enemy = dummy();
        enemy.position = Vec2::new(100.0, 500.0);
        let mut player = dummy();
        player.position = Vec2::new(100.0, 100.0);
        let (velocity, _) = pattern_velocity(
            MovementPattern::Homing,
            60.0,
            Duration::ZERO,
            Duration::from_millis(16),
            1.0,
            &enemy,
            Some(&player),
        );
        assert!(velocity.y >= 18.0 - 1e-4);
    }

    fn dummy() -> EntitySnapshot {
        EntitySnapshot {
            id: spellfall_core::EntityId::new(1),
            kind: EntityKind::Enemy,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            half_extents: Vec2::splat(40.0),
            health: spellfall_core::Health::full(1.0),
            ai: None,
            stunned: false,
            in_grace: false,
            action_ready: false,
            collected: false,
            dying: false,
        }
    }
}
