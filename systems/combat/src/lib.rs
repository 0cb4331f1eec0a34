#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Combat rules and the resolver that turns collisions into damage commands.
//!
//! The rule functions are pure and operate on borrowed entity state so the
//! authoritative world can apply them while executing commands. The
//! [`CombatResolver`] consumes confirmed collision pairs and defeat events and
//! responds with command batches, mirroring every other system.

use std::{collections::BTreeSet, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spellfall_core::{
    AiState, BlockReason, BossKind, CollisionPair, Command, Contact, DamageSource, EntityId,
    EntityKind, EntityView, Event, Health, ProjectileKind, TrollPhase,
};
use tracing::debug;

/// Floating weapon strikes required to defeat a floating troll.
pub const FLOATING_STRIKES_TO_DEFEAT: u8 = 3;

/// A lumbering troll takes generic damage divided by this factor.
pub const TROLL_DAMPENING_DIVISOR: f32 = 10.0;

const POST_HIT_WINDOW: Duration = Duration::from_millis(1_500);
const DRAIN_WINDOW: Duration = Duration::from_secs(2);

/// Result of applying damage to a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageOutcome {
    /// The target crossed its death threshold.
    Defeated,
    /// The target took the hit and is still alive.
    Survived,
    /// The target is immune to the source; nothing changed.
    Rejected,
}

/// Mutable view of the entity state touched by damage rules.
#[derive(Debug)]
pub struct Target<'a> {
    /// Kind tag of the target.
    pub kind: EntityKind,
    /// Health mutated by the hit.
    pub health: &'a mut Health,
    /// Behavior state, mutated when a floating troll is struck.
    pub ai: Option<&'a mut AiState>,
}

/// Applies damage from `source` to the target and reports the outcome.
///
/// Dementors only yield to the Patronus. Lumbering trolls take a tenth of
/// generic damage, rounded up and never less than one, and ignore the
/// floating weapon. Floating trolls ignore everything but the floating weapon
/// and fall on its [`FLOATING_STRIKES_TO_DEFEAT`]th strike.
pub fn apply_damage(target: Target<'_>, amount: f32, source: DamageSource) -> DamageOutcome {
    if target.health.is_invulnerable() || target.health.is_depleted() {
        return DamageOutcome::Rejected;
    }

    match target.kind {
        EntityKind::Boss(BossKind::Dementor) => {
            if source != DamageSource::Patronus {
                return DamageOutcome::Rejected;
            }
            target.health.damage(amount);
        }
        EntityKind::Boss(BossKind::Troll) => {
            let Some(ai) = target.ai else {
                return DamageOutcome::Rejected;
            };
            match ai {
                AiState::Troll {
                    phase: TrollPhase::Floating { hits },
                } => {
                    if source != DamageSource::FloatingWeapon {
                        return DamageOutcome::Rejected;
                    }
                    *hits = hits.saturating_add(1);
                    if *hits >= FLOATING_STRIKES_TO_DEFEAT {
                        let remaining = target.health.current();
                        target.health.damage(remaining);
                    }
                }
                AiState::Troll {
                    phase: TrollPhase::Lumbering,
                } => {
                    if source == DamageSource::FloatingWeapon {
                        return DamageOutcome::Rejected;
                    }
                    target.health.damage(dampened_troll_damage(amount));
                }
                _ => return DamageOutcome::Rejected,
            }
        }
        EntityKind::Enemy | EntityKind::Boss(_) => target.health.damage(amount),
        _ => return DamageOutcome::Rejected,
    }

    if target.health.is_depleted() {
        DamageOutcome::Defeated
    } else {
        DamageOutcome::Survived
    }
}

/// Damage a lumbering troll takes from a generic hit of `amount`.
#[must_use]
pub fn dampened_troll_damage(amount: f32) -> f32 {
    (amount / TROLL_DAMPENING_DIVISOR).ceil().max(1.0)
}

/// Decides whether an incoming hit on the player is absorbed.
///
/// Ron mode wins over the post-hit window so collaborators can tell the two
/// kinds of immunity apart.
#[must_use]
pub const fn screen_player_hit(mode_active: bool, post_hit_running: bool) -> Option<BlockReason> {
    if mode_active {
        Some(BlockReason::Mode)
    } else if post_hit_running {
        Some(BlockReason::PostHit)
    } else {
        None
    }
}

/// Invulnerability window granted after the player takes a hit.
#[must_use]
pub const fn post_hit_window(source: DamageSource) -> Duration {
    match source {
        DamageSource::DementorDrain => DRAIN_WINDOW,
        _ => POST_HIT_WINDOW,
    }
}

/// Points awarded for defeating an entity of `kind` with `source`.
#[must_use]
pub const fn score_for(kind: EntityKind, source: DamageSource) -> u64 {
    match (kind, source) {
        (EntityKind::Enemy, DamageSource::Patronus) => 150,
        (EntityKind::Enemy, _) => 100,
        (EntityKind::Boss(BossKind::Lucius), _) => 600,
        (EntityKind::Boss(BossKind::Bellatrix), _) => 1_000,
        (EntityKind::Boss(BossKind::Troll), DamageSource::FloatingWeapon) => 1_200,
        (EntityKind::Boss(BossKind::Troll), _) => 800,
        (EntityKind::Boss(BossKind::Dementor), _) => 500,
        _ => 0,
    }
}

/// Configuration parameters required to construct the combat resolver.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    ultimate_chance: f64,
}

impl Config {
    /// Creates a configuration with the default 10% ultimate charge chance.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            ultimate_chance: 0.1,
        }
    }

    /// Overrides the probability that a kill grants an ultimate charge.
    #[must_use]
    pub const fn with_ultimate_chance(mut self, chance: f64) -> Self {
        self.ultimate_chance = chance;
        self
    }
}

const BOLT_DAMAGE: f32 = 1.0;
const PATRONUS_DAMAGE: f32 = 1.0;
const ORB_DAMAGE: f32 = 5.0;
const CONTACT_DAMAGE: f32 = 0.5;

/// Pure system converting collisions and defeats into world commands.
#[derive(Debug)]
pub struct CombatResolver {
    rng: ChaCha8Rng,
    ultimate_chance: f64,
    spent: BTreeSet<EntityId>,
}

impl CombatResolver {
    /// Creates a resolver using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            ultimate_chance: config.ultimate_chance.clamp(0.0, 1.0),
            spent: BTreeSet::new(),
        }
    }

    /// Emits damage, consumption and pickup commands for confirmed collisions.
    ///
    /// Every projectile lands at most once and the player takes at most one
    /// hit per tick, no matter how many pairs overlap.
    pub fn resolve_collisions(
        &mut self,
        pairs: &[CollisionPair],
        view: &EntityView,
        out: &mut Vec<Command>,
    ) {
        self.spent.clear();
        let mut player_hit = false;

        for pair in pairs {
            match pair.contact {
                Contact::Projectile => {
                    if !self.spent.insert(pair.first) {
                        continue;
                    }
                    let Some(EntityKind::Projectile(kind)) =
                        view.get(pair.first).map(|snapshot| snapshot.kind)
                    else {
                        debug!(projectile = pair.first.get(), "projectile_missing");
                        continue;
                    };
                    out.push(Command::ApplyDamage {
                        target: pair.second,
                        amount: projectile_damage(kind),
                        source: kind.source(),
                    });
                    out.push(Command::ConsumeProjectile {
                        projectile: pair.first,
                    });
                }
                Contact::Curse => {
                    if player_hit || !self.spent.insert(pair.first) {
                        continue;
                    }
                    let Some(EntityKind::Projectile(ProjectileKind::Curse(curse))) =
                        view.get(pair.first).map(|snapshot| snapshot.kind)
                    else {
                        continue;
                    };
                    player_hit = true;
                    out.push(Command::DamagePlayer {
                        amount: curse.damage(),
                        source: DamageSource::Curse,
                    });
                    out.push(Command::ConsumeProjectile {
                        projectile: pair.first,
                    });
                }
                Contact::Body => {
                    if player_hit {
                        continue;
                    }
                    let Some(enemy) = view.get(pair.second) else {
                        continue;
                    };
                    if enemy.kind == EntityKind::Boss(BossKind::Dementor) || enemy.stunned {
                        continue;
                    }
                    player_hit = true;
                    out.push(Command::DamagePlayer {
                        amount: CONTACT_DAMAGE,
                        source: DamageSource::Contact,
                    });
                }
                Contact::Pickup => {
                    if self.spent.insert(pair.second) {
                        out.push(Command::CollectPickup {
                            pickup: pair.second,
                        });
                    }
                }
            }
        }
    }

    /// Emits score and ultimate charge commands for every defeat in `events`.
    pub fn resolve_outcomes(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            if let Event::EnemyDefeated { kind, source, .. } = event {
                let points = score_for(*kind, *source);
                if points > 0 {
                    out.push(Command::AwardScore { points });
                }
                if self.rng.gen_bool(self.ultimate_chance) {
                    out.push(Command::GrantUltimateCharge);
                }
            }
        }
    }
}

fn projectile_damage(kind: ProjectileKind) -> f32 {
    match kind {
        ProjectileKind::Bolt => BOLT_DAMAGE,
        ProjectileKind::Patronus { .. } => PATRONUS_DAMAGE,
        ProjectileKind::UltimateOrb => ORB_DAMAGE,
        ProjectileKind::Curse(curse) => curse.damage(),
    }
}
