#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Spellfall.
//!
//! The world owns every live entity, the central [`TimerSet`] and the session
//! counters (score, mana, ultimate charges). It is mutated exclusively through
//! [`apply`] and observed through the [`query`] module.

mod actions;
mod entities;

use std::time::Duration;

use glam::Vec2;
use spellfall_core::{
    Ability, AbilityCooldown, AiState, Arena, BossKind, Character, Command, DamageSource,
    CurseKind, DementorPhase, EffectKind, EntityId, EntityKind, Event, GameState, Health,
    ProjectileKind, SpawnEvent, TimerSet, TrollPhase,
};
use spellfall_system_combat::{
    apply_damage, post_hit_window, screen_player_hit, DamageOutcome, Target,
};
use tracing::{debug, info, warn};

use crate::entities::{Entity, EntityRegistry};

pub(crate) const PLAYER_LIVES: f32 = 5.0;
pub(crate) const PLAYER_SPEED: f32 = 300.0;
const PLAYER_BOTTOM_OFFSET: f32 = 80.0;

pub(crate) const MANA_MAX: f32 = 30.0;
const MANA_REGEN_AMOUNT: f32 = 0.5;
const MANA_REGEN_PERIOD: Duration = Duration::from_secs(1);

const SPAWN_Y: f32 = -50.0;
const CURSE_MUZZLE_OFFSET: f32 = 30.0;
const PICKUP_DROP_SPEED: f32 = 50.0;
const PICKUP_LIFETIME: Duration = Duration::from_secs(12);
pub(crate) const PICKUP_LINGER: Duration = Duration::from_millis(800);

const TROLL_SHAKE_PERIOD: Duration = Duration::from_secs(3);
const TROLL_SHAKE_DAMAGE: f32 = 0.5;
const TROLL_SHAKE_HASTE: Duration = Duration::from_millis(500);
pub(crate) const WEAPON_STRIKE_PERIOD: Duration = Duration::from_millis(1_500);
const WEAPON_STRIKE_DAMAGE: f32 = 1.0;

/// Keys of every countdown owned by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Cooldown of a signature ability.
    Ability(Ability),
    /// Cooldown before the next character switch.
    CharacterSwitch,
    /// Post-hit invulnerability window of the player.
    PostHit,
    /// Ron mode full immunity.
    Mode,
    /// Remaining lifetime of an entity.
    Lifetime(EntityId),
    /// Collision grace window of a fresh projectile.
    Grace(EntityId),
    /// Running stun of an enemy.
    Stun(EntityId),
    /// Attack cooldown of a regular enemy.
    Attack(EntityId),
    /// Time until a troll's next shake.
    Shake(EntityId),
    /// Time until a floating weapon's next strike.
    Strike(EntityId),
}

impl TimerKey {
    /// Entity owning the timer, if it is entity-scoped.
    #[must_use]
    pub const fn entity(self) -> Option<EntityId> {
        match self {
            Self::Lifetime(id)
            | Self::Grace(id)
            | Self::Stun(id)
            | Self::Attack(id)
            | Self::Shake(id)
            | Self::Strike(id) => Some(id),
            _ => None,
        }
    }
}

/// Represents the authoritative Spellfall world state.
#[derive(Debug)]
pub struct World {
    arena: Arena,
    state: GameState,
    character: Character,
    entities: EntityRegistry,
    player: Option<EntityId>,
    timers: TimerSet<TimerKey>,
    score: u64,
    mana: f32,
    mana_regen: Duration,
    ultimate_charges: u32,
    elapsed: Duration,
}

impl World {
    /// Creates an idle world covering the provided arena.
    #[must_use]
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            state: GameState::Idle,
            character: Character::Harry,
            entities: EntityRegistry::new(),
            player: None,
            timers: TimerSet::new(),
            score: 0,
            mana: MANA_MAX,
            mana_regen: Duration::ZERO,
            ultimate_charges: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn reset(&mut self) {
        self.entities.clear();
        self.timers.clear();
        self.player = None;
        self.score = 0;
        self.mana = MANA_MAX;
        self.mana_regen = Duration::ZERO;
        self.ultimate_charges = 0;
        self.elapsed = Duration::ZERO;
    }

    fn player_entity(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(id))
    }

    fn spawn(&mut self, entity: Entity, out_events: &mut Vec<Event>) -> EntityId {
        let id = entity.id;
        let kind = entity.kind;
        self.entities.insert(entity);
        out_events.push(Event::EntitySpawned { entity: id, kind });
        if let EntityKind::Projectile(kind) = kind {
            out_events.push(Event::ProjectileFired { entity: id, kind });
        }
        id
    }

    fn cooldowns(&self) -> Vec<AbilityCooldown> {
        Ability::ALL
            .into_iter()
            .map(|ability| {
                let timer = self.timers.timer(TimerKey::Ability(ability));
                AbilityCooldown {
                    ability,
                    remaining: timer.map_or(Duration::ZERO, |timer| timer.remaining()),
                    total: timer.map_or(Duration::ZERO, |timer| timer.total()),
                }
            })
            .collect()
    }

    fn lives_event(&self) -> Event {
        let health = self
            .player_entity()
            .map_or(Health::full(PLAYER_LIVES), |player| player.health);
        Event::LivesChanged {
            current: health.current(),
            max: health.max(),
        }
    }

    fn mana_event(&self) -> Event {
        Event::ManaChanged {
            current: self.mana,
            max: MANA_MAX,
        }
    }

    fn start(&mut self, character: Character, out_events: &mut Vec<Event>) {
        self.reset();
        self.state = GameState::Playing;
        self.character = character;

        let id = self.entities.allocate();
        let position = Vec2::new(
            self.arena.width * 0.5,
            self.arena.height - PLAYER_BOTTOM_OFFSET,
        );
        let _ = self.spawn(
            Entity::new(id, EntityKind::Player, position, Vec2::ZERO),
            out_events,
        );
        self.player = Some(id);

        info!(character = character.name(), "game_started");
        out_events.push(Event::GameStarted { character });
        out_events.push(Event::ScoreChanged { score: 0 });
        out_events.push(self.lives_event());
        out_events.push(self.mana_event());
        out_events.push(Event::CooldownsChanged {
            cooldowns: self.cooldowns(),
        });
        out_events.push(Event::UltimateChargesChanged { charges: 0 });
    }

    fn restart(&mut self, out_events: &mut Vec<Event>) {
        self.reset();
        self.state = GameState::Idle;
        info!("game_restarted");
        out_events.push(Event::GameRestarted);
        out_events.push(Event::ScoreChanged { score: 0 });
        out_events.push(self.lives_event());
    }

    fn spawn_from(&mut self, spawn: SpawnEvent, out_events: &mut Vec<Event>) {
        let id = self.entities.allocate();
        match spawn {
            SpawnEvent::Regular {
                x,
                pattern,
                speed,
                first_attack,
            } => {
                let entity = Entity::new(
                    id,
                    EntityKind::Enemy,
                    Vec2::new(x, SPAWN_Y),
                    Vec2::new(0.0, speed),
                )
                .with_ai(AiState::Pattern {
                    pattern,
                    speed,
                    clock: Duration::ZERO,
                    heading: 1.0,
                });
                self.timers.start(TimerKey::Attack(id), first_attack);
                let _ = self.spawn(entity, out_events);
                debug!(entity = id.get(), ?pattern, speed, "enemy_spawned");
            }
            SpawnEvent::Boss { kind, x } => {
                let entity = Entity::new(
                    id,
                    EntityKind::Boss(kind),
                    Vec2::new(x, SPAWN_Y),
                    Vec2::new(0.0, kind.descent_speed()),
                )
                .with_ai(initial_boss_ai(kind));
                if kind == BossKind::Troll {
                    self.timers.start(TimerKey::Shake(id), TROLL_SHAKE_PERIOD);
                }
                let _ = self.spawn(entity, out_events);
                if kind == BossKind::Dementor {
                    out_events.push(Event::DementorSpawned { entity: id });
                } else {
                    out_events.push(Event::BossSpawned {
                        entity: id,
                        boss: kind,
                    });
                }
                info!(entity = id.get(), boss = ?kind, "boss_spawned");
            }
            SpawnEvent::Pickup { kind, x } => {
                let entity = Entity::new(
                    id,
                    EntityKind::Pickup(kind),
                    Vec2::new(x, SPAWN_Y),
                    Vec2::new(0.0, PICKUP_DROP_SPEED),
                );
                self.timers.start(TimerKey::Lifetime(id), PICKUP_LIFETIME);
                let _ = self.spawn(entity, out_events);
                debug!(entity = id.get(), pickup = ?kind, "pickup_spawned");
            }
        }
    }

    fn update_ai(&mut self, entity: EntityId, ai: AiState, velocity: Vec2) {
        match self.entities.active_mut(entity) {
            Some(target) if !target.is_stunned() => {
                target.ai = Some(ai);
                target.velocity = velocity;
            }
            Some(_) => debug!(entity = entity.get(), "ai_update_while_stunned"),
            None => debug!(entity = entity.get(), "ai_update_for_missing_entity"),
        }
    }

    fn fire_curse(
        &mut self,
        caster: EntityId,
        kind: CurseKind,
        velocity: Vec2,
        cooldown: Option<Duration>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(origin) = self
            .entities
            .get(caster)
            .filter(|entity| entity.is_active() && !entity.is_stunned())
            .map(|entity| entity.position)
        else {
            debug!(caster = caster.get(), "curse_from_missing_caster");
            return;
        };
        if let Some(cooldown) = cooldown {
            self.timers.start(TimerKey::Attack(caster), cooldown);
        }
        let id = self.entities.allocate();
        let _ = self.spawn(
            Entity::new(
                id,
                EntityKind::Projectile(ProjectileKind::Curse(kind)),
                origin + Vec2::new(0.0, CURSE_MUZZLE_OFFSET),
                velocity,
            ),
            out_events,
        );
    }

    fn troll_shake(&mut self, troll: EntityId, hits_player: bool, out_events: &mut Vec<Event>) {
        let Some(entity) = self.entities.active_mut(troll) else {
            debug!(troll = troll.get(), "shake_from_missing_troll");
            return;
        };
        if entity.is_stunned() || entity.ai.is_some_and(|ai| ai.is_floating()) {
            return;
        }
        self.timers.start(TimerKey::Shake(troll), TROLL_SHAKE_PERIOD);
        out_events.push(Event::TrollShook { troll });
        if hits_player {
            self.damage_player(TROLL_SHAKE_DAMAGE, DamageSource::TrollShake, out_events);
        }
    }

    fn weapon_strike(&mut self, weapon: EntityId, out_events: &mut Vec<Event>) {
        let Some(EntityKind::Effect(EffectKind::FloatingWeapon { troll })) = self
            .entities
            .get(weapon)
            .filter(|entity| entity.is_active())
            .map(|entity| entity.kind)
        else {
            debug!(weapon = weapon.get(), "strike_from_missing_weapon");
            return;
        };
        if self.entities.active_mut(troll).is_none() {
            self.despawn(weapon);
            return;
        }
        self.timers.start(TimerKey::Strike(weapon), WEAPON_STRIKE_PERIOD);
        self.damage_enemy(
            troll,
            WEAPON_STRIKE_DAMAGE,
            DamageSource::FloatingWeapon,
            out_events,
        );
    }

    fn integrate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        let arena = self.arena;
        for entity in self.entities.iter_mut() {
            if !entity.is_active() || matches!(entity.kind, EntityKind::Pickup(_)) {
                continue;
            }
            entity.position += entity.velocity * seconds;
            if entity.kind == EntityKind::Player {
                let min = entity.half_extents;
                let max = Vec2::new(arena.width, arena.height) - entity.half_extents;
                entity.position = entity.position.clamp(min, max.max(min));
                continue;
            }
            if let Some(margin) = entity.exit_margin() {
                if arena.is_outside(entity.position, margin) {
                    entity.dying = true;
                }
            }
        }
    }

    fn sync_bodies(&mut self, bodies: Vec<spellfall_core::BodySync>) {
        let arena = self.arena;
        for body in bodies {
            let Some(entity) = self.entities.active_mut(body.entity) else {
                continue;
            };
            if !matches!(entity.kind, EntityKind::Pickup(_)) {
                warn!(entity = body.entity.get(), "body_sync_for_non_pickup");
                continue;
            }
            entity.position = body.position;
            entity.velocity = body.velocity;
            if let Some(margin) = entity.exit_margin() {
                if arena.is_outside(entity.position, margin) {
                    entity.dying = true;
                }
            }
        }
    }

    fn damage_enemy(
        &mut self,
        target: EntityId,
        amount: f32,
        source: DamageSource,
        out_events: &mut Vec<Event>,
    ) {
        let Some(entity) = self.entities.active_mut(target) else {
            debug!(target = target.get(), ?source, "damage_for_missing_entity");
            return;
        };
        if !entity.kind.is_hostile() {
            warn!(target = target.get(), ?source, "damage_for_non_hostile_entity");
            return;
        }

        let before = entity.health.current();
        let kind = entity.kind;
        let outcome = apply_damage(
            Target {
                kind,
                health: &mut entity.health,
                ai: entity.ai.as_mut(),
            },
            amount,
            source,
        );
        let remaining = entity.health.current();

        match outcome {
            DamageOutcome::Rejected => {
                debug!(target = target.get(), ?source, "damage_rejected");
                out_events.push(Event::Immune {
                    entity: target,
                    source,
                });
            }
            DamageOutcome::Survived => {
                out_events.push(Event::EnemyDamaged {
                    entity: target,
                    amount: before - remaining,
                    remaining,
                });
                if kind == EntityKind::Boss(BossKind::Troll) && source == DamageSource::Bolt {
                    self.timers.shorten(TimerKey::Shake(target), TROLL_SHAKE_HASTE);
                }
            }
            DamageOutcome::Defeated => {
                entity.dying = true;
                out_events.push(Event::EnemyDefeated {
                    entity: target,
                    kind,
                    source,
                });
                match kind {
                    EntityKind::Boss(BossKind::Dementor) => {
                        out_events.push(Event::DementorDefeated { entity: target });
                    }
                    EntityKind::Boss(boss) => {
                        out_events.push(Event::BossDefeated {
                            entity: target,
                            boss,
                        });
                    }
                    _ => {}
                }
                debug!(target = target.get(), ?kind, ?source, "enemy_defeated");
            }
        }
    }

    fn damage_player(&mut self, amount: f32, source: DamageSource, out_events: &mut Vec<Event>) {
        if self.state != GameState::Playing {
            return;
        }
        let mode_active = self.timers.is_running(TimerKey::Mode);
        let post_hit_running = self.timers.is_running(TimerKey::PostHit);
        let Some(player) = self.player.and_then(|id| self.entities.active_mut(id)) else {
            debug!(?source, "damage_without_player");
            return;
        };

        if let Some(reason) = screen_player_hit(mode_active, post_hit_running) {
            out_events.push(Event::PlayerHitBlocked { source, reason });
            return;
        }

        player.health.damage(amount);
        let depleted = player.health.is_depleted();
        self.timers.start(TimerKey::PostHit, post_hit_window(source));
        out_events.push(Event::PlayerDamaged { amount, source });
        out_events.push(self.lives_event());

        if depleted {
            self.state = GameState::GameOver;
            info!(score = self.score, character = self.character.name(), "game_over");
            out_events.push(Event::GameOver {
                score: self.score,
                character: self.character,
            });
        }
    }

    fn despawn(&mut self, entity: EntityId) {
        match self.entities.get_mut(entity) {
            Some(target) if target.kind != EntityKind::Player => target.dying = true,
            Some(_) => warn!(entity = entity.get(), "player_despawn_ignored"),
            None => debug!(entity = entity.get(), "despawn_for_missing_entity"),
        }
    }

    fn advance_timers(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut cooldowns_changed = false;
        for key in self.timers.tick(dt) {
            match key {
                TimerKey::Ability(_) => cooldowns_changed = true,
                TimerKey::Mode => {
                    info!("mode_expired");
                    out_events.push(Event::ModeChanged { active: false });
                }
                TimerKey::Lifetime(id) => self.despawn(id),
                TimerKey::Stun(id) => {
                    if let Some(entity) = self.entities.get_mut(id) {
                        if let Some(velocity) = entity.stunned_from.take() {
                            entity.velocity = velocity;
                            out_events.push(Event::StunExpired { entity: id });
                        }
                    }
                }
                TimerKey::CharacterSwitch
                | TimerKey::PostHit
                | TimerKey::Grace(_)
                | TimerKey::Attack(_)
                | TimerKey::Shake(_)
                | TimerKey::Strike(_) => {}
            }
        }
        self.regenerate_mana(dt, out_events);
        if cooldowns_changed {
            out_events.push(Event::CooldownsChanged {
                cooldowns: self.cooldowns(),
            });
        }
    }

    /// Credits one regeneration step per full period, carrying the remainder
    /// into the next call so the rate does not depend on tick length.
    fn regenerate_mana(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.mana_regen = self.mana_regen.saturating_add(dt);
        let mut regenerated = false;
        while self.mana_regen >= MANA_REGEN_PERIOD {
            self.mana_regen -= MANA_REGEN_PERIOD;
            if self.mana < MANA_MAX {
                self.mana = (self.mana + MANA_REGEN_AMOUNT).min(MANA_MAX);
                regenerated = true;
            }
        }
        if regenerated {
            out_events.push(self.mana_event());
        }
    }

    fn cleanup(&mut self, out_events: &mut Vec<Event>) {
        let removed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|entity| entity.dying)
            .map(|entity| entity.id)
            .collect();
        if removed.is_empty() {
            return;
        }
        for id in &removed {
            let _ = self.entities.remove(*id);
            out_events.push(Event::EntityRemoved { entity: *id });
        }
        self.timers.retain(|key| {
            key.entity()
                .map_or(true, |owner| removed.binary_search(&owner).is_err())
        });
    }
}

fn initial_boss_ai(kind: BossKind) -> AiState {
    match kind {
        BossKind::Lucius => AiState::Patrol {
            entered: false,
            heading: 1.0,
        },
        BossKind::Bellatrix => AiState::Sentinel { entered: false },
        BossKind::Troll => AiState::Troll {
            phase: TrollPhase::Lumbering,
        },
        BossKind::Dementor => AiState::Dementor {
            phase: DementorPhase::Approaching,
            in_phase: Duration::ZERO,
        },
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartGame { character } => world.start(character, out_events),
        Command::RestartGame => world.restart(out_events),
        command if world.state != GameState::Playing => {
            if let Some(action) = actions::action_of(&command) {
                actions::deny(action, spellfall_core::DenialReason::NotPlaying, out_events);
            }
        }
        Command::SwitchCharacter { character } => {
            actions::switch_character(world, character, out_events);
        }
        Command::InvokeAbility { ability } => actions::invoke_ability(world, ability, out_events),
        Command::InvokeUltimate => actions::invoke_ultimate(world, out_events),
        Command::CastBolt => actions::cast_bolt(world, out_events),
        Command::SteerPlayer { velocity } => actions::steer(world, velocity),
        Command::Tick { dt } => {
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::Spawn { spawn } => world.spawn_from(spawn, out_events),
        Command::UpdateAi {
            entity,
            ai,
            velocity,
        } => world.update_ai(entity, ai, velocity),
        Command::SetVelocity { entity, velocity } => {
            if let Some(target) = world.entities.active_mut(entity) {
                target.velocity = velocity;
            }
        }
        Command::FireCurse {
            caster,
            kind,
            velocity,
            cooldown,
        } => world.fire_curse(caster, kind, velocity, cooldown, out_events),
        Command::TrollShake { troll, hits_player } => {
            world.troll_shake(troll, hits_player, out_events);
        }
        Command::WeaponStrike { weapon } => world.weapon_strike(weapon, out_events),
        Command::Integrate { dt } => world.integrate(dt),
        Command::SyncBodies { bodies } => world.sync_bodies(bodies),
        Command::ApplyDamage {
            target,
            amount,
            source,
        } => world.damage_enemy(target, amount, source, out_events),
        Command::DamagePlayer { amount, source } => {
            world.damage_player(amount, source, out_events);
        }
        Command::ConsumeProjectile { projectile } => {
            if let Some(entity) = world.entities.active_mut(projectile) {
                if matches!(entity.kind, EntityKind::Projectile(_)) {
                    entity.dying = true;
                }
            }
        }
        Command::CollectPickup { pickup } => actions::collect_pickup(world, pickup, out_events),
        Command::AwardScore { points } => {
            world.score = world.score.saturating_add(points);
            out_events.push(Event::ScoreChanged { score: world.score });
        }
        Command::GrantUltimateCharge => {
            world.ultimate_charges = world.ultimate_charges.saturating_add(1);
            out_events.push(Event::UltimateChargesChanged {
                charges: world.ultimate_charges,
            });
        }
        Command::AdvanceTimers { dt } => world.advance_timers(dt, out_events),
        Command::Despawn { entity } => world.despawn(entity),
        Command::Cleanup => world.cleanup(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use spellfall_core::{
        AbilityCooldown, Arena, Character, EntityId, EntityKind, EntitySnapshot, EntityView,
        GameState, GameSummary,
    };

    use super::{TimerKey, World, MANA_MAX};

    /// Lifecycle phase of the session.
    #[must_use]
    pub fn state(world: &World) -> GameState {
        world.state
    }

    /// Arena covered by the world.
    #[must_use]
    pub fn arena(world: &World) -> Arena {
        world.arena
    }

    /// Active character.
    #[must_use]
    pub fn character(world: &World) -> Character {
        world.character
    }

    /// Current score.
    #[must_use]
    pub fn score(world: &World) -> u64 {
        world.score
    }

    /// Current and maximum mana.
    #[must_use]
    pub fn mana(world: &World) -> (f32, f32) {
        (world.mana, MANA_MAX)
    }

    /// Ultimate charges available.
    #[must_use]
    pub fn ultimate_charges(world: &World) -> u32 {
        world.ultimate_charges
    }

    /// Play time accumulated since the session started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Remaining cooldown of every ability in display order.
    ///
    /// This is the per-frame source for countdown displays;
    /// [`spellfall_core::Event::CooldownsChanged`] only fires on use and on expiry.
    #[must_use]
    pub fn cooldowns(world: &World) -> Vec<AbilityCooldown> {
        world.cooldowns()
    }

    /// Time left before the character may be switched again.
    #[must_use]
    pub fn switch_cooldown(world: &World) -> Duration {
        world.timers.remaining(TimerKey::CharacterSwitch)
    }

    /// Reports whether Ron mode currently grants full immunity.
    #[must_use]
    pub fn mode_active(world: &World) -> bool {
        world.timers.is_running(TimerKey::Mode)
    }

    /// Reports whether the player would take damage from a hit right now.
    #[must_use]
    pub fn player_vulnerable(world: &World) -> bool {
        !mode_active(world) && !world.timers.is_running(TimerKey::PostHit)
    }

    /// Time left on an arbitrary world timer.
    #[must_use]
    pub fn timer_remaining(world: &World, key: TimerKey) -> Duration {
        world.timers.remaining(key)
    }

    /// Number of entities currently stored, including those awaiting cleanup.
    #[must_use]
    pub fn entity_count(world: &World) -> usize {
        world.entities.len()
    }

    /// Snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(id).map(|entity| snapshot_of(world, entity))
    }

    /// Snapshot of the player avatar.
    #[must_use]
    pub fn player(world: &World) -> Option<EntitySnapshot> {
        world.player.and_then(|id| entity(world, id))
    }

    /// Captures a read-only view of every entity.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        let snapshots = world
            .entities
            .iter()
            .map(|entity| snapshot_of(world, entity))
            .collect();
        EntityView::from_snapshots(snapshots)
    }

    /// Final result of the session once it ended.
    #[must_use]
    pub fn summary(world: &World) -> Option<GameSummary> {
        (world.state == GameState::GameOver).then_some(GameSummary {
            score: world.score,
            character: world.character,
        })
    }

    fn snapshot_of(world: &World, entity: &super::Entity) -> EntitySnapshot {
        let id = entity.id;
        let in_grace = world.timers.is_running(TimerKey::Grace(id));
        let action_ready = match entity.kind {
            EntityKind::Enemy => world.timers.ready(TimerKey::Attack(id)),
            EntityKind::Boss(spellfall_core::BossKind::Troll) => {
                world.timers.ready(TimerKey::Shake(id))
            }
            EntityKind::Effect(_) => world.timers.ready(TimerKey::Strike(id)),
            _ => false,
        };
        entity.snapshot(in_grace, action_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellfall_core::{Action, DenialReason, MovementPattern};

    fn playing(character: Character) -> (World, Vec<Event>) {
        let mut world = World::new(Arena::default());
        let mut events = Vec::new();
        apply(&mut world, Command::StartGame { character }, &mut events);
        (world, events)
    }

    fn spawn_regular(world: &mut World, x: f32) -> EntityId {
        let mut events = Vec::new();
        apply(
            world,
            Command::Spawn {
                spawn: SpawnEvent::Regular {
                    x,
                    pattern: MovementPattern::Drift,
                    speed: 60.0,
                    first_attack: Duration::from_secs(1),
                },
            },
            &mut events,
        );
        match events.first() {
            Some(Event::EntitySpawned { entity, .. }) => *entity,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn start_game_spawns_player_and_announces_counters() {
        let (world, events) = playing(Character::Hermione);

        assert_eq!(query::state(&world), GameState::Playing);
        let player = query::player(&world).expect("player");
        assert_eq!(player.health.current(), PLAYER_LIVES);
        assert!(events.contains(&Event::GameStarted {
            character: Character::Hermione
        }));
        assert!(events.contains(&Event::ManaChanged {
            current: MANA_MAX,
            max: MANA_MAX
        }));
    }

    #[test]
    fn commands_are_ignored_while_idle() {
        let mut world = World::new(Arena::default());
        let mut events = Vec::new();
        apply(&mut world, Command::CastBolt, &mut events);
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::ActionDenied {
                action: Action::Bolt,
                reason: DenialReason::NotPlaying,
            }]
        );
        assert_eq!(query::elapsed(&world), Duration::ZERO);
    }

    #[test]
    fn defeated_enemy_is_removed_at_cleanup_and_never_damaged_again() {
        let (mut world, _) = playing(Character::Harry);
        let enemy = spawn_regular(&mut world, 200.0);
        let mut events = Vec::new();

        let hit = Command::ApplyDamage {
            target: enemy,
            amount: 1.0,
            source: DamageSource::Bolt,
        };
        apply(&mut world, hit.clone(), &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::EnemyDefeated { entity, .. }] if *entity == enemy
        ));
        assert!(query::entity(&world, enemy).expect("still stored").dying);

        events.clear();
        apply(&mut world, hit.clone(), &mut events);
        assert!(events.is_empty(), "dying enemies must not be damaged");

        apply(&mut world, Command::Cleanup, &mut events);
        assert_eq!(events, vec![Event::EntityRemoved { entity: enemy }]);
        assert!(query::entity(&world, enemy).is_none());

        events.clear();
        apply(&mut world, hit, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn enemy_timers_are_dropped_with_the_enemy() {
        let (mut world, _) = playing(Character::Harry);
        let enemy = spawn_regular(&mut world, 200.0);
        assert!(query::timer_remaining(&world, TimerKey::Attack(enemy)) > Duration::ZERO);

        let mut events = Vec::new();
        apply(&mut world, Command::Despawn { entity: enemy }, &mut events);
        apply(&mut world, Command::Cleanup, &mut events);
        assert_eq!(
            query::timer_remaining(&world, TimerKey::Attack(enemy)),
            Duration::ZERO
        );
    }

    #[test]
    fn lethal_hit_ends_the_game_once() {
        let (mut world, _) = playing(Character::Ron);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AwardScore { points: 700 },
            &mut events,
        );

        for _ in 0..4 {
            apply(
                &mut world,
                Command::DamagePlayer {
                    amount: 1.0,
                    source: DamageSource::Curse,
                },
                &mut events,
            );
            apply(
                &mut world,
                Command::AdvanceTimers {
                    dt: Duration::from_secs(2),
                },
                &mut events,
            );
        }
        assert_eq!(query::player(&world).expect("player").health.current(), 1.0);

        events.clear();
        for _ in 0..3 {
            apply(
                &mut world,
                Command::DamagePlayer {
                    amount: CurseKind::Tracking.damage(),
                    source: DamageSource::Curse,
                },
                &mut events,
            );
        }

        let game_overs: Vec<&Event> = events
            .iter()
            .filter(|event| matches!(event, Event::GameOver { .. }))
            .collect();
        assert_eq!(
            game_overs,
            vec![&Event::GameOver {
                score: 700,
                character: Character::Ron
            }]
        );
        assert_eq!(query::state(&world), GameState::GameOver);
        assert_eq!(
            query::summary(&world).map(|summary| summary.score),
            Some(700)
        );
    }

    #[test]
    fn post_hit_window_absorbs_follow_up_hits() {
        let (mut world, _) = playing(Character::Harry);
        let mut events = Vec::new();
        let hit = Command::DamagePlayer {
            amount: 0.5,
            source: DamageSource::Contact,
        };
        apply(&mut world, hit.clone(), &mut events);
        apply(&mut world, hit, &mut events);

        assert_eq!(query::player(&world).expect("player").health.current(), 4.5);
        assert!(events.contains(&Event::PlayerHitBlocked {
            source: DamageSource::Contact,
            reason: spellfall_core::BlockReason::PostHit,
        }));
    }

    #[test]
    fn mana_regenerates_up_to_the_cap() {
        let (mut world, _) = playing(Character::Harry);
        let mut events = Vec::new();
        apply(&mut world, Command::CastBolt, &mut events);
        apply(&mut world, Command::CastBolt, &mut events);
        assert_eq!(query::mana(&world).0, MANA_MAX - 2.0);

        for _ in 0..10 {
            apply(
                &mut world,
                Command::AdvanceTimers {
                    dt: Duration::from_secs(1),
                },
                &mut events,
            );
        }
        assert_eq!(query::mana(&world).0, MANA_MAX);
    }

    #[test]
    fn mana_regeneration_keeps_pace_with_long_and_short_ticks() {
        let (mut long_tick, _) = playing(Character::Harry);
        let mut events = Vec::new();
        for _ in 0..4 {
            apply(&mut long_tick, Command::CastBolt, &mut events);
        }
        let before = query::mana(&long_tick).0;
        apply(
            &mut long_tick,
            Command::AdvanceTimers {
                dt: Duration::from_secs(3),
            },
            &mut events,
        );
        assert_eq!(query::mana(&long_tick).0 - before, 3.0 * MANA_REGEN_AMOUNT);

        let (mut short_ticks, _) = playing(Character::Harry);
        for _ in 0..4 {
            apply(&mut short_ticks, Command::CastBolt, &mut events);
        }
        for _ in 0..63 {
            apply(
                &mut short_ticks,
                Command::AdvanceTimers {
                    dt: Duration::from_millis(16),
                },
                &mut events,
            );
        }
        assert_eq!(query::mana(&short_ticks).0, before + MANA_REGEN_AMOUNT);
    }

    #[test]
    fn restart_clears_everything_and_returns_to_idle() {
        let (mut world, _) = playing(Character::Harry);
        let _ = spawn_regular(&mut world, 100.0);
        let mut events = Vec::new();
        apply(&mut world, Command::AwardScore { points: 300 }, &mut events);
        apply(
            &mut world,
            Command::InvokeAbility {
                ability: Ability::Patronus,
            },
            &mut events,
        );

        events.clear();
        apply(&mut world, Command::RestartGame, &mut events);

        assert_eq!(query::state(&world), GameState::Idle);
        assert_eq!(query::entity_count(&world), 0);
        assert_eq!(query::score(&world), 0);
        assert!(query::cooldowns(&world)
            .iter()
            .all(|cooldown| cooldown.remaining.is_zero()));
        assert_eq!(events.first(), Some(&Event::GameRestarted));
    }
}
