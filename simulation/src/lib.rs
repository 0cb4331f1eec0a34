#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order tick loop tying the world to every gameplay system.
//!
//! A [`Simulation`] owns the world and one instance of each system. Inbound
//! commands are applied immediately; [`Simulation::step`] runs one tick in
//! the order difficulty, spawning, behavior, integration, physics,
//! collisions, combat outcomes, timers and cleanup. Every event produced on
//! the way is published to the injected [`EventSink`] once the tick ends.

mod config;
mod seed;

use std::time::Duration;

use spellfall_core::{
    Command, Difficulty, EntityKind, Event, EventSink, GameState, GameSummary,
};
use spellfall_system_behavior::Behavior;
use spellfall_system_collision::CollisionIndex;
use spellfall_system_combat::CombatResolver;
use spellfall_system_difficulty::DifficultyController;
use spellfall_system_physics::PhysicsWorld;
use spellfall_system_spawning::SpawnDirector;
use spellfall_world::{self as world, query, World};
use tracing::info;

pub use config::{
    ArenaConfig, BehaviorConfig, CollisionConfig, CombatConfig, ConfigError, DifficultyConfig,
    PhysicsConfig, SimulationConfig, SpawningConfig,
};
pub use seed::{derive_labeled_seed, BEHAVIOR_STREAM, COMBAT_STREAM, SPAWNING_STREAM};

/// Every system instance driven by the tick loop.
#[derive(Debug)]
struct Systems {
    difficulty: DifficultyController,
    spawner: SpawnDirector,
    behavior: Behavior,
    collisions: CollisionIndex,
    physics: PhysicsWorld,
    combat: CombatResolver,
}

impl Systems {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            difficulty: DifficultyController::new(config.difficulty_config()),
            spawner: SpawnDirector::new(config.spawning_config()),
            behavior: Behavior::new(config.behavior_config()),
            collisions: CollisionIndex::new(config.collision_config()),
            physics: PhysicsWorld::new(config.physics_config()),
            combat: CombatResolver::new(config.combat_config()),
        }
    }
}

/// Headless game session publishing its events to `S`.
#[derive(Debug)]
pub struct Simulation<S: EventSink> {
    config: SimulationConfig,
    world: World,
    systems: Systems,
    sink: S,
    commands: Vec<Command>,
}

impl<S: EventSink> Simulation<S> {
    /// Validates the configuration and creates an idle session.
    pub fn new(config: SimulationConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            world: World::new(config.arena()),
            systems: Systems::new(&config),
            config,
            sink,
            commands: Vec::new(),
        })
    }

    /// Applies an inbound command and publishes the resulting events.
    ///
    /// Starting or restarting a session rebuilds every system from the
    /// configuration so schedules, generators and bodies never leak across
    /// sessions.
    pub fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        if events
            .iter()
            .any(|event| matches!(event, Event::GameStarted { .. } | Event::GameRestarted))
        {
            self.systems = Systems::new(&self.config);
            info!(seed = self.config.seed, "systems_rebuilt");
        }

        self.publish(&events);
    }

    /// Runs one tick of `dt`. Does nothing unless a session is playing.
    pub fn step(&mut self, dt: Duration) {
        if query::state(&self.world) != GameState::Playing {
            return;
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let difficulty = self.systems.difficulty.update(
            query::elapsed(&self.world),
            query::score(&self.world),
            &mut events,
        );

        self.spawn(&difficulty, &mut events);
        self.behave(&difficulty, &mut events);
        world::apply(&mut self.world, Command::Integrate { dt }, &mut events);
        self.simulate_bodies(dt, &mut events);
        self.collide(&mut events);
        self.resolve_outcomes(&mut events);
        world::apply(&mut self.world, Command::AdvanceTimers { dt }, &mut events);
        self.cleanup(&mut events);

        self.publish(&events);
    }

    /// World driven by the session.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Sink receiving published events.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink, e.g. to drain recorded events.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Configuration the session was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Difficulty produced by the most recent tick.
    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.systems.difficulty.current()
    }

    /// Spawn schedule state.
    #[must_use]
    pub fn spawner(&self) -> &SpawnDirector {
        &self.systems.spawner
    }

    /// Pickup physics state.
    #[must_use]
    pub fn physics(&self) -> &PhysicsWorld {
        &self.systems.physics
    }

    /// Final result once the session is over.
    #[must_use]
    pub fn summary(&self) -> Option<GameSummary> {
        query::summary(&self.world)
    }

    fn spawn(&mut self, difficulty: &Difficulty, events: &mut Vec<Event>) {
        let boss_present = query::entity_view(&self.world).boss_present();
        self.systems
            .spawner
            .handle(events, difficulty, boss_present, &mut self.commands);

        let first = events.len();
        self.flush(events);

        for event in &events[first..] {
            let Event::EntitySpawned {
                entity,
                kind: EntityKind::Pickup(_),
            } = event
            else {
                continue;
            };
            if let Some(pickup) = query::entity(&self.world, *entity) {
                self.systems.physics.insert_dynamic(
                    pickup.id,
                    pickup.position,
                    pickup.velocity,
                    pickup.half_extents,
                );
            }
        }
    }

    fn behave(&mut self, difficulty: &Difficulty, events: &mut Vec<Event>) {
        let view = query::entity_view(&self.world);
        self.systems
            .behavior
            .handle(events, &view, difficulty, &mut self.commands);
        self.flush(events);
    }

    fn simulate_bodies(&mut self, dt: Duration, events: &mut Vec<Event>) {
        let view = query::entity_view(&self.world);
        let physics = &mut self.systems.physics;

        physics.retain(|entity, _| {
            view.get(entity).is_some_and(|snapshot| !snapshot.dying)
        });
        for snapshot in view.iter() {
            if snapshot.kind.is_hostile() && !snapshot.dying {
                physics.set_kinematic(
                    snapshot.id,
                    snapshot.position,
                    snapshot.velocity,
                    snapshot.half_extents,
                );
            }
        }

        let _ = physics.step(dt);
        let bodies = physics.syncs();
        if !bodies.is_empty() {
            world::apply(&mut self.world, Command::SyncBodies { bodies }, events);
        }
    }

    fn collide(&mut self, events: &mut Vec<Event>) {
        let view = query::entity_view(&self.world);
        let mut pairs = Vec::new();
        self.systems.collisions.detect(&view, &mut pairs);
        self.systems
            .combat
            .resolve_collisions(&pairs, &view, &mut self.commands);

        let first = events.len();
        self.flush(events);

        let Some(player) = query::player(&self.world) else {
            return;
        };
        for event in &events[first..] {
            if let Event::PickupCollected { entity, .. } = event {
                let _ = self.systems.physics.apply_contact_impulse(
                    *entity,
                    player.position,
                    player.velocity,
                );
            }
        }
    }

    fn resolve_outcomes(&mut self, events: &mut Vec<Event>) {
        for event in events.iter() {
            if matches!(
                event,
                Event::BossDefeated { .. } | Event::DementorDefeated { .. }
            ) {
                self.systems.spawner.boss_defeated();
            }
        }
        self.systems
            .combat
            .resolve_outcomes(events, &mut self.commands);
        self.flush(events);
    }

    fn cleanup(&mut self, events: &mut Vec<Event>) {
        let first = events.len();
        world::apply(&mut self.world, Command::Cleanup, events);
        for event in &events[first..] {
            if let Event::EntityRemoved { entity } = event {
                let _ = self.systems.physics.remove(*entity);
            }
        }
    }

    fn flush(&mut self, events: &mut Vec<Event>) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn publish(&mut self, events: &[Event]) {
        for event in events {
            self.sink.publish(event);
        }
    }
}
