#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step rigid-body bridge used for consumable pickups.
//!
//! Dynamic bodies fall under gravity and bounce off kinematic bodies that
//! mirror enemy positions. Time is fed through a [`Duration`] accumulator, so
//! the number of inner steps depends only on the total time advanced and not
//! on how it was chunked.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use spellfall_core::{BodySync, EntityId};
use tracing::trace;

/// Length of one inner physics step (1/60 s).
pub const FIXED_STEP: Duration = Duration::from_nanos(16_666_667);

/// Configuration parameters required to construct the physics bridge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    gravity: Vec2,
    fixed_step: Duration,
    restitution: f32,
    contact_restitution: f32,
    bounce_multiplier: f32,
}

impl Config {
    /// Creates a configuration with the provided gravity and default
    /// restitution values.
    #[must_use]
    pub const fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            fixed_step: FIXED_STEP,
            restitution: 0.6,
            contact_restitution: 0.8,
            bounce_multiplier: 1.5,
        }
    }

    /// Overrides the restitution of bounces against kinematic bodies.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Overrides the restitution and multiplier of player contact impulses.
    #[must_use]
    pub fn with_contact(mut self, restitution: f32, multiplier: f32) -> Self {
        self.contact_restitution = restitution;
        self.bounce_multiplier = multiplier;
        self
    }

    /// Overrides the inner step length.
    #[must_use]
    pub fn with_fixed_step(mut self, fixed_step: Duration) -> Self {
        self.fixed_step = fixed_step;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, 100.0))
    }
}

/// Simulation role of a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Integrated under gravity and contact responses.
    Dynamic,
    /// Positioned externally; only deflects dynamic bodies.
    Kinematic,
}

/// Rigid body tracked by the bridge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Simulation role.
    pub kind: BodyKind,
    /// Center of the body.
    pub position: Vec2,
    /// Linear velocity.
    pub velocity: Vec2,
    /// Half extents of the box collider.
    pub half_extents: Vec2,
}

impl Body {
    fn overlaps(&self, other: &Self) -> bool {
        let gap = (self.position - other.position).abs();
        let reach = self.half_extents + other.half_extents;
        gap.x < reach.x && gap.y < reach.y
    }
}

/// Fixed-step physics world holding dynamic and kinematic bodies.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: Config,
    bodies: BTreeMap<EntityId, Body>,
    accumulator: Duration,
}

impl PhysicsWorld {
    /// Creates an empty physics world.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bodies: BTreeMap::new(),
            accumulator: Duration::ZERO,
        }
    }

    /// Registers a dynamic body for the entity, replacing any previous body.
    pub fn insert_dynamic(
        &mut self,
        entity: EntityId,
        position: Vec2,
        velocity: Vec2,
        half_extents: Vec2,
    ) {
        let _ = self.bodies.insert(
            entity,
            Body {
                kind: BodyKind::Dynamic,
                position,
                velocity,
                half_extents,
            },
        );
    }

    /// Creates or moves the kinematic body mirroring the entity.
    pub fn set_kinematic(
        &mut self,
        entity: EntityId,
        position: Vec2,
        velocity: Vec2,
        half_extents: Vec2,
    ) {
        let _ = self.bodies.insert(
            entity,
            Body {
                kind: BodyKind::Kinematic,
                position,
                velocity,
                half_extents,
            },
        );
    }

    /// Removes the body of the entity.
    pub fn remove(&mut self, entity: EntityId) -> Option<Body> {
        self.bodies.remove(&entity)
    }

    /// Keeps only bodies whose entity satisfies the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId, &Body) -> bool) {
        self.bodies.retain(|entity, body| keep(*entity, body));
    }

    /// Body registered for the entity.
    #[must_use]
    pub fn body(&self, entity: EntityId) -> Option<&Body> {
        self.bodies.get(&entity)
    }

    /// Number of registered bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Reports whether no body is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Feeds `dt` into the accumulator and runs every full inner step.
    ///
    /// Returns the number of inner steps executed.
    pub fn step(&mut self, dt: Duration) -> usize {
        let fixed_step = self.config.fixed_step;
        if fixed_step.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut steps = 0;
        while self.accumulator >= fixed_step {
            self.accumulator -= fixed_step;
            self.substep(fixed_step.as_secs_f32());
            steps += 1;
        }
        trace!(steps, bodies = self.bodies.len(), "physics_stepped");
        steps
    }

    /// Applies a player contact impulse to a dynamic body.
    ///
    /// The impulse is `j = -(1 + e) * v_n` along the contact normal, scaled by
    /// the bounce multiplier. Returns `None` when the body is missing, not
    /// dynamic, or already separating.
    pub fn apply_contact_impulse(
        &mut self,
        entity: EntityId,
        other_position: Vec2,
        other_velocity: Vec2,
    ) -> Option<f32> {
        let restitution = self.config.contact_restitution;
        let multiplier = self.config.bounce_multiplier;
        let body = self
            .bodies
            .get_mut(&entity)
            .filter(|body| body.kind == BodyKind::Dynamic)?;

        let normal = contact_normal(body.position, other_position);
        let approach = (body.velocity - other_velocity).dot(normal);
        if approach >= 0.0 {
            return None;
        }
        let impulse = -(1.0 + restitution) * approach * multiplier;
        body.velocity += normal * impulse;
        Some(impulse)
    }

    /// States of every dynamic body in entity order.
    #[must_use]
    pub fn syncs(&self) -> Vec<BodySync> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.kind == BodyKind::Dynamic)
            .map(|(entity, body)| BodySync {
                entity: *entity,
                position: body.position,
                velocity: body.velocity,
            })
            .collect()
    }

    fn substep(&mut self, seconds: f32) {
        let obstacles: Vec<Body> = self
            .bodies
            .values()
            .filter(|body| body.kind == BodyKind::Kinematic)
            .copied()
            .collect();
        let gravity = self.config.gravity;
        let restitution = self.config.restitution;

        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            body.velocity += gravity * seconds;
            body.position += body.velocity * seconds;

            for obstacle in &obstacles {
                if !body.overlaps(obstacle) {
                    continue;
                }
                let normal = contact_normal(body.position, obstacle.position);
                let approach = (body.velocity - obstacle.velocity).dot(normal);
                if approach < 0.0 {
                    body.velocity -= normal * (1.0 + restitution) * approach;
                }
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn contact_normal(position: Vec2, other: Vec2) -> Vec2 {
    let normal = (position - other).normalize_or_zero();
    if normal == Vec2::ZERO {
        Vec2::NEG_Y
    } else {
        normal
    }
}
