#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that detects collisions between entity snapshots.
//!
//! A pair collides when the bounding boxes overlap and the centers are closer
//! than the per-pair threshold. Dying entities, projectiles inside their grace
//! window and collected pickups never collide.

use glam::Vec2;
use spellfall_core::{
    BossKind, CollisionPair, Contact, EntityKind, EntitySnapshot, EntityView, ProjectileKind,
};

/// Axis-aligned bounding box described by its center and half extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Center of the box.
    pub center: Vec2,
    /// Half width and half height.
    pub half_extents: Vec2,
}

impl Aabb {
    /// Creates a box around `center`.
    #[must_use]
    pub const fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Reports whether two boxes overlap. Touching edges do not count.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let gap = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        gap.x < reach.x && gap.y < reach.y
    }
}

impl From<&EntitySnapshot> for Aabb {
    fn from(snapshot: &EntitySnapshot) -> Self {
        Self::new(snapshot.position, snapshot.half_extents)
    }
}

/// Reports whether two boxes overlap and their centers are strictly closer
/// than `threshold`.
#[must_use]
pub fn query_overlaps(a: &Aabb, b: &Aabb, threshold: f32) -> bool {
    a.overlaps(b) && a.center.distance(b.center) < threshold
}

/// Center distance thresholds used per interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    default_threshold: f32,
    troll_threshold: f32,
    orb_threshold: f32,
    pickup_threshold: f32,
}

impl Config {
    /// Creates a configuration from explicit thresholds.
    #[must_use]
    pub const fn new(
        default_threshold: f32,
        troll_threshold: f32,
        orb_threshold: f32,
        pickup_threshold: f32,
    ) -> Self {
        Self {
            default_threshold,
            troll_threshold,
            orb_threshold,
            pickup_threshold,
        }
    }

    fn hostile_threshold(&self, projectile: Option<ProjectileKind>, target: EntityKind) -> f32 {
        if projectile == Some(ProjectileKind::UltimateOrb) {
            self.orb_threshold
        } else if target == EntityKind::Boss(BossKind::Troll) {
            self.troll_threshold
        } else {
            self.default_threshold
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(50.0, 70.0, 90.0, 60.0)
    }
}

/// Collision index that reuses scratch buffers between ticks.
#[derive(Debug)]
pub struct CollisionIndex {
    config: Config,
    friendly: Vec<Candidate>,
    hostile: Vec<Candidate>,
    curses: Vec<Candidate>,
    pickups: Vec<Candidate>,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    snapshot_index: usize,
    bounds: Aabb,
}

impl CollisionIndex {
    /// Creates a new collision index using the supplied thresholds.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            friendly: Vec::new(),
            hostile: Vec::new(),
            curses: Vec::new(),
            pickups: Vec::new(),
        }
    }

    /// Detects every colliding pair in the view.
    ///
    /// The output buffer is cleared before populating it; pairs are sorted by
    /// contact kind and entity ids.
    pub fn detect(&mut self, view: &EntityView, out: &mut Vec<CollisionPair>) {
        out.clear();
        self.prepare(view);
        let snapshots: Vec<&EntitySnapshot> = view.iter().collect();

        for projectile in &self.friendly {
            let shot = snapshots[projectile.snapshot_index];
            let kind = match shot.kind {
                EntityKind::Projectile(kind) => Some(kind),
                _ => None,
            };
            for target in &self.hostile {
                let enemy = snapshots[target.snapshot_index];
                let threshold = self.config.hostile_threshold(kind, enemy.kind);
                if query_overlaps(&projectile.bounds, &target.bounds, threshold) {
                    out.push(CollisionPair {
                        contact: Contact::Projectile,
                        first: shot.id,
                        second: enemy.id,
                    });
                }
            }
        }

        if let Some(player) = view.player().filter(|player| !player.dying) {
            let bounds = Aabb::from(player);
            for curse in &self.curses {
                if query_overlaps(&curse.bounds, &bounds, self.config.default_threshold) {
                    out.push(CollisionPair {
                        contact: Contact::Curse,
                        first: snapshots[curse.snapshot_index].id,
                        second: player.id,
                    });
                }
            }
            for target in &self.hostile {
                let enemy = snapshots[target.snapshot_index];
                let threshold = self.config.hostile_threshold(None, enemy.kind);
                if query_overlaps(&bounds, &target.bounds, threshold) {
                    out.push(CollisionPair {
                        contact: Contact::Body,
                        first: player.id,
                        second: enemy.id,
                    });
                }
            }
            for pickup in &self.pickups {
                if query_overlaps(&bounds, &pickup.bounds, self.config.pickup_threshold) {
                    out.push(CollisionPair {
                        contact: Contact::Pickup,
                        first: player.id,
                        second: snapshots[pickup.snapshot_index].id,
                    });
                }
            }
        }

        out.sort_unstable();
    }

    fn prepare(&mut self, view: &EntityView) {
        self.friendly.clear();
        self.hostile.clear();
        self.curses.clear();
        self.pickups.clear();

        for (snapshot_index, snapshot) in view.iter().enumerate() {
            if snapshot.dying {
                continue;
            }
            let candidate = Candidate {
                snapshot_index,
                bounds: Aabb::from(snapshot),
            };
            match snapshot.kind {
                EntityKind::Enemy | EntityKind::Boss(_) => self.hostile.push(candidate),
                EntityKind::Projectile(_) if snapshot.in_grace => {}
                EntityKind::Projectile(ProjectileKind::Curse(_)) => self.curses.push(candidate),
                EntityKind::Projectile(_) => self.friendly.push(candidate),
                EntityKind::Pickup(_) if !snapshot.collected => self.pickups.push(candidate),
                EntityKind::Player | EntityKind::Pickup(_) | EntityKind::Effect(_) => {}
            }
        }
    }
}

impl Default for CollisionIndex {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
