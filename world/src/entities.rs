//! Authoritative entity storage and identifier allocation.

use std::collections::BTreeMap;

use glam::Vec2;
use spellfall_core::{
    AiState, BossKind, CurseKind, EntityId, EntityKind, EntitySnapshot, Health, ProjectileKind,
};

/// Entity record stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Entity {
    /// Identifier allocated by the world for the entity.
    pub(crate) id: EntityId,
    /// Kind tag used to dispatch behavior.
    pub(crate) kind: EntityKind,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) half_extents: Vec2,
    pub(crate) health: Health,
    pub(crate) ai: Option<AiState>,
    /// Velocity to restore once a running stun expires.
    pub(crate) stunned_from: Option<Vec2>,
    pub(crate) collected: bool,
    /// Scheduled for removal at the next cleanup.
    pub(crate) dying: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: EntityKind, position: Vec2, velocity: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            velocity,
            half_extents: half_extents_for(kind),
            health: health_for(kind),
            ai: None,
            stunned_from: None,
            collected: false,
            dying: false,
        }
    }

    pub(crate) fn with_ai(mut self, ai: AiState) -> Self {
        self.ai = Some(ai);
        self
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.dying
    }

    pub(crate) fn is_stunned(&self) -> bool {
        self.stunned_from.is_some()
    }

    pub(crate) fn snapshot(&self, in_grace: bool, action_ready: bool) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            half_extents: self.half_extents,
            health: self.health,
            ai: self.ai,
            stunned: self.is_stunned(),
            in_grace,
            action_ready,
            collected: self.collected,
            dying: self.dying,
        }
    }

    /// Margin beyond the arena edge after which the entity is discarded.
    ///
    /// `None` marks entities that never leave on their own.
    pub(crate) fn exit_margin(&self) -> Option<f32> {
        match self.kind {
            EntityKind::Player => None,
            EntityKind::Boss(BossKind::Lucius | BossKind::Bellatrix) => None,
            EntityKind::Boss(BossKind::Dementor) => Some(200.0),
            EntityKind::Enemy | EntityKind::Boss(BossKind::Troll) => Some(100.0),
            EntityKind::Projectile(ProjectileKind::Curse(_)) => Some(100.0),
            EntityKind::Projectile(_) => Some(50.0),
            EntityKind::Pickup(_) => Some(50.0),
            EntityKind::Effect(_) => Some(100.0),
        }
    }
}

/// Registry that stores entities and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct EntityRegistry {
    entries: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

impl EntityRegistry {
    /// Creates an empty registry with a fresh identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Allocates the next identifier. Identifiers survive restarts so stale
    /// handles held by collaborators never alias new entities.
    pub(crate) fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        let _ = self.entries.insert(entity.id, entity);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entries.get_mut(&id)
    }

    /// Returns the entity only when it is still acting this tick.
    pub(crate) fn active_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entries.get_mut(&id).filter(|entity| entity.is_active())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entries.values_mut()
    }

    /// Identifiers of active entities matching the predicate, in id order.
    pub(crate) fn ids_where(&self, mut predicate: impl FnMut(&Entity) -> bool) -> Vec<EntityId> {
        self.entries
            .values()
            .filter(|entity| entity.is_active() && predicate(entity))
            .map(|entity| entity.id)
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Half extents of the bounding box associated with an entity kind.
pub(crate) fn half_extents_for(kind: EntityKind) -> Vec2 {
    match kind {
        EntityKind::Player => Vec2::new(20.0, 30.0),
        EntityKind::Enemy => Vec2::new(40.0, 40.0),
        EntityKind::Boss(BossKind::Troll) => Vec2::new(60.0, 70.0),
        EntityKind::Boss(_) => Vec2::new(45.0, 55.0),
        EntityKind::Projectile(ProjectileKind::Bolt) => Vec2::new(8.0, 16.0),
        EntityKind::Projectile(ProjectileKind::Curse(CurseKind::Minor)) => Vec2::splat(10.0),
        EntityKind::Projectile(ProjectileKind::Curse(_)) => Vec2::splat(15.0),
        EntityKind::Projectile(ProjectileKind::Patronus { .. }) => Vec2::splat(25.0),
        EntityKind::Projectile(ProjectileKind::UltimateOrb) => Vec2::splat(45.0),
        EntityKind::Pickup(_) => Vec2::splat(18.0),
        EntityKind::Effect(_) => Vec2::splat(20.0),
    }
}

fn health_for(kind: EntityKind) -> Health {
    match kind {
        EntityKind::Player => Health::full(crate::PLAYER_LIVES),
        EntityKind::Enemy => Health::full(1.0),
        EntityKind::Boss(boss) => Health::full(boss.health()),
        _ => Health::INVULNERABLE,
    }
}
