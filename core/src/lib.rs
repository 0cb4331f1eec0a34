#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spellfall simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! collaborators to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command batches.

mod sink;
pub mod timer;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use sink::{EventBus, EventSink, RecordingSink};
pub use timer::{Timer, TimerSet};

/// Dimensions of the playfield measured in world units (pixels).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    /// Width of the visible playfield.
    pub width: f32,
    /// Height of the visible playfield.
    pub height: f32,
}

impl Arena {
    /// Creates an arena with the provided dimensions.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Reports whether the point lies farther than `margin` outside the arena.
    #[must_use]
    pub fn is_outside(&self, point: Vec2, margin: f32) -> bool {
        point.x < -margin
            || point.x > self.width + margin
            || point.y < -margin
            || point.y > self.height + margin
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Describes the lifecycle phase of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameState {
    /// No session is running; the world waits for a start command.
    Idle,
    /// The session is live and the tick loop mutates the world.
    Playing,
    /// The player ran out of lives; the world is frozen until restarted.
    GameOver,
}

/// Unique identifier assigned to an entity. Identifiers are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Playable characters, each owning one signature ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Character {
    /// Casts the Patronus charm.
    Harry,
    /// Casts Stupefy.
    Hermione,
    /// Casts Wingardium Leviosa.
    Ron,
}

impl Character {
    /// Every playable character in selection order.
    pub const ALL: [Self; 3] = [Self::Harry, Self::Hermione, Self::Ron];

    /// Ability this character is allowed to invoke.
    #[must_use]
    pub const fn ability(self) -> Ability {
        match self {
            Self::Harry => Ability::Patronus,
            Self::Hermione => Ability::Stupefy,
            Self::Ron => Ability::Wingardium,
        }
    }

    /// Lower-case name used by adapters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Harry => "harry",
            Self::Hermione => "hermione",
            Self::Ron => "ron",
        }
    }
}

/// Special abilities gated by independent cooldowns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    /// Homing guardians that banish dementors.
    Patronus,
    /// Stuns every enemy that is not immune.
    Stupefy,
    /// Lifts trolls and attaches a floating weapon to each.
    Wingardium,
}

impl Ability {
    /// Every ability in display order.
    pub const ALL: [Self; 3] = [Self::Patronus, Self::Stupefy, Self::Wingardium];

    /// Character that owns the ability.
    #[must_use]
    pub const fn owner(self) -> Character {
        match self {
            Self::Patronus => Character::Harry,
            Self::Stupefy => Character::Hermione,
            Self::Wingardium => Character::Ron,
        }
    }
}

/// Boss-tier enemies. Only one of them may be alive at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BossKind {
    /// Patrols horizontally and fires emerald curses.
    Lucius,
    /// Holds position and fires curses at the player's predicted position.
    Bellatrix,
    /// Slow heavy boss that shakes the ground.
    Troll,
    /// Drains the player and only yields to the Patronus.
    Dementor,
}

impl BossKind {
    /// Every boss kind in schedule order.
    pub const ALL: [Self; 4] = [Self::Lucius, Self::Bellatrix, Self::Troll, Self::Dementor];

    /// Health the boss spawns with.
    #[must_use]
    pub const fn health(self) -> f32 {
        match self {
            Self::Lucius => 8.0,
            Self::Bellatrix => 10.0,
            Self::Troll => 18.0,
            Self::Dementor => 1.0,
        }
    }

    /// Speed at which the boss enters the playfield.
    ///
    /// Dementors steer themselves from the first tick and report zero.
    #[must_use]
    pub const fn descent_speed(self) -> f32 {
        match self {
            Self::Lucius => 50.0,
            Self::Bellatrix => 40.0,
            Self::Troll => 30.0,
            Self::Dementor => 0.0,
        }
    }
}

/// Movement pattern assigned to a regular enemy at spawn time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MovementPattern {
    /// Straight vertical descent.
    Drift,
    /// Slow descent while the horizontal direction flips on a fixed period.
    PingPong,
    /// Sinusoidal sideways motion during a slow descent.
    ZigZag,
    /// Steers toward the player while descending.
    Homing,
}

impl MovementPattern {
    /// Every pattern the spawner may roll.
    pub const ALL: [Self; 4] = [Self::Drift, Self::PingPong, Self::ZigZag, Self::Homing];
}

/// Hostile projectile variants, each dealing a fixed amount of damage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurseKind {
    /// Fired by regular enemies.
    Minor,
    /// Fired by Lucius.
    Emerald,
    /// Fired by Bellatrix toward the player's predicted position.
    Tracking,
}

impl CurseKind {
    /// Damage dealt to the player on impact.
    #[must_use]
    pub const fn damage(self) -> f32 {
        match self {
            Self::Minor => 0.5,
            Self::Emerald => 1.0,
            Self::Tracking => 1.5,
        }
    }
}

/// Projectile variants tracked by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    /// Basic bolt cast by the player.
    Bolt,
    /// Curse fired by an enemy or boss.
    Curse(CurseKind),
    /// Patronus guardian, homing on its assigned dementor when present.
    Patronus {
        /// Dementor the guardian steers toward.
        target: Option<EntityId>,
    },
    /// Large orb launched by spending an ultimate charge.
    UltimateOrb,
}

impl ProjectileKind {
    /// Reports whether the projectile belongs to the player.
    #[must_use]
    pub const fn is_friendly(self) -> bool {
        !matches!(self, Self::Curse(_))
    }

    /// Damage source recorded when the projectile lands.
    #[must_use]
    pub const fn source(self) -> DamageSource {
        match self {
            Self::Bolt => DamageSource::Bolt,
            Self::Curse(_) => DamageSource::Curse,
            Self::Patronus { .. } => DamageSource::Patronus,
            Self::UltimateOrb => DamageSource::UltimateOrb,
        }
    }
}

/// Consumables dropped into the playfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PickupKind {
    /// Common snack healing half a life.
    ChocolateFrog,
    /// Drink healing a full life.
    Butterbeer,
    /// Heals a full life and triggers Ron mode when collected as Ron.
    Chicken,
}

impl PickupKind {
    /// Lives restored on collection.
    #[must_use]
    pub const fn heal(self) -> f32 {
        match self {
            Self::ChocolateFrog => 0.5,
            Self::Butterbeer | Self::Chicken => 1.0,
        }
    }
}

/// Helper entities that exist only to deliver an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Weapon lifted by Wingardium Leviosa that strikes its troll.
    FloatingWeapon {
        /// Troll the weapon follows and strikes.
        troll: EntityId,
    },
}

/// Kind tag used to dispatch per-entity behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The player avatar.
    Player,
    /// Regular enemy.
    Enemy,
    /// Boss-tier enemy.
    Boss(BossKind),
    /// Projectile in flight.
    Projectile(ProjectileKind),
    /// Consumable pickup simulated by the physics bridge.
    Pickup(PickupKind),
    /// Helper effect.
    Effect(EffectKind),
}

impl EntityKind {
    /// Reports whether the entity can be damaged by the player.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Enemy | Self::Boss(_))
    }

    /// Boss kind carried by the tag, if any.
    #[must_use]
    pub const fn boss(self) -> Option<BossKind> {
        match self {
            Self::Boss(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Origin of a damage application, used for immunity rules and scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageSource {
    /// Player bolt.
    Bolt,
    /// Patronus guardian.
    Patronus,
    /// Ultimate orb.
    UltimateOrb,
    /// Floating weapon striking its troll.
    FloatingWeapon,
    /// Enemy curse hitting the player.
    Curse,
    /// Body contact between the player and an enemy.
    Contact,
    /// Troll ground shake.
    TrollShake,
    /// Dementor drain.
    DementorDrain,
}

/// Player-initiated actions that may be denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Casting a basic bolt.
    Bolt,
    /// Invoking a signature ability.
    Ability(Ability),
    /// Spending an ultimate charge.
    Ultimate,
    /// Switching to another character.
    SwitchCharacter(Character),
}

/// Reasons a player action is rejected without changing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// No session is being played.
    NotPlaying,
    /// The active character does not own the ability.
    WrongCharacter,
    /// A cooldown is still running.
    CooldownActive {
        /// Time left on the cooldown.
        remaining: Duration,
    },
    /// The ability has nothing to act upon.
    NoTarget,
    /// No ultimate charge is available.
    NoCharges,
    /// Mana is below the cost of the action.
    InsufficientMana,
    /// The requested character is already active.
    AlreadyActive,
}

/// Reasons an incoming hit on the player was absorbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// Ron mode grants full immunity.
    Mode,
    /// The post-hit invulnerability window is still running.
    PostHit,
}

/// Current health of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Health record used by entities that cannot be damaged.
    pub const INVULNERABLE: Self = Self {
        current: 0.0,
        max: 0.0,
    };

    /// Creates a full health record with the provided maximum.
    #[must_use]
    pub const fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Remaining health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Reports whether the record belongs to an undamageable entity.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.max <= 0.0
    }

    /// Reports whether the entity crossed the death threshold.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        !self.is_invulnerable() && self.current <= 0.0
    }

    /// Subtracts damage, clamping at zero.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).max(0.0);
    }

    /// Adds health, clamping at the maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.current;
        self.current = (self.current + amount.max(0.0)).min(self.max);
        self.current - before
    }
}

/// Dementor behavior phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DementorPhase {
    /// Closing in on the player.
    Approaching,
    /// Backing away after a drain.
    Retreating,
    /// Waiting before the next approach.
    Holding,
}

/// Troll behavior phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrollPhase {
    /// Regular state with dampened damage intake.
    Lumbering,
    /// Lifted by Wingardium Leviosa and vulnerable to its floating weapon.
    Floating {
        /// Floating weapon strikes received so far.
        hits: u8,
    },
}

/// Per-entity behavior state. Exactly one variant is active per entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AiState {
    /// Regular enemy following its spawn-time pattern.
    Pattern {
        /// Pattern fixed for the entity's lifetime.
        pattern: MovementPattern,
        /// Descent speed rolled at spawn.
        speed: f32,
        /// Time spent following the pattern.
        clock: Duration,
        /// Horizontal heading used by the ping-pong pattern.
        heading: f32,
    },
    /// Lucius: descends to an entry line, then patrols horizontally.
    Patrol {
        /// Whether the entry line was reached.
        entered: bool,
        /// Horizontal heading, `-1` or `1`.
        heading: f32,
    },
    /// Bellatrix: descends to an entry line, then holds position.
    Sentinel {
        /// Whether the entry line was reached.
        entered: bool,
    },
    /// Troll state machine.
    Troll {
        /// Active troll phase.
        phase: TrollPhase,
    },
    /// Dementor state machine.
    Dementor {
        /// Active dementor phase.
        phase: DementorPhase,
        /// Time spent in the active phase.
        in_phase: Duration,
    },
}

impl AiState {
    /// Reports whether the state marks a floating troll.
    #[must_use]
    pub const fn is_floating(&self) -> bool {
        matches!(
            self,
            Self::Troll {
                phase: TrollPhase::Floating { .. }
            }
        )
    }
}

/// Spawn decision produced by the spawn director.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnEvent {
    /// A regular enemy entering from the top edge.
    Regular {
        /// Horizontal spawn coordinate.
        x: f32,
        /// Movement pattern fixed for the enemy's lifetime.
        pattern: MovementPattern,
        /// Descent speed in units per second.
        speed: f32,
        /// Delay before the enemy's first attack.
        first_attack: Duration,
    },
    /// A boss-tier enemy entering from the top edge.
    Boss {
        /// Kind of boss to create.
        kind: BossKind,
        /// Horizontal spawn coordinate.
        x: f32,
    },
    /// A consumable dropped from the top edge.
    Pickup {
        /// Kind of pickup to create.
        kind: PickupKind,
        /// Horizontal spawn coordinate.
        x: f32,
    },
}

/// Pacing derived from elapsed play time and score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Difficulty {
    /// Active tier, starting at zero.
    pub tier: usize,
    /// Interval between regular enemy spawns.
    pub regular_interval: Duration,
    /// Descent speed of newly spawned regular enemies.
    pub enemy_speed: f32,
    /// Ratio between the current and the base enemy speed.
    pub speed_multiplier: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            tier: 0,
            regular_interval: Duration::from_secs(5),
            enemy_speed: 60.0,
            speed_multiplier: 1.0,
        }
    }
}

/// Interaction category of a confirmed collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Contact {
    /// A friendly projectile reached an enemy or boss.
    Projectile,
    /// A curse reached the player.
    Curse,
    /// The player touched an enemy or boss.
    Body,
    /// The player touched a pickup.
    Pickup,
}

/// Confirmed collision produced for a single tick.
///
/// `first` is the projectile for [`Contact::Projectile`] and
/// [`Contact::Curse`] pairs and the player otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Interaction category.
    pub contact: Contact,
    /// Initiating entity.
    pub first: EntityId,
    /// Entity that was reached.
    pub second: EntityId,
}

/// Position and velocity reported back by the physics bridge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySync {
    /// Entity the body mirrors.
    pub entity: EntityId,
    /// Position after stepping.
    pub position: Vec2,
    /// Velocity after stepping.
    pub velocity: Vec2,
}

/// Remaining cooldown of a single ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AbilityCooldown {
    /// Ability the cooldown gates.
    pub ability: Ability,
    /// Time left before the ability is ready.
    pub remaining: Duration,
    /// Full length of the running cooldown, zero when idle.
    pub total: Duration,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts a fresh session with the chosen character.
    StartGame {
        /// Character controlled by the player.
        character: Character,
    },
    /// Clears every entity, timer and counter and returns to idle.
    RestartGame,
    /// Switches the active character, subject to the switch cooldown.
    SwitchCharacter {
        /// Character to activate.
        character: Character,
    },
    /// Invokes a signature ability after validating eligibility.
    InvokeAbility {
        /// Ability to invoke.
        ability: Ability,
    },
    /// Spends an ultimate charge to launch an orb.
    InvokeUltimate,
    /// Casts a basic bolt, spending mana.
    CastBolt,
    /// Sets the velocity requested by the input collaborator.
    SteerPlayer {
        /// Desired player velocity; clamped to the maximum speed.
        velocity: Vec2,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Creates an entity decided by the spawn director.
    Spawn {
        /// Spawn decision to realise.
        spawn: SpawnEvent,
    },
    /// Replaces an entity's behavior state and velocity.
    UpdateAi {
        /// Entity whose behavior advanced.
        entity: EntityId,
        /// New behavior state.
        ai: AiState,
        /// New velocity.
        velocity: Vec2,
    },
    /// Replaces the velocity of a projectile or effect.
    SetVelocity {
        /// Entity to steer.
        entity: EntityId,
        /// New velocity.
        velocity: Vec2,
    },
    /// Fires a curse from an enemy and re-arms its attack cooldown.
    FireCurse {
        /// Enemy casting the curse.
        caster: EntityId,
        /// Curse variant.
        kind: CurseKind,
        /// Launch velocity.
        velocity: Vec2,
        /// Cooldown before the caster may attack again, if it uses one.
        cooldown: Option<Duration>,
    },
    /// Lets a troll shake the ground and re-arms its shake timer.
    TrollShake {
        /// Troll producing the shake.
        troll: EntityId,
        /// Whether the player stands inside the shake radius.
        hits_player: bool,
    },
    /// Lets a floating weapon strike its troll and re-arms the strike timer.
    WeaponStrike {
        /// Weapon delivering the strike.
        weapon: EntityId,
    },
    /// Moves every kinematic entity by its velocity.
    Integrate {
        /// Duration to integrate over.
        dt: Duration,
    },
    /// Writes physics bridge results back onto pickup entities.
    SyncBodies {
        /// Stepped body states.
        bodies: Vec<BodySync>,
    },
    /// Applies damage to an enemy or boss.
    ApplyDamage {
        /// Entity receiving the damage.
        target: EntityId,
        /// Raw damage before dampening rules.
        amount: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Applies damage to the player.
    DamagePlayer {
        /// Lives removed by the hit.
        amount: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Removes a projectile that landed a hit.
    ConsumeProjectile {
        /// Projectile to remove.
        projectile: EntityId,
    },
    /// Collects a pickup touched by the player.
    CollectPickup {
        /// Pickup to collect.
        pickup: EntityId,
    },
    /// Adds points to the score.
    AwardScore {
        /// Points to add.
        points: u64,
    },
    /// Grants the player one ultimate charge.
    GrantUltimateCharge,
    /// Decrements every running timer and resolves expirations.
    AdvanceTimers {
        /// Duration to subtract.
        dt: Duration,
    },
    /// Schedules an entity for removal at the next cleanup.
    Despawn {
        /// Entity to remove.
        entity: EntityId,
    },
    /// Removes every entity scheduled for destruction.
    Cleanup,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// A new session started.
    GameStarted {
        /// Character chosen for the session.
        character: Character,
    },
    /// The world was cleared and returned to idle.
    GameRestarted,
    /// The score changed.
    ScoreChanged {
        /// New total score.
        score: u64,
    },
    /// The player's lives changed.
    LivesChanged {
        /// Lives left.
        current: f32,
        /// Maximum lives.
        max: f32,
    },
    /// The player's mana changed.
    ManaChanged {
        /// Mana left.
        current: f32,
        /// Maximum mana.
        max: f32,
    },
    /// Ability cooldowns changed.
    ///
    /// Published when an ability is used and when a cooldown expires, not on
    /// every tick. Consumers that render a countdown read
    /// `spellfall_world::query::cooldowns` each frame instead.
    CooldownsChanged {
        /// Cooldown of every ability in display order.
        cooldowns: Vec<AbilityCooldown>,
    },
    /// The active character changed.
    CharacterSwitched {
        /// Newly active character.
        character: Character,
        /// Cooldown before the next switch is allowed.
        cooldown: Duration,
    },
    /// A signature ability was invoked.
    AbilityInvoked {
        /// Ability that fired.
        ability: Ability,
    },
    /// A player action was rejected without changing state.
    ActionDenied {
        /// Action that was attempted.
        action: Action,
        /// Why the action was rejected.
        reason: DenialReason,
    },
    /// The number of ultimate charges changed.
    UltimateChargesChanged {
        /// Charges available.
        charges: u32,
    },
    /// An entity was created.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Kind of entity created.
        kind: EntityKind,
    },
    /// A boss other than a dementor entered the playfield.
    BossSpawned {
        /// Identifier assigned to the boss.
        entity: EntityId,
        /// Kind of boss.
        boss: BossKind,
    },
    /// A dementor entered the playfield.
    DementorSpawned {
        /// Identifier assigned to the dementor.
        entity: EntityId,
    },
    /// An enemy took damage and survived.
    EnemyDamaged {
        /// Entity that was hit.
        entity: EntityId,
        /// Damage applied after dampening rules.
        amount: f32,
        /// Health left.
        remaining: f32,
    },
    /// A hit was rejected because the target is immune to its source.
    Immune {
        /// Entity that shrugged off the hit.
        entity: EntityId,
        /// Origin of the rejected hit.
        source: DamageSource,
    },
    /// An enemy or boss crossed its death threshold.
    EnemyDefeated {
        /// Entity that died.
        entity: EntityId,
        /// Kind of the entity.
        kind: EntityKind,
        /// Source of the killing blow.
        source: DamageSource,
    },
    /// A boss other than a dementor was defeated.
    BossDefeated {
        /// Entity that died.
        entity: EntityId,
        /// Kind of boss.
        boss: BossKind,
    },
    /// A dementor was banished.
    DementorDefeated {
        /// Entity that died.
        entity: EntityId,
    },
    /// An enemy was stunned.
    EnemyStunned {
        /// Stunned entity.
        entity: EntityId,
        /// Length of the stun.
        duration: Duration,
    },
    /// A stun wore off and movement resumed.
    StunExpired {
        /// Entity that recovered.
        entity: EntityId,
    },
    /// A troll started floating.
    TrollFloating {
        /// Troll lifted by the ability.
        troll: EntityId,
    },
    /// A troll shook the ground.
    TrollShook {
        /// Troll producing the shake.
        troll: EntityId,
    },
    /// A projectile was launched.
    ProjectileFired {
        /// Identifier of the projectile.
        entity: EntityId,
        /// Kind of projectile.
        kind: ProjectileKind,
    },
    /// The player lost lives.
    PlayerDamaged {
        /// Lives removed.
        amount: f32,
        /// Origin of the hit.
        source: DamageSource,
    },
    /// A hit on the player was absorbed.
    PlayerHitBlocked {
        /// Origin of the hit.
        source: DamageSource,
        /// Why the hit was absorbed.
        reason: BlockReason,
    },
    /// A pickup was collected.
    PickupCollected {
        /// Pickup entity.
        entity: EntityId,
        /// Kind of pickup.
        kind: PickupKind,
        /// Lives actually restored.
        healed: f32,
    },
    /// Ron mode toggled.
    ModeChanged {
        /// Whether full immunity is active.
        active: bool,
    },
    /// An entity left the world.
    EntityRemoved {
        /// Entity that was removed.
        entity: EntityId,
    },
    /// The difficulty tier changed.
    DifficultyChanged {
        /// New tier, starting at zero.
        tier: usize,
        /// Interval between regular enemy spawns.
        regular_interval: Duration,
    },
    /// The session ended.
    GameOver {
        /// Final score.
        score: u64,
        /// Character active at the end.
        character: Character,
    },
}

impl Event {
    /// Tag collaborators subscribe to.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::TimeAdvanced { .. } => "time-advanced",
            Self::GameStarted { .. } => "game-started",
            Self::GameRestarted => "game-restarted",
            Self::ScoreChanged { .. } => "score-updated",
            Self::LivesChanged { .. } => "lives-updated",
            Self::ManaChanged { .. } => "mana-updated",
            Self::CooldownsChanged { .. } => "skill-cooldowns-updated",
            Self::CharacterSwitched { .. } => "character-switched",
            Self::AbilityInvoked { .. } => "ability-invoked",
            Self::ActionDenied { .. } => "action-denied",
            Self::UltimateChargesChanged { .. } => "ultimate-charges-updated",
            Self::EntitySpawned { .. } => "entity-spawned",
            Self::BossSpawned { .. } => "boss-spawned",
            Self::DementorSpawned { .. } => "dementor-spawned",
            Self::EnemyDamaged { .. } => "enemy-damaged",
            Self::Immune { .. } => "immune",
            Self::EnemyDefeated { .. } => "enemy-defeated",
            Self::BossDefeated { .. } => "boss-defeated",
            Self::DementorDefeated { .. } => "dementor-defeated",
            Self::EnemyStunned { .. } => "enemy-stunned",
            Self::StunExpired { .. } => "stun-expired",
            Self::TrollFloating { .. } => "troll-floating",
            Self::TrollShook { .. } => "troll-shook",
            Self::ProjectileFired { .. } => "projectile-fired",
            Self::PlayerDamaged { .. } => "player-damaged",
            Self::PlayerHitBlocked { .. } => "player-hit-blocked",
            Self::PickupCollected { .. } => "pickup-collected",
            Self::ModeChanged { .. } => "ron-mode-changed",
            Self::EntityRemoved { .. } => "entity-removed",
            Self::DifficultyChanged { .. } => "difficulty-changed",
            Self::GameOver { .. } => "game-over",
        }
    }
}

/// Immutable representation of a single entity used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Kind tag of the entity.
    pub kind: EntityKind,
    /// Center of the entity.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Half extents of the bounding box.
    pub half_extents: Vec2,
    /// Current health.
    pub health: Health,
    /// Behavior state, if the entity runs one.
    pub ai: Option<AiState>,
    /// Whether a stun suppresses movement and attacks.
    pub stunned: bool,
    /// Whether the entity is a projectile still inside its grace window.
    pub in_grace: bool,
    /// Whether the entity's periodic action (attack, shake, strike) is ready.
    pub action_ready: bool,
    /// Whether a pickup was already collected and only lingers for its bounce.
    pub collected: bool,
    /// Whether the entity is scheduled for removal.
    pub dying: bool,
}

impl EntitySnapshot {
    /// Reports whether the snapshot describes a floating troll.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.ai.is_some_and(|ai| ai.is_floating())
    }
}

/// Read-only snapshot describing all live entities.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot for an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Snapshot of the player avatar, if one exists.
    #[must_use]
    pub fn player(&self) -> Option<&EntitySnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.kind == EntityKind::Player)
    }

    /// Reports whether any boss-tier entity is alive.
    #[must_use]
    pub fn boss_present(&self) -> bool {
        self.snapshots
            .iter()
            .any(|snapshot| snapshot.kind.boss().is_some() && !snapshot.dying)
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Final result handed to the persistence collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSummary {
    /// Final score.
    pub score: u64,
    /// Character active when the session ended.
    pub character: Character,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_own_exactly_their_ability() {
        for character in Character::ALL {
            assert_eq!(character.ability().owner(), character);
        }
    }

    #[test]
    fn health_clamps_between_zero_and_max() {
        let mut health = Health::full(5.0);
        health.damage(7.5);
        assert_eq!(health.current(), 0.0);
        assert!(health.is_depleted());

        let restored = health.heal(9.0);
        assert_eq!(restored, 5.0);
        assert_eq!(health.current(), 5.0);
    }

    #[test]
    fn invulnerable_health_is_never_depleted() {
        let mut health = Health::INVULNERABLE;
        health.damage(1.0);
        assert!(!health.is_depleted());
    }

    #[test]
    fn entity_view_sorts_and_finds_by_id() {
        let snapshot = |id: u32, kind: EntityKind| EntitySnapshot {
            id: EntityId::new(id),
            kind,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            half_extents: Vec2::splat(10.0),
            health: Health::full(1.0),
            ai: None,
            stunned: false,
            in_grace: false,
            action_ready: false,
            collected: false,
            dying: false,
        };
        let view = EntityView::from_snapshots(vec![
            snapshot(7, EntityKind::Boss(BossKind::Dementor)),
            snapshot(2, EntityKind::Player),
        ]);

        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 7]);
        assert!(view.get(EntityId::new(7)).is_some());
        assert!(view.get(EntityId::new(3)).is_none());
        assert!(view.boss_present());
        assert_eq!(view.player().map(|player| player.id), Some(EntityId::new(2)));
    }

    #[test]
    fn game_summary_round_trips_through_bincode() {
        let summary = GameSummary {
            score: 4_200,
            character: Character::Hermione,
        };
        let bytes = bincode::serialize(&summary).expect("serialize");
        let restored: GameSummary = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, summary);
    }
}
