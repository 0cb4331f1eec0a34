//! Player actions: abilities, ultimate, bolts, steering and pickups.

use std::time::Duration;

use glam::Vec2;
use spellfall_core::{
    Ability, Action, AiState, BossKind, Character, Command, DenialReason, EffectKind, EntityId,
    EntityKind, Event, PickupKind, ProjectileKind, TrollPhase,
};
use tracing::{debug, info};

use crate::entities::Entity;
use crate::{TimerKey, World, PICKUP_LINGER, PLAYER_SPEED, WEAPON_STRIKE_PERIOD};

const SWITCH_COOLDOWN: Duration = Duration::from_secs(15);
const STUN_DURATION: Duration = Duration::from_secs(10);
const GRACE_WINDOW: Duration = Duration::from_millis(100);
const MUZZLE_OFFSET: f32 = 50.0;

const BOLT_COST: f32 = 1.0;
const BOLT_SPEED: f32 = 400.0;
const PATRONUS_SPEED: f32 = 400.0;
const PATRONUS_FALLBACK_SPEED: f32 = 300.0;
const ORB_SPEED: f32 = 250.0;
const ORB_LIFETIME: Duration = Duration::from_secs(3);
const WEAPON_OFFSET: Vec2 = Vec2::new(60.0, -30.0);
const MODE_DURATION: Duration = Duration::from_secs(15);

fn cooldown_of(ability: Ability) -> Duration {
    match ability {
        Ability::Patronus | Ability::Stupefy => Duration::from_secs(20),
        Ability::Wingardium => Duration::from_secs(25),
    }
}

/// Player action requested by the command, if it is one.
pub(crate) fn action_of(command: &Command) -> Option<Action> {
    match command {
        Command::CastBolt => Some(Action::Bolt),
        Command::InvokeAbility { ability } => Some(Action::Ability(*ability)),
        Command::InvokeUltimate => Some(Action::Ultimate),
        Command::SwitchCharacter { character } => Some(Action::SwitchCharacter(*character)),
        _ => None,
    }
}

pub(crate) fn deny(action: Action, reason: DenialReason, out_events: &mut Vec<Event>) {
    debug!(?action, ?reason, "action_denied");
    out_events.push(Event::ActionDenied { action, reason });
}

pub(crate) fn switch_character(
    world: &mut World,
    character: Character,
    out_events: &mut Vec<Event>,
) {
    let action = Action::SwitchCharacter(character);
    if world.character == character {
        deny(action, DenialReason::AlreadyActive, out_events);
        return;
    }
    let remaining = world.timers.remaining(TimerKey::CharacterSwitch);
    if !remaining.is_zero() {
        deny(action, DenialReason::CooldownActive { remaining }, out_events);
        return;
    }
    world.character = character;
    world.timers.start(TimerKey::CharacterSwitch, SWITCH_COOLDOWN);
    info!(character = character.name(), "character_switched");
    out_events.push(Event::CharacterSwitched {
        character,
        cooldown: SWITCH_COOLDOWN,
    });
}

pub(crate) fn invoke_ability(world: &mut World, ability: Ability, out_events: &mut Vec<Event>) {
    let action = Action::Ability(ability);
    if world.character.ability() != ability {
        deny(action, DenialReason::WrongCharacter, out_events);
        return;
    }
    let remaining = world.timers.remaining(TimerKey::Ability(ability));
    if !remaining.is_zero() {
        deny(action, DenialReason::CooldownActive { remaining }, out_events);
        return;
    }
    let Some(origin) = world.player_entity().map(|player| player.position) else {
        debug!(?ability, "ability_without_player");
        return;
    };

    match ability {
        Ability::Patronus => cast_patronus(world, origin, out_events),
        Ability::Stupefy => cast_stupefy(world, out_events),
        Ability::Wingardium => {
            let trolls = world.entities.ids_where(|entity| {
                entity.kind == EntityKind::Boss(BossKind::Troll)
                    && !entity.ai.is_some_and(|ai| ai.is_floating())
            });
            if trolls.is_empty() {
                deny(action, DenialReason::NoTarget, out_events);
                return;
            }
            for troll in trolls {
                lift_troll(world, troll, out_events);
            }
        }
    }

    world.timers.start(TimerKey::Ability(ability), cooldown_of(ability));
    info!(?ability, "ability_invoked");
    out_events.push(Event::AbilityInvoked { ability });
    out_events.push(Event::CooldownsChanged {
        cooldowns: world.cooldowns(),
    });
}

fn cast_patronus(world: &mut World, origin: Vec2, out_events: &mut Vec<Event>) {
    let launch = origin - Vec2::new(0.0, MUZZLE_OFFSET);
    let dementors: Vec<(EntityId, Vec2)> = world
        .entities
        .iter()
        .filter(|entity| {
            entity.is_active() && entity.kind == EntityKind::Boss(BossKind::Dementor)
        })
        .map(|entity| (entity.id, entity.position))
        .collect();

    if dementors.is_empty() {
        let _ = launch_projectile(
            world,
            ProjectileKind::Patronus { target: None },
            launch,
            Vec2::new(0.0, -PATRONUS_FALLBACK_SPEED),
            out_events,
        );
        return;
    }
    for (dementor, position) in dementors {
        let velocity = (position - launch).normalize_or_zero() * PATRONUS_SPEED;
        let _ = launch_projectile(
            world,
            ProjectileKind::Patronus {
                target: Some(dementor),
            },
            launch,
            velocity,
            out_events,
        );
    }
}

fn cast_stupefy(world: &mut World, out_events: &mut Vec<Event>) {
    let targets = world.entities.ids_where(|entity| {
        entity.kind.is_hostile() && entity.kind != EntityKind::Boss(BossKind::Dementor)
    });
    for id in targets {
        let Some(entity) = world.entities.active_mut(id) else {
            continue;
        };
        if entity.stunned_from.is_none() {
            entity.stunned_from = Some(entity.velocity);
        }
        entity.velocity = Vec2::ZERO;
        world.timers.start(TimerKey::Stun(id), STUN_DURATION);
        out_events.push(Event::EnemyStunned {
            entity: id,
            duration: STUN_DURATION,
        });
    }
}

fn lift_troll(world: &mut World, troll: EntityId, out_events: &mut Vec<Event>) {
    let Some(entity) = world.entities.active_mut(troll) else {
        return;
    };
    entity.ai = Some(AiState::Troll {
        phase: TrollPhase::Floating { hits: 0 },
    });
    let position = entity.position;
    let _ = world.timers.cancel(TimerKey::Shake(troll));

    let weapon = world.entities.allocate();
    let _ = world.spawn(
        Entity::new(
            weapon,
            EntityKind::Effect(EffectKind::FloatingWeapon { troll }),
            position + WEAPON_OFFSET,
            Vec2::ZERO,
        ),
        out_events,
    );
    world.timers.start(TimerKey::Strike(weapon), WEAPON_STRIKE_PERIOD);
    out_events.push(Event::TrollFloating { troll });
}

fn launch_projectile(
    world: &mut World,
    kind: ProjectileKind,
    position: Vec2,
    velocity: Vec2,
    out_events: &mut Vec<Event>,
) -> EntityId {
    let id = world.entities.allocate();
    world.timers.start(TimerKey::Grace(id), GRACE_WINDOW);
    world.spawn(
        Entity::new(id, EntityKind::Projectile(kind), position, velocity),
        out_events,
    )
}

pub(crate) fn invoke_ultimate(world: &mut World, out_events: &mut Vec<Event>) {
    if world.ultimate_charges == 0 {
        deny(Action::Ultimate, DenialReason::NoCharges, out_events);
        return;
    }
    let Some(origin) = world.player_entity().map(|player| player.position) else {
        debug!("ultimate_without_player");
        return;
    };
    world.ultimate_charges -= 1;
    let orb = launch_projectile(
        world,
        ProjectileKind::UltimateOrb,
        origin - Vec2::new(0.0, MUZZLE_OFFSET),
        Vec2::new(0.0, -ORB_SPEED),
        out_events,
    );
    world.timers.start(TimerKey::Lifetime(orb), ORB_LIFETIME);
    info!(charges = world.ultimate_charges, "ultimate_invoked");
    out_events.push(Event::UltimateChargesChanged {
        charges: world.ultimate_charges,
    });
}

pub(crate) fn cast_bolt(world: &mut World, out_events: &mut Vec<Event>) {
    if world.mana < BOLT_COST {
        deny(Action::Bolt, DenialReason::InsufficientMana, out_events);
        return;
    }
    let Some(origin) = world.player_entity().map(|player| player.position) else {
        debug!("bolt_without_player");
        return;
    };
    world.mana -= BOLT_COST;
    out_events.push(world.mana_event());
    let _ = launch_projectile(
        world,
        ProjectileKind::Bolt,
        origin - Vec2::new(0.0, MUZZLE_OFFSET),
        Vec2::new(0.0, -BOLT_SPEED),
        out_events,
    );
}

pub(crate) fn steer(world: &mut World, velocity: Vec2) {
    let Some(player) = world.player.and_then(|id| world.entities.active_mut(id)) else {
        debug!("steer_without_player");
        return;
    };
    player.velocity = velocity.clamp_length_max(PLAYER_SPEED);
}

pub(crate) fn collect_pickup(world: &mut World, pickup: EntityId, out_events: &mut Vec<Event>) {
    let Some(EntityKind::Pickup(kind)) = world
        .entities
        .active_mut(pickup)
        .filter(|entity| !entity.collected)
        .map(|entity| {
            entity.collected = true;
            entity.kind
        })
    else {
        debug!(pickup = pickup.get(), "collect_for_missing_pickup");
        return;
    };
    world.timers.start(TimerKey::Lifetime(pickup), PICKUP_LINGER);

    let healed = world
        .player
        .and_then(|id| world.entities.active_mut(id))
        .map_or(0.0, |player| player.health.heal(kind.heal()));
    out_events.push(Event::PickupCollected {
        entity: pickup,
        kind,
        healed,
    });
    out_events.push(world.lives_event());

    if kind == PickupKind::Chicken && world.character == Character::Ron {
        world.timers.start(TimerKey::Mode, MODE_DURATION);
        info!("mode_activated");
        out_events.push(Event::ModeChanged { active: true });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query};
    use spellfall_core::{Arena, DamageSource, SpawnEvent};

    fn start(character: Character) -> World {
        let mut world = World::new(Arena::default());
        let mut events = Vec::new();
        apply(&mut world, Command::StartGame { character }, &mut events);
        world
    }

    fn spawn_boss(world: &mut World, kind: BossKind) -> EntityId {
        let mut events = Vec::new();
        apply(
            world,
            Command::Spawn {
                spawn: SpawnEvent::Boss { kind, x: 400.0 },
            },
            &mut events,
        );
        match events.first() {
            Some(Event::EntitySpawned { entity, .. }) => *entity,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn abilities_are_free_on_first_use_and_rejected_during_cooldown() {
        let mut world = start(Character::Harry);
        let mut events = Vec::new();
        let invoke = Command::InvokeAbility {
            ability: Ability::Patronus,
        };

        apply(&mut world, invoke.clone(), &mut events);
        assert!(events.contains(&Event::AbilityInvoked {
            ability: Ability::Patronus
        }));

        apply(
            &mut world,
            Command::AdvanceTimers {
                dt: Duration::from_secs(5),
            },
            &mut events,
        );
        events.clear();
        apply(&mut world, invoke.clone(), &mut events);
        assert_eq!(
            events,
            vec![Event::ActionDenied {
                action: Action::Ability(Ability::Patronus),
                reason: DenialReason::CooldownActive {
                    remaining: Duration::from_secs(15)
                },
            }]
        );
        assert_eq!(
            query::timer_remaining(&world, TimerKey::Ability(Ability::Patronus)),
            Duration::from_secs(15)
        );

        apply(
            &mut world,
            Command::AdvanceTimers {
                dt: Duration::from_secs(15),
            },
            &mut events,
        );
        events.clear();
        apply(&mut world, invoke.clone(), &mut events);
        assert!(events.contains(&Event::AbilityInvoked {
            ability: Ability::Patronus
        }));
        events.clear();
        apply(&mut world, invoke, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::ActionDenied {
                reason: DenialReason::CooldownActive { .. },
                ..
            }]
        ));
    }

    #[test]
    fn abilities_belong_to_their_character() {
        let mut world = start(Character::Hermione);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::InvokeAbility {
                ability: Ability::Patronus,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ActionDenied {
                action: Action::Ability(Ability::Patronus),
                reason: DenialReason::WrongCharacter,
            }]
        );
    }

    #[test]
    fn switching_character_is_gated_by_its_cooldown() {
        let mut world = start(Character::Harry);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SwitchCharacter {
                character: Character::Harry,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SwitchCharacter {
                character: Character::Ron,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SwitchCharacter {
                character: Character::Hermione,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::ActionDenied {
                    action: Action::SwitchCharacter(Character::Harry),
                    reason: DenialReason::AlreadyActive,
                },
                Event::CharacterSwitched {
                    character: Character::Ron,
                    cooldown: SWITCH_COOLDOWN,
                },
                Event::ActionDenied {
                    action: Action::SwitchCharacter(Character::Hermione),
                    reason: DenialReason::CooldownActive {
                        remaining: SWITCH_COOLDOWN
                    },
                },
            ]
        );
        assert_eq!(query::character(&world), Character::Ron);
    }

    #[test]
    fn wingardium_requires_a_lumbering_troll() {
        let mut world = start(Character::Ron);
        let mut events = Vec::new();
        let invoke = Command::InvokeAbility {
            ability: Ability::Wingardium,
        };
        apply(&mut world, invoke.clone(), &mut events);
        assert_eq!(
            events,
            vec![Event::ActionDenied {
                action: Action::Ability(Ability::Wingardium),
                reason: DenialReason::NoTarget,
            }]
        );
        assert!(query::cooldowns(&world)
            .iter()
            .all(|cooldown| cooldown.remaining.is_zero()));

        let troll = spawn_boss(&mut world, BossKind::Troll);
        events.clear();
        apply(&mut world, invoke, &mut events);
        assert!(events.contains(&Event::TrollFloating { troll }));
        assert!(query::entity(&world, troll).expect("troll").is_floating());
        assert_eq!(
            query::timer_remaining(&world, TimerKey::Shake(troll)),
            Duration::ZERO
        );
    }

    #[test]
    fn floating_weapon_defeats_its_troll_on_the_third_strike() {
        let mut world = start(Character::Ron);
        let troll = spawn_boss(&mut world, BossKind::Troll);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::InvokeAbility {
                ability: Ability::Wingardium,
            },
            &mut events,
        );
        let weapon = events
            .iter()
            .find_map(|event| match event {
                Event::EntitySpawned {
                    entity,
                    kind: EntityKind::Effect(_),
                } => Some(*entity),
                _ => None,
            })
            .expect("weapon spawned");

        events.clear();
        apply(&mut world, Command::WeaponStrike { weapon }, &mut events);
        apply(&mut world, Command::WeaponStrike { weapon }, &mut events);
        assert!(!query::entity(&world, troll).expect("troll").dying);

        apply(&mut world, Command::WeaponStrike { weapon }, &mut events);
        assert!(events.contains(&Event::EnemyDefeated {
            entity: troll,
            kind: EntityKind::Boss(BossKind::Troll),
            source: DamageSource::FloatingWeapon,
        }));
    }

    #[test]
    fn stupefy_stuns_everything_but_dementors_and_restores_velocity() {
        let mut world = start(Character::Hermione);
        let lucius = spawn_boss(&mut world, BossKind::Lucius);
        let dementor = spawn_boss(&mut world, BossKind::Dementor);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::InvokeAbility {
                ability: Ability::Stupefy,
            },
            &mut events,
        );

        let stunned = query::entity(&world, lucius).expect("lucius");
        assert!(stunned.stunned);
        assert_eq!(stunned.velocity, Vec2::ZERO);
        assert!(!query::entity(&world, dementor).expect("dementor").stunned);

        events.clear();
        apply(
            &mut world,
            Command::AdvanceTimers { dt: STUN_DURATION },
            &mut events,
        );
        assert!(events.contains(&Event::StunExpired { entity: lucius }));
        let recovered = query::entity(&world, lucius).expect("lucius");
        assert!(!recovered.stunned);
        assert_eq!(
            recovered.velocity,
            Vec2::new(0.0, BossKind::Lucius.descent_speed())
        );
    }

    #[test]
    fn bolts_spend_mana_until_it_runs_out() {
        let mut world = start(Character::Harry);
        let mut events = Vec::new();
        for _ in 0..30 {
            apply(&mut world, Command::CastBolt, &mut events);
        }
        assert_eq!(query::mana(&world).0, 0.0);

        events.clear();
        apply(&mut world, Command::CastBolt, &mut events);
        assert_eq!(
            events,
            vec![Event::ActionDenied {
                action: Action::Bolt,
                reason: DenialReason::InsufficientMana,
            }]
        );
    }

    #[test]
    fn ultimate_needs_a_charge() {
        let mut world = start(Character::Harry);
        let mut events = Vec::new();
        apply(&mut world, Command::InvokeUltimate, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::ActionDenied {
                reason: DenialReason::NoCharges,
                ..
            }]
        ));

        apply(&mut world, Command::GrantUltimateCharge, &mut events);
        events.clear();
        apply(&mut world, Command::InvokeUltimate, &mut events);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::ProjectileFired {
                kind: ProjectileKind::UltimateOrb,
                ..
            }
        )));
        assert_eq!(query::ultimate_charges(&world), 0);
    }

    #[test]
    fn steering_is_clamped_to_the_player_speed() {
        let mut world = start(Character::Harry);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SteerPlayer {
                velocity: Vec2::new(900.0, 0.0),
            },
            &mut events,
        );
        let player = query::player(&world).expect("player");
        assert!((player.velocity.length() - PLAYER_SPEED).abs() < 1e-3);
    }

    #[test]
    fn chicken_grants_ron_mode() {
        let mut world = start(Character::Ron);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Spawn {
                spawn: SpawnEvent::Pickup {
                    kind: PickupKind::Chicken,
                    x: 300.0,
                },
            },
            &mut events,
        );
        let pickup = match events.first() {
            Some(Event::EntitySpawned { entity, .. }) => *entity,
            other => panic!("unexpected event: {other:?}"),
        };

        events.clear();
        apply(&mut world, Command::CollectPickup { pickup }, &mut events);
        apply(&mut world, Command::CollectPickup { pickup }, &mut events);
        assert!(events.contains(&Event::ModeChanged { active: true }));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::PickupCollected { .. }))
                .count(),
            1
        );
        assert!(query::mode_active(&world));

        apply(
            &mut world,
            Command::DamagePlayer {
                amount: 1.0,
                source: DamageSource::Curse,
            },
            &mut events,
        );
        assert_eq!(query::player(&world).expect("player").health.current(), 5.0);
    }
}
