use std::time::Duration;

use spellfall_core::{
    Ability, AiState, Arena, BossKind, Character, Command, DamageSource, DementorPhase,
    Difficulty, EntityId, Event, MovementPattern, SpawnEvent,
};
use spellfall_system_behavior::{Behavior, Config};
use spellfall_world::{self as world, query, World};

const DT: Duration = Duration::from_millis(16);

fn start(character: Character) -> World {
    let mut world = World::new(Arena::default());
    let mut events = Vec::new();
    world::apply(&mut world, Command::StartGame { character }, &mut events);
    world
}

fn spawn(world: &mut World, spawn: SpawnEvent) -> EntityId {
    let mut events = Vec::new();
    world::apply(world, Command::Spawn { spawn }, &mut events);
    match events.first() {
        Some(Event::EntitySpawned { entity, .. }) => *entity,
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Runs one behavior phase followed by integration and timers, returning the
/// commands the behavior system emitted.
fn step(world: &mut World, behavior: &mut Behavior) -> Vec<Command> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: DT }, &mut events);
    let view = query::entity_view(world);
    let mut commands = Vec::new();
    behavior.handle(&events, &view, &Difficulty::default(), &mut commands);
    for command in commands.clone() {
        world::apply(world, command, &mut events);
    }
    world::apply(world, Command::Integrate { dt: DT }, &mut events);
    world::apply(world, Command::AdvanceTimers { dt: DT }, &mut events);
    world::apply(world, Command::Cleanup, &mut events);
    commands
}

fn drains(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::DamagePlayer {
                    source: DamageSource::DementorDrain,
                    ..
                }
            )
        })
        .count()
}

#[test]
fn dementor_drains_once_per_approach() {
    let mut world = start(Character::Harry);
    let dementor = spawn(
        &mut world,
        SpawnEvent::Boss {
            kind: BossKind::Dementor,
            x: 400.0,
        },
    );
    let mut behavior = Behavior::new(Config::new(Arena::default(), 5));

    let mut ticks = 0;
    loop {
        ticks += 1;
        assert!(ticks < 1_000, "dementor never reached the player");
        if drains(&step(&mut world, &mut behavior)) > 0 {
            break;
        }
    }
    assert!(matches!(
        query::entity(&world, dementor).and_then(|snapshot| snapshot.ai),
        Some(AiState::Dementor {
            phase: DementorPhase::Retreating,
            ..
        })
    ));
    assert_eq!(query::player(&world).expect("player").health.current(), 4.0);

    let mut later = 0;
    for _ in 0..180 {
        later += drains(&step(&mut world, &mut behavior));
    }
    assert_eq!(later, 0, "no repeat drain while retreating or holding");
}

#[test]
fn regular_enemy_fires_when_its_attack_is_ready() {
    let mut world = start(Character::Harry);
    let enemy = spawn(
        &mut world,
        SpawnEvent::Regular {
            x: 200.0,
            pattern: MovementPattern::Drift,
            speed: 600.0,
            first_attack: Duration::from_millis(200),
        },
    );
    let mut behavior = Behavior::new(Config::new(Arena::default(), 9));

    let mut curses = 0;
    for _ in 0..40 {
        curses += step(&mut world, &mut behavior)
            .iter()
            .filter(|command| matches!(command, Command::FireCurse { caster, .. } if *caster == enemy))
            .count();
    }
    assert_eq!(curses, 1, "cooldown gates the next curse");
}

#[test]
fn stunned_enemies_are_left_alone() {
    let mut world = start(Character::Hermione);
    let lucius = spawn(
        &mut world,
        SpawnEvent::Boss {
            kind: BossKind::Lucius,
            x: 400.0,
        },
    );
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::InvokeAbility {
            ability: Ability::Stupefy,
        },
        &mut events,
    );

    let mut behavior = Behavior::new(Config::new(Arena::default(), 1));
    for _ in 0..60 {
        let commands = step(&mut world, &mut behavior);
        assert!(!commands.iter().any(|command| matches!(
            command,
            Command::UpdateAi { entity, .. } | Command::FireCurse { caster: entity, .. }
                if *entity == lucius
        )));
    }
}

#[test]
fn floating_weapon_strikes_and_follows_its_troll() {
    let mut world = start(Character::Ron);
    let troll = spawn(
        &mut world,
        SpawnEvent::Boss {
            kind: BossKind::Troll,
            x: 400.0,
        },
    );
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::InvokeAbility {
            ability: Ability::Wingardium,
        },
        &mut events,
    );

    let mut behavior = Behavior::new(Config::new(Arena::default(), 2));
    let mut strikes = 0;
    for _ in 0..((5_000 / DT.as_millis()) as usize) {
        strikes += step(&mut world, &mut behavior)
            .iter()
            .filter(|command| matches!(command, Command::WeaponStrike { .. }))
            .count();
        if query::entity(&world, troll).is_none() {
            break;
        }
    }

    assert_eq!(strikes, 3);
    assert!(query::entity(&world, troll).is_none(), "third strike kills");
}
