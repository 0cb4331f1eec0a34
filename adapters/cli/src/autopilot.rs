use glam::Vec2;
use spellfall_core::{Ability, BossKind, Command, EntityKind};
use spellfall_world::{query, World};

const SWEEP_SPEED: f32 = 300.0;
const EDGE_MARGIN: f32 = 60.0;
const BOLT_PERIOD: u64 = 12;

/// Scripted player that keeps a headless session busy.
///
/// It sweeps across the bottom of the arena, casts a bolt every few ticks
/// while mana lasts and fires the signature ability and ultimates as soon as
/// they are available.
#[derive(Debug)]
pub(crate) struct Autopilot {
    heading: f32,
    tick: u64,
}

impl Autopilot {
    pub(crate) fn new() -> Self {
        Self {
            heading: 1.0,
            tick: 0,
        }
    }

    /// Decides this tick's inputs.
    pub(crate) fn plan(&mut self, world: &World, out: &mut Vec<Command>) {
        self.tick += 1;
        let Some(player) = query::player(world) else {
            return;
        };

        let width = query::arena(world).width;
        if player.position.x >= width - EDGE_MARGIN {
            self.heading = -1.0;
        } else if player.position.x <= EDGE_MARGIN {
            self.heading = 1.0;
        }
        out.push(Command::SteerPlayer {
            velocity: Vec2::new(self.heading * SWEEP_SPEED, 0.0),
        });

        let (mana, _) = query::mana(world);
        if mana >= 1.0 && self.tick % BOLT_PERIOD == 0 {
            out.push(Command::CastBolt);
        }

        let ability = query::character(world).ability();
        let ready = query::cooldowns(world)
            .iter()
            .any(|cooldown| cooldown.ability == ability && cooldown.remaining.is_zero());
        if ready && has_target(world, ability) {
            out.push(Command::InvokeAbility { ability });
        }

        if query::ultimate_charges(world) > 0 {
            out.push(Command::InvokeUltimate);
        }
    }
}

fn has_target(world: &World, ability: Ability) -> bool {
    let view = query::entity_view(world);
    match ability {
        Ability::Wingardium => view
            .iter()
            .any(|snapshot| snapshot.kind == EntityKind::Boss(BossKind::Troll) && !snapshot.dying),
        Ability::Patronus | Ability::Stupefy => {
            view.iter().any(|snapshot| snapshot.kind.is_hostile())
        }
    }
}

#[cfg(test)]
mod tests {
    use spellfall_core::{Arena, Character};
    use spellfall_world as world;

    use super::*;

    fn started(character: Character) -> World {
        let mut world = World::new(Arena::default());
        let mut events = Vec::new();
        world::apply(&mut world, Command::StartGame { character }, &mut events);
        world
    }

    #[test]
    fn steers_and_casts_on_schedule() {
        let world = started(Character::Harry);
        let mut autopilot = Autopilot::new();
        let mut bolts = 0;
        for _ in 0..BOLT_PERIOD {
            let mut commands = Vec::new();
            autopilot.plan(&world, &mut commands);
            assert!(matches!(commands.first(), Some(Command::SteerPlayer { .. })));
            bolts += commands
                .iter()
                .filter(|command| matches!(command, Command::CastBolt))
                .count();
        }
        assert_eq!(bolts, 1);
    }

    #[test]
    fn holds_abilities_without_targets() {
        let world = started(Character::Ron);
        let mut commands = Vec::new();
        Autopilot::new().plan(&world, &mut commands);
        assert!(!commands
            .iter()
            .any(|command| matches!(command, Command::InvokeAbility { .. })));
    }
}
