use std::time::Duration;

use glam::Vec2;
use spellfall_core::{BodySync, EntityId};
use spellfall_system_physics::{PhysicsWorld, FIXED_STEP};

fn scene() -> PhysicsWorld {
    let mut physics = PhysicsWorld::default();
    physics.insert_dynamic(
        EntityId::new(1),
        Vec2::new(200.0, -50.0),
        Vec2::new(0.0, 50.0),
        Vec2::splat(18.0),
    );
    physics.insert_dynamic(
        EntityId::new(2),
        Vec2::new(410.0, -50.0),
        Vec2::new(0.0, 50.0),
        Vec2::splat(18.0),
    );
    physics.set_kinematic(
        EntityId::new(3),
        Vec2::new(400.0, 60.0),
        Vec2::new(0.0, 30.0),
        Vec2::splat(40.0),
    );
    physics
}

fn bits(syncs: &[BodySync]) -> Vec<(u32, [u32; 4])> {
    syncs
        .iter()
        .map(|sync| {
            (
                sync.entity.get(),
                [
                    sync.position.x.to_bits(),
                    sync.position.y.to_bits(),
                    sync.velocity.x.to_bits(),
                    sync.velocity.y.to_bits(),
                ],
            )
        })
        .collect()
}

#[test]
fn chunked_and_single_advances_agree_bit_for_bit() {
    let total = FIXED_STEP * 120;

    let mut single = scene();
    let single_steps = single.step(total);

    let mut chunked = scene();
    let mut chunked_steps = 0;
    let mut remaining = total;
    let chunk = Duration::from_millis(7);
    while remaining > Duration::ZERO {
        let dt = chunk.min(remaining);
        chunked_steps += chunked.step(dt);
        remaining -= dt;
    }

    assert_eq!(single_steps, 120);
    assert_eq!(chunked_steps, single_steps);
    assert_eq!(bits(&single.syncs()), bits(&chunked.syncs()));
}

#[test]
fn pickups_bounce_off_enemies() {
    let mut physics = scene();
    let _ = physics.step(FIXED_STEP * 120);
    let deflected = physics
        .body(EntityId::new(2))
        .expect("pickup above the enemy");
    let free = physics.body(EntityId::new(1)).expect("free pickup");
    assert!(deflected.velocity.y < free.velocity.y);
}
