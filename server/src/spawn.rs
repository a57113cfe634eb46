//! Fixed spawn tables and the random rolls applied to them

use rand::Rng;
use shared::{
    Target, TargetId, Vec3, TARGET_BASE_HEALTH, TARGET_RESPAWN_MAX_DELAY_MS,
    TARGET_RESPAWN_MIN_DELAY_MS,
};
use std::f32::consts::TAU;

/// Target spawn positions paired with the points awarded for destroying them
pub const TARGET_SPAWNS: [((f32, f32, f32), u32); 10] = [
    ((10.0, 1.5, -15.0), 15),
    ((-12.0, 1.5, -18.0), 15),
    ((0.0, 2.5, -25.0), 20),
    ((18.0, 1.5, 5.0), 10),
    ((-20.0, 1.5, 8.0), 10),
    ((25.0, 3.0, -22.0), 25),
    ((-26.0, 3.0, -24.0), 25),
    ((6.0, 1.5, 20.0), 10),
    ((-8.0, 2.0, 24.0), 15),
    ((0.0, 4.0, -35.0), 30),
];

pub const TARGET_RESPAWN_JITTER: f32 = 5.0;
pub const TARGET_RESPAWN_HEALTH_MIN: i32 = 75;
pub const TARGET_RESPAWN_HEALTH_MAX: i32 = 125;

pub const PLAYER_SPAWN_EXTENT: f32 = 20.0;
pub const PLAYER_SPAWN_HEIGHT: f32 = 2.0;

fn spawn_position(index: usize) -> Vec3 {
    let ((x, y, z), _) = TARGET_SPAWNS[index % TARGET_SPAWNS.len()];
    Vec3::new(x, y, z)
}

/// Builds the full target set, one per table entry, with rolled cosmetics
pub fn initial_targets<R: Rng + ?Sized>(rng: &mut R) -> Vec<Target> {
    TARGET_SPAWNS
        .iter()
        .enumerate()
        .map(|(index, &(_, points))| {
            let mut target = Target::new(
                index as TargetId,
                spawn_position(index),
                TARGET_BASE_HEALTH,
                points,
            );
            target.rotation = rng.gen_range(0.0..TAU);
            target.bob_speed = rng.gen_range(0.5..2.0);
            target.bob_height = rng.gen_range(0.1..0.5);
            target.rotation_speed = rng.gen_range(0.2..1.0);
            target
        })
        .collect()
}

/// Random table entry with horizontal jitter
pub fn target_respawn_position<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let base = spawn_position(rng.gen_range(0..TARGET_SPAWNS.len()));
    Vec3::new(
        base.x + rng.gen_range(-TARGET_RESPAWN_JITTER..TARGET_RESPAWN_JITTER),
        base.y,
        base.z + rng.gen_range(-TARGET_RESPAWN_JITTER..TARGET_RESPAWN_JITTER),
    )
}

pub fn target_respawn_health<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(TARGET_RESPAWN_HEALTH_MIN..TARGET_RESPAWN_HEALTH_MAX)
}

pub fn target_respawn_delay<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen_range(TARGET_RESPAWN_MIN_DELAY_MS..TARGET_RESPAWN_MAX_DELAY_MS)
}

pub fn random_facing<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(0.0..TAU)
}

pub fn player_spawn_position<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.gen_range(-PLAYER_SPAWN_EXTENT..PLAYER_SPAWN_EXTENT),
        PLAYER_SPAWN_HEIGHT,
        rng.gen_range(-PLAYER_SPAWN_EXTENT..PLAYER_SPAWN_EXTENT),
    )
}
