//! Cosmetic target animation: spin and vertical bob.
//!
//! Runs on the server so every client sees the same pose. Never touches
//! health or the alive flag.

use shared::Target;
use std::f32::consts::TAU;

#[derive(Debug, Clone)]
pub struct TargetAnimator {
    started_at: u64,
    last_tick: u64,
}

impl TargetAnimator {
    pub fn new(now: u64) -> Self {
        Self {
            started_at: now,
            last_tick: now,
        }
    }

    /// Advances every alive target to `now`
    pub fn advance<'a>(&mut self, targets: impl IntoIterator<Item = &'a mut Target>, now: u64) {
        let dt = now.saturating_sub(self.last_tick) as f32 / 1000.0;
        let elapsed = now.saturating_sub(self.started_at) as f32 / 1000.0;
        self.last_tick = now;

        for target in targets.into_iter().filter(|t| t.alive) {
            animate(target, dt, elapsed);
        }
    }
}

pub fn animate(target: &mut Target, dt: f32, elapsed: f32) {
    target.rotation = (target.rotation + target.rotation_speed * dt).rem_euclid(TAU);
    target.position.y = target.base_y + (elapsed * target.bob_speed).sin() * target.bob_height;
}
