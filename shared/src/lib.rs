//! Types shared by the arena server and its clients: math primitives, entity
//! records, gameplay constants and the JSON wire protocol.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};

pub mod entities;
pub mod protocol;

pub use entities::{
    Bullet, BulletId, MovementFlags, Player, PlayerId, ScoreTable, Target, TargetId,
};
pub use protocol::{
    decode_client_event, decode_server_event, encode_client_event, encode_server_event,
    ClientEvent, ProtocolError, ServerEvent,
};

pub const MAX_HEALTH: i32 = 100;
pub const MAGAZINE_CAPACITY: u32 = 30;
pub const DEFAULT_RESERVE_AMMO: u32 = 1200;

pub const BULLET_SPEED: f32 = 50.0;
pub const BULLET_DAMAGE: i32 = 25;
pub const BULLET_LIFETIME_MS: u64 = 3000;

pub const KILL_BONUS: u32 = 50;
pub const PLAYER_RESPAWN_DELAY_MS: u64 = 5000;
pub const TARGET_RESPAWN_MIN_DELAY_MS: u64 = 3000;
pub const TARGET_RESPAWN_MAX_DELAY_MS: u64 = 6000;
pub const TARGET_BASE_HEALTH: i32 = 100;

pub const TARGET_TICK_MS: u64 = 100;

/// A point or direction in world space. Y is up.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        (*other - *self).length()
    }

    /// Returns the unit vector, or zero for a zero-length input
    pub fn normalize(&self) -> Vec3 {
        let len = self.length();
        if len == 0.0 {
            Vec3::ZERO
        } else {
            *self * (1.0 / len)
        }
    }

    /// Moves `alpha` of the way from `self` towards `target`
    pub fn lerp(&self, target: &Vec3, alpha: f32) -> Vec3 {
        *self + (*target - *self) * alpha
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Player view orientation in radians
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Rotation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Yaw turns the short way round; the result stays in the target's range
    pub fn lerp(&self, target: &Rotation, alpha: f32) -> Rotation {
        let delta = yaw_delta(self.yaw, target.yaw);
        Rotation {
            yaw: target.yaw - delta * (1.0 - alpha),
            pitch: self.pitch + (target.pitch - self.pitch) * alpha,
        }
    }
}

/// Signed shortest turn from `from` to `to`, in [-π, π)
pub fn yaw_delta(from: f32, to: f32) -> f32 {
    (to - from + PI).rem_euclid(TAU) - PI
}
