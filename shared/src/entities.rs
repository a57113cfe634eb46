//! Entity records exchanged between server and clients

use crate::{Rotation, Vec3, MAGAZINE_CAPACITY, MAX_HEALTH, DEFAULT_RESERVE_AMMO};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type TargetId = u32;
pub type BulletId = u64;

/// Durable player identifier, used as the score-table key.
///
/// Distinct from the transient connection id the server keys its registry on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        PlayerId(value.to_string())
    }
}

/// Complete score table, always sent whole
pub type ScoreTable = HashMap<PlayerId, u32>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MovementFlags {
    pub is_running: bool,
    pub is_crouching: bool,
    pub is_jumping: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub color: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub velocity: Vec3,
    pub health: i32,
    pub max_health: i32,
    pub ammo: u32,
    pub total_ammo: u32,
    pub score: u32,
    pub is_running: bool,
    pub is_crouching: bool,
    pub is_jumping: bool,
    pub is_dead: bool,
}

impl Player {
    /// Creates a player with spawn defaults at the given position
    pub fn new(id: PlayerId, username: String, color: String, position: Vec3) -> Self {
        Self {
            id,
            username,
            color,
            position,
            rotation: Rotation::default(),
            velocity: Vec3::ZERO,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            ammo: MAGAZINE_CAPACITY,
            total_ammo: DEFAULT_RESERVE_AMMO,
            score: 0,
            is_running: false,
            is_crouching: false,
            is_jumping: false,
            is_dead: false,
        }
    }

    pub fn flags(&self) -> MovementFlags {
        MovementFlags {
            is_running: self.is_running,
            is_crouching: self.is_crouching,
            is_jumping: self.is_jumping,
        }
    }

    pub fn set_flags(&mut self, flags: MovementFlags) {
        self.is_running = flags.is_running;
        self.is_crouching = flags.is_crouching;
        self.is_jumping = flags.is_jumping;
    }

    /// Subtracts damage, clamping at zero. Returns true if this hit was fatal.
    pub fn apply_damage(&mut self, damage: i32) -> bool {
        if self.is_dead {
            return false;
        }
        self.health = (self.health - damage).clamp(0, self.max_health);
        if self.health == 0 {
            self.is_dead = true;
        }
        self.is_dead
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: TargetId,
    pub position: Vec3,
    /// Facing around the Y axis, radians
    pub rotation: f32,
    pub health: i32,
    pub max_health: i32,
    pub points: u32,
    pub alive: bool,
    pub bob_speed: f32,
    pub bob_height: f32,
    pub rotation_speed: f32,
    pub base_y: f32,
}

impl Target {
    pub fn new(id: TargetId, position: Vec3, health: i32, points: u32) -> Self {
        Self {
            id,
            position,
            rotation: 0.0,
            health,
            max_health: health,
            points,
            alive: health > 0,
            bob_speed: 1.0,
            bob_height: 0.25,
            rotation_speed: 0.5,
            base_y: position.y,
        }
    }

    /// Subtracts damage from a live target. Returns true if this hit destroyed it.
    pub fn apply_damage(&mut self, damage: i32) -> bool {
        if !self.alive {
            return false;
        }
        self.health = (self.health - damage).min(self.max_health);
        if self.health <= 0 {
            self.health = 0;
            self.alive = false;
            return true;
        }
        false
    }

    /// Resets the target in place, keeping its identifier
    pub fn reset(&mut self, position: Vec3, health: i32, rotation: f32) {
        self.position = position;
        self.base_y = position.y;
        self.health = health;
        self.max_health = health;
        self.rotation = rotation;
        self.alive = health > 0;
    }
}

/// Server record of a fired shot. Carries no collision state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub id: BulletId,
    pub owner_id: PlayerId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub damage: i32,
    pub created_at: u64,
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn player() -> Player {
        Player::new(
            PlayerId::from("p1"),
            "Player1".to_string(),
            "#ff0000".to_string(),
            Vec3::new(0.0, 2.0, 0.0),
        )
    }

    #[test]
    fn test_player_spawn_defaults() {
        let p = player();
        assert_eq!(p.health, MAX_HEALTH);
        assert_eq!(p.ammo, MAGAZINE_CAPACITY);
        assert_eq!(p.total_ammo, DEFAULT_RESERVE_AMMO);
        assert_eq!(p.score, 0);
        assert!(!p.is_dead);
    }

    #[test]
    fn test_player_damage_clamps_and_kills() {
        let mut p = player();
        assert!(!p.apply_damage(60));
        assert_eq!(p.health, 40);
        assert!(p.apply_damage(60));
        assert_eq!(p.health, 0);
        assert!(p.is_dead);

        // Dead players take no further damage
        assert!(!p.apply_damage(10));
        assert_eq!(p.health, 0);
    }

    #[test]
    fn test_target_alive_tracks_health() {
        let mut t = Target::new(0, Vec3::new(1.0, 1.5, 1.0), 100, 15);
        assert!(t.alive);

        for _ in 0..3 {
            assert!(!t.apply_damage(25));
            assert_eq!(t.alive, t.health > 0);
        }
        assert!(t.apply_damage(25));
        assert!(!t.alive);
        assert_eq!(t.health, 0);

        // Further hits are ignored
        assert!(!t.apply_damage(25));
        assert_eq!(t.alive, t.health > 0);
    }

    #[test]
    fn test_target_reset_keeps_identity() {
        let mut t = Target::new(7, Vec3::new(1.0, 1.5, 1.0), 100, 15);
        t.apply_damage(200);
        t.reset(Vec3::new(3.0, 2.0, -4.0), 110, 1.2);

        assert_eq!(t.id, 7);
        assert!(t.alive);
        assert_eq!(t.health, 110);
        assert_eq!(t.max_health, 110);
        assert_approx_eq!(t.base_y, 2.0);
    }
}
