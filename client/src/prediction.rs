//! Local player state with optimistic updates.
//!
//! Movement and ammo are applied immediately so the controls feel instant.
//! Hits are only reported, never predicted: health, kills and scores change
//! when the server says so. Any authoritative ammo count overwrites the
//! prediction.

use shared::{
    ClientEvent, MovementFlags, Player, PlayerId, Rotation, TargetId, Vec3, MAGAZINE_CAPACITY,
};

pub const WALK_SPEED: f32 = 5.0;
pub const RUN_SPEED: f32 = 10.0;
pub const CROUCH_SPEED: f32 = 2.5;

#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: PlayerId,
    pub username: String,
    pub position: Vec3,
    pub rotation: Rotation,
    pub velocity: Vec3,
    pub flags: MovementFlags,
    pub health: i32,
    pub max_health: i32,
    pub ammo: u32,
    pub total_ammo: u32,
    pub alive: bool,
}

impl LocalPlayer {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            username: player.username.clone(),
            position: player.position,
            rotation: player.rotation,
            velocity: player.velocity,
            flags: player.flags(),
            health: player.health,
            max_health: player.max_health,
            ammo: player.ammo,
            total_ammo: player.total_ammo,
            alive: !player.is_dead,
        }
    }

    fn speed(flags: &MovementFlags) -> f32 {
        if flags.is_crouching {
            CROUCH_SPEED
        } else if flags.is_running {
            RUN_SPEED
        } else {
            WALK_SPEED
        }
    }

    /// Moves the player locally and returns the update to send
    pub fn predict_move(
        &mut self,
        direction: Vec3,
        rotation: Rotation,
        flags: MovementFlags,
        dt: f32,
    ) -> Option<ClientEvent> {
        if !self.alive {
            return None;
        }

        self.velocity = direction.normalize() * Self::speed(&flags);
        self.position = self.position + self.velocity * dt;
        self.rotation = rotation;
        self.flags = flags;

        Some(ClientEvent::PlayerMove {
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            is_running: flags.is_running,
            is_crouching: flags.is_crouching,
            is_jumping: flags.is_jumping,
        })
    }

    /// Spends a round locally. None if dead or the magazine is empty.
    pub fn predict_shoot(&mut self, direction: Vec3) -> Option<ClientEvent> {
        if !self.alive || self.ammo == 0 {
            return None;
        }
        self.ammo -= 1;
        Some(ClientEvent::Shoot {
            position: self.position,
            direction,
        })
    }

    /// Ammo only changes once the server answers
    pub fn request_reload(&self) -> Option<ClientEvent> {
        if !self.alive || self.total_ammo == 0 || self.ammo >= MAGAZINE_CAPACITY {
            return None;
        }
        Some(ClientEvent::Reload)
    }

    pub fn report_target_hit(&self, target_id: TargetId, damage: i32) -> Option<ClientEvent> {
        (damage > 0).then_some(ClientEvent::TargetHit { target_id, damage })
    }

    pub fn report_player_hit(&self, player_id: &PlayerId, damage: i32) -> Option<ClientEvent> {
        if damage <= 0 || *player_id == self.id {
            return None;
        }
        Some(ClientEvent::PlayerHit {
            target_player_id: player_id.clone(),
            damage,
        })
    }

    pub fn chat(&self, text: &str) -> Option<ClientEvent> {
        let text = text.trim();
        (!text.is_empty()).then(|| ClientEvent::ChatMessage {
            text: text.to_string(),
        })
    }

    /// Server ammo counts always win over the local guess
    pub fn apply_ammo(&mut self, ammo: u32, total_ammo: u32) {
        self.ammo = ammo;
        self.total_ammo = total_ammo;
    }

    /// Returns true if health went down
    pub fn apply_health(&mut self, health: i32) -> bool {
        let hurt = health < self.health;
        self.health = health.clamp(0, self.max_health);
        hurt
    }

    pub fn kill(&mut self) {
        self.health = 0;
        self.alive = false;
        self.velocity = Vec3::ZERO;
    }

    pub fn respawn(&mut self, position: Vec3, health: i32, ammo: u32) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.flags = MovementFlags::default();
        self.health = health;
        self.ammo = ammo;
        self.alive = true;
    }
}
