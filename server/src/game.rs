//! Authoritative world state: players, targets, bullets and scores.
//!
//! Every mutation runs to completion inside one method call, driven either by
//! one inbound client event or by one timer (task queue drain, animation
//! tick). Methods return the events to deliver instead of sending them, so the
//! store has no knowledge of sockets. Rejected actions return nothing.

use crate::animator::TargetAnimator;
use crate::client_manager::ConnectionId;
use crate::relay::Outbound;
use crate::scheduler::{Scheduler, Task};
use crate::spawn;
use crate::utils::{generate_color, generate_username};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    Bullet, BulletId, MovementFlags, Player, PlayerId, Rotation, ScoreTable, ServerEvent, Target,
    TargetId, Vec3, BULLET_DAMAGE, BULLET_LIFETIME_MS, BULLET_SPEED, KILL_BONUS,
    MAGAZINE_CAPACITY, PLAYER_RESPAWN_DELAY_MS,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Heading used when a shot arrives without a usable direction
pub const DEFAULT_SHOT_DIRECTION: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};

pub struct GameState {
    players: HashMap<ConnectionId, Player>,
    targets: BTreeMap<TargetId, Target>,
    bullets: HashMap<BulletId, Bullet>,
    scores: ScoreTable,
    scheduler: Scheduler,
    animator: TargetAnimator,
    rng: StdRng,
    next_bullet_id: BulletId,
}

impl GameState {
    /// Creates the world with every target spawned from the fixed table
    pub fn new(mut rng: StdRng, now: u64) -> Self {
        let targets = spawn::initial_targets(&mut rng)
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        Self {
            players: HashMap::new(),
            targets,
            bullets: HashMap::new(),
            scores: ScoreTable::new(),
            scheduler: Scheduler::new(),
            animator: TargetAnimator::new(now),
            rng,
            next_bullet_id: 1,
        }
    }

    pub fn with_seed(seed: u64, now: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), now)
    }

    pub fn from_entropy(now: u64) -> Self {
        Self::new(StdRng::from_entropy(), now)
    }

    /// Creates a player for a new connection and hands it the full snapshot
    pub fn on_connect(&mut self, connection_id: ConnectionId, _now: u64) -> Vec<Outbound> {
        if self.players.contains_key(&connection_id) {
            warn!("Connection {} already has a player", connection_id);
            return Vec::new();
        }

        let player_id = PlayerId(Uuid::new_v4().to_string());
        let position = spawn::player_spawn_position(&mut self.rng);
        let player = Player::new(
            player_id.clone(),
            generate_username(connection_id),
            generate_color(connection_id),
            position,
        );

        let others: Vec<Player> = self.players.values().cloned().collect();
        self.scores.insert(player_id.clone(), 0);
        self.players.insert(connection_id, player.clone());

        info!(
            "Player {} ({}) joined on connection {}",
            player.username, player_id, connection_id
        );

        vec![
            Outbound::unicast(
                connection_id,
                ServerEvent::Init {
                    player_id,
                    player: player.clone(),
                    players: others,
                    targets: self.targets(),
                    scores: self.scores.clone(),
                },
            ),
            Outbound::broadcast_except(connection_id, ServerEvent::PlayerJoined { player }),
        ]
    }

    /// Removes the connection's player and score. Repeated calls are no-ops.
    pub fn on_disconnect(&mut self, connection_id: ConnectionId) -> Vec<Outbound> {
        let Some(player) = self.players.remove(&connection_id) else {
            return Vec::new();
        };
        self.scores.remove(&player.id);

        info!("Player {} ({}) left", player.username, player.id);

        vec![Outbound::broadcast_except(
            connection_id,
            ServerEvent::PlayerLeft {
                player_id: player.id,
            },
        )]
    }

    pub fn on_player_move(
        &mut self,
        connection_id: ConnectionId,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
        flags: MovementFlags,
    ) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&connection_id) else {
            return Vec::new();
        };
        if player.is_dead {
            return Vec::new();
        }

        player.position = position;
        player.rotation = rotation;
        player.velocity = velocity;
        player.set_flags(flags);

        vec![Outbound::broadcast_except(
            connection_id,
            ServerEvent::PlayerMoved {
                player_id: player.id.clone(),
                position,
                rotation,
                velocity,
                flags,
            },
        )]
    }

    pub fn on_shoot(
        &mut self,
        connection_id: ConnectionId,
        position: Vec3,
        direction: Vec3,
        now: u64,
    ) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&connection_id) else {
            return Vec::new();
        };
        if player.is_dead || player.ammo == 0 {
            debug!("Shot from {} rejected", player.id);
            return Vec::new();
        }
        let mut direction = direction.normalize();
        if direction == Vec3::ZERO {
            debug!("Shot from {} has no direction, firing forward", player.id);
            direction = DEFAULT_SHOT_DIRECTION;
        }

        player.ammo -= 1;

        let bullet_id = self.next_bullet_id;
        self.next_bullet_id += 1;
        let bullet = Bullet {
            id: bullet_id,
            owner_id: player.id.clone(),
            origin: position,
            direction,
            speed: BULLET_SPEED,
            damage: BULLET_DAMAGE,
            created_at: now,
        };
        let event = ServerEvent::BulletFired {
            bullet: bullet.clone(),
            player_id: player.id.clone(),
            ammo: player.ammo,
            total_ammo: player.total_ammo,
        };

        self.bullets.insert(bullet_id, bullet);
        self.scheduler
            .schedule(now + BULLET_LIFETIME_MS, Task::ExpireBullet(bullet_id));

        // The shooter needs the authoritative ammo count too
        vec![Outbound::broadcast(event)]
    }

    pub fn on_reload(&mut self, connection_id: ConnectionId) -> Vec<Outbound> {
        let Some(player) = self.players.get_mut(&connection_id) else {
            return Vec::new();
        };
        if player.is_dead || player.total_ammo == 0 {
            return Vec::new();
        }

        let moved = MAGAZINE_CAPACITY
            .saturating_sub(player.ammo)
            .min(player.total_ammo);
        player.ammo += moved;
        player.total_ammo -= moved;

        vec![Outbound::unicast(
            connection_id,
            ServerEvent::Reloaded {
                ammo: player.ammo,
                total_ammo: player.total_ammo,
            },
        )]
    }

    pub fn on_target_hit(
        &mut self,
        connection_id: ConnectionId,
        target_id: TargetId,
        damage: i32,
        now: u64,
    ) -> Vec<Outbound> {
        if damage <= 0 {
            return Vec::new();
        }
        let Some(shooter_id) = self.players.get(&connection_id).map(|p| p.id.clone()) else {
            return Vec::new();
        };
        let Some(target) = self.targets.get_mut(&target_id) else {
            debug!("Hit on unknown target {}", target_id);
            return Vec::new();
        };
        if !target.alive {
            return Vec::new();
        }

        let destroyed = target.apply_damage(damage);
        let points = target.points;
        let mut out = vec![Outbound::broadcast(ServerEvent::TargetDamaged {
            target_id,
            health: target.health,
            hit_by: shooter_id.clone(),
        })];

        if destroyed {
            self.credit(connection_id, points);
            let delay = spawn::target_respawn_delay(&mut self.rng);
            self.scheduler
                .schedule(now + delay, Task::RespawnTarget(target_id));

            info!(
                "Target {} destroyed by {}, respawning in {}ms",
                target_id, shooter_id, delay
            );

            out.push(Outbound::broadcast(ServerEvent::TargetDestroyed {
                target_id,
                destroyed_by: shooter_id,
                points,
                scores: self.scores.clone(),
            }));
        }
        out
    }

    pub fn on_player_hit(
        &mut self,
        connection_id: ConnectionId,
        victim_id: &PlayerId,
        damage: i32,
        now: u64,
    ) -> Vec<Outbound> {
        if damage <= 0 {
            return Vec::new();
        }
        let Some(shooter_id) = self.players.get(&connection_id).map(|p| p.id.clone()) else {
            return Vec::new();
        };
        if &shooter_id == victim_id {
            return Vec::new();
        }
        let Some(victim) = self.players.values_mut().find(|p| &p.id == victim_id) else {
            debug!("Hit on unknown player {}", victim_id);
            return Vec::new();
        };
        if victim.is_dead {
            return Vec::new();
        }

        let killed = victim.apply_damage(damage);
        let mut out = vec![Outbound::broadcast(ServerEvent::PlayerDamaged {
            player_id: victim_id.clone(),
            health: victim.health,
            hit_by: shooter_id.clone(),
        })];

        if killed {
            self.credit(connection_id, KILL_BONUS);
            self.scheduler.schedule(
                now + PLAYER_RESPAWN_DELAY_MS,
                Task::RespawnPlayer(victim_id.clone()),
            );

            info!("Player {} killed by {}", victim_id, shooter_id);

            out.push(Outbound::broadcast(ServerEvent::PlayerKilled {
                killed_player_id: victim_id.clone(),
                killer_player_id: shooter_id,
                scores: self.scores.clone(),
            }));
        }
        out
    }

    /// Relays chat verbatim; escaping is up to whoever displays it
    pub fn on_chat(&mut self, connection_id: ConnectionId, text: String, now: u64) -> Vec<Outbound> {
        let Some(player) = self.players.get(&connection_id) else {
            return Vec::new();
        };

        vec![Outbound::broadcast(ServerEvent::ChatMessage {
            player_id: player.id.clone(),
            username: player.username.clone(),
            message: text,
            timestamp: now,
        })]
    }

    /// Brings a destroyed target back at a new spot. No-op if it is alive.
    pub fn respawn_target(&mut self, target_id: TargetId) -> Vec<Outbound> {
        let Some(target) = self.targets.get_mut(&target_id) else {
            return Vec::new();
        };
        if target.alive {
            return Vec::new();
        }

        let position = spawn::target_respawn_position(&mut self.rng);
        let health = spawn::target_respawn_health(&mut self.rng);
        let facing = spawn::random_facing(&mut self.rng);
        target.reset(position, health, facing);

        debug!("Target {} respawned with {} health", target_id, health);

        vec![Outbound::broadcast(ServerEvent::TargetRespawned {
            target_id,
            target: target.clone(),
        })]
    }

    /// Revives a dead player. No-op if the player left or is already alive.
    pub fn respawn_player(&mut self, player_id: &PlayerId) -> Vec<Outbound> {
        let Some(connection_id) = self.connection_for(player_id) else {
            return Vec::new();
        };
        let position = spawn::player_spawn_position(&mut self.rng);
        let Some(player) = self.players.get_mut(&connection_id) else {
            return Vec::new();
        };
        if !player.is_dead {
            return Vec::new();
        }

        player.position = position;
        player.velocity = Vec3::ZERO;
        player.health = player.max_health;
        player.ammo = MAGAZINE_CAPACITY;
        player.is_dead = false;
        player.set_flags(MovementFlags::default());

        info!("Player {} respawned", player_id);

        vec![
            Outbound::unicast(
                connection_id,
                ServerEvent::Respawn {
                    position,
                    health: player.health,
                    ammo: player.ammo,
                },
            ),
            Outbound::broadcast_except(
                connection_id,
                ServerEvent::PlayerRespawned {
                    player_id: player_id.clone(),
                    position,
                },
            ),
        ]
    }

    pub fn expire_bullet(&mut self, bullet_id: BulletId) -> bool {
        self.bullets.remove(&bullet_id).is_some()
    }

    /// Runs every deferred task that has come due
    pub fn run_due_tasks(&mut self, now: u64) -> Vec<Outbound> {
        let mut out = Vec::new();
        for task in self.scheduler.pop_due(now) {
            match task {
                Task::ExpireBullet(bullet_id) => {
                    self.expire_bullet(bullet_id);
                }
                Task::RespawnTarget(target_id) => out.extend(self.respawn_target(target_id)),
                Task::RespawnPlayer(player_id) => out.extend(self.respawn_player(&player_id)),
            }
        }
        out
    }

    /// Advances target cosmetics and produces the periodic snapshot
    pub fn animate_targets(&mut self, now: u64) -> Outbound {
        self.animator.advance(self.targets.values_mut(), now);
        Outbound::broadcast(ServerEvent::TargetsUpdate {
            targets: self.targets(),
        })
    }

    fn credit(&mut self, connection_id: ConnectionId, points: u32) {
        if let Some(player) = self.players.get_mut(&connection_id) {
            let score = self.scores.entry(player.id.clone()).or_insert(0);
            *score += points;
            player.score = *score;
        }
    }

    pub fn connection_for(&self, player_id: &PlayerId) -> Option<ConnectionId> {
        self.players
            .iter()
            .find(|(_, p)| &p.id == player_id)
            .map(|(conn, _)| *conn)
    }

    pub fn player(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players.get(&connection_id)
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(&connection_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn target(&self, target_id: TargetId) -> Option<&Target> {
        self.targets.get(&target_id)
    }

    /// All targets in id order, alive or not
    pub fn targets(&self) -> Vec<Target> {
        self.targets.values().cloned().collect()
    }

    pub fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    pub fn bullet(&self, bullet_id: BulletId) -> Option<&Bullet> {
        self.bullets.get(&bullet_id)
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }
}
