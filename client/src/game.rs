//! Client-side game state: applies server events to local proxies.
//!
//! Every server event goes through [`ClientGameState::apply_server_event`].
//! Events that reference something this client does not know about yet are
//! logged and dropped; the periodic target snapshot and the full score table
//! resends bring the state back in line.

use crate::input::{InputContext, Intent};
use crate::prediction::LocalPlayer;
use crate::remote::RemoteEntityManager;
use crate::rendering::{
    Presentation, RenderAttributes, RenderHandle, RenderKind, Renderer, Transform,
};
use log::{debug, info, warn};
use shared::{
    Bullet, ClientEvent, Player, PlayerId, Rotation, ScoreTable, ServerEvent, Target, TargetId,
    Vec3, BULLET_LIFETIME_MS, BULLET_SPEED, TARGET_RESPAWN_MAX_DELAY_MS,
};
use std::collections::BTreeMap;

/// A snapshot may bring back a locally destroyed target once this long has
/// passed, in case its respawn event was lost
pub const SNAPSHOT_RESURRECT_GRACE_MS: u64 = TARGET_RESPAWN_MAX_DELAY_MS;

#[derive(Debug, Clone)]
pub struct TargetProxy {
    pub id: TargetId,
    /// Present while the target is alive and drawn
    pub handle: Option<RenderHandle>,
    pub position: Vec3,
    pub rotation: f32,
    pub health: i32,
    pub max_health: i32,
    pub points: u32,
    pub alive: bool,
    pub destroyed_at: Option<u64>,
}

impl TargetProxy {
    fn transform(&self) -> Transform {
        Transform::new(self.position, Rotation::new(self.rotation, 0.0))
    }
}

#[derive(Debug, Clone)]
pub struct BulletVisual {
    pub handle: RenderHandle,
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub fired_at: u64,
}

impl BulletVisual {
    pub fn position(&self, now: u64) -> Vec3 {
        let elapsed = now.saturating_sub(self.fired_at) as f32 / 1000.0;
        self.origin + self.direction * (self.speed * elapsed)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.fired_at) >= BULLET_LIFETIME_MS
    }
}

pub struct ClientGameState<R: Renderer, P: Presentation> {
    renderer: R,
    presentation: P,
    local: Option<LocalPlayer>,
    remotes: RemoteEntityManager,
    targets: BTreeMap<TargetId, TargetProxy>,
    scores: ScoreTable,
    bullets: Vec<BulletVisual>,
}

impl<R: Renderer, P: Presentation> ClientGameState<R, P> {
    pub fn new(renderer: R, presentation: P) -> Self {
        Self {
            renderer,
            presentation,
            local: None,
            remotes: RemoteEntityManager::new(),
            targets: BTreeMap::new(),
            scores: ScoreTable::new(),
            bullets: Vec::new(),
        }
    }

    pub fn apply_server_event(&mut self, event: ServerEvent, now: u64) {
        match event {
            ServerEvent::Init {
                player_id,
                player,
                players,
                targets,
                scores,
            } => self.on_init(player_id, player, players, targets, scores, now),

            ServerEvent::PlayerJoined { player } => {
                if self.is_local(&player.id) {
                    return;
                }
                self.remotes.on_join(&player, now, &mut self.renderer);
            }

            ServerEvent::PlayerLeft { player_id } => {
                if !self.remotes.remove(&player_id, &mut self.renderer) {
                    debug!("playerLeft for unknown player {}", player_id);
                }
            }

            ServerEvent::PlayerMoved {
                player_id,
                position,
                rotation,
                ..
            } => self.on_player_moved(player_id, position, rotation, now),

            ServerEvent::BulletFired {
                bullet,
                player_id,
                ammo,
                total_ammo,
            } => {
                if self.is_local(&player_id) {
                    // Our own visual was spawned when we fired
                    self.apply_ammo(ammo, total_ammo);
                } else {
                    self.spawn_remote_bullet(&bullet, now);
                }
            }

            ServerEvent::Reloaded { ammo, total_ammo } => self.apply_ammo(ammo, total_ammo),

            ServerEvent::TargetDamaged {
                target_id, health, ..
            } => self.on_target_damaged(target_id, health, now),

            ServerEvent::TargetDestroyed {
                target_id,
                destroyed_by,
                scores,
                ..
            } => {
                debug!("Target {} destroyed by {}", target_id, destroyed_by);
                self.destroy_target(target_id, now);
                self.replace_scores(scores);
            }

            ServerEvent::TargetRespawned { target, .. } => self.respawn_target(&target),

            ServerEvent::TargetsUpdate { targets } => self.apply_target_snapshot(&targets, now),

            ServerEvent::PlayerDamaged {
                player_id, health, ..
            } => {
                if let Some(local) = self.local.as_mut().filter(|l| l.id == player_id) {
                    if local.apply_health(health) {
                        self.presentation.show_damage_flash();
                    }
                }
            }

            ServerEvent::PlayerKilled {
                killed_player_id,
                killer_player_id,
                scores,
            } => {
                info!("{} was killed by {}", killed_player_id, killer_player_id);
                match self.local.as_mut().filter(|l| l.id == killed_player_id) {
                    Some(local) => local.kill(),
                    None => self.remotes.set_alive(&killed_player_id, false, now),
                }
                self.replace_scores(scores);
            }

            ServerEvent::Respawn {
                position,
                health,
                ammo,
            } => {
                if let Some(local) = self.local.as_mut() {
                    local.respawn(position, health, ammo);
                    self.presentation.update_ammo(local.ammo, local.total_ammo);
                }
            }

            ServerEvent::PlayerRespawned {
                player_id,
                position,
            } => {
                let rotation = self
                    .remotes
                    .get(&player_id)
                    .map(|e| e.network_rotation)
                    .unwrap_or_default();
                // A proxy swept while its player was dead is rebuilt here
                self.on_player_moved(player_id, position, rotation, now);
            }

            ServerEvent::ChatMessage {
                username, message, ..
            } => self.presentation.append_chat_line(&username, &message),

            ServerEvent::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
                self.reset();
            }
        }
    }

    fn on_init(
        &mut self,
        player_id: PlayerId,
        player: Player,
        players: Vec<Player>,
        targets: Vec<Target>,
        scores: ScoreTable,
        now: u64,
    ) {
        self.reset();
        info!("Joined as {} ({})", player.username, player_id);

        let local = LocalPlayer::from_player(&player);
        self.presentation.update_ammo(local.ammo, local.total_ammo);
        self.local = Some(local);

        for other in players.iter().filter(|p| p.id != player_id) {
            self.remotes.on_join(other, now, &mut self.renderer);
        }
        for target in &targets {
            self.insert_target(target);
        }
        self.replace_scores(scores);
    }

    fn on_player_moved(&mut self, player_id: PlayerId, position: Vec3, rotation: Rotation, now: u64) {
        if self.is_local(&player_id) {
            return;
        }
        if self.remotes.on_moved(&player_id, position, rotation, now) {
            return;
        }

        // Missed the join; build a proxy from what the update tells us
        debug!("Creating proxy for {} from a movement update", player_id);
        let mut player = Player::new(
            player_id.clone(),
            player_id.to_string(),
            String::new(),
            position,
        );
        player.rotation = rotation;
        if self.remotes.on_join(&player, now, &mut self.renderer) {
            self.remotes.on_moved(&player_id, position, rotation, now);
        }
    }

    fn on_target_damaged(&mut self, target_id: TargetId, health: i32, now: u64) {
        let Some(proxy) = self.targets.get_mut(&target_id) else {
            debug!("targetDamaged for unknown target {}", target_id);
            return;
        };
        if !proxy.alive {
            // Destroyed stays destroyed until a respawn
            return;
        }
        proxy.health = health.clamp(0, proxy.max_health);
        if proxy.health == 0 {
            self.destroy_target(target_id, now);
        }
    }

    /// Marks the target destroyed and releases its renderable. Repeat calls
    /// are no-ops.
    fn destroy_target(&mut self, target_id: TargetId, now: u64) {
        let Some(proxy) = self.targets.get_mut(&target_id) else {
            debug!("Destroy for unknown target {}", target_id);
            return;
        };
        if !proxy.alive {
            return;
        }
        proxy.alive = false;
        proxy.health = 0;
        proxy.destroyed_at = Some(now);
        if let Some(handle) = proxy.handle.take() {
            self.renderer.destroy_renderable(handle);
        }
        self.presentation.target_destroyed(target_id);
    }

    fn insert_target(&mut self, target: &Target) {
        if let Some(old) = self.targets.remove(&target.id) {
            if let Some(handle) = old.handle {
                self.renderer.destroy_renderable(handle);
            }
        }

        let mut proxy = TargetProxy {
            id: target.id,
            handle: None,
            position: target.position,
            rotation: target.rotation,
            health: target.health,
            max_health: target.max_health,
            points: target.points,
            alive: target.alive,
            destroyed_at: None,
        };
        if proxy.alive {
            proxy.handle = Some(self.renderer.create_renderable(
                RenderKind::Target,
                proxy.transform(),
                RenderAttributes {
                    color: None,
                    label: Some(format!("{} pts", proxy.points)),
                },
            ));
        }
        self.targets.insert(target.id, proxy);
    }

    fn respawn_target(&mut self, target: &Target) {
        debug!("Target {} respawned with {} health", target.id, target.health);
        self.insert_target(target);
    }

    fn apply_target_snapshot(&mut self, targets: &[Target], now: u64) {
        for target in targets.iter().filter(|t| t.alive) {
            let Some(proxy) = self.targets.get_mut(&target.id) else {
                self.insert_target(target);
                continue;
            };

            if !proxy.alive {
                let destroyed_for = proxy
                    .destroyed_at
                    .map(|at| now.saturating_sub(at))
                    .unwrap_or(u64::MAX);
                if destroyed_for > SNAPSHOT_RESURRECT_GRACE_MS {
                    info!("Target {} missed its respawn, restoring", target.id);
                    self.insert_target(target);
                }
                continue;
            }

            proxy.position = target.position;
            proxy.rotation = target.rotation;
            if let Some(handle) = proxy.handle {
                self.renderer.update_renderable(handle, proxy.transform());
            }
        }
    }

    fn replace_scores(&mut self, scores: ScoreTable) {
        self.scores = scores;
        self.presentation.update_scoreboard_ui(&self.scores);
    }

    fn apply_ammo(&mut self, ammo: u32, total_ammo: u32) {
        if let Some(local) = self.local.as_mut() {
            local.apply_ammo(ammo, total_ammo);
            self.presentation.update_ammo(ammo, total_ammo);
        }
    }

    fn spawn_bullet(&mut self, origin: Vec3, direction: Vec3, speed: f32, now: u64) {
        let handle = self.renderer.create_renderable(
            RenderKind::Bullet,
            Transform::at(origin),
            RenderAttributes::default(),
        );
        self.bullets.push(BulletVisual {
            handle,
            origin,
            direction,
            speed,
            fired_at: now,
        });
    }

    fn spawn_remote_bullet(&mut self, bullet: &Bullet, now: u64) {
        self.spawn_bullet(bullet.origin, bullet.direction, bullet.speed, now);
    }

    /// Turns a local intent into outgoing events, applying predictions first
    pub fn handle_intent(&mut self, intent: Intent, dt: f32, now: u64) -> Vec<ClientEvent> {
        let Some(local) = self.local.as_mut() else {
            return Vec::new();
        };

        let event = match intent {
            Intent::Move {
                direction,
                rotation,
                flags,
            } => local.predict_move(direction, rotation, flags, dt),

            Intent::Fire { direction } => {
                let direction = direction.normalize();
                let event = if direction == Vec3::ZERO {
                    debug!("Ignoring fire without a direction");
                    None
                } else {
                    local.predict_shoot(direction)
                };
                if event.is_some() {
                    let (origin, ammo, total) = (local.position, local.ammo, local.total_ammo);
                    self.presentation.update_ammo(ammo, total);
                    self.spawn_bullet(origin, direction, BULLET_SPEED, now);
                }
                event
            }

            Intent::Reload => local.request_reload(),

            Intent::Chat(text) => local.chat(&text),

            Intent::TargetHit { target_id, damage } => {
                let alive = self.targets.get(&target_id).is_some_and(|t| t.alive);
                if alive {
                    local.report_target_hit(target_id, damage)
                } else {
                    None
                }
            }

            Intent::PlayerHit { player_id, damage } => {
                if self.remotes.contains(&player_id) {
                    local.report_player_hit(&player_id, damage)
                } else {
                    None
                }
            }
        };

        event.into_iter().collect()
    }

    /// One render tick: interpolate remote players and move bullet visuals
    pub fn tick(&mut self, now: u64) {
        self.remotes.interpolate(&mut self.renderer);

        let renderer = &mut self.renderer;
        self.bullets.retain(|bullet| {
            if bullet.is_expired(now) {
                renderer.destroy_renderable(bullet.handle);
                false
            } else {
                renderer.update_renderable(bullet.handle, Transform::at(bullet.position(now)));
                true
            }
        });
    }

    pub fn sweep(&mut self, now: u64) -> Vec<PlayerId> {
        self.remotes.sweep(now, &mut self.renderer)
    }

    pub fn input_context(&self) -> InputContext {
        let Some(local) = self.local.as_ref() else {
            return InputContext::default();
        };
        InputContext {
            position: local.position,
            alive: local.alive,
            ammo: local.ammo,
            total_ammo: local.total_ammo,
            targets: self
                .targets
                .values()
                .filter(|t| t.alive)
                .map(|t| (t.id, t.position))
                .collect(),
        }
    }

    /// Drops everything learned from the current session
    pub fn reset(&mut self) {
        self.remotes.clear(&mut self.renderer);
        for (_, proxy) in std::mem::take(&mut self.targets) {
            if let Some(handle) = proxy.handle {
                self.renderer.destroy_renderable(handle);
            }
        }
        for bullet in self.bullets.drain(..) {
            self.renderer.destroy_renderable(bullet.handle);
        }
        self.scores.clear();
        self.local = None;
    }

    fn is_local(&self, player_id: &PlayerId) -> bool {
        self.local.as_ref().is_some_and(|l| l.id == *player_id)
    }

    pub fn local(&self) -> Option<&LocalPlayer> {
        self.local.as_ref()
    }

    pub fn remotes(&self) -> &RemoteEntityManager {
        &self.remotes
    }

    pub fn target(&self, target_id: TargetId) -> Option<&TargetProxy> {
        self.targets.get(&target_id)
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetProxy> {
        self.targets.values()
    }

    pub fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }
}
