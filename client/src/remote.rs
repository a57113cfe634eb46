//! Lifecycle of remote player proxies.
//!
//! Leave notifications can be lost (abrupt network loss) and a reconnecting
//! player shows up under a fresh id, so proxies are also removed when they go
//! quiet for too long or when a new player spawns on top of a silent one.

use crate::rendering::{RenderAttributes, RenderHandle, RenderKind, Renderer, Transform};
use log::{debug, info};
use shared::{Player, PlayerId, Rotation, Vec3};
use std::collections::{HashMap, HashSet};

/// Idle time after which a proxy past its grace period is stale
pub const STALE_AFTER_MS: u64 = 5000;
/// Proxies younger than this are not checked against `STALE_AFTER_MS`
pub const CREATION_GRACE_MS: u64 = 3000;
/// Idle time after which any proxy is stale regardless of age
pub const HARD_STALE_AFTER_MS: u64 = 15000;

/// A join this close to a silent proxy is taken to be the same person
pub const DUPLICATE_DISTANCE: f32 = 5.0;
pub const DUPLICATE_IDLE_MS: u64 = 3000;

pub const SWEEP_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct RemoteEntity {
    pub player_id: PlayerId,
    pub username: String,
    pub handle: RenderHandle,
    /// Latest position from the server; the render position chases it
    pub network_position: Vec3,
    pub network_rotation: Rotation,
    pub render_position: Vec3,
    pub render_rotation: Rotation,
    pub update_count: u32,
    pub created_at: u64,
    pub last_update: u64,
    pub stale: bool,
    pub alive: bool,
}

impl RemoteEntity {
    pub fn is_stale(&self, now: u64) -> bool {
        let idle = now.saturating_sub(self.last_update);
        let age = now.saturating_sub(self.created_at);
        (idle > STALE_AFTER_MS && age > CREATION_GRACE_MS) || idle > HARD_STALE_AFTER_MS
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.render_position, self.render_rotation)
    }

    /// Moves the render pose part of the way to the network pose. Large gaps
    /// close quickly so teleports settle within a few ticks.
    pub fn interpolate(&mut self) {
        let distance = self.render_position.distance(&self.network_position);
        let rate = interpolation_rate(distance);
        self.render_position = self.render_position.lerp(&self.network_position, rate);
        self.render_rotation = self.render_rotation.lerp(&self.network_rotation, rate);
    }
}

pub fn interpolation_rate(distance: f32) -> f32 {
    if distance > 5.0 {
        0.5
    } else if distance > 1.0 {
        0.3
    } else {
        0.1
    }
}

#[derive(Debug, Default)]
pub struct RemoteEntityManager {
    entities: HashMap<PlayerId, RemoteEntity>,
    /// Ids whose join has already been handled
    processed: HashSet<PlayerId>,
}

impl RemoteEntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a proxy for a joining player. Returns false for a repeat join.
    pub fn on_join<R: Renderer>(&mut self, player: &Player, now: u64, renderer: &mut R) -> bool {
        if self.processed.contains(&player.id) {
            debug!("Ignoring repeat join for {}", player.id);
            return false;
        }

        let duplicates: Vec<PlayerId> = self
            .entities
            .values()
            .filter(|e| {
                e.render_position.distance(&player.position) < DUPLICATE_DISTANCE
                    && now.saturating_sub(e.last_update) > DUPLICATE_IDLE_MS
            })
            .map(|e| e.player_id.clone())
            .collect();
        for id in duplicates {
            info!("Removing {} as a stale duplicate of {}", id, player.id);
            self.remove(&id, renderer);
        }

        let handle = renderer.create_renderable(
            RenderKind::RemotePlayer,
            Transform::new(player.position, player.rotation),
            RenderAttributes {
                color: Some(player.color.clone()),
                label: Some(player.username.clone()),
            },
        );

        self.processed.insert(player.id.clone());
        self.entities.insert(
            player.id.clone(),
            RemoteEntity {
                player_id: player.id.clone(),
                username: player.username.clone(),
                handle,
                network_position: player.position,
                network_rotation: player.rotation,
                render_position: player.position,
                render_rotation: player.rotation,
                update_count: 0,
                created_at: now,
                last_update: now,
                stale: false,
                alive: !player.is_dead,
            },
        );
        true
    }

    /// Records a movement update. Returns false if the player is unknown.
    pub fn on_moved(
        &mut self,
        player_id: &PlayerId,
        position: Vec3,
        rotation: Rotation,
        now: u64,
    ) -> bool {
        let Some(entity) = self.entities.get_mut(player_id) else {
            return false;
        };
        entity.network_position = position;
        entity.network_rotation = rotation;
        entity.update_count += 1;
        entity.last_update = now;
        entity.stale = false;
        entity.alive = true;
        true
    }

    pub fn set_alive(&mut self, player_id: &PlayerId, alive: bool, now: u64) {
        if let Some(entity) = self.entities.get_mut(player_id) {
            entity.alive = alive;
            entity.last_update = now;
        }
    }

    /// Releases the proxy's renderable and forgets the id everywhere
    pub fn remove<R: Renderer>(&mut self, player_id: &PlayerId, renderer: &mut R) -> bool {
        self.processed.remove(player_id);
        match self.entities.remove(player_id) {
            Some(entity) => {
                renderer.destroy_renderable(entity.handle);
                true
            }
            None => false,
        }
    }

    /// Removes every proxy that has gone stale, returning their ids
    pub fn sweep<R: Renderer>(&mut self, now: u64, renderer: &mut R) -> Vec<PlayerId> {
        let stale: Vec<PlayerId> = self
            .entities
            .values_mut()
            .filter_map(|e| {
                e.stale = e.is_stale(now);
                e.stale.then(|| e.player_id.clone())
            })
            .collect();

        for id in &stale {
            info!("Removing stale remote player {}", id);
            self.remove(id, renderer);
        }
        stale
    }

    /// One render tick of interpolation for every proxy
    pub fn interpolate<R: Renderer>(&mut self, renderer: &mut R) {
        for entity in self.entities.values_mut() {
            entity.interpolate();
            renderer.update_renderable(entity.handle, entity.transform());
        }
    }

    pub fn clear<R: Renderer>(&mut self, renderer: &mut R) {
        for (_, entity) in self.entities.drain() {
            renderer.destroy_renderable(entity.handle);
        }
        self.processed.clear();
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&RemoteEntity> {
        self.entities.get(player_id)
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.entities.contains_key(player_id)
    }

    pub fn is_processed(&self, player_id: &PlayerId) -> bool {
        self.processed.contains(player_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::HeadlessRenderer;
    use assert_approx_eq::assert_approx_eq;

    fn player(id: &str, position: Vec3) -> Player {
        Player::new(
            PlayerId::from(id),
            format!("user-{}", id),
            "#ffffff".to_string(),
            position,
        )
    }

    fn entity(created_at: u64, last_update: u64) -> RemoteEntity {
        RemoteEntity {
            player_id: PlayerId::from("x"),
            username: "x".to_string(),
            handle: RenderHandle(1),
            network_position: Vec3::ZERO,
            network_rotation: Rotation::default(),
            render_position: Vec3::ZERO,
            render_rotation: Rotation::default(),
            update_count: 0,
            created_at,
            last_update,
            stale: false,
            alive: true,
        }
    }

    #[test]
    fn test_staleness_rule() {
        // Quiet but still inside the creation grace period
        assert!(!entity(0, 0).is_stale(2999));
        // Past grace, idle over 5s
        assert!(entity(0, 0).is_stale(5001));
        // Idle exactly 5s is not yet stale
        assert!(!entity(0, 0).is_stale(5000));
        // Recently updated
        assert!(!entity(0, 9000).is_stale(10_000));
        // Hard bound applies even to a young entity
        let young = entity(14_000, 0);
        assert!(!young.is_stale(HARD_STALE_AFTER_MS));
        assert!(young.is_stale(HARD_STALE_AFTER_MS + 1));
    }

    #[test]
    fn test_join_creates_renderable_once() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let p = player("a", Vec3::new(1.0, 2.0, 3.0));

        assert!(manager.on_join(&p, 0, &mut renderer));
        assert!(!manager.on_join(&p, 10, &mut renderer));
        assert_eq!(manager.len(), 1);
        assert_eq!(renderer.count_of(RenderKind::RemotePlayer), 1);
    }

    #[test]
    fn test_remove_clears_dedup_set() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let p = player("a", Vec3::ZERO);

        manager.on_join(&p, 0, &mut renderer);
        assert!(manager.remove(&p.id, &mut renderer));
        assert!(!manager.is_processed(&p.id));
        assert_eq!(renderer.live_count(), 0);

        // A legitimate rejoin is not suppressed
        assert!(manager.on_join(&p, 100, &mut renderer));
    }

    #[test]
    fn test_reconnect_duplicate_is_replaced() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let old = player("old", Vec3::new(10.0, 2.0, 10.0));
        manager.on_join(&old, 0, &mut renderer);

        let new = player("new", Vec3::new(12.0, 2.0, 11.0));
        manager.on_join(&new, 4000, &mut renderer);

        assert!(!manager.contains(&old.id));
        assert!(manager.contains(&new.id));
        assert_eq!(renderer.count_of(RenderKind::RemotePlayer), 1);
    }

    #[test]
    fn test_active_neighbour_is_not_a_duplicate() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let near = player("near", Vec3::new(10.0, 2.0, 10.0));
        manager.on_join(&near, 0, &mut renderer);
        manager.on_moved(&near.id, Vec3::new(10.0, 2.0, 10.0), Rotation::default(), 3500);

        let new = player("new", Vec3::new(11.0, 2.0, 10.0));
        manager.on_join(&new, 4000, &mut renderer);

        assert!(manager.contains(&near.id));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_far_silent_player_is_not_a_duplicate() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let far = player("far", Vec3::new(-15.0, 2.0, -15.0));
        manager.on_join(&far, 0, &mut renderer);

        manager.on_join(&player("new", Vec3::new(15.0, 2.0, 15.0)), 4000, &mut renderer);
        assert!(manager.contains(&far.id));
    }

    #[test]
    fn test_sweep_removes_only_stale() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let quiet = player("quiet", Vec3::new(-10.0, 2.0, 0.0));
        let busy = player("busy", Vec3::new(10.0, 2.0, 0.0));
        manager.on_join(&quiet, 0, &mut renderer);
        manager.on_join(&busy, 0, &mut renderer);
        manager.on_moved(&busy.id, Vec3::new(10.0, 2.0, 1.0), Rotation::default(), 5500);

        let removed = manager.sweep(6000, &mut renderer);
        assert_eq!(removed, vec![quiet.id.clone()]);
        assert!(manager.contains(&busy.id));
        assert_eq!(renderer.live_count(), 1);
    }

    #[test]
    fn test_moved_for_unknown_player_reports_miss() {
        let mut manager = RemoteEntityManager::new();
        assert!(!manager.on_moved(&PlayerId::from("ghost"), Vec3::ZERO, Rotation::default(), 0));
    }

    #[test]
    fn test_interpolation_converges_on_teleport() {
        let mut renderer = HeadlessRenderer::new();
        let mut manager = RemoteEntityManager::new();
        let p = player("a", Vec3::ZERO);
        manager.on_join(&p, 0, &mut renderer);
        manager.on_moved(&p.id, Vec3::new(100.0, 0.0, 0.0), Rotation::default(), 10);

        for _ in 0..12 {
            manager.interpolate(&mut renderer);
        }
        let entity = manager.get(&p.id).unwrap();
        assert!(entity.render_position.distance(&entity.network_position) < 1.0);

        let drawn = renderer.get(entity.handle).unwrap();
        assert_eq!(drawn.transform.position, entity.render_position);
    }

    #[test]
    fn test_rotation_turns_short_way_across_zero() {
        let mut e = entity(0, 0);
        e.render_rotation = Rotation::new(6.2, 0.0);
        e.network_rotation = Rotation::new(0.05, 0.0);

        e.interpolate();
        let turned = shared::yaw_delta(6.2, e.render_rotation.yaw);
        assert!(turned > 0.0);
        assert_approx_eq!(turned, shared::yaw_delta(6.2, 0.05) * 0.1, 1e-4);

        for _ in 0..60 {
            e.interpolate();
        }
        assert!(shared::yaw_delta(e.render_rotation.yaw, 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_interpolation_rates() {
        assert_approx_eq!(interpolation_rate(10.0), 0.5);
        assert_approx_eq!(interpolation_rate(3.0), 0.3);
        assert_approx_eq!(interpolation_rate(0.5), 0.1);
    }
}
