//! Interfaces to the renderer and presentation layer, plus a headless
//! implementation that keeps renderables in memory and logs what it draws.

use log::{debug, info};
use shared::{Rotation, ScoreTable, TargetId, Vec3};
use std::collections::HashMap;

/// Opaque reference to something the renderer is drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    RemotePlayer,
    Target,
    Bullet,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Rotation::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderAttributes {
    pub color: Option<String>,
    pub label: Option<String>,
}

pub trait Renderer {
    fn create_renderable(
        &mut self,
        kind: RenderKind,
        transform: Transform,
        attributes: RenderAttributes,
    ) -> RenderHandle;
    fn update_renderable(&mut self, handle: RenderHandle, transform: Transform);
    fn destroy_renderable(&mut self, handle: RenderHandle);
}

/// HUD, scoreboard and chat
pub trait Presentation {
    fn show_damage_flash(&mut self);
    fn update_scoreboard_ui(&mut self, scores: &ScoreTable);
    fn append_chat_line(&mut self, username: &str, text: &str);
    fn update_ammo(&mut self, ammo: u32, total_ammo: u32);
    fn target_destroyed(&mut self, target_id: TargetId);
}

#[derive(Debug, Clone)]
pub struct Renderable {
    pub kind: RenderKind,
    pub transform: Transform,
    pub attributes: RenderAttributes,
}

/// Renderer that draws nothing and remembers everything
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_handle: u64,
    live: HashMap<RenderHandle, Renderable>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: RenderHandle) -> Option<&Renderable> {
        self.live.get(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn count_of(&self, kind: RenderKind) -> usize {
        self.live.values().filter(|r| r.kind == kind).count()
    }
}

impl Renderer for HeadlessRenderer {
    fn create_renderable(
        &mut self,
        kind: RenderKind,
        transform: Transform,
        attributes: RenderAttributes,
    ) -> RenderHandle {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        debug!("create {:?} {:?} at {:?}", kind, handle, transform.position);
        self.live.insert(
            handle,
            Renderable {
                kind,
                transform,
                attributes,
            },
        );
        handle
    }

    fn update_renderable(&mut self, handle: RenderHandle, transform: Transform) {
        if let Some(renderable) = self.live.get_mut(&handle) {
            renderable.transform = transform;
        }
    }

    fn destroy_renderable(&mut self, handle: RenderHandle) {
        if let Some(renderable) = self.live.remove(&handle) {
            debug!("destroy {:?} {:?}", renderable.kind, handle);
        }
    }
}

/// Presentation layer that logs and keeps the latest HUD values
#[derive(Debug, Default)]
pub struct HeadlessPresentation {
    pub damage_flashes: u32,
    pub scoreboard: ScoreTable,
    pub chat: Vec<(String, String)>,
    pub ammo: (u32, u32),
    pub destroyed_targets: Vec<TargetId>,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presentation for HeadlessPresentation {
    fn show_damage_flash(&mut self) {
        self.damage_flashes += 1;
        debug!("damage flash");
    }

    fn update_scoreboard_ui(&mut self, scores: &ScoreTable) {
        self.scoreboard = scores.clone();
        debug!("scoreboard: {} entries", scores.len());
    }

    fn append_chat_line(&mut self, username: &str, text: &str) {
        info!("[chat] {}: {}", username, text);
        self.chat.push((username.to_string(), text.to_string()));
    }

    fn update_ammo(&mut self, ammo: u32, total_ammo: u32) {
        self.ammo = (ammo, total_ammo);
    }

    fn target_destroyed(&mut self, target_id: TargetId) {
        self.destroyed_targets.push(target_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_renderer_lifecycle() {
        let mut renderer = HeadlessRenderer::new();
        let a = renderer.create_renderable(
            RenderKind::Target,
            Transform::at(Vec3::new(1.0, 2.0, 3.0)),
            RenderAttributes::default(),
        );
        let b = renderer.create_renderable(
            RenderKind::Bullet,
            Transform::default(),
            RenderAttributes::default(),
        );
        assert_ne!(a, b);
        assert_eq!(renderer.live_count(), 2);
        assert_eq!(renderer.count_of(RenderKind::Target), 1);

        renderer.update_renderable(a, Transform::at(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(renderer.get(a).unwrap().transform.position.x, 5.0);

        renderer.destroy_renderable(a);
        renderer.destroy_renderable(a);
        assert_eq!(renderer.live_count(), 1);
        assert!(renderer.get(a).is_none());
    }

    #[test]
    fn test_headless_presentation_records() {
        let mut presentation = HeadlessPresentation::new();
        presentation.show_damage_flash();
        presentation.append_chat_line("Player1", "hello");
        presentation.update_ammo(12, 90);

        assert_eq!(presentation.damage_flashes, 1);
        assert_eq!(presentation.chat[0].1, "hello");
        assert_eq!(presentation.ammo, (12, 90));
    }
}
