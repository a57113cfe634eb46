//! Event relay: routes inbound client events to the world state and describes
//! who should receive each resulting event.

use crate::client_manager::ConnectionId;
use crate::game::GameState;
use log::warn;
use shared::{decode_client_event, ClientEvent, MovementFlags, ServerEvent};

/// Who an outbound event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every connection
    Broadcast,
    /// Every connection except the given one (usually the sender)
    BroadcastExcept(ConnectionId),
    /// Only the given connection
    Unicast(ConnectionId),
}

impl Delivery {
    pub fn includes(&self, connection_id: ConnectionId) -> bool {
        match *self {
            Delivery::Broadcast => true,
            Delivery::BroadcastExcept(excluded) => connection_id != excluded,
            Delivery::Unicast(recipient) => connection_id == recipient,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub scope: Delivery,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            scope: Delivery::Broadcast,
            event,
        }
    }

    pub fn broadcast_except(excluded: ConnectionId, event: ServerEvent) -> Self {
        Self {
            scope: Delivery::BroadcastExcept(excluded),
            event,
        }
    }

    pub fn unicast(recipient: ConnectionId, event: ServerEvent) -> Self {
        Self {
            scope: Delivery::Unicast(recipient),
            event,
        }
    }
}

/// Applies one decoded client event to the world and returns what to send
pub fn dispatch(
    game: &mut GameState,
    connection_id: ConnectionId,
    event: ClientEvent,
    now: u64,
) -> Vec<Outbound> {
    match event {
        ClientEvent::PlayerMove {
            position,
            rotation,
            velocity,
            is_running,
            is_crouching,
            is_jumping,
        } => game.on_player_move(
            connection_id,
            position,
            rotation,
            velocity,
            MovementFlags {
                is_running,
                is_crouching,
                is_jumping,
            },
        ),
        ClientEvent::Shoot {
            position,
            direction,
        } => game.on_shoot(connection_id, position, direction, now),
        ClientEvent::Reload => game.on_reload(connection_id),
        ClientEvent::TargetHit { target_id, damage } => {
            game.on_target_hit(connection_id, target_id, damage, now)
        }
        ClientEvent::PlayerHit {
            target_player_id,
            damage,
        } => game.on_player_hit(connection_id, &target_player_id, damage, now),
        ClientEvent::ChatMessage { text } => game.on_chat(connection_id, text, now),
    }
}

/// Decodes a raw text frame and dispatches it. Malformed frames are dropped.
pub fn handle_frame(
    game: &mut GameState,
    connection_id: ConnectionId,
    frame: &str,
    now: u64,
) -> Vec<Outbound> {
    match decode_client_event(frame) {
        Ok(event) => dispatch(game, connection_id, event, now),
        Err(e) => {
            warn!("Connection {} sent a malformed frame: {}", connection_id, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec3;

    fn game_with_player() -> (GameState, ConnectionId) {
        let mut game = GameState::with_seed(7, 0);
        game.on_connect(1, 0);
        (game, 1)
    }

    #[test]
    fn test_delivery_includes() {
        assert!(Delivery::Broadcast.includes(1));
        assert!(!Delivery::BroadcastExcept(1).includes(1));
        assert!(Delivery::BroadcastExcept(1).includes(2));
        assert!(Delivery::Unicast(2).includes(2));
        assert!(!Delivery::Unicast(2).includes(3));
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let (mut game, conn) = game_with_player();
        assert!(handle_frame(&mut game, conn, "{not json", 10).is_empty());
        assert!(handle_frame(&mut game, conn, r#"{"type":"fly"}"#, 10).is_empty());
        // Still playable afterwards
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_frame_dispatches_shoot() {
        let (mut game, conn) = game_with_player();
        let frame = r#"{"type":"shoot","position":{"x":0,"y":2,"z":0},"direction":{"x":0,"y":0,"z":-1}}"#;

        let out = handle_frame(&mut game, conn, frame, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scope, Delivery::Broadcast);
        match &out[0].event {
            ServerEvent::BulletFired { bullet, ammo, .. } => {
                assert_eq!(*ammo, shared::MAGAZINE_CAPACITY - 1);
                assert_eq!(bullet.direction, Vec3::new(0.0, 0.0, -1.0));
            }
            other => panic!("Unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_frame_dispatches_reload_as_unicast() {
        let (mut game, conn) = game_with_player();
        game.player_mut(conn).unwrap().ammo = 10;

        let out = handle_frame(&mut game, conn, r#"{"type":"reload"}"#, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scope, Delivery::Unicast(conn));
    }

    #[test]
    fn test_dispatch_move_excludes_sender() {
        let (mut game, conn) = game_with_player();
        let out = dispatch(
            &mut game,
            conn,
            ClientEvent::PlayerMove {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: shared::Rotation::new(0.3, 0.0),
                velocity: Vec3::ZERO,
                is_running: true,
                is_crouching: false,
                is_jumping: false,
            },
            10,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scope, Delivery::BroadcastExcept(conn));
    }
}
