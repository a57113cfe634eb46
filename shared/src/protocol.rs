//! JSON wire protocol. Every frame is one internally tagged object:
//! `{"type": "targetHit", "targetId": 3, "damage": 25}`.

use crate::entities::{Bullet, MovementFlags, Player, PlayerId, ScoreTable, Target, TargetId};
use crate::{Rotation, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Events sent from a client to the server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    PlayerMove {
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
        is_running: bool,
        is_crouching: bool,
        is_jumping: bool,
    },
    Shoot {
        position: Vec3,
        direction: Vec3,
    },
    Reload,
    TargetHit {
        target_id: TargetId,
        damage: i32,
    },
    PlayerHit {
        target_player_id: PlayerId,
        damage: i32,
    },
    ChatMessage {
        text: String,
    },
}

/// Events sent from the server to clients
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Init {
        player_id: PlayerId,
        player: Player,
        players: Vec<Player>,
        targets: Vec<Target>,
        scores: ScoreTable,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerMoved {
        player_id: PlayerId,
        position: Vec3,
        rotation: Rotation,
        velocity: Vec3,
        flags: MovementFlags,
    },
    BulletFired {
        bullet: Bullet,
        player_id: PlayerId,
        ammo: u32,
        total_ammo: u32,
    },
    Reloaded {
        ammo: u32,
        total_ammo: u32,
    },
    TargetDamaged {
        target_id: TargetId,
        health: i32,
        hit_by: PlayerId,
    },
    TargetDestroyed {
        target_id: TargetId,
        destroyed_by: PlayerId,
        points: u32,
        scores: ScoreTable,
    },
    TargetRespawned {
        target_id: TargetId,
        target: Target,
    },
    TargetsUpdate {
        targets: Vec<Target>,
    },
    PlayerDamaged {
        player_id: PlayerId,
        health: i32,
        hit_by: PlayerId,
    },
    PlayerKilled {
        killed_player_id: PlayerId,
        killer_player_id: PlayerId,
        scores: ScoreTable,
    },
    Respawn {
        position: Vec3,
        health: i32,
        ammo: u32,
    },
    PlayerRespawned {
        player_id: PlayerId,
        position: Vec3,
    },
    ChatMessage {
        player_id: PlayerId,
        username: String,
        message: String,
        timestamp: u64,
    },
    Disconnected {
        reason: String,
    },
}

impl ServerEvent {
    /// Wire name of the event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Init { .. } => "init",
            ServerEvent::PlayerJoined { .. } => "playerJoined",
            ServerEvent::PlayerLeft { .. } => "playerLeft",
            ServerEvent::PlayerMoved { .. } => "playerMoved",
            ServerEvent::BulletFired { .. } => "bulletFired",
            ServerEvent::Reloaded { .. } => "reloaded",
            ServerEvent::TargetDamaged { .. } => "targetDamaged",
            ServerEvent::TargetDestroyed { .. } => "targetDestroyed",
            ServerEvent::TargetRespawned { .. } => "targetRespawned",
            ServerEvent::TargetsUpdate { .. } => "targetsUpdate",
            ServerEvent::PlayerDamaged { .. } => "playerDamaged",
            ServerEvent::PlayerKilled { .. } => "playerKilled",
            ServerEvent::Respawn { .. } => "respawn",
            ServerEvent::PlayerRespawned { .. } => "playerRespawned",
            ServerEvent::ChatMessage { .. } => "chatMessage",
            ServerEvent::Disconnected { .. } => "disconnected",
        }
    }
}

pub fn encode_client_event(event: &ClientEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

pub fn decode_client_event(text: &str) -> Result<ClientEvent, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

pub fn decode_server_event(text: &str) -> Result<ServerEvent, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashMap;

    #[test]
    fn test_client_event_wire_shape() {
        let event = ClientEvent::TargetHit {
            target_id: 3,
            damage: 25,
        };
        let json: Value = serde_json::from_str(&encode_client_event(&event).unwrap()).unwrap();

        assert_eq!(json["type"], "targetHit");
        assert_eq!(json["targetId"], 3);
        assert_eq!(json["damage"], 25);
    }

    #[test]
    fn test_decode_browser_style_frames() {
        let reload = decode_client_event(r#"{"type":"reload"}"#).unwrap();
        assert_eq!(reload, ClientEvent::Reload);

        let hit = decode_client_event(
            r#"{"type":"playerHit","targetPlayerId":"abc","damage":25}"#,
        )
        .unwrap();
        match hit {
            ClientEvent::PlayerHit {
                target_player_id,
                damage,
            } => {
                assert_eq!(target_player_id, PlayerId::from("abc"));
                assert_eq!(damage, 25);
            }
            _ => panic!("Wrong event type after decoding"),
        }

        let movement = decode_client_event(
            r#"{"type":"playerMove","position":{"x":1,"y":2,"z":3},
                "rotation":{"yaw":0.5,"pitch":0.1},"velocity":{"x":0,"y":0,"z":0},
                "isRunning":true,"isCrouching":false,"isJumping":false}"#,
        )
        .unwrap();
        match movement {
            ClientEvent::PlayerMove {
                position,
                is_running,
                ..
            } => {
                assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));
                assert!(is_running);
            }
            _ => panic!("Wrong event type after decoding"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_client_event("not json"),
            Err(ProtocolError::Decode(_))
        ));
        assert!(decode_client_event(r#"{"type":"teleport"}"#).is_err());
        assert!(decode_client_event(r#"{"type":"targetHit","targetId":1}"#).is_err());
    }

    #[test]
    fn test_server_event_scores_serialize_as_object() {
        let mut scores = HashMap::new();
        scores.insert(PlayerId::from("p1"), 15);

        let event = ServerEvent::TargetDestroyed {
            target_id: 0,
            destroyed_by: PlayerId::from("p1"),
            points: 15,
            scores,
        };
        let text = encode_server_event(&event).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["type"], "targetDestroyed");
        assert_eq!(json["destroyedBy"], "p1");
        assert_eq!(json["scores"]["p1"], 15);

        let decoded = decode_server_event(&text).unwrap();
        assert_eq!(decoded.kind(), "targetDestroyed");
    }

    #[test]
    fn test_player_fields_are_camel_case() {
        let player = Player::new(
            PlayerId::from("p1"),
            "Player1".to_string(),
            "#00ff00".to_string(),
            Vec3::ZERO,
        );
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["totalAmmo"], 1200);
        assert_eq!(json["maxHealth"], 100);
        assert_eq!(json["isDead"], false);
    }
}
