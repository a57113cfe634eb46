//! Client network layer: the WebSocket connection and the client loop

use crate::game::ClientGameState;
use crate::input::InputSource;
use crate::rendering::{HeadlessPresentation, HeadlessRenderer};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_server_event, encode_client_event, ClientEvent};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    /// Simulated round trip; outgoing frames are held back for half of it
    pub fake_ping: Duration,
    pub tick: Duration,
    pub sweep: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3000".to_string(),
            fake_ping: Duration::ZERO,
            tick: Duration::from_millis(16),
            sweep: Duration::from_millis(crate::remote::SWEEP_INTERVAL_MS),
        }
    }
}

pub type HeadlessGameState = ClientGameState<HeadlessRenderer, HeadlessPresentation>;

pub struct Client<I: InputSource> {
    config: ClientConfig,
    game_state: HeadlessGameState,
    input: I,
    frames_received: u64,
    frames_sent: u64,
}

impl<I: InputSource> Client<I> {
    pub fn new(config: ClientConfig, input: I) -> Self {
        Self {
            config,
            game_state: ClientGameState::new(HeadlessRenderer::new(), HeadlessPresentation::new()),
            input,
            frames_received: 0,
            frames_sent: 0,
        }
    }

    pub fn game_state(&self) -> &HeadlessGameState {
        &self.game_state
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Applies one incoming text frame. Malformed frames are dropped.
    pub fn handle_frame(&mut self, text: &str, now: u64) {
        self.frames_received += 1;
        match decode_server_event(text) {
            Ok(event) => {
                debug!("<- {}", event.kind());
                self.game_state.apply_server_event(event, now);
            }
            Err(e) => warn!("Dropping malformed frame: {}", e),
        }
    }

    /// One client tick: poll input, predict, and advance visuals. Returns the
    /// events to send.
    pub fn update(&mut self, now: u64) -> Vec<ClientEvent> {
        let dt = self.config.tick.as_secs_f32();
        let context = self.game_state.input_context();

        let mut outgoing = Vec::new();
        for intent in self.input.poll(&context) {
            outgoing.extend(self.game_state.handle_intent(intent, dt, now));
        }
        self.game_state.tick(now);
        outgoing
    }

    /// Connects and runs until the server closes the connection
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {}...", self.config.server_url);
        let (ws, _) = connect_async(self.config.server_url.as_str()).await?;
        info!("Connected");
        let (mut ws_sender, mut ws_receiver) = ws.split();

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();
        let fake_ping = self.config.fake_ping;
        let writer = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if !fake_ping.is_zero() {
                    sleep(fake_ping / 2).await;
                }
                if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                    debug!("Send failed: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let mut tick_interval = interval(self.config.tick);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sweep_interval = interval(self.config.sweep);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                message = ws_receiver.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text, get_timestamp()),
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Connection error: {}", e);
                        break;
                    }
                },

                _ = tick_interval.tick() => {
                    for event in self.update(get_timestamp()) {
                        match encode_client_event(&event) {
                            Ok(frame) => {
                                if frame_tx.send(frame).is_err() {
                                    break;
                                }
                                self.frames_sent += 1;
                            }
                            Err(e) => warn!("Could not encode outgoing event: {}", e),
                        }
                    }
                },

                _ = sweep_interval.tick() => {
                    let removed = self.game_state.sweep(get_timestamp());
                    if !removed.is_empty() {
                        debug!("Swept {} stale remote players", removed.len());
                    }
                },
            }
        }

        writer.abort();
        self.game_state.reset();
        info!(
            "Session ended: {} frames received, {} sent",
            self.frames_received, self.frames_sent
        );
        Ok(())
    }
}

fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Intent, ScriptedInput};
    use shared::{encode_server_event, Player, PlayerId, ScoreTable, ServerEvent, Vec3};

    fn init_frame() -> String {
        let me = PlayerId::from("me");
        encode_server_event(&ServerEvent::Init {
            player_id: me.clone(),
            player: Player::new(me, "Player1".to_string(), "#fff".to_string(), Vec3::ZERO),
            players: vec![],
            targets: vec![],
            scores: ScoreTable::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let mut client = Client::new(ClientConfig::default(), ScriptedInput::default());
        client.handle_frame("{not json", 0);
        client.handle_frame(r#"{"type":"noSuchEvent"}"#, 0);
        assert_eq!(client.frames_received(), 2);
        assert!(client.game_state().local().is_none());
    }

    #[test]
    fn test_no_events_before_init() {
        let input = ScriptedInput::new(vec![vec![Intent::Reload, Intent::Chat("hi".into())]]);
        let mut client = Client::new(ClientConfig::default(), input);
        assert!(client.update(0).is_empty());
    }

    #[test]
    fn test_update_turns_intents_into_events() {
        let input = ScriptedInput::new(vec![vec![
            Intent::Fire {
                direction: Vec3::new(0.0, 0.0, -1.0),
            },
            Intent::Chat("hi".into()),
        ]]);
        let mut client = Client::new(ClientConfig::default(), input);
        client.handle_frame(&init_frame(), 0);

        let events = client.update(16);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ClientEvent::Shoot { .. }));
        assert_eq!(client.game_state().local().unwrap().ammo, 29);
    }

    #[test]
    fn test_get_timestamp() {
        let first = get_timestamp();
        std::thread::sleep(Duration::from_millis(2));
        assert!(get_timestamp() > first);
    }
}
