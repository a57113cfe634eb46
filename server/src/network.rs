//! Server network layer: WebSocket connections and the main event loop

use crate::client_manager::{ClientManager, ConnectionId, FrameSender};
use crate::config::ServerConfig;
use crate::game::GameState;
use crate::relay::{self, Outbound};
use crate::utils::get_timestamp;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{encode_server_event, ServerEvent};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    NewConnection {
        addr: SocketAddr,
        sender: FrameSender,
        reply: oneshot::Sender<Option<ConnectionId>>,
    },
    FrameReceived {
        connection_id: ConnectionId,
        text: String,
    },
    ConnectionClosed {
        connection_id: ConnectionId,
    },
    Shutdown,
}

/// Main server coordinating connections and the world state.
///
/// The world state is owned by the loop in [`Server::run`]; connection tasks
/// only talk to it through the message channel, so every mutation is handled
/// to completion before the next message or timer is looked at.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    clients: ClientManager,
    game_state: GameState,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let now = get_timestamp();
        let game_state = match config.seed {
            Some(seed) => GameState::with_seed(seed, now),
            None => GameState::from_entropy(now),
        };
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_clients),
            config,
            game_state,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for injecting messages into the loop, e.g. a shutdown request
    pub fn sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns the task accepting TCP connections and upgrading them
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        tokio::spawn(handle_connection(stream, addr, server_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn deliver(&self, outbound: Vec<Outbound>) {
        self.clients.deliver_all(&outbound);
    }

    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::NewConnection {
                addr,
                sender,
                reply,
            } => match self.clients.add_client(addr, sender.clone()) {
                Some(connection_id) => {
                    let _ = reply.send(Some(connection_id));
                    let out = self.game_state.on_connect(connection_id, get_timestamp());
                    self.deliver(out);
                }
                None => {
                    warn!("Refusing connection from {}: server full", addr);
                    let refusal = ServerEvent::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    if let Ok(frame) = encode_server_event(&refusal) {
                        let _ = sender.send(frame);
                    }
                    let _ = reply.send(None);
                }
            },

            ServerMessage::FrameReceived {
                connection_id,
                text,
            } => {
                if !self.clients.contains(&connection_id) {
                    return true;
                }
                let out =
                    relay::handle_frame(&mut self.game_state, connection_id, &text, get_timestamp());
                self.deliver(out);
            }

            ServerMessage::ConnectionClosed { connection_id } => {
                self.clients.remove_client(&connection_id);
                let out = self.game_state.on_disconnect(connection_id);
                self.deliver(out);
            }

            ServerMessage::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Main server loop: connection events, task queue and target animation
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();

        let mut target_interval = interval(self.config.target_tick);
        target_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut task_interval = interval(self.config.task_poll);
        task_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    if !self.handle_message(message) {
                        break;
                    }
                },

                _ = task_interval.tick() => {
                    let out = self.game_state.run_due_tasks(get_timestamp());
                    self.deliver(out);
                },

                _ = target_interval.tick() => {
                    let snapshot = self.game_state.animate_targets(get_timestamp());
                    if !self.clients.is_empty() {
                        self.clients.deliver(&snapshot);
                    }
                },
            }
        }

        Ok(())
    }
}

/// Runs one WebSocket connection: upgrades, registers, then pumps frames
/// both ways until either side closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws.split();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();
    let (reply_tx, reply_rx) = oneshot::channel();

    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                debug!("Write to {} failed: {}", addr, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    if server_tx
        .send(ServerMessage::NewConnection {
            addr,
            sender: frame_tx,
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }

    let connection_id = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            // Refused: the writer flushes the refusal and closes
            let _ = writer.await;
            return;
        }
    };

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if server_tx
                    .send(ServerMessage::FrameReceived {
                        connection_id,
                        text,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} errored: {}", connection_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::ConnectionClosed { connection_id });
    writer.abort();
}
