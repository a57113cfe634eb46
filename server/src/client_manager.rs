//! Connection registry for the arena server
//!
//! This module tracks the transport side of every live connection:
//! - Connection id allocation and capacity enforcement
//! - The outbound queue feeding each connection's socket writer
//! - Fan-out of encoded events according to their delivery scope
//!
//! Player records themselves live in the game state, keyed by the same
//! connection id; the registry only knows how to reach a connection.

use crate::relay::Outbound;
use log::{debug, info, warn};
use shared::encode_server_event;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// Transient identifier, one per accepted socket
pub type ConnectionId = u32;

/// Sending half of a connection's outbound text-frame queue
pub type FrameSender = mpsc::UnboundedSender<String>;

/// A connected client and the queue its socket writer drains
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: ConnectionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// When the connection was registered
    pub connected_at: Instant,
    sender: FrameSender,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: FrameSender) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a frame for this connection. Fails only if the writer is gone.
    pub fn send(&self, frame: String) -> bool {
        self.sender.send(frame).is_ok()
    }
}

/// Manages all live connections and delivers outbound events to them
pub struct ClientManager {
    /// Connected clients indexed by connection id
    clients: HashMap<ConnectionId, Client>,
    /// Next available id for new connections
    next_client_id: ConnectionId,
    /// Maximum number of concurrent connections allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a registry with the given capacity. Ids start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns the assigned id, or None if the server is at capacity. Each id
    /// is handed out once, so a connection id never maps to two clients.
    pub fn add_client(&mut self, addr: SocketAddr, sender: FrameSender) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Connection {} registered from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Removes a connection. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Connection {} from {} closed after {:.1}s",
                client.id,
                client.addr,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    pub fn contains(&self, client_id: &ConnectionId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Encodes the event once and queues it for every recipient in scope.
    ///
    /// A recipient whose writer has already gone away is skipped; delivery to
    /// the rest continues. Returns the number of connections reached.
    pub fn deliver(&self, outbound: &Outbound) -> usize {
        let frame = match encode_server_event(&outbound.event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping {} event: {}", outbound.event.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        for client in self.clients.values() {
            if !outbound.scope.includes(client.id) {
                continue;
            }

            if client.send(frame.clone()) {
                delivered += 1;
            } else {
                debug!(
                    "Connection {} went away before {} could be delivered",
                    client.id,
                    outbound.event.kind()
                );
            }
        }
        delivered
    }

    pub fn deliver_all(&self, outbound: &[Outbound]) {
        for item in outbound {
            self.deliver(item);
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
