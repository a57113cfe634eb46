//! # Arena Server Library
//!
//! Authoritative relay server for the arena shooter. It owns the canonical
//! state of every player, target, bullet and score, validates the events
//! clients send, and rebroadcasts the resulting changes.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Players, targets, bullets and the score table live in one store
//! ([`game::GameState`]) and are only changed through its operations. Hit
//! registration is reported by clients and trusted as-is; the server decides
//! what those hits mean for health, destruction and score.
//!
//! ### Connection Management
//! [`client_manager::ClientManager`] maps each transient connection id to the
//! queue feeding that connection's socket, enforces the capacity limit, and
//! fans encoded events out by delivery scope (everyone, everyone but the
//! sender, or one connection). A recipient that has gone away is skipped
//! without affecting delivery to the others.
//!
//! ### Timers
//! Bullet expiry and respawns go through a deferred task queue
//! ([`scheduler::Scheduler`]). Tasks carry only an entity id and re-check the
//! entity when they fire, so nothing needs cancelling when a player leaves
//! first. A 10 Hz animation tick ([`animator`]) spins and bobs live targets and
//! broadcasts the full target list, which doubles as a periodic resync.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Connection tasks only forward raw frames; all state
//! changes happen inside [`network::Server::run`], one message or timer at a
//! time. No locks guard the world state because nothing else can reach it.
//!
//! ### WebSocket Transport
//! One persistent WebSocket per client carrying JSON text frames. There is no
//! acknowledgement or retry layer; lost state is repaired by the periodic
//! target snapshot and by score tables always being sent whole.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod animator;
pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod relay;
pub mod scheduler;
pub mod spawn;
pub mod utils;
