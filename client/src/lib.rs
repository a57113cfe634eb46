//! # Arena Client Library
//!
//! Client-side half of the arena shooter's state synchronisation. The client
//! never owns game truth: it mirrors what the server broadcasts and only
//! predicts the local player's own movement and ammo.
//!
//! ## Architecture Overview
//!
//! ### Local Prediction
//! Moving and firing are applied to the local player straight away so the
//! controls do not wait on a round trip. Ammo counts echoed back by the server
//! overwrite the prediction. Hits are reported to the server and only show up
//! once the server confirms them.
//!
//! ### Reconciliation
//! Every server event is applied to local proxies for players and targets.
//! A destroyed target stays destroyed until the server respawns it, no matter
//! what stale damage events arrive later. Score tables are replaced wholesale.
//!
//! ### Remote Entity Lifecycle
//! Remote players are drawn at an interpolated position that chases the last
//! network position. Because leave events can be lost, proxies that stop
//! receiving updates are swept away periodically, and a player joining on top
//! of a silent proxy replaces it.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The reconciler: applies [`shared::ServerEvent`]s, owns target proxies,
//! bullet visuals and the score table.
//!
//! ### Prediction Module (`prediction`)
//! The local player's state and the optimistic updates applied to it.
//!
//! ### Remote Module (`remote`)
//! Remote player proxies, interpolation, staleness and de-duplication.
//!
//! ### Input Module (`input`)
//! Player intents, the [`input::InputSource`] trait and a wandering bot.
//!
//! ### Rendering Module (`rendering`)
//! The renderer and presentation interfaces the reconciler draws through,
//! with a headless implementation.
//!
//! ### Network Module (`network`)
//! WebSocket connection, outgoing frame queue, and the tick/sweep loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::BotInput;
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ClientConfig::default(), BotInput::new(None));
//!     client.run().await
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod prediction;
pub mod remote;
pub mod rendering;
