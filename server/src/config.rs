//! Server configuration assembled from command-line arguments

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the WebSocket listener to
    pub bind_addr: String,
    /// Connections beyond this are refused
    pub max_clients: usize,
    /// Period of the target animation broadcast
    pub target_tick: Duration,
    /// How often the deferred task queue is drained
    pub task_poll: Duration,
    /// Seed for spawn and respawn rolls; entropy when absent
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            max_clients: 32,
            target_tick: Duration::from_millis(shared::TARGET_TICK_MS),
            task_poll: Duration::from_millis(50),
            seed: None,
        }
    }
}
