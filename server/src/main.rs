use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Maximum number of concurrent players
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Target animation broadcast period in milliseconds
    #[arg(long, default_value = "100")]
    target_tick_ms: u64,

    /// How often scheduled respawns and expiries are checked, in milliseconds
    #[arg(long, default_value = "50")]
    task_poll_ms: u64,

    /// Seed for spawn and respawn randomness
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        target_tick: Duration::from_millis(args.target_tick_ms.max(1)),
        task_poll: Duration::from_millis(args.task_poll_ms.max(1)),
        seed: args.seed,
    };

    info!("Starting server with {:?}", config);

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
