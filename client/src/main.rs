use clap::Parser;
use client::input::BotInput;
use client::network::{Client, ClientConfig};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless bot client for the arena server", long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Client tick length in milliseconds
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// How often stale remote players are swept, in milliseconds
    #[arg(long, default_value = "2000")]
    sweep_ms: u64,

    /// Seed for the bot's decisions
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting bot client...");
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let config = ClientConfig {
        server_url: args.server,
        fake_ping: Duration::from_millis(args.fake_ping),
        tick: Duration::from_millis(args.tick_ms.max(1)),
        sweep: Duration::from_millis(args.sweep_ms.max(1)),
    };
    let mut client = Client::new(config, BotInput::new(args.seed));

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
