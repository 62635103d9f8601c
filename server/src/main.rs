//! Server binary entry point.

use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use std::time::Duration;

/// Authoritative world server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Directory for the durable store
    #[arg(short, long, default_value = "data")]
    data_dir: String,

    /// Seconds of inactivity before a session is dropped
    #[arg(long, default_value_t = 30)]
    session_timeout: u64,

    /// Seconds between ambient entity spawns
    #[arg(long, default_value_t = 30)]
    spawn_interval: u64,

    /// Seconds between expired-claim sweeps
    #[arg(long, default_value_t = 60)]
    sweep_interval: u64,

    /// Seconds between ambient world events
    #[arg(long, default_value_t = 120)]
    ambient_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let config = ServerConfig {
        session_timeout: Duration::from_secs(args.session_timeout),
        spawn_interval: Duration::from_secs(args.spawn_interval),
        sweep_interval: Duration::from_secs(args.sweep_interval),
        ambient_interval: Duration::from_secs(args.ambient_interval),
        ..ServerConfig::default()
    };

    info!("Starting server on {} (data in {})", addr, args.data_dir);

    let mut server = Server::new(&addr, &args.data_dir, config).await?;
    server.run().await?;

    Ok(())
}
