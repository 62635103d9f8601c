//! Headless smoke client for exercising a running server.
//!
//! Joins, listens for the initial snapshot, sends a few position updates
//! and a chat line, then disconnects cleanly. Useful for manual testing
//! and for watching traffic with `RUST_LOG=debug`.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use shared::{Packet, PlayerUpdate};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name to join with
    #[arg(short, long, default_value = "smoke")]
    name: String,

    /// Number of position updates to send
    #[arg(short, long, default_value_t = 5)]
    updates: u32,
}

async fn send(socket: &UdpSocket, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send(&data).await?;
    Ok(())
}

async fn recv(socket: &UdpSocket) -> Option<Packet> {
    let mut buffer = [0u8; 65507];
    match timeout(Duration::from_secs(2), socket.recv(&mut buffer)).await {
        Ok(Ok(len)) => deserialize(&buffer[0..len]).ok(),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(&args.server).await?;
    info!("Connecting to {} as {}", args.server, args.name);

    send(
        &socket,
        &Packet::Join {
            player_id: None,
            name: args.name.clone(),
            role: None,
            x: None,
            y: None,
        },
    )
    .await?;

    let own_id = match recv(&socket).await {
        Some(Packet::Init {
            world,
            players,
            own_id,
        }) => {
            info!(
                "Joined as {}: {} players online, {} animals on the map",
                own_id,
                players.len(),
                world.animals.len()
            );
            own_id
        }
        other => {
            warn!("Did not receive init snapshot, got {:?}", other);
            return Ok(());
        }
    };

    for i in 0..args.updates {
        let update = PlayerUpdate {
            x: Some(100.0 + i as f32 * 10.0),
            y: Some(100.0),
            ..Default::default()
        };
        send(&socket, &Packet::Update { update }).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    send(
        &socket,
        &Packet::Chat {
            text: format!("{} passing through", own_id),
        },
    )
    .await?;

    // Drain whatever the server pushed at us while we were active.
    while let Some(packet) = recv(&socket).await {
        match packet {
            Packet::ChatLine { name, text, .. } => info!("<{}> {}", name, text),
            Packet::State { .. } => {}
            other => info!("Received {:?}", other),
        }
    }

    send(&socket, &Packet::Disconnect).await?;
    info!("Disconnected");
    Ok(())
}
