//! Server network layer handling UDP communications and event loop coordination.
//!
//! One loop owns the authoritative state. Packets, timer ticks and admin
//! commands all funnel into the same `select!`, which is what serializes
//! every mutation: combat resolution and claim idempotency rely on it.
//! Outbound traffic and durable writes each run on their own task so the
//! loop never waits on a socket or the store.

use crate::clans::{Clan, ClanMember, ClanService};
use crate::combat::{self, HitOutcome};
use crate::error::GameError;
use crate::game::GameState;
use crate::missions::{Mission, MissionBoard};
use crate::persist::Persister;
use crate::session::SessionManager;
use crate::store::Store;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{get_timestamp, Loot, Packet, Player, WorldEntity};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::interval;

/// Timer and timeout tuning for a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Inactivity threshold before a session is treated as disconnected.
    pub session_timeout: Duration,
    /// Cadence of ambient entity spawns.
    pub spawn_interval: Duration,
    /// Cadence of the expired-claim sweep.
    pub sweep_interval: Duration,
    /// Cadence of ambient/global events.
    pub ambient_interval: Duration,
    /// How long shutdown may wait on the final persistence flush.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30),
            spawn_interval: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
            ambient_interval: Duration::from_secs(120),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Messages sent from network tasks and admin callers to the main loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    SessionTimeout {
        addr: SocketAddr,
        player_id: String,
    },
    Command {
        cmd: AdminCommand,
        reply: oneshot::Sender<AdminReply>,
    },
    Shutdown,
}

/// Messages sent from the main loop to the outbound network task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<SocketAddr>,
    },
}

/// Request/response operations consumed by the collaborator HTTP layer.
#[derive(Debug)]
pub enum AdminCommand {
    CreateClan {
        id: String,
        name: String,
        owner: String,
    },
    JoinClan {
        clan_id: String,
        player_id: String,
    },
    GetClan {
        id: String,
    },
    ListMissions,
    ClaimMission {
        mission_id: String,
        player_id: String,
    },
    PersistWorld,
    SpawnLoot {
        id: String,
        x: f32,
        y: f32,
        item: String,
    },
    Status,
}

/// Structured outcome of an admin command, carrying a machine-readable
/// reason on failure.
#[derive(Debug)]
pub enum AdminReply {
    Done,
    Clan {
        clan: Clan,
        members: Vec<ClanMember>,
    },
    Missions(Vec<Mission>),
    Claimed {
        mission_id: String,
        reward: HashMap<String, u32>,
    },
    Status {
        players: usize,
        entities: HashMap<String, usize>,
    },
    Failed(GameError),
}

/// Cheap-to-clone handle for injecting admin commands and shutdown into the
/// running loop from outside (HTTP collaborator, tests).
#[derive(Clone)]
pub struct ServerHandle {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    /// Runs one admin command through the serialized authority and waits
    /// for its reply.
    pub async fn command(&self, cmd: AdminCommand) -> AdminReply {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(ServerMessage::Command {
                cmd,
                reply: reply_tx,
            })
            .is_err()
        {
            return AdminReply::Failed(GameError::Invalid("server is not running".to_string()));
        }
        reply_rx
            .await
            .unwrap_or_else(|_| AdminReply::Failed(GameError::Invalid("server dropped the command".to_string())))
    }

    /// Asks the loop to perform the graceful shutdown sequence.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ServerMessage::Shutdown);
    }
}

/// Main server coordinating networking, state and persistence.
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionManager>>,
    game: GameState,
    missions: MissionBoard,
    clans: ClanService,
    store: Arc<Store>,
    persister: Persister,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        data_dir: impl AsRef<std::path::Path>,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        // A store that cannot open is the one startup failure that is fatal.
        let store = Arc::new(Store::open(data_dir)?);
        let world = store.load_world()?.unwrap_or_default();
        info!(
            "World rehydrated: {} animals, {} wheels, {} loot drops",
            world.animals.len(),
            world.wheels.len(),
            world.loot.len()
        );

        let game = GameState::new(world);
        let missions = MissionBoard::load(Arc::clone(&store))?;
        let clans = ClanService::new(Arc::clone(&store));
        let persister = Persister::spawn(Arc::clone(&store));

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionManager::new(config.session_timeout))),
            game,
            missions,
            clans,
            store,
            persister,
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Address the socket actually bound to (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for admin commands and shutdown.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 4096];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let addrs = {
                            let sessions_guard = sessions.read().await;
                            sessions_guard.addrs()
                        };

                        for addr in addrs {
                            if Some(addr) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors session timeouts
    async fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut sessions_guard = sessions.write().await;
                    sessions_guard.check_timeouts()
                };

                for (addr, player_id) in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { addr, player_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<SocketAddr>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Unicast to the connection currently bound to a player, if any.
    async fn unicast_player(&self, player_id: &str, packet: &Packet) {
        let target = {
            let sessions = self.sessions.read().await;
            sessions.target_of(player_id)
        };
        if let Some(addr) = target {
            self.send_packet(packet, addr).await;
        }
    }

    /// Builds a `State` delta for a set of players. `None` entries are
    /// tombstones.
    fn player_delta(entries: Vec<(String, Option<Player>)>) -> Packet {
        Packet::State {
            players: Some(entries.into_iter().collect()),
            world: None,
        }
    }

    fn world_delta(&self) -> Packet {
        Packet::State {
            players: None,
            world: Some(self.game.world.snapshot()),
        }
    }

    /// Processes one inbound packet. Real-time actions fail closed: any
    /// validation miss drops the action without an error to the sender.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        {
            let mut sessions = self.sessions.write().await;
            sessions.touch(addr);
        }

        match packet {
            Packet::Join {
                player_id,
                name,
                role,
                x,
                y,
            } => {
                // Accepted on the wire, decided by the server: client role
                // never applies to a fresh record, and spawn positions are
                // assigned here.
                let _ = (role, x, y);

                let stored = match player_id.as_deref() {
                    Some(id) => match self.store.get_player(id) {
                        Ok(stored) => stored,
                        Err(e) => {
                            error!("Failed to load player {}: {}", id, e);
                            None
                        }
                    },
                    None => None,
                };

                let player = match stored {
                    Some(record) => self.game.join_rehydrated(record, &name),
                    None => self.game.join_fresh(&name),
                };

                {
                    let mut sessions = self.sessions.write().await;
                    sessions.bind(addr, player.id.clone());
                }
                self.persister.queue_player(player.clone());

                // Full snapshot to the joiner, delta to everyone else.
                let init = Packet::Init {
                    world: self.game.world.snapshot(),
                    players: self.game.players.clone(),
                    own_id: player.id.clone(),
                };
                self.send_packet(&init, addr).await;

                let delta = Self::player_delta(vec![(player.id.clone(), Some(player))]);
                self.broadcast_packet(&delta, Some(addr)).await;
            }

            Packet::Update { update } => {
                let player_id = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr)
                };
                let Some(player_id) = player_id else {
                    debug!("Dropped update from unbound connection {}", addr);
                    return;
                };

                if let Some(updated) = self.game.apply_update(&player_id, &update) {
                    self.persister.queue_player(updated.clone());
                    // The origin already has the value locally.
                    let delta = Self::player_delta(vec![(player_id, Some(updated))]);
                    self.broadcast_packet(&delta, Some(addr)).await;
                }
            }

            Packet::Chat { text } => {
                let player_id = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr)
                };
                let Some(player_id) = player_id else { return };
                let Some(player) = self.game.players.get(&player_id) else {
                    return;
                };

                let line = Packet::ChatLine {
                    id: player.id.clone(),
                    name: player.name.clone(),
                    text,
                };
                self.broadcast_packet(&line, None).await;
            }

            Packet::BuildWheel { id, x, y } => {
                let bound = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr).is_some()
                };
                if !bound {
                    return;
                }

                self.game
                    .world
                    .add(WorldEntity::Wheel(shared::Wheel { id, x, y }));
                self.persister.queue_world(self.game.world.snapshot());
                let delta = self.world_delta();
                self.broadcast_packet(&delta, None).await;
            }

            Packet::PickupLoot { id } => {
                let bound = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr).is_some()
                };
                if !bound {
                    return;
                }

                if self.game.world.remove_loot(&id) {
                    self.persister.queue_world(self.game.world.snapshot());
                    let delta = self.world_delta();
                    self.broadcast_packet(&delta, None).await;
                }
            }

            Packet::KillAnimal { id } => {
                let bound = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr).is_some()
                };
                if !bound {
                    return;
                }

                if self.game.world.remove_animal(&id) {
                    self.persister.queue_world(self.game.world.snapshot());
                    let delta = self.world_delta();
                    self.broadcast_packet(&delta, None).await;
                }
            }

            Packet::JoinFort { fort } => {
                let player_id = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr)
                };
                let Some(player_id) = player_id else { return };

                let update = shared::PlayerUpdate {
                    fort: Some(fort),
                    ..Default::default()
                };
                if let Some(updated) = self.game.apply_update(&player_id, &update) {
                    self.persister.queue_player(updated.clone());
                    let delta = Self::player_delta(vec![(player_id, Some(updated))]);
                    self.broadcast_packet(&delta, None).await;
                }
            }

            Packet::Hit {
                target,
                kind,
                declared_damage,
            } => {
                // Declared damage is part of the wire format and nothing
                // else; resolution uses the server-side table only.
                let _ = declared_damage;

                let attacker_id = {
                    let sessions = self.sessions.read().await;
                    sessions.resolve(addr)
                };
                let Some(attacker_id) = attacker_id else {
                    debug!("Dropped hit from unbound connection {}", addr);
                    return;
                };

                match combat::resolve_hit(&mut self.game, &attacker_id, &target, kind) {
                    None => {} // validation failed: silent drop
                    Some(HitOutcome::Blocked { target }) => {
                        let ack = Packet::HitResult {
                            target: target.id,
                            damage: 0,
                            health: target.health,
                        };
                        self.send_packet(&ack, addr).await;
                    }
                    Some(HitOutcome::Damaged { target, damage }) => {
                        self.persister.queue_player(target.clone());

                        let delta =
                            Self::player_delta(vec![(target.id.clone(), Some(target.clone()))]);
                        self.broadcast_packet(&delta, None).await;

                        let result = Packet::HitResult {
                            target: target.id.clone(),
                            damage,
                            health: target.health,
                        };
                        self.send_packet(&result, addr).await;

                        let taken = Packet::HitTaken {
                            attacker: attacker_id,
                            damage,
                            health: target.health,
                        };
                        self.unicast_player(&target.id, &taken).await;
                    }
                    Some(HitOutcome::Killed {
                        attacker,
                        target,
                        damage: _,
                    }) => {
                        self.persister.queue_player(attacker.clone());
                        self.persister.queue_player(target.clone());

                        let feed = Packet::KillFeed {
                            killer: attacker.name.clone(),
                            victim: target.name.clone(),
                        };
                        self.broadcast_packet(&feed, None).await;

                        let delta = Self::player_delta(vec![
                            (attacker.id.clone(), Some(attacker)),
                            (target.id.clone(), Some(target)),
                        ]);
                        self.broadcast_packet(&delta, None).await;
                    }
                }
            }

            Packet::Disconnect => {
                let player_id = {
                    let mut sessions = self.sessions.write().await;
                    sessions.unbind(addr)
                };
                if let Some(player_id) = player_id {
                    self.finish_disconnect(&player_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Removes a departed player from the live registry, queues the final
    /// durable write, and tombstones them for the remaining sessions.
    async fn finish_disconnect(&mut self, player_id: &str) {
        if let Some(final_state) = self.game.remove_player(player_id) {
            self.persister.queue_player(final_state);
            let tombstone = Self::player_delta(vec![(player_id.to_string(), None)]);
            self.broadcast_packet(&tombstone, None).await;
        }
    }

    async fn handle_command(&mut self, cmd: AdminCommand, reply: oneshot::Sender<AdminReply>) {
        let response = match cmd {
            AdminCommand::CreateClan { id, name, owner } => {
                match self.clans.create(&id, &name, &owner) {
                    Ok(_) => AdminReply::Done,
                    Err(e) => AdminReply::Failed(e),
                }
            }
            AdminCommand::JoinClan { clan_id, player_id } => {
                match self.clans.join(&clan_id, &player_id) {
                    Ok(_) => AdminReply::Done,
                    Err(e) => AdminReply::Failed(e),
                }
            }
            AdminCommand::GetClan { id } => match self.clans.fetch(&id) {
                Ok((clan, members)) => AdminReply::Clan { clan, members },
                Err(e) => AdminReply::Failed(e),
            },
            AdminCommand::ListMissions => AdminReply::Missions(self.missions.active()),
            AdminCommand::ClaimMission {
                mission_id,
                player_id,
            } => match self.missions.claim(&mission_id, &player_id, get_timestamp()) {
                Ok(mission) => {
                    let notice = Packet::MissionClaimed {
                        mission_id: mission.id.clone(),
                        reward: mission.reward.clone(),
                    };
                    self.unicast_player(&player_id, &notice).await;
                    AdminReply::Claimed {
                        mission_id: mission.id,
                        reward: mission.reward,
                    }
                }
                Err(e) => AdminReply::Failed(e),
            },
            AdminCommand::PersistWorld => {
                self.persister.queue_world(self.game.world.snapshot());
                AdminReply::Done
            }
            AdminCommand::SpawnLoot { id, x, y, item } => {
                let entity = WorldEntity::Loot(Loot { id, x, y, item });
                self.game.world.add(entity.clone());
                self.persister.queue_world(self.game.world.snapshot());
                self.broadcast_packet(&Packet::EntitySpawned { entity }, None)
                    .await;
                AdminReply::Done
            }
            AdminCommand::Status => AdminReply::Status {
                players: self.game.players.len(),
                entities: self.game.world.counts(),
            },
        };

        if reply.send(response).is_err() {
            debug!("Admin caller went away before the reply");
        }
    }

    /// Flushes every live player and the world snapshot, bounded by the
    /// configured grace period so a stuck store cannot hang shutdown.
    async fn shutdown_flush(&mut self) {
        for player in self.game.players.values() {
            self.persister.queue_player(player.clone());
        }
        self.persister.queue_world(self.game.world.snapshot());

        match tokio::time::timeout(self.config.shutdown_grace, self.persister.flush()).await {
            Ok(()) => info!("Final state flushed"),
            Err(_) => warn!(
                "Persistence flush did not finish within {:?}; exiting anyway",
                self.config.shutdown_grace
            ),
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut spawn_timer = interval(self.config.spawn_interval);
        let mut sweep_timer = interval(self.config.sweep_interval);
        let mut ambient_timer = interval(self.config.ambient_interval);
        // Intervals fire immediately once; skip those.
        spawn_timer.tick().await;
        sweep_timer.tick().await;
        ambient_timer.tick().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events and admin commands
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::SessionTimeout { addr, player_id }) => {
                            // A rejoin may have raced the timeout message;
                            // a live binding means the player is back.
                            let rebound = {
                                let sessions = self.sessions.read().await;
                                sessions.target_of(&player_id).is_some()
                            };
                            if rebound {
                                debug!("Ignoring stale timeout for {}", player_id);
                            } else {
                                info!("Session {} timed out ({})", addr, player_id);
                                self.finish_disconnect(&player_id).await;
                            }
                        },
                        Some(ServerMessage::Command { cmd, reply }) => {
                            self.handle_command(cmd, reply).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Ambient entity spawner: announce only the new entity
                _ = spawn_timer.tick() => {
                    let entity = self.game.spawn_ambient_entity();
                    self.persister.queue_world(self.game.world.snapshot());
                    self.broadcast_packet(&Packet::EntitySpawned { entity }, None).await;
                },

                // Expired claim sweep
                _ = sweep_timer.tick() => {
                    self.missions.sweep(get_timestamp());
                },

                // Ambient/global event: no state mutation
                _ = ambient_timer.tick() => {
                    let severity = rand::thread_rng().gen_range(1..=5);
                    let event = Packet::AmbientEvent {
                        severity,
                        timestamp: get_timestamp(),
                    };
                    self.broadcast_packet(&event, None).await;
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received termination signal, shutting down");
                    break;
                },
            }
        }

        self.shutdown_flush().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MAX_HEALTH;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_server_message_creation() {
        let packet = Packet::Chat {
            text: "hello".to_string(),
        };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Chat { text } => assert_eq!(text, "hello"),
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_session_timeout_message() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9191);
        let msg = ServerMessage::SessionTimeout {
            addr,
            player_id: "p42".to_string(),
        };

        match msg {
            ServerMessage::SessionTimeout { addr: a, player_id } => {
                assert_eq!(a, addr);
                assert_eq!(player_id, "p42");
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_broadcast_exclusion() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 9090);
        let msg = GameMessage::BroadcastPacket {
            packet: Packet::KillFeed {
                killer: "Ana".to_string(),
                victim: "Bo".to_string(),
            },
            exclude: Some(addr),
        };

        match msg {
            GameMessage::BroadcastPacket { exclude, .. } => {
                assert_eq!(exclude, Some(addr));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_player_delta_builder() {
        let player = Player::new("p1".to_string(), "Ana".to_string(), 0.0, 0.0);
        let delta = Server::player_delta(vec![
            ("p1".to_string(), Some(player)),
            ("p2".to_string(), None),
        ]);

        match delta {
            Packet::State { players, world } => {
                assert!(world.is_none());
                let players = players.unwrap();
                assert_eq!(players.len(), 2);
                assert_eq!(players["p1"].as_ref().unwrap().health, MAX_HEALTH);
                assert!(players["p2"].is_none()); // tombstone
            }
            _ => panic!("Expected State packet"),
        }
    }

    #[test]
    fn test_config_defaults_are_sane() {
        let config = ServerConfig::default();
        assert!(config.session_timeout > Duration::from_secs(0));
        assert!(config.shutdown_grace < config.session_timeout);
    }
}
