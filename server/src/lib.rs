//! # Authoritative World Server Library
//!
//! This library provides the authoritative server implementation for the
//! persistent multiplayer world. It owns the canonical world and player
//! state, validates every client-reported action, and broadcasts deltas to
//! keep all connected sessions synchronized.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the definitive player registry and world map. Clients
//! report intent (movement, hits, pickups); the server validates, applies
//! and redistributes. Client-declared roles and damage values are carried
//! on the wire for compatibility but never trusted.
//!
//! ### Session Management
//! Handles the complete lifecycle of client sessions including:
//! - Join handling with durable-record rehydration
//! - Connection-to-player binding and duplicate-login resolution
//! - Inactivity timeout detection and cleanup
//!
//! ### Durable Persistence
//! Player records, world snapshots, clans and mission claims survive
//! restarts through an embedded key-value store. Gameplay writes are
//! queued to a write-behind task so the event loop never waits on disk,
//! and persistence failures degrade to logging rather than dropped
//! sessions.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Event Loop
//! All state mutation happens on one `select!` loop fed by channels from
//! the network tasks, the timers and the admin command surface. This
//! serializes combat resolution and mission claims without locks around
//! game state.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets with compact binary serialization. Full snapshots go
//! only to a joining session; everyone else receives deltas, with removed
//! players encoded as tombstones.
//!
//! ## Module Organization
//!
//! - [`session`]: bidirectional connection/player binding with timeouts
//! - [`game`]: live player registry and world map mutation
//! - [`combat`]: hit validation and damage resolution
//! - [`clans`]: durable clan records with atomic creation
//! - [`missions`]: idempotent, window-scoped mission claims
//! - [`store`]: embedded key-value persistence layer
//! - [`persist`]: write-behind queue with latest-wins coalescing
//! - [`network`]: UDP plumbing, packet dispatch and the main loop
//! - [`error`]: the error taxonomy shared by the gameplay services
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         "data",
//!         ServerConfig::default(),
//!     ).await?;
//!
//!     // Runs the main loop until Ctrl-C or a shutdown command, then
//!     // flushes all live state to the store.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod clans;
pub mod combat;
pub mod error;
pub mod game;
pub mod missions;
pub mod network;
pub mod persist;
pub mod session;
pub mod store;
