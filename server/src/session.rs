//! Session tracking for live connections.
//!
//! This module owns the bidirectional index between transport connections
//! (source addresses) and player ids. It is the only place allowed to answer
//! "which connection is player X behind" for targeted messages, and it is
//! deliberately free of game logic: callers decide what to broadcast after a
//! bind or unbind.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One live connection bound to a player id. Ephemeral: created on join,
/// destroyed on disconnect or timeout, never persisted.
#[derive(Debug)]
pub struct Session {
    /// Network address the client sends from, used for response routing.
    pub addr: SocketAddr,
    /// Player this connection is authenticated as.
    pub player_id: String,
    /// Last time any packet arrived on this connection.
    pub last_seen: Instant,
}

impl Session {
    pub fn new(addr: SocketAddr, player_id: String) -> Self {
        Self {
            addr,
            player_id,
            last_seen: Instant::now(),
        }
    }

    /// Returns true if no packets have arrived within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Tracks every live session and both lookup directions. All operations are
/// O(1) hash lookups; the tables are local bookkeeping with no side effects
/// beyond themselves.
pub struct SessionManager {
    by_addr: HashMap<SocketAddr, Session>,
    by_player: HashMap<String, SocketAddr>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            by_addr: HashMap::new(),
            by_player: HashMap::new(),
            timeout,
        }
    }

    /// Binds a connection to a player id, replacing any prior binding for
    /// either side. A second join for a live player id rebinds that id to
    /// the newer connection (last join wins); the stale connection stops
    /// resolving and will eventually time out.
    pub fn bind(&mut self, addr: SocketAddr, player_id: String) {
        if let Some(old) = self.by_addr.remove(&addr) {
            self.by_player.remove(&old.player_id);
        }
        if let Some(old_addr) = self.by_player.remove(&player_id) {
            self.by_addr.remove(&old_addr);
        }

        info!("Session bound: {} -> {}", addr, player_id);
        self.by_player.insert(player_id.clone(), addr);
        self.by_addr.insert(addr, Session::new(addr, player_id));
    }

    /// Resolves a connection to its player id, if bound.
    pub fn resolve(&self, addr: SocketAddr) -> Option<String> {
        self.by_addr.get(&addr).map(|s| s.player_id.clone())
    }

    /// Refreshes the liveness timestamp for a connection. No-op when the
    /// connection is not bound.
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(session) = self.by_addr.get_mut(&addr) {
            session.last_seen = Instant::now();
        }
    }

    /// Removes both directions of a binding, returning the player id that
    /// was bound.
    pub fn unbind(&mut self, addr: SocketAddr) -> Option<String> {
        let session = self.by_addr.remove(&addr)?;
        // Only clear the reverse entry if it still points at this address;
        // a rebind may already have claimed the player id.
        if self.by_player.get(&session.player_id) == Some(&addr) {
            self.by_player.remove(&session.player_id);
        }
        info!("Session unbound: {} ({})", addr, session.player_id);
        Some(session.player_id)
    }

    /// Address to unicast to for a given player, if they have a live
    /// session.
    pub fn target_of(&self, player_id: &str) -> Option<SocketAddr> {
        self.by_player.get(player_id).copied()
    }

    /// Removes every session past the inactivity threshold, returning the
    /// (address, player id) pairs so callers can clean up game state.
    pub fn check_timeouts(&mut self) -> Vec<(SocketAddr, String)> {
        let timeout = self.timeout;
        let expired: Vec<SocketAddr> = self
            .by_addr
            .values()
            .filter(|s| s.is_timed_out(timeout))
            .map(|s| s.addr)
            .collect();

        let mut removed = Vec::new();
        for addr in expired {
            if let Some(player_id) = self.unbind(addr) {
                removed.push((addr, player_id));
            }
        }
        removed
    }

    /// All live connection addresses, for broadcasting.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.by_addr.keys().copied().collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    /// Returns true if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
