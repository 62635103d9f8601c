//! Write-behind persistence.
//!
//! Mutations are applied to memory and broadcast immediately; the durable
//! write happens here, on a dedicated task fed by an unbounded channel. The
//! task drains whatever has queued up and coalesces to the latest value per
//! record before touching the store, so a burst of movement updates costs
//! one write instead of hundreds. Failures are logged and never surfaced to
//! the hot path — players must never feel the database.

use log::{debug, error};
use shared::{Player, WorldMap};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::store::Store;

#[derive(Debug)]
enum PersistJob {
    Player(Player),
    World(WorldMap),
    Flush(oneshot::Sender<()>),
}

/// Handle to the persistence task. Cheap to clone; all clones feed the same
/// queue.
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl Persister {
    /// Spawns the write-behind task against the given store.
    pub fn spawn(store: Arc<Store>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, rx));
        Self { tx }
    }

    /// Queues a player record. Fire-and-forget: the caller never waits.
    pub fn queue_player(&self, player: Player) {
        if self.tx.send(PersistJob::Player(player)).is_err() {
            error!("Persistence task is gone; dropping player write");
        }
    }

    /// Queues the world snapshot. Fire-and-forget.
    pub fn queue_world(&self, world: WorldMap) {
        if self.tx.send(PersistJob::World(world)).is_err() {
            error!("Persistence task is gone; dropping world write");
        }
    }

    /// Waits until everything queued before this call has been written.
    /// Used for flush-on-disconnect and the shutdown sequence.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(PersistJob::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run(store: Arc<Store>, mut rx: mpsc::UnboundedReceiver<PersistJob>) {
    while let Some(first) = rx.recv().await {
        // Drain the backlog and keep only the newest value per key.
        let mut jobs = vec![first];
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }

        let mut players: HashMap<String, Player> = HashMap::new();
        let mut world: Option<WorldMap> = None;
        let mut acks = Vec::new();

        let batch_len = jobs.len();
        for job in jobs {
            match job {
                PersistJob::Player(p) => {
                    players.insert(p.id.clone(), p);
                }
                PersistJob::World(w) => world = Some(w),
                PersistJob::Flush(ack) => acks.push(ack),
            }
        }

        if batch_len > players.len() + usize::from(world.is_some()) + acks.len() {
            debug!(
                "Coalesced {} persistence jobs into {} writes",
                batch_len,
                players.len() + usize::from(world.is_some())
            );
        }

        for player in players.values() {
            if let Err(e) = store.put_player(player) {
                error!("Failed to persist player {}: {}", player.id, e);
            }
        }
        if let Some(world) = &world {
            if let Err(e) = store.save_world(world) {
                error!("Failed to persist world snapshot: {}", e);
            }
        }

        // Acknowledge flushes only after the batch they joined is written.
        for ack in acks {
            let _ = ack.send(());
        }
    }
}
