//! Authoritative world and player state.
//!
//! `GameState` is the single source of truth for the map collections and the
//! live player registry. It is owned exclusively by the server's event loop;
//! every mutation arrives serialized through that loop, so none of these
//! methods need interior locking.

use log::info;
use rand::Rng;
use shared::{
    get_timestamp, Animal, Loot, Player, PlayerUpdate, WorldEntity, WorldMap, ANIMAL_MAX_HP,
    WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::HashMap;

/// Mints a fresh player identifier. Ids are server-assigned, stable across
/// reconnects, and the join key between memory, store and session index.
pub fn mint_player_id() -> String {
    let mut rng = rand::thread_rng();
    format!("p{:016x}", rng.gen::<u64>())
}

fn mint_entity_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}{:012x}", prefix, rng.gen::<u64>() & 0xffff_ffff_ffff)
}

/// A random position inside the playable bounds.
pub fn random_spawn() -> (f32, f32) {
    let mut rng = rand::thread_rng();
    (
        rng.gen_range(0.0..WORLD_WIDTH),
        rng.gen_range(0.0..WORLD_HEIGHT),
    )
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub world: WorldMap,
    pub players: HashMap<String, Player>,
}

impl GameState {
    pub fn new(world: WorldMap) -> Self {
        Self {
            world,
            players: HashMap::new(),
        }
    }

    /// Fresh-join branch: mints an id, spawns at a random in-bounds
    /// position with full health, zero kills and an empty inventory. The
    /// role is always the least-privileged value; whatever the client
    /// asserted never reaches this function.
    pub fn join_fresh(&mut self, name: &str) -> Player {
        let id = mint_player_id();
        let (x, y) = random_spawn();
        let player = Player::new(id.clone(), name.to_string(), x, y);

        info!("Player {} ({}) joined fresh at ({:.0}, {:.0})", id, name, x, y);
        self.players.insert(id, player.clone());
        player
    }

    /// Known-id branch: registers the stored record, overlaying only the
    /// freshly supplied display name. Position, health, kills, inventory
    /// and role all come from storage.
    pub fn join_rehydrated(&mut self, mut stored: Player, name: &str) -> Player {
        if !name.is_empty() {
            stored.name = name.to_string();
        }
        stored.last_seen = get_timestamp();

        info!("Player {} ({}) rejoined", stored.id, stored.name);
        self.players.insert(stored.id.clone(), stored.clone());
        stored
    }

    /// Applies an allow-listed partial update, returning the resulting
    /// record for persistence and broadcast. `None` when the player is not
    /// in the live registry.
    pub fn apply_update(&mut self, player_id: &str, update: &PlayerUpdate) -> Option<Player> {
        let player = self.players.get_mut(player_id)?;
        player.apply_update(update);
        Some(player.clone())
    }

    /// Removes a player from the live registry, returning their final state
    /// for the flush-on-disconnect write. The durable record survives.
    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let player = self.players.remove(player_id);
        if player.is_some() {
            info!("Removed player {}", player_id);
        }
        player
    }

    /// Timer-driven spawn: adds one new hostile or loot entity to the map
    /// and returns it so the dispatcher can announce just that entity.
    pub fn spawn_ambient_entity(&mut self) -> WorldEntity {
        let mut rng = rand::thread_rng();
        let (x, y) = random_spawn();

        let entity = if rng.gen_bool(0.5) {
            WorldEntity::Animal(Animal {
                id: mint_entity_id("a"),
                x,
                y,
                hp: ANIMAL_MAX_HP,
            })
        } else {
            let items = ["helmet", "planks", "berries", "arrows"];
            WorldEntity::Loot(Loot {
                id: mint_entity_id("l"),
                x,
                y,
                item: items[rng.gen_range(0..items.len())].to_string(),
            })
        };

        self.world.add(entity.clone());
        entity
    }
}
