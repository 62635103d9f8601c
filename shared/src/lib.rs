use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const WORLD_WIDTH: f32 = 2000.0;
pub const WORLD_HEIGHT: f32 = 2000.0;
pub const MAX_HEALTH: i32 = 100;
pub const MELEE_RANGE: f32 = 60.0;
pub const PROJECTILE_RANGE: f32 = 300.0;
pub const MELEE_DAMAGE: i32 = 10;
pub const PROJECTILE_DAMAGE: i32 = 15;
pub const ANIMAL_MAX_HP: i32 = 30;

/// Current timestamp in UNIX milliseconds.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Euclidean distance between two world positions.
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Clamps a health value into the valid [0, MAX_HEALTH] range.
pub fn clamp_health(health: i32) -> i32 {
    health.clamp(0, MAX_HEALTH)
}

/// Privilege level of a player. Never taken from client input on a fresh
/// join; rehydrated joins keep whatever the store holds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Player,
    Mod,
    Admin,
}

/// Authoritative player record. The `id` is the join key between the live
/// registry, the durable store and the session index; it survives reconnects.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub kills: u32,
    pub fort: Option<String>,
    pub inventory: HashMap<String, u32>,
    pub last_seen: u64,
}

impl Player {
    pub fn new(id: String, name: String, x: f32, y: f32) -> Self {
        Self {
            id,
            name,
            role: Role::Player,
            x,
            y,
            health: MAX_HEALTH,
            kills: 0,
            fort: None,
            inventory: HashMap::new(),
            last_seen: get_timestamp(),
        }
    }

    /// Applies an allow-listed partial update. Fields outside the update
    /// struct cannot be set by construction, which is the point: the wire
    /// shape *is* the allow-list. Health is clamped into the valid range.
    pub fn apply_update(&mut self, update: &PlayerUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(health) = update.health {
            self.health = clamp_health(health);
        }
        if let Some(kills) = update.kills {
            self.kills = kills;
        }
        if let Some(ref fort) = update.fort {
            self.fort = Some(fort.clone());
        }
        if let Some(ref name) = update.name {
            if !name.is_empty() {
                self.name = name.clone();
            }
        }
        self.last_seen = get_timestamp();
    }
}

/// The restricted field set a client may change about its own record.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlayerUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub health: Option<i32>,
    pub kills: Option<u32>,
    pub fort: Option<String>,
    pub name: Option<String>,
}

/// Attack categories with server-side range and damage tables. Declared
/// damage from clients is never consulted; these tables are the authority.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Melee,
    Projectile,
    Shield,
}

impl AttackKind {
    /// Maximum distance at which this attack can connect. A client that
    /// reports a hit from further away is dropped by the range check.
    pub fn max_range(&self) -> f32 {
        match self {
            AttackKind::Melee | AttackKind::Shield => MELEE_RANGE,
            AttackKind::Projectile => PROJECTILE_RANGE,
        }
    }

    /// Damage applied when the attack lands. Shields block, dealing none.
    pub fn base_damage(&self) -> i32 {
        match self {
            AttackKind::Melee => MELEE_DAMAGE,
            AttackKind::Projectile => PROJECTILE_DAMAGE,
            AttackKind::Shield => 0,
        }
    }
}

/// A static harvestable map resource (tree, bush or stone depending on the
/// collection it lives in).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Resource {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

/// A hostile NPC with remaining hit points.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Animal {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub hp: i32,
}

/// A player-built object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Wheel {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

/// A stronghold players can affiliate with.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Fort {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

/// A dropped item waiting to be picked up.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Loot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub item: String,
}

/// Any non-player object tracked in shared map state. Used when a single
/// new entity is announced without resending the whole map.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum WorldEntity {
    Tree(Resource),
    Bush(Resource),
    Stone(Resource),
    Animal(Animal),
    Wheel(Wheel),
    Fort(Fort),
    Loot(Loot),
}

/// The shared map state: seven typed collections. Removal is always by id
/// filter so a second removal attempt for the same id is a no-op.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct WorldMap {
    pub trees: Vec<Resource>,
    pub bushes: Vec<Resource>,
    pub stones: Vec<Resource>,
    pub animals: Vec<Animal>,
    pub wheels: Vec<Wheel>,
    pub forts: Vec<Fort>,
    pub loot: Vec<Loot>,
}

impl WorldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: WorldEntity) {
        match entity {
            WorldEntity::Tree(r) => self.trees.push(r),
            WorldEntity::Bush(r) => self.bushes.push(r),
            WorldEntity::Stone(r) => self.stones.push(r),
            WorldEntity::Animal(a) => self.animals.push(a),
            WorldEntity::Wheel(w) => self.wheels.push(w),
            WorldEntity::Fort(f) => self.forts.push(f),
            WorldEntity::Loot(l) => self.loot.push(l),
        }
    }

    /// Removes an animal by id. Returns false when the id was absent.
    pub fn remove_animal(&mut self, id: &str) -> bool {
        let before = self.animals.len();
        self.animals.retain(|a| a.id != id);
        self.animals.len() != before
    }

    /// Removes a loot drop by id. Returns false when the id was absent.
    pub fn remove_loot(&mut self, id: &str) -> bool {
        let before = self.loot.len();
        self.loot.retain(|l| l.id != id);
        self.loot.len() != before
    }

    /// Removes a built object by id. Returns false when the id was absent.
    pub fn remove_wheel(&mut self, id: &str) -> bool {
        let before = self.wheels.len();
        self.wheels.retain(|w| w.id != id);
        self.wheels.len() != before
    }

    /// Point-in-time copy suitable for serialization to a newly joined
    /// client.
    pub fn snapshot(&self) -> WorldMap {
        self.clone()
    }

    /// Per-collection entity counts for the status summary.
    pub fn counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        counts.insert("trees".to_string(), self.trees.len());
        counts.insert("bushes".to_string(), self.bushes.len());
        counts.insert("stones".to_string(), self.stones.len());
        counts.insert("animals".to_string(), self.animals.len());
        counts.insert("wheels".to_string(), self.wheels.len());
        counts.insert("forts".to_string(), self.forts.len());
        counts.insert("loot".to_string(), self.loot.len());
        counts
    }
}

/// Wire protocol. Client-to-server actions first, then server-to-client
/// messages. In `State`, a `None` player entry is a tombstone: the player
/// left and clients must drop them, which is different from the id simply
/// not appearing in the delta.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Join {
        player_id: Option<String>,
        name: String,
        role: Option<Role>,
        x: Option<f32>,
        y: Option<f32>,
    },
    Update {
        update: PlayerUpdate,
    },
    Chat {
        text: String,
    },
    BuildWheel {
        id: String,
        x: f32,
        y: f32,
    },
    PickupLoot {
        id: String,
    },
    KillAnimal {
        id: String,
    },
    JoinFort {
        fort: String,
    },
    Hit {
        target: String,
        kind: AttackKind,
        declared_damage: Option<i32>,
    },
    Disconnect,

    Init {
        world: WorldMap,
        players: HashMap<String, Player>,
        own_id: String,
    },
    State {
        players: Option<HashMap<String, Option<Player>>>,
        world: Option<WorldMap>,
    },
    ChatLine {
        id: String,
        name: String,
        text: String,
    },
    KillFeed {
        killer: String,
        victim: String,
    },
    HitResult {
        target: String,
        damage: i32,
        health: i32,
    },
    HitTaken {
        attacker: String,
        damage: i32,
        health: i32,
    },
    MissionClaimed {
        mission_id: String,
        reward: HashMap<String, u32>,
    },
    EntitySpawned {
        entity: WorldEntity,
    },
    AmbientEvent {
        severity: u8,
        timestamp: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_player_creation() {
        let player = Player::new("p1".to_string(), "Ana".to_string(), 100.0, 200.0);
        assert_eq!(player.id, "p1");
        assert_eq!(player.name, "Ana");
        assert_eq!(player.role, Role::Player);
        assert_eq!(player.health, MAX_HEALTH);
        assert_eq!(player.kills, 0);
        assert!(player.fort.is_none());
        assert!(player.inventory.is_empty());
    }

    #[test]
    fn test_distance() {
        assert_approx_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0, 0.0001);
        assert_approx_eq!(distance(10.0, 10.0, 10.0, 10.0), 0.0, 0.0001);
        assert_approx_eq!(distance(100.0, 100.0, 140.0, 100.0), 40.0, 0.0001);
    }

    #[test]
    fn test_clamp_health() {
        assert_eq!(clamp_health(-50), 0);
        assert_eq!(clamp_health(0), 0);
        assert_eq!(clamp_health(42), 42);
        assert_eq!(clamp_health(MAX_HEALTH), MAX_HEALTH);
        assert_eq!(clamp_health(MAX_HEALTH + 500), MAX_HEALTH);
    }

    #[test]
    fn test_apply_update_allow_list() {
        let mut player = Player::new("p1".to_string(), "Ana".to_string(), 0.0, 0.0);

        let update = PlayerUpdate {
            x: Some(50.0),
            y: Some(75.0),
            health: Some(-20),
            kills: Some(3),
            fort: Some("north".to_string()),
            name: Some("Anita".to_string()),
        };
        player.apply_update(&update);

        assert_approx_eq!(player.x, 50.0, 0.0001);
        assert_approx_eq!(player.y, 75.0, 0.0001);
        assert_eq!(player.health, 0); // clamped non-negative
        assert_eq!(player.kills, 3);
        assert_eq!(player.fort.as_deref(), Some("north"));
        assert_eq!(player.name, "Anita");
    }

    #[test]
    fn test_apply_update_empty_is_noop() {
        let mut player = Player::new("p1".to_string(), "Ana".to_string(), 10.0, 20.0);
        player.apply_update(&PlayerUpdate::default());

        assert_approx_eq!(player.x, 10.0, 0.0001);
        assert_approx_eq!(player.y, 20.0, 0.0001);
        assert_eq!(player.health, MAX_HEALTH);
        assert_eq!(player.name, "Ana");
    }

    #[test]
    fn test_apply_update_ignores_empty_name() {
        let mut player = Player::new("p1".to_string(), "Ana".to_string(), 0.0, 0.0);
        player.apply_update(&PlayerUpdate {
            name: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(player.name, "Ana");
    }

    #[test]
    fn test_attack_kind_ranges() {
        assert_approx_eq!(AttackKind::Melee.max_range(), MELEE_RANGE, 0.0001);
        assert_approx_eq!(AttackKind::Shield.max_range(), MELEE_RANGE, 0.0001);
        assert_approx_eq!(AttackKind::Projectile.max_range(), PROJECTILE_RANGE, 0.0001);
        assert!(AttackKind::Projectile.max_range() > AttackKind::Melee.max_range());
    }

    #[test]
    fn test_attack_kind_damage_table() {
        assert_eq!(AttackKind::Melee.base_damage(), MELEE_DAMAGE);
        assert_eq!(AttackKind::Projectile.base_damage(), PROJECTILE_DAMAGE);
        assert_eq!(AttackKind::Shield.base_damage(), 0);

        for kind in [AttackKind::Melee, AttackKind::Projectile, AttackKind::Shield] {
            assert!(kind.base_damage() >= 0);
        }
    }

    #[test]
    fn test_world_map_add() {
        let mut world = WorldMap::new();

        world.add(WorldEntity::Tree(Resource {
            id: "t1".to_string(),
            x: 10.0,
            y: 10.0,
        }));
        world.add(WorldEntity::Animal(Animal {
            id: "a1".to_string(),
            x: 20.0,
            y: 20.0,
            hp: ANIMAL_MAX_HP,
        }));
        world.add(WorldEntity::Loot(Loot {
            id: "l1".to_string(),
            x: 30.0,
            y: 30.0,
            item: "helmet".to_string(),
        }));

        assert_eq!(world.trees.len(), 1);
        assert_eq!(world.animals.len(), 1);
        assert_eq!(world.loot.len(), 1);
        assert_eq!(world.counts()["trees"], 1);
        assert_eq!(world.counts()["bushes"], 0);
    }

    #[test]
    fn test_world_map_remove_is_idempotent() {
        let mut world = WorldMap::new();
        world.add(WorldEntity::Animal(Animal {
            id: "a1".to_string(),
            x: 0.0,
            y: 0.0,
            hp: ANIMAL_MAX_HP,
        }));

        assert!(world.remove_animal("a1"));
        assert!(!world.remove_animal("a1")); // second attempt is a no-op
        assert!(!world.remove_animal("never-existed"));
        assert!(world.animals.is_empty());
    }

    #[test]
    fn test_world_map_snapshot_is_detached() {
        let mut world = WorldMap::new();
        world.add(WorldEntity::Wheel(Wheel {
            id: "w1".to_string(),
            x: 5.0,
            y: 5.0,
        }));

        let snapshot = world.snapshot();
        world.remove_wheel("w1");

        assert!(world.wheels.is_empty());
        assert_eq!(snapshot.wheels.len(), 1);
    }

    #[test]
    fn test_packet_serialization_join() {
        let packet = Packet::Join {
            player_id: Some("p1".to_string()),
            name: "Ana".to_string(),
            role: Some(Role::Admin),
            x: None,
            y: None,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Join {
                player_id, name, role, ..
            } => {
                assert_eq!(player_id.as_deref(), Some("p1"));
                assert_eq!(name, "Ana");
                assert_eq!(role, Some(Role::Admin));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_state_tombstone() {
        let mut players: HashMap<String, Option<Player>> = HashMap::new();
        players.insert("gone".to_string(), None);
        players.insert(
            "alive".to_string(),
            Some(Player::new("alive".to_string(), "Bo".to_string(), 1.0, 2.0)),
        );

        let packet = Packet::State {
            players: Some(players),
            world: None,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::State { players, world } => {
                assert!(world.is_none());
                let players = players.unwrap();
                assert!(players["gone"].is_none()); // tombstone, not absence
                assert_eq!(players["alive"].as_ref().unwrap().name, "Bo");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_hit() {
        let packet = Packet::Hit {
            target: "p2".to_string(),
            kind: AttackKind::Projectile,
            declared_damage: Some(9999),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Hit { target, kind, declared_damage } => {
                assert_eq!(target, "p2");
                assert_eq!(kind, AttackKind::Projectile);
                assert_eq!(declared_damage, Some(9999));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
