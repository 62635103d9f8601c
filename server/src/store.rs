//! Sled-backed durable store adapter.
//!
//! Pure CRUD over bincode-encoded records in a single primary tree, keyed by
//! prefix: `players:{id}`, `clans:{id}`, `clanmembers:{clan}:{player}`,
//! `missions:{id}`, `claims:{mission}:{player}`, and the fixed `world` key
//! holding the whole map snapshot as one blob. No business logic lives here;
//! callers decide what to write and when.

use std::collections::HashMap;
use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::IVec;
use thiserror::Error;

use shared::{Player, WorldMap};

use crate::clans::{Clan, ClanMember, ClanRole};
use crate::missions::{Claim, Mission};

const TREE_PRIMARY: &str = "warfort";
const WORLD_KEY: &[u8] = b"world";

/// Errors that can arise while interacting with the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when inserting a record whose key is already taken.
    #[error("record already exists: {0}")]
    Conflict(String),
}

/// Sled-backed persistence for player records, the world snapshot, clans and
/// mission bookkeeping.
pub struct Store {
    _db: sled::Db,
    primary: sled::Tree,
}

impl Store {
    /// Opens (or creates) the store rooted at `path`. Default missions are
    /// inserted if no missions exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_options(path, true)
    }

    /// Opens without seeding default missions (useful for targeted tests).
    pub fn open_without_seed<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed: bool) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let store = Self { _db: db, primary };

        if seed {
            store.seed_missions_if_needed()?;
        }

        Ok(store)
    }

    fn player_key(id: &str) -> Vec<u8> {
        format!("players:{}", id).into_bytes()
    }

    fn clan_key(id: &str) -> Vec<u8> {
        format!("clans:{}", id).into_bytes()
    }

    fn clan_member_key(clan_id: &str, player_id: &str) -> Vec<u8> {
        format!("clanmembers:{}:{}", clan_id, player_id).into_bytes()
    }

    fn mission_key(id: &str) -> Vec<u8> {
        format!("missions:{}", id).into_bytes()
    }

    fn claim_key(mission_id: &str, player_id: &str) -> Vec<u8> {
        format!("claims:{}:{}", mission_id, player_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a player record.
    pub fn put_player(&self, player: &Player) -> Result<(), StoreError> {
        let key = Self::player_key(&player.id);
        let bytes = Self::serialize(player)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a player record by id, if one was ever persisted.
    pub fn get_player(&self, id: &str) -> Result<Option<Player>, StoreError> {
        let key = Self::player_key(id);
        match self.primary.get(key)? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Write the world snapshot blob under its fixed key.
    pub fn save_world(&self, world: &WorldMap) -> Result<(), StoreError> {
        let bytes = Self::serialize(world)?;
        self.primary.insert(WORLD_KEY, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Load the world snapshot, if one exists.
    pub fn load_world(&self) -> Result<Option<WorldMap>, StoreError> {
        match self.primary.get(WORLD_KEY)? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Inserts a clan together with its owner membership in one transaction.
    /// Fails with `Conflict` when the clan id is already taken, leaving
    /// neither record behind.
    pub fn create_clan(&self, clan: &Clan) -> Result<(), StoreError> {
        let owner = ClanMember {
            clan_id: clan.id.clone(),
            player_id: clan.owner.clone(),
            role: ClanRole::Owner,
        };

        let clan_key = Self::clan_key(&clan.id);
        let member_key = Self::clan_member_key(&clan.id, &owner.player_id);
        let clan_bytes = Self::serialize(clan)?;
        let member_bytes = Self::serialize(&owner)?;

        let result: Result<(), TransactionError<()>> = self.primary.transaction(|tx| {
            if tx.get(clan_key.as_slice())?.is_some() {
                return Err(ConflictableTransactionError::Abort(()));
            }
            tx.insert(clan_key.as_slice(), clan_bytes.as_slice())?;
            tx.insert(member_key.as_slice(), member_bytes.as_slice())?;
            Ok(())
        });

        match result {
            Ok(()) => {
                self.primary.flush()?;
                Ok(())
            }
            Err(TransactionError::Abort(())) => {
                Err(StoreError::Conflict(format!("clan: {}", clan.id)))
            }
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }

    /// Fetch a clan by id.
    pub fn get_clan(&self, id: &str) -> Result<Option<Clan>, StoreError> {
        let key = Self::clan_key(id);
        match self.primary.get(key)? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert a (clan, player) membership.
    pub fn put_clan_member(&self, member: &ClanMember) -> Result<(), StoreError> {
        let key = Self::clan_member_key(&member.clan_id, &member.player_id);
        let bytes = Self::serialize(member)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a single membership, if present.
    pub fn get_clan_member(
        &self,
        clan_id: &str,
        player_id: &str,
    ) -> Result<Option<ClanMember>, StoreError> {
        let key = Self::clan_member_key(clan_id, player_id);
        match self.primary.get(key)? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// All memberships of a clan.
    pub fn clan_members(&self, clan_id: &str) -> Result<Vec<ClanMember>, StoreError> {
        let prefix = format!("clanmembers:{}:", clan_id).into_bytes();
        let mut members = Vec::new();
        for entry in self.primary.scan_prefix(prefix) {
            let (_, bytes) = entry?;
            members.push(Self::deserialize(bytes)?);
        }
        Ok(members)
    }

    /// Insert or update a mission definition.
    pub fn put_mission(&self, mission: &Mission) -> Result<(), StoreError> {
        let key = Self::mission_key(&mission.id);
        let bytes = Self::serialize(mission)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// All mission definitions.
    pub fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let mut missions = Vec::new();
        for entry in self.primary.scan_prefix(b"missions:") {
            let (_, bytes) = entry?;
            missions.push(Self::deserialize(bytes)?);
        }
        Ok(missions)
    }

    /// Record a mission claim.
    pub fn put_claim(&self, claim: &Claim) -> Result<(), StoreError> {
        let key = Self::claim_key(&claim.mission_id, &claim.player_id);
        let bytes = Self::serialize(claim)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Delete a claim once its reset window has elapsed. Absent keys are a
    /// no-op.
    pub fn delete_claim(&self, mission_id: &str, player_id: &str) -> Result<(), StoreError> {
        let key = Self::claim_key(mission_id, player_id);
        self.primary.remove(key)?;
        self.primary.flush()?;
        Ok(())
    }

    /// All live claims across all missions.
    pub fn list_claims(&self) -> Result<Vec<Claim>, StoreError> {
        let mut claims = Vec::new();
        for entry in self.primary.scan_prefix(b"claims:") {
            let (_, bytes) = entry?;
            claims.push(Self::deserialize(bytes)?);
        }
        Ok(claims)
    }

    fn seed_missions_if_needed(&self) -> Result<(), StoreError> {
        if self.primary.scan_prefix(b"missions:").next().is_some() {
            return Ok(());
        }

        let now = shared::get_timestamp();
        let defaults = [
            Mission {
                id: "m_daily_1".to_string(),
                title: "Daily harvest".to_string(),
                description: "Gather resources anywhere on the map".to_string(),
                reward: HashMap::from([("wood".to_string(), 50)]),
                active: true,
                created_at: now,
                reset_seconds: 86_400,
            },
            Mission {
                id: "m_daily_2".to_string(),
                title: "Trophy hunter".to_string(),
                description: "Bring down a wild animal".to_string(),
                reward: HashMap::from([("gold".to_string(), 25)]),
                active: true,
                created_at: now,
                reset_seconds: 86_400,
            },
            Mission {
                id: "m_weekly_1".to_string(),
                title: "Fort defender".to_string(),
                description: "Hold a stronghold with your clan".to_string(),
                reward: HashMap::from([("gold".to_string(), 100), ("stone".to_string(), 40)]),
                active: true,
                created_at: now,
                reset_seconds: 604_800,
            },
        ];

        for mission in &defaults {
            self.put_mission(mission)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Resource, WorldEntity};

    fn open_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_player_roundtrip() {
        let (_dir, store) = open_store();

        assert!(store.get_player("p1").unwrap().is_none());

        let mut player = Player::new("p1".to_string(), "Ana".to_string(), 10.0, 20.0);
        player.kills = 7;
        player.inventory.insert("wood".to_string(), 12);
        store.put_player(&player).unwrap();

        let loaded = store.get_player("p1").unwrap().unwrap();
        assert_eq!(loaded, player);
    }

    #[test]
    fn test_world_roundtrip() {
        let (_dir, store) = open_store();

        assert!(store.load_world().unwrap().is_none());

        let mut world = WorldMap::new();
        world.add(WorldEntity::Tree(Resource {
            id: "t1".to_string(),
            x: 1.0,
            y: 2.0,
        }));
        store.save_world(&world).unwrap();

        let loaded = store.load_world().unwrap().unwrap();
        assert_eq!(loaded, world);
    }

    #[test]
    fn test_create_clan_writes_owner_membership() {
        let (_dir, store) = open_store();

        let clan = Clan {
            id: "c1".to_string(),
            name: "North Wolves".to_string(),
            owner: "p1".to_string(),
            created_at: 1000,
        };
        store.create_clan(&clan).unwrap();

        assert_eq!(store.get_clan("c1").unwrap().unwrap().name, "North Wolves");
        let members = store.clan_members("c1").unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].player_id, "p1");
        assert_eq!(members[0].role, ClanRole::Owner);
    }

    #[test]
    fn test_create_clan_conflict_on_duplicate_id() {
        let (_dir, store) = open_store();

        let clan = Clan {
            id: "c1".to_string(),
            name: "North Wolves".to_string(),
            owner: "p1".to_string(),
            created_at: 1000,
        };
        store.create_clan(&clan).unwrap();

        let duplicate = Clan {
            id: "c1".to_string(),
            name: "Impostors".to_string(),
            owner: "p2".to_string(),
            created_at: 2000,
        };
        let result = store.create_clan(&duplicate);
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // The losing transaction left nothing behind.
        assert_eq!(store.get_clan("c1").unwrap().unwrap().owner, "p1");
        assert_eq!(store.clan_members("c1").unwrap().len(), 1);
    }

    #[test]
    fn test_claim_roundtrip_and_delete() {
        let (_dir, store) = open_store();

        let claim = Claim {
            mission_id: "m_daily_1".to_string(),
            player_id: "p1".to_string(),
            claimed_at: 5000,
        };
        store.put_claim(&claim).unwrap();
        assert_eq!(store.list_claims().unwrap().len(), 1);

        store.delete_claim("m_daily_1", "p1").unwrap();
        assert!(store.list_claims().unwrap().is_empty());

        // Deleting again is a no-op.
        store.delete_claim("m_daily_1", "p1").unwrap();
    }

    #[test]
    fn test_mission_seeding() {
        let (_dir, store) = open_store();
        let missions = store.list_missions().unwrap();
        assert!(missions.len() >= 3);
        assert!(missions.iter().any(|m| m.id == "m_daily_1"));
        assert!(missions.iter().all(|m| m.active));
    }

    #[test]
    fn test_open_without_seed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_without_seed(dir.path()).unwrap();
        assert!(store.list_missions().unwrap().is_empty());
    }
}
