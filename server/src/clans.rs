//! Clan relationships layered on the player registry.
//!
//! Creation is a single logical transaction: the clan row and the owner
//! membership land together or not at all, so a fetched clan always has at
//! least its owner. These are request/response operations (driven by the
//! admin surface), so unlike the real-time handlers they return structured
//! errors.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GameError;
use crate::store::{Store, StoreError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Clan {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub created_at: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ClanRole {
    Owner,
    Member,
}

/// A (clan, player) pair, unique per pair.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClanMember {
    pub clan_id: String,
    pub player_id: String,
    pub role: ClanRole,
}

pub struct ClanService {
    store: Arc<Store>,
}

impl ClanService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates a clan and its owner membership atomically. `Invalid` when
    /// any field is empty, `Conflict` when the id is already taken.
    pub fn create(&self, id: &str, name: &str, owner: &str) -> Result<Clan, GameError> {
        if id.is_empty() || name.is_empty() || owner.is_empty() {
            return Err(GameError::Invalid(
                "clan id, name and owner are all required".to_string(),
            ));
        }

        let clan = Clan {
            id: id.to_string(),
            name: name.to_string(),
            owner: owner.to_string(),
            created_at: shared::get_timestamp(),
        };

        match self.store.create_clan(&clan) {
            Ok(()) => Ok(clan),
            Err(StoreError::Conflict(msg)) => Err(GameError::Conflict(msg)),
            Err(e) => Err(e.into()),
        }
    }

    /// Adds a player to an existing clan. `NotFound` for a missing clan,
    /// `Conflict` when the player is already a member.
    pub fn join(&self, clan_id: &str, player_id: &str) -> Result<ClanMember, GameError> {
        if self.store.get_clan(clan_id)?.is_none() {
            return Err(GameError::NotFound(format!("clan: {}", clan_id)));
        }
        if self.store.get_clan_member(clan_id, player_id)?.is_some() {
            return Err(GameError::Conflict(format!(
                "player {} already in clan {}",
                player_id, clan_id
            )));
        }

        let member = ClanMember {
            clan_id: clan_id.to_string(),
            player_id: player_id.to_string(),
            role: ClanRole::Member,
        };
        self.store.put_clan_member(&member)?;
        Ok(member)
    }

    /// The clan and all its memberships.
    pub fn fetch(&self, id: &str) -> Result<(Clan, Vec<ClanMember>), GameError> {
        let clan = self
            .store
            .get_clan(id)?
            .ok_or_else(|| GameError::NotFound(format!("clan: {}", id)))?;
        let members = self.store.clan_members(id)?;
        Ok((clan, members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (tempfile::TempDir, ClanService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_without_seed(dir.path()).unwrap());
        (dir, ClanService::new(store))
    }

    #[test]
    fn test_create_then_fetch_has_exactly_owner() {
        let (_dir, clans) = service();

        let clan = clans.create("c1", "North Wolves", "p1").unwrap();
        assert_eq!(clan.id, "c1");

        let (fetched, members) = clans.fetch("c1").unwrap();
        assert_eq!(fetched.owner, "p1");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, ClanRole::Owner);
        assert_eq!(members[0].player_id, "p1");
    }

    #[test]
    fn test_create_duplicate_id_conflicts() {
        let (_dir, clans) = service();
        clans.create("c1", "North Wolves", "p1").unwrap();

        let result = clans.create("c1", "Other", "p2");
        assert!(matches!(result, Err(GameError::Conflict(_))));
    }

    #[test]
    fn test_create_rejects_empty_fields() {
        let (_dir, clans) = service();
        assert!(matches!(
            clans.create("", "Name", "p1"),
            Err(GameError::Invalid(_))
        ));
        assert!(matches!(
            clans.create("c1", "", "p1"),
            Err(GameError::Invalid(_))
        ));
        assert!(matches!(
            clans.create("c1", "Name", ""),
            Err(GameError::Invalid(_))
        ));
    }

    #[test]
    fn test_join_and_double_join() {
        let (_dir, clans) = service();
        clans.create("c1", "North Wolves", "p1").unwrap();

        let member = clans.join("c1", "p2").unwrap();
        assert_eq!(member.role, ClanRole::Member);

        assert!(matches!(
            clans.join("c1", "p2"),
            Err(GameError::Conflict(_))
        ));

        let (_, members) = clans.fetch("c1").unwrap();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_join_missing_clan() {
        let (_dir, clans) = service();
        assert!(matches!(
            clans.join("nope", "p1"),
            Err(GameError::NotFound(_))
        ));
    }

    #[test]
    fn test_owner_joining_own_clan_conflicts() {
        let (_dir, clans) = service();
        clans.create("c1", "North Wolves", "p1").unwrap();
        assert!(matches!(
            clans.join("c1", "p1"),
            Err(GameError::Conflict(_))
        ));
    }
}
