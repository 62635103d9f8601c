//! Mission definitions and idempotent reward claims.
//!
//! Missions are long-lived configuration; claims are the at-most-once
//! bookkeeping. The board keeps both in memory (the event loop serializes
//! all access) and writes through to the store, so claim uniqueness survives
//! restarts. A timer-driven sweep purges claims older than their mission's
//! reset window, which is how "daily" missions recur — interval-driven, not
//! wall-clock-day-aligned.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GameError;
use crate::store::{Store, StoreError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: HashMap<String, u32>,
    pub active: bool,
    pub created_at: u64,
    pub reset_seconds: u64,
}

/// Proof that a player already received a mission's reward within the
/// current reset window.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claim {
    pub mission_id: String,
    pub player_id: String,
    pub claimed_at: u64,
}

pub struct MissionBoard {
    store: Arc<Store>,
    missions: HashMap<String, Mission>,
    claims: HashMap<(String, String), u64>,
}

impl MissionBoard {
    /// Loads mission definitions and outstanding claims from the store.
    pub fn load(store: Arc<Store>) -> Result<Self, StoreError> {
        let missions = store
            .list_missions()?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        let claims = store
            .list_claims()?
            .into_iter()
            .map(|c| ((c.mission_id, c.player_id), c.claimed_at))
            .collect();
        Ok(Self {
            store,
            missions,
            claims,
        })
    }

    /// Active missions, sorted by id for a stable listing.
    pub fn active(&self) -> Vec<Mission> {
        let mut missions: Vec<Mission> = self
            .missions
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        missions.sort_by(|a, b| a.id.cmp(&b.id));
        missions
    }

    /// Claims a mission's reward for a player at time `now` (UNIX millis).
    /// `NotFound` for a missing or inactive mission; `Conflict` while a
    /// prior claim is still inside the reset window. A claim whose window
    /// has already elapsed is treated as swept and replaced.
    pub fn claim(
        &mut self,
        mission_id: &str,
        player_id: &str,
        now: u64,
    ) -> Result<Mission, GameError> {
        let mission = self
            .missions
            .get(mission_id)
            .filter(|m| m.active)
            .ok_or_else(|| GameError::NotFound(format!("mission: {}", mission_id)))?
            .clone();

        let key = (mission_id.to_string(), player_id.to_string());
        if let Some(&claimed_at) = self.claims.get(&key) {
            if now.saturating_sub(claimed_at) <= mission.reset_seconds * 1000 {
                return Err(GameError::Conflict(format!(
                    "mission {} already claimed by {}",
                    mission_id, player_id
                )));
            }
        }

        self.store.put_claim(&Claim {
            mission_id: mission_id.to_string(),
            player_id: player_id.to_string(),
            claimed_at: now,
        })?;
        self.claims.insert(key, now);

        info!("Mission {} claimed by {}", mission_id, player_id);
        Ok(mission)
    }

    /// Purges claims whose age exceeds their mission's reset window,
    /// returning how many were swept. Store deletions are best-effort:
    /// a failed delete is logged and retried on the next sweep.
    pub fn sweep(&mut self, now: u64) -> usize {
        let expired: Vec<(String, String)> = self
            .claims
            .iter()
            .filter(|((mission_id, _), &claimed_at)| {
                match self.missions.get(mission_id) {
                    Some(mission) => {
                        now.saturating_sub(claimed_at) > mission.reset_seconds * 1000
                    }
                    // Claim for a mission that no longer exists: sweep it.
                    None => true,
                }
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut swept = 0;
        for (mission_id, player_id) in expired {
            if let Err(e) = self.store.delete_claim(&mission_id, &player_id) {
                error!(
                    "Failed to delete expired claim ({}, {}): {}",
                    mission_id, player_id, e
                );
                continue;
            }
            self.claims.remove(&(mission_id, player_id));
            swept += 1;
        }

        if swept > 0 {
            info!("Swept {} expired mission claims", swept);
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(missions: Vec<Mission>) -> (tempfile::TempDir, MissionBoard) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_without_seed(dir.path()).unwrap());
        for mission in &missions {
            store.put_mission(mission).unwrap();
        }
        let board = MissionBoard::load(store).unwrap();
        (dir, board)
    }

    fn daily(id: &str) -> Mission {
        Mission {
            id: id.to_string(),
            title: "Daily".to_string(),
            description: "Test mission".to_string(),
            reward: HashMap::from([("gold".to_string(), 10)]),
            active: true,
            created_at: 0,
            reset_seconds: 86_400,
        }
    }

    #[test]
    fn test_claim_is_at_most_once_within_window() {
        let (_dir, mut board) = board_with(vec![daily("m_daily_1")]);

        // Claim at t=0 succeeds.
        let mission = board.claim("m_daily_1", "p1", 0).unwrap();
        assert_eq!(mission.reward["gold"], 10);

        // Second claim 100 seconds later conflicts.
        let result = board.claim("m_daily_1", "p1", 100_000);
        assert!(matches!(result, Err(GameError::Conflict(_))));

        // 90000 seconds later the window (86400s) has elapsed.
        assert!(board.claim("m_daily_1", "p1", 90_000_000).is_ok());
    }

    #[test]
    fn test_claims_are_per_player() {
        let (_dir, mut board) = board_with(vec![daily("m_daily_1")]);

        board.claim("m_daily_1", "p1", 0).unwrap();
        assert!(board.claim("m_daily_1", "p2", 0).is_ok());
    }

    #[test]
    fn test_unknown_and_inactive_missions() {
        let mut inactive = daily("m_off");
        inactive.active = false;
        let (_dir, mut board) = board_with(vec![inactive]);

        assert!(matches!(
            board.claim("nope", "p1", 0),
            Err(GameError::NotFound(_))
        ));
        assert!(matches!(
            board.claim("m_off", "p1", 0),
            Err(GameError::NotFound(_))
        ));
        assert!(board.active().is_empty());
    }

    #[test]
    fn test_sweep_purges_only_expired_claims() {
        let (_dir, mut board) = board_with(vec![daily("m_daily_1"), daily("m_daily_2")]);

        board.claim("m_daily_1", "p1", 0).unwrap();
        board.claim("m_daily_2", "p1", 80_000_000).unwrap();

        // At t=90000s the first claim (age 90000s) is past the 86400s
        // window, the second (age 10000s) is not.
        let swept = board.sweep(90_000_000);
        assert_eq!(swept, 1);

        assert!(board.claim("m_daily_1", "p1", 90_000_000).is_ok());
        assert!(matches!(
            board.claim("m_daily_2", "p1", 90_000_000),
            Err(GameError::Conflict(_))
        ));
    }

    #[test]
    fn test_claims_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_without_seed(dir.path()).unwrap());
        store.put_mission(&daily("m_daily_1")).unwrap();

        {
            let mut board = MissionBoard::load(Arc::clone(&store)).unwrap();
            board.claim("m_daily_1", "p1", 1000).unwrap();
        }

        let mut reloaded = MissionBoard::load(store).unwrap();
        assert!(matches!(
            reloaded.claim("m_daily_1", "p1", 2000),
            Err(GameError::Conflict(_))
        ));
    }

    #[test]
    fn test_active_listing_sorted() {
        let (_dir, board) = board_with(vec![daily("m_b"), daily("m_a")]);
        let ids: Vec<String> = board.active().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m_a".to_string(), "m_b".to_string()]);
    }
}
