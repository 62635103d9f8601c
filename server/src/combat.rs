//! Combat resolution.
//!
//! Validates hit actions against the authoritative registry and applies the
//! damage, death and respawn transitions. The server is the sole arbiter of
//! "close enough to hit" and of how much damage an attack deals; nothing the
//! client declares about damage is consulted. Failed validations drop the
//! action silently, which is the protocol: attackers get no error channel.

use log::{debug, info};
use shared::{clamp_health, distance, AttackKind, Player, MAX_HEALTH};

use crate::game::{random_spawn, GameState};

/// What a resolved hit did, carrying the post-transition records the
/// dispatcher needs for broadcasts and private result messages.
#[derive(Debug, Clone)]
pub enum HitOutcome {
    /// Shield/block: zero damage, acknowledged privately to the attacker.
    Blocked { target: Player },
    /// Target survived. Persist and broadcast the target, then notify both
    /// parties privately with their view of the same event.
    Damaged { target: Player, damage: i32 },
    /// Target died and has already respawned (full health, new in-bounds
    /// position). The attacker record carries the incremented kill count.
    Killed {
        attacker: Player,
        target: Player,
        damage: i32,
    },
}

/// Resolves a hit action. Returns `None` when any validation fails:
/// unknown attacker or target, or attacker out of range for the attack
/// kind. The caller has already established that the attacker has a live
/// session binding.
pub fn resolve_hit(
    game: &mut GameState,
    attacker_id: &str,
    target_id: &str,
    kind: AttackKind,
) -> Option<HitOutcome> {
    let (ax, ay) = match game.players.get(attacker_id) {
        Some(attacker) => (attacker.x, attacker.y),
        None => return None,
    };
    let (tx, ty) = match game.players.get(target_id) {
        Some(target) => (target.x, target.y),
        None => return None,
    };

    // Anti-cheat range gate: a client reporting a hit from beyond the
    // attack's reach is dropped, which bounds what a falsified attack can
    // do without also falsifying the attacker's own broadcast position.
    let dist = distance(ax, ay, tx, ty);
    if dist > kind.max_range() {
        debug!(
            "Dropped {:?} hit from {} on {}: distance {:.1} exceeds {:.1}",
            kind,
            attacker_id,
            target_id,
            dist,
            kind.max_range()
        );
        return None;
    }

    if kind == AttackKind::Shield {
        let target = game.players.get(target_id)?.clone();
        return Some(HitOutcome::Blocked { target });
    }

    // Damage comes from the server-side table, floored at zero.
    let damage = kind.base_damage().max(0);

    let target = game.players.get_mut(target_id)?;
    target.health = clamp_health(target.health - damage);

    if target.health > 0 {
        let target = target.clone();
        return Some(HitOutcome::Damaged { target, damage });
    }

    // Death and respawn are one transition: the target leaves through the
    // Dead state and comes back Alive at a fresh position before anything
    // is broadcast.
    let (rx, ry) = random_spawn();
    target.x = rx;
    target.y = ry;
    target.health = MAX_HEALTH;
    let target = target.clone();

    let attacker = game.players.get_mut(attacker_id)?;
    attacker.kills += 1;
    let attacker = attacker.clone();

    info!(
        "Player {} killed {} ({} respawned at ({:.0}, {:.0}))",
        attacker.id, target.id, target.id, target.x, target.y
    );

    Some(HitOutcome::Killed {
        attacker,
        target,
        damage,
    })
}
