//! Shared helpers for unit and integration tests: scripted RNGs, invariant
//! assertions, and store query shorthands.

use rand::RngCore;

use crate::model::{DiplomaticStance, FactionMembership};
use crate::store::{EntityStore, MemoryStore};

// ---------------------------------------------------------------------------
// Scripted random sources
// ---------------------------------------------------------------------------

/// An RNG that returns the same word forever. Not random at all, which is
/// the point: it pins every probabilistic branch to a known side.
pub struct ConstRng(pub u64);

impl RngCore for ConstRng {
    fn next_u32(&mut self) -> u32 {
        self.0 as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.0.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// An RNG whose every Bernoulli draw succeeds and whose every range draw
/// lands on the low end. Pins down "all branches taken" paths.
pub fn rng_all_successes() -> Box<dyn RngCore> {
    Box::new(ConstRng(0))
}

/// An RNG whose every Bernoulli draw below certainty fails and whose range
/// draws land on the high end. Pins down "no branches taken" paths.
pub fn rng_no_successes() -> Box<dyn RngCore> {
    Box::new(ConstRng(u64::MAX))
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// Assert a float is approximately equal, with a named context message.
pub fn assert_approx(actual: f64, expected: f64, tolerance: f64, msg: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{msg}: expected ~{expected} (+-{tolerance}), got {actual}"
    );
}

/// Assert every documented bounds invariant over the whole store: tensions
/// in [-100, 100], influence in [0, 100], reputations in [-100, 100], and
/// the AtWar stance exactly mirroring the war flag.
pub fn assert_invariants(store: &MemoryStore) {
    for faction in store.factions() {
        assert!(
            (0.0..=100.0).contains(&faction.influence),
            "faction {} influence out of bounds: {}",
            faction.id,
            faction.influence
        );
        assert!(
            (-100.0..=100.0).contains(&faction.reputation),
            "faction {} reputation out of bounds: {}",
            faction.id,
            faction.reputation
        );
        for (&region, &value) in &faction.state.regional_reputations {
            assert!(
                (-100.0..=100.0).contains(&value),
                "faction {} regional reputation {region} out of bounds: {value}",
                faction.id
            );
        }
        for (&character, &value) in &faction.state.character_reputations {
            assert!(
                (-100.0..=100.0).contains(&value),
                "faction {} character reputation {character} out of bounds: {value}",
                faction.id
            );
        }
        for (&poi, hold) in &faction.territory {
            assert!(
                (0.0..=100.0).contains(&hold.influence),
                "faction {} territory influence at {poi} out of bounds: {}",
                faction.id,
                hold.influence
            );
        }
    }
    for rel in store.relationships() {
        assert!(
            (-100.0..=100.0).contains(&rel.tension),
            "pair {:?} tension out of bounds: {}",
            rel.pair,
            rel.tension
        );
        assert_eq!(
            rel.stance == DiplomaticStance::AtWar,
            rel.is_at_war(),
            "pair {:?}: AtWar stance must mirror the war flag",
            rel.pair
        );
    }
    for membership in store.memberships() {
        assert!(
            (-100.0..=100.0).contains(&membership.reputation),
            "membership {} reputation out of bounds: {}",
            membership.id,
            membership.reputation
        );
    }
}

// ---------------------------------------------------------------------------
// Query shorthands
// ---------------------------------------------------------------------------

/// Active memberships of a faction, cloned out of the store.
pub fn active_members(store: &MemoryStore, faction_id: u64) -> Vec<FactionMembership> {
    store
        .memberships_of_faction(faction_id)
        .into_iter()
        .filter_map(|id| store.membership(id))
        .filter(|m| m.is_active)
        .cloned()
        .collect()
}

/// A faction's gold on hand.
pub fn gold(store: &MemoryStore, faction_id: u64) -> f64 {
    store
        .faction(faction_id)
        .map(|f| f.resource("gold"))
        .unwrap_or(0.0)
}
