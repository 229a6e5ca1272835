//! The entity store collaborator: every persisted record the engine touches
//! goes through this trait, keyed by ID or canonical pair. The engine owns
//! multi-record consistency; the store only promises atomic single-record
//! reads and writes.

use std::collections::BTreeMap;

use crate::id::IdGenerator;
use crate::model::{Faction, FactionMembership, FactionRelationship, Npc, PairKey, Poi};

/// CRUD access to faction-domain records.
///
/// Reads return `None` for missing records; the engine turns that into its
/// typed NotFound errors. Backend failures in persistent implementations
/// should surface as `EngineError::Store` at the engine boundary.
pub trait EntityStore {
    /// Allocate a globally unique ID (shared across all record types).
    fn next_id(&mut self) -> u64;

    fn faction(&self, id: u64) -> Option<&Faction>;
    fn faction_mut(&mut self, id: u64) -> Option<&mut Faction>;
    fn insert_faction(&mut self, faction: Faction);
    fn faction_ids(&self) -> Vec<u64>;

    fn relationship(&self, pair: PairKey) -> Option<&FactionRelationship>;
    fn relationship_mut(&mut self, pair: PairKey) -> Option<&mut FactionRelationship>;
    fn insert_relationship(&mut self, rel: FactionRelationship);
    fn relationship_pairs(&self) -> Vec<PairKey>;

    fn membership(&self, id: u64) -> Option<&FactionMembership>;
    fn membership_mut(&mut self, id: u64) -> Option<&mut FactionMembership>;
    fn insert_membership(&mut self, membership: FactionMembership);
    /// Membership IDs for a faction (active and inactive).
    fn memberships_of_faction(&self, faction_id: u64) -> Vec<u64>;
    /// Membership IDs for a character (active and inactive).
    fn memberships_of_character(&self, character_id: u64) -> Vec<u64>;

    fn poi(&self, id: u64) -> Option<&Poi>;
    fn insert_poi(&mut self, poi: Poi);
    fn poi_ids(&self) -> Vec<u64>;

    fn npc(&self, id: u64) -> Option<&Npc>;
    fn npc_mut(&mut self, id: u64) -> Option<&mut Npc>;
    fn insert_npc(&mut self, npc: Npc);
    fn npc_ids(&self) -> Vec<u64>;
}

/// In-memory store backing tests, tools, and single-process hosts.
///
/// `BTreeMap` keys keep iteration deterministic, which keeps seeded
/// simulations reproducible.
#[derive(Debug, Default)]
pub struct MemoryStore {
    factions: BTreeMap<u64, Faction>,
    relationships: BTreeMap<PairKey, FactionRelationship>,
    memberships: BTreeMap<u64, FactionMembership>,
    pois: BTreeMap<u64, Poi>,
    npcs: BTreeMap<u64, Npc>,
    id_gen: IdGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            factions: BTreeMap::new(),
            relationships: BTreeMap::new(),
            memberships: BTreeMap::new(),
            pois: BTreeMap::new(),
            npcs: BTreeMap::new(),
            id_gen: IdGenerator::new(),
        }
    }

    pub fn factions(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &FactionRelationship> {
        self.relationships.values()
    }

    pub fn memberships(&self) -> impl Iterator<Item = &FactionMembership> {
        self.memberships.values()
    }

    pub fn pois(&self) -> impl Iterator<Item = &Poi> {
        self.pois.values()
    }

    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }
}

impl EntityStore for MemoryStore {
    fn next_id(&mut self) -> u64 {
        self.id_gen.next_id()
    }

    fn faction(&self, id: u64) -> Option<&Faction> {
        self.factions.get(&id)
    }

    fn faction_mut(&mut self, id: u64) -> Option<&mut Faction> {
        self.factions.get_mut(&id)
    }

    fn insert_faction(&mut self, faction: Faction) {
        self.factions.insert(faction.id, faction);
    }

    fn faction_ids(&self) -> Vec<u64> {
        self.factions.keys().copied().collect()
    }

    fn relationship(&self, pair: PairKey) -> Option<&FactionRelationship> {
        self.relationships.get(&pair)
    }

    fn relationship_mut(&mut self, pair: PairKey) -> Option<&mut FactionRelationship> {
        self.relationships.get_mut(&pair)
    }

    fn insert_relationship(&mut self, rel: FactionRelationship) {
        self.relationships.insert(rel.pair, rel);
    }

    fn relationship_pairs(&self) -> Vec<PairKey> {
        self.relationships.keys().copied().collect()
    }

    fn membership(&self, id: u64) -> Option<&FactionMembership> {
        self.memberships.get(&id)
    }

    fn membership_mut(&mut self, id: u64) -> Option<&mut FactionMembership> {
        self.memberships.get_mut(&id)
    }

    fn insert_membership(&mut self, membership: FactionMembership) {
        self.memberships.insert(membership.id, membership);
    }

    fn memberships_of_faction(&self, faction_id: u64) -> Vec<u64> {
        self.memberships
            .values()
            .filter(|m| m.faction_id == faction_id)
            .map(|m| m.id)
            .collect()
    }

    fn memberships_of_character(&self, character_id: u64) -> Vec<u64> {
        self.memberships
            .values()
            .filter(|m| m.character_id == character_id)
            .map(|m| m.id)
            .collect()
    }

    fn poi(&self, id: u64) -> Option<&Poi> {
        self.pois.get(&id)
    }

    fn insert_poi(&mut self, poi: Poi) {
        self.pois.insert(poi.id, poi);
    }

    fn poi_ids(&self) -> Vec<u64> {
        self.pois.keys().copied().collect()
    }

    fn npc(&self, id: u64) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    fn npc_mut(&mut self, id: u64) -> Option<&mut Npc> {
        self.npcs.get_mut(&id)
    }

    fn insert_npc(&mut self, npc: Npc) {
        self.npcs.insert(npc.id, npc);
    }

    fn npc_ids(&self) -> Vec<u64> {
        self.npcs.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiplomaticStance, SimTimestamp};

    #[test]
    fn faction_insert_and_lookup() {
        let mut store = MemoryStore::new();
        let id = store.next_id();
        store.insert_faction(Faction::new(id, "Guild"));
        assert_eq!(store.faction(id).unwrap().name, "Guild");
        assert!(store.faction(999).is_none());
        assert_eq!(store.faction_ids(), vec![id]);
    }

    #[test]
    fn relationship_keyed_by_canonical_pair() {
        let mut store = MemoryStore::new();
        let rel = FactionRelationship::new(
            PairKey::new(5, 2),
            DiplomaticStance::Neutral,
            SimTimestamp::from_year(1),
        );
        store.insert_relationship(rel);
        // Either orientation resolves to the same record.
        assert!(store.relationship(PairKey::new(2, 5)).is_some());
        assert!(store.relationship(PairKey::new(5, 2)).is_some());
        assert_eq!(store.relationship_pairs().len(), 1);
    }

    #[test]
    fn membership_queries_by_faction_and_character() {
        let mut store = MemoryStore::new();
        let at = SimTimestamp::from_year(1);
        let m1 = store.next_id();
        store.insert_membership(FactionMembership::new(m1, 10, 100, at));
        let m2 = store.next_id();
        store.insert_membership(FactionMembership::new(m2, 10, 101, at));
        let m3 = store.next_id();
        store.insert_membership(FactionMembership::new(m3, 11, 100, at));

        assert_eq!(store.memberships_of_faction(10), vec![m1, m2]);
        assert_eq!(store.memberships_of_character(100), vec![m1, m3]);
    }

    #[test]
    fn ids_unique_across_record_types() {
        let mut store = MemoryStore::new();
        let a = store.next_id();
        let b = store.next_id();
        assert_ne!(a, b);
    }
}
