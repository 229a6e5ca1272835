//! Fluent builder for constructing store state in tests and premade setups.
//!
//! Handles ID allocation and record wiring so adding new fields to the model
//! never breaks callers: use the chained setters for common fields and the
//! `with` escape hatch for everything else.

use crate::engine::FactionEngine;
use crate::model::{
    DiplomaticStance, Faction, FactionMembership, FactionRelationship, Npc, PairKey, Poi,
    SimTimestamp,
};
use crate::store::{EntityStore, MemoryStore};

/// Typed reference to a faction under construction, enabling chained field
/// mutation. Call [`id()`](FactionRef::id) to terminate the chain.
pub struct FactionRef<'a> {
    scenario: &'a mut Scenario,
    id: u64,
}

impl<'a> FactionRef<'a> {
    fn data_mut(&mut self) -> &mut Faction {
        self.scenario.store.faction_mut(self.id).unwrap()
    }

    pub fn influence(mut self, v: f64) -> Self {
        self.data_mut().influence = v;
        self
    }

    pub fn reputation(mut self, v: f64) -> Self {
        self.data_mut().reputation = v;
        self
    }

    pub fn wealth(mut self, v: f64) -> Self {
        self.data_mut().wealth = v;
        self
    }

    pub fn power(mut self, v: f64) -> Self {
        self.data_mut().power = v;
        self
    }

    pub fn gold(mut self, v: f64) -> Self {
        self.data_mut().resources.insert("gold".to_string(), v);
        self
    }

    pub fn internal_tension(mut self, v: f64) -> Self {
        self.data_mut().state.internal_tension = Some(v);
        self
    }

    /// Escape hatch: apply an arbitrary closure to the faction record.
    pub fn with(mut self, f: impl FnOnce(&mut Faction)) -> Self {
        f(self.data_mut());
        self
    }

    /// Terminate the chain and return the faction ID.
    pub fn id(self) -> u64 {
        self.id
    }
}

/// Deterministic world-state builder backed by a [`MemoryStore`].
pub struct Scenario {
    store: MemoryStore,
    start: SimTimestamp,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// A scenario starting at year 1.
    pub fn new() -> Self {
        Self::at_year(1)
    }

    /// A scenario starting at the given year.
    pub fn at_year(year: u32) -> Self {
        Self {
            store: MemoryStore::new(),
            start: SimTimestamp::from_year(year),
        }
    }

    // -- Factions --

    /// Add a faction with default values, returning its ID.
    pub fn add_faction(&mut self, name: impl Into<String>) -> u64 {
        let id = self.store.next_id();
        let mut faction = Faction::new(id, name);
        faction.founded = Some(self.start);
        self.store.insert_faction(faction);
        id
    }

    /// Add a faction and keep a chained reference for field tweaks.
    pub fn faction(&mut self, name: impl Into<String>) -> FactionRef<'_> {
        let id = self.add_faction(name);
        FactionRef { scenario: self, id }
    }

    /// Mutate an existing faction in place.
    pub fn faction_mut(&mut self, id: u64, f: impl FnOnce(&mut Faction)) {
        f(self.store.faction_mut(id).expect("faction exists"));
    }

    pub fn deactivate_faction(&mut self, id: u64) {
        self.faction_mut(id, |f| f.is_active = false);
    }

    // -- Relationships --

    /// Install a relationship with an explicit stance and tension, without
    /// going through the engine's transition logic.
    pub fn set_relationship(&mut self, a: u64, b: u64, stance: DiplomaticStance, tension: f64) {
        let mut rel = FactionRelationship::new(PairKey::new(a, b), stance, self.start);
        rel.tension = tension;
        self.store.insert_relationship(rel);
    }

    /// Put two factions directly at war (stance, tension, war flag, and
    /// active-war sets).
    pub fn make_at_war(&mut self, a: u64, b: u64) {
        let mut rel =
            FactionRelationship::new(PairKey::new(a, b), DiplomaticStance::AtWar, self.start);
        rel.war_state.declared_by = Some(a);
        self.store.insert_relationship(rel);
        self.faction_mut(a, |f| {
            f.state.active_wars.insert(b);
        });
        self.faction_mut(b, |f| {
            f.state.active_wars.insert(a);
        });
    }

    // -- Memberships --

    /// Add an active membership with the given loyalty (in-faction
    /// reputation). Returns the membership ID.
    pub fn add_member(&mut self, faction_id: u64, character_id: u64, loyalty: f64) -> u64 {
        let id = self.store.next_id();
        let mut membership = FactionMembership::new(id, faction_id, character_id, self.start);
        membership.set_reputation(loyalty);
        self.store.insert_membership(membership);
        id
    }

    pub fn deactivate_membership(&mut self, membership_id: u64) {
        let membership = self
            .store
            .membership_mut(membership_id)
            .expect("membership exists");
        membership.is_active = false;
        membership.status = crate::model::MembershipStatus::Retired;
    }

    // -- Locations --

    /// Add a POI with the given danger level.
    pub fn add_poi(&mut self, name: impl Into<String>, danger_level: u8) -> u64 {
        let id = self.store.next_id();
        let mut poi = Poi::new(id, name);
        poi.danger_level = danger_level;
        self.store.insert_poi(poi);
        id
    }

    /// Connect two POIs (undirected: both adjacency lists are updated).
    pub fn connect(&mut self, a: u64, b: u64) {
        let mut poi_a = self.store.poi(a).expect("poi exists").clone();
        poi_a.connected.push(b);
        self.store.insert_poi(poi_a);
        let mut poi_b = self.store.poi(b).expect("poi exists").clone();
        poi_b.connected.push(a);
        self.store.insert_poi(poi_b);
    }

    /// Give a faction a controlled outpost at a POI.
    pub fn give_outpost(&mut self, faction_id: u64, poi_id: u64, control_level: u8) {
        self.faction_mut(faction_id, |f| {
            f.poi_control
                .insert(poi_id, crate::model::PoiControl { control_level });
        });
    }

    /// Set a faction's recorded territory influence at a POI.
    pub fn set_territory(&mut self, faction_id: u64, poi_id: u64, influence: f64) {
        self.faction_mut(faction_id, |f| {
            f.territory.insert(
                poi_id,
                crate::model::TerritoryHold {
                    influence,
                    contested: false,
                },
            );
        });
    }

    // -- NPCs --

    /// Add an NPC living at the given POI. Returns the NPC ID.
    pub fn add_npc_at(&mut self, name: impl Into<String>, poi_id: u64) -> u64 {
        let id = self.store.next_id();
        self.store.insert_npc(Npc::new(id, name));
        let mut poi = self.store.poi(poi_id).expect("poi exists").clone();
        poi.residents.push(id);
        self.store.insert_poi(poi);
        id
    }

    /// Pre-affiliate an NPC with a faction.
    pub fn affiliate_npc(&mut self, npc_id: u64, faction_id: u64) {
        self.store
            .npc_mut(npc_id)
            .expect("npc exists")
            .affiliations
            .push(faction_id);
    }

    // -- Finishers --

    /// Extract the populated store.
    pub fn build(self) -> MemoryStore {
        self.store
    }

    /// Build an engine over the populated store, clock set to the scenario
    /// start and RNG seeded for reproducibility.
    pub fn engine(self, seed: u64) -> FactionEngine<MemoryStore> {
        let start = self.start;
        FactionEngine::new(self.store, seed).at_time(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_faction_builder() {
        let mut s = Scenario::at_year(50);
        let id = s
            .faction("Guild")
            .influence(70.0)
            .gold(250.0)
            .internal_tension(60.0)
            .id();
        let store = s.build();
        let faction = store.faction(id).unwrap();
        assert_eq!(faction.influence, 70.0);
        assert_eq!(faction.resource("gold"), 250.0);
        assert_eq!(faction.state.internal_tension, Some(60.0));
        assert_eq!(faction.founded, Some(SimTimestamp::from_year(50)));
    }

    #[test]
    fn make_at_war_wires_both_sides() {
        let mut s = Scenario::new();
        let a = s.add_faction("A");
        let b = s.add_faction("B");
        s.make_at_war(a, b);
        let store = s.build();
        let rel = store.relationship(PairKey::new(a, b)).unwrap();
        assert!(rel.is_at_war());
        assert_eq!(rel.tension, 100.0);
        assert!(store.faction(a).unwrap().state.active_wars.contains(&b));
        assert!(store.faction(b).unwrap().state.active_wars.contains(&a));
    }

    #[test]
    fn connect_is_undirected() {
        let mut s = Scenario::new();
        let a = s.add_poi("A", 0);
        let b = s.add_poi("B", 0);
        s.connect(a, b);
        let store = s.build();
        assert_eq!(store.poi(a).unwrap().connected, vec![b]);
        assert_eq!(store.poi(b).unwrap().connected, vec![a]);
    }

    #[test]
    fn npc_registered_as_resident() {
        let mut s = Scenario::new();
        let p = s.add_poi("Town", 1);
        let npc = s.add_npc_at("Mira", p);
        let store = s.build();
        assert_eq!(store.poi(p).unwrap().residents, vec![npc]);
        assert!(store.npc(npc).unwrap().is_unaffiliated());
    }
}
