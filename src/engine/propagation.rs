//! Territorial influence propagation: a decaying wave spread outward from
//! each faction's controlled POIs across the location adjacency graph,
//! followed by a conversion pass over resident NPCs.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::clamp_influence;
use crate::store::EntityStore;

use super::signal::SignalKind;
use super::FactionEngine;

/// Influence carried by the wave as it leaves a seed location.
const WAVE_INITIAL_INFLUENCE: f64 = 10.0;
/// Below this, the wavefront is weak and mutates more often.
const WAVE_LOW_INFLUENCE: f64 = 6.0;
const MUTATION_CHANCE_LOW: f64 = 0.10;
const MUTATION_CHANCE_HIGH: f64 = 0.02;
/// Base chance an unaffiliated resident joins, plus a per-point danger bonus.
const CONVERSION_BASE_CHANCE: f64 = 0.15;
const CONVERSION_DANGER_WEIGHT: f64 = 0.05;

/// Something the propagation pass did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropagationEvent {
    /// A faction's recorded influence at a location rose.
    InfluenceRaised {
        faction_id: u64,
        poi_id: u64,
        from: f64,
        to: f64,
    },
    /// An unaffiliated NPC joined the faction.
    NpcAligned {
        faction_id: u64,
        poi_id: u64,
        npc_id: u64,
    },
}

/// Batch result. Failures are per-faction and never abort the rest of the
/// batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropagationReport {
    pub events: Vec<PropagationEvent>,
    pub factions_processed: u32,
    pub failures: Vec<(u64, String)>,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Run one propagation pass for every active faction.
    pub fn propagate_influence(&mut self) -> PropagationReport {
        let mut report = PropagationReport::default();
        for faction_id in self.store.faction_ids() {
            let Some(faction) = self.store.faction(faction_id) else {
                continue;
            };
            if !faction.is_active {
                continue;
            }
            match self.propagate_for_faction(faction_id) {
                Ok(mut events) => {
                    report.events.append(&mut events);
                    report.factions_processed += 1;
                }
                Err(err) => {
                    tracing::warn!(faction_id, %err, "influence propagation failed");
                    report.failures.push((faction_id, err.to_string()));
                }
            }
        }
        tracing::debug!(
            factions = report.factions_processed,
            events = report.events.len(),
            failures = report.failures.len(),
            "influence propagation pass complete"
        );
        report
    }

    fn propagate_for_faction(&mut self, faction_id: u64) -> Result<Vec<PropagationEvent>, EngineError> {
        let faction = self.faction(faction_id);
        let seeds: Vec<u64> = faction
            .poi_control
            .iter()
            .filter(|(_, control)| control.control_level > 0)
            .map(|(&poi_id, _)| poi_id)
            .collect();

        let mut events = Vec::new();
        let mut visited: BTreeSet<u64> = BTreeSet::new();
        let mut queue: VecDeque<(u64, f64)> = seeds
            .into_iter()
            .map(|poi_id| (poi_id, WAVE_INITIAL_INFLUENCE))
            .collect();

        // The wave's reach is bounded by the decay rate, not a hop limit.
        while let Some((poi_id, influence)) = queue.pop_front() {
            if influence <= 0.0 || visited.contains(&poi_id) {
                continue;
            }
            visited.insert(poi_id);

            if self.store.poi(poi_id).is_none() {
                return Err(EngineError::PoiNotFound(poi_id));
            }

            let faction = self.faction_mut(faction_id);
            let hold = faction.territory.entry(poi_id).or_default();
            if influence > hold.influence {
                let from = hold.influence;
                hold.influence = clamp_influence(influence);
                events.push(PropagationEvent::InfluenceRaised {
                    faction_id,
                    poi_id,
                    from,
                    to: hold.influence,
                });
            }

            let neighbors = self.store.poi(poi_id).unwrap().connected.clone();
            for neighbor in neighbors {
                if visited.contains(&neighbor) {
                    continue;
                }
                let mut step_decay = self.rng.random_range(1..=2) as f64;
                let mutation_chance = if influence < WAVE_LOW_INFLUENCE {
                    MUTATION_CHANCE_LOW
                } else {
                    MUTATION_CHANCE_HIGH
                };
                if self.rng.random_bool(mutation_chance) {
                    step_decay += self.rng.random_range(1..=3) as f64;
                }
                queue.push_back((neighbor, influence - step_decay));
            }
        }

        events.extend(self.convert_residents(faction_id)?);
        Ok(events)
    }

    /// Offer affiliation to unaffiliated NPCs everywhere the faction now has
    /// a presence. Existing affiliations are never touched.
    fn convert_residents(&mut self, faction_id: u64) -> Result<Vec<PropagationEvent>, EngineError> {
        let held: Vec<u64> = self
            .faction(faction_id)
            .territory
            .iter()
            .filter(|(_, hold)| hold.influence > 0.0)
            .map(|(&poi_id, _)| poi_id)
            .collect();

        let mut events = Vec::new();
        for poi_id in held {
            let Some(poi) = self.store.poi(poi_id) else {
                // Territory can reference locations that were later removed
                // from the graph; nothing lives there to convert.
                tracing::warn!(poi_id, "held territory references missing location");
                continue;
            };
            let danger = poi.danger_level;
            let residents = poi.residents.clone();
            let chance = (CONVERSION_BASE_CHANCE + CONVERSION_DANGER_WEIGHT * danger as f64).min(1.0);

            for npc_id in residents {
                let Some(npc) = self.store.npc(npc_id) else {
                    tracing::warn!(npc_id, poi_id, "resident NPC missing from store");
                    continue;
                };
                if !npc.is_unaffiliated() {
                    continue;
                }
                if self.rng.random_bool(chance) {
                    self.store
                        .npc_mut(npc_id)
                        .unwrap()
                        .affiliations
                        .push(faction_id);
                    events.push(PropagationEvent::NpcAligned {
                        faction_id,
                        poi_id,
                        npc_id,
                    });
                    self.publish(SignalKind::NpcAligned {
                        npc_id,
                        faction_id,
                        poi_id,
                    });
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    #[test]
    fn seeds_receive_initial_wave_influence() {
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ravens");
        let p = s.add_poi("Outpost", 0);
        s.give_outpost(f, p, 5);
        let mut engine = s.engine(42);

        let report = engine.propagate_influence();
        assert_eq!(report.factions_processed, 1);
        assert!(report.failures.is_empty());
        assert_eq!(
            engine.store().faction(f).unwrap().influence_at(p),
            WAVE_INITIAL_INFLUENCE
        );
    }

    #[test]
    fn wave_decays_along_the_graph() {
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ravens");
        // A chain: seed - p1 - p2 - ... - p9. With decay >= 1 per hop the
        // wave dies within at most 9 hops.
        let seed = s.add_poi("Seed", 0);
        s.give_outpost(f, seed, 5);
        let mut prev = seed;
        let mut chain = Vec::new();
        for i in 0..12 {
            let p = s.add_poi(format!("P{i}"), 0);
            s.connect(prev, p);
            chain.push(p);
            prev = p;
        }
        let mut engine = s.engine(42);
        engine.propagate_influence();

        let faction = engine.store().faction(f).unwrap();
        let mut last = faction.influence_at(seed);
        assert_eq!(last, WAVE_INITIAL_INFLUENCE);
        for &p in &chain {
            let inf = faction.influence_at(p);
            assert!(
                inf <= last,
                "influence never increases with distance: {inf} > {last}"
            );
            last = inf;
        }
        // The tail of the chain is out of reach.
        assert_eq!(faction.influence_at(*chain.last().unwrap()), 0.0);
    }

    #[test]
    fn propagation_never_lowers_existing_influence() {
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ravens");
        let seed = s.add_poi("Seed", 0);
        let near = s.add_poi("Near", 0);
        s.connect(seed, near);
        s.give_outpost(f, seed, 5);
        s.set_territory(f, near, 60.0);
        let mut engine = s.engine(42);

        engine.propagate_influence();
        let faction = engine.store().faction(f).unwrap();
        assert_eq!(faction.influence_at(near), 60.0, "wave never lowers a hold");
        assert_eq!(faction.influence_at(seed), WAVE_INITIAL_INFLUENCE);
    }

    #[test]
    fn inactive_factions_are_skipped() {
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ghosts");
        let p = s.add_poi("Ruin", 0);
        s.give_outpost(f, p, 5);
        s.deactivate_faction(f);
        let mut engine = s.engine(42);

        let report = engine.propagate_influence();
        assert_eq!(report.factions_processed, 0);
        assert_eq!(engine.store().faction(f).unwrap().influence_at(p), 0.0);
    }

    #[test]
    fn missing_seed_poi_is_isolated_per_faction() {
        let mut s = Scenario::at_year(100);
        let broken = s.add_faction("Broken");
        let fine = s.add_faction("Fine");
        let p = s.add_poi("Outpost", 0);
        s.give_outpost(fine, p, 5);
        // Control entry for a POI that does not exist in the graph.
        s.give_outpost(broken, 9999, 5);
        let mut engine = s.engine(42);

        let report = engine.propagate_influence();
        assert_eq!(report.factions_processed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, broken);
        // The healthy faction still propagated.
        assert_eq!(
            engine.store().faction(fine).unwrap().influence_at(p),
            WAVE_INITIAL_INFLUENCE
        );
    }

    #[test]
    fn conversion_only_targets_unaffiliated_npcs() {
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ravens");
        let rival = s.add_faction("Larks");
        // Maximum danger makes the conversion roll certain.
        let p = s.add_poi("Frontier", 17);
        s.give_outpost(f, p, 5);
        let free = s.add_npc_at("Free", p);
        let taken = s.add_npc_at("Taken", p);
        s.affiliate_npc(taken, rival);
        let mut engine = s.engine(42);

        let report = engine.propagate_influence();
        let store = engine.store();
        assert_eq!(store.npc(free).unwrap().affiliations, vec![f]);
        // Existing affiliation untouched: never removed, never switched.
        assert_eq!(store.npc(taken).unwrap().affiliations, vec![rival]);
        assert!(report.events.iter().any(|e| matches!(
            e,
            PropagationEvent::NpcAligned { npc_id, .. } if *npc_id == free
        )));
    }

    #[test]
    fn conversion_chance_saturates_at_certainty() {
        // danger 17 -> 0.15 + 0.85 = 1.0; danger 30 would exceed 1.0 and
        // must be capped, not panic.
        let mut s = Scenario::at_year(100);
        let f = s.add_faction("Ravens");
        let p = s.add_poi("Deathtrap", 30);
        s.give_outpost(f, p, 5);
        let npc = s.add_npc_at("Brave", p);
        let mut engine = s.engine(42);

        engine.propagate_influence();
        assert_eq!(engine.store().npc(npc).unwrap().affiliations, vec![f]);
    }
}
