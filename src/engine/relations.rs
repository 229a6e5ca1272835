//! The relationship state machine: diplomatic stances, tension updates,
//! war declaration, and peace.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::model::{
    DiplomaticStance, FactionRelationship, PairKey, RelationshipEvent, clamp_tension,
};
use crate::store::EntityStore;

use super::signal::SignalKind;
use super::FactionEngine;

/// Tension at or above this promotes a non-war stance to Hostile.
const HOSTILITY_THRESHOLD: f64 = 80.0;

const DEFAULT_WAR_REASON: &str = "unspecified";

impl<S: EntityStore> FactionEngine<S> {
    /// The relationship between two factions, if one exists. Either
    /// orientation of the pair resolves to the same record.
    pub fn relationship_between(&self, a: u64, b: u64) -> Option<&FactionRelationship> {
        if a == b {
            return None;
        }
        self.store().relationship(PairKey::new(a, b))
    }

    /// Set the diplomatic stance between two factions, snapping tension to
    /// the stance's canonical anchor. Creates the relationship if absent.
    pub fn set_diplomatic_stance(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        stance: DiplomaticStance,
        metadata: Option<BTreeMap<String, serde_json::Value>>,
    ) -> Result<FactionRelationship, EngineError> {
        let pair = self.checked_pair(faction_id, other_faction_id)?;
        let now = self.now;

        if self.store().relationship(pair).is_none() {
            self.store_mut()
                .insert_relationship(FactionRelationship::new(pair, stance, now));
        } else {
            let rel = self.store_mut().relationship_mut(pair).unwrap();
            let old = rel.stance;
            rel.stance = stance;
            rel.tension = stance.canonical_tension();
            rel.war_state.at_war = stance == DiplomaticStance::AtWar;
            rel.history.push(RelationshipEvent::StanceChanged {
                old,
                new: stance,
                reason: None,
                at: now,
            });
        }

        if let Some(meta) = metadata {
            let rel = self.store_mut().relationship_mut(pair).unwrap();
            rel.metadata.extend(meta);
        }

        Ok(self.store().relationship(pair).unwrap().clone())
    }

    /// Add `delta` to the pair's tension, clamped to [-100, 100].
    ///
    /// Crossing the hostility threshold from below promotes the stance to
    /// Hostile (war still requires an explicit declaration); crossing from
    /// non-negative to negative demotes it to Friendly. Neither nudge ever
    /// overrides an explicit Allied or AtWar stance.
    pub fn update_tension(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        delta: f64,
        metadata: Option<BTreeMap<String, serde_json::Value>>,
    ) -> Result<FactionRelationship, EngineError> {
        let pair = self.checked_pair(faction_id, other_faction_id)?;
        let now = self.now;
        self.ensure_relationship(pair);

        let rel = self.store_mut().relationship_mut(pair).unwrap();
        let old = rel.tension;
        let new = clamp_tension(old + delta);
        rel.tension = new;
        rel.history.push(RelationshipEvent::TensionChanged {
            old,
            new,
            delta,
            at: now,
        });
        if let Some(meta) = metadata {
            rel.metadata.extend(meta);
        }

        let stance = rel.stance;
        if old < HOSTILITY_THRESHOLD
            && new >= HOSTILITY_THRESHOLD
            && stance != DiplomaticStance::AtWar
        {
            rel.stance = DiplomaticStance::Hostile;
            rel.history.push(RelationshipEvent::StanceChanged {
                old: stance,
                new: DiplomaticStance::Hostile,
                reason: Some("tension_threshold".to_string()),
                at: now,
            });
        } else if old >= 0.0
            && new < 0.0
            && stance != DiplomaticStance::Allied
            && stance != DiplomaticStance::AtWar
        {
            rel.stance = DiplomaticStance::Friendly;
            rel.history.push(RelationshipEvent::StanceChanged {
                old: stance,
                new: DiplomaticStance::Friendly,
                reason: Some("tension_threshold".to_string()),
                at: now,
            });
        }

        Ok(self.store().relationship(pair).unwrap().clone())
    }

    /// Declare war: stance AtWar, tension 100, declarer and reason recorded,
    /// each faction registered in the other's active-war set.
    pub fn declare_war(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        reason: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Result<FactionRelationship, EngineError> {
        let pair = self.checked_pair(faction_id, other_faction_id)?;
        let now = self.now;
        self.ensure_relationship(pair);

        let reason = reason.unwrap_or_else(|| DEFAULT_WAR_REASON.to_string());
        let rel = self.store_mut().relationship_mut(pair).unwrap();
        rel.stance = DiplomaticStance::AtWar;
        rel.tension = DiplomaticStance::AtWar.canonical_tension();
        rel.war_state.at_war = true;
        rel.war_state.declared_by = Some(faction_id);
        rel.war_state.reason = Some(reason.clone());
        rel.war_state.declared_at = Some(now);
        rel.history.push(RelationshipEvent::WarDeclared {
            declared_by: faction_id,
            reason: reason.clone(),
            at: now,
        });
        if let Some(details) = details {
            rel.metadata.insert("war_details".to_string(), details);
        }

        self.faction_mut(faction_id)
            .state
            .active_wars
            .insert(other_faction_id);
        self.faction_mut(other_faction_id)
            .state
            .active_wars
            .insert(faction_id);

        self.publish(SignalKind::WarDeclared {
            declared_by: faction_id,
            target: other_faction_id,
            reason,
        });

        Ok(self.store().relationship(pair).unwrap().clone())
    }

    /// End a war. Fails with `InvalidState` unless the pair is currently at
    /// war. The new stance's canonical tension replaces the war tension and
    /// both factions drop each other from their active-war sets.
    pub fn make_peace(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        terms: Option<serde_json::Value>,
        new_stance: DiplomaticStance,
    ) -> Result<FactionRelationship, EngineError> {
        if new_stance == DiplomaticStance::AtWar {
            return Err(EngineError::Validation(
                "peace cannot restore a war stance".to_string(),
            ));
        }
        let pair = self.checked_pair(faction_id, other_faction_id)?;
        let now = self.now;

        let Some(rel) = self.store_mut().relationship_mut(pair) else {
            return Err(EngineError::RelationshipNotFound(
                faction_id,
                other_faction_id,
            ));
        };
        if rel.stance != DiplomaticStance::AtWar {
            return Err(EngineError::InvalidState(
                "cannot make peace when not at war".to_string(),
            ));
        }

        rel.war_state.at_war = false;
        rel.war_state.peace_terms.push(crate::model::PeaceRecord {
            ended_at: now,
            terms,
        });
        rel.stance = new_stance;
        rel.tension = new_stance.canonical_tension();
        rel.history.push(RelationshipEvent::PeaceEstablished {
            stance: new_stance,
            at: now,
        });

        self.faction_mut(faction_id)
            .state
            .active_wars
            .remove(&other_faction_id);
        self.faction_mut(other_faction_id)
            .state
            .active_wars
            .remove(&faction_id);

        self.publish(SignalKind::PeaceMade {
            faction_id,
            other_faction_id,
            new_stance,
        });

        Ok(self.store().relationship(pair).unwrap().clone())
    }

    /// Validate both faction IDs and build the canonical pair key.
    pub(super) fn checked_pair(&self, a: u64, b: u64) -> Result<PairKey, EngineError> {
        if a == b {
            return Err(EngineError::Validation(format!(
                "faction {a} cannot hold a relationship with itself"
            )));
        }
        self.require_faction(a)?;
        self.require_faction(b)?;
        Ok(PairKey::new(a, b))
    }

    /// Create a neutral relationship for the pair if none exists yet.
    fn ensure_relationship(&mut self, pair: PairKey) {
        if self.store().relationship(pair).is_none() {
            let now = self.now;
            self.store_mut().insert_relationship(FactionRelationship::new(
                pair,
                DiplomaticStance::Neutral,
                now,
            ));
        }
    }
}
