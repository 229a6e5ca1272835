//! Internal-tension schisms: when a faction's cohesion fails, its least
//! loyal members break away into a new faction.

use serde::{Deserialize, Serialize};

use rand::Rng;

use crate::error::EngineError;
use crate::model::{
    DiplomaticStance, Faction, FactionMembership, MembershipEvent, MembershipStatus, SchismRecord,
};
use crate::store::EntityStore;

use super::signal::SignalKind;
use super::FactionEngine;

pub const DEFAULT_SCHISM_THRESHOLD: f64 = 80.0;

/// Factions smaller than this cannot produce a meaningful schism.
const MIN_MEMBERS_FOR_SCHISM: usize = 5;
/// Loyalty spread → tension scaling when tension must be derived.
const LOYALTY_SPREAD_SCALE: f64 = 5.0;
const TENSION_CAP: f64 = 100.0;

// Tiered defection draws, lowest loyalty first.
const FIRST_TIER_FRACTION: f64 = 0.2;
const SECOND_TIER_FRACTION: f64 = 0.3;
const FIRST_TIER_BASE: f64 = 0.6;
const FIRST_TIER_SLOPE: f64 = 0.4;
const SECOND_TIER_BASE: f64 = 0.3;
const SECOND_TIER_SLOPE: f64 = 0.4;
const REMAINDER_BASE: f64 = 0.1;
const REMAINDER_SLOPE: f64 = 0.2;

// Critical mass: a schism needs at least this many defectors AND at least
// this fraction of the membership.
const MIN_DEFECTORS: usize = 3;
const MIN_DEFECTOR_FRACTION: f64 = 0.1;

const BREAKAWAY_INFLUENCE_FACTOR: f64 = 0.4;
const INFLUENCE_FLOOR: f64 = 10.0;
const DEFECTOR_LOYALTY_BOOST: f64 = 30.0;
const FOUNDING_ROLE: &str = "founding_member";

const HOSTILE_SPLIT_TENSION: f64 = 75.0;
const SOFT_SPLIT_TENSION: f64 = 50.0;
const TENSION_RELIEF: f64 = 50.0;
const PARENT_INFLUENCE_LOSS_WEIGHT: f64 = 0.5;

/// The flavor of ideological rift driving a schism.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DivideKind {
    Religious,
    Peaceful,
    Political,
    Economic,
    Custom(String),
}

string_enum_open!(DivideKind, "divide kind", {
    Religious => "religious",
    Peaceful => "peaceful",
    Political => "political",
    Economic => "economic",
});

impl DivideKind {
    /// Religious and peaceful rifts part on softer terms than the rest.
    fn is_soft(&self) -> bool {
        matches!(self, DivideKind::Religious | DivideKind::Peaceful)
    }
}

/// An ideological division pushing a faction toward schism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeologicalDivide {
    pub cause: String,
    pub strength: f64,
    pub kind: DivideKind,
}

/// A narrative event nudging internal tension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub description: String,
    pub tension_modifier: f64,
}

/// Inputs to a schism check. `..Default::default()` gives the plain
/// threshold-80 check driven by stored or derived tension.
#[derive(Debug, Clone, Default)]
pub struct SchismInputs<'a> {
    /// Explicit tension override; skips both the stored value and the
    /// loyalty-spread derivation.
    pub internal_tension: Option<f64>,
    pub divide: Option<&'a IdeologicalDivide>,
    pub trigger: Option<&'a TriggerEvent>,
    pub threshold: Option<f64>,
}

/// What a schism did. Absent entirely when no schism occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchismReport {
    pub parent_faction_id: u64,
    pub new_faction_id: u64,
    pub new_faction_name: String,
    pub members_transferred: u32,
    /// Character IDs that defected.
    pub defectors: Vec<u64>,
    pub internal_tension_before: f64,
    pub internal_tension_after: f64,
    pub initial_stance: DiplomaticStance,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Check whether a faction fractures, and if so perform the schism:
    /// create the breakaway faction, migrate defectors, establish the
    /// parent/breakaway relationship, and relieve the parent's tension.
    ///
    /// Returns `Ok(None)` when conditions for a schism are not met.
    pub fn check_schism(
        &mut self,
        faction_id: u64,
        inputs: SchismInputs<'_>,
    ) -> Result<Option<SchismReport>, EngineError> {
        let threshold = inputs.threshold.unwrap_or(DEFAULT_SCHISM_THRESHOLD);
        if threshold <= 0.0 || threshold >= TENSION_CAP {
            return Err(EngineError::Validation(format!(
                "schism threshold must be within (0, 100), got {threshold}"
            )));
        }
        self.require_faction(faction_id)?;

        let Some(tension) = self.resolve_internal_tension(faction_id, &inputs) else {
            return Ok(None);
        };
        if tension < threshold {
            return Ok(None);
        }

        // Hotter tension above the threshold pulls more members out.
        let split_probability = (tension - threshold) / (TENSION_CAP - threshold);

        // Active members ranked by ascending loyalty; ties break on
        // membership id so seeded runs stay reproducible.
        let mut members: Vec<(u64, u64, f64)> = self
            .store
            .memberships_of_faction(faction_id)
            .into_iter()
            .filter_map(|mid| self.store.membership(mid))
            .filter(|m| m.is_active)
            .map(|m| (m.id, m.character_id, m.reputation))
            .collect();
        members.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let total = members.len();
        let first_tier = (total as f64 * FIRST_TIER_FRACTION) as usize;
        let second_tier = (total as f64 * SECOND_TIER_FRACTION) as usize;

        let mut defecting: Vec<(u64, u64, f64)> = Vec::new();
        for (i, member) in members.iter().enumerate() {
            let chance = if i < first_tier {
                FIRST_TIER_BASE + FIRST_TIER_SLOPE * split_probability
            } else if i < first_tier + second_tier {
                SECOND_TIER_BASE + SECOND_TIER_SLOPE * split_probability
            } else {
                REMAINDER_BASE + REMAINDER_SLOPE * split_probability
            };
            if self.rng.random_bool(chance.clamp(0.0, 1.0)) {
                defecting.push(*member);
            }
        }

        let defector_count = defecting.len();
        if defector_count < MIN_DEFECTORS
            || (defector_count as f64) < total as f64 * MIN_DEFECTOR_FRACTION
        {
            // Not enough critical mass to found a breakaway faction.
            return Ok(None);
        }

        let divide_cause = inputs.divide.map(|d| d.cause.clone());
        let parent = self.faction(faction_id);
        let parent_name = parent.name.clone();
        let parent_influence = parent.influence;
        let parent_resources = parent.resources.clone();

        let new_name = self.pick_breakaway_name(&parent_name, divide_cause.as_deref());
        let description = match (&inputs.divide, &inputs.trigger) {
            (Some(divide), _) => format!(
                "A breakaway faction that split from {parent_name} due to ideological differences regarding {}.",
                divide.cause
            ),
            (None, Some(trigger)) => format!(
                "A breakaway faction that split from {parent_name} due to tensions arising from {}.",
                trigger.description
            ),
            (None, None) => format!(
                "A breakaway faction that split from {parent_name} due to internal tensions and disagreements."
            ),
        };

        let now = self.now;
        let new_id = self.store.next_id();
        let mut breakaway = Faction::new(new_id, new_name.clone());
        breakaway.description = description;
        breakaway.influence = (parent_influence * BREAKAWAY_INFLUENCE_FACTOR).max(INFLUENCE_FLOOR);
        breakaway.resources = parent_resources;
        breakaway.parent_faction = Some(faction_id);
        breakaway.founded = Some(now);
        self.store.insert_faction(breakaway);

        // Migrate defectors: deactivate the old membership, found the new one
        // with a loyalty boost.
        let mut defector_characters = Vec::with_capacity(defector_count);
        for &(membership_id, character_id, loyalty) in &defecting {
            let membership = self.store.membership_mut(membership_id).unwrap();
            membership.is_active = false;
            membership.status = MembershipStatus::Defected;
            membership.history.push(MembershipEvent::Defection {
                to_faction_id: new_id,
                at: now,
            });

            let new_membership_id = self.store.next_id();
            let mut migrated =
                FactionMembership::new(new_membership_id, new_id, character_id, now);
            migrated.role = FOUNDING_ROLE.to_string();
            migrated.history = vec![MembershipEvent::Joined {
                role: FOUNDING_ROLE.to_string(),
                at: now,
            }];
            migrated.set_reputation(loyalty + DEFECTOR_LOYALTY_BOOST);
            self.store.insert_membership(migrated);
            defector_characters.push(character_id);
        }

        // Parent and breakaway part as enemies, or merely estranged for
        // religious and peaceful rifts.
        let soft = inputs.divide.is_some_and(|d| d.kind.is_soft());
        let (initial_stance, initial_tension) = if soft {
            (DiplomaticStance::Unfriendly, SOFT_SPLIT_TENSION)
        } else {
            (DiplomaticStance::Hostile, HOSTILE_SPLIT_TENSION)
        };
        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("schism".to_string(), serde_json::json!(true));
        self.set_diplomatic_stance(faction_id, new_id, initial_stance, Some(metadata))?;
        self.update_tension(
            faction_id,
            new_id,
            initial_tension - initial_stance.canonical_tension(),
            None,
        )?;

        let cause = divide_cause.unwrap_or_else(|| "internal_tension".to_string());
        let tension_after = (tension - TENSION_RELIEF).max(0.0);
        let defector_fraction = defector_count as f64 / total as f64;
        let parent = self.faction_mut(faction_id);
        parent.state.schisms.push(SchismRecord {
            at: now,
            new_faction_id: new_id,
            members_lost: defector_count as u32,
            cause,
        });
        parent.state.internal_tension = Some(tension_after);
        parent.influence = (parent.influence
            * (1.0 - defector_fraction * PARENT_INFLUENCE_LOSS_WEIGHT))
            .max(INFLUENCE_FLOOR);

        self.publish(SignalKind::FactionSplit {
            parent_faction_id: faction_id,
            new_faction_id: new_id,
            members_transferred: defector_count as u32,
        });
        tracing::debug!(
            parent = faction_id,
            breakaway = new_id,
            defectors = defector_count,
            "faction schism"
        );

        Ok(Some(SchismReport {
            parent_faction_id: faction_id,
            new_faction_id: new_id,
            new_faction_name: new_name,
            members_transferred: defector_count as u32,
            defectors: defector_characters,
            internal_tension_before: tension,
            internal_tension_after: tension_after,
            initial_stance,
        }))
    }

    /// Resolve the internal tension driving the check: explicit argument,
    /// else the stored value, else derived from the loyalty spread of active
    /// members (with divide/trigger modifiers applied only to the derived
    /// value, which is then stored back).
    fn resolve_internal_tension(
        &mut self,
        faction_id: u64,
        inputs: &SchismInputs<'_>,
    ) -> Option<f64> {
        if let Some(tension) = inputs.internal_tension {
            return Some(tension);
        }
        if let Some(tension) = self.faction(faction_id).state.internal_tension {
            return Some(tension);
        }

        let loyalties: Vec<f64> = self
            .store
            .memberships_of_faction(faction_id)
            .into_iter()
            .filter_map(|mid| self.store.membership(mid))
            .filter(|m| m.is_active)
            .map(|m| m.reputation)
            .collect();
        if loyalties.len() < MIN_MEMBERS_FOR_SCHISM {
            return None;
        }

        let max = loyalties.iter().cloned().fold(f64::MIN, f64::max);
        let min = loyalties.iter().cloned().fold(f64::MAX, f64::min);
        let mut tension = ((max - min) * LOYALTY_SPREAD_SCALE).min(TENSION_CAP);
        if let Some(divide) = inputs.divide {
            tension += divide.strength;
        }
        if let Some(trigger) = inputs.trigger {
            tension += trigger.tension_modifier;
        }
        let tension = tension.min(TENSION_CAP);
        self.faction_mut(faction_id).state.internal_tension = Some(tension);
        Some(tension)
    }

    fn pick_breakaway_name(&mut self, parent_name: &str, cause: Option<&str>) -> String {
        let mut options = vec![
            format!("Reformed {parent_name}"),
            format!("True {parent_name}"),
            format!("Separatist {parent_name}"),
            format!("{parent_name} Purists"),
            format!("New {parent_name}"),
            format!("Breakaway {parent_name}"),
            format!("Dissident {parent_name}"),
        ];
        if let Some(cause) = cause {
            options.push(format!("{cause} {parent_name}"));
            options.push(format!("{parent_name} of {cause}"));
            options.push(format!("{cause} Faction"));
        }
        let index = self.rng.random_range(0..options.len());
        options.swap_remove(index)
    }
}
