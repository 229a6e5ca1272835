use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::relationship::WarOutcome;
use super::timestamp::SimTimestamp;

pub const INFLUENCE_MIN: f64 = 0.0;
pub const INFLUENCE_MAX: f64 = 100.0;
pub const REPUTATION_MIN: f64 = -100.0;
pub const REPUTATION_MAX: f64 = 100.0;
pub const CONTROL_LEVEL_MAX: u8 = 10;

/// Clamp a faction influence value to its documented 0–100 range.
pub fn clamp_influence(value: f64) -> f64 {
    value.clamp(INFLUENCE_MIN, INFLUENCE_MAX)
}

/// Clamp a reputation value (global, regional, or per-character) to -100..100.
pub fn clamp_reputation(value: f64) -> f64 {
    value.clamp(REPUTATION_MIN, REPUTATION_MAX)
}

/// A faction's hold on a single location: how much sway it has there and
/// whether another faction is pushing on the same ground.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TerritoryHold {
    pub influence: f64,
    #[serde(default)]
    pub contested: bool,
}

/// Direct control over a point of interest (0–10).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PoiControl {
    pub control_level: u8,
}

/// One entry in a faction's append-only schism log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchismRecord {
    pub at: SimTimestamp,
    pub new_faction_id: u64,
    pub members_lost: u32,
    pub cause: String,
}

/// One entry in a faction's append-only war history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarRecord {
    pub against: u64,
    pub outcome: WarOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victor: Option<u64>,
    pub at: SimTimestamp,
}

/// Named reputation range used to derive gameplay modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ReputationBracket {
    Revered,
    Respected,
    Friendly,
    Neutral,
    Unfriendly,
    Hostile,
    Reviled,
}

string_enum!(ReputationBracket {
    Revered => "revered",
    Respected => "respected",
    Friendly => "friendly",
    Neutral => "neutral",
    Unfriendly => "unfriendly",
    Hostile => "hostile",
    Reviled => "reviled",
});

impl ReputationBracket {
    /// Map a reputation value to its bracket.
    pub fn of(value: f64) -> Self {
        if value >= 90.0 {
            ReputationBracket::Revered
        } else if value >= 70.0 {
            ReputationBracket::Respected
        } else if value >= 30.0 {
            ReputationBracket::Friendly
        } else if value >= -30.0 {
            ReputationBracket::Neutral
        } else if value >= -70.0 {
            ReputationBracket::Unfriendly
        } else if value >= -90.0 {
            ReputationBracket::Hostile
        } else {
            ReputationBracket::Reviled
        }
    }
}

/// Which reputation scale a change applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReputationScope {
    Global,
    Region { region_id: u64 },
    Character { character_id: u64 },
}

/// One entry in a faction's append-only reputation log. Bracket transitions
/// get their own entries so narrative systems can react to them directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReputationEvent {
    Changed {
        scope: ReputationScope,
        old: f64,
        new: f64,
        delta: f64,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<serde_json::Value>,
        at: SimTimestamp,
    },
    BracketShift {
        scope: ReputationScope,
        from: ReputationBracket,
        to: ReputationBracket,
        at: SimTimestamp,
    },
}

/// Derived simulation state. The reference implementation kept this as a
/// free-form JSON bag; the fields the engine owns are promoted to typed
/// members and anything narrative-only goes through `extra`, validated at
/// the boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FactionState {
    /// `None` means internal tension has never been evaluated; the schism
    /// engine then derives it from membership loyalty spread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_tension: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub active_wars: BTreeSet<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schisms: Vec<SchismRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub war_history: Vec<WarRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regional_reputations: BTreeMap<u64, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub character_reputations: BTreeMap<u64, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reputation_log: Vec<ReputationEvent>,
    /// Forward-compatible narrative metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Faction {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Global influence, 0–100.
    pub influence: f64,
    /// Global reputation, -100..100.
    #[serde(default)]
    pub reputation: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub wealth: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded: Option<SimTimestamp>,
    /// Set when this faction was born from a schism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_faction: Option<u64>,
    /// Location ID → hold. Written by the influence propagation engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub territory: BTreeMap<u64, TerritoryHold>,
    /// Resource name → amount.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, f64>,
    /// POI ID → direct control. Nonzero control marks a propagation seed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub poi_control: BTreeMap<u64, PoiControl>,
    #[serde(default)]
    pub state: FactionState,
}

fn default_true() -> bool {
    true
}

impl Faction {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            influence: 50.0,
            reputation: 0.0,
            power: 0.0,
            wealth: 0.0,
            is_active: true,
            founded: None,
            parent_faction: None,
            territory: BTreeMap::new(),
            resources: BTreeMap::new(),
            poi_control: BTreeMap::new(),
            state: FactionState::default(),
        }
    }

    /// Current amount of a named resource (0.0 when absent).
    pub fn resource(&self, name: &str) -> f64 {
        self.resources.get(name).copied().unwrap_or(0.0)
    }

    /// Add to a named resource, creating the entry if needed.
    pub fn add_resource(&mut self, name: &str, amount: f64) {
        *self.resources.entry(name.to_string()).or_insert(0.0) += amount;
    }

    /// Set influence, clamped to 0–100.
    pub fn set_influence(&mut self, value: f64) {
        self.influence = clamp_influence(value);
    }

    /// The faction's recorded influence at a location (0.0 when absent).
    pub fn influence_at(&self, poi_id: u64) -> f64 {
        self.territory
            .get(&poi_id)
            .map(|h| h.influence)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_faction_defaults() {
        let f = Faction::new(7, "Iron Covenant");
        assert_eq!(f.id, 7);
        assert!(f.is_active);
        assert_eq!(f.influence, 50.0);
        assert_eq!(f.reputation, 0.0);
        assert!(f.territory.is_empty());
        assert!(f.state.active_wars.is_empty());
        assert_eq!(f.state.internal_tension, None);
    }

    #[test]
    fn set_influence_clamps() {
        let mut f = Faction::new(1, "A");
        f.set_influence(250.0);
        assert_eq!(f.influence, 100.0);
        f.set_influence(-10.0);
        assert_eq!(f.influence, 0.0);
    }

    #[test]
    fn resource_accessors() {
        let mut f = Faction::new(1, "A");
        assert_eq!(f.resource("gold"), 0.0);
        f.add_resource("gold", 120.0);
        f.add_resource("gold", -20.0);
        assert_eq!(f.resource("gold"), 100.0);
    }

    #[test]
    fn bracket_boundaries() {
        assert_eq!(ReputationBracket::of(100.0), ReputationBracket::Revered);
        assert_eq!(ReputationBracket::of(90.0), ReputationBracket::Revered);
        assert_eq!(ReputationBracket::of(89.9), ReputationBracket::Respected);
        assert_eq!(ReputationBracket::of(70.0), ReputationBracket::Respected);
        assert_eq!(ReputationBracket::of(30.0), ReputationBracket::Friendly);
        assert_eq!(ReputationBracket::of(0.0), ReputationBracket::Neutral);
        assert_eq!(ReputationBracket::of(-30.0), ReputationBracket::Neutral);
        assert_eq!(ReputationBracket::of(-30.1), ReputationBracket::Unfriendly);
        assert_eq!(ReputationBracket::of(-70.0), ReputationBracket::Unfriendly);
        assert_eq!(ReputationBracket::of(-90.0), ReputationBracket::Hostile);
        assert_eq!(ReputationBracket::of(-90.1), ReputationBracket::Reviled);
    }

    #[test]
    fn empty_maps_omitted_from_json() {
        let f = Faction::new(1, "A");
        let json = serde_json::to_value(&f).unwrap();
        assert!(json.get("territory").is_none());
        assert!(json.get("resources").is_none());
        assert!(json.get("poi_control").is_none());
    }

    #[test]
    fn state_round_trips() {
        let mut f = Faction::new(1, "A");
        f.state.internal_tension = Some(42.0);
        f.state.active_wars.insert(9);
        f.state.regional_reputations.insert(3, -12.5);
        let json = serde_json::to_string(&f).unwrap();
        let back: Faction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn bracket_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReputationBracket::Revered).unwrap(),
            "\"revered\""
        );
    }
}
