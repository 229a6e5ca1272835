use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::timestamp::SimTimestamp;

pub const TENSION_MIN: f64 = -100.0;
pub const TENSION_MAX: f64 = 100.0;

/// Clamp a tension value to its documented -100..100 range.
pub fn clamp_tension(value: f64) -> f64 {
    value.clamp(TENSION_MIN, TENSION_MAX)
}

/// Categorical diplomatic relationship between two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DiplomaticStance {
    Allied,
    Friendly,
    Neutral,
    Unfriendly,
    Hostile,
    AtWar,
}

string_enum!(DiplomaticStance {
    Allied => "allied",
    Friendly => "friendly",
    Neutral => "neutral",
    Unfriendly => "unfriendly",
    Hostile => "hostile",
    AtWar => "at_war",
});

impl DiplomaticStance {
    /// The tension anchor this stance snaps the relationship to when set
    /// explicitly.
    pub fn canonical_tension(self) -> f64 {
        match self {
            DiplomaticStance::Allied => -80.0,
            DiplomaticStance::Friendly => -40.0,
            DiplomaticStance::Neutral => 0.0,
            DiplomaticStance::Unfriendly => 40.0,
            DiplomaticStance::Hostile => 80.0,
            DiplomaticStance::AtWar => 100.0,
        }
    }
}

/// How a war between two factions concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WarOutcome {
    Victory,
    Defeat,
    Negotiated,
    Stalemate,
}

string_enum!(WarOutcome {
    Victory => "victory",
    Defeat => "defeat",
    Negotiated => "negotiated",
    Stalemate => "stalemate",
});

impl WarOutcome {
    /// Victory and defeat need a named victor; negotiated and stalemate do not.
    pub fn requires_victor(self) -> bool {
        matches!(self, WarOutcome::Victory | WarOutcome::Defeat)
    }
}

/// Canonical key for the unordered faction pair: `a < b` always.
///
/// Storing one record per unordered pair makes the reciprocal-symmetry
/// invariant structural: there is no second record to drift out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub a: u64,
    pub b: u64,
}

impl PairKey {
    /// Normalize two faction IDs into a canonical key.
    ///
    /// # Panics
    /// Panics if both IDs are equal; callers validate self-relationships
    /// before constructing a key.
    pub fn new(x: u64, y: u64) -> Self {
        assert!(x != y, "PairKey: faction cannot relate to itself ({x})");
        if x < y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn involves(self, id: u64) -> bool {
        self.a == id || self.b == id
    }

    /// The opposite member of the pair, if `id` is a member.
    pub fn other(self, id: u64) -> Option<u64> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A mechanical consequence applied while resolving a war.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Consequence {
    ResourceTransfer {
        resource: String,
        amount: f64,
        from_faction_id: u64,
        to_faction_id: u64,
    },
    TerritoryTransfer {
        territory_id: u64,
        from_faction_id: u64,
        to_faction_id: u64,
    },
    PopulationShift {
        percentage: f64,
        from_faction_id: u64,
        to_faction_id: u64,
    },
    InfluenceChange {
        faction_id: u64,
        delta: f64,
    },
    WarAttrition {
        faction_id: u64,
        resource: String,
        amount: f64,
    },
    Other {
        data: serde_json::Value,
    },
}

/// A concluded peace, appended when a war ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeaceRecord {
    pub ended_at: SimTimestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<serde_json::Value>,
}

/// A resolved war outcome, appended to the relationship's war history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    pub outcome: WarOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victor: Option<u64>,
    pub resolved_at: SimTimestamp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consequences: Vec<Consequence>,
}

/// War bookkeeping for a relationship. `at_war` mirrors the AtWar stance;
/// the two must agree at all times.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WarState {
    #[serde(default)]
    pub at_war: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<SimTimestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peace_terms: Vec<PeaceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<OutcomeRecord>,
}

/// One entry in a relationship's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationshipEvent {
    Established {
        stance: DiplomaticStance,
        at: SimTimestamp,
    },
    StanceChanged {
        old: DiplomaticStance,
        new: DiplomaticStance,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: SimTimestamp,
    },
    TensionChanged {
        old: f64,
        new: f64,
        delta: f64,
        at: SimTimestamp,
    },
    TensionDecay {
        before: f64,
        after: f64,
        at: SimTimestamp,
    },
    WarDeclared {
        declared_by: u64,
        reason: String,
        at: SimTimestamp,
    },
    PeaceEstablished {
        stance: DiplomaticStance,
        at: SimTimestamp,
    },
}

/// The diplomatic state of one unordered faction pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactionRelationship {
    pub pair: PairKey,
    pub stance: DiplomaticStance,
    /// Signed tension in [-100, 100]: negative leans alliance, positive
    /// leans conflict.
    pub tension: f64,
    #[serde(default)]
    pub war_state: WarState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<RelationshipEvent>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl FactionRelationship {
    /// A fresh relationship at the given stance, tension snapped to the
    /// stance's canonical anchor.
    pub fn new(pair: PairKey, stance: DiplomaticStance, at: SimTimestamp) -> Self {
        Self {
            pair,
            stance,
            tension: stance.canonical_tension(),
            war_state: WarState {
                at_war: stance == DiplomaticStance::AtWar,
                ..WarState::default()
            },
            history: vec![RelationshipEvent::Established { stance, at }],
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_at_war(&self) -> bool {
        self.war_state.at_war
    }
}
