use serde::{Deserialize, Serialize};

/// A point of interest: one node in the location adjacency graph the
/// influence propagation engine walks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poi {
    pub id: u64,
    pub name: String,
    /// 0 = safe backwater, higher = more dangerous frontier. Feeds the NPC
    /// conversion probability.
    #[serde(default)]
    pub danger_level: u8,
    /// Adjacent POI IDs (undirected edges listed on both endpoints).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected: Vec<u64>,
    /// NPC IDs living here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub residents: Vec<u64>,
}

impl Poi {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            danger_level: 0,
            connected: Vec::new(),
            residents: Vec::new(),
        }
    }
}

/// A non-player character that can be drawn into a faction by influence
/// propagation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Npc {
    pub id: u64,
    pub name: String,
    /// Faction IDs this NPC is affiliated with. Propagation only ever
    /// appends; it never removes or replaces an existing affiliation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<u64>,
}

impl Npc {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            affiliations: Vec::new(),
        }
    }

    pub fn is_unaffiliated(&self) -> bool {
        self.affiliations.is_empty()
    }
}
