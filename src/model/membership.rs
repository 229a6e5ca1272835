use serde::{Deserialize, Serialize};

use super::faction::clamp_reputation;
use super::timestamp::SimTimestamp;

/// Lifecycle status of a membership record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MembershipStatus {
    Active,
    Defected,
    Expelled,
    Retired,
}

string_enum!(MembershipStatus {
    Active => "active",
    Defected => "defected",
    Expelled => "expelled",
    Retired => "retired",
});

/// One entry in a membership's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    Joined {
        role: String,
        at: SimTimestamp,
    },
    LoyaltyChanged {
        old: f64,
        new: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: SimTimestamp,
    },
    Defection {
        to_faction_id: u64,
        at: SimTimestamp,
    },
    Deactivated {
        status: MembershipStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        at: SimTimestamp,
    },
}

/// A character's membership in a faction.
///
/// `reputation` is the character's standing *within* the faction (-100..100),
/// the loyalty score the schism engine ranks members by. It is distinct
/// from the faction's own reputation scales.
///
/// Nothing prevents a character from holding active memberships in several
/// factions at once; only (faction, character) uniqueness is enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactionMembership {
    pub id: u64,
    pub faction_id: u64,
    pub character_id: u64,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub reputation: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_status")]
    pub status: MembershipStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<MembershipEvent>,
}

fn default_role() -> String {
    "member".to_string()
}

fn default_true() -> bool {
    true
}

fn default_status() -> MembershipStatus {
    MembershipStatus::Active
}

impl FactionMembership {
    pub fn new(id: u64, faction_id: u64, character_id: u64, at: SimTimestamp) -> Self {
        Self {
            id,
            faction_id,
            character_id,
            role: default_role(),
            rank: 0,
            reputation: 0.0,
            is_active: true,
            status: MembershipStatus::Active,
            history: vec![MembershipEvent::Joined {
                role: default_role(),
                at,
            }],
        }
    }

    /// Set the in-faction reputation, clamped to -100..100.
    pub fn set_reputation(&mut self, value: f64) {
        self.reputation = clamp_reputation(value);
    }

    /// Deactivate this membership with the given status.
    pub fn deactivate(&mut self, status: MembershipStatus, reason: Option<String>, at: SimTimestamp) {
        self.is_active = false;
        self.status = status;
        self.history.push(MembershipEvent::Deactivated { status, reason, at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_membership_is_active_member() {
        let m = FactionMembership::new(1, 10, 20, SimTimestamp::from_year(5));
        assert!(m.is_active);
        assert_eq!(m.status, MembershipStatus::Active);
        assert_eq!(m.role, "member");
        assert_eq!(m.history.len(), 1);
    }

    #[test]
    fn set_reputation_clamps() {
        let mut m = FactionMembership::new(1, 10, 20, SimTimestamp::from_year(5));
        m.set_reputation(180.0);
        assert_eq!(m.reputation, 100.0);
        m.set_reputation(-150.0);
        assert_eq!(m.reputation, -100.0);
    }

    #[test]
    fn deactivate_records_history() {
        let mut m = FactionMembership::new(1, 10, 20, SimTimestamp::from_year(5));
        m.deactivate(
            MembershipStatus::Expelled,
            Some("treason".to_string()),
            SimTimestamp::from_year(6),
        );
        assert!(!m.is_active);
        assert_eq!(m.status, MembershipStatus::Expelled);
        assert!(matches!(
            m.history.last(),
            Some(MembershipEvent::Deactivated {
                status: MembershipStatus::Expelled,
                ..
            })
        ));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Defected).unwrap(),
            "\"defected\""
        );
    }
}
