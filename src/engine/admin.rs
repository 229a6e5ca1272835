//! Faction and membership administration: the narrative/admin surface that
//! creates factions, manages members, and assigns POI control.

use crate::error::EngineError;
use crate::model::{
    CONTROL_LEVEL_MAX, Faction, FactionMembership, MembershipEvent, MembershipStatus, PoiControl,
    clamp_reputation,
};
use crate::store::EntityStore;

use super::FactionEngine;

impl<S: EntityStore> FactionEngine<S> {
    /// Create a faction with default scalars, returning its ID.
    pub fn create_faction(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> u64 {
        let id = self.store.next_id();
        let mut faction = Faction::new(id, name);
        faction.description = description.into();
        faction.founded = Some(self.now);
        self.store.insert_faction(faction);
        id
    }

    /// Add a character to a faction, or refresh their existing active
    /// membership (a character holds at most one active membership per
    /// faction; memberships in other factions are untouched).
    ///
    /// Returns the membership ID.
    pub fn add_member(
        &mut self,
        faction_id: u64,
        character_id: u64,
        role: &str,
        loyalty: f64,
    ) -> Result<u64, EngineError> {
        self.require_faction(faction_id)?;
        let now = self.now;

        if let Some(existing) = self.active_membership_id(faction_id, character_id) {
            let membership = self.store.membership_mut(existing).unwrap();
            membership.role = role.to_string();
            let old = membership.reputation;
            membership.set_reputation(loyalty);
            let new = membership.reputation;
            if new != old {
                membership.history.push(MembershipEvent::LoyaltyChanged {
                    old,
                    new,
                    reason: Some("membership refreshed".to_string()),
                    at: now,
                });
            }
            return Ok(existing);
        }

        let id = self.store.next_id();
        let mut membership = FactionMembership::new(id, faction_id, character_id, now);
        membership.role = role.to_string();
        membership.history = vec![MembershipEvent::Joined {
            role: role.to_string(),
            at: now,
        }];
        membership.set_reputation(loyalty);
        self.store.insert_membership(membership);
        Ok(id)
    }

    /// Adjust a member's in-faction standing by a signed delta, clamped to
    /// -100..100.
    pub fn update_member_loyalty(
        &mut self,
        faction_id: u64,
        character_id: u64,
        delta: f64,
        reason: Option<&str>,
    ) -> Result<f64, EngineError> {
        self.require_faction(faction_id)?;
        let Some(id) = self.active_membership_id(faction_id, character_id) else {
            return Err(EngineError::MembershipNotFound {
                faction_id,
                character_id,
            });
        };
        let now = self.now;
        let membership = self.store.membership_mut(id).unwrap();
        let old = membership.reputation;
        membership.reputation = clamp_reputation(old + delta);
        let new = membership.reputation;
        membership.history.push(MembershipEvent::LoyaltyChanged {
            old,
            new,
            reason: reason.map(str::to_string),
            at: now,
        });
        Ok(new)
    }

    /// Deactivate a character's active membership. Records are never hard
    /// deleted; the membership survives with status Retired.
    pub fn remove_member(
        &mut self,
        faction_id: u64,
        character_id: u64,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        self.require_faction(faction_id)?;
        let Some(id) = self.active_membership_id(faction_id, character_id) else {
            return Err(EngineError::MembershipNotFound {
                faction_id,
                character_id,
            });
        };
        let now = self.now;
        self.store
            .membership_mut(id)
            .unwrap()
            .deactivate(MembershipStatus::Retired, reason, now);
        Ok(())
    }

    /// Set a faction's direct control level over a POI (clamped to 0–10).
    /// Nonzero control makes the POI a propagation seed.
    pub fn assign_poi_control(
        &mut self,
        faction_id: u64,
        poi_id: u64,
        control_level: u8,
    ) -> Result<(), EngineError> {
        self.require_faction(faction_id)?;
        if self.store.poi(poi_id).is_none() {
            return Err(EngineError::PoiNotFound(poi_id));
        }
        let level = control_level.min(CONTROL_LEVEL_MAX);
        self.faction_mut(faction_id).poi_control.insert(
            poi_id,
            PoiControl {
                control_level: level,
            },
        );
        Ok(())
    }

    fn active_membership_id(&self, faction_id: u64, character_id: u64) -> Option<u64> {
        self.store
            .memberships_of_character(character_id)
            .into_iter()
            .find(|&id| {
                self.store
                    .membership(id)
                    .is_some_and(|m| m.faction_id == faction_id && m.is_active)
            })
    }
}
