//! Reputation tracking across three independently clamped scales (global,
//! regional, per-character) plus derived gameplay modifiers.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{
    ReputationBracket, ReputationEvent, ReputationScope, clamp_reputation,
};
use crate::store::EntityStore;

use super::signal::SignalKind;
use super::FactionEngine;

/// Fraction of a regional change that spills into the global score.
const REGIONAL_GLOBAL_SPILL: f64 = 0.2;
/// Fraction of a character change mirrored onto an active membership.
const MEMBERSHIP_NUDGE_RATE: f64 = 0.5;

const MODIFIER_FLOOR: f64 = 0.1;
const MODIFIER_CEILING: f64 = 2.0;
const LEVERAGE_CEILING: f64 = 3.0;

/// Result of one reputation modification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationChange {
    pub faction_id: u64,
    pub scope: ReputationScope,
    pub old: f64,
    pub new: f64,
    /// The delta that survived clamping.
    pub applied_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_change: Option<(ReputationBracket, ReputationBracket)>,
}

/// Gameplay multipliers derived from a faction's global reputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierSet {
    pub trade_price: f64,
    pub quest_reward: f64,
    pub recruiting_cost: f64,
    pub diplomatic_leverage: f64,
    pub information_access: f64,
    pub favor_cost: f64,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Add a signed delta to the faction's global reputation.
    pub fn modify_global_reputation(
        &mut self,
        faction_id: u64,
        amount: f64,
        reason: &str,
        source: Option<serde_json::Value>,
    ) -> Result<ReputationChange, EngineError> {
        self.require_faction(faction_id)?;
        let old = self.faction(faction_id).reputation;
        let new = clamp_reputation(old + amount);
        self.faction_mut(faction_id).reputation = new;
        let change = self.log_reputation_change(
            faction_id,
            ReputationScope::Global,
            old,
            new,
            reason,
            source,
        );
        Ok(change)
    }

    /// Add a signed delta to the faction's reputation within one region.
    /// 20% of the delta spills into the global score.
    pub fn modify_regional_reputation(
        &mut self,
        faction_id: u64,
        region_id: u64,
        amount: f64,
        reason: &str,
        source: Option<serde_json::Value>,
    ) -> Result<ReputationChange, EngineError> {
        self.require_faction(faction_id)?;
        let old = self
            .faction(faction_id)
            .state
            .regional_reputations
            .get(&region_id)
            .copied()
            .unwrap_or(0.0);
        let new = clamp_reputation(old + amount);
        self.faction_mut(faction_id)
            .state
            .regional_reputations
            .insert(region_id, new);
        let change = self.log_reputation_change(
            faction_id,
            ReputationScope::Region { region_id },
            old,
            new,
            reason,
            source,
        );

        // Word travels: the global modifier never re-propagates, so this
        // recursion is bounded.
        let spill = amount * REGIONAL_GLOBAL_SPILL;
        if spill != 0.0 {
            self.modify_global_reputation(
                faction_id,
                spill,
                &format!("regional spillover: {reason}"),
                None,
            )?;
        }
        Ok(change)
    }

    /// Add a signed delta to how a faction regards one character. When
    /// `affect_membership` is set and the character holds an active
    /// membership in the faction, half the delta nudges that membership's
    /// standing as well.
    pub fn modify_character_reputation(
        &mut self,
        faction_id: u64,
        character_id: u64,
        amount: f64,
        reason: &str,
        source: Option<serde_json::Value>,
        affect_membership: bool,
    ) -> Result<ReputationChange, EngineError> {
        self.require_faction(faction_id)?;
        let old = self
            .faction(faction_id)
            .state
            .character_reputations
            .get(&character_id)
            .copied()
            .unwrap_or(0.0);
        let new = clamp_reputation(old + amount);
        self.faction_mut(faction_id)
            .state
            .character_reputations
            .insert(character_id, new);
        let change = self.log_reputation_change(
            faction_id,
            ReputationScope::Character { character_id },
            old,
            new,
            reason,
            source,
        );

        if affect_membership {
            let membership_id = self
                .store
                .memberships_of_character(character_id)
                .into_iter()
                .find(|&mid| {
                    self.store
                        .membership(mid)
                        .is_some_and(|m| m.faction_id == faction_id && m.is_active)
                });
            if let Some(mid) = membership_id {
                let now = self.now;
                let membership = self.store.membership_mut(mid).unwrap();
                let before = membership.reputation;
                membership.set_reputation(before + amount * MEMBERSHIP_NUDGE_RATE);
                let after = membership.reputation;
                membership
                    .history
                    .push(crate::model::MembershipEvent::LoyaltyChanged {
                        old: before,
                        new: after,
                        reason: Some(format!("standing with faction: {reason}")),
                        at: now,
                    });
            }
        }
        Ok(change)
    }

    /// Derive gameplay multipliers from the faction's global reputation:
    /// a linear base on `reputation/100` plus fixed bonuses at the bracket
    /// extremes, clamped to 0.1–2.0 (0.1–3.0 for leverage and information).
    pub fn compute_reputation_modifiers(
        &self,
        faction_id: u64,
    ) -> Result<ModifierSet, EngineError> {
        self.require_faction(faction_id)?;
        let reputation = self.faction(faction_id).reputation;
        let r = reputation / 100.0;
        let bracket = ReputationBracket::of(reputation);

        // (revered, respected, hostile, reviled) bonuses per modifier.
        let bonus = |revered: f64, respected: f64, hostile: f64, reviled: f64| match bracket {
            ReputationBracket::Revered => revered,
            ReputationBracket::Respected => respected,
            ReputationBracket::Hostile => hostile,
            ReputationBracket::Reviled => reviled,
            _ => 0.0,
        };
        let clamp = |v: f64| v.clamp(MODIFIER_FLOOR, MODIFIER_CEILING);
        let clamp_wide = |v: f64| v.clamp(MODIFIER_FLOOR, LEVERAGE_CEILING);

        Ok(ModifierSet {
            trade_price: clamp(1.0 - 0.3 * r + bonus(-0.15, -0.05, 0.2, 0.5)),
            quest_reward: clamp(1.0 + 0.4 * r + bonus(0.2, 0.1, -0.1, -0.25)),
            recruiting_cost: clamp(1.0 - 0.4 * r + bonus(-0.2, -0.1, 0.3, 0.6)),
            diplomatic_leverage: clamp_wide(1.0 + 0.8 * r + bonus(0.5, 0.2, -0.3, -0.6)),
            information_access: clamp_wide(1.0 + 0.6 * r + bonus(0.4, 0.15, -0.25, -0.5)),
            favor_cost: clamp(1.0 - 0.5 * r + bonus(-0.25, -0.1, 0.4, 0.8)),
        })
    }

    /// Append the change (and any bracket transition) to the faction's
    /// reputation log, publishing a signal on bracket transitions.
    fn log_reputation_change(
        &mut self,
        faction_id: u64,
        scope: ReputationScope,
        old: f64,
        new: f64,
        reason: &str,
        source: Option<serde_json::Value>,
    ) -> ReputationChange {
        let now = self.now;
        let from = ReputationBracket::of(old);
        let to = ReputationBracket::of(new);
        let bracket_change = (from != to).then_some((from, to));

        let log = &mut self.faction_mut(faction_id).state.reputation_log;
        log.push(ReputationEvent::Changed {
            scope,
            old,
            new,
            delta: new - old,
            reason: reason.to_string(),
            source,
            at: now,
        });
        if let Some((from, to)) = bracket_change {
            log.push(ReputationEvent::BracketShift {
                scope,
                from,
                to,
                at: now,
            });
            self.publish(SignalKind::ReputationBracketChanged {
                faction_id,
                scope,
                from,
                to,
            });
        }

        ReputationChange {
            faction_id,
            scope,
            old,
            new,
            applied_delta: new - old,
            bracket_change,
        }
    }
}
