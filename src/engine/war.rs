//! War resolution: ends an active war through the relationship state
//! machine and applies the outcome's mechanical consequences.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{
    Consequence, DiplomaticStance, OutcomeRecord, WarOutcome, WarRecord, clamp_influence,
};
use crate::store::EntityStore;

use super::signal::SignalKind;
use super::FactionEngine;

const GOLD: &str = "gold";
const DEFAULT_RESOURCE_TRANSFER_PCT: f64 = 20.0;
const DEFAULT_POPULATION_SHIFT_PCT: f64 = 10.0;
const VICTOR_INFLUENCE_GAIN: f64 = 10.0;
const LOSER_INFLUENCE_LOSS: f64 = 15.0;
const STALEMATE_INFLUENCE_LOSS: f64 = 5.0;
const INFLUENCE_FLOOR: f64 = 10.0;
const STALEMATE_ATTRITION_FRACTION: f64 = 0.1;

/// A resource transfer demanded by negotiated terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTransfer {
    pub from_faction_id: u64,
    pub to_faction_id: u64,
    pub resource: String,
    pub amount: f64,
}

/// A territory transfer demanded by negotiated terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryTransfer {
    pub territory_id: u64,
    pub from_faction_id: u64,
    pub to_faction_id: u64,
}

/// Caller-supplied terms shaping a war's resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeaceTerms {
    /// Percentage of the loser's gold handed to the victor (default 20).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_transfer_pct: Option<f64>,
    /// Percentage of population displaced toward the victor (default 10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_shift_pct: Option<f64>,
    /// Territories ceded by the loser on victory/defeat.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub territories: Vec<u64>,
    /// Explicit transfers applied verbatim on negotiated outcomes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_transfers: Vec<ResourceTransfer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub territory_transfers: Vec<TerritoryTransfer>,
    /// Arbitrary extra consequences recorded as-is.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_consequences: Vec<serde_json::Value>,
    /// Overrides the outcome's default post-war stance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_war_stance: Option<DiplomaticStance>,
}

/// Full account of a resolved war.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub outcome: WarOutcome,
    pub faction_id: u64,
    pub other_faction_id: u64,
    pub victor: Option<u64>,
    pub post_war_stance: DiplomaticStance,
    pub consequences: Vec<Consequence>,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Resolve an active war with mechanical consequences and terminate it
    /// through [`make_peace`](Self::make_peace).
    ///
    /// Fails with `InvalidState` when the pair is not at war, and with
    /// `Validation` when a victory/defeat outcome names no victor or names
    /// a faction outside the war.
    pub fn resolve_war_outcome(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        victor: Option<u64>,
        outcome: WarOutcome,
        terms: Option<&PeaceTerms>,
        apply_consequences: bool,
    ) -> Result<OutcomeReport, EngineError> {
        let pair = self.checked_pair(faction_id, other_faction_id)?;
        let Some(rel) = self.store.relationship(pair) else {
            return Err(EngineError::RelationshipNotFound(
                faction_id,
                other_faction_id,
            ));
        };
        if rel.stance != DiplomaticStance::AtWar || !rel.is_at_war() {
            return Err(EngineError::InvalidState(
                "cannot resolve war when factions are not at war".to_string(),
            ));
        }

        let victor = if outcome.requires_victor() {
            let id = victor.ok_or_else(|| {
                EngineError::Validation(format!(
                    "a victor is required for {outcome} outcomes"
                ))
            })?;
            if !pair.involves(id) {
                return Err(EngineError::Validation(format!(
                    "victor {id} is not one of the warring factions"
                )));
            }
            Some(id)
        } else {
            None
        };

        let mut consequences = Vec::new();
        let default_stance = match outcome {
            WarOutcome::Victory | WarOutcome::Defeat | WarOutcome::Stalemate => {
                DiplomaticStance::Unfriendly
            }
            WarOutcome::Negotiated => DiplomaticStance::Neutral,
        };

        if apply_consequences {
            match outcome {
                WarOutcome::Victory | WarOutcome::Defeat => {
                    let victor_id = victor.unwrap();
                    let loser_id = pair.other(victor_id).unwrap();
                    self.apply_decisive_consequences(victor_id, loser_id, terms, &mut consequences);
                }
                WarOutcome::Negotiated => {
                    if let Some(terms) = terms {
                        self.apply_negotiated_consequences(terms, &mut consequences);
                    }
                }
                WarOutcome::Stalemate => {
                    self.apply_stalemate_consequences(
                        faction_id,
                        other_faction_id,
                        &mut consequences,
                    );
                }
            }
        }

        let post_war_stance = terms
            .and_then(|t| t.post_war_stance)
            .unwrap_or(default_stance);
        let terms_json = terms
            .map(|t| serde_json::to_value(t).expect("peace terms serialize"));
        self.make_peace(faction_id, other_faction_id, terms_json, post_war_stance)?;

        let now = self.now;
        let rel = self.store.relationship_mut(pair).unwrap();
        rel.war_state.outcomes.push(OutcomeRecord {
            outcome,
            victor,
            resolved_at: now,
            consequences: consequences.clone(),
        });
        for (side, against) in [
            (faction_id, other_faction_id),
            (other_faction_id, faction_id),
        ] {
            self.faction_mut(side).state.war_history.push(WarRecord {
                against,
                outcome,
                victor,
                at: now,
            });
        }

        self.publish(SignalKind::WarResolved {
            faction_id,
            other_faction_id,
            outcome,
            victor,
        });

        Ok(OutcomeReport {
            outcome,
            faction_id,
            other_faction_id,
            victor,
            post_war_stance,
            consequences,
        })
    }

    /// Victory/defeat: the loser pays, cedes, and diminishes.
    fn apply_decisive_consequences(
        &mut self,
        victor_id: u64,
        loser_id: u64,
        terms: Option<&PeaceTerms>,
        consequences: &mut Vec<Consequence>,
    ) {
        let pct = terms
            .and_then(|t| t.resource_transfer_pct)
            .unwrap_or(DEFAULT_RESOURCE_TRANSFER_PCT);
        let loser_gold = self.faction(loser_id).resource(GOLD);
        let transfer = loser_gold * pct / 100.0;
        if transfer > 0.0 {
            self.faction_mut(loser_id).add_resource(GOLD, -transfer);
            self.faction_mut(victor_id).add_resource(GOLD, transfer);
            consequences.push(Consequence::ResourceTransfer {
                resource: GOLD.to_string(),
                amount: transfer,
                from_faction_id: loser_id,
                to_faction_id: victor_id,
            });
        }

        // Territory and population changes belong to systems outside this
        // engine; the consequences are recorded for them to pick up.
        if let Some(terms) = terms {
            for &territory_id in &terms.territories {
                consequences.push(Consequence::TerritoryTransfer {
                    territory_id,
                    from_faction_id: loser_id,
                    to_faction_id: victor_id,
                });
            }
        }
        let shift = terms
            .and_then(|t| t.population_shift_pct)
            .unwrap_or(DEFAULT_POPULATION_SHIFT_PCT);
        consequences.push(Consequence::PopulationShift {
            percentage: shift,
            from_faction_id: loser_id,
            to_faction_id: victor_id,
        });

        let victor_faction = self.faction_mut(victor_id);
        victor_faction.influence = clamp_influence(victor_faction.influence + VICTOR_INFLUENCE_GAIN);
        let loser_faction = self.faction_mut(loser_id);
        loser_faction.influence = (loser_faction.influence - LOSER_INFLUENCE_LOSS).max(INFLUENCE_FLOOR);
        consequences.push(Consequence::InfluenceChange {
            faction_id: victor_id,
            delta: VICTOR_INFLUENCE_GAIN,
        });
        consequences.push(Consequence::InfluenceChange {
            faction_id: loser_id,
            delta: -LOSER_INFLUENCE_LOSS,
        });
    }

    /// Negotiated: the terms are the consequences, applied verbatim with
    /// floor-at-zero clamping on resource amounts.
    fn apply_negotiated_consequences(
        &mut self,
        terms: &PeaceTerms,
        consequences: &mut Vec<Consequence>,
    ) {
        for transfer in &terms.resource_transfers {
            if self.store.faction(transfer.from_faction_id).is_none()
                || self.store.faction(transfer.to_faction_id).is_none()
            {
                tracing::warn!(
                    from = transfer.from_faction_id,
                    to = transfer.to_faction_id,
                    "skipping resource transfer naming unknown faction"
                );
                continue;
            }
            let available = self.faction(transfer.from_faction_id).resource(&transfer.resource);
            let actual = transfer.amount.min(available).max(0.0);
            if actual <= 0.0 {
                continue;
            }
            self.faction_mut(transfer.from_faction_id)
                .add_resource(&transfer.resource, -actual);
            self.faction_mut(transfer.to_faction_id)
                .add_resource(&transfer.resource, actual);
            consequences.push(Consequence::ResourceTransfer {
                resource: transfer.resource.clone(),
                amount: actual,
                from_faction_id: transfer.from_faction_id,
                to_faction_id: transfer.to_faction_id,
            });
        }

        for transfer in &terms.territory_transfers {
            consequences.push(Consequence::TerritoryTransfer {
                territory_id: transfer.territory_id,
                from_faction_id: transfer.from_faction_id,
                to_faction_id: transfer.to_faction_id,
            });
        }

        for other in &terms.other_consequences {
            consequences.push(Consequence::Other {
                data: other.clone(),
            });
        }
    }

    /// Stalemate: both sides bleed a little and gain nothing.
    fn apply_stalemate_consequences(
        &mut self,
        faction_id: u64,
        other_faction_id: u64,
        consequences: &mut Vec<Consequence>,
    ) {
        for side in [faction_id, other_faction_id] {
            let gold = self.faction(side).resource(GOLD);
            let attrition = gold * STALEMATE_ATTRITION_FRACTION;
            if attrition > 0.0 {
                self.faction_mut(side).add_resource(GOLD, -attrition);
                consequences.push(Consequence::WarAttrition {
                    faction_id: side,
                    resource: GOLD.to_string(),
                    amount: attrition,
                });
            }
            let faction = self.faction_mut(side);
            faction.influence = (faction.influence - STALEMATE_INFLUENCE_LOSS).max(INFLUENCE_FLOOR);
            consequences.push(Consequence::InfluenceChange {
                faction_id: side,
                delta: -STALEMATE_INFLUENCE_LOSS,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use crate::testutil::assert_approx;

    fn warring_pair(s: &mut Scenario, gold_a: f64, gold_b: f64) -> (u64, u64) {
        let a = s
            .faction("Ravens")
            .influence(50.0)
            .gold(gold_a)
            .id();
        let b = s
            .faction("Larks")
            .influence(50.0)
            .gold(gold_b)
            .id();
        s.make_at_war(a, b);
        (a, b)
    }

    #[test]
    fn resolution_requires_active_war() {
        let mut s = Scenario::at_year(100);
        let a = s.add_faction("Ravens");
        let b = s.add_faction("Larks");
        s.set_relationship(a, b, DiplomaticStance::Hostile, 80.0);
        let mut engine = s.engine(42);

        let err = engine
            .resolve_war_outcome(a, b, Some(a), WarOutcome::Victory, None, true)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn victory_requires_valid_victor() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 100.0);
        let mut engine = s.engine(42);

        assert!(matches!(
            engine.resolve_war_outcome(a, b, None, WarOutcome::Victory, None, true),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.resolve_war_outcome(a, b, Some(777), WarOutcome::Victory, None, true),
            Err(EngineError::Validation(_))
        ));
        // The war is still on after the failed attempts.
        assert!(engine.relationship_between(a, b).unwrap().is_at_war());
    }

    #[test]
    fn victory_transfers_gold_and_shifts_influence() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 500.0);
        let mut engine = s.engine(42);

        let report = engine
            .resolve_war_outcome(a, b, Some(a), WarOutcome::Victory, None, true)
            .unwrap();

        assert_eq!(report.victor, Some(a));
        assert_eq!(report.post_war_stance, DiplomaticStance::Unfriendly);

        let store = engine.store();
        let winner = store.faction(a).unwrap();
        let loser = store.faction(b).unwrap();
        assert_approx(winner.resource("gold"), 200.0, 1e-9, "victor gold");
        assert_approx(loser.resource("gold"), 400.0, 1e-9, "loser gold");
        assert_eq!(winner.influence, 60.0);
        assert_eq!(loser.influence, 35.0);

        let rel = engine.relationship_between(a, b).unwrap();
        assert!(!rel.is_at_war());
        assert_eq!(rel.stance, DiplomaticStance::Unfriendly);
        assert_eq!(rel.war_state.outcomes.len(), 1);
        assert_eq!(rel.war_state.outcomes[0].outcome, WarOutcome::Victory);
    }

    #[test]
    fn influence_respects_floor_and_ceiling() {
        let mut s = Scenario::at_year(100);
        let a = s.faction("Ravens").influence(95.0).id();
        let b = s.faction("Larks").influence(12.0).id();
        s.make_at_war(a, b);
        let mut engine = s.engine(42);

        engine
            .resolve_war_outcome(a, b, Some(a), WarOutcome::Victory, None, true)
            .unwrap();
        assert_eq!(engine.store().faction(a).unwrap().influence, 100.0);
        assert_eq!(engine.store().faction(b).unwrap().influence, 10.0);
    }

    #[test]
    fn defeat_uses_supplied_victor() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 100.0);
        let mut engine = s.engine(42);

        // `b` won even though `a` initiated the resolution call.
        let report = engine
            .resolve_war_outcome(a, b, Some(b), WarOutcome::Defeat, None, true)
            .unwrap();
        assert_eq!(report.victor, Some(b));
        assert_eq!(engine.store().faction(b).unwrap().influence, 60.0);
        assert_eq!(engine.store().faction(a).unwrap().influence, 35.0);
    }

    #[test]
    fn consequences_can_be_disabled() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 500.0);
        let mut engine = s.engine(42);

        let report = engine
            .resolve_war_outcome(a, b, Some(a), WarOutcome::Victory, None, false)
            .unwrap();
        assert!(report.consequences.is_empty());
        assert_eq!(engine.store().faction(b).unwrap().resource("gold"), 500.0);
        assert_eq!(engine.store().faction(a).unwrap().influence, 50.0);
        // The war still ended.
        assert!(!engine.relationship_between(a, b).unwrap().is_at_war());
    }

    #[test]
    fn negotiated_applies_terms_verbatim_with_floor() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 30.0, 100.0);
        let mut engine = s.engine(42);

        let terms = PeaceTerms {
            resource_transfers: vec![ResourceTransfer {
                from_faction_id: a,
                to_faction_id: b,
                resource: "gold".to_string(),
                // More than `a` holds: clamps to the available 30.
                amount: 80.0,
            }],
            territory_transfers: vec![TerritoryTransfer {
                territory_id: 42,
                from_faction_id: b,
                to_faction_id: a,
            }],
            other_consequences: vec![serde_json::json!({"kind": "hostage_exchange"})],
            ..PeaceTerms::default()
        };
        let report = engine
            .resolve_war_outcome(a, b, None, WarOutcome::Negotiated, Some(&terms), true)
            .unwrap();

        assert_eq!(report.post_war_stance, DiplomaticStance::Neutral);
        assert_eq!(engine.store().faction(a).unwrap().resource("gold"), 0.0);
        assert_eq!(engine.store().faction(b).unwrap().resource("gold"), 130.0);
        assert!(report.consequences.iter().any(|c| matches!(
            c,
            Consequence::ResourceTransfer { amount, .. } if *amount == 30.0
        )));
        assert!(report.consequences.iter().any(|c| matches!(
            c,
            Consequence::TerritoryTransfer { territory_id: 42, .. }
        )));
        assert!(report.consequences.iter().any(|c| matches!(c, Consequence::Other { .. })));
    }

    #[test]
    fn stalemate_bleeds_both_sides() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 200.0, 100.0);
        let mut engine = s.engine(42);

        let report = engine
            .resolve_war_outcome(a, b, None, WarOutcome::Stalemate, None, true)
            .unwrap();

        assert_eq!(report.victor, None);
        assert_eq!(report.post_war_stance, DiplomaticStance::Unfriendly);
        assert_approx(
            engine.store().faction(a).unwrap().resource("gold"),
            180.0,
            1e-9,
            "a attrition",
        );
        assert_approx(
            engine.store().faction(b).unwrap().resource("gold"),
            90.0,
            1e-9,
            "b attrition",
        );
        assert_eq!(engine.store().faction(a).unwrap().influence, 45.0);
        assert_eq!(engine.store().faction(b).unwrap().influence, 45.0);
    }

    #[test]
    fn terms_override_post_war_stance() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 100.0);
        let mut engine = s.engine(42);

        let terms = PeaceTerms {
            post_war_stance: Some(DiplomaticStance::Friendly),
            ..PeaceTerms::default()
        };
        let report = engine
            .resolve_war_outcome(a, b, None, WarOutcome::Negotiated, Some(&terms), true)
            .unwrap();
        assert_eq!(report.post_war_stance, DiplomaticStance::Friendly);
        assert_eq!(
            engine.relationship_between(a, b).unwrap().tension,
            -40.0
        );
    }

    #[test]
    fn war_history_recorded_on_both_factions() {
        let mut s = Scenario::at_year(100);
        let (a, b) = warring_pair(&mut s, 100.0, 100.0);
        let mut engine = s.engine(42);

        engine
            .resolve_war_outcome(a, b, Some(a), WarOutcome::Victory, None, true)
            .unwrap();
        let history_a = &engine.store().faction(a).unwrap().state.war_history;
        let history_b = &engine.store().faction(b).unwrap().state.war_history;
        assert_eq!(history_a.len(), 1);
        assert_eq!(history_b.len(), 1);
        assert_eq!(history_a[0].against, b);
        assert_eq!(history_b[0].against, a);
        assert_eq!(history_a[0].victor, Some(a));
    }
}
