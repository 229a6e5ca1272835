//! Periodic relaxation of non-war tensions toward zero.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{DiplomaticStance, RelationshipEvent};
use crate::store::EntityStore;

use super::FactionEngine;

/// Decay magnitude scales with how extreme the tension is.
const EXTREMITY_BASE: f64 = 0.5;
const EXTREMITY_SCALE: f64 = 200.0;
/// Per-pair random jitter applied to the base magnitude.
const JITTER_MIN: f64 = 0.7;
const JITTER_MAX: f64 = 1.3;
/// Changes at least this large are worth a history entry.
const HISTORY_THRESHOLD: f64 = 1.0;

/// Tuning for one decay pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayParams {
    /// Base decay rate for conflict-leaning (positive) tension.
    pub rate_positive: f64,
    /// Base decay rate for alliance-leaning (negative) tension.
    pub rate_negative: f64,
    pub min_decay: f64,
    pub max_decay: f64,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            rate_positive: 0.5,
            rate_negative: 0.5,
            min_decay: 0.1,
            max_decay: 2.5,
        }
    }
}

/// Aggregate result of one decay pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecayStats {
    /// Non-war pairs with nonzero tension that were considered.
    pub pairs_processed: u32,
    /// Pairs whose tension actually moved.
    pub pairs_changed: u32,
    /// Sum of applied decay magnitudes.
    pub total_decay: f64,
}

impl DecayStats {
    pub fn absorb(&mut self, other: DecayStats) {
        self.pairs_processed += other.pairs_processed;
        self.pairs_changed += other.pairs_changed;
        self.total_decay += other.total_decay;
    }
}

impl<S: EntityStore> FactionEngine<S> {
    /// Relax every non-war tension toward zero by one time unit.
    ///
    /// Decay never overshoots past zero, applies symmetrically to both
    /// orientations of a pair (one canonical record), and skips pairs at
    /// war entirely; war tension does not passively cool.
    pub fn decay_tensions(&mut self, params: &DecayParams) -> Result<DecayStats, EngineError> {
        if params.rate_positive < 0.0 || params.rate_negative < 0.0 {
            return Err(EngineError::Validation(
                "decay rates must be non-negative".to_string(),
            ));
        }
        if params.min_decay < 0.0 || params.min_decay > params.max_decay {
            return Err(EngineError::Validation(
                "min_decay must be within 0..=max_decay".to_string(),
            ));
        }

        let now = self.now;
        let mut stats = DecayStats::default();

        for pair in self.store.relationship_pairs() {
            let Some(rel) = self.store.relationship(pair) else {
                continue;
            };
            if rel.stance == DiplomaticStance::AtWar || rel.is_at_war() {
                continue;
            }
            let tension = rel.tension;
            if tension == 0.0 {
                continue;
            }
            stats.pairs_processed += 1;

            let rate = if tension > 0.0 {
                params.rate_positive
            } else {
                params.rate_negative
            };
            let base = rate * (EXTREMITY_BASE + tension.abs() / EXTREMITY_SCALE);
            let jitter: f64 = self.rng.random_range(JITTER_MIN..=JITTER_MAX);
            let magnitude = (base * jitter)
                .clamp(params.min_decay, params.max_decay)
                .min(tension.abs());
            if magnitude <= 0.0 {
                continue;
            }

            let after = if tension > 0.0 {
                tension - magnitude
            } else {
                tension + magnitude
            };

            let rel = self.store.relationship_mut(pair).unwrap();
            rel.tension = after;
            if magnitude >= HISTORY_THRESHOLD {
                rel.history.push(RelationshipEvent::TensionDecay {
                    before: tension,
                    after,
                    at: now,
                });
            }

            stats.pairs_changed += 1;
            stats.total_decay += magnitude;
        }

        tracing::debug!(
            processed = stats.pairs_processed,
            changed = stats.pairs_changed,
            total = stats.total_decay,
            "tension decay pass complete"
        );
        Ok(stats)
    }
}
