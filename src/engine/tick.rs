//! Periodic batch scheduling: steps the simulation clock one day at a time
//! and fires the decay and propagation passes at their configured cadence.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::SimTimestamp;
use crate::model::timestamp::DAYS_PER_WEEK;
use crate::store::EntityStore;

use super::decay::{DecayParams, DecayStats};
use super::propagation::PropagationEvent;
use super::FactionEngine;

/// How often a batch process fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TickFrequency {
    Daily,
    Weekly,
    Monthly,
}

string_enum!(TickFrequency {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

/// Returns true if a process at the given frequency fires on this day.
pub fn should_fire(freq: TickFrequency, time: SimTimestamp) -> bool {
    match freq {
        TickFrequency::Daily => true,
        TickFrequency::Weekly => time.days_since_epoch() % DAYS_PER_WEEK as u64 == 0,
        TickFrequency::Monthly => time.day_of_month() == 1,
    }
}

/// Configuration for a run of simulated days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    pub num_days: u32,
    pub decay: DecayParams,
    pub decay_frequency: TickFrequency,
    pub propagation_frequency: TickFrequency,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            num_days: 1,
            decay: DecayParams::default(),
            decay_frequency: TickFrequency::Daily,
            propagation_frequency: TickFrequency::Weekly,
        }
    }
}

/// Aggregated result of a tick run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub days_run: u32,
    pub decay_runs: u32,
    pub decay: DecayStats,
    pub propagation_runs: u32,
    pub propagation_events: Vec<PropagationEvent>,
    /// (faction id, reason) pairs from propagation passes.
    pub propagation_failures: Vec<(u64, String)>,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Advance the clock `config.num_days` days, firing each batch process
    /// at its configured cadence. Per-item failures stay inside the batch
    /// statistics; only invalid configuration aborts the run.
    pub fn run_ticks(&mut self, config: &TickConfig) -> Result<TickReport, EngineError> {
        let mut report = TickReport::default();
        for _ in 0..config.num_days {
            if should_fire(config.decay_frequency, self.now) {
                let stats = self.decay_tensions(&config.decay)?;
                report.decay.absorb(stats);
                report.decay_runs += 1;
            }
            if should_fire(config.propagation_frequency, self.now) {
                let mut pass = self.propagate_influence();
                report.propagation_events.append(&mut pass.events);
                report.propagation_failures.append(&mut pass.failures);
                report.propagation_runs += 1;
            }
            self.now = self.now.next_day();
            report.days_run += 1;
        }
        Ok(report)
    }
}
