//! The faction dynamics engine: diplomatic state machine, tension decay,
//! influence propagation, schisms, war resolution, and reputation tracking.
//!
//! All state lives behind the injected [`EntityStore`]; all randomness comes
//! from the injected RNG; all notifications go to the injected [`EventSink`].
//! The engine itself holds only the simulation clock.

mod admin;
mod decay;
mod propagation;
mod relations;
mod reputation;
mod schism;
pub mod signal;
pub mod tick;
mod war;

pub use decay::{DecayParams, DecayStats};
pub use propagation::{PropagationEvent, PropagationReport};
pub use reputation::{ModifierSet, ReputationChange};
pub use schism::{
    DEFAULT_SCHISM_THRESHOLD, DivideKind, IdeologicalDivide, SchismInputs, SchismReport,
    TriggerEvent,
};
pub use signal::{DiscardSink, EventSink, SharedSignals, Signal, SignalKind, shared_signals};
pub use tick::{TickConfig, TickFrequency, TickReport};
pub use war::{OutcomeReport, PeaceTerms, ResourceTransfer, TerritoryTransfer};

use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::error::EngineError;
use crate::model::SimTimestamp;
use crate::store::EntityStore;

/// The engine. Single-threaded by design: gameplay events are short
/// synchronous read-modify-write sequences, and the batch ticks run to
/// completion before the next event is processed.
pub struct FactionEngine<S: EntityStore> {
    store: S,
    rng: Box<dyn RngCore>,
    sink: Box<dyn EventSink>,
    /// The simulation clock, stamped onto every history entry and signal.
    /// Advanced by the tick runner or directly by the host.
    pub now: SimTimestamp,
}

impl<S: EntityStore> FactionEngine<S> {
    /// Engine over `store` with a seeded deterministic RNG and no event
    /// fan-out. Same seed, same store contents, same simulation.
    pub fn new(store: S, seed: u64) -> Self {
        Self {
            store,
            rng: Box::new(SmallRng::seed_from_u64(seed)),
            sink: Box::new(DiscardSink),
            now: SimTimestamp::from_year(1),
        }
    }

    /// Replace the event sink (builder style).
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the random source (builder style). Tests inject scripted
    /// RNGs here to pin down individual branch decisions.
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }

    /// Set the simulation clock (builder style).
    pub fn at_time(mut self, now: SimTimestamp) -> Self {
        self.now = now;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the engine and hand back the store.
    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn publish(&mut self, kind: SignalKind) {
        self.sink.publish(Signal { at: self.now, kind });
    }

    pub(crate) fn require_faction(&self, id: u64) -> Result<(), EngineError> {
        if self.store.faction(id).is_some() {
            Ok(())
        } else {
            Err(EngineError::FactionNotFound(id))
        }
    }

    // Store accessors used after existence has been checked. Panicking here
    // would mean a checked record vanished mid-operation, which the
    // single-threaded model rules out.

    pub(crate) fn faction(&self, id: u64) -> &crate::model::Faction {
        self.store
            .faction(id)
            .unwrap_or_else(|| panic!("faction {id} vanished mid-operation"))
    }

    pub(crate) fn faction_mut(&mut self, id: u64) -> &mut crate::model::Faction {
        self.store
            .faction_mut(id)
            .unwrap_or_else(|| panic!("faction {id} vanished mid-operation"))
    }
}
