#[macro_use]
mod macros;

pub mod model;

pub mod db;
pub mod engine;
pub mod error;
pub mod flush;
pub mod id;
pub mod scenario;
pub mod store;
pub mod testutil;

pub use engine::{
    DecayParams, DecayStats, FactionEngine, ModifierSet, OutcomeReport, PeaceTerms,
    PropagationEvent, PropagationReport, ReputationChange, SchismInputs, SchismReport, Signal,
    SignalKind, TickConfig, TickFrequency, TickReport,
};
pub use error::EngineError;
pub use id::IdGenerator;
pub use model::{
    Consequence, DiplomaticStance, Faction, FactionMembership, FactionRelationship, FactionState,
    MembershipStatus, Npc, PairKey, Poi, ReputationBracket, SimTimestamp, WarOutcome,
};
pub use scenario::Scenario;
pub use store::{EntityStore, MemoryStore};
