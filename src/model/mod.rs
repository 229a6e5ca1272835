pub mod faction;
pub mod location;
pub mod membership;
pub mod relationship;
pub mod timestamp;

pub use faction::{
    CONTROL_LEVEL_MAX, Faction, FactionState, PoiControl, ReputationBracket, ReputationEvent,
    ReputationScope, SchismRecord, TerritoryHold, WarRecord, clamp_influence, clamp_reputation,
};
pub use location::{Npc, Poi};
pub use membership::{FactionMembership, MembershipEvent, MembershipStatus};
pub use relationship::{
    Consequence, DiplomaticStance, FactionRelationship, OutcomeRecord, PairKey, PeaceRecord,
    RelationshipEvent, WarOutcome, WarState, clamp_tension,
};
pub use timestamp::SimTimestamp;
