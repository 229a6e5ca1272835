use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Batch operations (tension decay, influence propagation) never return the
/// per-item variants; they isolate faults per faction/pair and report them
/// in their statistics instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("faction {0} not found")]
    FactionNotFound(u64),

    #[error("no relationship exists between factions {0} and {1}")]
    RelationshipNotFound(u64, u64),

    #[error("no active membership of character {character_id} in faction {faction_id}")]
    MembershipNotFound { faction_id: u64, character_id: u64 },

    #[error("location {0} not found")]
    PoiNotFound(u64),

    #[error("invalid relationship state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A failure inside the entity store backend. The in-memory store never
    /// produces this; persistent stores map their I/O errors here.
    #[error("store failure: {0}")]
    Store(String),
}
