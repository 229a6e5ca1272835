use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::model::{
    DiplomaticStance, ReputationBracket, ReputationScope, SimTimestamp, WarOutcome,
};

/// A notification published by the engine when something narratively
/// significant happens. Fire-and-forget: publishing never fails and never
/// blocks an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub at: SimTimestamp,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// A war was declared between two factions.
    WarDeclared {
        declared_by: u64,
        target: u64,
        reason: String,
    },

    /// A war ended without a resolved outcome (direct peace).
    PeaceMade {
        faction_id: u64,
        other_faction_id: u64,
        new_stance: DiplomaticStance,
    },

    /// A war was resolved with mechanical consequences.
    WarResolved {
        faction_id: u64,
        other_faction_id: u64,
        outcome: WarOutcome,
        victor: Option<u64>,
    },

    /// A faction fractured, producing a breakaway faction.
    FactionSplit {
        parent_faction_id: u64,
        new_faction_id: u64,
        members_transferred: u32,
    },

    /// A faction's reputation crossed into a different bracket.
    ReputationBracketChanged {
        faction_id: u64,
        scope: ReputationScope,
        from: ReputationBracket,
        to: ReputationBracket,
    },

    /// An NPC joined a faction through influence propagation.
    NpcAligned {
        npc_id: u64,
        faction_id: u64,
        poi_id: u64,
    },
}

/// Where engine signals go. Injected at construction so hosts decide how
/// (or whether) to fan events out. No ambient global bus.
pub trait EventSink {
    fn publish(&mut self, signal: Signal);
}

/// Drops every signal. The default sink for hosts that don't care.
#[derive(Debug, Default)]
pub struct DiscardSink;

impl EventSink for DiscardSink {
    fn publish(&mut self, _signal: Signal) {}
}

impl EventSink for Vec<Signal> {
    fn publish(&mut self, signal: Signal) {
        self.push(signal);
    }
}

/// Shared signal buffer: lets a test hold one handle while the engine owns
/// the other.
pub type SharedSignals = Rc<RefCell<Vec<Signal>>>;

impl EventSink for SharedSignals {
    fn publish(&mut self, signal: Signal) {
        self.borrow_mut().push(signal);
    }
}

/// A fresh shared buffer plus a boxed sink view of it.
pub fn shared_signals() -> (SharedSignals, Box<dyn EventSink>) {
    let buffer: SharedSignals = Rc::new(RefCell::new(Vec::new()));
    (buffer.clone(), Box::new(buffer))
}
