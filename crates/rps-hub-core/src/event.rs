//! Structured events emitted by the hub.
//!
//! Exactly one event is appended per successful state-changing call, never
//! on failure. The log is append-only; consumers resume from any sequence
//! number with `GameHub::events_since`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Amount, GameId, PlayerId};

/// What happened
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    InstanceCreated {
        creator: PlayerId,
        player_a: PlayerId,
        player_b: PlayerId,
        stake: Amount,
    },
    InstanceKilled,
    Played {
        player: PlayerId,
    },
    Revealed {
        player: PlayerId,
    },
    WinnerClaimed {
        winner: PlayerId,
        amount: Amount,
    },
    DrawClaimed {
        player: PlayerId,
        amount: Amount,
    },
    TimeoutClaimed {
        player: PlayerId,
        amount: Amount,
    },
    FeesReclaimed {
        amount: Amount,
    },
    PausedChanged {
        paused: bool,
    },
    OwnerChanged {
        previous: PlayerId,
        new: PlayerId,
    },
}

/// One entry in the hub's append-only event log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0
    pub seq: u64,
    /// Ledger timestamp of the operation that emitted this event
    pub at: DateTime<Utc>,
    /// The game this event concerns, if any
    pub game: Option<GameId>,
    pub kind: EventKind,
}
