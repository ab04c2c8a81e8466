//! RPS Hub Core Library
//!
//! This crate provides the commit-reveal state machine, the hub
//! factory/registry, and the event log for a two-party stake-escrowing
//! Rock-Paper-Scissors protocol with no trusted third party.

pub mod crypto;
pub mod error;
pub mod event;
pub mod game;
pub mod hub;
pub mod ledger;
pub mod types;

pub use crypto::{MoveCommitment, Secret};
pub use error::HubError;
pub use event::{EventKind, EventRecord};
pub use game::{judge, GameInstance, GameSnapshot, Move, Outcome};
pub use hub::{GameHub, GameParams, GameView, HubConfig};
pub use ledger::{Clock, ManualClock, MockSettlement, Settlement, SettlementError, SystemClock};
pub use types::{Amount, GameId, PlayerId};
