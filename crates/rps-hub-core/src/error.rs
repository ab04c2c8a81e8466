//! Error taxonomy for hub and game operations.
//!
//! Every error is a rejection of the attempted operation, never a partial
//! application. The enum variant is the machine-readable kind; the message
//! is the human-readable reason.

use thiserror::Error;

use crate::types::{GameId, PlayerId};

/// Errors from hub and game-instance operations
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HubError {
    // Authorization
    #[error("caller {0} is not a designated player of this game")]
    UnauthorizedCaller(PlayerId),

    #[error("caller {0} is not a player in this game")]
    NotAPlayer(PlayerId),

    #[error("caller {0} is not the hub owner")]
    Unauthorized(PlayerId),

    // Validation
    #[error("the two players must be distinct")]
    PlayersIdentical,

    #[error("player identity must not be the zero sentinel")]
    ZeroAddressPlayer,

    #[error("stake sent ({sent}) does not match the game stake ({expected})")]
    WrongStake { sent: u64, expected: u64 },

    #[error("fee paid ({paid}) is below the required creation fee ({required})")]
    InsufficientFee { paid: u64, required: u64 },

    #[error("invalid move: {0}")]
    InvalidMove(String),

    // Sequencing
    #[error("caller has already played in this game")]
    AlreadyPlayed,

    #[error("caller has not played in this game")]
    HasNotPlayed,

    #[error("caller has already revealed their move")]
    AlreadyRevealed,

    #[error("caller has already claimed their draw payout")]
    AlreadyClaimed,

    #[error("opponent has not played yet")]
    OpponentHasNotPlayed,

    #[error("both moves must be revealed before claiming")]
    MovesNotRevealed,

    #[error("game is already finished")]
    GameAlreadyFinished,

    #[error("hub is paused, no new games can be created")]
    HubPaused,

    #[error("inactivity window has not elapsed yet")]
    TimeoutNotElapsed,

    #[error("timeout claim unavailable: opponent is not in default")]
    OpponentNotInDefault,

    #[error("unknown game: {0}")]
    UnknownGame(GameId),

    // Integrity
    #[error("revealed secret and move do not match the stored commitment")]
    RevealMismatch,

    #[error("caller's move does not beat the opponent's move")]
    NotWinner,

    #[error("revealed moves are not equal, this game is not a draw")]
    NotADraw,

    // Fund movement
    #[error("payout transfer failed: {0}")]
    TransferFailed(String),
}

/// Convenience alias for core results
pub type Result<T> = std::result::Result<T, HubError>;
