//! Moves and the winner computation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HubError;

/// A Rock-Paper-Scissors move
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// All legal moves, in cyclic order
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Convert to bytes for commitment
    pub fn to_bytes(&self) -> &[u8] {
        match self {
            Move::Rock => b"Rock",
            Move::Paper => b"Paper",
            Move::Scissors => b"Scissors",
        }
    }

    /// Check if this move beats the other (cyclic precedence)
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl FromStr for Move {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissors" => Ok(Move::Scissors),
            other => Err(HubError::InvalidMove(other.to_string())),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Rock => write!(f, "Rock"),
            Move::Paper => write!(f, "Paper"),
            Move::Scissors => write!(f, "Scissors"),
        }
    }
}

/// Outcome of comparing two revealed moves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    FirstWins,
    SecondWins,
    Draw,
}

/// Compute the outcome for a pair of revealed moves.
///
/// Total over the 3x3 matrix: three first-wins cells, three second-wins
/// cells, three draws.
pub fn judge(first: Move, second: Move) -> Outcome {
    if first == second {
        Outcome::Draw
    } else if first.beats(&second) {
        Outcome::FirstWins
    } else {
        Outcome::SecondWins
    }
}
