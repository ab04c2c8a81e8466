//! Game creation parameters and hub configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};
use crate::types::{Amount, PlayerId};

/// Immutable, validated record of the two player identities and the stake.
///
/// Both hub creation paths converge on this type: the raw-argument path
/// builds one internally, the parameterized path takes a pre-built value.
/// Validation happens exactly once, at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameParams {
    player_a: PlayerId,
    player_b: PlayerId,
    stake: Amount,
}

impl GameParams {
    /// Validate and freeze the parameters for one game.
    ///
    /// A zero stake is legal: a friendly game with no money at risk.
    pub fn new(player_a: PlayerId, player_b: PlayerId, stake: Amount) -> Result<Self> {
        if player_a.is_zero() || player_b.is_zero() {
            return Err(HubError::ZeroAddressPlayer);
        }
        if player_a == player_b {
            return Err(HubError::PlayersIdentical);
        }
        Ok(Self {
            player_a,
            player_b,
            stake,
        })
    }

    pub fn player_a(&self) -> PlayerId {
        self.player_a
    }

    pub fn player_b(&self) -> PlayerId {
        self.player_b
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    /// Is the given identity one of the two players?
    pub fn includes(&self, player: PlayerId) -> bool {
        self.player_a == player || self.player_b == player
    }
}

/// Hub-wide configuration, fixed at hub construction
#[derive(Clone, Copy, Debug)]
pub struct HubConfig {
    /// Fee collected on each game creation, retained by the hub
    pub fee: Amount,
    /// Inactivity window for unilateral timeout claims
    pub timeout: Duration,
    /// Whether game creation starts out paused
    pub start_paused: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            fee: 100,
            timeout: Duration::hours(24),
            start_paused: false,
        }
    }
}
