//! Move commitment for the commit-reveal scheme.
//!
//! A commitment binds a player to a move before the opponent's move is
//! known. The player identity is part of the hash so one player's
//! commitment cannot be replayed by the other.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::game::Move;
use crate::types::PlayerId;

/// Domain separation tag for move commitments
const COMMITMENT_TAG: &[u8] = b"rps-hub/move-commitment/v1";

/// Player-chosen secret for the commitment scheme
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Create from caller-supplied bytes (e.g. a password)
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Create a new random 32-byte secret
    pub fn random() -> Self {
        let mut bytes = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(..)")
    }
}

/// Commitment = H(tag || player || secret || move)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveCommitment([u8; 32]);

impl MoveCommitment {
    /// Create a commitment for a player's move
    pub fn new(player: PlayerId, secret: &Secret, mv: Move) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_TAG);
        hasher.update(player.as_bytes());
        hasher.update(secret.as_bytes());
        hasher.update(mv.to_bytes());
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify that the given player, secret and move produce this commitment
    pub fn verify(&self, player: PlayerId, secret: &Secret, mv: Move) -> bool {
        *self == Self::new(player, secret, mv)
    }
}

impl FromStr for MoveCommitment {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for MoveCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MoveCommitment({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for MoveCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(byte: u8) -> PlayerId {
        PlayerId::from_bytes([byte; 20])
    }

    #[test]
    fn test_commitment_is_deterministic() {
        let secret = Secret::new("12345678");
        let a = MoveCommitment::new(player(1), &secret, Move::Rock);
        let b = MoveCommitment::new(player(1), &secret, Move::Rock);
        assert_eq!(a, b);
    }

    #[test]
    fn test_commitment_verification() {
        let secret = Secret::random();
        let commitment = MoveCommitment::new(player(1), &secret, Move::Paper);
        assert!(commitment.verify(player(1), &secret, Move::Paper));
    }

    #[test]
    fn test_different_moves_different_commitments() {
        let secret = Secret::random();
        let rock = MoveCommitment::new(player(1), &secret, Move::Rock);
        let paper = MoveCommitment::new(player(1), &secret, Move::Paper);
        assert_ne!(rock, paper);
    }

    #[test]
    fn test_different_players_different_commitments() {
        let secret = Secret::random();
        let a = MoveCommitment::new(player(1), &secret, Move::Rock);
        let b = MoveCommitment::new(player(2), &secret, Move::Rock);
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_secrets_different_commitments() {
        let a = MoveCommitment::new(player(1), &Secret::random(), Move::Rock);
        let b = MoveCommitment::new(player(1), &Secret::random(), Move::Rock);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_move_fails_verification() {
        let secret = Secret::random();
        let commitment = MoveCommitment::new(player(1), &secret, Move::Rock);
        assert!(!commitment.verify(player(1), &secret, Move::Paper));
    }

    #[test]
    fn test_wrong_player_fails_verification() {
        let secret = Secret::random();
        let commitment = MoveCommitment::new(player(1), &secret, Move::Rock);
        assert!(!commitment.verify(player(2), &secret, Move::Rock));
    }

    #[test]
    fn test_hex_round_trip() {
        let commitment = MoveCommitment::new(player(1), &Secret::random(), Move::Scissors);
        let parsed: MoveCommitment = commitment.to_string().parse().unwrap();
        assert_eq!(commitment, parsed);
    }
}
