//! Cryptographic primitives for the commit-reveal protocol.

mod commitment;

pub use commitment::{MoveCommitment, Secret};
