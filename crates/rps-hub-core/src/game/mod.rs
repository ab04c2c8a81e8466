//! Game definitions: moves, winner computation, and the instance state
//! machine.

mod instance;
mod moves;

pub use instance::{GameInstance, GameSnapshot};
pub use moves::{judge, Move, Outcome};
