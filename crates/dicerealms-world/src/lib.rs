//! The game world consumed by DiceRealms actions.
//!
//! Two collaborators of the turn pipeline live here:
//!
//! - [`World`]: a directional graph of rooms plus where each participant
//!   stands. The `move` and `look` actions read and mutate it.
//! - [`evaluate`]: the dice-expression evaluator behind the `roll`
//!   action, driven by a pluggable [`DiceRoller`].
//!
//! Neither knows about turns, sessions or the network.

mod dice;
mod error;
mod world;

pub use dice::{
    DiceExpression, DiceRoll, DiceRoller, MAX_DICE_COUNT, RandomRoller,
    ScriptedRoller, evaluate,
};
pub use error::{DiceError, WorldError};
pub use world::{Exit, Move, Room, World, opposite_direction};
