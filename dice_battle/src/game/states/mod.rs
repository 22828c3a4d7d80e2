//! State definitions for the game, player and unit state machines.

pub mod game;
pub mod player;
pub mod unit;

pub use game::{GameActions, GameState};
pub use player::PlayerState;
pub use unit::{UnitActions, UnitState};
