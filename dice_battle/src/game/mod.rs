//! Battle engine: event bus, state machines and the session tying them
//! together.
//!
//! This module provides:
//! - Games, players and units, each driven by its own state machine
//! - A publish/subscribe bus the state machines talk through
//! - Injectable dice and telemetry

pub mod bus;
pub mod config;
pub mod constants;
pub mod dice;
pub mod entities;
pub mod errors;
pub mod event;
pub mod session;
pub mod state_machine;
pub mod states;
pub mod telemetry;

pub use bus::{EventBus, ObserverId, Subscriber};
pub use config::GameSettings;
pub use dice::{Dice, RandomDice, ScriptedDice};
pub use entities::{Game, GameId, Player, PlayerId, Stat, Unit, UnitId, UnitSpec};
pub use errors::{BattleError, BattleResult, Precondition};
pub use event::{AttackOutcome, Event, EventKind, Payload, RollPurpose, Sender};
pub use session::Session;
pub use states::{GameState, PlayerState, UnitState};
pub use telemetry::{LogTelemetry, NullTelemetry, Telemetry};
