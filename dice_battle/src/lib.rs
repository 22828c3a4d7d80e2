//! # Dice Battle
//!
//! A turn-based, dice-driven battle game between two or more players, each
//! commanding one or more units.
//!
//! Games, players and units are finite state machines that only talk to
//! each other through a publish/subscribe event bus. Game and unit states
//! are closed enums dispatched with `enum_dispatch`; players are driven
//! externally by the game's announcements.
//!
//! ## Turn protocol
//!
//! - **GameStarted**: players join until enough are present
//! - **RoundStarted**: every unit rolls for speed; a speed tie rerolls the round
//! - **StepStarted**: the fastest remaining unit attacks, the others defend
//! - **Stepped**: the step is resolved; the caller starts the next one
//! - **Finished**: one player is left standing, or the round limit is reached
//!
//! ## Example
//!
//! ```
//! use dice_battle::{GameSettings, ScriptedDice, Session, UnitSpec};
//!
//! let mut session = Session::new(GameSettings::default()).unwrap();
//! session.add_player("alice", vec![UnitSpec::new("knight", 3, 3)]).unwrap();
//! session.add_player("bob", vec![UnitSpec::new("archer", 2, 4)]).unwrap();
//!
//! // players join as soon as the game opens, and the first round starts
//! let game = session.open_game(ScriptedDice::new([6, 2, 5, 1])).unwrap();
//! assert_eq!(session.game(game).unwrap().round(), 1);
//! ```

/// Core battle logic, entities, and state machines.
pub mod game;
pub use game::{
    AttackOutcome, BattleError, BattleResult, Dice, Event, EventBus, EventKind, Game, GameId,
    GameSettings, GameState, LogTelemetry, NullTelemetry, ObserverId, Payload, Player, PlayerId,
    PlayerState, Precondition, RandomDice, RollPurpose, ScriptedDice, Sender, Session, Stat,
    Subscriber, Telemetry, Unit, UnitId, UnitSpec, UnitState, constants,
};
