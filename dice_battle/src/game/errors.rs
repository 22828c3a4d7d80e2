//! Error types for rejected game actions.
//!
//! None of these are fatal: an action that fails leaves every entity exactly
//! as it was, and the caller may reissue it once the precondition holds.

use log::Level;
use thiserror::Error;

use super::entities::Stat;

/// Result type for game operations
pub type BattleResult<T> = Result<T, BattleError>;

/// Conditions that must hold before an action can run.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Precondition {
    #[error("need {required}+ players, {joined} joined")]
    NotEnoughPlayers { required: usize, joined: usize },
    #[error("{pending} unit(s) haven't rolled speed")]
    SpeedUnset { pending: usize },
    #[error("{stat} is already at its floor")]
    LastStatStanding { stat: Stat },
    #[error("no active unit")]
    NoActiveUnit,
    #[error("no unit to target")]
    NoTarget,
    #[error("not part of a game")]
    NotJoined,
}

/// Errors reported when an entity rejects an action.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BattleError {
    /// The entity's current state doesn't implement the action.
    #[error("{entity}: can't {action} while {state}")]
    InvalidAction {
        entity: String,
        action: &'static str,
        state: &'static str,
    },

    #[error("precondition not met: {0}")]
    PreconditionNotMet(#[from] Precondition),

    #[error("invalid argument to {action}: {reason}")]
    InvalidArgument {
        action: &'static str,
        reason: String,
    },

    #[error("{0} already registered")]
    DuplicateRegistration(String),

    /// A handle that doesn't belong to this session.
    #[error("unknown {0}")]
    UnknownEntity(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl BattleError {
    /// Log level a report of this error deserves.
    ///
    /// Unset speeds are expected while a round's rolls are still coming in,
    /// so they're only worth a debug line.
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::PreconditionNotMet(Precondition::SpeedUnset { .. }) => Level::Debug,
            Self::PreconditionNotMet(_) | Self::DuplicateRegistration(_) => Level::Warn,
            Self::InvalidAction { .. }
            | Self::InvalidArgument { .. }
            | Self::UnknownEntity(_)
            | Self::InvalidSettings(_) => Level::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_action_message_names_entity_action_and_state() {
        let err = BattleError::InvalidAction {
            entity: "knight".to_string(),
            action: "roll_speed",
            state: "Idle",
        };
        assert_eq!(err.to_string(), "knight: can't roll_speed while Idle");
    }

    #[test]
    fn test_precondition_converts_into_battle_error() {
        let err: BattleError = Precondition::NotEnoughPlayers {
            required: 2,
            joined: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "precondition not met: need 2+ players, 1 joined"
        );
    }

    #[test]
    fn test_levels() {
        assert_eq!(
            BattleError::DuplicateRegistration("alice".to_string()).level(),
            Level::Warn
        );
        assert_eq!(
            BattleError::from(Precondition::SpeedUnset { pending: 1 }).level(),
            Level::Debug
        );
        assert_eq!(
            BattleError::from(Precondition::LastStatStanding { stat: Stat::Attack }).level(),
            Level::Warn
        );
        assert_eq!(
            BattleError::InvalidArgument {
                action: "take_damage",
                reason: "speed can't be damaged".to_string(),
            }
            .level(),
            Level::Error
        );
    }
}
