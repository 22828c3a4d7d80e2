//! Game configuration.

use serde::{Deserialize, Serialize};

use super::{
    constants::{DEFAULT_DICE_EDGES, DEFAULT_MAX_ROUND_RESETS, DEFAULT_MAX_ROUNDS, MIN_PLAYERS},
    errors::{BattleError, BattleResult},
};

/// Construction-time settings shared by every game a session opens.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSettings {
    /// Players required before a round can start.
    pub min_players: usize,

    /// Faces on the game's dice.
    pub dice_edges: u32,

    /// Rounds played before the game ends in a draw (`None` = unbounded).
    pub max_rounds: Option<u32>,

    /// Speed-tie rerolls allowed per round (0 = accept ties immediately).
    pub max_round_resets: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(
            MIN_PLAYERS,
            DEFAULT_DICE_EDGES,
            Some(DEFAULT_MAX_ROUNDS),
            DEFAULT_MAX_ROUND_RESETS,
        )
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(
        min_players: usize,
        dice_edges: u32,
        max_rounds: Option<u32>,
        max_round_resets: u32,
    ) -> Self {
        Self {
            min_players,
            dice_edges,
            max_rounds,
            max_round_resets,
        }
    }

    /// Validate settings
    pub fn validate(&self) -> BattleResult<()> {
        if self.min_players < MIN_PLAYERS {
            return Err(BattleError::InvalidSettings(format!(
                "min_players must be at least {MIN_PLAYERS}"
            )));
        }

        if self.dice_edges == 0 {
            return Err(BattleError::InvalidSettings(
                "dice must have at least one edge".to_string(),
            ));
        }

        if self.max_rounds == Some(0) {
            return Err(BattleError::InvalidSettings(
                "max_rounds must be positive when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `round` is the last round these settings allow.
    #[must_use]
    pub fn is_last_round(&self, round: u32) -> bool {
        self.max_rounds.is_some_and(|max| round >= max)
    }
}
