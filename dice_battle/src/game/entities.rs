use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{
    config::GameSettings,
    constants::DAMAGEABLE_STATS,
    dice::Dice,
    errors::{BattleError, BattleResult},
    state_machine::Driver,
    states::{GameState, PlayerState, UnitState},
};

/// Handle to a game owned by a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct GameId(pub(crate) usize);

/// Handle to a player owned by a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(pub(crate) usize);

/// Handle to a unit owned by a session.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct UnitId(pub(crate) usize);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game #{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player #{}", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit #{}", self.0)
    }
}

/// Unit properties that rolls and attacks refer to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Attack,
    Defense,
    Speed,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
            Self::Speed => "speed",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Stat {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attack" => Ok(Self::Attack),
            "defense" => Ok(Self::Defense),
            "speed" => Ok(Self::Speed),
            other => Err(BattleError::InvalidArgument {
                action: "parse stat",
                reason: format!("unknown stat {other:?}"),
            }),
        }
    }
}

/// Blueprint for a unit handed to [`Session::add_player`](super::Session::add_player).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnitSpec {
    pub name: String,
    pub attack: u32,
    pub defense: u32,
}

impl UnitSpec {
    pub fn new(name: &str, attack: u32, defense: u32) -> Self {
        Self {
            name: name.to_string(),
            attack,
            defense,
        }
    }

    pub(crate) fn validate(&self) -> BattleResult<()> {
        if self.attack == 0 || self.defense == 0 {
            return Err(BattleError::InvalidArgument {
                action: "add_player",
                reason: format!("{} needs positive attack and defense", self.name),
            });
        }
        Ok(())
    }
}

/// One combatant.
///
/// A unit belongs to exactly one player for its whole life and to a game
/// once its player joins one. Both are handles, never owned.
#[derive(Debug)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) name: String,
    pub(crate) attack: u32,
    pub(crate) defense: u32,
    /// Unset except between the speed roll and the end of the round.
    pub(crate) speed: Option<u32>,
    pub(crate) player: PlayerId,
    pub(crate) game: Option<GameId>,
    pub(crate) target_unit: Option<UnitId>,
    pub(crate) rolled_attack: Option<u32>,
    pub(crate) rolled_defense: Option<u32>,
    pub(crate) allowed: &'static [Stat],
    pub(crate) state: Option<UnitState>,
}

impl Unit {
    pub(crate) fn new(id: UnitId, player: PlayerId, spec: UnitSpec) -> Self {
        Self {
            id,
            name: spec.name,
            attack: spec.attack,
            defense: spec.defense,
            speed: None,
            player,
            game: None,
            target_unit: None,
            rolled_attack: None,
            rolled_defense: None,
            allowed: &DAMAGEABLE_STATS,
            state: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attack(&self) -> u32 {
        self.attack
    }

    #[must_use]
    pub fn defense(&self) -> u32 {
        self.defense
    }

    #[must_use]
    pub fn speed(&self) -> Option<u32> {
        self.speed
    }

    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    #[must_use]
    pub fn game(&self) -> Option<GameId> {
        self.game
    }

    #[must_use]
    pub fn target_unit(&self) -> Option<UnitId> {
        self.target_unit
    }

    #[must_use]
    pub fn rolled_attack(&self) -> Option<u32> {
        self.rolled_attack
    }

    #[must_use]
    pub fn rolled_defense(&self) -> Option<u32> {
        self.rolled_defense
    }

    /// Stats an attack may reduce.
    #[must_use]
    pub fn allowed(&self) -> &'static [Stat] {
        self.allowed
    }

    #[must_use]
    pub fn state(&self) -> Option<UnitState> {
        self.state
    }

    /// Current value of `stat`; an unset speed reads as 0.
    #[must_use]
    pub fn stat(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Speed => self.speed.unwrap_or(0),
        }
    }

    pub(crate) fn stat_mut(&mut self, stat: Stat) -> Option<&mut u32> {
        match stat {
            Stat::Attack => Some(&mut self.attack),
            Stat::Defense => Some(&mut self.defense),
            Stat::Speed => None,
        }
    }

    /// A unit is exhausted once no allowed stat can be reduced any further.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.allowed.iter().all(|&stat| self.stat(stat) <= 1)
    }
}

/// One participant commanding a fixed, non-empty set of units.
#[derive(Debug)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) units: Vec<UnitId>,
    pub(crate) fsm: Driver<PlayerState>,
    /// Set only after a successful join.
    pub(crate) game: Option<GameId>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: &str, units: Vec<UnitId>) -> Self {
        let mut fsm = Driver::new();
        fsm.set_state(PlayerState::WaitingGame);
        Self {
            id,
            name: name.to_string(),
            units,
            fsm,
            game: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    #[must_use]
    pub fn state(&self) -> Option<PlayerState> {
        self.fsm.active()
    }

    #[must_use]
    pub fn game(&self) -> Option<GameId> {
        self.game
    }
}

/// The authoritative session object for one battle.
#[derive(Debug)]
pub struct Game {
    pub(crate) id: GameId,
    /// Append-only until the first round starts.
    pub(crate) players: Vec<PlayerId>,
    /// Units of joined players, reordered by speed when a step starts.
    pub(crate) units: Vec<UnitId>,
    pub(crate) round: u32,
    /// Always indexes `units` when set.
    pub(crate) active_unit_index: Option<usize>,
    /// Set once the active unit reports its attack resolved.
    pub(crate) attack_resolved: bool,
    /// Speed-tie rerolls made in the current round.
    pub(crate) resets: u32,
    pub(crate) winner: Option<PlayerId>,
    pub(crate) state: Option<GameState>,
    pub(crate) dice: Box<dyn Dice>,
    pub(crate) settings: GameSettings,
}

impl Game {
    pub(crate) fn new(id: GameId, dice: Box<dyn Dice>, settings: GameSettings) -> Self {
        Self {
            id,
            players: Vec::new(),
            units: Vec::new(),
            round: 0,
            active_unit_index: None,
            attack_resolved: false,
            resets: 0,
            winner: None,
            state: None,
            dice,
            settings,
        }
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    #[must_use]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn active_unit_index(&self) -> Option<usize> {
        self.active_unit_index
    }

    /// The unit whose turn it is.
    #[must_use]
    pub fn active_unit(&self) -> Option<UnitId> {
        self.active_unit_index
            .and_then(|index| self.units.get(index).copied())
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    #[must_use]
    pub fn state(&self) -> Option<GameState> {
        self.state
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, Some(GameState::Finished(_)))
    }

    pub(crate) fn roll(&mut self) -> u32 {
        let edges = self.settings.dice_edges;
        self.dice.roll(edges)
    }
}
