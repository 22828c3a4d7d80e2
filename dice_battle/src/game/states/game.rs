//! Game lifecycle: setup, rounds, steps within a round, and the finish.
//!
//! ```text
//! GameStarted ──start_round──▶ RoundStarted ──start_step──▶ StepStarted
//!                                 ▲    │ (speed tie: reset_round)  │ step
//!                                 │    └────────◀───────┘          ▼
//!                                 └────── end_round ◀──────── Stepped
//!                                              │          start_step │
//!                                              ▼                     └──▶ StepStarted
//!                                          Finished
//! ```

use enum_dispatch::enum_dispatch;
use log::{debug, info, warn};

use crate::game::{
    entities::{GameId, PlayerId},
    errors::{BattleError, BattleResult, Precondition},
    event::{Event, EventKind, Payload, Sender},
    session::Session,
    state_machine::{Phase, announce, set_state},
    states::UnitState,
};

/// Actions a game understands. Every action defaults to an
/// [`BattleError::InvalidAction`] naming the game and its current state.
#[enum_dispatch]
pub trait GameActions {
    fn name(&self) -> &'static str;

    fn on_enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        announce(session, game);
        Ok(())
    }

    fn on_exit(&self, _session: &mut Session, _game: GameId) -> BattleResult<()> {
        Ok(())
    }

    /// React to an event the game is subscribed to.
    fn handle(&self, _session: &mut Session, _game: GameId, _event: &Event) -> BattleResult<()> {
        Ok(())
    }

    fn add_player(
        &self,
        session: &mut Session,
        game: GameId,
        _player: PlayerId,
    ) -> BattleResult<()> {
        Err(session.refuse(game, "add_player", self.name()))
    }

    fn start_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        Err(session.refuse(game, "start_round", self.name()))
    }

    fn reset_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        Err(session.refuse(game, "reset_round", self.name()))
    }

    fn start_step(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        Err(session.refuse(game, "start_step", self.name()))
    }

    /// Step on if the active unit has finished its attack. Returns whether it did.
    fn waiting_attack(&self, session: &mut Session, game: GameId) -> BattleResult<bool> {
        Err(session.refuse(game, "waiting_attack", self.name()))
    }

    fn step(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        Err(session.refuse(game, "step", self.name()))
    }

    fn end_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        Err(session.refuse(game, "end_round", self.name()))
    }
}

/// Accepting players.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GameStarted;

/// Collecting speed rolls for the round.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundStarted;

/// The active unit's turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StepStarted;

/// The active unit's turn is over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stepped;

/// Terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Finished;

#[enum_dispatch(GameActions)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GameState {
    GameStarted(GameStarted),
    RoundStarted(RoundStarted),
    StepStarted(StepStarted),
    Stepped(Stepped),
    Finished(Finished),
}

impl Phase for GameState {
    type Owner = GameId;

    fn label(&self) -> &'static str {
        self.name()
    }

    fn current(session: &Session, game: GameId) -> BattleResult<Option<Self>> {
        Ok(session.game(game)?.state)
    }

    fn install(session: &mut Session, game: GameId, state: Self) -> BattleResult<()> {
        session.game_mut(game)?.state = Some(state);
        Ok(())
    }

    fn exit(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        self.on_exit(session, game)
    }

    fn enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        self.on_enter(session, game)
    }
}

fn clear_speeds(session: &mut Session, game: GameId) -> BattleResult<()> {
    let units = session.game(game)?.units().to_vec();
    for unit in units {
        session.unit_mut(unit)?.speed = None;
    }
    Ok(())
}

/// Joined players that still have a unit able to fight.
fn standing_players(session: &Session, game: GameId) -> BattleResult<Vec<PlayerId>> {
    let mut standing = Vec::new();
    for &player in session.game(game)?.players() {
        let mut alive = false;
        for &unit in session.player(player)?.units() {
            if !session.unit(unit)?.is_exhausted() {
                alive = true;
                break;
            }
        }
        if alive {
            standing.push(player);
        }
    }
    Ok(standing)
}

impl GameActions for GameStarted {
    fn name(&self) -> &'static str {
        "GameStarted"
    }

    fn on_enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        session.notify(Event::new(EventKind::StartGame, game));
        announce(session, game);
        Ok(())
    }

    fn handle(&self, session: &mut Session, game: GameId, event: &Event) -> BattleResult<()> {
        let (EventKind::PlayerJoined, Sender::Player(player)) = (event.kind(), event.sender())
        else {
            return Ok(());
        };
        let joined = session.game(game)?;
        if !joined.players.contains(&player) {
            return Ok(());
        }
        if joined.players.len() >= joined.settings.min_players {
            self.start_round(session, game)?;
        }
        Ok(())
    }

    fn add_player(
        &self,
        session: &mut Session,
        game: GameId,
        player: PlayerId,
    ) -> BattleResult<()> {
        let joining = session.player(player)?;
        if session.game(game)?.players.contains(&player) {
            return Err(BattleError::DuplicateRegistration(joining.name().to_string()));
        }
        if let Some(other) = joining.game() {
            return Err(BattleError::InvalidArgument {
                action: "add_player",
                reason: format!("{} already plays in {other}", joining.name()),
            });
        }

        let units = joining.units().to_vec();
        for &unit in &units {
            session.unit_mut(unit)?.game = Some(game);
        }
        let joined = session.game_mut(game)?;
        joined.players.push(player);
        joined.units.extend(units);
        debug!("{game}: {} player(s) joined", joined.players.len());
        Ok(())
    }

    fn start_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let starting = session.game_mut(game)?;
        let joined = starting.players.len();
        let required = starting.settings.min_players;
        if joined < required {
            return Err(Precondition::NotEnoughPlayers { required, joined }.into());
        }
        starting.resets = 0;
        set_state(session, game, GameState::RoundStarted(RoundStarted))
    }
}

impl GameActions for RoundStarted {
    fn name(&self) -> &'static str {
        "RoundStarted"
    }

    fn on_enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let started = session.game_mut(game)?;
        started.round += 1;
        started.active_unit_index = None;
        let round = started.round;
        info!("{game}: round {round} started");
        session.notify(Event::with_payload(
            EventKind::RoundStarted,
            game,
            Payload::Round(round),
        ));
        announce(session, game);
        Ok(())
    }

    fn handle(&self, session: &mut Session, game: GameId, event: &Event) -> BattleResult<()> {
        if event.kind() == EventKind::DiceRolled && session.belongs_to(event.sender(), game)? {
            self.start_step(session, game)?;
        }
        Ok(())
    }

    fn reset_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        clear_speeds(session, game)?;
        let resetting = session.game_mut(game)?;
        resetting.round = resetting.round.saturating_sub(1);
        resetting.resets += 1;
        debug!("{game}: speed tie, rerolling (reset {})", resetting.resets);
        set_state(session, game, GameState::RoundStarted(RoundStarted))
    }

    fn start_step(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let stepping = session.game(game)?;
        if stepping.units.is_empty() {
            return Err(Precondition::NoActiveUnit.into());
        }

        let mut order = Vec::with_capacity(stepping.units.len());
        let mut pending = 0;
        for &unit in &stepping.units {
            match session.unit(unit)?.speed() {
                Some(speed) => order.push((unit, speed)),
                None => pending += 1,
            }
        }
        if pending > 0 {
            return Err(Precondition::SpeedUnset { pending }.into());
        }

        // stable, so equal speeds keep join order
        order.sort_by(|a, b| b.1.cmp(&a.1));
        let tied = order.windows(2).any(|pair| pair[0].1 == pair[1].1);
        if tied {
            let (resets, max_resets) = (stepping.resets, stepping.settings.max_round_resets);
            if resets < max_resets {
                return self.reset_round(session, game);
            }
            warn!("{game}: keeping speed tie after {resets} reset(s)");
        }

        let stepping = session.game_mut(game)?;
        stepping.units = order.into_iter().map(|(unit, _)| unit).collect();
        stepping.active_unit_index = Some(0);
        set_state(session, game, GameState::StepStarted(StepStarted))
    }
}

impl GameActions for StepStarted {
    fn name(&self) -> &'static str {
        "StepStarted"
    }

    fn on_enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let started = session.game_mut(game)?;
        started.attack_resolved = false;
        let (Some(index), Some(unit)) = (started.active_unit_index, started.active_unit()) else {
            return Err(Precondition::NoActiveUnit.into());
        };
        session.notify(Event::with_payload(
            EventKind::StepStarted,
            game,
            Payload::Step { index, unit },
        ));
        announce(session, game);
        Ok(())
    }

    fn handle(&self, session: &mut Session, game: GameId, event: &Event) -> BattleResult<()> {
        let (EventKind::AttackResolved, Sender::Unit(unit)) = (event.kind(), event.sender()) else {
            return Ok(());
        };
        let stepping = session.game_mut(game)?;
        if stepping.active_unit() != Some(unit) {
            return Ok(());
        }
        stepping.attack_resolved = true;
        self.waiting_attack(session, game)?;
        Ok(())
    }

    fn waiting_attack(&self, session: &mut Session, game: GameId) -> BattleResult<bool> {
        let stepping = session.game(game)?;
        let unit = stepping.active_unit().ok_or(Precondition::NoActiveUnit)?;
        if !stepping.attack_resolved {
            return Ok(false);
        }
        let active = session.unit(unit)?;
        if matches!(active.state(), Some(UnitState::Attacking(_)))
            || active.rolled_attack().is_some()
        {
            return Ok(false);
        }
        self.step(session, game)?;
        Ok(true)
    }

    fn step(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        set_state(session, game, GameState::Stepped(Stepped))
    }
}

impl GameActions for Stepped {
    fn name(&self) -> &'static str {
        "Stepped"
    }

    fn on_exit(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let stepped = session.game_mut(game)?;
        let len = stepped.units.len();
        stepped.active_unit_index = stepped
            .active_unit_index
            .map(|index| index + 1)
            .filter(|index| *index < len);
        Ok(())
    }

    fn start_step(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let stepped = session.game(game)?;
        let last = stepped
            .active_unit_index
            .is_none_or(|index| index + 1 >= stepped.units.len());
        if last {
            warn!("{game}: last unit has stepped, ending round {}", stepped.round);
            return self.end_round(session, game);
        }
        set_state(session, game, GameState::StepStarted(StepStarted))
    }

    fn end_round(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        clear_speeds(session, game)?;
        let standing = standing_players(session, game)?;
        let ending = session.game_mut(game)?;
        if standing.len() < 2 || ending.settings.is_last_round(ending.round) {
            ending.winner = match standing.as_slice() {
                [winner] => Some(*winner),
                _ => None,
            };
            return set_state(session, game, GameState::Finished(Finished));
        }
        ending.resets = 0;
        set_state(session, game, GameState::RoundStarted(RoundStarted))
    }
}

impl GameActions for Finished {
    fn name(&self) -> &'static str {
        "Finished"
    }

    fn on_enter(&self, session: &mut Session, game: GameId) -> BattleResult<()> {
        let finished = session.game(game)?;
        let winner = finished.winner;
        match winner {
            Some(player) => info!(
                "{game}: {} wins after {} round(s)",
                session.player(player)?.name(),
                finished.round
            ),
            None => info!("{game}: draw after {} round(s)", finished.round),
        }
        session.notify(Event::with_payload(
            EventKind::GameOver,
            game,
            Payload::Winner(winner),
        ));
        announce(session, game);
        Ok(())
    }
}
