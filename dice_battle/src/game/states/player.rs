//! Player lifecycle. Players never act on their own: each state binds a
//! handler that reacts to the game's announcements.

use log::info;

use crate::game::{
    entities::{GameId, PlayerId},
    errors::BattleResult,
    event::{Event, EventKind, Payload, RollPurpose, Sender},
    session::Session,
    state_machine::{Driven, Handler},
    states::{GameActions, GameState, UnitActions},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerState {
    /// Not part of a game yet.
    WaitingGame,
    /// Joined; follows the game's rounds and steps.
    Idle,
}

impl Driven for PlayerState {
    type Owner = PlayerId;

    fn label(self) -> &'static str {
        match self {
            Self::WaitingGame => "WaitingGame",
            Self::Idle => "Idle",
        }
    }

    fn handler(self) -> Handler<PlayerId> {
        match self {
            Self::WaitingGame => waiting_game,
            Self::Idle => idle,
        }
    }
}

/// The game behind a `StateChanged` event, if that's what `event` is.
fn announcing_game(event: &Event) -> Option<GameId> {
    match (event.kind(), event.sender()) {
        (EventKind::StateChanged, Sender::Game(game)) => Some(game),
        _ => None,
    }
}

/// Join the first game that announces it's accepting players.
fn waiting_game(session: &mut Session, player: PlayerId, event: &Event) -> BattleResult<()> {
    let Some(game) = announcing_game(event) else {
        return Ok(());
    };
    let state = session.game_state(game)?;
    if !matches!(state, GameState::GameStarted(_)) {
        return Ok(());
    }

    state.add_player(session, game, player)?;
    let joined = session.player_mut(player)?;
    joined.game = Some(game);
    joined.fsm.set_state(PlayerState::Idle);
    info!("{} joined {game}", joined.name);
    session.record_transition(
        player.into(),
        Some(PlayerState::WaitingGame.label()),
        PlayerState::Idle.label(),
    );
    session.notify(Event::with_payload(
        EventKind::PlayerJoined,
        player,
        Payload::Joined { game },
    ));
    Ok(())
}

/// Drive the player's units through the game's rounds and steps.
fn idle(session: &mut Session, player: PlayerId, event: &Event) -> BattleResult<()> {
    let Some(game) = announcing_game(event) else {
        return Ok(());
    };
    if session.player(player)?.game() != Some(game) {
        return Ok(());
    }
    let units = session.player(player)?.units().to_vec();

    match session.game_state(game)? {
        GameState::RoundStarted(_) => {
            for unit in units {
                session.unit_state(unit)?.start_round(session, unit)?;
                let value = session.unit_state(unit)?.roll_speed(session, unit)?;
                session.notify(Event::with_payload(
                    EventKind::DiceRolled,
                    player,
                    Payload::Roll {
                        purpose: RollPurpose::Speed,
                        value,
                    },
                ));
            }
        }
        GameState::StepStarted(_) => {
            let active = session.game(game)?.active_unit();
            for unit in units {
                let state = session.unit_state(unit)?;
                if active == Some(unit) {
                    state.roll_attack(session, unit)?;
                } else {
                    state.roll_defense(session, unit)?;
                }
            }
        }
        GameState::GameStarted(_) | GameState::Stepped(_) | GameState::Finished(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        config::GameSettings,
        dice::ScriptedDice,
        entities::UnitSpec,
        session::fixtures::record,
        states::{
            UnitState,
            unit::{Attacking, Defending},
        },
    };

    #[test]
    fn test_waiting_player_joins_open_game() {
        let mut session = Session::new(GameSettings::default()).unwrap();
        let alice = session
            .add_player("alice", vec![UnitSpec::new("knight", 3, 3)])
            .unwrap();
        let joined = record(&mut session, EventKind::PlayerJoined);

        let game = session.open_game(ScriptedDice::new([4])).unwrap();

        let player = session.player(alice).unwrap();
        assert_eq!(player.state(), Some(PlayerState::Idle));
        assert_eq!(player.game(), Some(game));
        assert_eq!(session.game(game).unwrap().players(), &[alice]);
        let joined = joined.borrow();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].sender(), Sender::Player(alice));
        assert_eq!(joined[0].payload(), Some(&Payload::Joined { game }));
    }

    #[test]
    fn test_player_added_after_game_opened_still_joins() {
        let mut session = Session::new(GameSettings::default()).unwrap();
        let game = session.open_game(ScriptedDice::new([4])).unwrap();
        let bob = session
            .add_player("bob", vec![UnitSpec::new("archer", 2, 2)])
            .unwrap();
        assert_eq!(session.player(bob).unwrap().game(), Some(game));
    }

    #[test]
    fn test_waiting_player_ignores_other_senders() {
        let mut session = Session::new(GameSettings::default()).unwrap();
        let alice = session
            .add_player("alice", vec![UnitSpec::new("knight", 3, 3)])
            .unwrap();
        let unit = session.player(alice).unwrap().units()[0];
        session.notify(Event::state_changed(unit));
        assert_eq!(
            session.player(alice).unwrap().state(),
            Some(PlayerState::WaitingGame)
        );
    }

    #[test]
    fn test_joined_players_roll_speed_for_every_unit() {
        // distinct speeds so the round goes straight to its first step
        let mut session = Session::new(GameSettings::default()).unwrap();
        let alice = session
            .add_player(
                "alice",
                vec![UnitSpec::new("knight", 3, 3), UnitSpec::new("page", 1, 2)],
            )
            .unwrap();
        session
            .add_player("bob", vec![UnitSpec::new("archer", 2, 2)])
            .unwrap();
        let rolls = record(&mut session, EventKind::DiceRolled);

        let game = session
            .open_game(ScriptedDice::new([6, 4, 2, 5, 1, 3]))
            .unwrap();

        let speed_rolls_by_alice = rolls
            .borrow()
            .iter()
            .filter(|event| event.sender() == Sender::Player(alice))
            .count();
        assert_eq!(speed_rolls_by_alice, 2);

        let game = session.game(game).unwrap();
        assert!(matches!(game.state(), Some(GameState::StepStarted(_))));
        let active = game.active_unit().unwrap();
        assert_eq!(session.unit(active).unwrap().name(), "knight");
        assert_eq!(
            session.unit(active).unwrap().state(),
            Some(UnitState::Attacking(Attacking))
        );
        for unit in game.units().iter().filter(|unit| **unit != active) {
            assert_eq!(
                session.unit(*unit).unwrap().state(),
                Some(UnitState::Defending(Defending))
            );
        }
    }
}
