//! The session: owner of every game, player and unit, and the router that
//! hands events to them.
//!
//! Entities only ever refer to each other through [`GameId`], [`PlayerId`]
//! and [`UnitId`] handles. When an event is published, the session looks up
//! each subscriber by handle, copies out its current state and lets that
//! state react with full mutable access to the session.

use log::{debug, info};
use std::fmt;

use super::{
    bus::{EventBus, ObserverId, Subscriber},
    config::GameSettings,
    dice::Dice,
    entities::{Game, GameId, Player, PlayerId, Stat, Unit, UnitId, UnitSpec},
    errors::{BattleError, BattleResult, Precondition},
    event::{AttackOutcome, Event, EventKind, Sender},
    state_machine::set_state,
    states::{GameActions, GameState, UnitActions, UnitState, game::GameStarted, unit::Idle},
    telemetry::{LogTelemetry, Telemetry},
};

type Observer = Box<dyn FnMut(&mut Session, &Event) -> BattleResult<()>>;

/// Owns a set of games with their players and units, plus the event bus
/// connecting them.
///
/// Every public action reports a failure to the session's [`Telemetry`]
/// before returning it. A failed action changes nothing.
pub struct Session {
    settings: GameSettings,
    games: Vec<Game>,
    players: Vec<Player>,
    units: Vec<Unit>,
    bus: EventBus,
    /// `None` while the observer is running.
    observers: Vec<Option<Observer>>,
    telemetry: Box<dyn Telemetry>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("games", &self.games)
            .field("players", &self.players)
            .field("units", &self.units)
            .field("bus", &self.bus)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::build(GameSettings::default())
    }
}

impl Session {
    /// Create an empty session whose games use `settings`.
    pub fn new(settings: GameSettings) -> BattleResult<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: GameSettings) -> Self {
        Self {
            settings,
            games: Vec::new(),
            players: Vec::new(),
            units: Vec::new(),
            bus: EventBus::new(),
            observers: Vec::new(),
            telemetry: Box::new(LogTelemetry),
        }
    }

    /// Replace the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: impl Telemetry + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Register a player and its units.
    ///
    /// The player starts out waiting for a game and joins the first one that
    /// is accepting players, including one that's already open.
    pub fn add_player(&mut self, name: &str, units: Vec<UnitSpec>) -> BattleResult<PlayerId> {
        let result = self.register_player(name, units);
        self.surface(result)
    }

    fn register_player(&mut self, name: &str, specs: Vec<UnitSpec>) -> BattleResult<PlayerId> {
        if specs.is_empty() {
            return Err(BattleError::InvalidArgument {
                action: "add_player",
                reason: format!("{name} has no units"),
            });
        }
        for spec in &specs {
            spec.validate()?;
        }

        let player = PlayerId(self.players.len());
        let first = self.units.len();
        let units: Vec<UnitId> = (first..first + specs.len()).map(UnitId).collect();
        for (&unit, spec) in units.iter().zip(specs) {
            self.units.push(Unit::new(unit, player, spec));
            set_state(self, unit, UnitState::Idle(Idle))?;
            self.bus.subscribe(EventKind::RoundStarted, Subscriber::Unit(unit));
            self.bus.subscribe(EventKind::StateChanged, Subscriber::Unit(unit));
        }
        info!("{name} registered with {} unit(s)", units.len());
        self.players.push(Player::new(player, name, units));
        self.bus.subscribe(EventKind::StateChanged, Subscriber::Player(player));

        // catch up on games that opened before this player arrived
        for game in 0..self.games.len() {
            if self.player(player)?.game().is_some() {
                break;
            }
            self.deliver(Subscriber::Player(player), &Event::state_changed(GameId(game)));
        }
        Ok(player)
    }

    /// Open a new game rolling `dice`. Waiting players join it straight away.
    pub fn open_game(&mut self, dice: impl Dice + 'static) -> BattleResult<GameId> {
        let game = GameId(self.games.len());
        self.games
            .push(Game::new(game, Box::new(dice), self.settings.clone()));
        for kind in [
            EventKind::PlayerJoined,
            EventKind::DiceRolled,
            EventKind::AttackResolved,
        ] {
            self.bus.subscribe(kind, Subscriber::Game(game));
        }
        info!("{game} opened");
        let result = set_state(self, game, GameState::GameStarted(GameStarted));
        self.surface(result)?;
        Ok(game)
    }

    pub fn game(&self, game: GameId) -> BattleResult<&Game> {
        self.games
            .get(game.0)
            .ok_or_else(|| BattleError::UnknownEntity(game.to_string()))
    }

    pub fn player(&self, player: PlayerId) -> BattleResult<&Player> {
        self.players
            .get(player.0)
            .ok_or_else(|| BattleError::UnknownEntity(player.to_string()))
    }

    pub fn unit(&self, unit: UnitId) -> BattleResult<&Unit> {
        self.units
            .get(unit.0)
            .ok_or_else(|| BattleError::UnknownEntity(unit.to_string()))
    }

    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub(crate) fn game_mut(&mut self, game: GameId) -> BattleResult<&mut Game> {
        self.games
            .get_mut(game.0)
            .ok_or_else(|| BattleError::UnknownEntity(game.to_string()))
    }

    pub(crate) fn player_mut(&mut self, player: PlayerId) -> BattleResult<&mut Player> {
        self.players
            .get_mut(player.0)
            .ok_or_else(|| BattleError::UnknownEntity(player.to_string()))
    }

    pub(crate) fn unit_mut(&mut self, unit: UnitId) -> BattleResult<&mut Unit> {
        self.units
            .get_mut(unit.0)
            .ok_or_else(|| BattleError::UnknownEntity(unit.to_string()))
    }

    pub(crate) fn game_state(&self, game: GameId) -> BattleResult<GameState> {
        self.game(game)?
            .state
            .ok_or_else(|| BattleError::UnknownEntity(format!("{game} (not opened)")))
    }

    pub(crate) fn unit_state(&self, unit: UnitId) -> BattleResult<UnitState> {
        self.unit(unit)?
            .state
            .ok_or_else(|| BattleError::UnknownEntity(format!("{unit} (not registered)")))
    }

    /// Human-readable name for an entity: its own name, or its handle.
    #[must_use]
    pub fn describe(&self, entity: Sender) -> String {
        match entity {
            Sender::Game(game) => game.to_string(),
            Sender::Player(player) => self
                .player(player)
                .map_or_else(|_| player.to_string(), |found| found.name().to_string()),
            Sender::Unit(unit) => self
                .unit(unit)
                .map_or_else(|_| unit.to_string(), |found| found.name().to_string()),
        }
    }

    /// Whether `entity` is, or takes part in, `game`.
    pub(crate) fn belongs_to(&self, entity: Sender, game: GameId) -> BattleResult<bool> {
        Ok(match entity {
            Sender::Game(id) => id == game,
            Sender::Player(player) => self.player(player)?.game() == Some(game),
            Sender::Unit(unit) => self.unit(unit)?.game() == Some(game),
        })
    }

    /// Roll the dice of the game `unit` plays in.
    pub(crate) fn roll_dice(&mut self, unit: UnitId) -> BattleResult<u32> {
        let game = self.unit(unit)?.game().ok_or(Precondition::NotJoined)?;
        Ok(self.game_mut(game)?.roll())
    }

    /// The error for `action` not being available in `state`.
    pub(crate) fn refuse(
        &self,
        entity: impl Into<Sender>,
        action: &'static str,
        state: &'static str,
    ) -> BattleError {
        BattleError::InvalidAction {
            entity: self.describe(entity.into()),
            action,
            state,
        }
    }

    pub(crate) fn report(&mut self, error: &BattleError) {
        self.telemetry.rejected(error);
    }

    pub(crate) fn record_transition(
        &mut self,
        entity: Sender,
        from: Option<&'static str>,
        to: &'static str,
    ) {
        self.telemetry.transition(entity, from, to);
    }

    fn surface<T>(&mut self, result: BattleResult<T>) -> BattleResult<T> {
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn on_game<T>(
        &mut self,
        game: GameId,
        action: impl FnOnce(GameState, &mut Self) -> BattleResult<T>,
    ) -> BattleResult<T> {
        let result = match self.game_state(game) {
            Ok(state) => action(state, self),
            Err(err) => Err(err),
        };
        self.surface(result)
    }

    fn on_unit<T>(
        &mut self,
        unit: UnitId,
        action: impl FnOnce(UnitState, &mut Self) -> BattleResult<T>,
    ) -> BattleResult<T> {
        let result = match self.unit_state(unit) {
            Ok(state) => action(state, self),
            Err(err) => Err(err),
        };
        self.surface(result)
    }

    /// Register `player` with `game` directly, without the player's own
    /// join handshake.
    pub fn add_player_to_game(&mut self, game: GameId, player: PlayerId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.add_player(session, game, player))
    }

    pub fn start_round(&mut self, game: GameId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.start_round(session, game))
    }

    pub fn reset_round(&mut self, game: GameId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.reset_round(session, game))
    }

    /// Start the next step, or end the round after the last one.
    pub fn start_step(&mut self, game: GameId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.start_step(session, game))
    }

    pub fn waiting_attack(&mut self, game: GameId) -> BattleResult<bool> {
        self.on_game(game, |state, session| state.waiting_attack(session, game))
    }

    pub fn step(&mut self, game: GameId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.step(session, game))
    }

    pub fn end_round(&mut self, game: GameId) -> BattleResult<()> {
        self.on_game(game, |state, session| state.end_round(session, game))
    }

    pub fn start_unit_round(&mut self, unit: UnitId) -> BattleResult<()> {
        self.on_unit(unit, |state, session| state.start_round(session, unit))
    }

    pub fn roll_speed(&mut self, unit: UnitId) -> BattleResult<u32> {
        self.on_unit(unit, |state, session| state.roll_speed(session, unit))
    }

    pub fn roll_attack(&mut self, unit: UnitId) -> BattleResult<u32> {
        self.on_unit(unit, |state, session| state.roll_attack(session, unit))
    }

    pub fn roll_defense(&mut self, unit: UnitId) -> BattleResult<u32> {
        self.on_unit(unit, |state, session| state.roll_defense(session, unit))
    }

    /// Attack the first other unit in the game, aiming at `stat`.
    pub fn attack(&mut self, unit: UnitId, stat: Stat) -> BattleResult<AttackOutcome> {
        self.on_unit(unit, |state, session| state.attack(session, unit, stat))
    }

    pub fn skip(&mut self, unit: UnitId) -> BattleResult<()> {
        self.on_unit(unit, |state, session| state.skip(session, unit))
    }

    pub fn take_damage(&mut self, unit: UnitId, stat: Stat) -> BattleResult<u32> {
        self.on_unit(unit, |state, session| state.take_damage(session, unit, stat))
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) -> bool {
        self.bus.subscribe(kind, subscriber)
    }

    pub fn unsubscribe(&mut self, kind: EventKind, subscriber: Subscriber) -> bool {
        self.bus.unsubscribe(kind, subscriber)
    }

    /// Keep `observer` for later subscription. It isn't subscribed to anything yet.
    pub fn register_observer<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&mut Session, &Event) -> BattleResult<()> + 'static,
    {
        let id = ObserverId(self.observers.len());
        self.observers.push(Some(Box::new(observer)));
        id
    }

    /// Register `observer` and subscribe it to `kind`.
    pub fn observe<F>(&mut self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&mut Session, &Event) -> BattleResult<()> + 'static,
    {
        let id = self.register_observer(observer);
        self.bus.subscribe(kind, Subscriber::Observer(id));
        id
    }

    /// Deliver `event` to everyone subscribed to its kind, in order.
    ///
    /// Subscribers registered while this runs only see later events. A
    /// subscriber that fails is reported and the rest still get the event.
    pub fn notify(&mut self, event: Event) {
        debug!("notify {event}");
        for subscriber in self.bus.snapshot(event.kind()) {
            self.deliver(subscriber, &event);
        }
    }

    fn deliver(&mut self, subscriber: Subscriber, event: &Event) {
        self.telemetry.delivered(subscriber, event);
        let result = match subscriber {
            Subscriber::Game(game) => match self.game_state(game) {
                Ok(state) => state.handle(self, game, event),
                Err(err) => Err(err),
            },
            Subscriber::Player(player) => match self.player(player).map(|found| found.fsm.bound()) {
                Ok(Some(handler)) => handler(self, player, event),
                Ok(None) => Ok(()),
                Err(err) => Err(err),
            },
            Subscriber::Unit(unit) => match self.unit_state(unit) {
                Ok(state) => state.handle(self, unit, event),
                Err(err) => Err(err),
            },
            Subscriber::Observer(observer) => self.call_observer(observer, event),
        };
        if let Err(err) = result {
            self.report(&err);
        }
    }

    fn call_observer(&mut self, id: ObserverId, event: &Event) -> BattleResult<()> {
        let Some(slot) = self.observers.get_mut(id.0) else {
            return Err(BattleError::UnknownEntity(format!("observer #{}", id.0)));
        };
        // already running further up the stack
        let Some(mut observer) = slot.take() else {
            return Ok(());
        };
        let result = observer(self, event);
        if let Some(slot) = self.observers.get_mut(id.0) {
            *slot = Some(observer);
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::game::{dice::ScriptedDice, telemetry::NullTelemetry};

    #[derive(Clone, Default)]
    struct Rejections(Rc<RefCell<Vec<BattleError>>>);

    impl Telemetry for Rejections {
        fn rejected(&mut self, error: &BattleError) {
            self.0.borrow_mut().push(error.clone());
        }
    }

    #[test]
    fn test_new_validates_settings() {
        let settings = GameSettings {
            min_players: 1,
            ..GameSettings::default()
        };
        assert!(matches!(
            Session::new(settings),
            Err(BattleError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_player_needs_units() {
        let mut session = Session::default().with_telemetry(NullTelemetry);
        assert!(matches!(
            session.add_player("nobody", Vec::new()),
            Err(BattleError::InvalidArgument { .. })
        ));
        assert!(session.players().is_empty());
    }

    #[test]
    fn test_units_are_registered_idle_and_subscribed() {
        let mut session = Session::default();
        let player = session
            .add_player("alice", vec![UnitSpec::new("knight", 3, 3)])
            .unwrap();
        let unit = session.player(player).unwrap().units()[0];

        assert_eq!(session.unit(unit).unwrap().player(), player);
        assert_eq!(session.unit(unit).unwrap().state(), Some(UnitState::Idle(Idle)));
        assert!(session
            .bus()
            .is_subscribed(EventKind::RoundStarted, Subscriber::Unit(unit)));
        assert!(session
            .bus()
            .is_subscribed(EventKind::StateChanged, Subscriber::Player(player)));
    }

    #[test]
    fn test_unknown_handles_are_rejected() {
        let mut session = Session::default();
        assert_eq!(
            session.start_round(GameId(7)).unwrap_err(),
            BattleError::UnknownEntity("game #7".to_string())
        );
        assert!(session.roll_speed(UnitId(3)).is_err());
        assert!(session.player(PlayerId(0)).is_err());
    }

    #[test]
    fn test_public_failures_reach_telemetry() {
        let rejections = Rejections::default();
        let mut session = Session::default().with_telemetry(rejections.clone());
        let game = session.open_game(ScriptedDice::new([1])).unwrap();

        let _ = session.start_round(game);
        assert_eq!(
            rejections.0.borrow().as_slice(),
            &[BattleError::from(Precondition::NotEnoughPlayers {
                required: 2,
                joined: 0
            })]
        );
    }

    #[test]
    fn test_failing_subscriber_does_not_stop_delivery() {
        let rejections = Rejections::default();
        let mut session = Session::default().with_telemetry(rejections.clone());
        let calls = Rc::new(RefCell::new(0));

        session.observe(EventKind::StartGame, |_, _| {
            Err(BattleError::UnknownEntity("flaky".to_string()))
        });
        let counter = Rc::clone(&calls);
        session.observe(EventKind::StartGame, move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        session.notify(Event::new(EventKind::StartGame, GameId(0)));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(rejections.0.borrow().len(), 1);
    }

    #[test]
    fn test_observer_is_not_reentered_by_its_own_notify() {
        let mut session = Session::default();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        session.observe(EventKind::StartGame, move |session, event| {
            *counter.borrow_mut() += 1;
            session.notify(event.clone());
            Ok(())
        });

        session.notify(Event::new(EventKind::StartGame, GameId(0)));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_describe_prefers_names() {
        let mut session = Session::default();
        let player = session
            .add_player("alice", vec![UnitSpec::new("knight", 3, 3)])
            .unwrap();
        let unit = session.player(player).unwrap().units()[0];
        assert_eq!(session.describe(player.into()), "alice");
        assert_eq!(session.describe(unit.into()), "knight");
        assert_eq!(session.describe(GameId(2).into()), "game #2");
        assert_eq!(session.describe(UnitId(9).into()), "unit #9");
    }
}
