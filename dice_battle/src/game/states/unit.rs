//! Unit lifecycle: idle between turns, rolling speed at the start of a
//! round, then attacking or defending for each step.

use enum_dispatch::enum_dispatch;
use log::debug;

use crate::game::{
    entities::{Stat, UnitId},
    errors::{BattleError, BattleResult, Precondition},
    event::{AttackOutcome, Event, EventKind, Payload, RollPurpose, Sender},
    session::Session,
    state_machine::{Phase, announce, set_state},
    states::GameState,
};

/// Actions a unit understands. Every action defaults to an
/// [`BattleError::InvalidAction`] naming the unit and its current state.
#[enum_dispatch]
pub trait UnitActions {
    fn name(&self) -> &'static str;

    fn on_enter(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        announce(session, unit);
        Ok(())
    }

    fn on_exit(&self, _session: &mut Session, _unit: UnitId) -> BattleResult<()> {
        Ok(())
    }

    /// React to an event the unit is subscribed to.
    fn handle(&self, _session: &mut Session, _unit: UnitId, _event: &Event) -> BattleResult<()> {
        Ok(())
    }

    fn start_round(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        Err(session.refuse(unit, "start_round", self.name()))
    }

    fn roll_speed(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        Err(session.refuse(unit, "roll_speed", self.name()))
    }

    fn roll_attack(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        Err(session.refuse(unit, "roll_attack", self.name()))
    }

    fn roll_defense(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        Err(session.refuse(unit, "roll_defense", self.name()))
    }

    fn attack(
        &self,
        session: &mut Session,
        unit: UnitId,
        _stat: Stat,
    ) -> BattleResult<AttackOutcome> {
        Err(session.refuse(unit, "attack", self.name()))
    }

    fn skip(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        Err(session.refuse(unit, "skip", self.name()))
    }

    fn take_damage(
        &self,
        session: &mut Session,
        unit: UnitId,
        _stat: Stat,
    ) -> BattleResult<u32> {
        Err(session.refuse(unit, "take_damage", self.name()))
    }
}

/// Between turns.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Idle;

/// Waiting for the round's speed roll.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StartRound;

/// The unit's turn: it holds an attack roll and must attack or skip.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Attacking;

/// Another unit's turn: it holds a defense roll and may take damage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Defending;

#[enum_dispatch(UnitActions)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitState {
    Idle(Idle),
    StartRound(StartRound),
    Attacking(Attacking),
    Defending(Defending),
}

impl Phase for UnitState {
    type Owner = UnitId;

    fn label(&self) -> &'static str {
        self.name()
    }

    fn current(session: &Session, unit: UnitId) -> BattleResult<Option<Self>> {
        Ok(session.unit(unit)?.state)
    }

    fn install(session: &mut Session, unit: UnitId, state: Self) -> BattleResult<()> {
        session.unit_mut(unit)?.state = Some(state);
        Ok(())
    }

    fn exit(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        self.on_exit(session, unit)
    }

    fn enter(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        self.on_enter(session, unit)
    }
}

/// A `RoundStarted` milestone from the unit's own game.
fn is_own_round_start(session: &Session, unit: UnitId, event: &Event) -> BattleResult<bool> {
    if event.kind() != EventKind::RoundStarted {
        return Ok(false);
    }
    let Sender::Game(game) = event.sender() else {
        return Ok(false);
    };
    Ok(session.unit(unit)?.game() == Some(game))
}

/// Roll for a step, store the roll and move into `next`.
fn roll_for_step(
    session: &mut Session,
    unit: UnitId,
    purpose: RollPurpose,
    next: UnitState,
) -> BattleResult<u32> {
    let value = session.roll_dice(unit)?;
    let rolled = session.unit_mut(unit)?;
    rolled.speed = Some(value);
    match purpose {
        RollPurpose::Attack => rolled.rolled_attack = Some(value),
        RollPurpose::Defense => rolled.rolled_defense = Some(value),
        RollPurpose::Speed => {}
    }
    set_state(session, unit, next)?;
    session.notify(Event::with_payload(
        EventKind::DiceRolled,
        unit,
        Payload::Roll { purpose, value },
    ));
    Ok(value)
}

/// Close the unit's turn and tell the game.
fn finish_turn(session: &mut Session, unit: UnitId, payload: Payload) -> BattleResult<()> {
    session.unit_mut(unit)?.rolled_attack = None;
    set_state(session, unit, UnitState::Idle(Idle))?;
    session.notify(Event::with_payload(EventKind::AttackResolved, unit, payload));
    Ok(())
}

impl UnitActions for Idle {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn handle(&self, session: &mut Session, unit: UnitId, event: &Event) -> BattleResult<()> {
        if is_own_round_start(session, unit, event)? {
            self.start_round(session, unit)?;
        }
        Ok(())
    }

    fn start_round(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        session.unit_mut(unit)?.speed = None;
        set_state(session, unit, UnitState::StartRound(StartRound))
    }

    fn roll_attack(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        roll_for_step(
            session,
            unit,
            RollPurpose::Attack,
            UnitState::Attacking(Attacking),
        )
    }

    fn roll_defense(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        roll_for_step(
            session,
            unit,
            RollPurpose::Defense,
            UnitState::Defending(Defending),
        )
    }
}

impl UnitActions for StartRound {
    fn name(&self) -> &'static str {
        "StartRound"
    }

    fn handle(&self, session: &mut Session, unit: UnitId, event: &Event) -> BattleResult<()> {
        if is_own_round_start(session, unit, event)? {
            self.start_round(session, unit)?;
        }
        Ok(())
    }

    fn start_round(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        session.unit_mut(unit)?.speed = None;
        Ok(())
    }

    fn roll_speed(&self, session: &mut Session, unit: UnitId) -> BattleResult<u32> {
        let value = session.roll_dice(unit)?;
        session.unit_mut(unit)?.speed = Some(value);
        set_state(session, unit, UnitState::Idle(Idle))?;
        session.notify(Event::with_payload(
            EventKind::DiceRolled,
            unit,
            Payload::Roll {
                purpose: RollPurpose::Speed,
                value,
            },
        ));
        Ok(value)
    }
}

impl UnitActions for Attacking {
    fn name(&self) -> &'static str {
        "Attacking"
    }

    fn attack(
        &self,
        session: &mut Session,
        unit: UnitId,
        stat: Stat,
    ) -> BattleResult<AttackOutcome> {
        let attacker = session.unit(unit)?;
        if !attacker.allowed().contains(&stat) {
            return Err(BattleError::InvalidArgument {
                action: "attack",
                reason: format!("{stat} can't be damaged"),
            });
        }
        let game = attacker.game().ok_or(Precondition::NotJoined)?;
        let target = session
            .game(game)?
            .units()
            .iter()
            .copied()
            .find(|other| *other != unit)
            .ok_or(Precondition::NoTarget)?;

        let attacker = session.unit_mut(unit)?;
        attacker.target_unit = Some(target);
        let attack_total = attacker
            .rolled_attack
            .unwrap_or(0)
            .saturating_add(attacker.attack);
        let defender = session.unit(target)?;
        let defense_total = defender
            .rolled_defense
            .unwrap_or(0)
            .saturating_add(defender.defense);
        let hit = attack_total > defense_total;

        let remaining = if hit {
            let target_state = session.unit_state(target)?;
            match target_state.take_damage(session, target, stat) {
                Ok(value) => Some(value),
                Err(err) => {
                    session.report(&err);
                    None
                }
            }
        } else {
            None
        };
        debug!("{unit} attacks {target} on {stat}: {attack_total} vs {defense_total}");

        let outcome = AttackOutcome {
            attacker: unit,
            target,
            stat,
            attack_total,
            defense_total,
            hit,
            remaining,
        };
        finish_turn(session, unit, Payload::Attack(outcome))?;
        Ok(outcome)
    }

    fn skip(&self, session: &mut Session, unit: UnitId) -> BattleResult<()> {
        finish_turn(session, unit, Payload::Skipped)
    }
}

impl UnitActions for Defending {
    fn name(&self) -> &'static str {
        "Defending"
    }

    /// Stand down once the game moves past the step.
    fn handle(&self, session: &mut Session, unit: UnitId, event: &Event) -> BattleResult<()> {
        let (EventKind::StateChanged, Sender::Game(game)) = (event.kind(), event.sender()) else {
            return Ok(());
        };
        if session.unit(unit)?.game() != Some(game) {
            return Ok(());
        }
        if matches!(session.game_state(game)?, GameState::Stepped(_)) {
            session.unit_mut(unit)?.rolled_defense = None;
            set_state(session, unit, UnitState::Idle(Idle))?;
        }
        Ok(())
    }

    fn take_damage(&self, session: &mut Session, unit: UnitId, stat: Stat) -> BattleResult<u32> {
        let target = session.unit_mut(unit)?;
        if !target.allowed.contains(&stat) {
            return Err(BattleError::InvalidArgument {
                action: "take_damage",
                reason: format!("{stat} can't be damaged"),
            });
        }

        // 1 is the floor for every damageable stat
        if target.stat(stat) <= 1 {
            return Err(Precondition::LastStatStanding { stat }.into());
        }

        let value = target
            .stat_mut(stat)
            .ok_or_else(|| BattleError::InvalidArgument {
                action: "take_damage",
                reason: format!("{stat} can't be damaged"),
            })?;
        *value -= 1;
        Ok(*value)
    }
}
