//! State machine plumbing shared by games, players and units.
//!
//! Two flavours exist:
//!
//! - [`Phase`]: an entity holding one current state with enter/exit hooks.
//!   Transitions go through [`set_state`], which runs the outgoing state's
//!   `exit`, installs the new state, then runs its `enter`. Games and units
//!   work this way.
//! - [`Driver`]: an externally driven holder with no hooks. Its state names a
//!   handler function that the session invokes for each incoming event.
//!   Players work this way, since everything they do is a reaction to the
//!   game's lifecycle.

use log::debug;
use std::fmt;

use super::{
    errors::BattleResult,
    event::{Event, Sender},
    session::Session,
};

/// A state of an entity with enter/exit hooks.
pub trait Phase: Copy + fmt::Debug + Sized {
    /// Handle of the entity this state belongs to.
    type Owner: Copy + Into<Sender>;

    fn label(&self) -> &'static str;

    /// The owner's current state.
    fn current(session: &Session, owner: Self::Owner) -> BattleResult<Option<Self>>;

    fn install(session: &mut Session, owner: Self::Owner, state: Self) -> BattleResult<()>;

    fn exit(&self, session: &mut Session, owner: Self::Owner) -> BattleResult<()>;

    fn enter(&self, session: &mut Session, owner: Self::Owner) -> BattleResult<()>;
}

/// Tell every listener that `owner` changed state.
///
/// This is the default `enter` behaviour; states that extend `enter` call it
/// once they've done their own bookkeeping.
pub fn announce(session: &mut Session, owner: impl Into<Sender>) {
    session.notify(Event::state_changed(owner));
}

/// Move `owner` into `next`.
pub fn set_state<S: Phase>(session: &mut Session, owner: S::Owner, next: S) -> BattleResult<()> {
    let previous = S::current(session, owner)?;
    if let Some(previous) = previous {
        previous.exit(session, owner)?;
    }
    S::install(session, owner, next)?;
    session.record_transition(owner.into(), previous.map(|state| state.label()), next.label());
    next.enter(session, owner)
}

/// Handler bound to a driven state.
pub type Handler<O> = fn(&mut Session, O, &Event) -> BattleResult<()>;

/// A state of an externally driven entity.
pub trait Driven: Copy + fmt::Debug {
    type Owner: Copy;

    fn label(self) -> &'static str;

    fn handler(self) -> Handler<Self::Owner>;
}

/// Holder for a driven entity's state.
#[derive(Clone, Debug)]
pub struct Driver<S> {
    active: Option<S>,
}

impl<S: Driven> Default for Driver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Driven> Driver<S> {
    #[must_use]
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn set_state(&mut self, state: S) {
        debug!("driver set {}", state.label());
        self.active = Some(state);
    }

    #[must_use]
    pub fn active(&self) -> Option<S> {
        self.active
    }

    /// Handler for the active state, if any.
    #[must_use]
    pub fn bound(&self) -> Option<Handler<S::Owner>> {
        self.active.map(S::handler)
    }
}
