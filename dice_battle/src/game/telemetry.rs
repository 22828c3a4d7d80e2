//! Observation hooks for what a session does.
//!
//! The library never writes to a global sink directly. A session reports
//! transitions, deliveries and rejected actions to its [`Telemetry`], which
//! by default is [`LogTelemetry`].

use log::{debug, log, trace};

use super::{bus::Subscriber, errors::BattleError, event::Event, event::Sender};

/// Receiver for session activity. Every method defaults to doing nothing.
pub trait Telemetry {
    /// `entity` moved from `from` (if it had a state) to `to`.
    fn transition(&mut self, _entity: Sender, _from: Option<&'static str>, _to: &'static str) {}

    /// `event` is about to be handed to `subscriber`.
    fn delivered(&mut self, _subscriber: Subscriber, _event: &Event) {}

    /// An action was rejected.
    fn rejected(&mut self, _error: &BattleError) {}
}

/// Forwards everything to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn transition(&mut self, entity: Sender, from: Option<&'static str>, to: &'static str) {
        match from {
            Some(from) => debug!("{entity}: {from} -> {to}"),
            None => debug!("{entity}: -> {to}"),
        }
    }

    fn delivered(&mut self, subscriber: Subscriber, event: &Event) {
        trace!("deliver {event} to {subscriber:?}");
    }

    fn rejected(&mut self, error: &BattleError) {
        log!(error.level(), "{error}");
    }
}

/// Drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{entities::UnitId, errors::Precondition};

    #[test]
    fn test_log_telemetry_accepts_everything() {
        let mut telemetry = LogTelemetry;
        telemetry.transition(UnitId(0).into(), None, "Idle");
        telemetry.transition(UnitId(0).into(), Some("Idle"), "StartRound");
        telemetry.delivered(
            Subscriber::Unit(UnitId(0)),
            &Event::state_changed(UnitId(0)),
        );
        telemetry.rejected(&Precondition::NoTarget.into());
    }
}
