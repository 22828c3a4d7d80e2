//! Subscriber registry for event delivery.
//!
//! The bus only records who listens to what. Delivery needs mutable access
//! to every entity, so [`Session::notify`](super::Session::notify) walks a
//! [`EventBus::snapshot`] and dispatches each subscriber itself. Taking the
//! snapshot up front means that subscribing or unsubscribing from inside a
//! delivery only affects later notifications.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{
    entities::{GameId, PlayerId, UnitId},
    event::EventKind,
};

/// Handle to a closure registered with
/// [`Session::register_observer`](super::Session::register_observer).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ObserverId(pub(crate) usize);

/// Something that can be notified of events.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Subscriber {
    Game(GameId),
    Player(PlayerId),
    Unit(UnitId),
    Observer(ObserverId),
}

impl From<ObserverId> for Subscriber {
    fn from(value: ObserverId) -> Self {
        Self::Observer(value)
    }
}

/// Ordered subscriber lists per event kind.
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<Subscriber>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for `kind`. Returns `false` if it already was.
    pub fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) -> bool {
        let listeners = self.listeners.entry(kind).or_default();
        if listeners.contains(&subscriber) {
            return false;
        }
        listeners.push(subscriber);
        true
    }

    /// Remove `subscriber` from `kind`. Returns `false` if it wasn't there.
    pub fn unsubscribe(&mut self, kind: EventKind, subscriber: Subscriber) -> bool {
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return false;
        };
        match listeners.iter().position(|s| *s == subscriber) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_subscribed(&self, kind: EventKind, subscriber: Subscriber) -> bool {
        self.listeners(kind).contains(&subscriber)
    }

    /// Subscribers for `kind` in subscription order.
    #[must_use]
    pub fn listeners(&self, kind: EventKind) -> &[Subscriber] {
        self.listeners
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Copy of the subscribers for `kind`, for one delivery pass.
    #[must_use]
    pub fn snapshot(&self, kind: EventKind) -> Vec<Subscriber> {
        self.listeners(kind).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut bus = EventBus::new();
        let unit = Subscriber::Unit(UnitId(0));

        assert!(bus.subscribe(EventKind::StateChanged, unit));
        assert!(!bus.subscribe(EventKind::StateChanged, unit));
        assert_eq!(bus.listeners(EventKind::StateChanged), &[unit]);
    }

    #[test]
    fn test_same_subscriber_on_different_kinds() {
        let mut bus = EventBus::new();
        let unit = Subscriber::Unit(UnitId(0));

        bus.subscribe(EventKind::StateChanged, unit);
        bus.subscribe(EventKind::RoundStarted, unit);
        assert!(bus.is_subscribed(EventKind::StateChanged, unit));
        assert!(bus.is_subscribed(EventKind::RoundStarted, unit));
    }

    #[test]
    fn test_subscription_order_is_kept() {
        let mut bus = EventBus::new();
        let subscribers = [
            Subscriber::Unit(UnitId(0)),
            Subscriber::Player(PlayerId(0)),
            Subscriber::Unit(UnitId(1)),
            Subscriber::Player(PlayerId(1)),
        ];
        for subscriber in subscribers {
            bus.subscribe(EventKind::StateChanged, subscriber);
        }
        assert_eq!(bus.snapshot(EventKind::StateChanged), subscribers);
    }

    #[test]
    fn test_unsubscribe_removes_exact_match() {
        let mut bus = EventBus::new();
        let first = Subscriber::Player(PlayerId(0));
        let second = Subscriber::Player(PlayerId(1));
        bus.subscribe(EventKind::StateChanged, first);
        bus.subscribe(EventKind::StateChanged, second);

        assert!(bus.unsubscribe(EventKind::StateChanged, first));
        assert_eq!(bus.listeners(EventKind::StateChanged), &[second]);
        assert!(!bus.unsubscribe(EventKind::StateChanged, first));
    }

    #[test]
    fn test_unknown_kind_has_no_listeners() {
        let mut bus = EventBus::new();
        assert!(bus.listeners(EventKind::GameOver).is_empty());
        assert!(!bus.unsubscribe(EventKind::GameOver, Subscriber::Game(GameId(0))));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::DiceRolled, Subscriber::Game(GameId(0)));
        let snapshot = bus.snapshot(EventKind::DiceRolled);
        bus.subscribe(EventKind::DiceRolled, Subscriber::Observer(ObserverId(0)));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(bus.listeners(EventKind::DiceRolled).len(), 2);
    }
}
