//! Events exchanged between games, players and units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{GameId, PlayerId, Stat, UnitId};

/// The fixed vocabulary of event kinds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EventKind {
    PlayerJoined,
    DiceRolled,
    StartGame,
    StateChanged,
    RoundStarted,
    StepStarted,
    AttackResolved,
    GameOver,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The entity that produced an event.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Sender {
    Game(GameId),
    Player(PlayerId),
    Unit(UnitId),
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game(id) => id.fmt(f),
            Self::Player(id) => id.fmt(f),
            Self::Unit(id) => id.fmt(f),
        }
    }
}

impl From<GameId> for Sender {
    fn from(value: GameId) -> Self {
        Self::Game(value)
    }
}

impl From<PlayerId> for Sender {
    fn from(value: PlayerId) -> Self {
        Self::Player(value)
    }
}

impl From<UnitId> for Sender {
    fn from(value: UnitId) -> Self {
        Self::Unit(value)
    }
}

/// What a dice roll was for.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollPurpose {
    Speed,
    Attack,
    Defense,
}

/// How an attack played out.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AttackOutcome {
    pub attacker: UnitId,
    pub target: UnitId,
    pub stat: Stat,
    /// Attacker's roll plus attack.
    pub attack_total: u32,
    /// Target's roll plus defense.
    pub defense_total: u32,
    pub hit: bool,
    /// The target's new value for `stat`, if damage landed.
    pub remaining: Option<u32>,
}

/// Data attached to an event.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Payload {
    Roll { purpose: RollPurpose, value: u32 },
    Joined { game: GameId },
    Round(u32),
    Step { index: usize, unit: UnitId },
    Attack(AttackOutcome),
    Skipped,
    Winner(Option<PlayerId>),
}

/// An immutable event envelope.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Event {
    kind: EventKind,
    sender: Sender,
    payload: Option<Payload>,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, sender: impl Into<Sender>) -> Self {
        Self {
            kind,
            sender: sender.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(kind: EventKind, sender: impl Into<Sender>, payload: Payload) -> Self {
        Self {
            kind,
            sender: sender.into(),
            payload: Some(payload),
        }
    }

    #[must_use]
    pub fn state_changed(sender: impl Into<Sender>) -> Self {
        Self::new(EventKind::StateChanged, sender)
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub fn sender(&self) -> Sender {
        self.sender
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.kind, self.sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = Event::state_changed(GameId(0));
        assert_eq!(event.to_string(), "StateChanged from game #0");
        assert_eq!(event.payload(), None);
    }

    #[test]
    fn test_payload_is_kept() {
        let event = Event::with_payload(
            EventKind::DiceRolled,
            UnitId(2),
            Payload::Roll {
                purpose: RollPurpose::Speed,
                value: 4,
            },
        );
        assert_eq!(event.kind(), EventKind::DiceRolled);
        assert_eq!(event.sender(), Sender::Unit(UnitId(2)));
        assert_eq!(
            event.payload(),
            Some(&Payload::Roll {
                purpose: RollPurpose::Speed,
                value: 4
            })
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::with_payload(EventKind::RoundStarted, GameId(1), Payload::Round(3));
        let json = serde_json::to_string(&event).expect("serialize event");
        assert_eq!(
            json,
            r#"{"kind":"RoundStarted","sender":{"Game":1},"payload":{"Round":3}}"#
        );
        let back: Event = serde_json::from_str(&json).expect("deserialize event");
        assert_eq!(back, event);
    }
}
