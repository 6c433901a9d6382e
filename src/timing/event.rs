//! Game events.
//!
//! Events are immutable records of what actually happened: at most one
//! per executed action, plus the value-change reports a recalculation
//! pass produces. Presentation, logging and trigger layers consume
//! them; the rules core itself only appends to the log.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{CardId, PlayerId, ZoneKind};

use super::action::TargetRef;

/// Coarse event category, used by trigger watches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Drawn,
    Discarded,
    Destroyed,
    Damage,
    LifeGained,
    Moved,
    Revealed,
    Shuffled,
    ValueChanged,
    PlayerLost,
}

/// Something that happened during a timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player drew cards. One event per draw action; `cards` lists
    /// the cards actually drawn, in draw order.
    CardsDrawn {
        player: PlayerId,
        cards: SmallVec<[CardId; 4]>,
    },

    /// A card was put into a discard pile.
    CardDiscarded {
        card: CardId,
        from_owner: PlayerId,
        from_zone: ZoneKind,
    },

    /// A card was destroyed.
    CardDestroyed { card: CardId },

    /// Damage was dealt to a card or player.
    DamageDealt { target: TargetRef, amount: i64 },

    /// A player gained life.
    LifeGained { player: PlayerId, amount: i64 },

    /// A card changed zones (other than draw/discard/destroy).
    CardMoved {
        card: CardId,
        from_owner: PlayerId,
        from_zone: ZoneKind,
        to_owner: PlayerId,
        to_zone: ZoneKind,
    },

    /// Cards were revealed to all players.
    CardsRevealed { cards: SmallVec<[CardId; 4]> },

    /// A deck was shuffled.
    DeckShuffled { player: PlayerId },

    /// A recalculation changed a visible value.
    ValueChanged {
        target: TargetRef,
        key: String,
        from: i64,
        to: i64,
    },

    /// A player met a loss condition.
    PlayerLost { player: PlayerId },
}

impl GameEvent {
    /// The coarse category of this event.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            GameEvent::CardsDrawn { .. } => EventCategory::Drawn,
            GameEvent::CardDiscarded { .. } => EventCategory::Discarded,
            GameEvent::CardDestroyed { .. } => EventCategory::Destroyed,
            GameEvent::DamageDealt { .. } => EventCategory::Damage,
            GameEvent::LifeGained { .. } => EventCategory::LifeGained,
            GameEvent::CardMoved { .. } => EventCategory::Moved,
            GameEvent::CardsRevealed { .. } => EventCategory::Revealed,
            GameEvent::DeckShuffled { .. } => EventCategory::Shuffled,
            GameEvent::ValueChanged { .. } => EventCategory::ValueChanged,
            GameEvent::PlayerLost { .. } => EventCategory::PlayerLost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category() {
        let event = GameEvent::CardsDrawn {
            player: PlayerId::new(0),
            cards: SmallVec::from_slice(&[CardId::new(1)]),
        };
        assert_eq!(event.category(), EventCategory::Drawn);

        let event = GameEvent::PlayerLost {
            player: PlayerId::new(1),
        };
        assert_eq!(event.category(), EventCategory::PlayerLost);
    }

    #[test]
    fn test_serialization() {
        let event = GameEvent::DamageDealt {
            target: TargetRef::Player(PlayerId::new(1)),
            amount: 3,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
