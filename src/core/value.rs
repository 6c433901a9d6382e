//! Script values.
//!
//! Everything a script expression produces is a [`ScriptValue`]: a
//! tagged, ordered list of typed items, or a per-player split when the
//! computation legitimately differs by player (a "both players" effect
//! draws different cards for each side).
//!
//! Consumers branch on [`ValueKind`] to decide cardinality and shape.
//! They never branch on a Rust type; the tag is part of the scripting
//! language's contract.

use serde::{Deserialize, Serialize};

use super::card::{CardId, CardType};
use super::player::PlayerId;
use super::zone::ZoneKind;
use crate::error::ScriptError;

/// The shape tag of a script value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Bool,
    CardSet,
    PlayerSet,
    ZoneSet,
    TypeSet,
}

/// A single typed item inside a script value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptItem {
    Number(i64),
    Bool(bool),
    Card(CardId),
    Player(PlayerId),
    Zone(ZoneKind),
    CardType(CardType),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Payload {
    /// A plain ordered list.
    List(Vec<ScriptItem>),
    /// A per-player split, in resolution order (turn player first).
    PerPlayer(Vec<(PlayerId, Vec<ScriptItem>)>),
}

/// A typed, possibly per-player-split value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptValue {
    kind: ValueKind,
    payload: Payload,
}

impl ScriptValue {
    /// A number value.
    #[must_use]
    pub fn number(n: i64) -> Self {
        Self {
            kind: ValueKind::Number,
            payload: Payload::List(vec![ScriptItem::Number(n)]),
        }
    }

    /// A boolean value.
    #[must_use]
    pub fn boolean(b: bool) -> Self {
        Self {
            kind: ValueKind::Bool,
            payload: Payload::List(vec![ScriptItem::Bool(b)]),
        }
    }

    /// A card set, in the given order.
    #[must_use]
    pub fn cards(cards: impl IntoIterator<Item = CardId>) -> Self {
        Self {
            kind: ValueKind::CardSet,
            payload: Payload::List(cards.into_iter().map(ScriptItem::Card).collect()),
        }
    }

    /// A player set.
    #[must_use]
    pub fn players(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            kind: ValueKind::PlayerSet,
            payload: Payload::List(players.into_iter().map(ScriptItem::Player).collect()),
        }
    }

    /// A single-zone value.
    #[must_use]
    pub fn zone(zone: ZoneKind) -> Self {
        Self {
            kind: ValueKind::ZoneSet,
            payload: Payload::List(vec![ScriptItem::Zone(zone)]),
        }
    }

    /// A single-card-type value.
    #[must_use]
    pub fn card_type(card_type: CardType) -> Self {
        Self {
            kind: ValueKind::TypeSet,
            payload: Payload::List(vec![ScriptItem::CardType(card_type)]),
        }
    }

    /// An empty value of the given kind.
    #[must_use]
    pub fn empty(kind: ValueKind) -> Self {
        Self {
            kind,
            payload: Payload::List(Vec::new()),
        }
    }

    /// A plain value of the given kind from raw items.
    #[must_use]
    pub fn of(kind: ValueKind, items: Vec<ScriptItem>) -> Self {
        Self {
            kind,
            payload: Payload::List(items),
        }
    }

    /// A per-player split. Parts must be in resolution order (turn
    /// player first); every part shares the same kind.
    #[must_use]
    pub fn per_player(kind: ValueKind, parts: Vec<(PlayerId, Vec<ScriptItem>)>) -> Self {
        Self {
            kind,
            payload: Payload::PerPlayer(parts),
        }
    }

    /// The shape tag.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Is this a per-player split?
    #[must_use]
    pub fn is_split(&self) -> bool {
        matches!(self.payload, Payload::PerPlayer(_))
    }

    /// Resolve the value for one player.
    ///
    /// Plain values resolve to their whole list for every player; a
    /// split resolves to that player's part (empty if absent).
    #[must_use]
    pub fn get(&self, player: PlayerId) -> &[ScriptItem] {
        match &self.payload {
            Payload::List(items) => items,
            Payload::PerPlayer(parts) => parts
                .iter()
                .find(|(p, _)| *p == player)
                .map(|(_, items)| items.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// All items, flattening a per-player split in resolution order.
    #[must_use]
    pub fn items(&self) -> Vec<ScriptItem> {
        match &self.payload {
            Payload::List(items) => items.clone(),
            Payload::PerPlayer(parts) => {
                parts.iter().flat_map(|(_, items)| items.clone()).collect()
            }
        }
    }

    /// All card ids contained in the value, in order.
    #[must_use]
    pub fn card_ids(&self) -> Vec<CardId> {
        self.items()
            .into_iter()
            .filter_map(|item| match item {
                ScriptItem::Card(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Total number of items (a split counts every part).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::List(items) => items.len(),
            Payload::PerPlayer(parts) => parts.iter().map(|(_, items)| items.len()).sum(),
        }
    }

    /// Is the value empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpret as a single number; anything else is a script error.
    pub fn as_number(&self) -> Result<i64, ScriptError> {
        match (&self.payload, self.kind) {
            (Payload::List(items), ValueKind::Number) if items.len() == 1 => match items[0] {
                ScriptItem::Number(n) => Ok(n),
                _ => Err(self.mismatch(ValueKind::Number)),
            },
            _ => Err(self.mismatch(ValueKind::Number)),
        }
    }

    /// Interpret as a single zone; anything else is a script error.
    pub fn as_zone(&self) -> Result<ZoneKind, ScriptError> {
        match &self.payload {
            Payload::List(items) if items.len() == 1 => match items[0] {
                ScriptItem::Zone(z) => Ok(z),
                _ => Err(self.mismatch(ValueKind::ZoneSet)),
            },
            _ => Err(self.mismatch(ValueKind::ZoneSet)),
        }
    }

    /// Interpret as a single player; anything else is a script error.
    pub fn as_player(&self) -> Result<PlayerId, ScriptError> {
        match &self.payload {
            Payload::List(items) if items.len() == 1 => match items[0] {
                ScriptItem::Player(p) => Ok(p),
                _ => Err(self.mismatch(ValueKind::PlayerSet)),
            },
            _ => Err(self.mismatch(ValueKind::PlayerSet)),
        }
    }

    /// Truthiness: a false/zero/empty value is falsy, everything else
    /// is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match &self.payload {
            Payload::List(items) => match items.as_slice() {
                [] => false,
                [ScriptItem::Bool(b)] => *b,
                [ScriptItem::Number(n)] => *n != 0,
                _ => true,
            },
            Payload::PerPlayer(parts) => parts.iter().any(|(_, items)| !items.is_empty()),
        }
    }

    fn mismatch(&self, expected: ValueKind) -> ScriptError {
        ScriptError::TypeMismatch {
            expected,
            found: self.kind,
        }
    }
}
