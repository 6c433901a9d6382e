//! Zones and card placement.
//!
//! Every player owns one zone of each [`ZoneKind`]. Zones are ordered
//! lists; position matters everywhere (deck order obviously, but field
//! and discard order feed static-ability tiebreaks and replays too).
//!
//! The containers here are deliberately plain: insertion, removal and
//! lookup by position. Zone *semantics* (what moving a card means, what
//! is undoable) live in the action layer.

use serde::{Deserialize, Serialize};

use super::card::CardId;
use super::player::{PlayerId, PlayerMap};

/// The closed set of zone kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Deck,
    Hand,
    Field,
    Discard,
}

impl ZoneKind {
    /// All zone kinds, in a fixed order.
    pub const ALL: [ZoneKind; 4] = [
        ZoneKind::Deck,
        ZoneKind::Hand,
        ZoneKind::Field,
        ZoneKind::Discard,
    ];

    /// Who may see cards in this zone.
    #[must_use]
    pub const fn visibility(self) -> ZoneVisibility {
        match self {
            ZoneKind::Deck => ZoneVisibility::Hidden,
            ZoneKind::Hand => ZoneVisibility::OwnerOnly,
            ZoneKind::Field | ZoneKind::Discard => ZoneVisibility::Public,
        }
    }
}

/// Zone visibility rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneVisibility {
    /// All cards visible to all players.
    Public,
    /// Cards visible only to the zone owner.
    OwnerOnly,
    /// Cards not visible to anyone.
    Hidden,
}

/// Position for inserting a card into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Add to the top (end of the list; decks draw from here).
    Top,
    /// Add to the bottom (start of the list).
    Bottom,
    /// Insert at a specific index (0 = bottom).
    Index(usize),
}

/// One player's four zones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSet {
    deck: Vec<CardId>,
    hand: Vec<CardId>,
    field: Vec<CardId>,
    discard: Vec<CardId>,
}

impl ZoneSet {
    fn list(&self, kind: ZoneKind) -> &Vec<CardId> {
        match kind {
            ZoneKind::Deck => &self.deck,
            ZoneKind::Hand => &self.hand,
            ZoneKind::Field => &self.field,
            ZoneKind::Discard => &self.discard,
        }
    }

    fn list_mut(&mut self, kind: ZoneKind) -> &mut Vec<CardId> {
        match kind {
            ZoneKind::Deck => &mut self.deck,
            ZoneKind::Hand => &mut self.hand,
            ZoneKind::Field => &mut self.field,
            ZoneKind::Discard => &mut self.discard,
        }
    }
}

/// All zones of all players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zones {
    sets: PlayerMap<ZoneSet>,
}

impl Zones {
    /// Create empty zones for `player_count` players.
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        Self {
            sets: PlayerMap::with_default(player_count),
        }
    }

    /// The ordered card list of a zone.
    #[must_use]
    pub fn list(&self, owner: PlayerId, kind: ZoneKind) -> &[CardId] {
        self.sets[owner].list(kind)
    }

    /// Number of cards in a zone.
    #[must_use]
    pub fn len(&self, owner: PlayerId, kind: ZoneKind) -> usize {
        self.sets[owner].list(kind).len()
    }

    /// Is a zone empty?
    #[must_use]
    pub fn is_empty(&self, owner: PlayerId, kind: ZoneKind) -> bool {
        self.sets[owner].list(kind).is_empty()
    }

    /// Insert a card into a zone at the given position.
    pub fn insert(&mut self, owner: PlayerId, kind: ZoneKind, card: CardId, pos: ZonePosition) {
        let list = self.sets[owner].list_mut(kind);
        match pos {
            ZonePosition::Top => list.push(card),
            ZonePosition::Bottom => list.insert(0, card),
            ZonePosition::Index(i) => {
                let i = i.min(list.len());
                list.insert(i, card);
            }
        }
    }

    /// Remove a card from a zone. Returns the index it occupied.
    pub fn remove(&mut self, owner: PlayerId, kind: ZoneKind, card: CardId) -> Option<usize> {
        let list = self.sets[owner].list_mut(kind);
        let index = list.iter().position(|&c| c == card)?;
        list.remove(index);
        Some(index)
    }

    /// Position of a card within a zone, if present.
    #[must_use]
    pub fn position_of(&self, owner: PlayerId, kind: ZoneKind, card: CardId) -> Option<usize> {
        self.sets[owner].list(kind).iter().position(|&c| c == card)
    }

    /// The top card of a zone (the one a deck draws next), if any.
    #[must_use]
    pub fn top(&self, owner: PlayerId, kind: ZoneKind) -> Option<CardId> {
        self.sets[owner].list(kind).last().copied()
    }

    /// Replace a zone's order wholesale. Used by shuffles and by undo.
    pub fn set_order(&mut self, owner: PlayerId, kind: ZoneKind, order: Vec<CardId>) {
        *self.sets[owner].list_mut(kind) = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Zones {
        Zones::new(2)
    }

    #[test]
    fn test_insert_positions() {
        let mut z = zones();
        let p = PlayerId::new(0);

        z.insert(p, ZoneKind::Deck, CardId::new(1), ZonePosition::Top);
        z.insert(p, ZoneKind::Deck, CardId::new(2), ZonePosition::Top);
        z.insert(p, ZoneKind::Deck, CardId::new(3), ZonePosition::Bottom);
        z.insert(p, ZoneKind::Deck, CardId::new(4), ZonePosition::Index(1));

        assert_eq!(
            z.list(p, ZoneKind::Deck),
            &[CardId::new(3), CardId::new(4), CardId::new(1), CardId::new(2)]
        );
        assert_eq!(z.top(p, ZoneKind::Deck), Some(CardId::new(2)));
    }

    #[test]
    fn test_remove_returns_index() {
        let mut z = zones();
        let p = PlayerId::new(1);

        z.insert(p, ZoneKind::Hand, CardId::new(5), ZonePosition::Top);
        z.insert(p, ZoneKind::Hand, CardId::new(6), ZonePosition::Top);

        assert_eq!(z.remove(p, ZoneKind::Hand, CardId::new(5)), Some(0));
        assert_eq!(z.list(p, ZoneKind::Hand), &[CardId::new(6)]);
        assert_eq!(z.remove(p, ZoneKind::Hand, CardId::new(5)), None);
    }

    #[test]
    fn test_visibility() {
        assert_eq!(ZoneKind::Deck.visibility(), ZoneVisibility::Hidden);
        assert_eq!(ZoneKind::Hand.visibility(), ZoneVisibility::OwnerOnly);
        assert_eq!(ZoneKind::Field.visibility(), ZoneVisibility::Public);
        assert_eq!(ZoneKind::Discard.visibility(), ZoneVisibility::Public);
    }

    #[test]
    fn test_set_order() {
        let mut z = zones();
        let p = PlayerId::new(0);

        z.insert(p, ZoneKind::Deck, CardId::new(1), ZonePosition::Top);
        z.insert(p, ZoneKind::Deck, CardId::new(2), ZonePosition::Top);

        z.set_order(p, ZoneKind::Deck, vec![CardId::new(2), CardId::new(1)]);
        assert_eq!(z.top(p, ZoneKind::Deck), Some(CardId::new(1)));
    }
}
