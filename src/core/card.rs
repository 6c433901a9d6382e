//! Cards and their mutable runtime values.
//!
//! A [`Card`] tracks where it is, who owns and controls it, and three
//! layers of named values:
//!
//! - `initial`: the printed values, never mutated after construction.
//! - `base`: `initial` with the card's own baked modifier stack applied.
//! - `current`: `base` with every applicable static ability applied.
//!
//! `base` and `current` are never edited in place by effects. Effects
//! push [`ValueModification`]s; recalculation rebuilds both layers from
//! scratch, which is what makes undo exact.
//!
//! ## Values (i64 only)
//!
//! Values use `FxHashMap<String, i64>`, with booleans as 0/1 and ids as
//! raw integers where needed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use super::zone::ZoneKind;

/// Unique identifier for a card in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Unique identifier for an ability instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

impl AbilityId {
    /// Create a new ability ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// The closed set of card types the rules know about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Unit,
    Spell,
    Equipment,
}

/// How a modification changes a named value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueOp {
    /// Add a delta to the value.
    Add(i64),
    /// Replace the value outright.
    Set(i64),
}

/// A baked, replayable change to one named value.
///
/// Pushed onto a card's or player's modifier stack by executed actions,
/// or contributed transiently by a static ability during recalculation.
/// Replaying the same stack over the same initial values is
/// deterministic and touches nothing but the value being computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueModification {
    /// The value key this modification targets ("attack", "life", ...).
    pub key: String,
    /// The operation to apply.
    pub op: ValueOp,
}

impl ValueModification {
    /// An additive modification.
    #[must_use]
    pub fn add(key: impl Into<String>, delta: i64) -> Self {
        Self {
            key: key.into(),
            op: ValueOp::Add(delta),
        }
    }

    /// Apply this modification to a value map.
    pub fn apply(&self, values: &mut FxHashMap<String, i64>) {
        match self.op {
            ValueOp::Add(delta) => {
                *values.entry(self.key.clone()).or_insert(0) += delta;
            }
            ValueOp::Set(value) => {
                values.insert(self.key.clone(), value);
            }
        }
    }
}

/// A card in a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Unique ID for this card.
    pub id: CardId,

    /// Owner (who started with this card).
    pub owner: PlayerId,

    /// Controller (who currently controls it).
    pub controller: PlayerId,

    /// Card type.
    pub card_type: CardType,

    /// Which player's zone the card currently sits in.
    pub zone_owner: PlayerId,

    /// Which zone kind the card currently sits in.
    pub zone: ZoneKind,

    /// Global timing index at which the card entered its current zone.
    /// Static-ability ordering sorts on this.
    pub entered_zone_at: u64,

    /// Printed values. Immutable after construction.
    pub initial: FxHashMap<String, i64>,

    /// Printed values plus the baked modifier stack. Rebuilt on every
    /// recalculation pass.
    pub base: FxHashMap<String, i64>,

    /// Base values plus applicable static abilities. Rebuilt on every
    /// recalculation pass.
    pub current: FxHashMap<String, i64>,

    /// Baked modifier stack from resolved effects, in application order.
    pub modifiers: Vec<ValueModification>,

    /// Host card, for equipment attached to a unit.
    pub attached_to: Option<CardId>,

    /// Abilities printed on this card.
    pub abilities: Vec<AbilityId>,
}

impl Card {
    /// Create a card in its owner's deck with the given printed values.
    #[must_use]
    pub fn new(
        id: CardId,
        owner: PlayerId,
        card_type: CardType,
        initial: FxHashMap<String, i64>,
    ) -> Self {
        Self {
            id,
            owner,
            controller: owner,
            card_type,
            zone_owner: owner,
            zone: ZoneKind::Deck,
            entered_zone_at: 0,
            base: initial.clone(),
            current: initial.clone(),
            initial,
            modifiers: Vec::new(),
            attached_to: None,
            abilities: Vec::new(),
        }
    }

    /// Get a current value with a default.
    #[must_use]
    pub fn value(&self, key: &str, default: i64) -> i64 {
        self.current.get(key).copied().unwrap_or(default)
    }

    /// Get a base value with a default.
    #[must_use]
    pub fn base_value(&self, key: &str, default: i64) -> i64 {
        self.base.get(key).copied().unwrap_or(default)
    }

    /// Is the card on a field?
    #[must_use]
    pub fn on_field(&self) -> bool {
        self.zone == ZoneKind::Field
    }
}
