//! Actions: single reversible game-state mutations.
//!
//! A [`GameAction`] is the unit a [`Timing`](super::Timing) executes.
//! It answers legality questions (`is_impossible`, `is_fully_possible`)
//! without touching anything, executes by capturing immutable snapshots
//! of the state it changes, and undoes by replaying those snapshots in
//! reverse. Once executed it holds no live references into the state.
//!
//! Actions never run themselves; a timing owns them, cancels the
//! impossible ones, groups them by cost index, and executes the
//! survivors in order.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{
    CardId, GameState, PlayerId, ValueModification, ZoneKind, ZonePosition,
};

use super::event::GameEvent;

/// Unique identifier for an action within a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

/// A card or a player, as the subject of an action or event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Card(CardId),
    Player(PlayerId),
}

/// What an action does. A closed set; scripts and follow-up rules can
/// produce nothing outside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Draw `amount` cards. Strict draws fail as a whole when the deck
    /// is short; `as_many_as_possible` draws what is there.
    Draw {
        player: PlayerId,
        amount: usize,
        as_many_as_possible: bool,
    },

    /// Put a card into its owner's discard pile.
    Discard { card: CardId },

    /// Destroy a card. When produced by a script this is backed by the
    /// [`ActionKind::Discard`] that performs the move; the two cancel
    /// together.
    Destroy {
        card: CardId,
        backing: Option<ActionId>,
    },

    /// Deal damage to a card or player.
    Damage { target: TargetRef, amount: i64 },

    /// A player gains life.
    GainLife { player: PlayerId, amount: i64 },

    /// Move a card to a zone.
    MoveCard {
        card: CardId,
        to_owner: PlayerId,
        to_zone: ZoneKind,
        position: ZonePosition,
    },

    /// Reveal cards to all players.
    Reveal { cards: SmallVec<[CardId; 4]> },

    /// Shuffle a player's deck.
    ShuffleDeck { player: PlayerId },
}

/// Lifecycle of an action inside its timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Cancelled,
    Executed,
}

/// A snapshot of one primitive state change, replayable backwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum StateDelta {
    CardMoved {
        card: CardId,
        from_owner: PlayerId,
        from_zone: ZoneKind,
        from_index: usize,
        prev_entered_at: u64,
    },
    ModifierPushed {
        target: TargetRef,
    },
    Revealed {
        card: CardId,
    },
    DeckOrder {
        player: PlayerId,
        before: Vec<CardId>,
    },
}

/// A single reversible state mutation with legality predicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    /// Unique ID.
    pub id: ActionId,

    /// What this action does.
    pub kind: ActionKind,

    /// Cost group. Every action sharing an index succeeds or is
    /// cancelled as a unit.
    pub cost_index: usize,

    /// Lifecycle state.
    pub status: ActionStatus,

    /// Snapshots captured at execution, in application order.
    deltas: Vec<StateDelta>,
}

impl GameAction {
    /// Create a pending action, drawing its ID from the game's serial.
    pub fn new(game: &mut GameState, kind: ActionKind, cost_index: usize) -> Self {
        Self {
            id: ActionId(game.next_action_serial()),
            kind,
            cost_index,
            status: ActionStatus::Pending,
            deltas: Vec::new(),
        }
    }

    /// Is this action currently impossible to perform at all?
    ///
    /// Not an error; a timing cancels impossible actions outright.
    #[must_use]
    pub fn is_impossible(&self, game: &GameState) -> bool {
        match &self.kind {
            ActionKind::Draw {
                player,
                amount,
                as_many_as_possible,
            } => {
                if *as_many_as_possible {
                    false
                } else {
                    game.zones.len(*player, ZoneKind::Deck) < *amount
                }
            }
            ActionKind::Discard { card } => match game.card(*card) {
                Some(c) => c.zone == ZoneKind::Discard,
                None => true,
            },
            ActionKind::Destroy { card, backing } => match game.card(*card) {
                Some(c) => backing.is_none() && !c.on_field(),
                None => true,
            },
            ActionKind::Damage { target, amount } => {
                if *amount < 0 {
                    return true;
                }
                match target {
                    TargetRef::Card(card) => !game.card(*card).is_some_and(|c| c.on_field()),
                    TargetRef::Player(_) => false,
                }
            }
            ActionKind::GainLife { amount, .. } => *amount < 0,
            ActionKind::MoveCard {
                card,
                to_owner,
                to_zone,
                ..
            } => {
                if game.card(*card).is_none() {
                    return true;
                }
                *to_zone == ZoneKind::Field && game.free_field_slots(*to_owner) <= 0
            }
            ActionKind::Reveal { cards } => cards.iter().any(|c| game.card(*c).is_none()),
            ActionKind::ShuffleDeck { .. } => false,
        }
    }

    /// Can the action be performed in full, with nothing left short?
    ///
    /// Differs from `!is_impossible` only for partial-capable kinds:
    /// an as-many-as-possible draw is possible with a short deck but
    /// not *fully* possible.
    #[must_use]
    pub fn is_fully_possible(&self, game: &GameState) -> bool {
        if self.is_impossible(game) {
            return false;
        }
        match &self.kind {
            ActionKind::Draw { player, amount, .. } => {
                game.zones.len(*player, ZoneKind::Deck) >= *amount
            }
            _ => true,
        }
    }

    /// Identity comparison: same verb on the same subjects, ignoring
    /// IDs, grouping and lifecycle.
    #[must_use]
    pub fn is_identical_to(&self, other: &GameAction) -> bool {
        match (&self.kind, &other.kind) {
            (ActionKind::Destroy { card: a, .. }, ActionKind::Destroy { card: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }

    /// Mark the action cancelled. Linked cancellation is the timing's
    /// business.
    pub(crate) fn cancel(&mut self) {
        if self.status == ActionStatus::Pending {
            self.status = ActionStatus::Cancelled;
        }
    }

    /// Execute against the game state, capturing undo snapshots.
    ///
    /// Returns the event describing what happened, if anything did.
    /// Callers guarantee the action is pending and not impossible.
    pub(crate) fn execute(&mut self, game: &mut GameState) -> Option<GameEvent> {
        debug_assert_eq!(self.status, ActionStatus::Pending);
        self.status = ActionStatus::Executed;

        match self.kind.clone() {
            ActionKind::Draw {
                player,
                amount,
                as_many_as_possible,
            } => {
                let available = game.zones.len(player, ZoneKind::Deck);
                let count = if as_many_as_possible {
                    amount.min(available)
                } else {
                    amount
                };
                let mut drawn = SmallVec::new();
                for _ in 0..count {
                    let Some(card) = game.zones.top(player, ZoneKind::Deck) else {
                        break;
                    };
                    self.move_and_record(game, card, player, ZoneKind::Hand, ZonePosition::Top);
                    drawn.push(card);
                }
                if drawn.is_empty() {
                    None
                } else {
                    Some(GameEvent::CardsDrawn {
                        player,
                        cards: drawn,
                    })
                }
            }

            ActionKind::Discard { card } => {
                let (from_owner, from_zone, owner) = {
                    let c = game.card(card)?;
                    (c.zone_owner, c.zone, c.owner)
                };
                self.move_and_record(game, card, owner, ZoneKind::Discard, ZonePosition::Top);
                Some(GameEvent::CardDiscarded {
                    card,
                    from_owner,
                    from_zone,
                })
            }

            ActionKind::Destroy { card, .. } => {
                // The backing discard normally performs the move; a
                // standalone destroy does it itself.
                let (on_field, owner) = {
                    let c = game.card(card)?;
                    (c.on_field(), c.owner)
                };
                if on_field {
                    self.move_and_record(game, card, owner, ZoneKind::Discard, ZonePosition::Top);
                }
                Some(GameEvent::CardDestroyed { card })
            }

            ActionKind::Damage { target, amount } => {
                if amount == 0 {
                    return None;
                }
                let key = match target {
                    TargetRef::Card(_) => "health",
                    TargetRef::Player(_) => "life",
                };
                self.push_modifier(game, target, ValueModification::add(key, -amount));
                Some(GameEvent::DamageDealt { target, amount })
            }

            ActionKind::GainLife { player, amount } => {
                if amount == 0 {
                    return None;
                }
                self.push_modifier(
                    game,
                    TargetRef::Player(player),
                    ValueModification::add("life", amount),
                );
                Some(GameEvent::LifeGained { player, amount })
            }

            ActionKind::MoveCard {
                card,
                to_owner,
                to_zone,
                position,
            } => {
                let (from_owner, from_zone) = {
                    let c = game.card(card)?;
                    (c.zone_owner, c.zone)
                };
                self.move_and_record(game, card, to_owner, to_zone, position);
                Some(GameEvent::CardMoved {
                    card,
                    from_owner,
                    from_zone,
                    to_owner,
                    to_zone,
                })
            }

            ActionKind::Reveal { cards } => {
                for &card in &cards {
                    if !game.revealed.contains(&card) {
                        game.revealed.insert(card);
                        self.deltas.push(StateDelta::Revealed { card });
                    }
                }
                if cards.is_empty() {
                    None
                } else {
                    Some(GameEvent::CardsRevealed { cards })
                }
            }

            ActionKind::ShuffleDeck { player } => {
                let before = game.zones.list(player, ZoneKind::Deck).to_vec();
                let mut order = before.clone();
                game.rng.shuffle(&mut order);
                game.zones.set_order(player, ZoneKind::Deck, order);
                self.deltas.push(StateDelta::DeckOrder { player, before });
                Some(GameEvent::DeckShuffled { player })
            }
        }
    }

    /// Reverse every snapshot this action captured, newest first.
    ///
    /// Valid exactly once, immediately after execution; the owning
    /// timing enforces that.
    pub(crate) fn undo(&mut self, game: &mut GameState) {
        debug_assert_eq!(self.status, ActionStatus::Executed);
        for delta in self.deltas.drain(..).rev() {
            match delta {
                StateDelta::CardMoved {
                    card,
                    from_owner,
                    from_zone,
                    from_index,
                    prev_entered_at,
                } => {
                    game.place_card_at(card, from_owner, from_zone, from_index, prev_entered_at);
                }
                StateDelta::ModifierPushed { target } => {
                    if let Some(stack) = modifier_stack_mut(game, target) {
                        stack.pop();
                    }
                }
                StateDelta::Revealed { card } => {
                    game.revealed.remove(&card);
                }
                StateDelta::DeckOrder { player, before } => {
                    game.zones.set_order(player, ZoneKind::Deck, before);
                }
            }
        }
        self.status = ActionStatus::Pending;
    }

    fn move_and_record(
        &mut self,
        game: &mut GameState,
        card: CardId,
        to_owner: PlayerId,
        to_zone: ZoneKind,
        position: ZonePosition,
    ) {
        if let Some((from_owner, from_zone, from_index, prev_entered_at)) =
            game.move_card(card, to_owner, to_zone, position)
        {
            self.deltas.push(StateDelta::CardMoved {
                card,
                from_owner,
                from_zone,
                from_index,
                prev_entered_at,
            });
        }
    }

    fn push_modifier(
        &mut self,
        game: &mut GameState,
        target: TargetRef,
        modification: ValueModification,
    ) {
        if let Some(stack) = modifier_stack_mut(game, target) {
            stack.push(modification);
            self.deltas.push(StateDelta::ModifierPushed { target });
        }
    }
}

fn modifier_stack_mut(
    game: &mut GameState,
    target: TargetRef,
) -> Option<&mut Vec<ValueModification>> {
    match target {
        TargetRef::Card(card) => game.card_mut(card).map(|c| &mut c.modifiers),
        TargetRef::Player(player) => Some(&mut game.players[player].modifiers),
    }
}
