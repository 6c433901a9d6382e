//! Static abilities.
//!
//! A static ability is a passive, continuously re-applied effect. It
//! comes in two flavors:
//!
//! - **Value modification**: contributes a [`ValueModification`] to
//!   every matching card or player during recalculation. Nothing is
//!   stored on the target; the contribution is recomputed from scratch
//!   each pass.
//! - **Action interception**: watches actions a timing is about to
//!   resolve and cancels or substitutes the ones it matches. Optional
//!   interceptors ask their controller for confirmation first.
//!
//! A static ability applies while its source card is on a field.

use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, CardId, CardType, GameState, PlayerId, ValueModification};
use crate::timing::{ActionKind, GameAction, TargetRef};

/// A controller relation, relative to the static ability's controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerScope {
    Same,
    Other,
    Any,
}

impl ControllerScope {
    fn admits(self, controller: PlayerId, subject: PlayerId) -> bool {
        match self {
            ControllerScope::Same => controller == subject,
            ControllerScope::Other => controller != subject,
            ControllerScope::Any => true,
        }
    }
}

/// What a value-modifying static ability applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticTarget {
    /// Cards on a field, optionally narrowed by type and controller.
    Cards {
        card_type: Option<CardType>,
        controller: ControllerScope,
    },
    /// Players, narrowed by controller relation.
    Players { controller: ControllerScope },
}

/// The action verbs an interceptor can watch for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionVerb {
    Draw,
    Discard,
    Destroy,
    Damage,
    GainLife,
    MoveCard,
    Reveal,
    ShuffleDeck,
}

/// Matches actions an interceptor cares about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMatcher {
    /// The verb to match.
    pub verb: ActionVerb,
    /// Whose things the action must affect, relative to the
    /// interceptor's controller. `None` matches regardless.
    pub affecting: Option<ControllerScope>,
}

impl ActionMatcher {
    /// Does this matcher cover the given pending action?
    #[must_use]
    pub fn matches(&self, controller: PlayerId, action: &GameAction, game: &GameState) -> bool {
        let verb = match &action.kind {
            ActionKind::Draw { .. } => ActionVerb::Draw,
            ActionKind::Discard { .. } => ActionVerb::Discard,
            ActionKind::Destroy { .. } => ActionVerb::Destroy,
            ActionKind::Damage { .. } => ActionVerb::Damage,
            ActionKind::GainLife { .. } => ActionVerb::GainLife,
            ActionKind::MoveCard { .. } => ActionVerb::MoveCard,
            ActionKind::Reveal { .. } => ActionVerb::Reveal,
            ActionKind::ShuffleDeck { .. } => ActionVerb::ShuffleDeck,
        };
        if verb != self.verb {
            return false;
        }

        let Some(scope) = self.affecting else {
            return true;
        };
        match affected_player(&action.kind, game) {
            Some(subject) => scope.admits(controller, subject),
            None => false,
        }
    }
}

/// Whose things an action primarily affects.
fn affected_player(kind: &ActionKind, game: &GameState) -> Option<PlayerId> {
    let card_controller = |card: CardId| game.card(card).map(|c| c.controller);
    match kind {
        ActionKind::Draw { player, .. }
        | ActionKind::GainLife { player,.. }
        | ActionKind::ShuffleDeck { player } => Some(*player),
        ActionKind::Discard { card } | ActionKind::Destroy { card, .. } => card_controller(*card),
        ActionKind::MoveCard { card, .. } => card_controller(*card),
        ActionKind::Damage { target, .. } => match target {
            TargetRef::Player(p) => Some(*p),
            TargetRef::Card(c) => card_controller(*c),
        },
        ActionKind::Reveal { .. } => None,
    }
}

/// What an interceptor does to a matched action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterceptionEffect {
    /// Cancel the action (and anything linked to it).
    Cancel,
    /// Substitute a damage action with one capped at this amount.
    CapDamage(i64),
}

/// The two static-ability flavors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticKind {
    ValueModification {
        applies_to: StaticTarget,
        modification: ValueModification,
    },
    ActionInterception {
        matches: ActionMatcher,
        effect: InterceptionEffect,
        /// Optional interceptors ask their controller for confirmation.
        optional: bool,
    },
}

/// A registered static ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAbility {
    /// Identity of the ability.
    pub ability: AbilityId,
    /// The card the ability is printed on.
    pub source: CardId,
    /// Who controls the ability.
    pub controller: PlayerId,
    /// What it does.
    pub kind: StaticKind,
}

impl StaticAbility {
    /// A static ability applies while its source is on a field.
    #[must_use]
    pub fn is_active(&self, game: &GameState) -> bool {
        game.card(self.source).is_some_and(|c| c.on_field())
    }

    /// Does this (value-modifying) ability apply to the given card?
    #[must_use]
    pub fn applies_to_card(&self, game: &GameState, card: CardId) -> bool {
        let StaticKind::ValueModification { applies_to, .. } = &self.kind else {
            return false;
        };
        let StaticTarget::Cards {
            card_type,
            controller,
        } = applies_to
        else {
            return false;
        };
        let Some(target) = game.card(card) else {
            return false;
        };
        if !target.on_field() {
            return false;
        }
        if card_type.is_some_and(|t| t != target.card_type) {
            return false;
        }
        controller.admits(self.controller, target.controller)
    }

    /// Does this (value-modifying) ability apply to the given player?
    #[must_use]
    pub fn applies_to_player(&self, player: PlayerId) -> bool {
        let StaticKind::ValueModification { applies_to, .. } = &self.kind else {
            return false;
        };
        let StaticTarget::Players { controller } = applies_to else {
            return false;
        };
        controller.admits(self.controller, player)
    }
}
