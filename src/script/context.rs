//! Evaluation context and implicit bindings.

use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, CardId, PlayerId};
use crate::error::ScriptError;

/// The kinds of implicit binding a sub-expression can introduce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Card,
    Player,
}

/// The implicit-binding stacks.
///
/// Entering a sub-expression that introduces an ambient subject (a
/// matcher's `where` clause binds the candidate card and its
/// controller) pushes; leaving pops. Push and pop are strictly nested.
/// Reading an empty stack is a script bug, reported as
/// [`ScriptError::EmptyBindingStack`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    cards: Vec<CardId>,
    players: Vec<PlayerId>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_card(&mut self, card: CardId) {
        self.cards.push(card);
    }

    pub fn pop_card(&mut self) {
        self.cards.pop();
    }

    /// The innermost bound card.
    pub fn current_card(&self) -> Result<CardId, ScriptError> {
        self.cards
            .last()
            .copied()
            .ok_or(ScriptError::EmptyBindingStack(BindingKind::Card))
    }

    pub fn push_player(&mut self, player: PlayerId) {
        self.players.push(player);
    }

    pub fn pop_player(&mut self) {
        self.players.pop();
    }

    /// The innermost bound player.
    pub fn current_player(&self) -> Result<PlayerId, ScriptError> {
        self.players
            .last()
            .copied()
            .ok_or(ScriptError::EmptyBindingStack(BindingKind::Player))
    }
}

/// The tuple every evaluation runs under.
///
/// `player` is whose script is executing; `evaluating_player` is whose
/// knowledge boundary the exhaustive paths respect. They differ when a
/// player examines the legality of an opponent-owned effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptContext {
    /// The card the script is printed on.
    pub card: CardId,
    /// Whose script is executing.
    pub player: PlayerId,
    /// Whose knowledge boundary is respected.
    pub evaluating_player: PlayerId,
    /// The ability instance; variables memoize under it.
    pub ability: AbilityId,
}

impl ScriptContext {
    #[must_use]
    pub fn new(card: CardId, player: PlayerId, ability: AbilityId) -> Self {
        Self {
            card,
            player,
            evaluating_player: player,
            ability,
        }
    }

    /// Evaluate under another player's knowledge boundary.
    #[must_use]
    pub fn seen_by(mut self, viewer: PlayerId) -> Self {
        self.evaluating_player = viewer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_nest() {
        let mut bindings = Bindings::new();
        bindings.push_card(CardId::new(1));
        bindings.push_card(CardId::new(2));
        assert_eq!(bindings.current_card(), Ok(CardId::new(2)));

        bindings.pop_card();
        assert_eq!(bindings.current_card(), Ok(CardId::new(1)));
    }

    #[test]
    fn test_empty_stack_read_is_an_error() {
        let bindings = Bindings::new();
        assert_eq!(
            bindings.current_player(),
            Err(ScriptError::EmptyBindingStack(BindingKind::Player))
        );
    }
}
