//! Game state: players, cards, zones, and rules bookkeeping.
//!
//! `GameState` is the single mutable record everything operates on.
//! Scripts read it, actions mutate it (capturing snapshots for undo),
//! and the legality search mutates and rewinds it speculatively.
//!
//! Players carry the same three value layers as cards
//! (`initial → base → current`, see [`crate::core::card`]); life totals
//! and field slots are ordinary named values.

use im::{HashSet as ImHashSet, Vector};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::statics::StaticAbility;
use crate::timing::{EventCategory, GameEvent};

use super::card::{AbilityId, Card, CardId, ValueModification};
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use super::value::ScriptValue;
use super::zone::{ZoneKind, ZonePosition, ZoneVisibility, Zones};

/// A player's named values, layered like a card's.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerValues {
    /// Starting values. Immutable after setup.
    pub initial: FxHashMap<String, i64>,
    /// Starting values plus the baked modifier stack.
    pub base: FxHashMap<String, i64>,
    /// Base values plus applicable static abilities.
    pub current: FxHashMap<String, i64>,
    /// Baked modifier stack from resolved effects.
    pub modifiers: Vec<ValueModification>,
}

impl PlayerValues {
    /// Get a current value with a default.
    #[must_use]
    pub fn value(&self, key: &str, default: i64) -> i64 {
        self.current.get(key).copied().unwrap_or(default)
    }
}

/// A trigger-ability watch: an ability waiting for a category of event.
///
/// Which abilities watch what is orchestration's business; the rules
/// core only marks satisfaction during a timing's end checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerWatch {
    /// The ability that wants to trigger.
    pub ability: AbilityId,
    /// The event category it waits for.
    pub on: EventCategory,
    /// Set while an unconsumed satisfaction is pending.
    pub satisfied: bool,
}

/// Complete game state.
#[derive(Clone, Debug)]
pub struct GameState {
    player_count: usize,

    /// Per-player values (life, field slots, ...).
    pub players: PlayerMap<PlayerValues>,

    /// All zones of all players.
    pub zones: Zones,

    /// Card records by ID.
    cards: FxHashMap<CardId, Card>,

    /// Deterministic RNG for shuffles.
    pub rng: GameRng,

    /// Global timing step counter. Incremented when a timing runs,
    /// rolled back when it is fully cancelled or undone.
    pub timing_index: u64,

    /// Whose turn it is. Both-players effects resolve this seat first.
    pub turn_player: PlayerId,

    /// Registered static abilities.
    pub statics: Vec<StaticAbility>,

    /// Registered trigger watches.
    pub triggers: Vec<TriggerWatch>,

    /// Script variables, memoized per owning ability instance.
    vars: FxHashMap<(AbilityId, String), ScriptValue>,

    /// Event log, in emission order.
    pub events: Vector<GameEvent>,

    /// Cards revealed to everyone regardless of zone visibility.
    pub revealed: ImHashSet<CardId>,

    next_action_serial: u64,
}

impl GameState {
    /// Default number of field slots when a player sets no override.
    pub const DEFAULT_FIELD_SLOTS: i64 = 5;

    /// Create a state with empty zones and no cards.
    #[must_use]
    pub fn new(player_count: usize, seed: u64) -> Self {
        Self {
            player_count,
            players: PlayerMap::with_default(player_count),
            zones: Zones::new(player_count),
            cards: FxHashMap::default(),
            rng: GameRng::new(seed),
            timing_index: 0,
            turn_player: PlayerId::new(0),
            statics: Vec::new(),
            triggers: Vec::new(),
            vars: FxHashMap::default(),
            events: Vector::new(),
            revealed: ImHashSet::new(),
            next_action_serial: 0,
        }
    }

    /// Get player count.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// All players starting with the turn player, in seat order.
    pub fn turn_order(&self) -> impl Iterator<Item = PlayerId> + '_ {
        let start = self.turn_player.index();
        (0..self.player_count).map(move |i| PlayerId::new(((start + i) % self.player_count) as u8))
    }

    /// Every player except the given one, in turn order.
    pub fn opponents_of(&self, player: PlayerId) -> impl Iterator<Item = PlayerId> + '_ {
        self.turn_order().filter(move |p| *p != player)
    }

    /// Set a player's starting value, mirroring it into base and current.
    pub fn set_player_initial(&mut self, player: PlayerId, key: impl Into<String>, value: i64) {
        let key = key.into();
        let values = &mut self.players[player];
        values.initial.insert(key.clone(), value);
        values.base.insert(key.clone(), value);
        values.current.insert(key, value);
    }

    // === Cards ===

    /// Register a card and place it in its recorded zone.
    pub fn add_card(&mut self, card: Card) {
        self.zones
            .insert(card.zone_owner, card.zone, card.id, ZonePosition::Top);
        self.cards.insert(card.id, card);
    }

    /// Get a card.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Get a mutable card.
    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(&id)
    }

    /// Iterate all card ids.
    pub fn card_ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.cards.keys().copied()
    }

    /// Move a card to a zone, stamping its zone-entry timing index.
    ///
    /// Returns the previous location `(owner, kind, index, entered_at)`
    /// so the caller can snapshot it, or `None` if the card is unknown.
    pub fn move_card(
        &mut self,
        card_id: CardId,
        to_owner: PlayerId,
        to_kind: ZoneKind,
        pos: ZonePosition,
    ) -> Option<(PlayerId, ZoneKind, usize, u64)> {
        let (from_owner, from_kind, prev_entered) = {
            let card = self.cards.get(&card_id)?;
            (card.zone_owner, card.zone, card.entered_zone_at)
        };
        let from_index = self.zones.remove(from_owner, from_kind, card_id)?;
        self.zones.insert(to_owner, to_kind, card_id, pos);

        let timing_index = self.timing_index;
        let card = self.cards.get_mut(&card_id)?;
        card.zone_owner = to_owner;
        card.zone = to_kind;
        card.entered_zone_at = timing_index;

        Some((from_owner, from_kind, from_index, prev_entered))
    }

    /// Put a card back at an exact location. Used by undo.
    pub fn place_card_at(
        &mut self,
        card_id: CardId,
        owner: PlayerId,
        kind: ZoneKind,
        index: usize,
        entered_at: u64,
    ) {
        let (cur_owner, cur_kind) = {
            let card = &self.cards[&card_id];
            (card.zone_owner, card.zone)
        };
        self.zones.remove(cur_owner, cur_kind, card_id);
        self.zones.insert(owner, kind, card_id, ZonePosition::Index(index));

        let card = self.cards.get_mut(&card_id).expect("card exists");
        card.zone_owner = owner;
        card.zone = kind;
        card.entered_zone_at = entered_at;
    }

    /// Free slots on a player's field.
    #[must_use]
    pub fn free_field_slots(&self, player: PlayerId) -> i64 {
        let slots = self.players[player].value("field_slots", Self::DEFAULT_FIELD_SLOTS);
        slots - self.zones.len(player, ZoneKind::Field) as i64
    }

    // === Visibility ===

    /// Can `viewer` see this card where it currently sits?
    ///
    /// A card revealed by an effect stays visible to everyone until the
    /// reveal is undone.
    #[must_use]
    pub fn card_visible_to(&self, card_id: CardId, viewer: PlayerId) -> bool {
        if self.revealed.contains(&card_id) {
            return true;
        }
        let Some(card) = self.card(card_id) else {
            return false;
        };
        match card.zone.visibility() {
            ZoneVisibility::Public => true,
            ZoneVisibility::OwnerOnly => card.zone_owner == viewer,
            ZoneVisibility::Hidden => false,
        }
    }

    // === Script variables ===

    /// Read a memoized script variable.
    #[must_use]
    pub fn var(&self, ability: AbilityId, name: &str) -> Option<&ScriptValue> {
        self.vars.get(&(ability, name.to_string()))
    }

    /// Memoize a script variable on its owning ability instance.
    pub fn set_var(&mut self, ability: AbilityId, name: impl Into<String>, value: ScriptValue) {
        self.vars.insert((ability, name.into()), value);
    }

    /// Forget a memoized variable. The legality search uses this to
    /// retract assignments made along a speculative branch.
    pub fn clear_var(&mut self, ability: AbilityId, name: &str) {
        self.vars.remove(&(ability, name.to_string()));
    }

    /// Keys of every memoized variable, in no particular order.
    #[must_use]
    pub fn var_keys(&self) -> Vec<(AbilityId, String)> {
        self.vars.keys().cloned().collect()
    }

    // === Bookkeeping ===

    /// Allocate a serial for a new action ID.
    pub fn next_action_serial(&mut self) -> u64 {
        let serial = self.next_action_serial;
        self.next_action_serial += 1;
        serial
    }

    /// Append an event to the log.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::card::CardType;

    fn state_with_card() -> (GameState, CardId) {
        let mut state = GameState::new(2, 42);
        let card = Card::new(
            CardId::new(10),
            PlayerId::new(0),
            CardType::Unit,
            FxHashMap::default(),
        );
        state.add_card(card);
        (state, CardId::new(10))
    }

    #[test]
    fn test_turn_order_starts_with_turn_player() {
        let mut state = GameState::new(3, 1);
        state.turn_player = PlayerId::new(1);

        let order: Vec<_> = state.turn_order().collect();
        assert_eq!(
            order,
            vec![PlayerId::new(1), PlayerId::new(2), PlayerId::new(0)]
        );
    }

    #[test]
    fn test_move_card_returns_previous_location() {
        let (mut state, id) = state_with_card();
        state.timing_index = 4;

        let prev = state
            .move_card(id, PlayerId::new(0), ZoneKind::Field, ZonePosition::Top)
            .unwrap();

        assert_eq!(prev, (PlayerId::new(0), ZoneKind::Deck, 0, 0));
        let card = state.card(id).unwrap();
        assert_eq!(card.zone, ZoneKind::Field);
        assert_eq!(card.entered_zone_at, 4);
    }

    #[test]
    fn test_place_card_at_restores_location() {
        let (mut state, id) = state_with_card();
        state.timing_index = 4;
        state
            .move_card(id, PlayerId::new(0), ZoneKind::Field, ZonePosition::Top)
            .unwrap();

        state.place_card_at(id, PlayerId::new(0), ZoneKind::Deck, 0, 0);

        let card = state.card(id).unwrap();
        assert_eq!(card.zone, ZoneKind::Deck);
        assert_eq!(card.entered_zone_at, 0);
        assert_eq!(state.zones.position_of(PlayerId::new(0), ZoneKind::Deck, id), Some(0));
    }

    #[test]
    fn test_visibility_rules() {
        let (mut state, id) = state_with_card();

        // Deck is hidden from everyone, including the owner.
        assert!(!state.card_visible_to(id, PlayerId::new(0)));

        state
            .move_card(id, PlayerId::new(0), ZoneKind::Hand, ZonePosition::Top)
            .unwrap();
        assert!(state.card_visible_to(id, PlayerId::new(0)));
        assert!(!state.card_visible_to(id, PlayerId::new(1)));

        // A reveal overrides zone visibility.
        state.revealed.insert(id);
        assert!(state.card_visible_to(id, PlayerId::new(1)));
    }

    #[test]
    fn test_free_field_slots_uses_player_value() {
        let (mut state, id) = state_with_card();
        assert_eq!(
            state.free_field_slots(PlayerId::new(0)),
            GameState::DEFAULT_FIELD_SLOTS
        );

        state.set_player_initial(PlayerId::new(0), "field_slots", 1);
        state
            .move_card(id, PlayerId::new(0), ZoneKind::Field, ZonePosition::Top)
            .unwrap();
        assert_eq!(state.free_field_slots(PlayerId::new(0)), 0);
    }

    #[test]
    fn test_vars_memoized_per_ability() {
        let mut state = GameState::new(2, 1);
        let a = AbilityId::new(1);
        let b = AbilityId::new(2);

        state.set_var(a, "x", ScriptValue::number(3));

        assert_eq!(state.var(a, "x"), Some(&ScriptValue::number(3)));
        assert_eq!(state.var(b, "x"), None);
    }
}
