//! Static abilities and value recalculation.
//!
//! Recalculation rebuilds every card's and player's values from
//! scratch: `initial`, plus the baked modifier stack, gives `base`;
//! applying every active value-modifying static in the order
//! [`ordering`] derives gives `current`. The pass is deterministic
//! apart from player tie-breaks, which arrive on a supplied-order tape
//! so the whole pass can be replayed after a suspension.

pub mod ability;
pub mod ordering;

pub use ability::{
    ActionMatcher, ActionVerb, ControllerScope, InterceptionEffect, StaticAbility, StaticKind,
    StaticTarget,
};
pub use ordering::{order_statics, OrderingOutcome};

use crate::core::{CardId, GameState, PlayerId, ZoneKind};
use crate::timing::{GameEvent, TargetRef};

/// Result of a recalculation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecalcOutcome {
    /// The pass completed; value changes in deterministic order.
    Done(Vec<GameEvent>),
    /// An ordering tie needs a player's answer before the pass can be
    /// replayed to completion.
    NeedsOrder {
        chooser: PlayerId,
        sources: Vec<CardId>,
    },
}

/// Recalculate every player's and card's values from modifier stacks
/// and active statics.
///
/// `supplied_orders` answers ordering ties in encounter order. With
/// `emit` false the pass still rebuilds values but reports no events
/// (undo uses this).
pub fn recalculate(
    game: &mut GameState,
    supplied_orders: &[Vec<usize>],
    emit: bool,
) -> RecalcOutcome {
    let statics = game.statics.clone();
    let active: Vec<&StaticAbility> = statics.iter().filter(|s| s.is_active(game)).collect();
    let mut tape_pos = 0;
    let mut events = Vec::new();

    // Players first, in seat order.
    for player in PlayerId::all(game.player_count()) {
        let applicable: Vec<&StaticAbility> = active
            .iter()
            .copied()
            .filter(|s| s.applies_to_player(player))
            .collect();
        let order = match order_statics(
            game,
            TargetRef::Player(player),
            &applicable,
            supplied_orders,
            &mut tape_pos,
        ) {
            OrderingOutcome::Ordered(order) => order,
            OrderingOutcome::NeedsChoice {
                chooser, sources, ..
            } => return RecalcOutcome::NeedsOrder { chooser, sources },
        };

        let values = &game.players[player];
        let mut base = values.initial.clone();
        for modification in &values.modifiers {
            modification.apply(&mut base);
        }
        let mut current = base.clone();
        for &i in &order {
            if let StaticKind::ValueModification { modification, .. } = &applicable[i].kind {
                modification.apply(&mut current);
            }
        }

        let old = game.players[player].current.clone();
        if emit {
            diff_values(&old, &current, TargetRef::Player(player), &mut events);
        }
        let values = &mut game.players[player];
        values.base = base;
        values.current = current;
    }

    // Then cards, in zone order per seat.
    let mut card_ids = Vec::new();
    for player in PlayerId::all(game.player_count()) {
        for kind in ZoneKind::ALL {
            card_ids.extend_from_slice(game.zones.list(player, kind));
        }
    }

    for card_id in card_ids {
        let applicable: Vec<&StaticAbility> = active
            .iter()
            .copied()
            .filter(|s| s.applies_to_card(game, card_id))
            .collect();
        let order = match order_statics(
            game,
            TargetRef::Card(card_id),
            &applicable,
            supplied_orders,
            &mut tape_pos,
        ) {
            OrderingOutcome::Ordered(order) => order,
            OrderingOutcome::NeedsChoice {
                chooser, sources, ..
            } => return RecalcOutcome::NeedsOrder { chooser, sources },
        };

        let Some(card) = game.card(card_id) else {
            continue;
        };
        let mut base = card.initial.clone();
        for modification in &card.modifiers {
            modification.apply(&mut base);
        }
        let mut current = base.clone();
        for &i in &order {
            if let StaticKind::ValueModification { modification, .. } = &applicable[i].kind {
                modification.apply(&mut current);
            }
        }

        let old = card.current.clone();
        if emit {
            diff_values(&old, &current, TargetRef::Card(card_id), &mut events);
        }
        if let Some(card) = game.card_mut(card_id) {
            card.base = base;
            card.current = current;
        }
    }

    RecalcOutcome::Done(events)
}

fn diff_values(
    old: &rustc_hash::FxHashMap<String, i64>,
    new: &rustc_hash::FxHashMap<String, i64>,
    target: TargetRef,
    events: &mut Vec<GameEvent>,
) {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        let from = old.get(key).copied().unwrap_or(0);
        let to = new.get(key).copied().unwrap_or(0);
        if from != to {
            events.push(GameEvent::ValueChanged {
                target,
                key: key.clone(),
                from,
                to,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AbilityId, Card, CardType, ValueModification, ValueOp, ZonePosition,
    };
    use rustc_hash::FxHashMap;

    fn unit(game: &mut GameState, id: u32, owner: u8, attack: i64) -> CardId {
        let card_id = CardId::new(id);
        let mut initial = FxHashMap::default();
        initial.insert("attack".to_string(), attack);
        game.add_card(Card::new(
            card_id,
            PlayerId::new(owner),
            CardType::Unit,
            initial,
        ));
        game.move_card(card_id, PlayerId::new(owner), ZoneKind::Field, ZonePosition::Top);
        card_id
    }

    fn attack_buff(source: CardId, controller: PlayerId, delta: i64) -> StaticAbility {
        StaticAbility {
            ability: AbilityId::new(source.0),
            source,
            controller,
            kind: StaticKind::ValueModification {
                applies_to: StaticTarget::Cards {
                    card_type: Some(CardType::Unit),
                    controller: ControllerScope::Any,
                },
                modification: ValueModification {
                    key: "attack".to_string(),
                    op: ValueOp::Add(delta),
                },
            },
        }
    }

    #[test]
    fn test_recalc_applies_baked_modifiers_then_statics() {
        let mut game = GameState::new(2, 1);
        let target = unit(&mut game, 1, 0, 3);
        let source = unit(&mut game, 2, 1, 1);

        game.card_mut(target)
            .unwrap()
            .modifiers
            .push(ValueModification::add("attack", 2));
        game.statics.push(attack_buff(source, PlayerId::new(1), 1));

        let outcome = recalculate(&mut game, &[], true);
        assert!(matches!(outcome, RecalcOutcome::Done(_)));

        let card = game.card(target).unwrap();
        assert_eq!(card.base_value("attack", 0), 5); // 3 printed + 2 baked
        assert_eq!(card.value("attack", 0), 6); // + 1 static
    }

    #[test]
    fn test_recalc_reports_changes_once() {
        let mut game = GameState::new(2, 1);
        let target = unit(&mut game, 1, 0, 3);
        let source = unit(&mut game, 2, 1, 1);
        game.statics.push(attack_buff(source, PlayerId::new(1), 2));

        let RecalcOutcome::Done(events) = recalculate(&mut game, &[], true) else {
            panic!("expected Done");
        };
        assert!(events.contains(&GameEvent::ValueChanged {
            target: TargetRef::Card(target),
            key: "attack".to_string(),
            from: 3,
            to: 5,
        }));

        // A second pass over unchanged state reports nothing.
        let RecalcOutcome::Done(events) = recalculate(&mut game, &[], true) else {
            panic!("expected Done");
        };
        assert!(events.is_empty());
    }

    #[test]
    fn test_recalc_without_emit_is_silent() {
        let mut game = GameState::new(2, 1);
        let source = unit(&mut game, 2, 1, 1);
        unit(&mut game, 1, 0, 3);
        game.statics.push(attack_buff(source, PlayerId::new(1), 2));

        let RecalcOutcome::Done(events) = recalculate(&mut game, &[], false) else {
            panic!("expected Done");
        };
        assert!(events.is_empty());
    }

    #[test]
    fn test_static_stops_applying_when_source_leaves_field() {
        let mut game = GameState::new(2, 1);
        let target = unit(&mut game, 1, 0, 3);
        let source = unit(&mut game, 2, 1, 1);
        game.statics.push(attack_buff(source, PlayerId::new(1), 2));

        recalculate(&mut game, &[], true);
        assert_eq!(game.card(target).unwrap().value("attack", 0), 5);

        game.move_card(source, PlayerId::new(1), ZoneKind::Discard, ZonePosition::Top);
        recalculate(&mut game, &[], true);
        assert_eq!(game.card(target).unwrap().value("attack", 0), 3);
    }
}
