//! Static-ability application order.
//!
//! When several value-modifying statics hit the same target in one
//! recalculation pass, they apply in a deterministic order:
//!
//! 1. the target's own abilities (printed on the target card) first;
//! 2. then increasing zone-entry timing index of the source card;
//! 3. abilities tied on (2) split into "same controller as the target"
//!    before "other controller";
//! 4. genuine ties within a bucket are ordered by that bucket's
//!    controlling player.
//!
//! The order is re-derived on every pass; zone membership and timing
//! indices drift, so caching would be wrong.

use crate::core::{CardId, GameState, PlayerId};
use crate::timing::TargetRef;

use super::ability::StaticAbility;

/// Result of ordering one target's applicable statics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderingOutcome {
    /// Fully ordered: indexes into the candidate slice, in application
    /// order.
    Ordered(Vec<usize>),
    /// A bucket needs its controller to pick an order. `bucket` holds
    /// indexes into the candidate slice; `sources` the cards to show.
    NeedsChoice {
        chooser: PlayerId,
        bucket: Vec<usize>,
        sources: Vec<CardId>,
    },
}

/// Order the candidate statics for one target.
///
/// `supplied_orders` is a tape of previously answered tie-break
/// choices, consumed in encounter order; when the tape runs out at a
/// genuine tie, the function stops with `NeedsChoice`.
pub fn order_statics(
    game: &GameState,
    target: TargetRef,
    candidates: &[&StaticAbility],
    supplied_orders: &[Vec<usize>],
    tape_pos: &mut usize,
) -> OrderingOutcome {
    let target_card = match target {
        TargetRef::Card(card) => Some(card),
        TargetRef::Player(_) => None,
    };
    let target_controller = match target {
        TargetRef::Card(card) => game.card(card).map(|c| c.controller),
        TargetRef::Player(player) => Some(player),
    };

    // The target's own abilities come before any external one.
    let (own, external): (Vec<usize>, Vec<usize>) = (0..candidates.len())
        .partition(|&i| target_card == Some(candidates[i].source));

    let mut ordered = Vec::with_capacity(candidates.len());
    for group in [own, external] {
        match order_group(game, candidates, group, target_controller, supplied_orders, tape_pos) {
            OrderingOutcome::Ordered(part) => ordered.extend(part),
            needs => return needs,
        }
    }
    OrderingOutcome::Ordered(ordered)
}

fn order_group(
    game: &GameState,
    candidates: &[&StaticAbility],
    mut group: Vec<usize>,
    target_controller: Option<PlayerId>,
    supplied_orders: &[Vec<usize>],
    tape_pos: &mut usize,
) -> OrderingOutcome {
    let entered_at = |i: usize| {
        game.card(candidates[i].source)
            .map(|c| c.entered_zone_at)
            .unwrap_or(u64::MAX)
    };
    group.sort_by_key(|&i| entered_at(i));

    let mut ordered = Vec::with_capacity(group.len());
    let mut cursor = 0;
    while cursor < group.len() {
        // Slice out one timing-index tie.
        let stamp = entered_at(group[cursor]);
        let mut tie = Vec::new();
        while cursor < group.len() && entered_at(group[cursor]) == stamp {
            tie.push(group[cursor]);
            cursor += 1;
        }
        if tie.len() == 1 {
            ordered.push(tie[0]);
            continue;
        }

        // Same controller as the target before other controllers.
        let (same, other): (Vec<usize>, Vec<usize>) = tie
            .into_iter()
            .partition(|&i| Some(candidates[i].controller) == target_controller);
        for bucket in [same, other] {
            match resolve_bucket(candidates, bucket, supplied_orders, tape_pos) {
                OrderingOutcome::Ordered(part) => ordered.extend(part),
                needs => return needs,
            }
        }
    }
    OrderingOutcome::Ordered(ordered)
}

fn resolve_bucket(
    candidates: &[&StaticAbility],
    bucket: Vec<usize>,
    supplied_orders: &[Vec<usize>],
    tape_pos: &mut usize,
) -> OrderingOutcome {
    if bucket.len() <= 1 {
        return OrderingOutcome::Ordered(bucket);
    }
    if let Some(order) = supplied_orders.get(*tape_pos) {
        *tape_pos += 1;
        let picked = order
            .iter()
            .filter_map(|&pos| bucket.get(pos).copied())
            .collect();
        return OrderingOutcome::Ordered(picked);
    }
    let chooser = candidates[bucket[0]].controller;
    let sources = bucket.iter().map(|&i| candidates[i].source).collect();
    OrderingOutcome::NeedsChoice {
        chooser,
        bucket,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AbilityId, Card, CardType, ValueModification, ValueOp, ZoneKind, ZonePosition};
    use crate::statics::{ControllerScope, StaticKind, StaticTarget};
    use rustc_hash::FxHashMap;

    fn value_static(source: CardId, controller: PlayerId) -> StaticAbility {
        StaticAbility {
            ability: AbilityId::new(source.0),
            source,
            controller,
            kind: StaticKind::ValueModification {
                applies_to: StaticTarget::Cards {
                    card_type: None,
                    controller: ControllerScope::Any,
                },
                modification: ValueModification {
                    key: "attack".to_string(),
                    op: ValueOp::Add(1),
                },
            },
        }
    }

    fn field_card(game: &mut GameState, id: u32, owner: u8, entered_at: u64) -> CardId {
        let card_id = CardId::new(id);
        game.add_card(Card::new(
            card_id,
            PlayerId::new(owner),
            CardType::Unit,
            FxHashMap::default(),
        ));
        game.timing_index = entered_at;
        game.move_card(card_id, PlayerId::new(owner), ZoneKind::Field, ZonePosition::Top);
        card_id
    }

    #[test]
    fn test_own_ability_first() {
        let mut game = GameState::new(2, 1);
        let target = field_card(&mut game, 1, 0, 5);
        let external = field_card(&mut game, 2, 1, 1);

        let own_static = value_static(target, PlayerId::new(0));
        let ext_static = value_static(external, PlayerId::new(1));
        let candidates = [&ext_static, &own_static];

        // The external source entered earlier, but the target's own
        // ability still applies first.
        let outcome = order_statics(&game, TargetRef::Card(target), &candidates, &[], &mut 0);
        assert_eq!(outcome, OrderingOutcome::Ordered(vec![1, 0]));
    }

    #[test]
    fn test_zone_entry_order_breaks_external_ties() {
        let mut game = GameState::new(2, 1);
        let target = field_card(&mut game, 1, 0, 0);
        let early = field_card(&mut game, 2, 1, 1);
        let late = field_card(&mut game, 3, 1, 4);

        let a = value_static(late, PlayerId::new(1));
        let b = value_static(early, PlayerId::new(1));
        let candidates = [&a, &b];

        let outcome = order_statics(&game, TargetRef::Card(target), &candidates, &[], &mut 0);
        assert_eq!(outcome, OrderingOutcome::Ordered(vec![1, 0]));
    }

    #[test]
    fn test_same_controller_before_other_on_timing_tie() {
        let mut game = GameState::new(2, 1);
        let target = field_card(&mut game, 1, 0, 0);
        let own_side = field_card(&mut game, 2, 0, 3);
        let other_side = field_card(&mut game, 3, 1, 3);

        let a = value_static(other_side, PlayerId::new(1));
        let b = value_static(own_side, PlayerId::new(0));
        let candidates = [&a, &b];

        let outcome = order_statics(&game, TargetRef::Card(target), &candidates, &[], &mut 0);
        assert_eq!(outcome, OrderingOutcome::Ordered(vec![1, 0]));
    }

    #[test]
    fn test_genuine_tie_asks_the_bucket_controller() {
        let mut game = GameState::new(2, 1);
        let target = field_card(&mut game, 1, 0, 0);
        let first = field_card(&mut game, 2, 1, 3);
        let second = field_card(&mut game, 3, 1, 3);

        let a = value_static(first, PlayerId::new(1));
        let b = value_static(second, PlayerId::new(1));
        let candidates = [&a, &b];

        let outcome = order_statics(&game, TargetRef::Card(target), &candidates, &[], &mut 0);
        match outcome {
            OrderingOutcome::NeedsChoice {
                chooser, sources, ..
            } => {
                assert_eq!(chooser, PlayerId::new(1));
                assert_eq!(sources, vec![first, second]);
            }
            other => panic!("expected NeedsChoice, got {other:?}"),
        }

        // With an answer on the tape the tie resolves.
        let outcome = order_statics(
            &game,
            TargetRef::Card(target),
            &candidates,
            &[vec![1, 0]],
            &mut 0,
        );
        assert_eq!(outcome, OrderingOutcome::Ordered(vec![1, 0]));
    }
}
