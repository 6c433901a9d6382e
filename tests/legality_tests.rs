//! Legality search integration tests.
//!
//! The "choose one of two, then the chosen card's owner needs a free
//! field slot" scenario, through the public search API.

use std::sync::Arc;

use ccg_rules::{
    AbilityId, AstNode, Card, CardId, CardType, CountSpec, GameState, OwnerScope, PlayerId,
    ScriptContext, ScriptValue, ZoneKind, ZonePosition, can_succeed, search,
};
use rustc_hash::FxHashMap;

fn setup() -> (GameState, ScriptContext) {
    let mut game = GameState::new(2, 3);
    for i in 0..14u32 {
        let owner = PlayerId::new(if i < 7 { 0 } else { 1 });
        game.add_card(Card::new(
            CardId::new(i),
            owner,
            CardType::Unit,
            FxHashMap::default(),
        ));
    }
    // One candidate in each hand.
    game.move_card(CardId::new(1), PlayerId::new(0), ZoneKind::Hand, ZonePosition::Top);
    game.move_card(CardId::new(8), PlayerId::new(1), ZoneKind::Hand, ZonePosition::Top);
    let ctx = ScriptContext::new(CardId::new(0), PlayerId::new(0), AbilityId::new(1));
    (game, ctx)
}

fn fill_field(game: &mut GameState, owner: u8, cards: &[u32]) {
    for &i in cards {
        game.move_card(
            CardId::new(i),
            PlayerId::new(owner),
            ZoneKind::Field,
            ZonePosition::Top,
        );
    }
}

fn choose_one() -> Arc<AstNode> {
    Arc::new(AstNode::CardMatch {
        owner: OwnerScope::Any,
        zones: vec![ZoneKind::Hand],
        filters: vec![],
        count: CountSpec::Exactly(1),
    })
}

fn chosen_owner_has_slot(game: &GameState, value: &ScriptValue) -> bool {
    value
        .card_ids()
        .first()
        .and_then(|id| game.card(*id))
        .is_some_and(|card| game.free_field_slots(card.owner) > 0)
}

#[test]
fn test_valid_iff_some_choice_leaves_a_free_slot() {
    // Player 1's field is full, player 0's is open: choosing player
    // 0's card satisfies the predicate.
    let (mut game, ctx) = setup();
    fill_field(&mut game, 1, &[9, 10, 11, 12, 13]);
    assert!(can_succeed(&mut game, ctx, choose_one(), chosen_owner_has_slot).unwrap());

    // Both fields full: no choice works.
    let (mut game, ctx) = setup();
    fill_field(&mut game, 0, &[2, 3, 4, 5, 6]);
    fill_field(&mut game, 1, &[9, 10, 11, 12, 13]);
    assert!(!can_succeed(&mut game, ctx, choose_one(), chosen_owner_has_slot).unwrap());
}

#[test]
fn test_tree_records_which_branches_worked() {
    let (mut game, ctx) = setup();
    fill_field(&mut game, 1, &[9, 10, 11, 12, 13]);

    let tree = search(&mut game, ctx, choose_one(), chosen_owner_has_slot).unwrap();

    assert!(tree.is_valid());
    let children = &tree.get(tree.root()).children;
    assert_eq!(children.len(), 2);
    let valid_count = children.iter().filter(|&&c| tree.get(c).valid).count();
    assert_eq!(valid_count, 1);
}

#[test]
fn test_speculative_execution_leaves_no_trace() {
    let (mut game, ctx) = setup();

    // A cost that really executes in each branch: destroy any one of
    // my field units.
    fill_field(&mut game, 0, &[2, 3]);
    let before = game.clone();
    let snapshot_fields: Vec<CardId> = game.zones.list(PlayerId::new(0), ZoneKind::Field).to_vec();
    let destroy_one = Arc::new(
        AstNode::call(
            ccg_rules::FunctionKind::Destroy,
            vec![Arc::new(AstNode::CardMatch {
                owner: OwnerScope::Mine,
                zones: vec![ZoneKind::Field],
                filters: vec![],
                count: CountSpec::Exactly(1),
            })],
            false,
        )
        .unwrap(),
    );

    let valid = can_succeed(&mut game, ctx, destroy_one, |_, value| !value.is_empty()).unwrap();

    assert!(valid);
    assert_eq!(
        game.zones.list(PlayerId::new(0), ZoneKind::Field),
        &snapshot_fields
    );
    assert!(game.zones.is_empty(PlayerId::new(0), ZoneKind::Discard));
    assert_eq!(
        game.zones.list(PlayerId::new(0), ZoneKind::Deck),
        before.zones.list(PlayerId::new(0), ZoneKind::Deck)
    );
}
