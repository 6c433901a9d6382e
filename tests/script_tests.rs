//! Script evaluation integration tests.
//!
//! Drawing and destruction scenarios driven end to end through the
//! evaluator and the timing engine.

use std::sync::Arc;

use ccg_rules::{
    AbilityId, ActionKind, AstNode, Card, CardFilter, CardId, CardType, CountSpec, EngineError,
    EvalStep, Evaluator, FunctionKind, GameState, OwnerScope, PlayerId, ProtocolError,
    ScriptContext, ScriptValue, Timing, TimingStep, ZoneKind, ZonePosition, eval_full,
    has_all_targets,
};
use rustc_hash::FxHashMap;

fn setup(deck_size: u32) -> (GameState, ScriptContext) {
    let mut game = GameState::new(2, 5);
    for i in 0..deck_size {
        game.add_card(Card::new(
            CardId::new(i),
            PlayerId::new(0),
            CardType::Unit,
            FxHashMap::default(),
        ));
    }
    let ctx = ScriptContext::new(CardId::new(0), PlayerId::new(0), AbilityId::new(1));
    (game, ctx)
}

/// Drive to completion, executing every action batch, panicking on an
/// input request.
fn drive(game: &mut GameState, eval: &mut Evaluator) -> ScriptValue {
    let mut step = eval.step(game).unwrap();
    loop {
        match step {
            EvalStep::Done(value) => return value,
            EvalStep::NeedsActions(actions) => {
                let mut timing = Timing::new(actions, false);
                assert_eq!(timing.run(game).unwrap(), TimingStep::Done);
                step = eval.resume_timing(game, &timing).unwrap();
            }
            EvalStep::NeedsInput(request) => panic!("unexpected request: {request:?}"),
        }
    }
}

fn draw(amount: i64) -> Arc<AstNode> {
    Arc::new(
        AstNode::call(
            FunctionKind::Draw,
            vec![Arc::new(AstNode::Number(amount))],
            false,
        )
        .unwrap(),
    )
}

#[test]
fn test_draw_two_from_two_card_deck_empties_it() {
    let (mut game, ctx) = setup(2);
    let mut eval = Evaluator::new(ctx, draw(2));

    let value = drive(&mut game, &mut eval);

    assert_eq!(value.card_ids().len(), 2);
    assert!(game.zones.is_empty(PlayerId::new(0), ZoneKind::Deck));
    assert_eq!(game.zones.len(PlayerId::new(0), ZoneKind::Hand), 2);
}

#[test]
fn test_draw_three_from_two_card_deck_is_impossible_and_draws_nothing() {
    let (mut game, ctx) = setup(2);

    // The excess draw is impossible as an action.
    let action = ccg_rules::GameAction::new(
        &mut game,
        ActionKind::Draw {
            player: PlayerId::new(0),
            amount: 3,
            as_many_as_possible: false,
        },
        0,
    );
    assert!(action.is_impossible(&game));

    // Absent "as many as possible", nothing is drawn.
    let mut eval = Evaluator::new(ctx, draw(3));
    let value = drive(&mut game, &mut eval);

    assert!(value.is_empty());
    assert_eq!(game.zones.len(PlayerId::new(0), ZoneKind::Deck), 2);
    assert_eq!(game.zones.len(PlayerId::new(0), ZoneKind::Hand), 0);
}

#[test]
fn test_draw_up_to_takes_what_is_there() {
    let (mut game, ctx) = setup(2);
    let tree = Arc::new(
        AstNode::call(
            FunctionKind::DrawUpTo,
            vec![Arc::new(AstNode::Number(3))],
            false,
        )
        .unwrap(),
    );
    let mut eval = Evaluator::new(ctx, tree);

    let value = drive(&mut game, &mut eval);

    assert_eq!(value.card_ids().len(), 2);
    assert!(game.zones.is_empty(PlayerId::new(0), ZoneKind::Deck));
}

#[test]
fn test_destroy_matcher_produces_linked_discard_destroy_pair() {
    let (mut game, ctx) = setup(3);
    let unit = CardId::new(1);
    game.move_card(unit, PlayerId::new(0), ZoneKind::Field, ZonePosition::Top);

    let tree = Arc::new(
        AstNode::call(
            FunctionKind::Destroy,
            vec![Arc::new(AstNode::CardMatch {
                owner: OwnerScope::Any,
                zones: vec![ZoneKind::Field],
                filters: vec![CardFilter::OfType(CardType::Unit)],
                count: CountSpec::All,
            })],
            false,
        )
        .unwrap(),
    );
    let mut eval = Evaluator::new(ctx, tree);

    let EvalStep::NeedsActions(actions) = eval.step(&mut game).unwrap() else {
        panic!("expected actions");
    };
    assert_eq!(actions.len(), 2);
    assert!(matches!(actions[0].kind, ActionKind::Discard { card } if card == unit));
    let ActionKind::Destroy { card, backing } = &actions[1].kind else {
        panic!("expected a destroy");
    };
    assert_eq!(*card, unit);
    assert_eq!(*backing, Some(actions[0].id));

    let mut timing = Timing::new(actions, false);
    assert_eq!(timing.run(&mut game).unwrap(), TimingStep::Done);
    let value = match eval.resume_timing(&mut game, &timing).unwrap() {
        EvalStep::Done(value) => value,
        other => panic!("expected completion, got {other:?}"),
    };

    assert_eq!(value, ScriptValue::cards([unit]));
    assert_eq!(game.card(unit).unwrap().zone, ZoneKind::Discard);
}

#[test]
fn test_eval_full_is_deterministic_without_randomness() {
    let (mut game, ctx) = setup(4);
    for i in [1u32, 2] {
        game.move_card(CardId::new(i), PlayerId::new(0), ZoneKind::Field, ZonePosition::Top);
    }
    let tree = Arc::new(AstNode::CardMatch {
        owner: OwnerScope::Mine,
        zones: vec![ZoneKind::Field],
        filters: vec![],
        count: CountSpec::Exactly(1),
    });

    let first = eval_full(&game, ctx, Arc::clone(&tree)).unwrap();
    let second = eval_full(&game, ctx, tree).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_has_all_targets_tracks_eval_full() {
    let (mut game, ctx) = setup(4);
    let tree = Arc::new(AstNode::CardMatch {
        owner: OwnerScope::Mine,
        zones: vec![ZoneKind::Field],
        filters: vec![],
        count: CountSpec::Exactly(1),
    });

    // No outcome has a non-empty selection, so the pre-check is false.
    assert!(!has_all_targets(&game, ctx, &tree).unwrap());
    let outcomes = eval_full(&game, ctx, Arc::clone(&tree)).unwrap();
    assert!(outcomes.iter().all(ScriptValue::is_empty));

    game.move_card(CardId::new(1), PlayerId::new(0), ZoneKind::Field, ZonePosition::Top);
    assert!(has_all_targets(&game, ctx, &tree).unwrap());
    let outcomes = eval_full(&game, ctx, tree).unwrap();
    assert!(outcomes.iter().any(|v| !v.is_empty()));
}

#[test]
fn test_count_over_matcher() {
    let (mut game, ctx) = setup(4);
    for i in [1u32, 2, 3] {
        game.move_card(CardId::new(i), PlayerId::new(0), ZoneKind::Field, ZonePosition::Top);
    }
    let tree = Arc::new(
        AstNode::call(
            FunctionKind::Count,
            vec![Arc::new(AstNode::CardMatch {
                owner: OwnerScope::Mine,
                zones: vec![ZoneKind::Field],
                filters: vec![],
                count: CountSpec::All,
            })],
            false,
        )
        .unwrap(),
    );
    let mut eval = Evaluator::new(ctx, tree);

    assert_eq!(drive(&mut game, &mut eval), ScriptValue::number(3));

    // A finished machine refuses to run again.
    assert!(matches!(
        eval.step(&mut game),
        Err(EngineError::Protocol(ProtocolError::AlreadyFinished))
    ));
}

#[test]
fn test_wrong_arity_rejected_at_build() {
    assert!(AstNode::call(FunctionKind::Draw, vec![], false).is_err());
    assert!(
        AstNode::call(FunctionKind::Damage, vec![Arc::new(AstNode::Number(1))], false).is_err()
    );
}
