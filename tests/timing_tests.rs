//! Timing engine integration tests.
//!
//! Exercise the atomic batch machine through the public API: run,
//! cost grouping, and the run/undo round-trip law.

use ccg_rules::{
    ActionKind, Card, CardId, CardType, EngineError, GameAction, GameState, PlayerId,
    ProtocolError, TargetRef, Timing, TimingStep, ZoneKind, ZonePosition,
};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

fn setup() -> GameState {
    let mut game = GameState::new(2, 77);
    for i in 0..10u32 {
        let owner = PlayerId::new(if i < 5 { 0 } else { 1 });
        let mut initial = FxHashMap::default();
        initial.insert("health".to_string(), 4);
        game.add_card(Card::new(CardId::new(i), owner, CardType::Unit, initial));
    }
    game.set_player_initial(PlayerId::new(0), "life", 20);
    game.set_player_initial(PlayerId::new(1), "life", 20);
    game
}

fn field_unit(game: &mut GameState, id: u32, owner: u8) -> CardId {
    let card = CardId::new(id);
    game.move_card(card, PlayerId::new(owner), ZoneKind::Field, ZonePosition::Top);
    card
}

/// Everything the round-trip law promises to restore.
fn fingerprint(game: &GameState) -> Vec<String> {
    let mut out = Vec::new();
    for player in PlayerId::all(game.player_count()) {
        out.push(format!("{:?}", game.players[player].current));
        for kind in ZoneKind::ALL {
            out.push(format!("{player} {kind:?} {:?}", game.zones.list(player, kind)));
        }
    }
    let mut ids: Vec<CardId> = game.card_ids().collect();
    ids.sort_by_key(|id| id.0);
    for id in ids {
        if let Some(card) = game.card(id) {
            out.push(format!(
                "{id:?} {:?} {:?} {:?} {:?}",
                card.zone, card.current, card.modifiers, card.attached_to
            ));
        }
    }
    out
}

#[test]
fn test_run_then_undo_restores_everything() {
    let mut game = setup();
    let unit = field_unit(&mut game, 1, 0);
    let before = fingerprint(&game);

    let actions = vec![
        GameAction::new(
            &mut game,
            ActionKind::Draw {
                player: PlayerId::new(0),
                amount: 2,
                as_many_as_possible: false,
            },
            0,
        ),
        GameAction::new(
            &mut game,
            ActionKind::Damage {
                target: TargetRef::Card(unit),
                amount: 3,
            },
            1,
        ),
        GameAction::new(
            &mut game,
            ActionKind::GainLife {
                player: PlayerId::new(1),
                amount: 5,
            },
            2,
        ),
    ];
    let mut timing = Timing::new(actions, false);
    assert_eq!(timing.run(&mut game).unwrap(), TimingStep::Done);
    assert!(timing.is_successful());

    // Everything landed before we roll it back.
    assert_eq!(game.zones.len(PlayerId::new(0), ZoneKind::Hand), 2);
    assert_eq!(game.card(unit).unwrap().value("health", 0), 1);
    assert_eq!(game.players[PlayerId::new(1)].value("life", 0), 25);

    timing.undo(&mut game).unwrap();
    assert_eq!(fingerprint(&game), before);
    assert!(game.card(unit).unwrap().modifiers.is_empty());
}

#[test]
fn test_undo_valid_exactly_once() {
    let mut game = setup();
    let unit = field_unit(&mut game, 1, 0);

    let actions = vec![GameAction::new(
        &mut game,
        ActionKind::Damage {
            target: TargetRef::Card(unit),
            amount: 1,
        },
        0,
    )];
    let mut timing = Timing::new(actions, false);
    timing.run(&mut game).unwrap();
    timing.undo(&mut game).unwrap();

    assert!(matches!(
        timing.undo(&mut game),
        Err(EngineError::Protocol(ProtocolError::UndoNotAvailable))
    ));
}

#[test]
fn test_sibling_timings_undo_in_lifo_order() {
    let mut game = setup();
    let unit = field_unit(&mut game, 1, 0);
    let before = fingerprint(&game);

    let first = vec![GameAction::new(
        &mut game,
        ActionKind::Damage {
            target: TargetRef::Card(unit),
            amount: 1,
        },
        0,
    )];
    let mut t1 = Timing::new(first, false);
    t1.run(&mut game).unwrap();

    let second = vec![GameAction::new(
        &mut game,
        ActionKind::Damage {
            target: TargetRef::Card(unit),
            amount: 2,
        },
        0,
    )];
    let mut t2 = Timing::new(second, false);
    t2.run(&mut game).unwrap();
    assert_eq!(game.card(unit).unwrap().value("health", 0), 1);

    t2.undo(&mut game).unwrap();
    assert_eq!(game.card(unit).unwrap().value("health", 0), 3);
    t1.undo(&mut game).unwrap();
    assert_eq!(fingerprint(&game), before);
}

#[test]
fn test_cost_group_fails_as_a_unit() {
    let mut game = setup();
    let unit = field_unit(&mut game, 1, 0);

    // Group 0 pairs an impossible draw with a damage; both must
    // cancel. Group 1 is independent and executes.
    let actions = vec![
        GameAction::new(
            &mut game,
            ActionKind::Draw {
                player: PlayerId::new(0),
                amount: 50,
                as_many_as_possible: false,
            },
            0,
        ),
        GameAction::new(
            &mut game,
            ActionKind::Damage {
                target: TargetRef::Card(unit),
                amount: 2,
            },
            0,
        ),
        GameAction::new(
            &mut game,
            ActionKind::GainLife {
                player: PlayerId::new(0),
                amount: 1,
            },
            1,
        ),
    ];
    let mut timing = Timing::new(actions, false);
    assert_eq!(timing.run(&mut game).unwrap(), TimingStep::Done);

    assert_eq!(game.zones.len(PlayerId::new(0), ZoneKind::Hand), 0);
    assert_eq!(game.card(unit).unwrap().value("health", 0), 4);
    assert_eq!(game.players[PlayerId::new(0)].value("life", 0), 21);
}

proptest! {
    /// Round-trip law over randomized batches of draws, damage, and
    /// life gain.
    #[test]
    fn prop_run_undo_round_trips(
        seed in 0u64..1000,
        draw in 0usize..4,
        damage in 0i64..6,
        life in 0i64..6,
    ) {
        let mut game = GameState::new(2, seed);
        for i in 0..6u32 {
            let owner = PlayerId::new(if i < 3 { 0 } else { 1 });
            let mut initial = FxHashMap::default();
            initial.insert("health".to_string(), 8);
            game.add_card(Card::new(CardId::new(i), owner, CardType::Unit, initial));
        }
        game.set_player_initial(PlayerId::new(0), "life", 20);
        game.set_player_initial(PlayerId::new(1), "life", 20);
        let unit = CardId::new(3);
        game.move_card(unit, PlayerId::new(1), ZoneKind::Field, ZonePosition::Top);
        let before = fingerprint(&game);

        let actions = vec![
            GameAction::new(
                &mut game,
                ActionKind::Draw {
                    player: PlayerId::new(0),
                    amount: draw,
                    as_many_as_possible: false,
                },
                0,
            ),
            GameAction::new(
                &mut game,
                ActionKind::Damage { target: TargetRef::Card(unit), amount: damage },
                1,
            ),
            GameAction::new(
                &mut game,
                ActionKind::GainLife { player: PlayerId::new(1), amount: life },
                2,
            ),
        ];
        let mut timing = Timing::new(actions, false);
        prop_assert_eq!(timing.run(&mut game).unwrap(), TimingStep::Done);
        timing.undo(&mut game).unwrap();
        prop_assert_eq!(fingerprint(&game), before);
    }
}
