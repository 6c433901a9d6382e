//! Builtin verb semantics.
//!
//! Three views of each function, kept behaviorally consistent:
//!
//! - [`produce_actions`]: the actions an interactive call wants a
//!   timing to execute.
//! - [`finalize`]: turn what the timing actually did into the call's
//!   return value. `DRAW(3)` returns the cards drawn, not the count
//!   requested.
//! - [`project`]: the outcome a side-effect-free evaluation predicts,
//!   without touching state.

use smallvec::SmallVec;

use crate::core::{CardId, GameState, PlayerId, ScriptItem, ScriptValue, ZoneKind, ZonePosition};
use crate::error::ScriptError;
use crate::timing::{ActionKind, GameAction, GameEvent, TargetRef};

use super::ast::FunctionKind;

fn arg_cards(arg: &ScriptValue, player: PlayerId) -> Vec<CardId> {
    arg.get(player)
        .iter()
        .filter_map(|item| match item {
            ScriptItem::Card(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn arg_targets(arg: &ScriptValue, player: PlayerId) -> Vec<TargetRef> {
    arg.get(player)
        .iter()
        .filter_map(|item| match item {
            ScriptItem::Card(id) => Some(TargetRef::Card(*id)),
            ScriptItem::Player(p) => Some(TargetRef::Player(*p)),
            _ => None,
        })
        .collect()
}

fn arg_amount(arg: &ScriptValue, what: &'static str) -> Result<i64, ScriptError> {
    let n = arg.as_number()?;
    if n < 0 {
        return Err(ScriptError::InvalidArgument(what));
    }
    Ok(n)
}

/// The actions a call wants executed for one player.
///
/// `COUNT` is pure and produces none; the evaluator never routes it
/// here.
pub(crate) fn produce_actions(
    game: &mut GameState,
    function: FunctionKind,
    player: PlayerId,
    args: &[ScriptValue],
) -> Result<Vec<GameAction>, ScriptError> {
    let mut actions = Vec::new();
    match function {
        FunctionKind::Draw | FunctionKind::DrawUpTo => {
            let amount = arg_amount(&args[0], "negative draw amount")?;
            actions.push(GameAction::new(
                game,
                ActionKind::Draw {
                    player,
                    amount: amount as usize,
                    as_many_as_possible: function == FunctionKind::DrawUpTo,
                },
                0,
            ));
        }

        FunctionKind::Discard => {
            for card in arg_cards(&args[0], player) {
                actions.push(GameAction::new(game, ActionKind::Discard { card }, 0));
            }
        }

        FunctionKind::Destroy => {
            // A scripted destroy is a discard that performs the move
            // plus a destroy referencing it; they cancel together.
            for card in arg_cards(&args[0], player) {
                let discard = GameAction::new(game, ActionKind::Discard { card }, 0);
                let backing = discard.id;
                actions.push(discard);
                actions.push(GameAction::new(
                    game,
                    ActionKind::Destroy {
                        card,
                        backing: Some(backing),
                    },
                    0,
                ));
            }
        }

        FunctionKind::Damage => {
            let amount = arg_amount(&args[1], "negative damage amount")?;
            for target in arg_targets(&args[0], player) {
                actions.push(GameAction::new(
                    game,
                    ActionKind::Damage { target, amount },
                    0,
                ));
            }
        }

        FunctionKind::GainLife => {
            let amount = arg_amount(&args[0], "negative life gain")?;
            actions.push(GameAction::new(
                game,
                ActionKind::GainLife { player, amount },
                0,
            ));
        }

        FunctionKind::MoveCards => {
            let to_zone = args[1].as_zone()?;
            for card in arg_cards(&args[0], player) {
                let Some(owner) = game.card(card).map(|c| c.owner) else {
                    continue;
                };
                actions.push(GameAction::new(
                    game,
                    ActionKind::MoveCard {
                        card,
                        to_owner: owner,
                        to_zone,
                        position: ZonePosition::Top,
                    },
                    0,
                ));
            }
        }

        FunctionKind::Reveal => {
            let cards: SmallVec<[CardId; 4]> = arg_cards(&args[0], player).into_iter().collect();
            if !cards.is_empty() {
                actions.push(GameAction::new(game, ActionKind::Reveal { cards }, 0));
            }
        }

        FunctionKind::Count => {}
    }
    Ok(actions)
}

/// Project what the timing actually did into the call's result items.
pub(crate) fn finalize(
    function: FunctionKind,
    player: PlayerId,
    args: &[ScriptValue],
    events: &[GameEvent],
) -> Vec<ScriptItem> {
    match function {
        FunctionKind::Draw | FunctionKind::DrawUpTo => events
            .iter()
            .filter_map(|e| match e {
                GameEvent::CardsDrawn { player: p, cards } if *p == player => Some(cards),
                _ => None,
            })
            .flatten()
            .map(|&c| ScriptItem::Card(c))
            .collect(),

        FunctionKind::Discard => {
            let requested = arg_cards(&args[0], player);
            events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::CardDiscarded { card, .. } if requested.contains(card) => {
                        Some(ScriptItem::Card(*card))
                    }
                    _ => None,
                })
                .collect()
        }

        FunctionKind::Destroy => {
            let requested = arg_cards(&args[0], player);
            events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::CardDestroyed { card } if requested.contains(card) => {
                        Some(ScriptItem::Card(*card))
                    }
                    _ => None,
                })
                .collect()
        }

        FunctionKind::Damage => {
            let requested = arg_targets(&args[0], player);
            let dealt: i64 = events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::DamageDealt { target, amount } if requested.contains(target) => {
                        Some(*amount)
                    }
                    _ => None,
                })
                .sum();
            vec![ScriptItem::Number(dealt)]
        }

        FunctionKind::GainLife => {
            let gained: i64 = events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::LifeGained { player: p, amount } if *p == player => Some(*amount),
                    _ => None,
                })
                .sum();
            vec![ScriptItem::Number(gained)]
        }

        FunctionKind::MoveCards => {
            let requested = arg_cards(&args[0], player);
            events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::CardMoved { card, .. } if requested.contains(card) => {
                        Some(ScriptItem::Card(*card))
                    }
                    _ => None,
                })
                .collect()
        }

        FunctionKind::Reveal => {
            let requested = arg_cards(&args[0], player);
            events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::CardsRevealed { cards } => Some(cards),
                    _ => None,
                })
                .flatten()
                .filter(|c| requested.contains(c))
                .map(|&c| ScriptItem::Card(c))
                .collect()
        }

        FunctionKind::Count => Vec::new(),
    }
}

/// The outcome a side-effect-free evaluation predicts for one player.
pub(crate) fn project(
    game: &GameState,
    function: FunctionKind,
    player: PlayerId,
    args: &[ScriptValue],
) -> Result<Vec<ScriptItem>, ScriptError> {
    Ok(match function {
        FunctionKind::Draw => {
            let amount = arg_amount(&args[0], "negative draw amount")? as usize;
            let deck = game.zones.list(player, ZoneKind::Deck);
            if deck.len() < amount {
                // A strict draw against a short deck fails as a whole.
                Vec::new()
            } else {
                deck.iter()
                    .rev()
                    .take(amount)
                    .map(|&c| ScriptItem::Card(c))
                    .collect()
            }
        }

        FunctionKind::DrawUpTo => {
            let amount = arg_amount(&args[0], "negative draw amount")? as usize;
            game.zones
                .list(player, ZoneKind::Deck)
                .iter()
                .rev()
                .take(amount)
                .map(|&c| ScriptItem::Card(c))
                .collect()
        }

        FunctionKind::Discard
        | FunctionKind::Destroy
        | FunctionKind::MoveCards
        | FunctionKind::Reveal => arg_cards(&args[0], player)
            .into_iter()
            .map(ScriptItem::Card)
            .collect(),

        FunctionKind::Damage => {
            vec![ScriptItem::Number(arg_amount(
                &args[1],
                "negative damage amount",
            )?)]
        }

        FunctionKind::GainLife => {
            vec![ScriptItem::Number(arg_amount(&args[0], "negative life gain")?)]
        }

        FunctionKind::Count => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardType};
    use rustc_hash::FxHashMap;

    fn setup() -> GameState {
        let mut game = GameState::new(2, 3);
        for i in 0..3u32 {
            game.add_card(Card::new(
                CardId::new(i),
                PlayerId::new(0),
                CardType::Unit,
                FxHashMap::default(),
            ));
        }
        game
    }

    #[test]
    fn test_destroy_produces_linked_pair() {
        let mut game = setup();
        let args = [ScriptValue::cards([CardId::new(1)])];
        let actions = produce_actions(
            &mut game,
            FunctionKind::Destroy,
            PlayerId::new(0),
            &args,
        )
        .unwrap();

        assert_eq!(actions.len(), 2);
        let discard_id = actions[0].id;
        assert!(matches!(actions[0].kind, ActionKind::Discard { .. }));
        assert!(matches!(
            actions[1].kind,
            ActionKind::Destroy {
                backing: Some(id),
                ..
            } if id == discard_id
        ));
    }

    #[test]
    fn test_negative_amount_is_invalid() {
        let mut game = setup();
        let args = [ScriptValue::number(-1)];
        let err = produce_actions(&mut game, FunctionKind::Draw, PlayerId::new(0), &args);
        assert!(matches!(err, Err(ScriptError::InvalidArgument(_))));
    }

    #[test]
    fn test_project_strict_draw_short_deck_is_empty() {
        let game = setup();
        let args = [ScriptValue::number(5)];
        let strict = project(&game, FunctionKind::Draw, PlayerId::new(0), &args).unwrap();
        assert!(strict.is_empty());

        let lenient = project(&game, FunctionKind::DrawUpTo, PlayerId::new(0), &args).unwrap();
        assert_eq!(lenient.len(), 3);
    }

    #[test]
    fn test_finalize_draw_returns_cards_drawn() {
        let events = [GameEvent::CardsDrawn {
            player: PlayerId::new(0),
            cards: [CardId::new(2), CardId::new(1)].into_iter().collect(),
        }];
        let items = finalize(FunctionKind::Draw, PlayerId::new(0), &[], &events);
        assert_eq!(
            items,
            vec![
                ScriptItem::Card(CardId::new(2)),
                ScriptItem::Card(CardId::new(1)),
            ]
        );
    }
}
