//! Exhaustive, side-effect-free evaluation.
//!
//! [`eval_full`] answers "what could this expression produce" without
//! committing anything: it drives the same machine as interactive
//! evaluation over a scratch copy of the game, branching over every
//! legal response at each suspension point and projecting function
//! outcomes instead of executing them. Keeping one machine for both
//! paths is what keeps the two evaluation contracts consistent.
//!
//! [`has_all_targets`] is the fast pre-check: recursively true iff
//! every sub-expression that needs a candidate currently has one.
//!
//! Both paths respect the evaluating player's knowledge boundary by
//! over-approximating: a card they cannot see matches every filter.

use std::sync::Arc;

use crate::core::{GameState, ScriptValue, ZoneKind};
use crate::error::EngineError;

use super::ast::{AstNode, CardFilter, CountSpec, FunctionKind};
use super::context::{Bindings, ScriptContext};
use super::eval::{EvalStep, Evaluator};

/// Every value the expression could produce, one per reachable
/// combination of legal responses. Deterministic given the same state
/// and context.
pub fn eval_full(
    game: &GameState,
    ctx: ScriptContext,
    root: Arc<AstNode>,
) -> Result<Vec<ScriptValue>, EngineError> {
    enumerate_with(game, ctx, root, Bindings::new())
}

/// [`eval_full`] seeded with bindings from an enclosing scope. The
/// matcher's `where` filters evaluate through here.
pub(crate) fn enumerate_with(
    game: &GameState,
    ctx: ScriptContext,
    root: Arc<AstNode>,
    bindings: Bindings,
) -> Result<Vec<ScriptValue>, EngineError> {
    let mut out = Vec::new();
    let mut scratch = game.clone();
    let mut eval = Evaluator::exhaustive(ctx, root, bindings);
    let step = eval.step(&mut scratch)?;
    explore(scratch, eval, step, &mut out)?;
    Ok(out)
}

fn explore(
    game: GameState,
    eval: Evaluator,
    step: EvalStep,
    out: &mut Vec<ScriptValue>,
) -> Result<(), EngineError> {
    match step {
        EvalStep::Done(value) => {
            out.push(value);
            Ok(())
        }
        EvalStep::NeedsInput(request) => {
            for response in request.enumerate_responses() {
                let mut branch_game = game.clone();
                let mut branch_eval = eval.clone();
                let next = branch_eval.resume_input(&mut branch_game, response)?;
                explore(branch_game, branch_eval, next, out)?;
            }
            Ok(())
        }
        EvalStep::NeedsActions(_) => {
            unreachable!("side-effect-free evaluation projects calls instead of executing them")
        }
    }
}

/// Fast legality pre-check: does every sub-expression that requires a
/// candidate currently have at least one?
pub fn has_all_targets(
    game: &GameState,
    ctx: ScriptContext,
    node: &AstNode,
) -> Result<bool, EngineError> {
    node_has_targets(game, ctx, node, &Bindings::new())
}

fn node_has_targets(
    game: &GameState,
    ctx: ScriptContext,
    node: &AstNode,
    bindings: &Bindings,
) -> Result<bool, EngineError> {
    match node {
        AstNode::Number(_)
        | AstNode::Bool(_)
        | AstNode::ZoneLiteral(_)
        | AstNode::TypeLiteral(_)
        | AstNode::SelfCard
        | AstNode::BoundCard
        | AstNode::BoundPlayer
        | AstNode::Variable { .. } => Ok(true),

        AstNode::Unary { child, .. } => node_has_targets(game, ctx, child, bindings),
        AstNode::Binary { left, right, .. } => Ok(node_has_targets(game, ctx, left, bindings)?
            && node_has_targets(game, ctx, right, bindings)?),
        AstNode::Assign { value, .. } => node_has_targets(game, ctx, value, bindings),
        AstNode::Sequence { nodes } => {
            for node in nodes {
                if !node_has_targets(game, ctx, node, bindings)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }

        AstNode::CardMatch {
            owner,
            zones,
            filters,
            count,
        } => {
            let candidates = match_candidates(game, ctx, bindings, *owner, zones, filters)?;
            Ok(match count {
                CountSpec::Exactly(n) => candidates.len() >= *n,
                CountSpec::UpTo(_) | CountSpec::All => true,
            })
        }

        AstNode::SelectPlayer { .. } => Ok(true),

        AstNode::Call {
            function,
            args,
            both_players,
        } => {
            for arg in args {
                if !node_has_targets(game, ctx, arg, bindings)? {
                    return Ok(false);
                }
            }
            function_has_targets(game, ctx, *function, args, *both_players, bindings)
        }
    }
}

/// Per-function target-availability rules beyond the recursive child
/// check.
fn function_has_targets(
    game: &GameState,
    ctx: ScriptContext,
    function: FunctionKind,
    args: &[Arc<AstNode>],
    both_players: bool,
    bindings: &Bindings,
) -> Result<bool, EngineError> {
    match function {
        FunctionKind::Draw => {
            // A strict draw needs the full amount in the deck. The
            // amount must settle to a single number to be checkable.
            let outcomes = enumerate_with(game, ctx, Arc::clone(&args[0]), bindings.clone())?;
            let [amount] = outcomes.as_slice() else {
                return Ok(true);
            };
            let Ok(amount) = amount.as_number() else {
                return Ok(true);
            };
            let players: Vec<_> = if both_players {
                game.turn_order().collect()
            } else {
                vec![ctx.player]
            };
            Ok(players
                .into_iter()
                .all(|p| game.zones.len(p, ZoneKind::Deck) >= amount.max(0) as usize))
        }
        _ => Ok(true),
    }
}

/// The candidate set a matcher would range over, hidden cards matching
/// everything.
fn match_candidates(
    game: &GameState,
    ctx: ScriptContext,
    bindings: &Bindings,
    owner: super::ast::OwnerScope,
    zones: &[ZoneKind],
    filters: &[CardFilter],
) -> Result<Vec<crate::core::CardId>, EngineError> {
    let scratch = Evaluator::exhaustive(ctx, Arc::new(AstNode::Bool(true)), bindings.clone());
    scratch.gather_candidates(game, owner, zones, filters)
}
