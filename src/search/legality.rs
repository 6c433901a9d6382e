//! Depth-first legality search over an effect script.
//!
//! Answers "can this cost be paid at all": run the script's evaluation
//! in prediction mode, and at every suspension point branch over every
//! structurally valid response. A branch is valid when evaluation
//! completes and the caller's end-of-tree predicate accepts the result
//! state; a position is valid when some branch below it is.
//!
//! Branches mutate the real game and rewind on backtrack: each frame
//! undoes the prediction Timings it completed, in reverse order,
//! retracts any variables assigned along the branch, and restores the
//! RNG stream to where the frame started. A batch that suspended
//! mid-flight cannot be undone step by step, so the frame that started
//! it keeps a snapshot taken just before the run and restores that
//! instead.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{AbilityId, GameRng, GameRngState, GameState, ScriptValue};
use crate::error::EngineError;
use crate::script::{AstNode, EvalStep, Evaluator, Request, Response, ScriptContext};
use crate::timing::{Timing, TimingStep};

use super::option_tree::{OptionNode, OptionNodeId, OptionTree};

/// Explore every legal completion of `root` under `ctx`, accepting a
/// completion when `check` holds for its final state and value.
/// Returns the explored tree; the game is restored before returning.
pub fn search<F>(
    game: &mut GameState,
    ctx: ScriptContext,
    root: Arc<AstNode>,
    check: F,
) -> Result<OptionTree, EngineError>
where
    F: Fn(&GameState, &ScriptValue) -> bool,
{
    let mut tree = OptionTree::new();
    let mut frame = Frame::new(Evaluator::new(ctx, root), game);
    let first = frame.eval.step(game)?;
    let step = frame.drive(game, first)?;
    let root_id = tree.root();
    explore(game, &mut tree, root_id, frame, step, &check)?;
    Ok(tree)
}

/// Convenience wrapper around [`search`] returning only the answer.
pub fn can_succeed<F>(
    game: &mut GameState,
    ctx: ScriptContext,
    root: Arc<AstNode>,
    check: F,
) -> Result<bool, EngineError>
where
    F: Fn(&GameState, &ScriptValue) -> bool,
{
    Ok(search(game, ctx, root, check)?.is_valid())
}

/// Where one driving pass came to rest.
enum Step {
    /// A player response is needed before evaluation can continue.
    Suspended(Request),
    /// Evaluation completed with this value.
    Finished(ScriptValue),
}

/// One branch's speculative execution state.
///
/// A frame spans the stretch between two decision points. `done` holds
/// the prediction Timings completed inside that stretch, in execution
/// order, so rewinding is their undo in reverse plus a variable and
/// RNG restore. When a batch this frame started suspends for input,
/// `pre_suspended` holds the state from just before the run; the
/// frame owns rolling that batch's partial work back.
#[derive(Clone)]
struct Frame {
    eval: Evaluator,
    suspended: Option<Timing>,
    pre_suspended: Option<Box<GameState>>,
    done: Vec<Timing>,
    vars: FxHashSet<(AbilityId, String)>,
    rng: GameRngState,
}

impl Frame {
    fn new(eval: Evaluator, game: &GameState) -> Self {
        Self {
            eval,
            suspended: None,
            pre_suspended: None,
            done: Vec::new(),
            vars: game.var_keys().into_iter().collect(),
            rng: game.rng.state(),
        }
    }

    /// Fork for one child decision: same evaluation position, nothing
    /// executed yet, variable and RNG baselines taken here. The parent
    /// keeps ownership of a mid-flight batch's rollback.
    fn branch(&self, game: &GameState) -> Self {
        Self {
            eval: self.eval.clone(),
            suspended: self.suspended.clone(),
            pre_suspended: None,
            done: Vec::new(),
            vars: game.var_keys().into_iter().collect(),
            rng: game.rng.state(),
        }
    }

    /// Feed one response in and keep driving until the next decision
    /// point or completion.
    fn resume(&mut self, game: &mut GameState, response: Response) -> Result<Step, EngineError> {
        if let Some(mut timing) = self.suspended.take() {
            match timing.resume(game, response)? {
                TimingStep::NeedsInput(request) => {
                    self.suspended = Some(timing);
                    Ok(Step::Suspended(request))
                }
                TimingStep::Done => {
                    let step = self.eval.resume_timing(game, &timing)?;
                    self.absorb(timing);
                    self.drive(game, step)
                }
            }
        } else {
            let step = self.eval.resume_input(game, response)?;
            self.drive(game, step)
        }
    }

    /// Run evaluation forward, executing produced actions under
    /// prediction Timings, until input is needed or the value is
    /// ready.
    fn drive(&mut self, game: &mut GameState, mut step: EvalStep) -> Result<Step, EngineError> {
        loop {
            match step {
                EvalStep::Done(value) => return Ok(Step::Finished(value)),
                EvalStep::NeedsInput(request) => return Ok(Step::Suspended(request)),
                EvalStep::NeedsActions(actions) => {
                    let mut timing = Timing::new(actions, true);
                    let before = game.clone();
                    match timing.run(game)? {
                        TimingStep::NeedsInput(request) => {
                            self.suspended = Some(timing);
                            self.pre_suspended = Some(Box::new(before));
                            return Ok(Step::Suspended(request));
                        }
                        TimingStep::Done => {
                            step = self.eval.resume_timing(game, &timing)?;
                            self.absorb(timing);
                        }
                    }
                }
            }
        }
    }

    /// A batch that cancelled wholesale executed nothing; only
    /// successful ones need rewinding.
    fn absorb(&mut self, timing: Timing) {
        if timing.is_successful() {
            self.done.push(timing);
        }
    }

    /// Undo everything this frame executed and restore its variable
    /// and RNG baselines.
    fn rewind(&mut self, game: &mut GameState) -> Result<(), EngineError> {
        // A mid-flight batch started here is rolled back wholesale to
        // the state from just before its run.
        if let Some(before) = self.pre_suspended.take() {
            *game = *before;
        }
        while let Some(mut timing) = self.done.pop() {
            timing.undo(game)?;
        }
        for key in game.var_keys() {
            if !self.vars.contains(&key) {
                game.clear_var(key.0, &key.1);
            }
        }
        game.rng = GameRng::from_state(&self.rng);
        Ok(())
    }
}

fn explore<F>(
    game: &mut GameState,
    tree: &mut OptionTree,
    node: OptionNodeId,
    mut frame: Frame,
    step: Step,
    check: &F,
) -> Result<bool, EngineError>
where
    F: Fn(&GameState, &ScriptValue) -> bool,
{
    let valid = match step {
        Step::Finished(value) => check(game, &value),
        Step::Suspended(request) => {
            // A batch suspended mid-flight cannot be rewound to its
            // midpoint by undo, so siblings restart from a snapshot.
            let snapshot = frame.suspended.is_some().then(|| game.clone());
            let mut any_valid = false;
            for (i, response) in request.enumerate_responses().into_iter().enumerate() {
                if i > 0 {
                    if let Some(snapshot) = &snapshot {
                        *game = snapshot.clone();
                    }
                }
                let child = tree.alloc(OptionNode::child(node, response.clone()));
                let mut branch = frame.branch(game);
                let next = branch.resume(game, response)?;
                if explore(game, tree, child, branch, next, check)? {
                    any_valid = true;
                }
            }
            if let Some(snapshot) = snapshot {
                *game = snapshot;
            }
            any_valid
        }
    };
    frame.rewind(game)?;
    tree.get_mut(node).valid = valid;
    Ok(valid)
}
