//! The interactive evaluator.
//!
//! Script evaluation is a resumable computation. The [`Evaluator`] is
//! an explicit stack machine: a work stack of nodes and operator
//! applications, and an operand stack of completed values. It runs
//! until it either finishes or reaches a suspension point, of which
//! there are exactly two kinds:
//!
//! - a player must choose (cards, a player): [`EvalStep::NeedsInput`],
//!   answered through [`Evaluator::resume_input`];
//! - a function call produced actions that must actually run:
//!   [`EvalStep::NeedsActions`], answered with the completed
//!   [`Timing`] through [`Evaluator::resume_timing`].
//!
//! The machine is `Clone`, so a legality search can fork it at any
//! suspension point and explore each answer independently.
//!
//! Forced choices (one candidate, exact-size selection) are resolved
//! without asking. A call marked "both players" fans out per player,
//! turn player first; cross-player effects resolve in that order.

use std::sync::Arc;

use crate::core::{
    CardId, GameState, PlayerId, ScriptItem, ScriptValue, ValueKind, ZoneKind,
};
use crate::error::{EngineError, ProtocolError, ScriptError};
use crate::timing::{GameAction, Timing};

use super::ast::{AstNode, BinaryOp, CardFilter, CountSpec, FunctionKind, OwnerScope, UnaryOp};
use super::context::{Bindings, ScriptContext};
use super::exhaustive;
use super::functions;
use super::request::{Request, Response};

/// What the machine yields when it stops running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalStep {
    /// A player decision is needed.
    NeedsInput(Request),
    /// These actions must be executed; resume with the timing that ran
    /// them.
    NeedsActions(Vec<GameAction>),
    /// The script finished with this value.
    Done(ScriptValue),
}

#[derive(Clone, Debug)]
enum Work {
    Eval(Arc<AstNode>),
    Unary(UnaryOp),
    Binary(BinaryOp),
    StoreVar(String),
    Drop,
    Call {
        function: FunctionKind,
        argc: usize,
        both_players: bool,
    },
}

/// A function call in flight, fanned out over its players.
#[derive(Clone, Debug)]
struct CallState {
    function: FunctionKind,
    args: Vec<ScriptValue>,
    current: PlayerId,
    remaining: Vec<PlayerId>,
    results: Vec<(PlayerId, Vec<ScriptItem>)>,
    split: bool,
}

#[derive(Clone, Debug)]
enum Pending {
    Input(Request),
    Actions {
        call: CallState,
        actions: Vec<GameAction>,
    },
}

/// A resumable script evaluation.
#[derive(Clone, Debug)]
pub struct Evaluator {
    ctx: ScriptContext,
    bindings: Bindings,
    work: Vec<Work>,
    values: Vec<ScriptValue>,
    pending: Option<Pending>,
    started: bool,
    finished: bool,
    /// Side-effect-free mode: calls project their outcome instead of
    /// producing actions, and cards hidden from the evaluating player
    /// match every filter.
    exhaustive: bool,
}

impl Evaluator {
    /// An interactive evaluation of the given tree.
    #[must_use]
    pub fn new(ctx: ScriptContext, root: Arc<AstNode>) -> Self {
        Self {
            ctx,
            bindings: Bindings::new(),
            work: vec![Work::Eval(root)],
            values: Vec::new(),
            pending: None,
            started: false,
            finished: false,
            exhaustive: false,
        }
    }

    /// A side-effect-free evaluation, optionally seeded with bindings
    /// from an enclosing scope.
    pub(crate) fn exhaustive(ctx: ScriptContext, root: Arc<AstNode>, bindings: Bindings) -> Self {
        Self {
            ctx,
            bindings,
            work: vec![Work::Eval(root)],
            values: Vec::new(),
            pending: None,
            started: false,
            finished: false,
            exhaustive: true,
        }
    }

    /// The request the machine is suspended on, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<&Request> {
        match &self.pending {
            Some(Pending::Input(request)) => Some(request),
            _ => None,
        }
    }

    /// Start, or re-report the current suspension.
    pub fn step(&mut self, game: &mut GameState) -> Result<EvalStep, EngineError> {
        if self.finished {
            return Err(ProtocolError::AlreadyFinished.into());
        }
        match &self.pending {
            Some(Pending::Input(request)) => Ok(EvalStep::NeedsInput(request.clone())),
            Some(Pending::Actions { actions, .. }) => {
                Ok(EvalStep::NeedsActions(actions.clone()))
            }
            None => {
                if self.started {
                    return Err(ProtocolError::NotSuspended.into());
                }
                self.started = true;
                self.run_loop(game)
            }
        }
    }

    /// Answer a pending input request and continue.
    pub fn resume_input(
        &mut self,
        game: &mut GameState,
        response: Response,
    ) -> Result<EvalStep, EngineError> {
        let Some(Pending::Input(request)) = self.pending.take() else {
            self.pending = None;
            return Err(ProtocolError::NotSuspended.into());
        };
        if let Err(e) = request.validate(&response) {
            self.pending = Some(Pending::Input(request));
            return Err(e.into());
        }
        self.values.push(response_value(response));
        self.run_loop(game)
    }

    /// Hand back the timing that executed the pending actions and
    /// continue.
    pub fn resume_timing(
        &mut self,
        game: &mut GameState,
        timing: &Timing,
    ) -> Result<EvalStep, EngineError> {
        let Some(Pending::Actions { mut call, .. }) = self.pending.take() else {
            self.pending = None;
            return Err(ProtocolError::NotSuspended.into());
        };
        let items = functions::finalize(call.function, call.current, &call.args, timing.events());
        call.results.push((call.current, items));
        if let Some(step) = self.continue_call(game, call)? {
            return Ok(step);
        }
        self.run_loop(game)
    }

    fn run_loop(&mut self, game: &mut GameState) -> Result<EvalStep, EngineError> {
        while let Some(work) = self.work.pop() {
            let suspended = match work {
                Work::Eval(node) => self.eval_node(game, &node)?,
                Work::Unary(op) => {
                    let value = self.pop_value();
                    self.values.push(apply_unary(op, &value)?);
                    None
                }
                Work::Binary(op) => {
                    let right = self.pop_value();
                    let left = self.pop_value();
                    self.values.push(apply_binary(op, &left, &right)?);
                    None
                }
                Work::StoreVar(name) => {
                    let value = self.values.last().cloned().unwrap_or_else(unit);
                    game.set_var(self.ctx.ability, name, value);
                    None
                }
                Work::Drop => {
                    self.values.pop();
                    None
                }
                Work::Call {
                    function,
                    argc,
                    both_players,
                } => self.begin_call(game, function, argc, both_players)?,
            };
            if let Some(step) = suspended {
                return Ok(step);
            }
        }

        self.finished = true;
        let value = self.values.pop().unwrap_or_else(unit);
        Ok(EvalStep::Done(value))
    }

    fn eval_node(
        &mut self,
        game: &mut GameState,
        node: &Arc<AstNode>,
    ) -> Result<Option<EvalStep>, EngineError> {
        match &**node {
            AstNode::Number(n) => self.values.push(ScriptValue::number(*n)),
            AstNode::Bool(b) => self.values.push(ScriptValue::boolean(*b)),
            AstNode::ZoneLiteral(z) => self.values.push(ScriptValue::zone(*z)),
            AstNode::TypeLiteral(t) => self.values.push(ScriptValue::card_type(*t)),

            AstNode::SelfCard => self.values.push(ScriptValue::cards([self.ctx.card])),
            AstNode::BoundCard => {
                let card = self.bindings.current_card()?;
                self.values.push(ScriptValue::cards([card]));
            }
            AstNode::BoundPlayer => {
                let player = self.bindings.current_player()?;
                self.values.push(ScriptValue::players([player]));
            }

            AstNode::Unary { op, child } => {
                self.work.push(Work::Unary(*op));
                self.work.push(Work::Eval(Arc::clone(child)));
            }
            AstNode::Binary { op, left, right } => {
                self.work.push(Work::Binary(*op));
                self.work.push(Work::Eval(Arc::clone(right)));
                self.work.push(Work::Eval(Arc::clone(left)));
            }

            AstNode::Sequence { nodes } => {
                if nodes.is_empty() {
                    self.values.push(unit());
                } else {
                    let last = nodes.len() - 1;
                    for (i, node) in nodes.iter().enumerate().rev() {
                        if i != last {
                            self.work.push(Work::Drop);
                        }
                        self.work.push(Work::Eval(Arc::clone(node)));
                    }
                }
            }

            AstNode::Assign { name, value } => {
                if let Some(existing) = game.var(self.ctx.ability, name) {
                    self.values.push(existing.clone());
                } else {
                    self.work.push(Work::StoreVar(name.clone()));
                    self.work.push(Work::Eval(Arc::clone(value)));
                }
            }
            AstNode::Variable { name, .. } => {
                let value = game
                    .var(self.ctx.ability, name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UnassignedVariable(name.clone()))?;
                self.values.push(value);
            }

            AstNode::CardMatch {
                owner,
                zones,
                filters,
                count,
            } => {
                let candidates = self.gather_candidates(game, *owner, zones, filters)?;
                return Ok(self.select_cards(candidates, *count));
            }

            AstNode::SelectPlayer { scope } => {
                let candidates: Vec<PlayerId> = game
                    .turn_order()
                    .filter(|&p| scope_admits(*scope, self.ctx.player, p))
                    .collect();
                match candidates.as_slice() {
                    [] => self.values.push(ScriptValue::empty(ValueKind::PlayerSet)),
                    [only] => self.values.push(ScriptValue::players([*only])),
                    _ => {
                        let request = Request::ChoosePlayer {
                            chooser: self.ctx.player,
                            candidates,
                        };
                        self.pending = Some(Pending::Input(request.clone()));
                        return Ok(Some(EvalStep::NeedsInput(request)));
                    }
                }
            }

            AstNode::Call {
                function,
                args,
                both_players,
            } => {
                self.work.push(Work::Call {
                    function: *function,
                    argc: args.len(),
                    both_players: *both_players,
                });
                for arg in args.iter().rev() {
                    self.work.push(Work::Eval(Arc::clone(arg)));
                }
            }
        }
        Ok(None)
    }

    /// Resolve a matcher's candidate set: scope, zones, then filters.
    pub(crate) fn gather_candidates(
        &self,
        game: &GameState,
        owner: OwnerScope,
        zones: &[ZoneKind],
        filters: &[CardFilter],
    ) -> Result<Vec<CardId>, EngineError> {
        let seats: Vec<PlayerId> = game
            .turn_order()
            .filter(|&p| scope_admits(owner, self.ctx.player, p))
            .collect();
        let mut out = Vec::new();
        for player in seats {
            for &zone in zones {
                for &card in game.zones.list(player, zone) {
                    // In the knowledge-bounded paths, a card the
                    // evaluating player cannot see matches everything.
                    if self.exhaustive
                        && !game.card_visible_to(card, self.ctx.evaluating_player)
                    {
                        out.push(card);
                        continue;
                    }
                    if self.passes_filters(game, card, filters)? {
                        out.push(card);
                    }
                }
            }
        }
        Ok(out)
    }

    fn passes_filters(
        &self,
        game: &GameState,
        card: CardId,
        filters: &[CardFilter],
    ) -> Result<bool, EngineError> {
        for filter in filters {
            let ok = match filter {
                CardFilter::OfType(t) => {
                    game.card(card).is_some_and(|c| c.card_type == *t)
                }
                CardFilter::ValueAtLeast { key, min } => {
                    game.card(card).is_some_and(|c| c.value(key, 0) >= *min)
                }
                CardFilter::Where(node) => {
                    // The clause sees the candidate and its controller
                    // as the innermost bindings.
                    let mut bindings = self.bindings.clone();
                    bindings.push_card(card);
                    if let Some(controller) = game.card(card).map(|c| c.controller) {
                        bindings.push_player(controller);
                    }
                    let outcomes = exhaustive::enumerate_with(
                        game,
                        self.ctx,
                        Arc::clone(node),
                        bindings,
                    )?;
                    match outcomes.as_slice() {
                        [single] => single.is_truthy(),
                        _ => return Err(ScriptError::NondeterministicFilter.into()),
                    }
                }
            };
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Apply a count spec to the candidates, suspending when a real
    /// choice exists.
    fn select_cards(&mut self, candidates: Vec<CardId>, count: CountSpec) -> Option<EvalStep> {
        if candidates.is_empty() {
            self.values.push(ScriptValue::empty(ValueKind::CardSet));
            return None;
        }
        let (min, max) = match count {
            CountSpec::All => {
                self.values.push(ScriptValue::cards(candidates));
                return None;
            }
            CountSpec::Exactly(n) => {
                if candidates.len() < n {
                    // Not enough targets; the match has no legal
                    // selection and resolves empty.
                    self.values.push(ScriptValue::empty(ValueKind::CardSet));
                    return None;
                }
                (n, n)
            }
            CountSpec::UpTo(n) => (0, n.min(candidates.len())),
        };
        let request = Request::ChooseCards {
            chooser: self.ctx.player,
            candidates,
            min,
            max,
        };
        if let Some(forced) = request.forced_response() {
            self.values.push(response_value(forced));
            return None;
        }
        self.pending = Some(Pending::Input(request.clone()));
        Some(EvalStep::NeedsInput(request))
    }

    /// Pop the call's arguments and fan out over its players.
    fn begin_call(
        &mut self,
        game: &mut GameState,
        function: FunctionKind,
        argc: usize,
        both_players: bool,
    ) -> Result<Option<EvalStep>, EngineError> {
        // A call node built as a literal bypasses the arity check in
        // `AstNode::call`; re-check before indexing into the arguments.
        if argc != function.arity() {
            return Err(ScriptError::WrongArity {
                function: function.name(),
                expected: function.arity(),
                found: argc,
            }
            .into());
        }
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop_value());
        }
        args.reverse();

        if function == FunctionKind::Count {
            let count = args[0].len() as i64;
            self.values.push(ScriptValue::number(count));
            return Ok(None);
        }

        let mut players: Vec<PlayerId> = if both_players {
            game.turn_order().collect()
        } else {
            vec![self.ctx.player]
        };
        let current = players.remove(0);
        let call = CallState {
            function,
            args,
            current,
            remaining: players,
            results: Vec::new(),
            split: both_players,
        };
        self.advance_call(game, call)
    }

    /// Produce (or project) the current player's actions; on a real
    /// production, suspend for execution.
    fn advance_call(
        &mut self,
        game: &mut GameState,
        mut call: CallState,
    ) -> Result<Option<EvalStep>, EngineError> {
        loop {
            if self.exhaustive {
                let items = functions::project(game, call.function, call.current, &call.args)?;
                call.results.push((call.current, items));
            } else {
                let actions =
                    functions::produce_actions(game, call.function, call.current, &call.args)?;
                if !actions.is_empty() {
                    let step = EvalStep::NeedsActions(actions.clone());
                    self.pending = Some(Pending::Actions { call, actions });
                    return Ok(Some(step));
                }
                // Nothing to do for this player; the result is empty.
                let items = functions::finalize(call.function, call.current, &call.args, &[]);
                call.results.push((call.current, items));
            }

            if call.remaining.is_empty() {
                self.finish_call(call);
                return Ok(None);
            }
            call.current = call.remaining.remove(0);
        }
    }

    /// The current player's result is in; move to the next player or
    /// assemble the call's value.
    fn continue_call(
        &mut self,
        game: &mut GameState,
        mut call: CallState,
    ) -> Result<Option<EvalStep>, EngineError> {
        if call.remaining.is_empty() {
            self.finish_call(call);
            return Ok(None);
        }
        call.current = call.remaining.remove(0);
        self.advance_call(game, call)
    }

    fn finish_call(&mut self, call: CallState) {
        let kind = call.function.return_kind();
        let value = if call.split {
            ScriptValue::per_player(kind, call.results)
        } else {
            let items = call
                .results
                .into_iter()
                .next()
                .map(|(_, items)| items)
                .unwrap_or_default();
            ScriptValue::of(kind, items)
        };
        self.values.push(value);
    }

    fn pop_value(&mut self) -> ScriptValue {
        self.values.pop().unwrap_or_else(unit)
    }
}

/// The value an empty expression evaluates to.
fn unit() -> ScriptValue {
    ScriptValue::boolean(true)
}

fn response_value(response: Response) -> ScriptValue {
    match response {
        Response::Cards(cards) => ScriptValue::cards(cards),
        Response::Player(player) => ScriptValue::players([player]),
        Response::Confirm(b) => ScriptValue::boolean(b),
        Response::Order(order) => ScriptValue::of(
            ValueKind::Number,
            order
                .into_iter()
                .map(|i| ScriptItem::Number(i as i64))
                .collect(),
        ),
    }
}

fn scope_admits(scope: OwnerScope, me: PlayerId, subject: PlayerId) -> bool {
    match scope {
        OwnerScope::Mine => subject == me,
        OwnerScope::Opponents => subject != me,
        OwnerScope::Any => true,
    }
}

fn apply_unary(op: UnaryOp, value: &ScriptValue) -> Result<ScriptValue, ScriptError> {
    Ok(match op {
        UnaryOp::Not => ScriptValue::boolean(!value.is_truthy()),
        UnaryOp::Negate => ScriptValue::number(-value.as_number()?),
    })
}

fn apply_binary(
    op: BinaryOp,
    left: &ScriptValue,
    right: &ScriptValue,
) -> Result<ScriptValue, ScriptError> {
    Ok(match op {
        BinaryOp::Add => ScriptValue::number(left.as_number()? + right.as_number()?),
        BinaryOp::Sub => ScriptValue::number(left.as_number()? - right.as_number()?),
        BinaryOp::Mul => ScriptValue::number(left.as_number()? * right.as_number()?),
        BinaryOp::Eq => ScriptValue::boolean(left == right),
        BinaryOp::Ne => ScriptValue::boolean(left != right),
        BinaryOp::Lt => ScriptValue::boolean(left.as_number()? < right.as_number()?),
        BinaryOp::Le => ScriptValue::boolean(left.as_number()? <= right.as_number()?),
        BinaryOp::Gt => ScriptValue::boolean(left.as_number()? > right.as_number()?),
        BinaryOp::Ge => ScriptValue::boolean(left.as_number()? >= right.as_number()?),
        BinaryOp::And => ScriptValue::boolean(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => ScriptValue::boolean(left.is_truthy() || right.is_truthy()),
    })
}
