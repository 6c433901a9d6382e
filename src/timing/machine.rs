//! The timing state machine.
//!
//! A [`Timing`] resolves an ordered batch of [`GameAction`]s as one
//! atomic step:
//!
//! 1. cancel actions that are impossible outright (linked actions
//!    cancel together),
//! 2. let interception statics cancel or substitute remaining actions,
//!    asking for confirmation when the interceptor is optional,
//! 3. fail cost groups all-or-nothing,
//! 4. execute the survivors in order,
//! 5. derive and execute follow-up actions to a fixpoint,
//! 6. recalculate values,
//! 7. check win/loss and trigger satisfaction,
//! 8. chain a phasing timing when statics started or stopped applying.
//!
//! Steps 2 and 6 can suspend for a player decision; the machine yields
//! a [`Request`] and is resumed with the validated [`Response`]. A
//! successful run can be undone exactly once, in strict LIFO order
//! relative to other timings.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{AbilityId, CardId, GameState, PlayerId, ZoneKind};
use crate::error::{EngineError, ProtocolError};
use crate::script::{Request, Response};
use crate::statics::{InterceptionEffect, RecalcOutcome, StaticKind};

use super::action::{ActionId, ActionKind, ActionStatus, GameAction};
use super::event::GameEvent;

/// What a driving loop gets back from `run`/`resume`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimingStep {
    /// The timing is suspended on a player decision.
    NeedsInput(Request),
    /// The timing finished, successfully or not.
    Done,
}

/// An interception static, captured at step 2 entry so a suspension
/// sees a stable list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Interceptor {
    source: CardId,
    controller: PlayerId,
    kind: StaticKind,
    entered_at: u64,
}

/// A derived action step 5 wants to run.
enum Followup {
    Plain(ActionKind),
    /// Orphaned equipment gets a discard plus a destroy backed by it.
    DestroyEquipment(CardId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Stage {
    Built,
    Intercepting { interceptor: usize, action: usize },
    Executing,
    Recalculating,
    Aftermath,
    RunningFollowup,
    Finished,
}

/// One atomic batch of actions plus its resolution bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// The batch, in resolution order. Follow-ups are appended.
    pub actions: Vec<GameAction>,

    /// One flag per cost index: did that group survive step 3?
    pub cost_completions: Vec<bool>,

    /// Chained phasing timing, when step 8 produced one.
    pub followup: Option<Box<Timing>>,

    /// Prediction runs mutate state for a legality search; win/loss,
    /// triggers, phasing and the global event log are suppressed.
    pub prediction: bool,

    /// Events produced by this timing, in order.
    events: Vec<GameEvent>,

    /// Indexes into `actions`, in execution order.
    executed_order: Vec<usize>,

    /// Tie-break answers for recalculation, consumed in encounter order.
    supplied_orders: Vec<Vec<usize>>,

    interceptors: Vec<Interceptor>,
    pre_active: Vec<AbilityId>,
    satisfied_triggers: Vec<usize>,
    pending: Option<Request>,
    stage: Stage,
    successful: bool,
    undone: bool,
}

impl Timing {
    /// Build a timing over a batch of actions.
    #[must_use]
    pub fn new(actions: Vec<GameAction>, prediction: bool) -> Self {
        let groups = actions.iter().map(|a| a.cost_index + 1).max().unwrap_or(0);
        Self {
            actions,
            cost_completions: vec![false; groups],
            followup: None,
            prediction,
            events: Vec::new(),
            executed_order: Vec::new(),
            supplied_orders: Vec::new(),
            interceptors: Vec::new(),
            pre_active: Vec::new(),
            satisfied_triggers: Vec::new(),
            pending: None,
            stage: Stage::Built,
            successful: false,
            undone: false,
        }
    }

    /// Did the timing resolve with at least one executed action group?
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Has the machine reached its terminal state?
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// The request the timing is suspended on, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<&Request> {
        self.pending.as_ref()
    }

    /// Events this timing produced, in order.
    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Start resolving. Valid once, on a freshly built timing.
    pub fn run(&mut self, game: &mut GameState) -> Result<TimingStep, EngineError> {
        if self.stage != Stage::Built {
            return Err(ProtocolError::AlreadyFinished.into());
        }
        game.timing_index += 1;
        self.pre_active = active_ability_ids(game);

        self.cancel_impossible(game);
        self.capture_interceptors(game);
        self.stage = Stage::Intercepting {
            interceptor: 0,
            action: 0,
        };
        self.drive(game)
    }

    /// Resume a suspended timing with the caller's answer.
    pub fn resume(
        &mut self,
        game: &mut GameState,
        response: Response,
    ) -> Result<TimingStep, EngineError> {
        let Some(request) = self.pending.take() else {
            return Err(ProtocolError::NotSuspended.into());
        };
        if let Err(e) = request.validate(&response) {
            self.pending = Some(request);
            return Err(e.into());
        }

        match self.stage.clone() {
            Stage::Intercepting {
                interceptor,
                action,
            } => {
                if let Response::Confirm(true) = response {
                    self.apply_interception(game, interceptor, action);
                }
                self.stage = Stage::Intercepting {
                    interceptor,
                    action: action + 1,
                };
                self.drive(game)
            }
            Stage::RunningFollowup => {
                let followup = self
                    .followup
                    .as_mut()
                    .ok_or(ProtocolError::NotSuspended)?;
                match followup.resume(game, response)? {
                    TimingStep::NeedsInput(request) => {
                        self.pending = Some(request.clone());
                        Ok(TimingStep::NeedsInput(request))
                    }
                    TimingStep::Done => {
                        self.finish();
                        Ok(TimingStep::Done)
                    }
                }
            }
            Stage::Recalculating => {
                let Response::Order(order) = response else {
                    return Err(ProtocolError::WrongResponseKind {
                        expected: "choose-order",
                        got: "other",
                    }
                    .into());
                };
                self.supplied_orders.push(order);
                self.drive(game)
            }
            _ => Err(ProtocolError::NotSuspended.into()),
        }
    }

    /// Reverse steps 4 to 6. Valid exactly once, immediately after a
    /// successful run, innermost timing first.
    pub fn undo(&mut self, game: &mut GameState) -> Result<(), EngineError> {
        if !self.successful || self.undone || self.stage != Stage::Finished {
            return Err(ProtocolError::UndoNotAvailable.into());
        }
        self.undone = true;

        if let Some(followup) = self.followup.as_mut() {
            followup.undo(game)?;
        }
        for &i in self.executed_order.iter().rev() {
            self.actions[i].undo(game);
        }
        for &t in &self.satisfied_triggers {
            if let Some(watch) = game.triggers.get_mut(t) {
                watch.satisfied = false;
            }
        }
        recalculate_silently(game, &self.supplied_orders);
        game.timing_index -= 1;
        Ok(())
    }

    fn drive(&mut self, game: &mut GameState) -> Result<TimingStep, EngineError> {
        loop {
            match self.stage.clone() {
                Stage::Intercepting {
                    mut interceptor,
                    mut action,
                } => {
                    while interceptor < self.interceptors.len() {
                        if action >= self.actions.len() {
                            interceptor += 1;
                            action = 0;
                            continue;
                        }
                        if self.interception_matches(game, interceptor, action) {
                            let (optional, chooser, subject) = {
                                let it = &self.interceptors[interceptor];
                                let StaticKind::ActionInterception { optional, .. } = &it.kind
                                else {
                                    action += 1;
                                    continue;
                                };
                                (*optional, it.controller, it.source)
                            };
                            if optional {
                                self.stage = Stage::Intercepting {
                                    interceptor,
                                    action,
                                };
                                let request = Request::Confirm {
                                    chooser,
                                    subject: Some(subject),
                                };
                                self.pending = Some(request.clone());
                                return Ok(TimingStep::NeedsInput(request));
                            }
                            self.apply_interception(game, interceptor, action);
                        }
                        action += 1;
                    }
                    self.stage = Stage::Executing;
                }

                Stage::Executing => {
                    self.resolve_costs(game);
                    if !self.actions.is_empty()
                        && self
                            .actions
                            .iter()
                            .all(|a| a.status == ActionStatus::Cancelled)
                    {
                        // Unsuccessful: not recorded as having run.
                        game.timing_index -= 1;
                        self.stage = Stage::Finished;
                        return Ok(TimingStep::Done);
                    }
                    self.execute_batch(game);
                    self.run_followup_actions(game);
                    self.stage = Stage::Recalculating;
                }

                Stage::Recalculating => {
                    match crate::statics::recalculate(game, &self.supplied_orders, true) {
                        RecalcOutcome::Done(value_events) => {
                            for event in value_events {
                                self.record_event(game, event);
                            }
                            self.stage = Stage::Aftermath;
                        }
                        RecalcOutcome::NeedsOrder { chooser, sources } => {
                            let request = Request::ChooseOrder {
                                chooser,
                                items: sources,
                            };
                            self.pending = Some(request.clone());
                            return Ok(TimingStep::NeedsInput(request));
                        }
                    }
                }

                Stage::Aftermath => {
                    if !self.prediction {
                        self.check_loss(game);
                        self.check_triggers(game);
                        if active_ability_ids(game) != self.pre_active {
                            self.followup = Some(Box::new(Timing::new(Vec::new(), false)));
                            self.stage = Stage::RunningFollowup;
                            continue;
                        }
                    }
                    self.finish();
                    return Ok(TimingStep::Done);
                }

                Stage::RunningFollowup => {
                    let followup = self
                        .followup
                        .as_mut()
                        .ok_or(ProtocolError::NotSuspended)?;
                    match followup.run(game)? {
                        TimingStep::NeedsInput(request) => {
                            self.pending = Some(request.clone());
                            return Ok(TimingStep::NeedsInput(request));
                        }
                        TimingStep::Done => {
                            self.finish();
                            return Ok(TimingStep::Done);
                        }
                    }
                }

                Stage::Built | Stage::Finished => {
                    return Err(ProtocolError::AlreadyFinished.into());
                }
            }
        }
    }

    fn finish(&mut self) {
        self.successful = true;
        self.stage = Stage::Finished;
    }

    /// Step 1: cancel impossible actions, linked partners included.
    fn cancel_impossible(&mut self, game: &GameState) {
        let impossible: Vec<usize> = (0..self.actions.len())
            .filter(|&i| {
                self.actions[i].status == ActionStatus::Pending
                    && self.actions[i].is_impossible(game)
            })
            .collect();
        for i in impossible {
            self.cancel_linked(i);
        }
    }

    /// Cancel an action together with everything linked to it through
    /// destroy backing, in both directions, to a fixpoint.
    fn cancel_linked(&mut self, index: usize) {
        let mut queue: Vec<usize> = vec![index];
        while let Some(i) = queue.pop() {
            if self.actions[i].status == ActionStatus::Cancelled {
                continue;
            }
            self.actions[i].cancel();
            let cancelled_id = self.actions[i].id;

            if let ActionKind::Destroy {
                backing: Some(backing),
                ..
            } = self.actions[i].kind
            {
                if let Some(j) = self.actions.iter().position(|a| a.id == backing) {
                    queue.push(j);
                }
            }
            for (j, other) in self.actions.iter().enumerate() {
                if let ActionKind::Destroy {
                    backing: Some(backing),
                    ..
                } = other.kind
                {
                    if backing == cancelled_id {
                        queue.push(j);
                    }
                }
            }
        }
    }

    /// Step 2 setup: snapshot the active interception statics in
    /// zone-entry order.
    fn capture_interceptors(&mut self, game: &GameState) {
        let mut interceptors: Vec<Interceptor> = game
            .statics
            .iter()
            .filter(|s| {
                s.is_active(game) && matches!(s.kind, StaticKind::ActionInterception { .. })
            })
            .map(|s| Interceptor {
                source: s.source,
                controller: s.controller,
                kind: s.kind.clone(),
                entered_at: game
                    .card(s.source)
                    .map(|c| c.entered_zone_at)
                    .unwrap_or(0),
            })
            .collect();
        interceptors.sort_by_key(|i| (i.entered_at, i.source.0));
        self.interceptors = interceptors;
    }

    fn interception_matches(&self, game: &GameState, interceptor: usize, action: usize) -> bool {
        let it = &self.interceptors[interceptor];
        let target = &self.actions[action];
        if target.status != ActionStatus::Pending {
            return false;
        }
        let StaticKind::ActionInterception { matches, .. } = &it.kind else {
            return false;
        };
        matches.matches(it.controller, target, game)
    }

    fn apply_interception(&mut self, _game: &mut GameState, interceptor: usize, action: usize) {
        let StaticKind::ActionInterception { effect, .. } = self.interceptors[interceptor].kind.clone()
        else {
            return;
        };
        match effect {
            InterceptionEffect::Cancel => self.cancel_linked(action),
            InterceptionEffect::CapDamage(cap) => {
                if let ActionKind::Damage { amount, .. } = &mut self.actions[action].kind {
                    *amount = (*amount).min(cap);
                }
            }
        }
    }

    /// Step 3: a cost group survives iff every member is pending and
    /// fully possible; otherwise the whole group is cancelled.
    fn resolve_costs(&mut self, game: &GameState) {
        for group in 0..self.cost_completions.len() {
            let members: Vec<usize> = (0..self.actions.len())
                .filter(|&i| self.actions[i].cost_index == group)
                .collect();
            if members.is_empty() {
                continue;
            }
            let ok = members.iter().all(|&i| {
                self.actions[i].status == ActionStatus::Pending
                    && self.actions[i].is_fully_possible(game)
            });
            self.cost_completions[group] = ok;
            if !ok {
                for &i in &members {
                    self.cancel_linked(i);
                }
            }
        }
    }

    /// Step 4: execute surviving actions in original order.
    fn execute_batch(&mut self, game: &mut GameState) {
        for i in 0..self.actions.len() {
            if self.actions[i].status != ActionStatus::Pending {
                continue;
            }
            let event = self.actions[i].execute(game);
            self.executed_order.push(i);
            if let Some(event) = event {
                self.record_event(game, event);
            }
        }
    }

    /// Step 5: derive follow-ups from what just happened and execute
    /// them in the same pass, until none are generated.
    fn run_followup_actions(&mut self, game: &mut GameState) {
        let mut scan_from = 0;
        loop {
            let followups = self.derive_followups(game, scan_from);
            scan_from = self.events.len();
            if followups.is_empty() {
                return;
            }
            for followup in followups {
                match followup {
                    Followup::Plain(kind) => {
                        self.push_and_execute(game, kind);
                    }
                    Followup::DestroyEquipment(card) => {
                        let backing = self.push_and_execute(game, ActionKind::Discard { card });
                        self.push_and_execute(
                            game,
                            ActionKind::Destroy {
                                card,
                                backing: Some(backing),
                            },
                        );
                    }
                }
            }
        }
    }

    /// Append a follow-up action in its own group and execute it unless
    /// impossible. Returns the new action's id.
    fn push_and_execute(&mut self, game: &mut GameState, kind: ActionKind) -> ActionId {
        let group = self.cost_completions.len();
        self.cost_completions.push(true);
        let mut action = GameAction::new(game, kind, group);
        let id = action.id;
        if action.is_impossible(game) {
            action.cancel();
            self.actions.push(action);
            return id;
        }
        let index = self.actions.len();
        let event = action.execute(game);
        self.actions.push(action);
        self.executed_order.push(index);
        if let Some(event) = event {
            self.record_event(game, event);
        }
        id
    }

    fn derive_followups(&self, game: &GameState, scan_from: usize) -> Vec<Followup> {
        let mut followups: Vec<Followup> = Vec::new();
        let mut shuffled: Vec<PlayerId> = Vec::new();
        let mut revealed: SmallVec<[CardId; 4]> = SmallVec::new();

        for event in &self.events[scan_from..] {
            if let GameEvent::CardMoved {
                card,
                from_zone,
                to_owner,
                to_zone,
                ..
            } = event
            {
                // A card lifted out of a deck into a hand is shown to
                // everyone; a deck that received cards gets reshuffled.
                if *from_zone == ZoneKind::Deck && *to_zone == ZoneKind::Hand {
                    revealed.push(*card);
                }
                if *to_zone == ZoneKind::Deck && !shuffled.contains(to_owner) {
                    shuffled.push(*to_owner);
                }
            }
        }

        if !revealed.is_empty() {
            followups.push(Followup::Plain(ActionKind::Reveal { cards: revealed }));
        }
        for player in shuffled {
            followups.push(Followup::Plain(ActionKind::ShuffleDeck { player }));
        }

        // Equipment whose host left the field is destroyed.
        for id in game.card_ids() {
            let Some(card) = game.card(id) else { continue };
            let orphaned = card.on_field()
                && card
                    .attached_to
                    .is_some_and(|host| !game.card(host).is_some_and(|h| h.on_field()));
            if orphaned {
                followups.push(Followup::DestroyEquipment(id));
            }
        }

        followups
            .into_iter()
            .filter(|f| !self.already_has(f))
            .collect()
    }

    /// Is a follow-up already represented in the batch? Keeps the
    /// fixpoint iteration from generating the same action twice.
    fn already_has(&self, followup: &Followup) -> bool {
        self.actions.iter().any(|a| match (followup, &a.kind) {
            (Followup::DestroyEquipment(card), ActionKind::Destroy { card: c, .. }) => card == c,
            (Followup::Plain(kind), other) => kind == other,
            _ => false,
        })
    }

    /// Step 7: losses and trigger satisfaction.
    fn check_loss(&mut self, game: &mut GameState) {
        for player in PlayerId::all(game.player_count()) {
            let values = &game.players[player];
            let lost = values.current.contains_key("life") && values.value("life", 0) <= 0;
            let already = self
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::PlayerLost { player: p } if *p == player));
            if lost && !already {
                self.record_event(game, GameEvent::PlayerLost { player });
            }
        }
    }

    fn check_triggers(&mut self, game: &mut GameState) {
        for (i, watch) in game.triggers.iter_mut().enumerate() {
            if watch.satisfied {
                continue;
            }
            if self.events.iter().any(|e| e.category() == watch.on) {
                watch.satisfied = true;
                self.satisfied_triggers.push(i);
            }
        }
    }

    fn record_event(&mut self, game: &mut GameState, event: GameEvent) {
        if !self.prediction {
            game.emit(event.clone());
        }
        self.events.push(event);
    }
}

fn active_ability_ids(game: &GameState) -> Vec<AbilityId> {
    game.statics
        .iter()
        .filter(|s| s.is_active(game))
        .map(|s| s.ability)
        .collect()
}

/// Recalculate without reporting events, answering any tie-break the
/// tape does not cover with encounter order. Used by undo, which must
/// not suspend.
fn recalculate_silently(game: &mut GameState, supplied_orders: &[Vec<usize>]) {
    let mut tape = supplied_orders.to_vec();
    loop {
        match crate::statics::recalculate(game, &tape, false) {
            RecalcOutcome::Done(_) => return,
            RecalcOutcome::NeedsOrder { sources, .. } => {
                tape.push((0..sources.len()).collect());
            }
        }
    }
}
