//! # ccg-rules
//!
//! A card-game rules core: scripted effects, atomic action batches,
//! speculative legality search, and ordered static abilities.
//!
//! ## Design Principles
//!
//! 1. **Explicit Suspension**: Anything that needs a player decision
//!    returns a request and resumes with a response. No coroutines,
//!    no callbacks; every suspended computation is a plain value that
//!    can be cloned, stored, or discarded.
//!
//! 2. **Rewindable Mutation**: Actions execute against the real state
//!    and carry the snapshots needed to undo. Speculation is real
//!    execution in prediction mode plus rewind, not a parallel
//!    simulation path.
//!
//! 3. **Recompute Over Cache**: Card and player values are rebuilt
//!    from their initial values every recalculation; static-ability
//!    ordering is re-derived every pass.
//!
//! ## Modules
//!
//! - `core`: Entity IDs, players, cards, zones, values, RNG, game state
//! - `script`: Effect AST, resumable evaluator, exhaustive enumeration
//! - `timing`: Actions, events, and the atomic batch state machine
//! - `search`: Option-tree legality search in prediction mode
//! - `statics`: Static abilities, ordering, value recalculation
//! - `error`: Script and protocol error classes

pub mod core;
pub mod error;
pub mod script;
pub mod search;
pub mod statics;
pub mod timing;

// Re-export commonly used types
pub use crate::core::{
    AbilityId, Card, CardId, CardType, GameRng, GameRngState, GameState, PlayerId, PlayerMap,
    ScriptItem, ScriptValue, ValueKind, ValueModification, ValueOp, ZoneKind, ZonePosition, Zones,
};

pub use crate::error::{EngineError, ProtocolError, ScriptError};

pub use crate::script::{
    AstCache, AstNode, BinaryOp, BindingKind, Bindings, CardFilter, ClauseKind, CountSpec,
    EvalStep, Evaluator, FunctionKind, OwnerScope, Request, Response, ScriptContext, UnaryOp,
    eval_full, has_all_targets,
};

pub use crate::timing::{
    ActionId, ActionKind, ActionStatus, EventCategory, GameAction, GameEvent, TargetRef, Timing,
    TimingStep,
};

pub use crate::search::{OptionNode, OptionNodeId, OptionTree, can_succeed, search};

pub use crate::statics::{
    ActionMatcher, ActionVerb, ControllerScope, InterceptionEffect, OrderingOutcome,
    RecalcOutcome, StaticAbility, StaticKind, StaticTarget, order_statics, recalculate,
};
