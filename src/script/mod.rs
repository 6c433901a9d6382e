//! The effect scripting layer.
//!
//! Card text compiles to [`AstNode`] trees, cached per ability and
//! clause in an [`AstCache`]. An [`Evaluator`] walks a tree as an
//! explicit frame machine so it can suspend mid-expression for player
//! input or action execution and be resumed, cloned, or discarded.
//! [`eval_full`] and [`has_all_targets`] reuse the same machine to
//! answer speculative questions without touching the real game.

mod ast;
mod context;
mod eval;
mod exhaustive;
mod functions;
mod request;

pub use ast::{
    AstCache, AstNode, BinaryOp, CardFilter, ClauseKind, CountSpec, FunctionKind, OwnerScope,
    UnaryOp,
};
pub use context::{BindingKind, Bindings, ScriptContext};
pub use eval::{EvalStep, Evaluator};
pub use exhaustive::{eval_full, has_all_targets};
pub use request::{Request, Response};
