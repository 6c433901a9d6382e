//! Actions, events and the timing state machine.
//!
//! An [`Action`](GameAction) is a single reversible state mutation; a
//! [`Timing`] resolves an ordered batch of them as one atomic step and
//! can undo a successful run exactly once. Each executed action yields
//! at most one [`GameEvent`] for presentation layers.

mod action;
mod event;
mod machine;

pub use action::{ActionId, ActionKind, ActionStatus, GameAction, TargetRef};
pub use event::{EventCategory, GameEvent};
pub use machine::{Timing, TimingStep};
