//! Cost legality search.
//!
//! Decides whether a scripted cost has some completion satisfying a
//! caller-supplied predicate, by depth-first search over every legal
//! response with state rewound on backtrack.

mod legality;
mod option_tree;

pub use legality::{can_succeed, search};
pub use option_tree::{OptionNode, OptionNodeId, OptionTree};
