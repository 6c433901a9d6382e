//! Error types.
//!
//! The engine distinguishes two classes of hard errors:
//!
//! - [`ScriptError`]: a broken script definition (unassigned variable,
//!   wrong arity, a read from an empty binding stack). These indicate a
//!   content bug and are never recovered from.
//! - [`ProtocolError`]: a caller supplied the wrong kind of response, an
//!   out-of-range choice, or resumed/undid something in the wrong state.
//!   These indicate a UI or driver bug.
//!
//! Rules-legal failures (an impossible action, an unpayable cost, a
//! vanished target) are *not* errors. They surface as ordinary return
//! values: `is_impossible`, an unsuccessful [`Timing`](crate::timing::Timing),
//! or an invalid legality search root.

use std::fmt;

use crate::core::ValueKind;
use crate::script::BindingKind;

/// A script definition error. Fatal; indicates broken card content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptError {
    /// A variable was read before any assignment ran.
    UnassignedVariable(String),
    /// A function call was built with the wrong number of arguments.
    WrongArity {
        function: &'static str,
        expected: usize,
        found: usize,
    },
    /// A sub-expression read an implicit binding while its stack was empty.
    EmptyBindingStack(BindingKind),
    /// An operator received a value of the wrong kind.
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    /// A filter expression produced more than one outcome; filters must
    /// be deterministic.
    NondeterministicFilter,
    /// An argument value was outside the domain a function accepts.
    InvalidArgument(&'static str),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::UnassignedVariable(name) => {
                write!(f, "variable ${name} read before assignment")
            }
            ScriptError::WrongArity {
                function,
                expected,
                found,
            } => write!(
                f,
                "function {function} takes {expected} argument(s), got {found}"
            ),
            ScriptError::EmptyBindingStack(kind) => {
                write!(f, "implicit {kind:?} binding read outside its scope")
            }
            ScriptError::TypeMismatch { expected, found } => {
                write!(f, "expected a {expected:?} value, found {found:?}")
            }
            ScriptError::NondeterministicFilter => {
                write!(f, "filter expression does not have a single outcome")
            }
            ScriptError::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// A request/response protocol violation. Fatal; indicates a driver bug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response does not match the pending request kind.
    WrongResponseKind {
        expected: &'static str,
        got: &'static str,
    },
    /// A chosen card/player was not among the offered candidates.
    ChoiceNotOffered,
    /// The number of chosen items is outside the request's bounds.
    ChoiceCountOutOfRange { min: usize, max: usize, got: usize },
    /// An ordering response was not a permutation of the offered items.
    NotAPermutation,
    /// A resume was attempted while nothing was suspended.
    NotSuspended,
    /// A step was attempted on a finished computation.
    AlreadyFinished,
    /// An undo was attempted on a timing that cannot be undone.
    UndoNotAvailable,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::WrongResponseKind { expected, got } => {
                write!(f, "expected a {expected} response, got {got}")
            }
            ProtocolError::ChoiceNotOffered => {
                write!(f, "choice references an item that was not offered")
            }
            ProtocolError::ChoiceCountOutOfRange { min, max, got } => {
                write!(f, "chose {got} item(s), allowed range is {min}..={max}")
            }
            ProtocolError::NotAPermutation => {
                write!(f, "ordering response is not a permutation of the offered items")
            }
            ProtocolError::NotSuspended => write!(f, "nothing is suspended"),
            ProtocolError::AlreadyFinished => write!(f, "computation already finished"),
            ProtocolError::UndoNotAvailable => {
                write!(f, "timing cannot be undone in its current state")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Umbrella error for engine entry points that can hit either class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    Script(ScriptError),
    Protocol(ProtocolError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Script(e) => write!(f, "script error: {e}"),
            EngineError::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Script(e) => Some(e),
            EngineError::Protocol(e) => Some(e),
        }
    }
}

impl From<ScriptError> for EngineError {
    fn from(e: ScriptError) -> Self {
        EngineError::Script(e)
    }
}

impl From<ProtocolError> for EngineError {
    fn from(e: ProtocolError) -> Self {
        EngineError::Protocol(e)
    }
}
