//! The script syntax tree.
//!
//! Nodes are immutable once built and shared behind [`Arc`]; the parser
//! builds a tree once per (ability, clause) and the [`AstCache`] hands
//! the same tree back for the lifetime of the process. Operator arity
//! is checked at construction and each node carries a statically
//! inferred return kind, so the evaluators never re-validate shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, CardType, ValueKind, ZoneKind};
use crate::error::ScriptError;

/// Which clause of an ability a tree implements. Part of the cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseKind {
    Cost,
    Effect,
    Condition,
    Target,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Whose cards or players a matcher ranges over, relative to the
/// script's controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerScope {
    Mine,
    Opponents,
    Any,
}

/// How many cards a matcher selects from its candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountSpec {
    Exactly(usize),
    UpTo(usize),
    All,
}

/// A candidate filter inside a card matcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardFilter {
    OfType(CardType),
    ValueAtLeast { key: String, min: i64 },
    /// An arbitrary predicate over the bound candidate card. Must be
    /// deterministic; a filter with more than one outcome is a script
    /// error.
    Where(Arc<AstNode>),
}

/// The scripting language's builtin verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    /// `DRAW(n)`: strict; fails as a whole when the deck is short.
    Draw,
    /// `DRAWUPTO(n)`: draws what is there.
    DrawUpTo,
    Discard,
    Destroy,
    Damage,
    GainLife,
    /// `MOVE(cards, zone)`.
    MoveCards,
    Reveal,
    /// `COUNT(set)`: pure, no actions produced.
    Count,
}

impl FunctionKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Draw => "DRAW",
            FunctionKind::DrawUpTo => "DRAWUPTO",
            FunctionKind::Discard => "DISCARD",
            FunctionKind::Destroy => "DESTROY",
            FunctionKind::Damage => "DAMAGE",
            FunctionKind::GainLife => "GAINLIFE",
            FunctionKind::MoveCards => "MOVE",
            FunctionKind::Reveal => "REVEAL",
            FunctionKind::Count => "COUNT",
        }
    }

    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            FunctionKind::Draw
            | FunctionKind::DrawUpTo
            | FunctionKind::Discard
            | FunctionKind::Destroy
            | FunctionKind::GainLife
            | FunctionKind::Reveal
            | FunctionKind::Count => 1,
            FunctionKind::Damage | FunctionKind::MoveCards => 2,
        }
    }

    /// What a call to this function evaluates to.
    #[must_use]
    pub fn return_kind(self) -> ValueKind {
        match self {
            FunctionKind::Draw
            | FunctionKind::DrawUpTo
            | FunctionKind::Discard
            | FunctionKind::Destroy
            | FunctionKind::MoveCards
            | FunctionKind::Reveal => ValueKind::CardSet,
            FunctionKind::Damage | FunctionKind::GainLife | FunctionKind::Count => {
                ValueKind::Number
            }
        }
    }
}

/// A script expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AstNode {
    Number(i64),
    Bool(bool),
    ZoneLiteral(ZoneKind),
    TypeLiteral(CardType),

    /// The card the script is printed on.
    SelfCard,
    /// The implicitly bound card (inside a `where` clause).
    BoundCard,
    /// The implicitly bound player.
    BoundPlayer,

    Unary {
        op: UnaryOp,
        child: Arc<AstNode>,
    },
    Binary {
        op: BinaryOp,
        left: Arc<AstNode>,
        right: Arc<AstNode>,
    },

    /// `[from <zones> where ...]`: gather candidates, then select per
    /// the count spec. Selection is a suspension point unless forced.
    CardMatch {
        owner: OwnerScope,
        zones: Vec<ZoneKind>,
        filters: Vec<CardFilter>,
        count: CountSpec,
    },

    /// Pick one player from the scope. A suspension point unless the
    /// scope has a single member.
    SelectPlayer {
        scope: OwnerScope,
    },

    /// `$name = value`: evaluated once, memoized on the ability.
    Assign {
        name: String,
        value: Arc<AstNode>,
    },
    /// `$name`: reading before assignment is a fatal script error.
    Variable {
        name: String,
        kind: ValueKind,
    },

    /// Expressions in order; evaluates to the last one's value.
    Sequence {
        nodes: Vec<Arc<AstNode>>,
    },

    /// A builtin verb. The one place actions and further suspension
    /// are introduced.
    Call {
        function: FunctionKind,
        args: Vec<Arc<AstNode>>,
        both_players: bool,
    },
}

impl AstNode {
    /// Build a function call, checking arity.
    pub fn call(
        function: FunctionKind,
        args: Vec<Arc<AstNode>>,
        both_players: bool,
    ) -> Result<Self, ScriptError> {
        if args.len() != function.arity() {
            return Err(ScriptError::WrongArity {
                function: function.name(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(AstNode::Call {
            function,
            args,
            both_players,
        })
    }

    /// The statically inferred kind of value this node produces.
    #[must_use]
    pub fn return_kind(&self) -> ValueKind {
        match self {
            AstNode::Number(_) => ValueKind::Number,
            AstNode::Bool(_) => ValueKind::Bool,
            AstNode::ZoneLiteral(_) => ValueKind::ZoneSet,
            AstNode::TypeLiteral(_) => ValueKind::TypeSet,
            AstNode::SelfCard | AstNode::BoundCard | AstNode::CardMatch { .. } => {
                ValueKind::CardSet
            }
            AstNode::BoundPlayer | AstNode::SelectPlayer { .. } => ValueKind::PlayerSet,
            AstNode::Unary { op, .. } => match op {
                UnaryOp::Not => ValueKind::Bool,
                UnaryOp::Negate => ValueKind::Number,
            },
            AstNode::Binary { op, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => ValueKind::Number,
                _ => ValueKind::Bool,
            },
            AstNode::Assign { value, .. } => value.return_kind(),
            AstNode::Variable { kind, .. } => *kind,
            AstNode::Sequence { nodes } => nodes
                .last()
                .map(|n| n.return_kind())
                .unwrap_or(ValueKind::Bool),
            AstNode::Call { function, .. } => function.return_kind(),
        }
    }
}

/// Built trees, memoized per (ability, clause). The evaluator never
/// re-parses.
#[derive(Clone, Debug, Default)]
pub struct AstCache {
    trees: rustc_hash::FxHashMap<(AbilityId, ClauseKind), Arc<AstNode>>,
}

impl AstCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached tree, building it on first use. The builder's
    /// error (a malformed script) is not cached; a broken clause fails
    /// on every fetch.
    pub fn get_or_build(
        &mut self,
        ability: AbilityId,
        clause: ClauseKind,
        build: impl FnOnce() -> Result<AstNode, ScriptError>,
    ) -> Result<Arc<AstNode>, ScriptError> {
        if let Some(tree) = self.trees.get(&(ability, clause)) {
            return Ok(Arc::clone(tree));
        }
        let tree = Arc::new(build()?);
        self.trees.insert((ability, clause), Arc::clone(&tree));
        Ok(tree)
    }

    /// A cached tree, if one has been built.
    #[must_use]
    pub fn get(&self, ability: AbilityId, clause: ClauseKind) -> Option<Arc<AstNode>> {
        self.trees.get(&(ability, clause)).cloned()
    }
}
