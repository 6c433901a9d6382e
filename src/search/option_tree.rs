//! Arena-based option tree.
//!
//! Uses a flat `Vec<OptionNode>` with index-based references. The tree
//! records one legality query's explored response space and is
//! discarded when the query is answered.

use serde::{Deserialize, Serialize};

use crate::script::Response;

/// Index of a node in an [`OptionTree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionNodeId(pub u32);

impl OptionNodeId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// One explored position in a legality search.
///
/// The root carries no choice; every other node carries the response
/// that was fed in to reach it from its parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionNode {
    /// Parent node, `None` for the root.
    pub parent: Option<OptionNodeId>,

    /// The response that led here from the parent.
    pub choice: Option<Response>,

    /// Child nodes, one per response tried at this position.
    pub children: Vec<OptionNodeId>,

    /// Whether some completion below this node satisfies the query.
    pub valid: bool,
}

impl OptionNode {
    /// The root position, before any response has been supplied.
    #[must_use]
    pub fn root() -> Self {
        Self {
            parent: None,
            choice: None,
            children: Vec::new(),
            valid: false,
        }
    }

    /// A position reached by feeding `choice` at `parent`.
    #[must_use]
    pub fn child(parent: OptionNodeId, choice: Response) -> Self {
        Self {
            parent: Some(parent),
            choice: Some(choice),
            children: Vec::new(),
            valid: false,
        }
    }
}

/// Arena holding one legality query's search tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionTree {
    nodes: Vec<OptionNode>,
    root: OptionNodeId,
}

impl OptionTree {
    /// Create a tree holding only the root position.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![OptionNode::root()],
            root: OptionNodeId::new(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    #[must_use]
    pub fn root(&self) -> OptionNodeId {
        self.root
    }

    /// Get a node by ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: OptionNodeId) -> &OptionNode {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: OptionNodeId) -> &mut OptionNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node, returning its ID. The parent's child list
    /// is updated here so the two always agree.
    pub fn alloc(&mut self, node: OptionNode) -> OptionNodeId {
        let id = OptionNodeId::new(self.nodes.len() as u32);
        let parent = node.parent;
        self.nodes.push(node);
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        id
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the query has some satisfying completion.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.get(self.root).valid
    }

    /// The chain of responses from the root down to `id`.
    #[must_use]
    pub fn responses_to(&self, id: OptionNodeId) -> Vec<Response> {
        let mut path = Vec::new();
        let mut cursor = id;
        loop {
            let node = self.get(cursor);
            if let Some(choice) = &node.choice {
                path.push(choice.clone());
            }
            match node.parent {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }
}

impl Default for OptionTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Response;

    #[test]
    fn test_tree_new() {
        let tree = OptionTree::new();

        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert_eq!(tree.root(), OptionNodeId::new(0));
        assert!(!tree.is_valid());
    }

    #[test]
    fn test_alloc_links_parent_and_child() {
        let mut tree = OptionTree::new();

        let child = tree.alloc(OptionNode::child(tree.root(), Response::Confirm(true)));

        assert_eq!(child, OptionNodeId::new(1));
        assert_eq!(tree.get(tree.root()).children, vec![child]);
        assert_eq!(tree.get(child).parent, Some(tree.root()));
    }

    #[test]
    fn test_responses_to_walks_root_down() {
        let mut tree = OptionTree::new();
        let a = tree.alloc(OptionNode::child(tree.root(), Response::Confirm(true)));
        let b = tree.alloc(OptionNode::child(a, Response::Confirm(false)));

        assert_eq!(
            tree.responses_to(b),
            vec![Response::Confirm(true), Response::Confirm(false)]
        );
        assert_eq!(tree.responses_to(tree.root()), Vec::<Response>::new());
    }
}
