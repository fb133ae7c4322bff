//! Expression tree representation.
//!
//! A tree is a dense array of nodes numbered in post-order: every child has a
//! smaller index than its parent and the top of the tree is the last node.
//! Children are stored as indices into the same array, so there is no
//! sharing and no cycles to worry about once a tree has been validated.

use core::fmt;

use crate::concept::ConceptRef;
use crate::error::TreeError;
use crate::equality;

/// Index of a node within its tree.
pub type NodeIndex = usize;

/// The kind of a node, including its payload.
///
/// This is the node's label for matching purposes: two nodes can only be
/// paired when their `NodeKind`s are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    /// Top of a logical definition.
    Root,
    /// Necessary-condition set.
    NecessarySet,
    /// Sufficient-condition set.
    SufficientSet,
    /// Conjunction; children are unordered.
    And,
    /// Existential role restriction (∃role.filler).
    SomeRole {
        /// The role type.
        role: ConceptRef,
    },
    /// Concept assertion leaf.
    Concept {
        /// The asserted concept.
        concept: ConceptRef,
    },
}

impl NodeKind {
    /// Human-readable name of the kind, without payload.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::NecessarySet => "NecessarySet",
            NodeKind::SufficientSet => "SufficientSet",
            NodeKind::And => "And",
            NodeKind::SomeRole { .. } => "SomeRole",
            NodeKind::Concept { .. } => "Concept",
        }
    }

    /// How many children a node of this kind takes.
    pub const fn arity(&self) -> Arity {
        match self {
            NodeKind::Concept { .. } => Arity::None,
            NodeKind::And => Arity::AtLeastOne,
            _ => Arity::ExactlyOne,
        }
    }

    /// Whether this kind is a leaf.
    pub const fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Concept { .. })
    }

    /// The concept payload: the asserted concept or the role type.
    pub const fn payload(&self) -> Option<ConceptRef> {
        match *self {
            NodeKind::SomeRole { role } => Some(role),
            NodeKind::Concept { concept } => Some(concept),
            _ => None,
        }
    }
}

/// Number of children a node kind admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Leaf.
    None,
    /// Exactly one child.
    ExactlyOne,
    /// One or more children.
    AtLeastOne,
}

impl Arity {
    /// Whether `count` children are acceptable.
    pub const fn admits(self, count: usize) -> bool {
        match self {
            Arity::None => count == 0,
            Arity::ExactlyOne => count == 1,
            Arity::AtLeastOne => count >= 1,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arity::None => "none",
            Arity::ExactlyOne => "exactly one",
            Arity::AtLeastOne => "at least one",
        })
    }
}

/// A node of an [`ExpressionTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionNode {
    /// Position of this node in its tree.
    pub index: NodeIndex,
    /// Kind and payload.
    pub kind: NodeKind,
    /// Child indices, in display order. Order is insignificant for `And`.
    pub children: Vec<NodeIndex>,
}

impl ExpressionNode {
    /// Create a node.
    pub fn new(index: NodeIndex, kind: NodeKind, children: Vec<NodeIndex>) -> Self {
        Self {
            index,
            kind,
            children,
        }
    }

    /// Create a concept leaf.
    pub fn concept(index: NodeIndex, concept: ConceptRef) -> Self {
        Self::new(index, NodeKind::Concept { concept }, Vec::new())
    }
}

/// An immutable, validated expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionTree {
    nodes: Vec<ExpressionNode>,
    parents: Vec<Option<NodeIndex>>,
    sizes: Vec<usize>,
}

impl ExpressionTree {
    /// Validate `nodes` and wrap them in a tree.
    ///
    /// See [`TreeError`] for everything that is rejected.
    pub fn from_nodes(nodes: Vec<ExpressionNode>) -> Result<Self, TreeError> {
        let parents = link(&nodes)?;
        let sizes = subtree_sizes(&nodes);
        Ok(Self {
            nodes,
            parents,
            sizes,
        })
    }

    /// Index of the top node (always the last one).
    pub fn root(&self) -> NodeIndex {
        self.nodes.len() - 1
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: validated trees have at least one node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn node(&self, index: NodeIndex) -> &ExpressionNode {
        &self.nodes[index]
    }

    /// Get a node, or `None` if `index` is out of range.
    pub fn get(&self, index: NodeIndex) -> Option<&ExpressionNode> {
        self.nodes.get(index)
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> &[ExpressionNode] {
        &self.nodes
    }

    /// Kind of a node.
    pub fn kind(&self, index: NodeIndex) -> NodeKind {
        self.nodes[index].kind
    }

    /// Parent of a node, `None` for the top.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.parents[index]
    }

    /// Children of a node in display order.
    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.nodes[index].children
    }

    /// Number of nodes in the subtree rooted at `index`, itself included.
    pub fn subtree_size(&self, index: NodeIndex) -> usize {
        self.sizes[index]
    }

    /// Distance from `index` to its furthest leaf.
    pub fn height(&self, index: NodeIndex) -> usize {
        self.children(index)
            .iter()
            .map(|&c| 1 + self.height(c))
            .max()
            .unwrap_or(0)
    }

    /// The subtree rooted at `index` in pre-order, `index` first.
    pub fn descendants(&self, index: NodeIndex) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![index],
        }
    }

    /// Indices of all concept leaves, ascending.
    pub fn concepts(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.kind.is_leaf())
            .map(|n| n.index)
    }

    /// Whether two whole expressions are equal under unordered `And`
    /// semantics.
    pub fn structurally_equal(&self, other: &ExpressionTree) -> bool {
        equality::nodes_equal(self, self.root(), other, other.root())
    }
}

/// Check every structural invariant and compute the parent links.
fn link(nodes: &[ExpressionNode]) -> Result<Vec<Option<NodeIndex>>, TreeError> {
    if nodes.is_empty() {
        return Err(TreeError::Empty);
    }
    let len = nodes.len();
    let mut parents: Vec<Option<NodeIndex>> = vec![None; len];

    for (position, node) in nodes.iter().enumerate() {
        if node.index != position {
            return Err(TreeError::IndexMismatch {
                position,
                index: node.index,
            });
        }
        let expected = node.kind.arity();
        if !expected.admits(node.children.len()) {
            return Err(TreeError::Arity {
                node: position,
                kind: node.kind.name(),
                expected,
                found: node.children.len(),
            });
        }
        for &child in &node.children {
            if child >= len {
                return Err(TreeError::ChildOutOfRange {
                    node: position,
                    child,
                    len,
                });
            }
            if child >= position {
                return Err(TreeError::NotPostOrder {
                    node: position,
                    child,
                });
            }
            if let Some(first_parent) = parents[child] {
                return Err(TreeError::SharedChild {
                    child,
                    first_parent,
                    second_parent: position,
                });
            }
            parents[child] = Some(position);
        }
    }

    let top = len - 1;
    for (index, parent) in parents.iter().enumerate() {
        match *parent {
            None if index != top => return Err(TreeError::MultipleTops { node: index, top }),
            Some(parent) if nodes[index].kind == NodeKind::Root => {
                return Err(TreeError::NestedRoot {
                    node: index,
                    parent,
                });
            }
            _ => {}
        }
    }

    Ok(parents)
}

fn subtree_sizes(nodes: &[ExpressionNode]) -> Vec<usize> {
    let mut sizes = vec![1; nodes.len()];
    // children precede parents, so one ascending pass suffices
    for node in nodes {
        sizes[node.index] += node.children.iter().map(|&c| sizes[c]).sum::<usize>();
    }
    sizes
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    tree: &'a ExpressionTree,
    stack: Vec<NodeIndex>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        // reversed so children come out in display order
        self.stack
            .extend(self.tree.children(index).iter().rev().copied());
        Some(index)
    }
}
