//! Incremental construction of expression trees.
//!
//! Nodes are allocated in an `indextree` arena as the expression is
//! assembled, innermost operands first, and numbered in post-order when the
//! tree is finished.

use core::sync::atomic::{AtomicU64, Ordering};

use indextree::{Arena, NodeId};

use crate::concept::ConceptRef;
use crate::error::TreeError;
use crate::tree::{ExpressionNode, ExpressionTree, NodeIndex, NodeKind};

static NEXT_BUILDER: AtomicU64 = AtomicU64::new(0);

/// A node under construction, returned by the [`ExpressionBuilder`] methods.
///
/// A draft can be attached to exactly one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draft {
    node: NodeId,
    builder: u64,
}

/// Builds an [`ExpressionTree`] from the And / SomeRole / ConceptAssertion /
/// NecessarySet / SufficientSet grammar.
///
/// ```
/// use lexiso::{ConceptRef, ExpressionBuilder};
///
/// let finding_site = ConceptRef::from_u128(1);
/// let lung = ConceptRef::from_u128(2);
/// let disorder = ConceptRef::from_u128(3);
///
/// let mut b = ExpressionBuilder::new();
/// let site = b.concept(lung);
/// let group = b.some_role(finding_site, site)?;
/// let parent = b.concept(disorder);
/// let and = b.and([parent, group])?;
/// let set = b.necessary_set(and)?;
/// let root = b.root(set)?;
/// let tree = b.build(root)?;
///
/// assert_eq!(tree.len(), 6);
/// assert_eq!(tree.root(), 5);
/// # Ok::<(), lexiso::TreeError>(())
/// ```
#[derive(Debug)]
pub struct ExpressionBuilder {
    arena: Arena<NodeKind>,
    id: u64,
}

impl Default for ExpressionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            id: NEXT_BUILDER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A concept assertion leaf.
    pub fn concept(&mut self, concept: ConceptRef) -> Draft {
        let node = self.arena.new_node(NodeKind::Concept { concept });
        self.draft(node)
    }

    /// An existential role restriction over `filler`.
    pub fn some_role(&mut self, role: ConceptRef, filler: Draft) -> Result<Draft, TreeError> {
        self.attach(NodeKind::SomeRole { role }, &[filler])
    }

    /// A conjunction of `operands`.
    pub fn and(&mut self, operands: impl IntoIterator<Item = Draft>) -> Result<Draft, TreeError> {
        let operands: Vec<Draft> = operands.into_iter().collect();
        if operands.is_empty() {
            return Err(TreeError::EmptyConjunction);
        }
        self.attach(NodeKind::And, &operands)
    }

    /// A necessary-condition set around `expression`.
    pub fn necessary_set(&mut self, expression: Draft) -> Result<Draft, TreeError> {
        self.attach(NodeKind::NecessarySet, &[expression])
    }

    /// A sufficient-condition set around `expression`.
    pub fn sufficient_set(&mut self, expression: Draft) -> Result<Draft, TreeError> {
        self.attach(NodeKind::SufficientSet, &[expression])
    }

    /// The definition root above `set`.
    pub fn root(&mut self, set: Draft) -> Result<Draft, TreeError> {
        self.attach(NodeKind::Root, &[set])
    }

    /// Finish the tree with `top` as its parentless node.
    ///
    /// Every node created by this builder must hang below `top`.
    pub fn build(self, top: Draft) -> Result<ExpressionTree, TreeError> {
        self.check(top)?;
        if self.arena[top.node].parent().is_some() {
            return Err(TreeError::AlreadyAttached {
                kind: self.arena[top.node].get().name(),
            });
        }

        let mut nodes = Vec::with_capacity(self.arena.len());
        self.number(top.node, &mut nodes);

        let unattached = self.arena.len() - nodes.len();
        if unattached > 0 {
            return Err(TreeError::Unattached { count: unattached });
        }
        ExpressionTree::from_nodes(nodes)
    }

    /// Append `id`'s subtree to `nodes` in post-order, returning its index.
    fn number(&self, id: NodeId, nodes: &mut Vec<ExpressionNode>) -> NodeIndex {
        let children: Vec<NodeIndex> = id
            .children(&self.arena)
            .map(|child| self.number(child, nodes))
            .collect();
        let index = nodes.len();
        nodes.push(ExpressionNode::new(index, *self.arena[id].get(), children));
        index
    }

    fn attach(&mut self, kind: NodeKind, children: &[Draft]) -> Result<Draft, TreeError> {
        for (position, child) in children.iter().enumerate() {
            self.check(*child)?;
            let already_listed = children[..position].contains(child);
            if already_listed || self.arena[child.node].parent().is_some() {
                return Err(TreeError::AlreadyAttached {
                    kind: self.arena[child.node].get().name(),
                });
            }
        }

        let parent = self.arena.new_node(kind);
        for child in children {
            parent.append(child.node, &mut self.arena);
        }
        Ok(self.draft(parent))
    }

    fn check(&self, draft: Draft) -> Result<(), TreeError> {
        if draft.builder != self.id || self.arena.get(draft.node).is_none() {
            return Err(TreeError::UnknownHandle);
        }
        Ok(())
    }

    fn draft(&self, node: NodeId) -> Draft {
        Draft {
            node,
            builder: self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(n: u128) -> ConceptRef {
        ConceptRef::from_u128(n)
    }

    #[test]
    fn numbers_nodes_in_post_order() {
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let a = b.some_role(c(1), x).unwrap();
        let y = b.concept(c(11));
        let and = b.and([a, y]).unwrap();
        let tree = b.build(and).unwrap();

        let kinds: Vec<_> = tree.nodes().iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Concept { concept: c(10) },
                NodeKind::SomeRole { role: c(1) },
                NodeKind::Concept { concept: c(11) },
                NodeKind::And,
            ]
        );
        assert_eq!(tree.children(3), &[1, 2]);
        assert_eq!(tree.children(1), &[0]);
    }

    #[test]
    fn numbering_follows_operand_order_not_creation_order() {
        let mut b = ExpressionBuilder::new();
        let late = b.concept(c(20));
        let early = b.concept(c(21));
        let and = b.and([early, late]).unwrap();
        let tree = b.build(and).unwrap();

        assert_eq!(tree.kind(0), NodeKind::Concept { concept: c(21) });
        assert_eq!(tree.kind(1), NodeKind::Concept { concept: c(20) });
    }

    #[test]
    fn rejects_reused_operand() {
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        b.some_role(c(1), x).unwrap();
        assert_eq!(
            b.some_role(c(2), x),
            Err(TreeError::AlreadyAttached { kind: "Concept" })
        );
        assert_eq!(
            b.and([x, x]),
            Err(TreeError::AlreadyAttached { kind: "Concept" })
        );

        let mut b = ExpressionBuilder::new();
        let y = b.concept(c(10));
        assert_eq!(
            b.and([y, y]),
            Err(TreeError::AlreadyAttached { kind: "Concept" })
        );
    }

    #[test]
    fn rejects_empty_and() {
        let mut b = ExpressionBuilder::new();
        assert_eq!(b.and([]), Err(TreeError::EmptyConjunction));
    }

    #[test]
    fn rejects_foreign_handles() {
        let mut first = ExpressionBuilder::new();
        let mut second = ExpressionBuilder::new();
        let x = first.concept(c(10));
        let _ = second.concept(c(10));
        assert_eq!(second.some_role(c(1), x), Err(TreeError::UnknownHandle));
    }

    #[test]
    fn rejects_unattached_nodes() {
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let _stray = b.concept(c(11));
        let set = b.necessary_set(x).unwrap();
        assert_eq!(b.build(set), Err(TreeError::Unattached { count: 1 }));
    }

    #[test]
    fn rejects_inner_node_as_top() {
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let _set = b.necessary_set(x).unwrap();
        assert_eq!(
            b.build(x),
            Err(TreeError::AlreadyAttached { kind: "Concept" })
        );
    }

    #[test]
    fn rejects_nested_root() {
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let root = b.root(x).unwrap();
        let and = b.and([root]).unwrap();
        assert!(matches!(
            b.build(and),
            Err(TreeError::NestedRoot { .. })
        ));
    }
}
