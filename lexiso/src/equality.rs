//! Structural equality between nodes of two trees.
//!
//! Equality is recursive: same [`NodeKind`] (payload included), and children
//! that are pairwise equal. `And` children are compared as multisets, so the
//! operands of two equal conjunctions may appear in any order.

use rapidhash::RapidHashMap;

use crate::bipartite;
use crate::digest::Digests;
use crate::tree::{ExpressionTree, NodeIndex, NodeKind};

/// Whether `reference_node` in `reference` and `comparison_node` in
/// `comparison` root structurally equal subtrees.
///
/// ```
/// use lexiso::{ConceptRef, ExpressionBuilder, nodes_equal};
///
/// let (x, y) = (ConceptRef::from_u128(1), ConceptRef::from_u128(2));
///
/// let mut b = ExpressionBuilder::new();
/// let (cx, cy) = (b.concept(x), b.concept(y));
/// let and = b.and([cx, cy])?;
/// let first = b.build(and)?;
///
/// let mut b = ExpressionBuilder::new();
/// let (cy, cx) = (b.concept(y), b.concept(x));
/// let and = b.and([cy, cx])?;
/// let second = b.build(and)?;
///
/// assert!(nodes_equal(&first, first.root(), &second, second.root()));
/// # Ok::<(), lexiso::TreeError>(())
/// ```
pub fn nodes_equal(
    reference: &ExpressionTree,
    reference_node: NodeIndex,
    comparison: &ExpressionTree,
    comparison_node: NodeIndex,
) -> bool {
    EqualityOracle::new(reference, comparison).equal(reference_node, comparison_node)
}

/// Memoizing equality judge for one pair of trees.
///
/// When handed the digests of both trees it rejects most unequal pairs
/// without recursing; a digest match is still confirmed structurally.
#[derive(Debug)]
pub struct EqualityOracle<'t> {
    reference: &'t ExpressionTree,
    comparison: &'t ExpressionTree,
    digests: Option<(&'t Digests, &'t Digests)>,
    memo: RapidHashMap<(NodeIndex, NodeIndex), bool>,
}

impl<'t> EqualityOracle<'t> {
    /// A judge for nodes of `reference` against nodes of `comparison`.
    pub fn new(reference: &'t ExpressionTree, comparison: &'t ExpressionTree) -> Self {
        Self {
            reference,
            comparison,
            digests: None,
            memo: RapidHashMap::default(),
        }
    }

    /// Use precomputed subtree digests to reject unequal pairs early.
    pub fn with_digests(mut self, reference: &'t Digests, comparison: &'t Digests) -> Self {
        self.digests = Some((reference, comparison));
        self
    }

    /// Whether the two subtrees are equal.
    pub fn equal(&mut self, r: NodeIndex, c: NodeIndex) -> bool {
        let kind = self.reference.kind(r);
        if kind != self.comparison.kind(c)
            || self.reference.subtree_size(r) != self.comparison.subtree_size(c)
        {
            return false;
        }
        if let Some((rd, cd)) = self.digests
            && rd.subtree(r) != cd.subtree(c)
        {
            return false;
        }
        if let Some(&known) = self.memo.get(&(r, c)) {
            return known;
        }

        let equal = match kind {
            NodeKind::Concept { .. } => true,
            NodeKind::And => self.operands_equal(r, c),
            _ => {
                let (rc, cc) = (self.reference.children(r), self.comparison.children(c));
                match (rc, cc) {
                    (&[rc], &[cc]) => self.equal(rc, cc),
                    _ => false,
                }
            }
        };
        self.memo.insert((r, c), equal);
        equal
    }

    /// Multiset equality of two `And` operand lists.
    fn operands_equal(&mut self, r: NodeIndex, c: NodeIndex) -> bool {
        let reference = self.reference;
        let comparison = self.comparison;
        let (rc, cc) = (reference.children(r), comparison.children(c));
        if rc.len() != cc.len() {
            return false;
        }

        let mut adjacent = vec![false; rc.len() * cc.len()];
        for (i, &a) in rc.iter().enumerate() {
            for (j, &b) in cc.iter().enumerate() {
                adjacent[i * cc.len() + j] = self.equal(a, b);
            }
        }
        bipartite::perfect_matching(rc.len(), cc.len(), |i, j| adjacent[i * cc.len() + j])
            .is_some()
    }
}
