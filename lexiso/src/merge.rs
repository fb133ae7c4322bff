//! Diff and merge of an aligned tree pair.
//!
//! Given a [`MatchSolution`], unmatched nodes are grouped into maximal
//! changed subtrees (deletions on the reference side, additions on the
//! comparison side) and both trees are folded into one [`MergedTree`] with
//! its own index space and back-references into the inputs.
//!
//! A matched node may sit under an unmatched parent when content moved
//! between groups. It is emitted once, where the reference has it, and is
//! left out of the changed subtrees around it.

use crate::error::{MergeError, TreeError};
use crate::solution::MatchSolution;
use crate::tracing_macros::debug;
use crate::tree::{ExpressionNode, ExpressionTree, NodeIndex, NodeKind};

/// Where a merged node comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A matched node, present in both trees.
    Both {
        /// Index in the reference tree.
        reference: NodeIndex,
        /// Index in the comparison tree.
        comparison: NodeIndex,
    },
    /// Reference-only content, retained in the merge but deleted.
    Reference(NodeIndex),
    /// Comparison-only content, added.
    Comparison(NodeIndex),
}

impl Origin {
    /// Index in the reference tree, if any.
    pub fn reference(self) -> Option<NodeIndex> {
        match self {
            Origin::Both { reference, .. } | Origin::Reference(reference) => Some(reference),
            Origin::Comparison(_) => None,
        }
    }

    /// Index in the comparison tree, if any.
    pub fn comparison(self) -> Option<NodeIndex> {
        match self {
            Origin::Both { comparison, .. } | Origin::Comparison(comparison) => Some(comparison),
            Origin::Reference(_) => None,
        }
    }

    /// Comparison-only.
    pub fn is_addition(self) -> bool {
        matches!(self, Origin::Comparison(_))
    }

    /// Reference-only.
    pub fn is_deletion(self) -> bool {
        matches!(self, Origin::Reference(_))
    }
}

/// A node of a [`MergedTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedNode {
    /// Index in the merged tree.
    pub index: usize,
    /// Kind and payload, shared by every source node.
    pub kind: NodeKind,
    /// Child indices in the merged tree.
    pub children: Vec<usize>,
    /// The source node(s).
    pub origin: Origin,
}

/// The union of a reference and a comparison tree.
///
/// Indices are assigned in post-order, like [`ExpressionTree`].
///
/// The shape depends on whether the two tops are paired with each other:
/// - paired tops: the reference tree with every addition spliced in.
///   Deleted content is retained and tagged [`Origin::Reference`];
/// - otherwise: the comparison tree alone, with matched nodes tagged
///   [`Origin::Both`]. Nothing is tagged [`Origin::Reference`] and deleted
///   content only shows in [`Merge::deletions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTree {
    nodes: Vec<MergedNode>,
    parents: Vec<Option<usize>>,
    by_reference: Vec<Option<usize>>,
    by_comparison: Vec<Option<usize>>,
    /// Children as the comparison tree has them, for nodes it contains.
    current_children: Vec<Vec<usize>>,
    current_top: usize,
}

impl MergedTree {
    /// Index of the top node.
    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a merge holds at least one node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn node(&self, index: usize) -> &MergedNode {
        &self.nodes[index]
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> &[MergedNode] {
        &self.nodes
    }

    /// Parent of a node, `None` for the top.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    /// Merged index of a reference node, `None` if it was left out.
    pub fn find_reference(&self, reference: NodeIndex) -> Option<usize> {
        self.by_reference.get(reference).copied().flatten()
    }

    /// Merged index of a comparison node.
    pub fn find_comparison(&self, comparison: NodeIndex) -> Option<usize> {
        self.by_comparison.get(comparison).copied().flatten()
    }

    /// The whole union, deleted content included, as a plain expression
    /// tree with the same indices.
    ///
    /// Fails when moved content leaves an added node without the children
    /// its kind needs, such as an added role group whose only filler is
    /// paired with a filler elsewhere in the reference.
    pub fn to_expression_tree(&self) -> Result<ExpressionTree, TreeError> {
        ExpressionTree::from_nodes(
            self.nodes
                .iter()
                .map(|n| ExpressionNode::new(n.index, n.kind, n.children.clone()))
                .collect(),
        )
    }

    /// The union without deleted content: what the expression looks like
    /// after the change. Matched and added nodes are arranged the way the
    /// comparison tree arranges them, so moved content sits in its new
    /// group. Indices are renumbered.
    pub fn current_view(&self) -> Result<ExpressionTree, TreeError> {
        let mut renumbered: Vec<Option<NodeIndex>> = vec![None; self.nodes.len()];
        let mut nodes = Vec::new();
        let mut stack = vec![(self.current_top, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                let children = self.current_children[index]
                    .iter()
                    .filter_map(|&child| renumbered[child])
                    .collect();
                renumbered[index] = Some(nodes.len());
                nodes.push(ExpressionNode::new(
                    nodes.len(),
                    self.nodes[index].kind,
                    children,
                ));
            } else {
                stack.push((index, true));
                let children = self.current_children[index].iter().rev();
                stack.extend(children.map(|&child| (child, false)));
            }
        }
        ExpressionTree::from_nodes(nodes)
    }
}

/// A maximal unmatched subtree of one input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedSubtree {
    /// Top of the subtree.
    pub root: NodeIndex,
    /// Every unmatched node of the subtree, ascending. Matched descendants,
    /// paired with content elsewhere, are left out together with everything
    /// below them.
    pub nodes: Vec<NodeIndex>,
    /// The matched parent, in the same tree as `root`. `None` when the whole
    /// tree is reported.
    pub anchor: Option<NodeIndex>,
    /// Where `root` landed in the merged tree, if it was kept.
    pub merged_root: Option<usize>,
}

/// Everything [`build_merge`] produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    /// The union of both trees.
    pub merged: MergedTree,
    /// Comparison-only subtrees, by ascending root.
    pub additions: Vec<ChangedSubtree>,
    /// Reference-only subtrees, by ascending root.
    pub deletions: Vec<ChangedSubtree>,
}

impl Merge {
    /// No additions and no deletions.
    pub fn is_unchanged(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// Report additions and deletions, and fold both trees into one.
///
/// A matched node is emitted once, with its reference children in order
/// followed by its unmatched comparison children. If the two tops are not
/// paired with each other there is nothing to splice into: the merged tree
/// is the comparison tree.
/// See [`MergedTree`] for how the two shapes differ.
pub fn build_merge(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    solution: &MatchSolution,
) -> Result<Merge, MergeError> {
    validate(reference, comparison, solution)?;

    let mut emitter = Emitter {
        reference,
        comparison,
        solution,
        nodes: Vec::with_capacity(reference.len() + comparison.len()),
        by_reference: vec![None; reference.len()],
        by_comparison: vec![None; comparison.len()],
        reference_side: solution.comparison_for(reference.root()) == Some(comparison.root()),
    };
    let top = if emitter.reference_side {
        emitter.reference_node(reference.root())
    } else {
        emitter.comparison_node(comparison.root())
    };

    let mut parents = vec![None; emitter.nodes.len()];
    for node in &emitter.nodes {
        for &child in &node.children {
            parents[child] = Some(node.index);
        }
    }
    let mut current_children = vec![Vec::new(); emitter.nodes.len()];
    for (c, merged) in emitter.by_comparison.iter().enumerate() {
        if let Some(merged) = *merged {
            current_children[merged] = comparison
                .children(c)
                .iter()
                .filter_map(|&child| emitter.by_comparison[child])
                .collect();
        }
    }
    let current_top = emitter.by_comparison[comparison.root()].unwrap_or(top);

    let merged = MergedTree {
        nodes: emitter.nodes,
        parents,
        by_reference: emitter.by_reference,
        by_comparison: emitter.by_comparison,
        current_children,
        current_top,
    };

    let deletions = changed_subtrees(
        reference,
        |r| solution.is_reference_matched(r),
        |r| merged.find_reference(r),
    );
    let additions = changed_subtrees(
        comparison,
        |c| solution.is_comparison_matched(c),
        |c| merged.find_comparison(c),
    );
    debug!(
        merged = merged.len(),
        additions = additions.len(),
        deletions = deletions.len(),
        "merge built"
    );

    Ok(Merge {
        merged,
        additions,
        deletions,
    })
}

fn validate(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    solution: &MatchSolution,
) -> Result<(), MergeError> {
    if solution.reference_len() != reference.len() || solution.comparison_len() != comparison.len()
    {
        return Err(MergeError::SizeMismatch {
            reference_len: reference.len(),
            comparison_len: comparison.len(),
            solution_reference_len: solution.reference_len(),
            solution_comparison_len: solution.comparison_len(),
        });
    }

    let forward = solution.reference_to_comparison();
    let backward = solution.comparison_to_reference();
    for (r, c) in forward.iter().enumerate() {
        if let Some(c) = *c
            && backward.get(c).copied().flatten() != Some(r)
        {
            return Err(MergeError::Asymmetric {
                reference: r,
                comparison: c,
            });
        }
    }
    for (c, r) in backward.iter().enumerate() {
        if let Some(r) = *r
            && forward.get(r).copied().flatten() != Some(c)
        {
            return Err(MergeError::Asymmetric {
                reference: r,
                comparison: c,
            });
        }
    }

    for (r, c) in forward.iter().enumerate() {
        let Some(c) = *c else { continue };
        if comparison.get(c).is_none_or(|node| node.kind != reference.kind(r)) {
            return Err(MergeError::LabelMismatch {
                reference: r,
                comparison: c,
            });
        }
    }
    Ok(())
}

/// Unmatched nodes whose parent is matched, or unmatched tops, each with
/// the unmatched nodes reachable below it.
fn changed_subtrees(
    tree: &ExpressionTree,
    matched: impl Fn(NodeIndex) -> bool,
    merged_index: impl Fn(NodeIndex) -> Option<usize>,
) -> Vec<ChangedSubtree> {
    (0..tree.len())
        .filter(|&i| !matched(i) && tree.parent(i).is_none_or(&matched))
        .map(|root| {
            let mut nodes = Vec::new();
            let mut stack = vec![root];
            while let Some(i) = stack.pop() {
                nodes.push(i);
                stack.extend(tree.children(i).iter().copied().filter(|&c| !matched(c)));
            }
            nodes.sort_unstable();
            ChangedSubtree {
                root,
                nodes,
                anchor: tree.parent(root),
                merged_root: merged_index(root),
            }
        })
        .collect()
}

struct Emitter<'a> {
    reference: &'a ExpressionTree,
    comparison: &'a ExpressionTree,
    solution: &'a MatchSolution,
    nodes: Vec<MergedNode>,
    by_reference: Vec<Option<usize>>,
    by_comparison: Vec<Option<usize>>,
    /// Whether the reference tree is being emitted, so matched comparison
    /// nodes are already taken care of.
    reference_side: bool,
}

impl Emitter<'_> {
    fn reference_node(&mut self, r: NodeIndex) -> usize {
        let reference = self.reference;
        let comparison = self.comparison;
        let mut children: Vec<usize> = reference
            .children(r)
            .iter()
            .map(|&child| self.reference_node(child))
            .collect();

        let origin = match self.solution.comparison_for(r) {
            Some(c) => {
                for &child in comparison.children(c) {
                    if !self.solution.is_comparison_matched(child) {
                        children.push(self.comparison_node(child));
                    }
                }
                Origin::Both {
                    reference: r,
                    comparison: c,
                }
            }
            None => Origin::Reference(r),
        };
        self.push(reference.kind(r), children, origin)
    }

    fn comparison_node(&mut self, c: NodeIndex) -> usize {
        let comparison = self.comparison;
        let mut children = Vec::new();
        for &child in comparison.children(c) {
            if self.reference_side && self.solution.is_comparison_matched(child) {
                continue;
            }
            children.push(self.comparison_node(child));
        }
        let origin = match self.solution.reference_for(c) {
            Some(reference) => Origin::Both {
                reference,
                comparison: c,
            },
            None => Origin::Comparison(c),
        };
        self.push(comparison.kind(c), children, origin)
    }

    fn push(&mut self, kind: NodeKind, children: Vec<usize>, origin: Origin) -> usize {
        let index = self.nodes.len();
        if let Some(r) = origin.reference() {
            self.by_reference[r] = Some(index);
        }
        if let Some(c) = origin.comparison() {
            self.by_comparison[c] = Some(index);
        }
        self.nodes.push(MergedNode {
            index,
            kind,
            children,
            origin,
        });
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bottom_up::BottomUpSolver;
    use crate::builder::ExpressionBuilder;
    use crate::concept::ConceptRef;
    use crate::solver::{Solver, Strategy};

    fn c(n: u128) -> ConceptRef {
        ConceptRef::from_u128(n)
    }

    /// `And` of role groups `(role, filler)`.
    fn groups(pairs: &[(u128, u128)]) -> ExpressionTree {
        let mut b = ExpressionBuilder::new();
        let operands: Vec<_> = pairs
            .iter()
            .map(|&(role, filler)| {
                let f = b.concept(c(filler));
                b.some_role(c(role), f).unwrap()
            })
            .collect();
        let and = b.and(operands).unwrap();
        b.build(and).unwrap()
    }

    fn merge(reference: &ExpressionTree, comparison: &ExpressionTree) -> Merge {
        let solution = BottomUpSolver::default().solve(reference, comparison);
        build_merge(reference, comparison, &solution).unwrap()
    }

    #[test]
    fn splices_additions_after_reference_children() {
        let reference = groups(&[(1, 10), (2, 11)]);
        let comparison = groups(&[(2, 11), (3, 12)]);
        let m = merge(&reference, &comparison);

        let origins: Vec<Origin> = m.merged.nodes().iter().map(|n| n.origin).collect();
        assert_eq!(
            origins,
            vec![
                Origin::Reference(0),
                Origin::Reference(1),
                Origin::Both { reference: 2, comparison: 0 },
                Origin::Both { reference: 3, comparison: 1 },
                Origin::Comparison(2),
                Origin::Comparison(3),
                Origin::Both { reference: 4, comparison: 4 },
            ]
        );
        assert_eq!(m.merged.node(6).children, vec![1, 3, 5]);
        assert_eq!(m.merged.parent(5), Some(6));

        assert_eq!(
            m.deletions,
            vec![ChangedSubtree {
                root: 1,
                nodes: vec![0, 1],
                anchor: Some(4),
                merged_root: Some(1),
            }]
        );
        assert_eq!(
            m.additions,
            vec![ChangedSubtree {
                root: 3,
                nodes: vec![2, 3],
                anchor: Some(4),
                merged_root: Some(5),
            }]
        );
    }

    #[test]
    fn current_view_equals_comparison() {
        let reference = groups(&[(1, 10), (2, 11), (4, 13)]);
        let comparison = groups(&[(2, 11), (3, 12)]);
        let m = merge(&reference, &comparison);
        let view = m.merged.current_view().unwrap();
        assert!(view.structurally_equal(&comparison));
        let full = m.merged.to_expression_tree().unwrap();
        assert_eq!(full.len(), m.merged.len());
    }

    #[test]
    fn unmatched_tops_report_whole_trees() {
        let reference = groups(&[(1, 10)]);
        let comparison = groups(&[(2, 20), (3, 30)]);
        let m = merge(&reference, &comparison);

        assert_eq!(m.deletions.len(), 1);
        assert_eq!(m.deletions[0].root, 2);
        assert_eq!(m.deletions[0].nodes, vec![0, 1, 2]);
        assert_eq!(m.deletions[0].anchor, None);
        assert_eq!(m.deletions[0].merged_root, None);

        assert_eq!(m.additions.len(), 1);
        assert_eq!(m.additions[0].nodes.len(), comparison.len());
        assert_eq!(m.additions[0].merged_root, Some(m.merged.root()));
        assert!(m.merged.nodes().iter().all(|n| n.origin.is_addition()));
        assert_eq!(m.merged.find_reference(0), None);
        assert!(m.merged.current_view().unwrap().structurally_equal(&comparison));
    }

    #[test]
    fn identical_trees_are_unchanged() {
        let tree = groups(&[(1, 10), (2, 11)]);
        let m = merge(&tree, &tree);
        assert!(m.is_unchanged());
        assert!(m.merged.to_expression_tree().unwrap().structurally_equal(&tree));
        for i in 0..tree.len() {
            assert_eq!(m.merged.find_reference(i), Some(i));
            assert_eq!(m.merged.find_comparison(i), Some(i));
        }
    }

    #[test]
    fn rejects_foreign_solutions() {
        let reference = groups(&[(1, 10)]);
        let comparison = groups(&[(1, 10), (2, 20)]);

        let wrong_size = MatchSolution::new(3, 3, Strategy::BottomUp);
        assert!(matches!(
            build_merge(&reference, &comparison, &wrong_size),
            Err(MergeError::SizeMismatch { .. })
        ));

        let one_way = MatchSolution::from_maps(
            vec![Some(0), None, None],
            vec![None; 5],
            Strategy::BottomUp,
        );
        assert_eq!(
            build_merge(&reference, &comparison, &one_way),
            Err(MergeError::Asymmetric {
                reference: 0,
                comparison: 0
            })
        );

        let mut mislabeled = MatchSolution::new(3, 5, Strategy::BottomUp);
        mislabeled.add(0, 1);
        assert_eq!(
            build_merge(&reference, &comparison, &mislabeled),
            Err(MergeError::LabelMismatch {
                reference: 0,
                comparison: 1
            })
        );

        // a pair whose parents are not paired is a move, not an error
        let mut moved = MatchSolution::new(3, 5, Strategy::BottomUp);
        moved.add(1, 1);
        assert!(build_merge(&reference, &comparison, &moved).is_ok());
    }

    #[test]
    fn moved_content_is_emitted_once_on_the_reference_side() {
        // X0 S(1)1 Y2 S(2)3 And4  vs  X0 S(3)1 Y2 S(2)3 And4
        let reference = groups(&[(1, 10), (2, 11)]);
        let comparison = groups(&[(3, 10), (2, 11)]);
        let solution = BottomUpSolver::default().solve(&reference, &comparison);
        assert_eq!(solution.pairs(), &[(0, 0), (2, 2), (3, 3), (4, 4)]);
        let m = build_merge(&reference, &comparison, &solution).unwrap();

        let origins: Vec<Origin> = m.merged.nodes().iter().map(|n| n.origin).collect();
        assert_eq!(
            origins,
            vec![
                Origin::Both { reference: 0, comparison: 0 },
                Origin::Reference(1),
                Origin::Both { reference: 2, comparison: 2 },
                Origin::Both { reference: 3, comparison: 3 },
                Origin::Comparison(1),
                Origin::Both { reference: 4, comparison: 4 },
            ]
        );
        // the filler stays under the old role; the new role is empty
        assert_eq!(m.merged.node(1).children, vec![0]);
        assert!(m.merged.node(4).children.is_empty());

        // both changed groups leave the shared filler out
        assert_eq!(
            m.deletions,
            vec![ChangedSubtree {
                root: 1,
                nodes: vec![1],
                anchor: Some(4),
                merged_root: Some(1),
            }]
        );
        assert_eq!(
            m.additions,
            vec![ChangedSubtree {
                root: 1,
                nodes: vec![1],
                anchor: Some(4),
                merged_root: Some(4),
            }]
        );

        // the current view puts the filler under the new role again
        let view = m.merged.current_view().unwrap();
        assert!(view.structurally_equal(&comparison));
        assert!(matches!(
            m.merged.to_expression_tree(),
            Err(TreeError::Arity { found: 0, .. })
        ));
    }

    #[test]
    fn reference_top_paired_below_the_comparison_top() {
        // S(1)[X] is found whole inside And[S(1)[X], Y]
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let role = b.some_role(c(1), x).unwrap();
        let reference = b.build(role).unwrap();
        let comparison = groups(&[(1, 10), (2, 11)]);

        let solution = BottomUpSolver::default().solve(&reference, &comparison);
        assert_eq!(solution.pairs(), &[(0, 0), (1, 1)]);
        let m = build_merge(&reference, &comparison, &solution).unwrap();

        // every comparison node is emitted, the unmatched top included
        assert_eq!(m.merged.len(), comparison.len());
        assert_eq!(m.merged.find_comparison(4), Some(m.merged.root()));
        assert_eq!(m.merged.find_reference(1), m.merged.find_comparison(1));
        assert!(m.deletions.is_empty());
        assert_eq!(
            m.additions,
            vec![ChangedSubtree {
                root: 4,
                nodes: vec![2, 3, 4],
                anchor: None,
                merged_root: Some(m.merged.root()),
            }]
        );
        assert!(m.merged.to_expression_tree().unwrap().structurally_equal(&comparison));
    }

    #[test]
    #[should_panic]
    fn parent_of_missing_merged_node_panics() {
        let tree = groups(&[(1, 10)]);
        let m = merge(&tree, &tree);
        let _ = m.merged.parent(m.merged.len());
    }

    #[test]
    fn unmatched_tops_keep_moved_content_in_the_comparison_tree() {
        // X0 SufficientSet1 Root2  vs  X0 NecessarySet1 Root2
        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let set = b.sufficient_set(x).unwrap();
        let root = b.root(set).unwrap();
        let reference = b.build(root).unwrap();

        let mut b = ExpressionBuilder::new();
        let x = b.concept(c(10));
        let set = b.necessary_set(x).unwrap();
        let root = b.root(set).unwrap();
        let comparison = b.build(root).unwrap();

        let m = merge(&reference, &comparison);
        assert_eq!(m.merged.node(0).origin, Origin::Both { reference: 0, comparison: 0 });
        assert!(!m.merged.nodes().iter().any(|n| n.origin.is_deletion()));

        assert_eq!(m.deletions.len(), 1);
        assert_eq!(m.deletions[0].root, 2);
        assert_eq!(m.deletions[0].nodes, vec![1, 2]);
        assert_eq!(m.deletions[0].merged_root, None);
        assert_eq!(m.additions.len(), 1);
        assert_eq!(m.additions[0].nodes, vec![1, 2]);
        assert_eq!(m.additions[0].merged_root, Some(m.merged.root()));

        let full = m.merged.to_expression_tree().unwrap();
        assert!(full.structurally_equal(&comparison));
        assert!(m.merged.current_view().unwrap().structurally_equal(&comparison));
    }
}
