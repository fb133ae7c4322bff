//! The result of a solver run: a partial bijection between two trees.

use core::cmp::Ordering;
use std::collections::BTreeSet;

use crate::solver::Strategy;
use crate::tree::{ExpressionTree, NodeIndex};

/// A reference node that had several structurally identical comparison
/// candidates, either under its matched parent or, for content paired
/// outside the anchored alignment, anywhere in the comparison tree.
///
/// Purely informational: the solver picked one deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// The reference node.
    pub reference: NodeIndex,
    /// The comparison node it was paired with.
    pub chosen: NodeIndex,
    /// The other identical candidates, ascending.
    pub alternatives: Vec<NodeIndex>,
}

/// A partial bijection between the nodes of a reference and a comparison
/// tree, as produced by one [`Solver`](crate::Solver).
///
/// Both directions are stored so lookups are O(1) either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSolution {
    strategy: Strategy,
    reference_to_comparison: Vec<Option<NodeIndex>>,
    comparison_to_reference: Vec<Option<NodeIndex>>,
    pairs: Vec<(NodeIndex, NodeIndex)>,
    ambiguities: Vec<Ambiguity>,
}

impl MatchSolution {
    /// An empty solution for trees of the given sizes.
    pub fn new(reference_len: usize, comparison_len: usize, strategy: Strategy) -> Self {
        Self {
            strategy,
            reference_to_comparison: vec![None; reference_len],
            comparison_to_reference: vec![None; comparison_len],
            pairs: Vec::new(),
            ambiguities: Vec::new(),
        }
    }

    /// Rebuild a solution from its two maps, as stored elsewhere.
    ///
    /// The maps are taken as they are; [`build_merge`](crate::build_merge)
    /// rejects them if they are not inverse to each other.
    pub fn from_maps(
        reference_to_comparison: Vec<Option<NodeIndex>>,
        comparison_to_reference: Vec<Option<NodeIndex>>,
        strategy: Strategy,
    ) -> Self {
        let pairs = reference_to_comparison
            .iter()
            .enumerate()
            .filter_map(|(r, c)| c.map(|c| (r, c)))
            .collect();
        Self {
            strategy,
            reference_to_comparison,
            comparison_to_reference,
            pairs,
            ambiguities: Vec::new(),
        }
    }

    /// Pair `reference` with `comparison`.
    ///
    /// Any previous partner of either node is released first, so the two
    /// maps stay inverse to each other.
    ///
    /// # Panics
    ///
    /// Panics if either index is outside the tree sizes given to
    /// [`new`](Self::new).
    pub fn add(&mut self, reference: NodeIndex, comparison: NodeIndex) {
        if let Some(old) = self.reference_to_comparison[reference].take() {
            self.comparison_to_reference[old] = None;
            self.pairs.retain(|&(r, _)| r != reference);
        }
        if let Some(old) = self.comparison_to_reference[comparison].take() {
            self.reference_to_comparison[old] = None;
            self.pairs.retain(|&(_, c)| c != comparison);
        }
        self.reference_to_comparison[reference] = Some(comparison);
        self.comparison_to_reference[comparison] = Some(reference);
        let at = self.pairs.partition_point(|&(r, _)| r < reference);
        self.pairs.insert(at, (reference, comparison));
    }

    /// Record, for every matched child, the other children of its partner's
    /// parent that it is identical to.
    pub(crate) fn find_ambiguities(
        &mut self,
        reference: &ExpressionTree,
        comparison: &ExpressionTree,
        mut identical: impl FnMut(NodeIndex, NodeIndex) -> bool,
    ) {
        let mut found = Vec::new();
        for &(r, c) in &self.pairs {
            for &child in reference.children(r) {
                let Some(chosen) = self.comparison_for(child) else {
                    continue;
                };
                if comparison.parent(chosen) != Some(c) {
                    continue;
                }
                let mut alternatives: Vec<NodeIndex> = comparison
                    .children(c)
                    .iter()
                    .copied()
                    .filter(|&other| other != chosen && identical(child, other))
                    .collect();
                alternatives.sort_unstable();
                if !alternatives.is_empty() {
                    found.push(Ambiguity {
                        reference: child,
                        chosen,
                        alternatives,
                    });
                }
            }
        }
        found.sort_unstable_by_key(|a| a.reference);
        self.ambiguities = found;
    }

    pub(crate) fn record_ambiguity(&mut self, ambiguity: Ambiguity) {
        let at = self
            .ambiguities
            .partition_point(|a| a.reference < ambiguity.reference);
        self.ambiguities.insert(at, ambiguity);
    }

    /// The strategy that produced this solution.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Counterpart of a reference node.
    pub fn comparison_for(&self, reference: NodeIndex) -> Option<NodeIndex> {
        self.reference_to_comparison.get(reference).copied().flatten()
    }

    /// Counterpart of a comparison node.
    pub fn reference_for(&self, comparison: NodeIndex) -> Option<NodeIndex> {
        self.comparison_to_reference.get(comparison).copied().flatten()
    }

    /// Whether a reference node is matched.
    pub fn is_reference_matched(&self, reference: NodeIndex) -> bool {
        self.comparison_for(reference).is_some()
    }

    /// Whether a comparison node is matched.
    pub fn is_comparison_matched(&self, comparison: NodeIndex) -> bool {
        self.reference_for(comparison).is_some()
    }

    /// The reference-to-comparison map, indexed by reference node.
    pub fn reference_to_comparison(&self) -> &[Option<NodeIndex>] {
        &self.reference_to_comparison
    }

    /// The comparison-to-reference map, indexed by comparison node.
    pub fn comparison_to_reference(&self) -> &[Option<NodeIndex>] {
        &self.comparison_to_reference
    }

    /// Matched `(reference, comparison)` pairs, ascending by reference.
    pub fn pairs(&self) -> &[(NodeIndex, NodeIndex)] {
        &self.pairs
    }

    /// Number of matched reference nodes.
    pub fn score(&self) -> usize {
        self.pairs.len()
    }

    /// Same as [`score`](Self::score).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is matched.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Size of the reference tree this solution was built for.
    pub fn reference_len(&self) -> usize {
        self.reference_to_comparison.len()
    }

    /// Size of the comparison tree this solution was built for.
    pub fn comparison_len(&self) -> usize {
        self.comparison_to_reference.len()
    }

    /// Reference nodes that had more than one identical candidate.
    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Matched pairs of concept leaves.
    pub fn leaf_pairs(&self, reference: &ExpressionTree) -> BTreeSet<(NodeIndex, NodeIndex)> {
        self.pairs
            .iter()
            .copied()
            .filter(|&(r, _)| reference.get(r).is_some_and(|n| n.kind.is_leaf()))
            .collect()
    }

    /// Pairs whose parents are not paired with each other: content that
    /// moved to another group, or whose enclosing frame changed.
    ///
    /// The two tops never count as moved.
    pub fn moved(
        &self,
        reference: &ExpressionTree,
        comparison: &ExpressionTree,
    ) -> Vec<(NodeIndex, NodeIndex)> {
        self.pairs
            .iter()
            .copied()
            .filter(|&(r, c)| match (reference.parent(r), comparison.parent(c)) {
                (None, None) => false,
                (Some(pr), Some(pc)) => self.comparison_for(pr) != Some(pc),
                _ => true,
            })
            .collect()
    }

    /// Order two solutions of the same tree pair; greater is better.
    ///
    /// Higher score wins. Among equal scores, the solution matching
    /// higher-index (more ancestral) reference nodes wins, comparing matched
    /// indices from the top down.
    pub fn rank(&self, other: &MatchSolution) -> Ordering {
        self.score().cmp(&other.score()).then_with(|| {
            let mine = self.pairs.iter().rev().map(|&(r, _)| r);
            let theirs = other.pairs.iter().rev().map(|&(r, _)| r);
            mine.cmp(theirs)
        })
    }

    /// Whether the solution is a valid matching of `reference` and
    /// `comparison`: maps sized for the trees and inverse to each other in
    /// both directions, and equal labels on every pair.
    pub fn is_consistent(&self, reference: &ExpressionTree, comparison: &ExpressionTree) -> bool {
        if self.reference_len() != reference.len() || self.comparison_len() != comparison.len() {
            return false;
        }
        let inverse = self
            .comparison_to_reference
            .iter()
            .enumerate()
            .all(|(c, r)| {
                r.is_none_or(|r| self.reference_to_comparison.get(r) == Some(&Some(c)))
            });
        inverse
            && self.pairs.iter().all(|&(r, c)| {
                self.reference_to_comparison.get(r) == Some(&Some(c))
                    && self.comparison_to_reference.get(c) == Some(&Some(r))
                    && reference.kind(r) == comparison.kind(c)
            })
            && self.pairs.len()
                == self
                    .reference_to_comparison
                    .iter()
                    .filter(|c| c.is_some())
                    .count()
    }
}
