//! Pairs found outside the anchored alignment.
//!
//! The anchored alignment only pairs nodes whose parents are paired. Content
//! that moved to another group, or whose enclosing frame changed kind, is
//! picked up afterwards, in two passes over what is still unmatched:
//!
//! 1. structurally equal subtrees are paired whole, largest first, wherever
//!    they sit. Concept leaves are the smallest such subtrees, so a concept
//!    used in both trees is paired as many times as it occurs on both sides;
//! 2. interior nodes are paired upwards, children before parents, with the
//!    unmatched comparison node of the same kind that holds most of their
//!    paired children.
//!
//! Among equally good candidates, the one whose ancestor labels mirror the
//! reference node's for the longest stretch wins, then the lowest index.

use core::cmp::Reverse;

use rapidhash::RapidHashMap;

use crate::digest::Digests;
use crate::equality::EqualityOracle;
use crate::solution::{Ambiguity, MatchSolution};
use crate::tracing_macros::{debug, trace};
use crate::tree::{ExpressionTree, NodeIndex};

/// Extend `solution` with pairs outside the anchored alignment.
pub(crate) fn complete(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    reference_digests: &Digests,
    comparison_digests: &Digests,
    solution: &mut MatchSolution,
    record_ambiguities: bool,
) {
    let mut completion = Completion {
        reference,
        comparison,
        oracle: EqualityOracle::new(reference, comparison)
            .with_digests(reference_digests, comparison_digests),
        solution,
        record_ambiguities,
    };
    completion.pair_equal_subtrees(reference_digests, comparison_digests);
    completion.pair_upwards();
    debug!(score = completion.solution.score(), "completion: done");
}

/// Whether every node of one side is already paired, leaving nothing to
/// complete.
pub(crate) fn is_saturated(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    solution: &MatchSolution,
) -> bool {
    solution.score() == reference.len().min(comparison.len())
}

/// Number of consecutive ancestors, parent first, that carry the same label
/// in both trees.
fn shared_context(
    reference: &ExpressionTree,
    mut r: NodeIndex,
    comparison: &ExpressionTree,
    mut c: NodeIndex,
) -> usize {
    let mut shared = 0;
    while let (Some(pr), Some(pc)) = (reference.parent(r), comparison.parent(c)) {
        if reference.kind(pr) != comparison.kind(pc) {
            break;
        }
        shared += 1;
        r = pr;
        c = pc;
    }
    shared
}

struct Completion<'t, 's> {
    reference: &'t ExpressionTree,
    comparison: &'t ExpressionTree,
    oracle: EqualityOracle<'t>,
    solution: &'s mut MatchSolution,
    record_ambiguities: bool,
}

impl Completion<'_, '_> {
    fn reference_free(&self, r: NodeIndex) -> bool {
        self.reference
            .descendants(r)
            .all(|d| !self.solution.is_reference_matched(d))
    }

    fn comparison_free(&self, c: NodeIndex) -> bool {
        self.comparison
            .descendants(c)
            .all(|d| !self.solution.is_comparison_matched(d))
    }

    fn pair_equal_subtrees(&mut self, reference_digests: &Digests, comparison_digests: &Digests) {
        let reference = self.reference;
        let comparison = self.comparison;

        let mut by_digest: RapidHashMap<u64, Vec<NodeIndex>> = RapidHashMap::default();
        for c in 0..comparison.len() {
            if !self.solution.is_comparison_matched(c) {
                by_digest
                    .entry(comparison_digests.subtree(c))
                    .or_default()
                    .push(c);
            }
        }

        let mut order: Vec<NodeIndex> = (0..reference.len())
            .filter(|&r| !self.solution.is_reference_matched(r))
            .collect();
        order.sort_unstable_by_key(|&r| (Reverse(reference.subtree_size(r)), r));

        for r in order {
            if !self.reference_free(r) {
                continue;
            }
            let Some(candidates) = by_digest.get(&reference_digests.subtree(r)) else {
                continue;
            };

            let mut best: Vec<NodeIndex> = Vec::new();
            let mut best_context = 0;
            for &c in candidates {
                if !self.comparison_free(c) || !self.oracle.equal(r, c) {
                    continue;
                }
                let context = shared_context(reference, r, comparison, c);
                if best.is_empty() || context > best_context {
                    best.clear();
                    best_context = context;
                }
                if context == best_context {
                    best.push(c);
                }
            }

            let Some((&chosen, alternatives)) = best.split_first() else {
                continue;
            };
            trace!(r, chosen, context = best_context, "completion: equal subtree");
            if self.record_ambiguities && !alternatives.is_empty() {
                self.solution.record_ambiguity(Ambiguity {
                    reference: r,
                    chosen,
                    alternatives: alternatives.to_vec(),
                });
            }
            self.pair_whole(r, chosen);
        }
    }

    /// Pair two equal subtrees node by node. Equal operands are taken in
    /// order, each by the first unused equal operand on the other side.
    fn pair_whole(&mut self, r: NodeIndex, c: NodeIndex) {
        let reference = self.reference;
        let comparison = self.comparison;
        self.solution.add(r, c);

        let cc = comparison.children(c);
        let mut taken = vec![false; cc.len()];
        for &a in reference.children(r) {
            let free = (0..cc.len()).find(|&j| !taken[j] && self.oracle.equal(a, cc[j]));
            let Some(j) = free else {
                continue;
            };
            taken[j] = true;
            self.pair_whole(a, cc[j]);
        }
    }

    fn pair_upwards(&mut self) {
        let reference = self.reference;
        let comparison = self.comparison;

        for r in 0..reference.len() {
            let kind = reference.kind(r);
            if kind.is_leaf() || self.solution.is_reference_matched(r) {
                continue;
            }

            let mut votes: Vec<(NodeIndex, usize)> = Vec::new();
            for &child in reference.children(r) {
                let Some(partner) = self.solution.comparison_for(child) else {
                    continue;
                };
                let Some(parent) = comparison.parent(partner) else {
                    continue;
                };
                if self.solution.is_comparison_matched(parent) || comparison.kind(parent) != kind {
                    continue;
                }
                match votes.iter_mut().find(|(c, _)| *c == parent) {
                    Some((_, count)) => *count += 1,
                    None => votes.push((parent, 1)),
                }
            }

            let best = votes.into_iter().max_by_key(|&(c, count)| {
                (count, shared_context(reference, r, comparison, c), Reverse(c))
            });
            if let Some((c, _)) = best {
                trace!(r, c, "completion: upwards");
                self.solution.add(r, c);
            }
        }
    }
}
