//! Path-hash solver.
//!
//! Every node gets a subtree digest and a path digest (see [`Digests`]).
//! Starting from the two tops, a reference child is only ever weighed
//! against the comparison children that share its path digest, found through
//! a digest lookup, and identical siblings are recognised by subtree digest.
//! Weights are evaluated lazily and memoised, so only pairs that are
//! reachable from the tops are ever looked at. Equal subtrees the tops
//! cannot reach are then paired by subtree digest across the whole tree.

use rapidhash::RapidHashMap;

use crate::bipartite::{self, WeightGrid};
use crate::completion;
use crate::digest::Digests;
use crate::equality::EqualityOracle;
use crate::solution::MatchSolution;
use crate::solver::{Solver, SolverConfig, Strategy};
use crate::tracing_macros::{debug, trace};
use crate::tree::{ExpressionTree, NodeIndex};

/// Matches nodes by structural and path digests, top down.
#[derive(Debug, Clone, Default)]
pub struct PathHashSolver {
    config: SolverConfig,
}

impl PathHashSolver {
    /// Create a solver.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Solver for PathHashSolver {
    fn strategy(&self) -> Strategy {
        Strategy::PathHash
    }

    fn solve(&self, reference: &ExpressionTree, comparison: &ExpressionTree) -> MatchSolution {
        let reference_digests = Digests::compute(reference);
        let comparison_digests = Digests::compute(comparison);
        let mut search = Search::new(
            reference,
            comparison,
            &reference_digests,
            &comparison_digests,
            self.config.exact_assignment_limit,
        );
        debug!(
            reference = reference.len(),
            comparison = comparison.len(),
            paths = search.by_path.len(),
            "path-hash: searching"
        );

        let mut solution = MatchSolution::new(reference.len(), comparison.len(), Strategy::PathHash);
        let top = (reference.root(), comparison.root());
        if search.weight(top.0, top.1) > 0 {
            let mut stack = vec![top];
            while let Some((r, c)) = stack.pop() {
                trace!(r, c, "path-hash: pair");
                solution.add(r, c);
                if let Some(alignment) = search.memo.get(&(r, c)) {
                    stack.extend(alignment.pairs.iter().copied());
                }
            }
        }

        if self.config.record_ambiguities {
            solution.find_ambiguities(reference, comparison, |r, c| search.identical(r, c));
        }
        if !completion::is_saturated(reference, comparison, &solution) {
            completion::complete(
                reference,
                comparison,
                &reference_digests,
                &comparison_digests,
                &mut solution,
                self.config.record_ambiguities,
            );
        }
        debug!(
            score = solution.score(),
            evaluated = search.memo.len(),
            "path-hash: done"
        );
        solution
    }
}

#[derive(Debug, Default)]
struct Alignment {
    weight: u32,
    pairs: Vec<(NodeIndex, NodeIndex)>,
}

struct Search<'t> {
    reference: &'t ExpressionTree,
    comparison: &'t ExpressionTree,
    reference_digests: &'t Digests,
    comparison_digests: &'t Digests,
    /// Comparison nodes by path digest, ascending.
    by_path: RapidHashMap<u64, Vec<NodeIndex>>,
    oracle: EqualityOracle<'t>,
    memo: RapidHashMap<(NodeIndex, NodeIndex), Alignment>,
    exact_limit: usize,
}

impl<'t> Search<'t> {
    fn new(
        reference: &'t ExpressionTree,
        comparison: &'t ExpressionTree,
        reference_digests: &'t Digests,
        comparison_digests: &'t Digests,
        exact_limit: usize,
    ) -> Self {
        let mut by_path: RapidHashMap<u64, Vec<NodeIndex>> = RapidHashMap::default();
        for c in 0..comparison.len() {
            by_path.entry(comparison_digests.path(c)).or_default().push(c);
        }
        Self {
            reference,
            comparison,
            reference_digests,
            comparison_digests,
            by_path,
            oracle: EqualityOracle::new(reference, comparison)
                .with_digests(reference_digests, comparison_digests),
            memo: RapidHashMap::default(),
            exact_limit,
        }
    }

    fn compatible(&self, r: NodeIndex, c: NodeIndex) -> bool {
        self.reference.kind(r) == self.comparison.kind(c)
            && self.reference_digests.path(r) == self.comparison_digests.path(c)
    }

    fn identical(&mut self, r: NodeIndex, c: NodeIndex) -> bool {
        self.reference_digests.subtree(r) == self.comparison_digests.subtree(c)
            && self.oracle.equal(r, c)
    }

    fn weight(&mut self, r: NodeIndex, c: NodeIndex) -> u32 {
        if !self.compatible(r, c) {
            return 0;
        }
        if let Some(known) = self.memo.get(&(r, c)) {
            return known.weight;
        }

        let alignment = if self.reference.kind(r).is_leaf() {
            Alignment {
                weight: 1,
                pairs: Vec::new(),
            }
        } else {
            self.align_children(r, c)
        };
        let weight = alignment.weight;
        self.memo.insert((r, c), alignment);
        weight
    }

    fn align_children(&mut self, r: NodeIndex, c: NodeIndex) -> Alignment {
        let reference = self.reference;
        let comparison = self.comparison;
        let (rc, cc) = (reference.children(r), comparison.children(c));

        let mut grid = WeightGrid::new(rc.len(), cc.len());
        for (i, &a) in rc.iter().enumerate() {
            let candidates: Vec<NodeIndex> = self
                .by_path
                .get(&self.reference_digests.path(a))
                .map(|nodes| {
                    nodes
                        .iter()
                        .copied()
                        .filter(|&b| comparison.parent(b) == Some(c))
                        .collect()
                })
                .unwrap_or_default();
            for b in candidates {
                let Some(j) = cc.iter().position(|&x| x == b) else {
                    continue;
                };
                let identical = self.identical(a, b);
                let weight = self.weight(a, b);
                grid.set(i, j, weight, identical);
            }
        }

        let assignment = bipartite::assign(&grid, self.exact_limit);
        if assignment.weight == 0 {
            return Alignment::default();
        }
        Alignment {
            weight: 1 + assignment.weight,
            pairs: assignment
                .pairs
                .iter()
                .map(|&(i, j)| (rc[i], cc[j]))
                .collect(),
        }
    }
}
