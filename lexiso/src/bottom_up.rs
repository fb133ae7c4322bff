//! Bottom-up solver.
//!
//! Reference nodes are visited in ascending index order, so by the time a
//! node is reached every one of its children already has a weight against
//! every comparison node. A pair's weight is the size of the best anchored
//! alignment of the two subtrees:
//!
//! - equal concept leaves weigh 1;
//! - an interior pair of equal kinds weighs 1 plus the best sibling
//!   assignment of its children, or 0 if no child pair can be kept;
//! - anything else weighs 0.
//!
//! The solution is then read off from the two tops downwards, and whatever
//! the alignment could not reach is handed to the completion passes.

use rapidhash::RapidHashMap;

use crate::bipartite::{self, WeightGrid};
use crate::completion;
use crate::digest::Digests;
use crate::solution::MatchSolution;
use crate::solver::{Solver, SolverConfig, Strategy};
use crate::tracing_macros::{debug, trace};
use crate::tree::{ExpressionTree, NodeIndex, NodeKind};

/// Matches leaves first and propagates matched child sets upwards.
#[derive(Debug, Clone, Default)]
pub struct BottomUpSolver {
    config: SolverConfig,
}

impl BottomUpSolver {
    /// Create a solver.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Solver for BottomUpSolver {
    fn strategy(&self) -> Strategy {
        Strategy::BottomUp
    }

    fn solve(&self, reference: &ExpressionTree, comparison: &ExpressionTree) -> MatchSolution {
        debug!(
            reference = reference.len(),
            comparison = comparison.len(),
            "bottom-up: filling weight table"
        );
        let table = WeightTable::fill(reference, comparison, self.config.exact_assignment_limit);

        let mut solution = MatchSolution::new(reference.len(), comparison.len(), Strategy::BottomUp);
        let top = (reference.root(), comparison.root());
        if table.weight(top.0, top.1) > 0 {
            let mut stack = vec![top];
            while let Some((r, c)) = stack.pop() {
                trace!(r, c, "bottom-up: pair");
                solution.add(r, c);
                if let Some(plan) = table.plans.get(&(r, c)) {
                    stack.extend(plan.iter().copied());
                }
            }
        }

        if self.config.record_ambiguities {
            solution.find_ambiguities(reference, comparison, |r, c| table.identical(r, c));
        }
        if !completion::is_saturated(reference, comparison, &solution) {
            completion::complete(
                reference,
                comparison,
                &Digests::compute(reference),
                &Digests::compute(comparison),
                &mut solution,
                self.config.record_ambiguities,
            );
        }
        debug!(
            score = solution.score(),
            ambiguities = solution.ambiguities().len(),
            "bottom-up: done"
        );
        solution
    }
}

struct WeightTable<'t> {
    reference: &'t ExpressionTree,
    comparison: &'t ExpressionTree,
    weights: Vec<u32>,
    /// Chosen child pairs of every interior pair with a positive weight.
    plans: RapidHashMap<(NodeIndex, NodeIndex), Vec<(NodeIndex, NodeIndex)>>,
}

impl<'t> WeightTable<'t> {
    fn fill(
        reference: &'t ExpressionTree,
        comparison: &'t ExpressionTree,
        exact_limit: usize,
    ) -> Self {
        let mut by_kind: RapidHashMap<NodeKind, Vec<NodeIndex>> = RapidHashMap::default();
        for node in comparison.nodes() {
            by_kind.entry(node.kind).or_default().push(node.index);
        }

        let mut table = Self {
            reference,
            comparison,
            weights: vec![0; reference.len() * comparison.len()],
            plans: RapidHashMap::default(),
        };

        for r in 0..reference.len() {
            let kind = reference.kind(r);
            let Some(candidates) = by_kind.get(&kind) else {
                continue;
            };
            for &c in candidates {
                let weight = if kind.is_leaf() {
                    1
                } else {
                    table.interior(r, c, exact_limit)
                };
                table.weights[r * comparison.len() + c] = weight;
            }
        }
        table
    }

    fn interior(&mut self, r: NodeIndex, c: NodeIndex, exact_limit: usize) -> u32 {
        let rc = self.reference.children(r);
        let cc = self.comparison.children(c);
        let mut grid = WeightGrid::new(rc.len(), cc.len());
        for (i, &a) in rc.iter().enumerate() {
            for (j, &b) in cc.iter().enumerate() {
                grid.set(i, j, self.weight(a, b), self.identical(a, b));
            }
        }

        let assignment = bipartite::assign(&grid, exact_limit);
        if assignment.weight == 0 {
            return 0;
        }
        let plan = assignment
            .pairs
            .iter()
            .map(|&(i, j)| (rc[i], cc[j]))
            .collect();
        self.plans.insert((r, c), plan);
        1 + assignment.weight
    }

    fn weight(&self, r: NodeIndex, c: NodeIndex) -> u32 {
        self.weights[r * self.comparison.len() + c]
    }

    /// A full alignment of both subtrees means they are structurally equal.
    fn identical(&self, r: NodeIndex, c: NodeIndex) -> bool {
        let weight = self.weight(r, c) as usize;
        weight == self.reference.subtree_size(r) && weight == self.comparison.subtree_size(c)
    }
}
