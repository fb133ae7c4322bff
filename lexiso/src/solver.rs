//! The solver capability, its configuration, and cross-validation of the
//! two strategies.

use core::cmp::Ordering;
use core::fmt;

use crate::bottom_up::BottomUpSolver;
use crate::error::MergeError;
use crate::merge::{Merge, build_merge};
use crate::path_hash::PathHashSolver;
use crate::solution::MatchSolution;
use crate::tracing_macros::debug;
use crate::tree::{ExpressionTree, NodeIndex};

/// Configuration for the solvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Largest number of remaining sibling candidates for which the sibling
    /// assignment is solved exactly. Above it a greedy pass is used.
    /// Values over 16 are treated as 16.
    pub exact_assignment_limit: usize,

    /// Whether to record [`Ambiguity`](crate::Ambiguity) entries in the
    /// solution.
    pub record_ambiguities: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            exact_assignment_limit: 12,
            record_ambiguities: true,
        }
    }
}

/// Which algorithm produced, or should produce, a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Weight table filled leaves first. See [`BottomUpSolver`].
    BottomUp,
    /// Digest lookups evaluated top down. See [`PathHashSolver`].
    PathHash,
}

impl Strategy {
    /// Both strategies.
    pub const ALL: [Strategy; 2] = [Strategy::BottomUp, Strategy::PathHash];

    /// A solver for this strategy.
    pub fn solver(self, config: SolverConfig) -> Box<dyn Solver> {
        match self {
            Strategy::BottomUp => Box::new(BottomUpSolver::new(config)),
            Strategy::PathHash => Box::new(PathHashSolver::new(config)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::BottomUp => "bottom-up",
            Strategy::PathHash => "path-hash",
        })
    }
}

/// Computes an alignment between a reference and a comparison tree.
///
/// Implementations are pure: the same trees always give the same solution,
/// and nothing is shared between calls.
pub trait Solver: Send + Sync {
    /// Which strategy this is.
    fn strategy(&self) -> Strategy;

    /// Align `reference` with `comparison`.
    fn solve(&self, reference: &ExpressionTree, comparison: &ExpressionTree) -> MatchSolution;
}

/// Solutions from both strategies for the same tree pair.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    /// The bottom-up solution.
    pub bottom_up: MatchSolution,
    /// The path-hash solution.
    pub path_hash: MatchSolution,
}

impl CrossValidation {
    /// Whether both solutions have the same score.
    pub fn scores_agree(&self) -> bool {
        self.bottom_up.score() == self.path_hash.score()
    }

    /// Whether both solutions pair the same concept leaves.
    pub fn leaf_pairs_agree(&self, reference: &ExpressionTree) -> bool {
        self.bottom_up.leaf_pairs(reference) == self.path_hash.leaf_pairs(reference)
    }

    /// Scores and leaf pairs both agree.
    pub fn agrees(&self, reference: &ExpressionTree) -> bool {
        self.scores_agree() && self.leaf_pairs_agree(reference)
    }

    /// Reference interior nodes paired differently by the two solutions.
    pub fn interior_divergence(&self, reference: &ExpressionTree) -> Vec<NodeIndex> {
        (0..reference.len())
            .filter(|&r| !reference.kind(r).is_leaf())
            .filter(|&r| self.bottom_up.comparison_for(r) != self.path_hash.comparison_for(r))
            .collect()
    }

    /// The better-ranked solution; bottom-up on a tie.
    pub fn preferred(&self) -> &MatchSolution {
        match self.path_hash.rank(&self.bottom_up) {
            Ordering::Greater => &self.path_hash,
            _ => &self.bottom_up,
        }
    }
}

/// Run both solvers on the same pair, concurrently.
pub fn cross_validate(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    config: &SolverConfig,
) -> CrossValidation {
    let (bottom_up, path_hash) = rayon::join(
        || BottomUpSolver::new(config.clone()).solve(reference, comparison),
        || PathHashSolver::new(config.clone()).solve(reference, comparison),
    );
    let validation = CrossValidation {
        bottom_up,
        path_hash,
    };
    debug!(
        bottom_up = validation.bottom_up.score(),
        path_hash = validation.path_hash.score(),
        "cross-validated"
    );
    validation
}

/// A solved and merged tree pair.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// The alignment.
    pub solution: MatchSolution,
    /// Additions, deletions and the merged tree.
    pub merge: Merge,
}

/// Solve with `strategy`, then build the merge.
///
/// ```
/// use lexiso::{ConceptRef, ExpressionBuilder, SolverConfig, Strategy, compare};
///
/// let role = ConceptRef::from_u128(1);
/// let (old_site, new_site) = (ConceptRef::from_u128(10), ConceptRef::from_u128(11));
///
/// let mut b = ExpressionBuilder::new();
/// let site = b.concept(old_site);
/// let group = b.some_role(role, site)?;
/// let before = b.build(group)?;
///
/// let mut b = ExpressionBuilder::new();
/// let site = b.concept(new_site);
/// let group = b.some_role(role, site)?;
/// let after = b.build(group)?;
///
/// let result = compare(&before, &after, Strategy::BottomUp, &SolverConfig::default())?;
/// // different fillers leave nothing to anchor the role group on
/// assert_eq!(result.solution.score(), 0);
/// assert_eq!(result.merge.deletions.len(), 1);
/// assert_eq!(result.merge.additions.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compare(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    strategy: Strategy,
    config: &SolverConfig,
) -> Result<Comparison, MergeError> {
    let solution = strategy.solver(config.clone()).solve(reference, comparison);
    let merge = build_merge(reference, comparison, &solution)?;
    Ok(Comparison { solution, merge })
}
