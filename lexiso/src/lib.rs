//! # lexiso
//!
//! Isomorphism matching, diff and merge for description-logic expression
//! trees: two versions of a concept's logical definition go in, an alignment
//! of their nodes, the added and deleted subtrees, and a merged tree come out.
//!
//! ## Overview
//!
//! Expressions are built from a small fixed vocabulary (`Root`,
//! `NecessarySet`, `SufficientSet`, `And`, `SomeRole`, `Concept`) into an
//! [`ExpressionTree`] whose nodes are numbered in post-order. Aligning two
//! trees happens in three steps:
//!
//! 1. **Solve**: a [`Solver`] pairs nodes of the reference tree with nodes of
//!    the comparison tree. Pairs always share a kind and payload. Most pairs
//!    come from an alignment that walks both trees from the tops down;
//!    content that moved to another place is paired afterwards, so a paired
//!    node may sit under an unpaired parent. Two strategies exist:
//!    [`BottomUpSolver`] (weight table, leaves first) and [`PathHashSolver`]
//!    (digest lookups, top down). They agree on score and on matched leaves;
//!    [`cross_validate`] runs both in parallel.
//! 2. **Diff**: unmatched nodes are grouped into maximal subtrees, reported
//!    as [`Merge::deletions`] and [`Merge::additions`].
//! 3. **Merge**: both trees are folded into a [`MergedTree`] whose nodes
//!    point back at their source nodes.
//!
//! `And` operands are unordered throughout: equality ([`nodes_equal`]) and
//! matching both treat them as a multiset.
//!
//! ## Usage
//!
//! ```
//! use lexiso::{ConceptRef, ExpressionBuilder, SolverConfig, Strategy, compare};
//!
//! let (has_site, lung, heart) = (
//!     ConceptRef::from_u128(1),
//!     ConceptRef::from_u128(2),
//!     ConceptRef::from_u128(3),
//! );
//!
//! let mut b = ExpressionBuilder::new();
//! let site = b.concept(lung);
//! let group = b.some_role(has_site, site)?;
//! let and = b.and([group])?;
//! let before = b.build(and)?;
//!
//! let mut b = ExpressionBuilder::new();
//! let site = b.concept(lung);
//! let group = b.some_role(has_site, site)?;
//! let other = b.concept(heart);
//! let and = b.and([group, other])?;
//! let after = b.build(and)?;
//!
//! let result = compare(&before, &after, Strategy::PathHash, &SolverConfig::default())?;
//! assert_eq!(result.solution.score(), 3);
//! assert!(result.merge.deletions.is_empty());
//! assert_eq!(result.merge.additions[0].nodes, vec![2]);
//! println!("{}", result.merge.merged.display(&()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![forbid(unsafe_code)]

mod tracing_macros;

mod bipartite;
mod bottom_up;
mod builder;
mod completion;
mod concept;
mod digest;
mod display;
mod equality;
mod error;
mod merge;
mod path_hash;
mod solution;
mod solver;
mod tree;

pub use bottom_up::BottomUpSolver;
pub use builder::{Draft, ExpressionBuilder};
pub use concept::{ConceptDictionary, ConceptRef};
pub use digest::Digests;
pub use display::{MergedDisplay, TreeDisplay};
pub use equality::{EqualityOracle, nodes_equal};
pub use error::{MergeError, TreeError};
pub use merge::{ChangedSubtree, Merge, MergedNode, MergedTree, Origin, build_merge};
pub use path_hash::PathHashSolver;
pub use solution::{Ambiguity, MatchSolution};
pub use solver::{
    Comparison, CrossValidation, Solver, SolverConfig, Strategy, compare, cross_validate,
};
pub use tree::{Arity, Descendants, ExpressionNode, ExpressionTree, NodeIndex, NodeKind};
