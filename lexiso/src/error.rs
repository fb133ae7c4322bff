//! Error types.

use core::fmt;

use crate::tree::{Arity, NodeIndex};

/// A malformed expression tree, rejected before any matching starts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// The tree has no nodes.
    Empty,

    /// A node's `index` does not equal its position in the node array.
    IndexMismatch {
        /// Position of the node in the array.
        position: usize,
        /// The index the node claims.
        index: NodeIndex,
    },

    /// A child index points past the end of the node array.
    ChildOutOfRange {
        /// The parent listing the child.
        node: NodeIndex,
        /// The offending child index.
        child: NodeIndex,
        /// Number of nodes in the tree.
        len: usize,
    },

    /// A child index is not smaller than its parent's index.
    ///
    /// Indices are assigned in post-order, so this also catches self-loops
    /// and cycles.
    NotPostOrder {
        /// The parent listing the child.
        node: NodeIndex,
        /// The offending child index.
        child: NodeIndex,
    },

    /// A node has the wrong number of children for its kind.
    Arity {
        /// The node.
        node: NodeIndex,
        /// Name of the node's kind.
        kind: &'static str,
        /// What the kind admits.
        expected: Arity,
        /// How many children the node has.
        found: usize,
    },

    /// A node is listed as the child of two parents.
    SharedChild {
        /// The shared node.
        child: NodeIndex,
        /// The first parent listing it.
        first_parent: NodeIndex,
        /// The second parent listing it.
        second_parent: NodeIndex,
    },

    /// More than one node has no parent.
    MultipleTops {
        /// A parentless node other than the last one.
        node: NodeIndex,
        /// The last node, which is the expected top.
        top: NodeIndex,
    },

    /// A `Root` node appears below another node.
    NestedRoot {
        /// The `Root` node.
        node: NodeIndex,
        /// Its parent.
        parent: NodeIndex,
    },

    /// The builder was asked to attach a node that already has a parent.
    AlreadyAttached {
        /// Kind of the node being attached.
        kind: &'static str,
    },

    /// The builder was given a handle it did not create.
    UnknownHandle,

    /// The builder was asked for an `And` with no operands.
    EmptyConjunction,

    /// Nodes were created in the builder but never attached below the top.
    Unattached {
        /// Number of unattached nodes.
        count: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::Empty => f.write_str("expression tree has no nodes"),
            TreeError::IndexMismatch { position, index } => {
                write!(f, "node at position {position} claims index {index}")
            }
            TreeError::ChildOutOfRange { node, child, len } => {
                write!(
                    f,
                    "node {node} lists child {child}, but the tree only has {len} nodes"
                )
            }
            TreeError::NotPostOrder { node, child } => {
                write!(
                    f,
                    "node {node} lists child {child}; children must have smaller indices"
                )
            }
            TreeError::Arity {
                node,
                kind,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{kind} node {node} has {found} children, expected {expected}"
                )
            }
            TreeError::SharedChild {
                child,
                first_parent,
                second_parent,
            } => {
                write!(
                    f,
                    "node {child} is a child of both {first_parent} and {second_parent}"
                )
            }
            TreeError::MultipleTops { node, top } => {
                write!(f, "node {node} has no parent, but node {top} is the top")
            }
            TreeError::NestedRoot { node, parent } => {
                write!(f, "Root node {node} has parent {parent}")
            }
            TreeError::AlreadyAttached { kind } => {
                write!(f, "{kind} node is already attached to a parent")
            }
            TreeError::UnknownHandle => f.write_str("handle does not belong to this builder"),
            TreeError::EmptyConjunction => f.write_str("And needs at least one operand"),
            TreeError::Unattached { count } => {
                write!(f, "{count} node(s) were built but never attached")
            }
        }
    }
}

impl core::error::Error for TreeError {}

/// A solution that cannot be merged with the tree pair it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MergeError {
    /// The solution's maps are sized for different trees.
    SizeMismatch {
        /// Reference tree length.
        reference_len: usize,
        /// Comparison tree length.
        comparison_len: usize,
        /// Length of the solution's reference map.
        solution_reference_len: usize,
        /// Length of the solution's comparison map.
        solution_comparison_len: usize,
    },

    /// The two directions of the solution disagree about a pair.
    Asymmetric {
        /// Reference node.
        reference: NodeIndex,
        /// Comparison node.
        comparison: NodeIndex,
    },

    /// A pair joins nodes with different kinds or payloads.
    LabelMismatch {
        /// Reference node.
        reference: NodeIndex,
        /// Comparison node.
        comparison: NodeIndex,
    },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::SizeMismatch {
                reference_len,
                comparison_len,
                solution_reference_len,
                solution_comparison_len,
            } => write!(
                f,
                "solution covers {solution_reference_len}x{solution_comparison_len} nodes, trees have {reference_len}x{comparison_len}"
            ),
            MergeError::Asymmetric {
                reference,
                comparison,
            } => write!(
                f,
                "solution maps reference {reference} to comparison {comparison} in one direction only"
            ),
            MergeError::LabelMismatch {
                reference,
                comparison,
            } => write!(
                f,
                "reference {reference} and comparison {comparison} are paired but have different labels"
            ),
        }
    }
}

impl core::error::Error for MergeError {}
