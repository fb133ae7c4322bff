//! Text outlines of expression and merged trees.
//!
//! Concepts are labelled through an injected [`ConceptDictionary`]; pass
//! `&()` to show raw UUIDs.

use core::fmt;

use owo_colors::OwoColorize;

use crate::concept::{ConceptDictionary, write_concept};
use crate::merge::{MergedTree, Origin};
use crate::tree::{ExpressionTree, NodeKind};

const INDENT: &str = "  ";

/// A node label: kind name plus the described payload.
struct Label<'a, D: ?Sized> {
    kind: NodeKind,
    dictionary: &'a D,
}

impl<D: ConceptDictionary + ?Sized> fmt::Display for Label<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if let Some(payload) = self.kind.payload() {
            f.write_str("(")?;
            write_concept(f, self.dictionary, payload)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Walk `children` from `top` in pre-order, calling `line` with each node
/// and its depth.
fn outline<'c>(
    top: usize,
    children: impl Fn(usize) -> &'c [usize],
    mut line: impl FnMut(usize, usize) -> fmt::Result,
) -> fmt::Result {
    let mut stack = vec![(top, 0)];
    while let Some((index, depth)) = stack.pop() {
        line(index, depth)?;
        stack.extend(children(index).iter().rev().map(|&c| (c, depth + 1)));
    }
    Ok(())
}

/// Indented outline of an [`ExpressionTree`], from
/// [`ExpressionTree::display`].
pub struct TreeDisplay<'a, D: ?Sized> {
    tree: &'a ExpressionTree,
    dictionary: &'a D,
}

impl ExpressionTree {
    /// Render as an indented outline, two spaces per level.
    pub fn display<'a, D: ConceptDictionary + ?Sized>(
        &'a self,
        dictionary: &'a D,
    ) -> TreeDisplay<'a, D> {
        TreeDisplay {
            tree: self,
            dictionary,
        }
    }
}

impl<D: ConceptDictionary + ?Sized> fmt::Display for TreeDisplay<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree;
        outline(
            tree.root(),
            move |i| tree.children(i),
            |i, depth| {
                let label = Label {
                    kind: tree.kind(i),
                    dictionary: self.dictionary,
                };
                writeln!(f, "{}{label}", INDENT.repeat(depth))
            },
        )
    }
}

/// Outline of a [`MergedTree`] with a change marker column, from
/// [`MergedTree::display`].
///
/// Added lines start with `+`, deleted lines with `-`.
pub struct MergedDisplay<'a, D: ?Sized> {
    tree: &'a MergedTree,
    dictionary: &'a D,
    colors: bool,
}

impl<D: ?Sized> MergedDisplay<'_, D> {
    /// Colour additions green and deletions red with ANSI escapes.
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }
}

impl MergedTree {
    /// Render as an indented outline with `+`/`-` markers. Colours are off
    /// until [`MergedDisplay::with_colors`] is called.
    pub fn display<'a, D: ConceptDictionary + ?Sized>(
        &'a self,
        dictionary: &'a D,
    ) -> MergedDisplay<'a, D> {
        MergedDisplay {
            tree: self,
            dictionary,
            colors: false,
        }
    }
}

impl<D: ConceptDictionary + ?Sized> fmt::Display for MergedDisplay<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree;
        outline(
            tree.root(),
            move |i| tree.node(i).children.as_slice(),
            |i, depth| {
                let node = tree.node(i);
                let label = Label {
                    kind: node.kind,
                    dictionary: self.dictionary,
                };
                let indent = INDENT.repeat(depth);
                match (node.origin, self.colors) {
                    (Origin::Both { .. }, _) => writeln!(f, "  {indent}{label}"),
                    (Origin::Comparison(_), false) => writeln!(f, "+ {indent}{label}"),
                    (Origin::Reference(_), false) => writeln!(f, "- {indent}{label}"),
                    (Origin::Comparison(_), true) => {
                        writeln!(f, "{}", format!("+ {indent}{label}").green())
                    }
                    (Origin::Reference(_), true) => {
                        writeln!(f, "{}", format!("- {indent}{label}").red())
                    }
                }
            },
        )
    }
}
