//! Structural and path digests.
//!
//! The subtree digest of a node hashes its kind together with the *sorted*
//! digests of its children, Merkle-style, so it does not depend on the order
//! of `And` operands. Two structurally equal subtrees always share a digest.
//!
//! The path digest hashes the chain of kinds from the top of the tree down to
//! the node. The anchored alignment only pairs nodes whose path digests agree.

use core::hash::{Hash, Hasher};

use rapidhash::fast::RapidHasher;

use crate::tree::{ExpressionTree, NodeIndex};

/// Per-node digests of one tree.
#[derive(Debug, Clone)]
pub struct Digests {
    subtree: Vec<u64>,
    path: Vec<u64>,
}

impl Digests {
    /// Compute both digests for every node of `tree`.
    pub fn compute(tree: &ExpressionTree) -> Self {
        let mut subtree = vec![0u64; tree.len()];
        let mut child_digests = Vec::new();
        for node in tree.nodes() {
            child_digests.clear();
            child_digests.extend(node.children.iter().map(|&c| subtree[c]));
            child_digests.sort_unstable();

            let mut hasher = RapidHasher::default();
            node.kind.hash(&mut hasher);
            child_digests.hash(&mut hasher);
            subtree[node.index] = hasher.finish();
        }

        // parents have larger indices, so walk downwards
        let mut path = vec![0u64; tree.len()];
        for index in (0..tree.len()).rev() {
            let mut hasher = RapidHasher::default();
            if let Some(parent) = tree.parent(index) {
                hasher.write_u64(path[parent]);
            }
            tree.kind(index).hash(&mut hasher);
            path[index] = hasher.finish();
        }

        Self { subtree, path }
    }

    /// Digest of the subtree rooted at `index`.
    pub fn subtree(&self, index: NodeIndex) -> u64 {
        self.subtree[index]
    }

    /// Digest of the kind chain from the top down to `index`.
    pub fn path(&self, index: NodeIndex) -> u64 {
        self.path[index]
    }
}
