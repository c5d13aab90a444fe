use std::collections::HashSet;

use crate::primitives::io::FileIo;
use crate::types::{BlockId, IndexError, Result};

use super::node::{Node, MIN_DEGREE};
use super::tree::{depth_exceeded, BTree, MAX_DEPTH};

/// Shape of a tree that passed [`BTree::verify`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeSummary {
    /// Number of levels, 0 for an empty tree.
    pub height: usize,
    /// Number of nodes reachable from the root.
    pub nodes: u64,
    /// Number of leaf nodes.
    pub leaves: u64,
    /// Number of stored keys.
    pub keys: u64,
}

struct Walk {
    seen: HashSet<u64>,
    leaf_depth: Option<usize>,
    summary: TreeSummary,
}

impl<F: FileIo> BTree<F> {
    /// Walks the whole tree checking every structural invariant.
    ///
    /// Checks key ordering and subtree bounds, node occupancy, child counts,
    /// parent back-references, uniqueness of block references, and that all
    /// leaves sit at the same depth.
    pub fn verify(&self) -> Result<TreeSummary> {
        let root = self.root();
        if root.is_none() {
            return Ok(TreeSummary::default());
        }
        let mut walk = Walk {
            seen: HashSet::new(),
            leaf_depth: None,
            summary: TreeSummary::default(),
        };
        self.verify_node(root, BlockId::NONE, None, None, 1, &mut walk)?;
        walk.summary.height = walk.leaf_depth.unwrap_or(0);
        tracing::debug!(
            target: "blockdex::btree::verify",
            height = walk.summary.height,
            nodes = walk.summary.nodes,
            keys = walk.summary.keys,
            "tree verified"
        );
        Ok(walk.summary)
    }

    fn verify_node(
        &self,
        id: BlockId,
        expected_parent: BlockId,
        lower: Option<u64>,
        upper: Option<u64>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(depth_exceeded());
        }
        if !walk.seen.insert(id.0) {
            return Err(corrupt(id, "block referenced more than once"));
        }
        let node = self.read_node(id)?;
        if node.parent != expected_parent {
            return Err(IndexError::Corrupt(format!(
                "node {id} records parent {} but is referenced from {expected_parent}",
                node.parent
            )));
        }
        let is_root = expected_parent.is_none();
        if !is_root && node.num_keys < MIN_DEGREE - 1 {
            return Err(corrupt(id, "non-root node below minimum occupancy"));
        }
        check_keys(&node, lower, upper)?;

        walk.summary.nodes += 1;
        walk.summary.keys += node.num_keys as u64;

        if node.is_leaf() {
            walk.summary.leaves += 1;
            return match walk.leaf_depth {
                None => {
                    walk.leaf_depth = Some(depth);
                    Ok(())
                }
                Some(expected) if expected == depth => Ok(()),
                Some(expected) => Err(IndexError::Corrupt(format!(
                    "leaf {id} at depth {depth}, expected {expected}"
                ))),
            };
        }

        if node.num_keys == 0 {
            return Err(corrupt(id, "internal node without keys"));
        }
        let live = node.num_keys + 1;
        if node.children[..live].iter().any(|child| *child == 0) {
            return Err(corrupt(id, "internal node missing a child"));
        }
        if node.children[live..].iter().any(|child| *child != 0) {
            return Err(corrupt(id, "child reference beyond key count"));
        }
        for slot in 0..live {
            let child_lower = if slot == 0 {
                lower
            } else {
                Some(node.keys[slot - 1])
            };
            let child_upper = if slot == node.num_keys {
                upper
            } else {
                Some(node.keys[slot])
            };
            self.verify_node(
                node.child(slot),
                id,
                child_lower,
                child_upper,
                depth + 1,
                walk,
            )?;
        }
        Ok(())
    }
}

fn check_keys(node: &Node, lower: Option<u64>, upper: Option<u64>) -> Result<()> {
    let keys = node.live_keys();
    if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(corrupt(node.block_id, "keys not strictly increasing"));
    }
    if let (Some(bound), Some(first)) = (lower, keys.first()) {
        if *first <= bound {
            return Err(corrupt(node.block_id, "key below subtree bound"));
        }
    }
    if let (Some(bound), Some(last)) = (upper, keys.last()) {
        if *last >= bound {
            return Err(corrupt(node.block_id, "key above subtree bound"));
        }
    }
    Ok(())
}

fn corrupt(id: BlockId, what: &str) -> IndexError {
    IndexError::Corrupt(format!("node {id}: {what}"))
}
