use std::iter::FusedIterator;

use crate::primitives::io::FileIo;
use crate::types::{BlockId, Result};

use super::node::Node;
use super::tree::{depth_exceeded, BTree, MAX_DEPTH};

struct Frame {
    node: Node,
    /// Next key slot to emit; `children[slot]` has already been walked.
    slot: usize,
}

/// Lazy in-order walk over a [`BTree`].
///
/// Holds at most one node per level. After the first error the iterator is
/// exhausted.
pub struct Iter<'a, F: FileIo> {
    tree: &'a BTree<F>,
    stack: Vec<Frame>,
    start: Option<BlockId>,
    failed: bool,
}

impl<'a, F: FileIo> Iter<'a, F> {
    pub(crate) fn new(tree: &'a BTree<F>) -> Self {
        let root = tree.root();
        Self {
            tree,
            stack: Vec::new(),
            start: (!root.is_none()).then_some(root),
            failed: false,
        }
    }

    /// Pushes `id` and its leftmost descendants.
    fn descend_left(&mut self, mut id: BlockId) -> Result<()> {
        loop {
            if self.stack.len() >= MAX_DEPTH {
                return Err(depth_exceeded());
            }
            let node = self.tree.read_node(id)?;
            let next = (!node.is_leaf()).then(|| node.child(0));
            self.stack.push(Frame { node, slot: 0 });
            match next {
                Some(child) if !child.is_none() => id = child,
                _ => return Ok(()),
            }
        }
    }

    fn advance(&mut self) -> Result<Option<(u64, u64)>> {
        if let Some(root) = self.start.take() {
            self.descend_left(root)?;
        }
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            if frame.slot >= frame.node.num_keys {
                self.stack.pop();
                continue;
            }
            let slot = frame.slot;
            frame.slot += 1;
            let entry = (frame.node.keys[slot], frame.node.values[slot]);
            let right = (!frame.node.is_leaf()).then(|| frame.node.child(slot + 1));
            if let Some(child) = right.filter(|child| !child.is_none()) {
                self.descend_left(child)?;
            }
            return Ok(Some(entry));
        }
    }
}

impl<F: FileIo> Iterator for Iter<'_, F> {
    type Item = Result<(u64, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                self.stack.clear();
                Some(Err(err))
            }
        }
    }
}

impl<F: FileIo> FusedIterator for Iter<'_, F> {}
