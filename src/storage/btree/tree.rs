use std::path::Path;

use crate::primitives::io::{FileIo, StdFileIo};
use crate::primitives::pager::meta::{load_header, store_header};
use crate::primitives::pager::{truncated_as_format, BlockFile, Header};
use crate::types::{BlockId, IndexError, Result};

use super::iter::Iter;
use super::node::{decode_node, encode_node, Node, MAX_KEYS, MIN_DEGREE};
use super::stats::BTreeStats;

/// Upper bound on tree height. With a fan-out of at least ten, no tree that
/// fits in a u64 block space gets close; hitting it means a reference cycle.
pub(crate) const MAX_DEPTH: usize = 64;

/// Persistent B-tree over a block file.
///
/// The tree owns the header for as long as the file is open. Nodes are never
/// cached: every access re-reads its block and every mutation is written and
/// flushed before the algorithm continues.
pub struct BTree<F: FileIo = StdFileIo> {
    store: BlockFile<F>,
    header: Header,
    stats: BTreeStats,
}

impl BTree<StdFileIo> {
    /// Creates an empty index at `path`, replacing whatever was there.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tree = Self::init(BlockFile::create(path)?)?;
        tracing::debug!(target: "blockdex::btree", path = %path.display(), "created index");
        Ok(tree)
    }

    /// Opens an existing index at `path`, validating its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tree = Self::attach(BlockFile::open(path)?)?;
        tracing::debug!(
            target: "blockdex::btree",
            path = %path.display(),
            root = tree.header.root.0,
            next_block = tree.header.next_block.0,
            "opened index"
        );
        Ok(tree)
    }
}

impl<F: FileIo> BTree<F> {
    /// Initializes an empty index on `io`, discarding its previous contents.
    pub fn create_with(io: F) -> Result<Self> {
        io.truncate(0)?;
        Self::init(BlockFile::new(io))
    }

    /// Opens the index stored on `io`.
    pub fn open_with(io: F) -> Result<Self> {
        Self::attach(BlockFile::new(io))
    }

    fn init(store: BlockFile<F>) -> Result<Self> {
        let header = Header::empty();
        store_header(&store, &header)?;
        Ok(Self {
            store,
            header,
            stats: BTreeStats::default(),
        })
    }

    fn attach(store: BlockFile<F>) -> Result<Self> {
        let header = load_header(&store)?;
        Ok(Self {
            store,
            header,
            stats: BTreeStats::default(),
        })
    }

    /// Current header state.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Block holding the root node, `BlockId::NONE` for an empty tree.
    pub fn root(&self) -> BlockId {
        self.header.root
    }

    /// Returns true when no key has been inserted.
    pub fn is_empty(&self) -> bool {
        self.header.root.is_none()
    }

    /// Operation counters for this handle.
    pub fn stats(&self) -> &BTreeStats {
        &self.stats
    }

    /// Underlying block store.
    pub fn store(&self) -> &BlockFile<F> {
        &self.store
    }

    /// Looks up `key`, returning its value or `None` on a miss.
    pub fn search(&self, key: u64) -> Result<Option<u64>> {
        self.stats.inc_searches();
        let mut current = self.header.root;
        for _ in 0..MAX_DEPTH {
            if current.is_none() {
                return Ok(None);
            }
            let node = self.read_node(current)?;
            let idx = node.lower_bound(key);
            if idx < node.num_keys && node.keys[idx] == key {
                return Ok(Some(node.values[idx]));
            }
            if node.is_leaf() {
                return Ok(None);
            }
            current = self.child_of(&node, idx)?;
            tracing::trace!(
                target: "blockdex::btree::search",
                block = node.block_id.0,
                child = current.0,
                "descending through internal node"
            );
        }
        Err(depth_exceeded())
    }

    /// Returns true when `key` is present.
    pub fn exists(&self, key: u64) -> Result<bool> {
        Ok(self.search(key)?.is_some())
    }

    /// Inserts a new key.
    ///
    /// Fails with [`IndexError::DuplicateKey`] without touching the file if
    /// `key` is already present. Full nodes are split on the way down, so
    /// the descent never has to revisit a node it has left.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<()> {
        if self.exists(key)? {
            return Err(IndexError::DuplicateKey(key));
        }
        if self.header.root.is_none() {
            let id = self.allocate(true)?;
            let mut root = Node::new(id);
            root.insert_sorted(key, value);
            self.write_node(&root)?;
            self.header.root = id;
            self.store_header()?;
        } else {
            let root = self.read_node(self.header.root)?;
            if root.is_full() {
                self.grow_root(root)?;
            }
            self.insert_non_full(self.header.root, key, value)?;
        }
        self.stats.inc_inserts();
        Ok(())
    }

    /// Iterates all entries in ascending key order.
    ///
    /// The iterator reads nodes lazily; calling `iter` again starts over from
    /// the current root.
    pub fn iter(&self) -> Iter<'_, F> {
        Iter::new(self)
    }

    /// Collects every entry in ascending key order.
    pub fn traverse(&self) -> Result<Vec<(u64, u64)>> {
        self.iter().collect()
    }

    /// Reads and decodes the node stored in `id`.
    pub(crate) fn read_node(&self, id: BlockId) -> Result<Node> {
        if id.is_none() || id >= self.header.next_block {
            return Err(IndexError::Corrupt(format!(
                "node reference {id} outside allocated range 1..{}",
                self.header.next_block
            )));
        }
        let block = self
            .store
            .read_block(id)
            .map_err(|err| truncated_as_format(err, "node block truncated"))?;
        let node = decode_node(&block)?;
        if node.block_id != id {
            return Err(IndexError::Format("node block id mismatch"));
        }
        self.stats.inc_node_reads();
        Ok(node)
    }

    fn write_node(&self, node: &Node) -> Result<()> {
        self.store.write_block(node.block_id, &encode_node(node))?;
        self.stats.inc_node_writes();
        Ok(())
    }

    fn store_header(&self) -> Result<()> {
        store_header(&self.store, &self.header)
    }

    /// Hands out the next block id, persisting an empty node there and the
    /// advanced counter in the header. Ids are never handed out twice, even
    /// when a later write fails.
    fn allocate(&mut self, leaf: bool) -> Result<BlockId> {
        let id = self.header.next_block;
        let next = id
            .0
            .checked_add(1)
            .ok_or(IndexError::Invalid("block id space exhausted"))?;
        self.header.next_block = BlockId(next);
        self.write_node(&Node::new(id))?;
        self.store_header()?;
        self.stats.inc_allocations();
        tracing::trace!(target: "blockdex::btree::alloc", block = id.0, leaf, "allocated node");
        Ok(id)
    }

    fn child_of(&self, node: &Node, idx: usize) -> Result<BlockId> {
        let child = node.child(idx);
        if child.is_none() {
            return Err(IndexError::Corrupt(format!(
                "internal node {} has no child at slot {idx}",
                node.block_id
            )));
        }
        Ok(child)
    }

    /// Puts a new, empty root above the full `old_root` and splits it, adding
    /// one level to the tree.
    fn grow_root(&mut self, mut old_root: Node) -> Result<()> {
        let new_root_id = self.allocate(false)?;
        let mut new_root = Node::new(new_root_id);
        new_root.children[0] = old_root.block_id.0;
        self.write_node(&new_root)?;
        old_root.parent = new_root_id;
        self.write_node(&old_root)?;

        self.split_child(new_root_id, 0)?;
        self.header.root = new_root_id;
        self.store_header()?;
        self.stats.inc_root_splits();
        tracing::debug!(
            target: "blockdex::btree::split",
            old_root = old_root.block_id.0,
            new_root = new_root_id.0,
            "grew tree by one level"
        );
        Ok(())
    }

    /// Splits the full child at `parent.children[index]`.
    ///
    /// The upper `t - 1` entries (and, for internal nodes, the upper `t`
    /// children) move to a new sibling, and the median entry is promoted into
    /// the parent at `index`. The parent must not be full.
    fn split_child(&mut self, parent_id: BlockId, index: usize) -> Result<()> {
        let mut parent = self.read_node(parent_id)?;
        if parent.is_full() {
            return Err(IndexError::Corrupt(format!(
                "split target parent {parent_id} is full"
            )));
        }
        let child_id = self.child_of(&parent, index)?;
        let mut child = self.read_node(child_id)?;
        if !child.is_full() {
            return Err(IndexError::Corrupt(format!(
                "split requested for non-full node {child_id}"
            )));
        }

        let leaf = child.is_leaf();
        let sibling_id = self.allocate(leaf)?;
        let mut sibling = Node::new(sibling_id);
        sibling.parent = parent_id;
        sibling.num_keys = MIN_DEGREE - 1;
        sibling.keys[..MIN_DEGREE - 1].copy_from_slice(&child.keys[MIN_DEGREE..MAX_KEYS]);
        sibling.values[..MIN_DEGREE - 1].copy_from_slice(&child.values[MIN_DEGREE..MAX_KEYS]);
        if !leaf {
            sibling.children[..MIN_DEGREE].copy_from_slice(&child.children[MIN_DEGREE..]);
            for moved in sibling.children[..MIN_DEGREE].iter().copied() {
                let mut grandchild = self.read_node(BlockId(moved))?;
                grandchild.parent = sibling_id;
                self.write_node(&grandchild)?;
            }
        }

        let median_key = child.keys[MIN_DEGREE - 1];
        let median_value = child.values[MIN_DEGREE - 1];
        child.keys[MIN_DEGREE - 1..].fill(0);
        child.values[MIN_DEGREE - 1..].fill(0);
        child.children[MIN_DEGREE..].fill(0);
        child.num_keys = MIN_DEGREE - 1;
        child.parent = parent_id;
        self.write_node(&child)?;
        self.write_node(&sibling)?;

        let n = parent.num_keys;
        parent.children.copy_within(index + 1..=n, index + 2);
        parent.children[index + 1] = sibling_id.0;
        parent.keys.copy_within(index..n, index + 1);
        parent.values.copy_within(index..n, index + 1);
        parent.keys[index] = median_key;
        parent.values[index] = median_value;
        parent.num_keys += 1;
        self.write_node(&parent)?;

        self.stats.inc_splits();
        tracing::debug!(
            target: "blockdex::btree::split",
            parent = parent_id.0,
            left = child_id.0,
            right = sibling_id.0,
            median = median_key,
            leaf,
            "split node"
        );
        Ok(())
    }

    /// Descends from `start`, which must not be full, to the leaf that
    /// receives `key`, splitting any full child before stepping into it.
    fn insert_non_full(&mut self, start: BlockId, key: u64, value: u64) -> Result<()> {
        let mut current = start;
        for _ in 0..MAX_DEPTH {
            let mut node = self.read_node(current)?;
            let mut idx = node.lower_bound(key);
            if idx < node.num_keys && node.keys[idx] == key {
                return Err(IndexError::DuplicateKey(key));
            }
            if node.is_leaf() {
                node.insert_sorted(key, value);
                return self.write_node(&node);
            }

            let child_id = self.child_of(&node, idx)?;
            let child = self.read_node(child_id)?;
            if !child.is_full() {
                current = child_id;
                continue;
            }

            self.split_child(current, idx)?;
            // The split rewrote this node's key and child arrays.
            let node = self.read_node(current)?;
            let separator = node.keys[idx];
            if key == separator {
                return Err(IndexError::DuplicateKey(key));
            }
            if key > separator {
                idx += 1;
            }
            current = self.child_of(&node, idx)?;
        }
        Err(depth_exceeded())
    }
}

pub(crate) fn depth_exceeded() -> IndexError {
    IndexError::Corrupt(format!("tree deeper than {MAX_DEPTH} levels"))
}
