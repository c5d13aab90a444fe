use crate::primitives::bytes::{get_u64_array, get_u64_be, put_u64_array, put_u64_be};
use crate::primitives::pager::{Block, BLOCK_SIZE};
use crate::types::{BlockId, IndexError, Result};

/// Minimum degree `t` of the tree.
pub const MIN_DEGREE: usize = 10;
/// Maximum number of keys a node holds (`2t - 1`).
pub const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;
/// Maximum number of children an internal node references (`2t`).
pub const MAX_CHILDREN: usize = 2 * MIN_DEGREE;

const BLOCK_ID_OFFSET: usize = 0;
const PARENT_OFFSET: usize = 8;
const NUM_KEYS_OFFSET: usize = 16;
const KEYS_OFFSET: usize = 24;
const VALUES_OFFSET: usize = KEYS_OFFSET + MAX_KEYS * 8;
const CHILDREN_OFFSET: usize = VALUES_OFFSET + MAX_KEYS * 8;
/// Bytes of a block actually used by a node; the rest stays zero.
pub const NODE_ENCODED_LEN: usize = CHILDREN_OFFSET + MAX_CHILDREN * 8;

const _: () = assert!(NODE_ENCODED_LEN <= BLOCK_SIZE);

/// In-memory snapshot of one B-tree node.
///
/// A `Node` is a value copy of its block: it goes stale as soon as anything
/// writes to `block_id`, so callers re-read instead of holding on to one
/// across a split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Block the node is stored in.
    pub block_id: BlockId,
    /// Parent block, `BlockId::NONE` for the root.
    pub parent: BlockId,
    /// Number of live entries in `keys` / `values`.
    pub num_keys: usize,
    /// Sorted keys; only `[0, num_keys)` is meaningful.
    pub keys: [u64; MAX_KEYS],
    /// Values paired with `keys`.
    pub values: [u64; MAX_KEYS],
    /// Child block ids; only `[0, num_keys]` is meaningful for internal nodes.
    pub children: [u64; MAX_CHILDREN],
}

impl Node {
    /// Empty node bound to `block_id`.
    pub fn new(block_id: BlockId) -> Self {
        Self {
            block_id,
            parent: BlockId::NONE,
            num_keys: 0,
            keys: [0; MAX_KEYS],
            values: [0; MAX_KEYS],
            children: [0; MAX_CHILDREN],
        }
    }

    /// A node is a leaf exactly when every child slot is zero.
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| *child == 0)
    }

    /// Returns true when no more keys fit.
    pub fn is_full(&self) -> bool {
        self.num_keys == MAX_KEYS
    }

    /// Child reference at `idx`.
    pub fn child(&self, idx: usize) -> BlockId {
        BlockId(self.children[idx])
    }

    /// Live keys.
    pub fn live_keys(&self) -> &[u64] {
        &self.keys[..self.num_keys]
    }

    /// Live child references (empty for a leaf).
    pub fn live_children(&self) -> &[u64] {
        if self.is_leaf() {
            &[]
        } else {
            &self.children[..=self.num_keys]
        }
    }

    /// First slot `i` with `key <= keys[i]`, or `num_keys` if every key is
    /// smaller. This is both the match position and the descent index.
    pub fn lower_bound(&self, key: u64) -> usize {
        self.live_keys()
            .iter()
            .position(|k| key <= *k)
            .unwrap_or(self.num_keys)
    }

    /// Inserts `key`/`value` at its sorted position. Caller guarantees the
    /// node is a non-full leaf and `key` is absent.
    pub(crate) fn insert_sorted(&mut self, key: u64, value: u64) {
        debug_assert!(!self.is_full());
        let pos = self.lower_bound(key);
        self.keys.copy_within(pos..self.num_keys, pos + 1);
        self.values.copy_within(pos..self.num_keys, pos + 1);
        self.keys[pos] = key;
        self.values[pos] = value;
        self.num_keys += 1;
    }
}

/// Lays `node` out into a zero-padded, big-endian block.
pub fn encode_node(node: &Node) -> Block {
    let mut buf = [0u8; BLOCK_SIZE];
    put_u64_be(&mut buf, BLOCK_ID_OFFSET, node.block_id.0);
    put_u64_be(&mut buf, PARENT_OFFSET, node.parent.0);
    put_u64_be(&mut buf, NUM_KEYS_OFFSET, node.num_keys as u64);
    put_u64_array(&mut buf, KEYS_OFFSET, &node.keys);
    put_u64_array(&mut buf, VALUES_OFFSET, &node.values);
    put_u64_array(&mut buf, CHILDREN_OFFSET, &node.children);
    buf
}

/// Decodes a node block.
pub fn decode_node(buf: &[u8]) -> Result<Node> {
    if buf.len() < BLOCK_SIZE {
        return Err(IndexError::Format("node block truncated"));
    }
    let num_keys = get_u64_be(buf, NUM_KEYS_OFFSET);
    if num_keys > MAX_KEYS as u64 {
        return Err(IndexError::Format("node key count exceeds capacity"));
    }
    let mut node = Node::new(BlockId(get_u64_be(buf, BLOCK_ID_OFFSET)));
    node.parent = BlockId(get_u64_be(buf, PARENT_OFFSET));
    node.num_keys = num_keys as usize;
    get_u64_array(buf, KEYS_OFFSET, &mut node.keys);
    get_u64_array(buf, VALUES_OFFSET, &mut node.values);
    get_u64_array(buf, CHILDREN_OFFSET, &mut node.children);
    Ok(node)
}
