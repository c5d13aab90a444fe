#![forbid(unsafe_code)]

//! Disk-resident B-tree of minimum degree 10 mapping u64 keys to u64 values.

/// Fixed-size node layout and its codec.
pub mod node;
mod iter;
mod stats;
mod tree;
mod verify;

pub use iter::Iter;
pub use node::{decode_node, encode_node, Node, MAX_CHILDREN, MAX_KEYS, MIN_DEGREE};
pub use stats::{BTreeStats, BTreeStatsSnapshot};
pub use tree::BTree;
pub use verify::TreeSummary;
