//! Persistent data structures layered on the block pager.

/// On-disk B-tree mapping u64 keys to u64 values.
///
/// Every node lives in its own block and children are referenced by block id.
pub mod btree;
