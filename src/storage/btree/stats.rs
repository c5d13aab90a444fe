use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Snapshot of B-tree statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeStatsSnapshot {
    /// Number of point lookups performed (including existence checks)
    pub searches: u64,
    /// Number of keys inserted
    pub inserts: u64,
    /// Number of node splits performed, root splits included
    pub splits: u64,
    /// Number of splits that grew the tree by one level
    pub root_splits: u64,
    /// Number of node blocks read and decoded
    pub node_reads: u64,
    /// Number of node blocks encoded and written
    pub node_writes: u64,
    /// Number of blocks handed out by the allocator
    pub allocations: u64,
}

/// Operation counters kept by a [`super::BTree`] for its lifetime.
#[derive(Default)]
pub struct BTreeStats {
    searches: AtomicU64,
    inserts: AtomicU64,
    splits: AtomicU64,
    root_splits: AtomicU64,
    node_reads: AtomicU64,
    node_writes: AtomicU64,
    allocations: AtomicU64,
}

impl BTreeStats {
    pub(crate) fn inc_searches(&self) {
        self.searches.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_inserts(&self) {
        self.inserts.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_splits(&self) {
        self.splits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_root_splits(&self) {
        self.root_splits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_node_reads(&self) {
        self.node_reads.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_node_writes(&self) {
        self.node_writes.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_allocations(&self) {
        self.allocations.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> BTreeStatsSnapshot {
        BTreeStatsSnapshot {
            searches: self.searches.load(AtomicOrdering::Relaxed),
            inserts: self.inserts.load(AtomicOrdering::Relaxed),
            splits: self.splits.load(AtomicOrdering::Relaxed),
            root_splits: self.root_splits.load(AtomicOrdering::Relaxed),
            node_reads: self.node_reads.load(AtomicOrdering::Relaxed),
            node_writes: self.node_writes.load(AtomicOrdering::Relaxed),
            allocations: self.allocations.load(AtomicOrdering::Relaxed),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "blockdex::btree::stats",
            searches = snapshot.searches,
            inserts = snapshot.inserts,
            splits = snapshot.splits,
            root_splits = snapshot.root_splits,
            node_reads = snapshot.node_reads,
            node_writes = snapshot.node_writes,
            allocations = snapshot.allocations,
            "btree stats snapshot"
        );
    }
}
