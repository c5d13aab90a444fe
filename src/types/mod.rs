#![forbid(unsafe_code)]
//! Identifiers and the error taxonomy shared by every layer of the index.

use std::fmt;

/// Index of a 512-byte block inside the backing file.
///
/// Block 0 holds the header; `BlockId(0)` in a child or parent slot means
/// "no block".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BlockId(pub u64);

impl BlockId {
    /// The null block reference.
    pub const NONE: BlockId = BlockId(0);

    /// Returns true when this id does not reference a node.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Byte offset of the block in the backing file.
    pub const fn offset(self, block_size: usize) -> u64 {
        self.0 * block_size as u64
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        BlockId(value)
    }
}

impl From<BlockId> for u64 {
    fn from(value: BlockId) -> Self {
        value.0
    }
}

/// Errors produced by the block store, the codecs, and the B-tree engine.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Underlying read, write, or flush failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// A header or node block does not have the expected layout.
    #[error("format: {0}")]
    Format(&'static str),
    /// A structural invariant does not hold on disk.
    #[error("corruption: {0}")]
    Corrupt(String),
    /// Insert of a key that is already present.
    #[error("key {0} already exists")]
    DuplicateKey(u64),
    /// Caller supplied an argument the engine cannot honour.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

impl IndexError {
    /// Returns true for the errors that leave the tree untouched and let a
    /// batch continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IndexError::DuplicateKey(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
