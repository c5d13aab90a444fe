#![forbid(unsafe_code)]
//! Fixed-size block access over a positioned file.
//!
//! The pager knows nothing about B-trees: it maps a [`BlockId`] to the
//! 512-byte window at `id * BLOCK_SIZE` and makes every write durable before
//! returning.

use std::io::ErrorKind;
use std::path::Path;

use crate::primitives::io::{FileIo, StdFileIo};
use crate::types::{BlockId, IndexError, Result};

/// Header record stored in block 0.
pub mod meta;

pub use meta::{decode_header, encode_header, Header, MAGIC};

/// Size in bytes of every block in the file.
pub const BLOCK_SIZE: usize = 512;

/// One block worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

/// Block-indexed view of a file.
pub struct BlockFile<F: FileIo = StdFileIo> {
    io: F,
}

impl BlockFile<StdFileIo> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(StdFileIo::create(path)?))
    }

    /// Opens an existing file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(StdFileIo::open(path)?))
    }
}

impl<F: FileIo> BlockFile<F> {
    /// Wraps an already opened file.
    pub fn new(io: F) -> Self {
        Self { io }
    }

    /// Reads block `id`. A block that lies past the end of the file is an
    /// `UnexpectedEof` I/O error.
    pub fn read_block(&self, id: BlockId) -> Result<Block> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.io.read_at(id.offset(BLOCK_SIZE), &mut buf)?;
        tracing::trace!(target: "blockdex::pager", block = id.0, "read block");
        Ok(buf)
    }

    /// Writes block `id` and flushes it to stable storage.
    pub fn write_block(&self, id: BlockId, block: &Block) -> Result<()> {
        self.io.write_at(id.offset(BLOCK_SIZE), block)?;
        self.io.sync_all()?;
        tracing::trace!(target: "blockdex::pager", block = id.0, "wrote block");
        Ok(())
    }

    /// Number of whole blocks currently in the file.
    pub fn block_count(&self) -> Result<u64> {
        Ok(self.io.len()? / BLOCK_SIZE as u64)
    }

    /// Borrows the underlying file.
    pub fn io(&self) -> &F {
        &self.io
    }
}

/// Maps a short read to a format error; other failures pass through.
pub(crate) fn truncated_as_format(err: IndexError, what: &'static str) -> IndexError {
    match err {
        IndexError::Io(inner) if inner.kind() == ErrorKind::UnexpectedEof => {
            IndexError::Format(what)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::io::MemFileIo;
    use tempfile::tempdir;

    #[test]
    fn blocks_land_at_their_offsets() {
        let store = BlockFile::new(MemFileIo::new());
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;
        store.write_block(BlockId(2), &block).unwrap();

        assert_eq!(store.block_count().unwrap(), 3);
        let bytes = store.io().to_bytes();
        assert_eq!(bytes[2 * BLOCK_SIZE], 0xAB);
        assert_eq!(bytes[3 * BLOCK_SIZE - 1], 0xCD);
        assert_eq!(store.read_block(BlockId(2)).unwrap(), block);
        assert_eq!(store.read_block(BlockId(1)).unwrap(), [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn reading_past_the_end_is_an_eof_error() {
        let store = BlockFile::new(MemFileIo::new());
        let err = store.read_block(BlockId(0)).unwrap_err();
        let mapped = truncated_as_format(err, "header truncated");
        assert!(matches!(mapped, IndexError::Format("header truncated")));
    }

    #[test]
    fn std_file_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.idx");
        let mut block = [0u8; BLOCK_SIZE];
        block[..4].copy_from_slice(b"abcd");
        {
            let store = BlockFile::create(&path).unwrap();
            store.write_block(BlockId(1), &block).unwrap();
        }
        let store = BlockFile::open(&path).unwrap();
        assert_eq!(store.block_count().unwrap(), 2);
        assert_eq!(&store.read_block(BlockId(1)).unwrap()[..4], b"abcd");
    }
}
