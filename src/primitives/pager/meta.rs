use std::ops::Range;

use crate::primitives::bytes::{get_u64_be, put_u64_be};
use crate::primitives::io::FileIo;
use crate::types::{BlockId, IndexError, Result};

use super::{truncated_as_format, Block, BlockFile, BLOCK_SIZE};

/// Format tag stored in the first eight bytes of every index file.
pub const MAGIC: [u8; 8] = *b"4337PRJ3";

const HEADER_MAGIC: Range<usize> = 0..8;
const HEADER_ROOT: usize = 8;
const HEADER_NEXT_BLOCK: usize = 16;

/// Index metadata stored in block 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Block holding the root node, `BlockId(0)` when the tree is empty.
    pub root: BlockId,
    /// Smallest block id that has never been handed out.
    pub next_block: BlockId,
}

impl Header {
    /// Header of a freshly created, empty index.
    pub const fn empty() -> Self {
        Self {
            root: BlockId::NONE,
            next_block: BlockId(1),
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::empty()
    }
}

/// Serializes `header` into a zero-padded block.
pub fn encode_header(header: &Header) -> Block {
    let mut buf = [0u8; BLOCK_SIZE];
    buf[HEADER_MAGIC].copy_from_slice(&MAGIC);
    put_u64_be(&mut buf, HEADER_ROOT, header.root.0);
    put_u64_be(&mut buf, HEADER_NEXT_BLOCK, header.next_block.0);
    buf
}

/// Parses and validates a header block.
///
/// Fails with a format error if the buffer is shorter than a block, the tag
/// does not match, or the counters are inconsistent with each other.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < BLOCK_SIZE {
        return Err(IndexError::Format("header truncated"));
    }
    if buf[HEADER_MAGIC] != MAGIC {
        return Err(IndexError::Format("header magic mismatch"));
    }
    let root = BlockId(get_u64_be(buf, HEADER_ROOT));
    let next_block = BlockId(get_u64_be(buf, HEADER_NEXT_BLOCK));
    if next_block.is_none() {
        return Err(IndexError::Format("header next block id is zero"));
    }
    if !root.is_none() && root >= next_block {
        return Err(IndexError::Format("header root beyond allocated blocks"));
    }
    Ok(Header { root, next_block })
}

/// Reads and validates block 0.
pub fn load_header<F: FileIo>(store: &BlockFile<F>) -> Result<Header> {
    let block = store
        .read_block(BlockId(0))
        .map_err(|err| truncated_as_format(err, "header truncated"))?;
    decode_header(&block)
}

/// Rewrites block 0; returns once the write is flushed.
pub fn store_header<F: FileIo>(store: &BlockFile<F>, header: &Header) -> Result<()> {
    store.write_block(BlockId(0), &encode_header(header))?;
    tracing::trace!(
        target: "blockdex::pager",
        root = header.root.0,
        next_block = header.next_block.0,
        "stored header"
    );
    Ok(())
}
