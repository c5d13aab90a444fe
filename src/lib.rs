//! Persistent u64 → u64 index stored as a B-tree in a file of 512-byte
//! blocks.
//!
//! ```no_run
//! use blockdex::storage::btree::BTree;
//!
//! # fn main() -> blockdex::types::Result<()> {
//! let mut tree = BTree::create("numbers.idx")?;
//! tree.insert(10, 100)?;
//! assert_eq!(tree.search(10)?, Some(100));
//! for entry in tree.iter() {
//!     let (key, value) = entry?;
//!     println!("{key} {value}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod logging;
pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::btree::BTree;
pub use types::{BlockId, IndexError, Result};
