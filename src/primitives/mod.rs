//! Low-level primitives the index is built on.
//!
//! Includes byte utilities, positioned file I/O, and block-indexed paging.

/// Big-endian encoding helpers.
pub mod bytes;

/// I/O abstractions and utilities.
///
/// Positioned reads and writes against a real or in-memory file.
pub mod io;

/// Block-indexed storage and the header record.
pub mod pager;
