#![forbid(unsafe_code)]

//! Command-line support: bulk load, extraction, and the interactive shell.

/// Loading `key,value` files into an index and writing them back out.
pub mod load_extract;

/// Interactive command loop.
pub mod shell;

pub use load_extract::{CliError, LoadIssue, LoadIssueKind, LoadReport};
pub use shell::{Shell, ShellOptions};
