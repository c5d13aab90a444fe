//! Tracing subscriber setup for the binary and tools.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{IndexError, Result};

/// Installs a stderr `fmt` subscriber filtered by `filter` (an `EnvFilter`
/// directive such as `warn` or `blockdex::btree=debug`).
pub fn init_logging(filter: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(filter).map_err(|_| IndexError::Invalid("invalid log filter"))?,
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| IndexError::Invalid("logging already initialized"))
}
