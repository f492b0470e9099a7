use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the library's I/O edges.
///
/// The menu itself never returns these; they come from restore caches and
/// value conversion, and the menu logs them instead of failing.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("failed to read restore cache {path}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write restore cache {path}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("restore cache {path} is not valid JSON")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A menu value could not be converted to or from JSON.
    #[error("menu value conversion failed")]
    Value(#[from] serde_json::Error),
}
