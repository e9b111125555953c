// src/error.rs
// =============================================================================
// Error types shared by the library modules.
//
// The traversal distinguishes failures by how far they reach:
// - InvalidInput: rejected before any traversal starts
// - Listing: kills one subtree (or the whole run when it hits the root)
// - Output: the aggregated result could not be persisted, always fatal
//
// A failed single-file fetch is NOT an error here: fetchers return None for
// it and the traversal logs and moves on.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by everything below `main.rs`.
pub type Result<T> = std::result::Result<T, GatherError>;

#[derive(Debug, Error)]
pub enum GatherError {
    /// Bad user input: unknown source type, non-directory path, non-GitHub URL
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A directory listing could not be obtained
    #[error("failed to list {location}: {reason}")]
    Listing { location: String, reason: String },

    /// Writing output to disk failed
    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP client setup or a request whose failure must be surfaced
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file could not be read or parsed
    #[error("invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

impl GatherError {
    pub fn listing(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Listing {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}
