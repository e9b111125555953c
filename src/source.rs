// src/source.rs
// =============================================================================
// The boundary between the traversal and the place files come from.
//
// A ContentSource knows how to do two things:
// - list one directory level (returns Entries)
// - fetch the text of one file (returns None on any failure)
//
// Two implementations exist: github::GithubSource (contents API over HTTP)
// and directory::LocalSource (the local filesystem). The traversal in
// tree/ only ever talks to this trait.
// =============================================================================

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Last path component
    pub name: String,
    pub kind: EntryKind,
    /// Path relative to the traversal root, always `/`-separated
    pub path: String,
    /// Download URL / sub-listing URL (remote) or filesystem path (local)
    pub location: String,
}

impl Entry {
    pub fn file(name: impl Into<String>, path: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            path: path.into(),
            location: location.into(),
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            path: path.into(),
            location: location.into(),
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Lists the immediate children of the directory at `location`.
    ///
    /// Fails when the location is unreachable, malformed or not a directory.
    async fn list(&self, location: &str) -> Result<Vec<Entry>>;

    /// Fetches the text of one file. Failures are logged by the
    /// implementation and reported as `None`.
    async fn fetch(&self, location: &str) -> Option<String>;
}
