// src/tree/sink.rs
// =============================================================================
// What happens to a matched file once its content has been fetched.
//
// The traversal is the same for every output mode; only the Sink changes:
// - LinkSink: record labelled with an HTML link to the file on GitHub
// - BufferSink: record labelled with the bare path (single-file bundles)
// - DiskSink: content written to <output_dir>/<path>
//
// accept() says whether the file was stored or deliberately refused.
// Returning an error from it is fatal for the whole run.
// =============================================================================

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use super::accumulator::{Accumulator, FileRecord};
use crate::error::{GatherError, Result};
use crate::source::Entry;

/// What a sink did with one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    Stored,
    /// Not an error: the file was skipped on purpose (e.g. an unsafe path)
    Refused,
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Takes the content of one matched file.
    async fn accept(&self, entry: &Entry, content: String) -> Result<Accepted>;
}

/// Collects records whose label is a link to the file's web view.
#[derive(Debug)]
pub struct LinkSink {
    html_base: String,
    branch: String,
    records: Accumulator,
}

impl LinkSink {
    pub fn new(html_base: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            html_base: html_base.into().trim_end_matches('/').to_string(),
            branch: branch.into(),
            records: Accumulator::new(),
        }
    }

    fn label(&self, path: &str) -> String {
        format!(
            "<a href=\"{}/blob/{}/{}\">{}</a>",
            self.html_base, self.branch, path, path
        )
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_records()
    }
}

#[async_trait]
impl Sink for LinkSink {
    async fn accept(&self, entry: &Entry, content: String) -> Result<Accepted> {
        let label = self.label(&entry.path);
        self.records.push(FileRecord::new(label, content)).await;
        Ok(Accepted::Stored)
    }
}

/// Collects records labelled with the bare path.
#[derive(Debug, Default)]
pub struct BufferSink {
    records: Accumulator,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_records()
    }
}

#[async_trait]
impl Sink for BufferSink {
    async fn accept(&self, entry: &Entry, content: String) -> Result<Accepted> {
        self.records
            .push(FileRecord::new(entry.path.clone(), content))
            .await;
        Ok(Accepted::Stored)
    }
}

/// Mirrors matched files into a directory on disk.
#[derive(Debug)]
pub struct DiskSink {
    output_dir: PathBuf,
    written: AtomicUsize,
}

impl DiskSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            written: AtomicUsize::new(0),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Sink for DiskSink {
    async fn accept(&self, entry: &Entry, content: String) -> Result<Accepted> {
        let Some(relative) = safe_relative_path(&entry.path) else {
            warn!("Refusing to write outside the output directory: {}", entry.path);
            return Ok(Accepted::Refused);
        };
        let target = self.output_dir.join(relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GatherError::output(parent, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| GatherError::output(&target, e))?;

        self.written.fetch_add(1, Ordering::Relaxed);
        info!("Saved file: {}", target.display());
        Ok(Accepted::Stored)
    }
}

// Turns an entry path into a relative PathBuf, or None if it would escape
// the output directory.
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(&path.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}
