// src/tree/accumulator.rs
// =============================================================================
// The shared collection that fetched files are appended to during a run.
//
// Contract:
// - push() may be called from any number of concurrent traversal tasks
// - records are only ever appended, never removed or reordered
// - into_records() consumes the accumulator, so it can only be drained once
//   the traversal that borrowed it has returned
//
// Record order is completion order; nothing downstream depends on it.
// =============================================================================

use serde::Serialize;
use std::fmt;
use tokio::sync::Mutex;

/// One fetched file, ready to be written into the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// The file path, or an HTML anchor pointing at it
    pub label: String,
    pub body: String,
}

impl FileRecord {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {}\n{}\n", self.label, self.body)
    }
}

#[derive(Debug, Default)]
pub struct Accumulator {
    records: Mutex<Vec<FileRecord>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, record: FileRecord) {
        self.records.lock().await.push(record);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records.into_inner()
    }
}
