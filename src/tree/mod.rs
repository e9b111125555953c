// src/tree/mod.rs
// =============================================================================
// This module walks a whole directory tree and gathers matching files.
//
// Submodules:
// - walk: the recursive, concurrent traversal
// - sink: what happens to each matched file (link record, bare record, disk)
// - accumulator: the concurrency-safe record collection the sinks append to
// =============================================================================

mod accumulator;
mod sink;
mod walk;

pub use accumulator::{Accumulator, FileRecord};
pub use sink::{Accepted, BufferSink, DiskSink, LinkSink, Sink};
pub use walk::{gather, Summary, Traversal};
