// src/directory/mod.rs
// =============================================================================
// This module reads a local directory as a content source, so the same
// traversal and filtering used for GitHub repositories works on disk too.
// =============================================================================

mod local;

pub use local::LocalSource;
