// src/lib.rs
// =============================================================================
// repo-gather: gather the files of a GitHub repository or a local directory
// into one text bundle.
//
// Layout:
// - pattern:   include/exclude glob matching
// - source:    the ContentSource trait and Entry type
// - github:    ContentSource over the GitHub contents API
// - directory: ContentSource over the local filesystem
// - tree:      the recursive, concurrent traversal and its sinks
// - output:    writing the final bundle
// - config, cli, error: the ambient plumbing
// =============================================================================

pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod github;
pub mod output;
pub mod pattern;
pub mod source;
pub mod tree;
