// src/pattern/mod.rs
// =============================================================================
// Path filtering by include/exclude glob patterns.
//
// Submodules:
// - glob: pattern translation and the precompiled PathFilter
// =============================================================================

mod glob;

pub use glob::{matches, should_include, PathFilter};
