// src/pattern/glob.rs
// =============================================================================
// Glob-style include/exclude matching for repository paths.
//
// Matching rules:
// - `\` is normalized to `/` in both the path and the pattern
// - `.` is a literal dot, `*` is any run of characters (it crosses `/`),
//   `?` is any single character, everything else is literal
// - A pattern matches if it is found ANYWHERE in the path, so `*.java`,
//   `.java` and `src/*.java` all match `src/main/App.java`
// - Excludes are checked first and always win
// - A path must match at least one include; an empty include list
//   therefore rejects everything
// =============================================================================

use regex::Regex;
use tracing::warn;

use crate::error::{GatherError, Result};

/// Checks a single path against a single pattern.
///
/// Compiles the pattern on every call; use `PathFilter` when the same
/// patterns are checked many times.
pub fn matches(path: &str, pattern: &str) -> bool {
    match compile(pattern) {
        Ok(re) => re.is_match(&normalize(path)),
        Err(e) => {
            warn!("Ignoring unusable pattern '{}': {}", pattern, e);
            false
        }
    }
}

/// Decides whether a path belongs in the output.
pub fn should_include<S: AsRef<str>>(path: &str, includes: &[S], excludes: &[S]) -> bool {
    if excludes.iter().any(|p| matches(path, p.as_ref())) {
        return false;
    }
    includes.iter().any(|p| matches(path, p.as_ref()))
}

/// A precompiled include/exclude set, built once per run and shared
/// read-only by every traversal task.
#[derive(Debug, Clone)]
pub struct PathFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self> {
        Ok(Self {
            includes: compile_all(includes)?,
            excludes: compile_all(excludes)?,
        })
    }

    pub fn should_include(&self, path: &str) -> bool {
        let path = normalize(path);
        if self.excludes.iter().any(|re| re.is_match(&path)) {
            return false;
        }
        self.includes.iter().any(|re| re.is_match(&path))
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            compile(p.as_ref()).map_err(|e| {
                GatherError::InvalidInput(format!("bad pattern '{}': {}", p.as_ref(), e))
            })
        })
        .collect()
}

// Translates a glob into an unanchored regex. `Regex::is_match` already
// searches for the pattern anywhere in the haystack.
fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut regex = String::with_capacity(pattern.len() * 2);
    for c in normalize(pattern).chars() {
        match c {
            '.' => regex.push_str(r"\."),
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    Regex::new(&regex)
}

fn normalize(s: &str) -> String {
    s.replace('\\', "/")
}
