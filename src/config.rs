// src/config.rs
// =============================================================================
// Run configuration: patterns, token, output locations, fetch limits.
//
// Sources, lowest priority first:
// 1. built-in defaults
// 2. a TOML file: --config <file>, or repo-gather.toml in the working
//    directory when present
// 3. command-line flags / GITHUB_TOKEN
//
// The config is read once at start and never changes during a run.
//
// Example repo-gather.toml:
//
//   [github]
//   token = "ghp_..."
//   include_patterns = ["*.rs", "*.toml"]
//   exclude_patterns = [".git/", "target/"]
//   single_file_path = "output/all_contents.txt"
//   # GitHub Enterprise:
//   # api_base = "https://git.example.com/api/v3"
//   # web_host = "git.example.com"
//
//   [directory]
//   default_path = "/home/me/project"
//   output_dir = "output"
//
//   [fetch]
//   concurrency = 16
//   timeout_secs = 30
// =============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{GatherError, Result};
use crate::github::{DEFAULT_API_BASE, DEFAULT_WEB_HOST};
use crate::pattern::PathFilter;

/// File looked up in the working directory when --config is not given.
pub const DEFAULT_CONFIG_FILE: &str = "repo-gather.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubSettings,
    pub directory: DirectorySettings,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    /// Bearer token for the API; anonymous requests when absent
    pub token: Option<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Where `bundle` writes the single output file
    pub single_file_path: PathBuf,
    /// Where `save` mirrors repository files
    pub save_dir: PathBuf,
    /// Contents API root, e.g. `https://git.example.com/api/v3` for Enterprise
    pub api_base: String,
    /// Host repository URLs and file links are on
    pub web_host: String,
    /// Branch used in file links
    pub branch: String,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            token: None,
            include_patterns: [
                "*.rs", "*.java", "*.kt", "*.py", "*.ts", "*.js", "*.go", "*.md", "*.toml",
                "*.yml", "*.yaml", "*.xml", "*.txt",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_patterns: [".git/", "target/", "node_modules/", "build/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            single_file_path: PathBuf::from("output/all_contents.txt"),
            save_dir: PathBuf::from("output"),
            api_base: DEFAULT_API_BASE.to_string(),
            web_host: DEFAULT_WEB_HOST.to_string(),
            branch: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Directory used by `dir` when no path is given
    pub default_path: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            default_path: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Max in-flight list/fetch calls per run
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout_secs: 30,
        }
    }
}

/// Values given on the command line that replace config file values.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Config {
    /// Loads the config.
    ///
    /// An explicit file must exist and parse. A discovered file in
    /// `search_dir` that fails to parse is reported and ignored.
    pub fn load(explicit: Option<&Path>, search_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let discovered = search_dir.join(DEFAULT_CONFIG_FILE);
        if !discovered.is_file() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }

        match Self::from_file(&discovered) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Ignoring {}: {}", discovered.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GatherError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content, path)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| GatherError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(token) = overrides.token {
            self.github.token = Some(token);
        }
        if !overrides.include.is_empty() {
            self.github.include_patterns = overrides.include;
        }
        if !overrides.exclude.is_empty() {
            self.github.exclude_patterns = overrides.exclude;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs.max(1))
    }

    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.github.include_patterns, &self.github.exclude_patterns)
    }
}
