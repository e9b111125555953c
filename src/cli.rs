// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands map one-to-one to the output modes:
// - list:    every matching file, labelled with a link to GitHub
// - save:    mirror matching files into a local directory
// - bundle:  all matching files of a repository in one text file
// - file:    print a single file from a repository
// - dir:     all matching files of a local directory in one text file
// - collect: pick github/directory by name (what the old web form did)
//
// Global flags override the config file for this run only.
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::GatherError;

#[derive(Parser, Debug)]
#[command(
    name = "repo-gather",
    version,
    about = "Gather the files of a GitHub repository or local directory into one text bundle",
    long_about = "repo-gather walks a GitHub repository (through the contents API) or a local \
                  directory, keeps the files matching the include/exclude patterns and writes \
                  them out as a single text file, a list of linked records, or a mirrored tree."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./repo-gather.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub token, overrides the config file
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Include pattern (repeatable), replaces the configured list
    #[arg(long = "include", global = true)]
    pub include: Vec<String>,

    /// Exclude pattern (repeatable), replaces the configured list
    #[arg(long = "exclude", global = true)]
    pub exclude: Vec<String>,

    /// Enable verbose logging (DEBUG level)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every matching file of a repository with a link to it
    ///
    /// Example: repo-gather list https://github.com/user/repo
    List {
        /// GitHub repository URL (e.g., https://github.com/user/repo)
        repo_url: String,

        /// Output records and summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save every matching file of a repository into a directory
    Save {
        repo_url: String,

        /// Target directory (default: github.save_dir from config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Write every matching file of a repository into one text file
    Bundle {
        repo_url: String,

        /// Output file (default: github.single_file_path from config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the raw content of one file in a repository
    ///
    /// Example: repo-gather file https://github.com/user/repo src/main.rs
    File {
        repo_url: String,

        /// Path of the file inside the repository
        path: String,
    },

    /// Write every matching file of a local directory into one text file
    Dir {
        /// Directory to read (default: directory.default_path from config)
        path: Option<String>,

        /// Output file (default: <output_dir>/all_contents_from_<dir>.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Bundle a source chosen by type: "github" or "directory"
    ///
    /// Example: repo-gather collect github https://github.com/user/repo
    Collect {
        /// Source type: github or directory (case-insensitive)
        source: String,

        /// Repository URL or directory path
        location: Option<String>,
    },
}

/// The kinds of source `collect` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Github,
    Directory,
}

impl FromStr for SourceKind {
    type Err = GatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "directory" => Ok(Self::Directory),
            _ => Err(GatherError::InvalidInput(format!("Invalid source type: {}", s))),
        }
    }
}
