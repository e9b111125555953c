// src/directory/local.rs
// =============================================================================
// ContentSource backed by the local filesystem.
//
// - a location is simply a filesystem path
// - list() returns the immediate children of one directory; the traversal
//   does the recursion, exactly like it does for GitHub
// - entry paths are relative to the root and always use `/`
// - symlinks to files are read as files, symlinks to directories are
//   skipped (no cycles)
// - fetch() reads UTF-8 text; binary or unreadable files yield None
// =============================================================================

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{GatherError, Result};
use crate::source::{ContentSource, Entry};

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Opens a directory as a content source.
    ///
    /// Rejects paths that do not exist or are not directories before any
    /// traversal starts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(GatherError::InvalidInput(format!(
                "Provided path is not a directory: {}",
                path.display()
            )));
        }
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location string to start the traversal from.
    pub fn root_location(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }

    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    async fn list(&self, location: &str) -> Result<Vec<Entry>> {
        let mut dir = tokio::fs::read_dir(location)
            .await
            .map_err(|e| GatherError::listing(location, e))?;

        let mut entries = Vec::new();
        while let Some(child) = dir
            .next_entry()
            .await
            .map_err(|e| GatherError::listing(location, e))?
        {
            let path = child.path();
            let name = child.file_name().to_string_lossy().into_owned();
            let file_type = match child.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let relative = self.relative(&path);
            let location = path.to_string_lossy().into_owned();

            if file_type.is_dir() {
                entries.push(Entry::directory(name, relative, location));
            } else if file_type.is_file() {
                entries.push(Entry::file(name, relative, location));
            } else if file_type.is_symlink() {
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => {
                        entries.push(Entry::file(name, relative, location));
                    }
                    _ => debug!("Not following symlink {}", path.display()),
                }
            }
        }

        Ok(entries)
    }

    async fn fetch(&self, location: &str) -> Option<String> {
        let bytes = match tokio::fs::read(location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read file {}: {}", location, e);
                return None;
            }
        };

        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                warn!("Skipping non-UTF-8 file {}", location);
                None
            }
        }
    }
}
