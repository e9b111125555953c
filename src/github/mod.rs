// src/github/mod.rs
// =============================================================================
// This module reads repositories through the GitHub contents API.
//
// Submodules:
// - repo: parsing repository URLs into owner/repo and API/web URLs
// - fetch: the HTTP-backed ContentSource
// =============================================================================

mod fetch;
mod repo;

pub use fetch::{parse_listing, GithubSource, DEFAULT_API_BASE};
pub use repo::{parse_github_url, parse_repo_url, RepoRef, DEFAULT_WEB_HOST};
