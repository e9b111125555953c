// src/github/repo.rs
// =============================================================================
// Turning a repository URL into the API and web URLs we need.
//
// Supported formats:
//   - https://github.com/owner/repo
//   - https://github.com/owner/repo.git
//   - https://github.com/owner/repo/   (trailing slash)
//   - http://, www. and bare github.com/ prefixes
//
// GitHub Enterprise hosts work the same way through parse_repo_url, with
// the configured web host in place of github.com.
// =============================================================================

use crate::error::{GatherError, Result};

/// Host used when none is configured.
pub const DEFAULT_WEB_HOST: &str = "github.com";

/// An `owner/repo` pair on a GitHub host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Web host the URL was parsed from, e.g. `github.com`
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Root of the contents API, e.g. `https://api.github.com/repos/o/r/contents`
    pub fn contents_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Contents API URL of a single file
    pub fn file_url(&self, api_base: &str, path: &str) -> String {
        format!(
            "{}/{}",
            self.contents_url(api_base),
            path.trim_start_matches('/')
        )
    }

    /// Web view of the repository, used for file links
    pub fn html_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.owner, self.repo)
    }
}

/// Parses a GitHub repository URL.
///
/// Example:
///   "https://github.com/rust-lang/rust" -> RepoRef { owner: "rust-lang", repo: "rust", .. }
pub fn parse_github_url(url: &str) -> Result<RepoRef> {
    parse_repo_url(url, DEFAULT_WEB_HOST)
}

/// Parses a repository URL on the given web host (github.com or an
/// Enterprise server such as `git.example.com`).
pub fn parse_repo_url(url: &str, host: &str) -> Result<RepoRef> {
    let host = host.trim().trim_end_matches('/');
    let trimmed = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    // Strip "<host>/" from the front; anything else is not a repository URL
    let Some(path) = trimmed
        .strip_prefix(host)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Err(GatherError::InvalidInput(format!(
            "Not a {} repository URL: {}",
            host, url
        )));
    };

    let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    if parts.len() < 2 {
        return Err(GatherError::InvalidInput(format!(
            "Invalid GitHub URL format: {}",
            url
        )));
    }

    let owner = parts[0];
    let repo = parts[1].trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return Err(GatherError::InvalidInput(format!(
            "Invalid GitHub URL format: {}",
            url
        )));
    }

    Ok(RepoRef {
        host: host.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url() {
        let repo = parse_github_url("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.repo, "rust");
    }

    #[test]
    fn test_parse_github_url_with_git() {
        let repo = parse_github_url("https://github.com/user/repo.git").unwrap();
        assert_eq!(repo.owner, "user");
        assert_eq!(repo.repo, "repo");
    }

    #[test]
    fn test_parse_github_url_variants() {
        for url in [
            "http://github.com/user/repo",
            "www.github.com/user/repo",
            "github.com/user/repo/",
            "https://github.com/user/repo/tree/main/src",
        ] {
            let repo = parse_github_url(url).unwrap();
            assert_eq!((repo.owner.as_str(), repo.repo.as_str()), ("user", "repo"), "{}", url);
        }
    }

    #[test]
    fn test_parse_invalid_url() {
        assert!(parse_github_url("https://gitlab.com/user/repo").is_err());
        assert!(parse_github_url("https://github.com/user").is_err());
        assert!(parse_github_url("https://github.com//repo").is_err());
    }

    #[test]
    fn test_api_and_html_urls() {
        let repo = parse_github_url("https://github.com/user/repo.git").unwrap();
        assert_eq!(
            repo.contents_url("https://api.github.com/"),
            "https://api.github.com/repos/user/repo/contents"
        );
        assert_eq!(
            repo.file_url("https://api.github.com", "/src/App.java"),
            "https://api.github.com/repos/user/repo/contents/src/App.java"
        );
        assert_eq!(repo.html_url(), "https://github.com/user/repo");
    }

    #[test]
    fn test_enterprise_host() {
        let repo = parse_repo_url("https://git.example.com/team/service.git", "git.example.com")
            .unwrap();
        assert_eq!(repo.host, "git.example.com");
        assert_eq!((repo.owner.as_str(), repo.repo.as_str()), ("team", "service"));
        assert_eq!(repo.html_url(), "https://git.example.com/team/service");
        assert_eq!(
            repo.contents_url("https://git.example.com/api/v3"),
            "https://git.example.com/api/v3/repos/team/service/contents"
        );

        // github.com URLs are not accepted against another host, and vice versa
        assert!(parse_repo_url("https://github.com/team/service", "git.example.com").is_err());
        assert!(parse_github_url("https://git.example.com/team/service").is_err());
        // host must be followed by a path separator
        assert!(parse_repo_url("https://git.example.com.evil/team/service", "git.example.com").is_err());
    }
}
