// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 2 = error)
//
// Every handler follows the same shape: build a ContentSource, pick a Sink,
// run the tree traversal, then hand the results to the output writer.
// =============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_gather::cli::{Cli, Commands, SourceKind};
use repo_gather::config::{Config, Overrides};
use repo_gather::directory::LocalSource;
use repo_gather::error::GatherError;
use repo_gather::github::{parse_repo_url, GithubSource, RepoRef};
use repo_gather::output;
use repo_gather::tree::{self, BufferSink, DiskSink, FileRecord, LinkSink, Summary};

// #[tokio::main] builds the tokio runtime and runs our async main inside it
#[tokio::main]
async fn main() {
    // Run the application and turn the outcome into a process exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// The main application logic
// Returns:
//   Ok(0) = the command finished
//   Err   = invalid input, root listing failure or output failure (exit 2)
async fn run() -> Result<i32> {
    // Parse command-line arguments; clap handles --help and --version
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Config file first, then command-line flags on top of it
    let mut config = Config::load(cli.config.as_deref(), Path::new("."))
        .context("Failed to load configuration")?;
    config.apply(Overrides {
        token: cli.token,
        include: cli.include,
        exclude: cli.exclude,
    });

    // Dispatch to the handler for the chosen subcommand
    match cli.command {
        Commands::List { repo_url, json } => handle_list(&config, &repo_url, json).await,
        Commands::Save {
            repo_url,
            output_dir,
        } => handle_save(&config, &repo_url, output_dir).await,
        Commands::Bundle { repo_url, output } => handle_bundle(&config, &repo_url, output).await,
        Commands::File { repo_url, path } => handle_file(&config, &repo_url, &path).await,
        Commands::Dir { path, output } => handle_dir(&config, path, output).await,
        Commands::Collect { source, location } => handle_collect(&config, &source, location).await,
    }
}

// Sets up logging to stderr, leaving stdout for results.
// RUST_LOG always wins; otherwise WARN, or DEBUG with --verbose.
fn init_tracing(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(verbose, rust_log.as_deref()))
        .try_init();
}

// Builds the filter from the RUST_LOG value, if any.
// The --verbose default applies only when RUST_LOG is unset, empty or
// unparseable.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "warn" };

    rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

// Parses the repository URL and builds the HTTP-backed source for it
fn github_source(config: &Config, repo_url: &str) -> Result<(RepoRef, GithubSource)> {
    // Fails early on anything that is not a repository URL on the configured host
    let repo = parse_repo_url(repo_url, &config.github.web_host)?;

    // One client for the whole run, so connections are reused
    let source = GithubSource::new(config.github.token.clone(), config.timeout())
        .context("Failed to create HTTP client")?;
    Ok((repo, source))
}

// Handles the 'list' subcommand
// Parameters:
//   repo_url: repository URL (e.g., "https://github.com/user/repo")
//   json: print records and summary as JSON instead of text
async fn handle_list(config: &Config, repo_url: &str, json: bool) -> Result<i32> {
    let (repo, source) = github_source(config, repo_url)?;
    let filter = config.path_filter()?;

    // Each record gets a link to the file's page on the web
    let sink = LinkSink::new(repo.html_url(), config.github.branch.as_str());

    // Keep stdout pure JSON when --json is set
    if !json {
        println!("🔍 Reading repository: {}", repo_url);
    }

    // Walk the whole repository, starting at the contents API root
    let summary = tree::gather(
        &source,
        &repo.contents_url(&config.github.api_base),
        &filter,
        &sink,
        config.fetch.concurrency,
    )
    .await
    .context("Failed to fetch repository contents")?;

    // The traversal has returned, so the records can be taken out
    let records = sink.into_records();
    if json {
        print_json(&records, &summary)?;
    } else {
        for record in &records {
            println!("{}", record);
        }
        print_summary(&summary);
    }

    Ok(0)
}

// Handles the 'save' subcommand
// Mirrors every matched file to <output_dir>/<path>
async fn handle_save(config: &Config, repo_url: &str, output_dir: Option<PathBuf>) -> Result<i32> {
    let (repo, source) = github_source(config, repo_url)?;
    let filter = config.path_filter()?;

    // --output-dir wins over github.save_dir from the config
    let sink = DiskSink::new(output_dir.unwrap_or_else(|| config.github.save_dir.clone()));

    println!("🔍 Reading repository: {}", repo_url);

    // Files are written as they arrive; a failed write stops the run
    let summary = tree::gather(
        &source,
        &repo.contents_url(&config.github.api_base),
        &filter,
        &sink,
        config.fetch.concurrency,
    )
    .await
    .context("Failed to save repository contents")?;

    print_summary(&summary);
    println!(
        "✅ Saved {} file(s) to {}",
        sink.written(),
        sink.output_dir().display()
    );
    Ok(0)
}

// Handles the 'bundle' subcommand
// Writes every matched file into one text file
async fn handle_bundle(config: &Config, repo_url: &str, output: Option<PathBuf>) -> Result<i32> {
    let (repo, source) = github_source(config, repo_url)?;
    let filter = config.path_filter()?;

    // Records are labelled with the bare path
    let sink = BufferSink::new();

    println!("🔍 Reading repository: {}", repo_url);

    let summary = tree::gather(
        &source,
        &repo.contents_url(&config.github.api_base),
        &filter,
        &sink,
        config.fetch.concurrency,
    )
    .await
    .context("Failed to fetch repository contents for single file")?;

    // Only now, after the whole tree is done, is the bundle written
    let path = output.unwrap_or_else(|| config.github.single_file_path.clone());
    let records = sink.into_records();
    output::write_bundle(&path, &records)
        .await
        .context("Failed to save all contents to single file")?;

    print_summary(&summary);
    println!("✅ Saved {} file(s) to {}", records.len(), path.display());
    Ok(0)
}

// Handles the 'file' subcommand
// Prints one file from the repository; unlike a traversal, errors are fatal
async fn handle_file(config: &Config, repo_url: &str, path: &str) -> Result<i32> {
    let (repo, source) = github_source(config, repo_url)?;

    let content = source
        .file_content(&config.github.api_base, &repo, path)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", path, repo_url))?;

    // print! rather than println!: the file keeps its own trailing newline
    print!("{}", content);
    Ok(0)
}

// Handles the 'dir' subcommand
// Bundles a local directory into <output_dir>/all_contents_from_<name>.txt
async fn handle_dir(config: &Config, path: Option<String>, output: Option<PathBuf>) -> Result<i32> {
    // Fall back to directory.default_path when no path was given
    let Some(path) = path.or_else(|| config.directory.default_path.clone()) else {
        return Err(GatherError::InvalidInput(
            "Directory path is not provided and directory.default_path is not configured"
                .to_string(),
        )
        .into());
    };

    // Rejects paths that do not exist or are not directories
    let source = LocalSource::open(&path)?;
    let filter = config.path_filter()?;
    let sink = BufferSink::new();

    println!("🔍 Reading directory: {}", source.root().display());

    let summary = tree::gather(
        &source,
        &source.root_location(),
        &filter,
        &sink,
        config.fetch.concurrency,
    )
    .await
    .context("Failed to save directory contents to file")?;

    // Output file is named after the directory unless --output is given
    let target = output
        .unwrap_or_else(|| output::directory_bundle_path(&config.directory.output_dir, &path));
    let records = sink.into_records();
    output::write_bundle(&target, &records)
        .await
        .context("Failed to save directory contents to file")?;

    print_summary(&summary);
    println!("✅ Saved {} file(s) to {}", records.len(), target.display());
    Ok(0)
}

// Handles the 'collect' subcommand
// Picks the source by name ("github" or "directory"), then bundles it
async fn handle_collect(config: &Config, source: &str, location: Option<String>) -> Result<i32> {
    // Unknown source names are rejected here, before anything is read
    match source.parse::<SourceKind>()? {
        SourceKind::Github => {
            let Some(repo_url) = location else {
                return Err(GatherError::InvalidInput(
                    "A repository URL is required for the github source".to_string(),
                )
                .into());
            };
            handle_bundle(config, &repo_url, None).await
        }
        SourceKind::Directory => handle_dir(config, location, None).await,
    }
}

// Shape of the --json output
#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a Summary,
    records: &'a [FileRecord],
}

// Prints the records and the summary as one pretty-printed JSON object
fn print_json(records: &[FileRecord], summary: &Summary) -> Result<()> {
    let report = JsonReport { summary, records };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// Prints the run counters as a small table
// Failure lines only appear when something actually failed
fn print_summary(summary: &Summary) {
    println!();
    println!("📊 Summary:");
    println!("   📁 Directories: {}", summary.directories);
    println!("   ✅ Collected: {}", summary.files_collected);
    println!("   ⏭️  Excluded: {}", summary.files_skipped);
    if summary.files_refused > 0 {
        println!("   🚫 Refused by output: {}", summary.files_refused);
    }
    if summary.fetch_failures > 0 {
        println!("   ❌ Failed to fetch: {}", summary.fetch_failures);
    }
    if summary.directory_failures > 0 {
        println!("   ⚠️  Unreadable directories: {}", summary.directory_failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_wins_over_default_level() {
        let filter = log_filter(false, Some("info"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

        // --verbose does not override an explicit RUST_LOG either
        let filter = log_filter(true, Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_default_level_without_rust_log() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_blank_or_invalid_rust_log_falls_back() {
        assert_eq!(log_filter(false, Some("  ")).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(
            log_filter(true, Some("=[bogus")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
