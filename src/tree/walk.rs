// src/tree/walk.rs
// =============================================================================
// Recursive, concurrent traversal of a ContentSource.
//
// How it works:
// 1. List the current directory
// 2. For every entry, concurrently:
//    - file that passes the PathFilter -> fetch it, hand it to the Sink
//    - file that does not pass -> skip it
//    - directory -> go back to step 1 for that directory
// 3. A directory is done only when everything dispatched under it is done
//
// Failure isolation:
// - a failed listing below the root loses that subtree only
// - a failed file fetch loses that file only
// - a failed root listing or a Sink error fails the run
//
// Concurrency:
// - each directory level runs up to `concurrency` entries at once
//   (buffer_unordered)
// - a run-wide semaphore caps in-flight list/fetch calls across ALL levels,
//   so deep trees don't multiply the request rate against the API
// - everything lives inside the future returned by run(); nothing is
//   spawned, so dropping that future cancels the whole walk
// =============================================================================

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use super::sink::{Accepted, Sink};
use crate::error::{GatherError, Result};
use crate::pattern::PathFilter;
use crate::source::{ContentSource, Entry, EntryKind};

/// Counters reported once the traversal completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Directories successfully listed, root included
    pub directories: usize,
    /// Directories whose listing failed
    pub directory_failures: usize,
    /// Files that passed the pattern check
    pub files_matched: usize,
    /// Files fetched and stored by the sink
    pub files_collected: usize,
    /// Files fetched but refused by the sink
    pub files_refused: usize,
    /// Files rejected by the pattern check
    pub files_skipped: usize,
    /// Matched files whose content could not be fetched
    pub fetch_failures: usize,
}

#[derive(Default)]
struct Counters {
    directories: AtomicUsize,
    directory_failures: AtomicUsize,
    files_matched: AtomicUsize,
    files_collected: AtomicUsize,
    files_refused: AtomicUsize,
    files_skipped: AtomicUsize,
    fetch_failures: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Summary {
        Summary {
            directories: self.directories.load(Ordering::Relaxed),
            directory_failures: self.directory_failures.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            files_collected: self.files_collected.load(Ordering::Relaxed),
            files_refused: self.files_refused.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// One traversal of one tree. Create it, call `run` once.
pub struct Traversal<'a, S: ?Sized, K: ?Sized> {
    source: &'a S,
    sink: &'a K,
    filter: &'a PathFilter,
    concurrency: usize,
    io_permits: Semaphore,
    visited: Mutex<HashSet<String>>,
    cancelled: AtomicBool,
    failure: Mutex<Option<GatherError>>,
    counters: Counters,
}

impl<'a, S, K> Traversal<'a, S, K>
where
    S: ContentSource + ?Sized,
    K: Sink + ?Sized,
{
    pub fn new(source: &'a S, filter: &'a PathFilter, sink: &'a K, concurrency: usize) -> Self {
        // buffer_unordered(0) would never make progress
        let concurrency = concurrency.max(1);
        Self {
            source,
            sink,
            filter,
            concurrency,
            io_permits: Semaphore::new(concurrency),
            visited: Mutex::new(HashSet::new()),
            cancelled: AtomicBool::new(false),
            failure: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// Stops dispatching new work. Work already in flight still finishes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Walks the whole tree below `root`.
    ///
    /// Returns only after every reachable directory has been listed (or has
    /// failed) and every matched file has been fetched (or has failed).
    pub async fn run(&self, root: &str) -> Result<Summary> {
        info!("Starting traversal at {}", root);

        // Mark the root as visited so a listing that points back at it is ignored
        self.visited.lock().await.insert(root.to_string());

        // Unlike subdirectories, a failed root listing fails the whole run
        let entries = self.list(root).await?;

        // Returns only once every entry below the root is finished
        self.dispatch(entries).await;

        // A sink error stopped the walk early; report it instead of a summary
        if let Some(err) = self.failure.lock().await.take() {
            return Err(err);
        }

        let summary = self.counters.snapshot();
        info!(
            "Traversal finished: {} dirs, {} files collected, {} fetch failures, {} dir failures",
            summary.directories,
            summary.files_collected,
            summary.fetch_failures,
            summary.directory_failures
        );
        Ok(summary)
    }

    // Boxed because it is (indirectly) recursive.
    fn visit(&self, location: String) -> BoxFuture<'_, ()> {
        async move {
            if self.is_cancelled() {
                return;
            }

            // insert() returns false when another task already took this location
            if !self.visited.lock().await.insert(location.clone()) {
                debug!("Already visited {}", location);
                return;
            }

            match self.list(&location).await {
                // Recurse: the children of this directory go through dispatch too
                Ok(entries) => self.dispatch(entries).await,
                // Only this subtree is lost; siblings keep going
                Err(e) => {
                    Counters::bump(&self.counters.directory_failures);
                    warn!("Skipping directory: {}", e);
                }
            }
        }
        .boxed()
    }

    // Runs all entries of one directory, up to `concurrency` at a time,
    // and waits for every one of them
    async fn dispatch(&self, entries: Vec<Entry>) {
        // How the fan-out works:
        // 1. turn the entries into a stream
        // 2. map each one to a future
        // 3. poll up to N of them concurrently
        // 4. drain the stream so nothing is left unfinished
        stream::iter(entries)
            .map(|entry| self.process(entry))
            .buffer_unordered(self.concurrency)
            .for_each(|()| async {})
            .await;
    }

    // Routes one entry: directories recurse, files get fetched
    async fn process(&self, entry: Entry) {
        // Entries queued before a cancel are dropped here
        if self.is_cancelled() {
            return;
        }
        match entry.kind {
            EntryKind::Directory => self.visit(entry.location).await,
            EntryKind::File => self.process_file(entry).await,
        }
    }

    async fn process_file(&self, entry: Entry) {
        // Pattern check first, so excluded files cost no request
        if !self.filter.should_include(&entry.path) {
            Counters::bump(&self.counters.files_skipped);
            debug!("Excluded by pattern: {}", entry.path);
            return;
        }
        Counters::bump(&self.counters.files_matched);

        // Hold a permit only for the fetch itself; it is released at the end
        // of this block, before the sink runs
        let content = {
            let _permit = self.io_permits.acquire().await.ok();
            self.source.fetch(&entry.location).await
        };

        // The source already logged why; this file is simply left out
        let Some(content) = content else {
            Counters::bump(&self.counters.fetch_failures);
            warn!("Skipping file {}: content unavailable", entry.path);
            return;
        };

        // Hand the content to the output mode; an error here is fatal
        match self.sink.accept(&entry, content).await {
            Ok(Accepted::Stored) => {
                Counters::bump(&self.counters.files_collected);
                debug!("Collected file: {}", entry.path);
            }
            Ok(Accepted::Refused) => {
                Counters::bump(&self.counters.files_refused);
                debug!("Sink refused file: {}", entry.path);
            }
            Err(e) => self.fail(e).await,
        }
    }

    // Lists one directory under a permit. The permit is dropped on return,
    // before any child is dispatched, so recursion never waits on itself.
    async fn list(&self, location: &str) -> Result<Vec<Entry>> {
        let _permit = self.io_permits.acquire().await.ok();
        let entries = self.source.list(location).await?;
        Counters::bump(&self.counters.directories);
        Ok(entries)
    }

    // Keeps the first fatal error and stops the rest of the walk.
    async fn fail(&self, err: GatherError) {
        error!("Aborting traversal: {}", err);
        self.cancel();
        let mut slot = self.failure.lock().await;
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

/// Convenience wrapper: build a Traversal and run it once.
pub async fn gather<S, K>(
    source: &S,
    root: &str,
    filter: &PathFilter,
    sink: &K,
    concurrency: usize,
) -> Result<Summary>
where
    S: ContentSource + ?Sized,
    K: Sink + ?Sized,
{
    Traversal::new(source, filter, sink, concurrency).run(root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{BufferSink, DiskSink, FileRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    // In-memory tree: listings keyed by location, contents keyed by location.
    // A listing that is absent fails; a content that is None fails.
    #[derive(Default)]
    struct FakeSource {
        listings: HashMap<String, Vec<Entry>>,
        contents: HashMap<String, Option<String>>,
        list_calls: std::sync::Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeSource {
        fn dir(mut self, location: &str, entries: Vec<Entry>) -> Self {
            self.listings.insert(location.to_string(), entries);
            self
        }

        fn content(mut self, location: &str, body: Option<&str>) -> Self {
            self.contents
                .insert(location.to_string(), body.map(str::to_string));
            self
        }

        async fn io(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn list(&self, location: &str) -> Result<Vec<Entry>> {
            self.io().await;
            self.list_calls.lock().unwrap().push(location.to_string());
            self.listings
                .get(location)
                .cloned()
                .ok_or_else(|| GatherError::listing(location, "HTTP 404 Not Found"))
        }

        async fn fetch(&self, location: &str) -> Option<String> {
            self.io().await;
            self.contents.get(location).cloned().flatten()
        }
    }

    fn file(path: &str) -> Entry {
        let name = path.rsplit('/').next().unwrap_or(path);
        Entry::file(name, path, format!("raw/{}", path))
    }

    fn dir(path: &str) -> Entry {
        let name = path.rsplit('/').next().unwrap_or(path);
        Entry::directory(name, path, format!("api/{}", path))
    }

    fn filter(includes: &[&str], excludes: &[&str]) -> PathFilter {
        PathFilter::new(includes, excludes).unwrap()
    }

    fn sorted(records: Vec<FileRecord>) -> Vec<String> {
        let mut out: Vec<String> = records.into_iter().map(|r| r.to_string()).collect();
        out.sort();
        out
    }

    fn sample_repo() -> FakeSource {
        FakeSource::default()
            .dir("api/", vec![file("a.txt"), file("b.java"), dir(".git")])
            .dir("api/.git", vec![dir(".git/objects")])
            .dir("api/.git/objects", vec![file(".git/objects/x")])
            .content("raw/a.txt", Some("hello"))
            .content("raw/b.java", Some("class B{}"))
            .content("raw/.git/objects/x", Some("\u{1}\u{2}"))
    }

    #[tokio::test]
    async fn test_collects_matching_files_and_skips_git() {
        let source = sample_repo();
        let sink = BufferSink::new();
        let filter = filter(&["*.txt", "*.java"], &[".git/**"]);

        let summary = gather(&source, "api/", &filter, &sink, 8).await.unwrap();

        let records = sorted(sink.into_records());
        assert_eq!(
            records,
            vec!["File: a.txt\nhello\n".to_string(), "File: b.java\nclass B{}\n".to_string()]
        );
        assert!(records.iter().all(|r| !r.contains(".git")));
        assert_eq!(summary.files_collected, 2);
        assert_eq!(summary.files_skipped, 1);
        // directories are walked even when all their files are excluded
        assert_eq!(summary.directories, 3);
    }

    #[tokio::test]
    async fn test_empty_includes_collect_nothing() {
        let source = sample_repo();
        let sink = BufferSink::new();
        let filter = filter(&[], &[]);

        let summary = gather(&source, "api/", &filter, &sink, 8).await.unwrap();

        assert!(sink.into_records().is_empty());
        assert_eq!(summary.files_matched, 0);
        assert_eq!(summary.files_skipped, 3);
    }

    #[tokio::test]
    async fn test_failed_fetch_drops_only_that_file() {
        let source = FakeSource::default()
            .dir("api/", vec![file("a.txt"), file("broken.txt"), file("c.txt")])
            .content("raw/a.txt", Some("a"))
            .content("raw/broken.txt", None)
            .content("raw/c.txt", Some("c"));
        let sink = BufferSink::new();

        let summary = gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 8)
            .await
            .unwrap();

        assert_eq!(
            sorted(sink.into_records()),
            vec!["File: a.txt\na\n".to_string(), "File: c.txt\nc\n".to_string()]
        );
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.files_matched, 3);
    }

    #[tokio::test]
    async fn test_failed_subdirectory_does_not_affect_siblings() {
        let source = FakeSource::default()
            .dir("api/", vec![dir("good"), dir("bad"), file("root.txt")])
            .dir("api/good", vec![file("good/g.txt")])
            // no listing for api/bad
            .content("raw/good/g.txt", Some("g"))
            .content("raw/root.txt", Some("r"));
        let sink = BufferSink::new();

        let summary = gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 8)
            .await
            .unwrap();

        assert_eq!(
            sorted(sink.into_records()),
            vec!["File: good/g.txt\ng\n".to_string(), "File: root.txt\nr\n".to_string()]
        );
        assert_eq!(summary.directory_failures, 1);
    }

    #[tokio::test]
    async fn test_root_listing_failure_is_surfaced() {
        let source = FakeSource::default();
        let sink = BufferSink::new();

        let result = gather(&source, "api/missing", &filter(&["*"], &[]), &sink, 8).await;

        assert!(matches!(result, Err(GatherError::Listing { .. })));
    }

    #[tokio::test]
    async fn test_deep_tree_every_directory_listed_once() {
        let mut source = FakeSource::default();
        let mut expected = 0;
        // three levels, three subdirectories each, two files per directory
        let mut frontier = vec![String::new()];
        for _ in 0..3 {
            let mut next = Vec::new();
            for parent in frontier {
                let mut entries = Vec::new();
                for i in 0..3 {
                    let child = if parent.is_empty() {
                        format!("d{}", i)
                    } else {
                        format!("{}/d{}", parent, i)
                    };
                    entries.push(dir(&child));
                    next.push(child);
                }
                for name in ["keep.rs", "drop.bin"] {
                    let path = if parent.is_empty() {
                        name.to_string()
                    } else {
                        format!("{}/{}", parent, name)
                    };
                    source = source.content(&format!("raw/{}", path), Some("x"));
                    if name.ends_with(".rs") {
                        expected += 1;
                    }
                    entries.push(file(&path));
                }
                source = source.dir(&format!("api/{}", parent), entries);
            }
            frontier = next;
        }
        for leaf in frontier {
            source = source.dir(&format!("api/{}", leaf), vec![]);
        }

        let sink = BufferSink::new();
        let summary = gather(&source, "api/", &filter(&["*.rs"], &[]), &sink, 4)
            .await
            .unwrap();

        assert_eq!(sink.into_records().len(), expected);
        assert_eq!(summary.files_collected, expected);

        let calls = source.list_calls.lock().unwrap().clone();
        let unique: HashSet<_> = calls.iter().collect();
        assert_eq!(calls.len(), unique.len(), "a directory was listed twice");
        // 1 + 3 + 9 + 27
        assert_eq!(calls.len(), 40);
    }

    #[tokio::test]
    async fn test_repeated_location_is_visited_once() {
        let source = FakeSource::default()
            .dir(
                "api/",
                vec![
                    Entry::directory("a", "a", "api/shared"),
                    Entry::directory("b", "b", "api/shared"),
                ],
            )
            .dir("api/shared", vec![file("shared/s.txt")])
            .content("raw/shared/s.txt", Some("s"));
        let sink = BufferSink::new();

        gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 8)
            .await
            .unwrap();

        assert_eq!(sink.into_records().len(), 1);
    }

    #[tokio::test]
    async fn test_two_runs_yield_same_records() {
        let source = sample_repo();
        let filter = filter(&["*.txt", "*.java"], &[".git/**"]);

        let first = BufferSink::new();
        gather(&source, "api/", &filter, &first, 2).await.unwrap();
        let second = BufferSink::new();
        gather(&source, "api/", &filter, &second, 16).await.unwrap();

        assert_eq!(sorted(first.into_records()), sorted(second.into_records()));
    }

    #[tokio::test]
    async fn test_in_flight_io_is_bounded() {
        let mut entries = Vec::new();
        let mut source = FakeSource {
            delay: Some(Duration::from_millis(5)),
            ..FakeSource::default()
        };
        for i in 0..10 {
            let sub = format!("sub{}", i);
            entries.push(dir(&sub));
            let mut files = Vec::new();
            for j in 0..10 {
                let path = format!("{}/f{}.txt", sub, j);
                source = source.content(&format!("raw/{}", path), Some("x"));
                files.push(file(&path));
            }
            source = source.dir(&format!("api/{}", sub), files);
        }
        source = source.dir("api/", entries);

        let sink = BufferSink::new();
        let summary = gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 3)
            .await
            .unwrap();

        assert_eq!(summary.files_collected, 100);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        async fn accept(&self, entry: &Entry, _content: String) -> Result<Accepted> {
            Err(GatherError::output(
                entry.path.clone(),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ))
        }
    }

    #[tokio::test]
    async fn test_sink_failure_fails_the_run() {
        let source = sample_repo();
        let filter = filter(&["*.txt", "*.java"], &[]);
        let traversal = Traversal::new(&source, &filter, &FailingSink, 1);

        let result = traversal.run("api/").await;

        assert!(matches!(result, Err(GatherError::Output { .. })));
        assert!(traversal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_traversal_dispatches_nothing() {
        let source = sample_repo();
        let sink = BufferSink::new();
        let filter = filter(&["*"], &[]);
        let traversal = Traversal::new(&source, &filter, &sink, 4);
        traversal.cancel();

        let summary = traversal.run("api/").await.unwrap();
        drop(traversal);

        assert_eq!(summary.directories, 1);
        assert!(sink.into_records().is_empty());
    }

    // Stores every file except the ones whose path starts with "secret"
    struct PickySink {
        inner: BufferSink,
    }

    #[async_trait]
    impl Sink for PickySink {
        async fn accept(&self, entry: &Entry, content: String) -> Result<Accepted> {
            if entry.path.starts_with("secret") {
                return Ok(Accepted::Refused);
            }
            self.inner.accept(entry, content).await
        }
    }

    #[tokio::test]
    async fn test_refused_files_are_not_counted_as_collected() {
        let source = FakeSource::default()
            .dir("api/", vec![file("a.txt"), file("secret.txt")])
            .content("raw/a.txt", Some("a"))
            .content("raw/secret.txt", Some("s"));
        let sink = PickySink {
            inner: BufferSink::new(),
        };

        let summary = gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 4)
            .await
            .unwrap();

        assert_eq!(summary.files_matched, 2);
        assert_eq!(summary.files_collected, 1);
        assert_eq!(summary.files_refused, 1);
        assert_eq!(sink.inner.into_records().len(), 1);
    }

    #[tokio::test]
    async fn test_disk_sink_escaping_path_is_refused_not_collected() {
        let temp = tempfile::TempDir::new().expect("tmp");
        let source = FakeSource::default()
            .dir(
                "api/",
                vec![file("ok.txt"), Entry::file("evil.txt", "../evil.txt", "raw/evil")],
            )
            .content("raw/ok.txt", Some("ok"))
            .content("raw/evil", Some("x"));
        let sink = DiskSink::new(temp.path().join("out"));

        let summary = gather(&source, "api/", &filter(&["*.txt"], &[]), &sink, 4)
            .await
            .unwrap();

        assert_eq!(summary.files_collected, 1);
        assert_eq!(summary.files_refused, 1);
        assert_eq!(sink.written(), summary.files_collected);
        assert!(!temp.path().join("evil.txt").exists());
    }
}
