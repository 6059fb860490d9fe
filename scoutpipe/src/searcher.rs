use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::buffer::BoundedBuffer;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::RunMetrics;
use crate::task::Task;

/// Checks whether a file name ends with `suffix`.
///
/// The comparison is case-sensitive and the name must be longer than the
/// suffix itself, so a file called exactly `.txt` does not match `.txt`.
pub fn has_suffix(name: &OsStr, suffix: &str) -> bool {
    let name = name.as_encoded_bytes();
    let suffix = suffix.as_bytes();
    name.len() > suffix.len() && name.ends_with(suffix)
}

/// The single producer: walks the tree and feeds the buffer
#[derive(Debug, Clone)]
pub struct Searcher {
    root: PathBuf,
    suffix: String,
    consumers: usize,
    metrics: RunMetrics,
}

impl Searcher {
    pub fn new(
        root: impl Into<PathBuf>,
        suffix: impl Into<String>,
        consumers: usize,
        metrics: RunMetrics,
    ) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
            consumers,
            metrics,
        }
    }

    /// Fails if `root` cannot be listed
    pub fn check_root(root: &Path) -> SearchResult<()> {
        fs::read_dir(root)
            .map(|_| ())
            .map_err(|e| SearchError::traversal(root, e))
    }

    /// Enqueues every matching file, then one sentinel per consumer.
    ///
    /// The sentinels are enqueued even if the walk fails, so no consumer is
    /// left waiting on an empty buffer.
    pub fn run(&self, buffer: &BoundedBuffer<Task>) -> SearchResult<()> {
        let walked = self.walk(buffer);

        debug!("Searcher enqueueing {} sentinels", self.consumers);
        for _ in 0..self.consumers {
            buffer.put(Task::Sentinel);
        }
        walked
    }

    fn walk(&self, buffer: &BoundedBuffer<Task>) -> SearchResult<()> {
        Self::check_root(&self.root)?;
        info!(
            "Searching {} for files ending in {:?}",
            self.root.display(),
            self.suffix
        );

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    self.metrics.record_skipped_entry();
                    continue;
                }
            };

            let is_file = match entry.file_type() {
                Some(ft) => ft.is_file(),
                None => entry.metadata().map(|m| m.is_file()).unwrap_or(false),
            };
            if is_file && has_suffix(entry.file_name(), &self.suffix) {
                buffer.put(Task::Path(entry.into_path()));
                self.metrics.record_enqueued();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn drain(buffer: &BoundedBuffer<Task>) -> Vec<Task> {
        let mut tasks = Vec::new();
        while let Some(task) = buffer.try_get() {
            tasks.push(task);
        }
        tasks
    }

    #[test]
    fn test_has_suffix() {
        assert!(has_suffix(OsStr::new("notes.txt"), ".txt"));
        assert!(has_suffix(OsStr::new("a.txt"), ".txt"));
        assert!(!has_suffix(OsStr::new(".txt"), ".txt"));
        assert!(!has_suffix(OsStr::new("notes.TXT"), ".txt"));
        assert!(!has_suffix(OsStr::new("notes.txt.bak"), ".txt"));
        assert!(!has_suffix(OsStr::new("txt"), ".txt"));
    }

    #[test]
    fn test_enqueues_matching_files_once() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::create_dir_all(root.join("dir.txt")).unwrap();
        for name in [
            "top.txt",
            "skip.md",
            "nested/inner.txt",
            "nested/deeper/bottom.txt",
            "nested/deeper/.txt",
            "nested/UPPER.TXT",
        ] {
            fs::write(root.join(name), "content").unwrap();
        }

        let buffer = BoundedBuffer::new(NonZeroUsize::new(16).unwrap());
        let metrics = RunMetrics::new();
        Searcher::new(root, ".txt", 2, metrics.clone())
            .run(&buffer)
            .unwrap();

        let tasks = drain(&buffer);
        let (paths, sentinels): (Vec<_>, Vec<_>) = tasks.iter().partition(|t| !t.is_sentinel());
        assert_eq!(sentinels.len(), 2);
        assert!(tasks[tasks.len() - 2..].iter().all(Task::is_sentinel));

        let found: HashSet<PathBuf> = paths
            .iter()
            .filter_map(|t| t.path().map(Path::to_path_buf))
            .collect();
        let expected: HashSet<PathBuf> = [
            "top.txt",
            "nested/inner.txt",
            "nested/deeper/bottom.txt",
        ]
        .iter()
        .map(|name| root.join(name))
        .collect();
        assert_eq!(paths.len(), expected.len());
        assert_eq!(found, expected);
        assert_eq!(metrics.snapshot().files_enqueued, 3);
    }

    #[test]
    fn test_unreadable_root_still_releases_consumers() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(Searcher::check_root(&missing).is_err());

        let buffer = BoundedBuffer::new(NonZeroUsize::new(4).unwrap());
        let err = Searcher::new(&missing, ".txt", 3, RunMetrics::new())
            .run(&buffer)
            .unwrap_err();
        assert!(matches!(err, SearchError::Traversal { .. }));
        assert_eq!(drain(&buffer), vec![Task::Sentinel; 3]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        let locked = root.join("locked");
        fs::create_dir_all(root.join("open")).unwrap();
        fs::create_dir_all(&locked).unwrap();
        fs::write(root.join("top.txt"), "x").unwrap();
        fs::write(root.join("open/inner.txt"), "x").unwrap();
        fs::write(locked.join("hidden.txt"), "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permissions are not enforced for root
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let buffer = BoundedBuffer::new(NonZeroUsize::new(16).unwrap());
        let metrics = RunMetrics::new();
        let result = Searcher::new(root, ".txt", 3, metrics.clone()).run(&buffer);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        result.unwrap();

        let tasks = drain(&buffer);
        let found: HashSet<PathBuf> = tasks
            .iter()
            .filter_map(|t| t.path().map(Path::to_path_buf))
            .collect();
        let expected: HashSet<PathBuf> =
            [root.join("top.txt"), root.join("open/inner.txt")].into_iter().collect();
        assert_eq!(found, expected);
        assert_eq!(tasks.iter().filter(|t| t.is_sentinel()).count(), 3);

        let stats = metrics.snapshot();
        assert_eq!(stats.files_enqueued, 2);
        assert_eq!(stats.skipped_entries, 1);
    }

    #[test]
    fn test_small_buffer_blocks_producer_until_drained() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("file_{}.txt", i)), "x").unwrap();
        }

        let buffer = Arc::new(BoundedBuffer::new(NonZeroUsize::new(1).unwrap()));
        let producer = {
            let buffer = Arc::clone(&buffer);
            let root = dir.path().to_path_buf();
            thread::spawn(move || Searcher::new(root, ".txt", 1, RunMetrics::new()).run(&buffer))
        };

        let mut files = 0;
        loop {
            match buffer.get() {
                Task::Path(_) => files += 1,
                Task::Sentinel => break,
            }
            assert!(buffer.len() <= 1);
        }
        producer.join().unwrap().unwrap();
        assert_eq!(files, 20);
    }
}
