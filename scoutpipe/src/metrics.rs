use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by the searcher and every controller
#[derive(Debug, Clone)]
pub struct RunMetrics {
    files_enqueued: Arc<AtomicU64>,
    tasks_dispatched: Arc<AtomicU64>,
    results_logged: Arc<AtomicU64>,
    skipped_tasks: Arc<AtomicU64>,
    skipped_entries: Arc<AtomicU64>,
}

impl RunMetrics {
    /// Creates a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            files_enqueued: Arc::new(AtomicU64::new(0)),
            tasks_dispatched: Arc::new(AtomicU64::new(0)),
            results_logged: Arc::new(AtomicU64::new(0)),
            skipped_tasks: Arc::new(AtomicU64::new(0)),
            skipped_entries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a file path put into the buffer
    pub fn record_enqueued(&self) {
        self.files_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task sent to a worker
    pub fn record_dispatched(&self) {
        self.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a match message appended to the log
    pub fn record_logged(&self) {
        self.results_logged.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a task discarded by a controller whose worker failed
    pub fn record_skipped_task(&self) {
        self.skipped_tasks.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a directory entry the searcher could not read
    pub fn record_skipped_entry(&self) {
        self.skipped_entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the current counter values
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            files_enqueued: self.files_enqueued.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            results_logged: self.results_logged.load(Ordering::Relaxed),
            skipped_tasks: self.skipped_tasks.load(Ordering::Relaxed),
            skipped_entries: self.skipped_entries.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counter values
    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Run stats:\n\
             Files enqueued: {}\n\
             Tasks dispatched: {}\n\
             Results logged: {}\n\
             Skipped tasks/entries: {}/{}",
            stats.files_enqueued,
            stats.tasks_dispatched,
            stats.results_logged,
            stats.skipped_tasks,
            stats.skipped_entries
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RunMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files_enqueued: u64,
    pub tasks_dispatched: u64,
    pub results_logged: u64,
    pub skipped_tasks: u64,
    pub skipped_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters() {
        let metrics = RunMetrics::new();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_dispatched();
        metrics.record_logged();
        metrics.record_skipped_entry();

        let stats = metrics.snapshot();
        assert_eq!(stats.files_enqueued, 2);
        assert_eq!(stats.tasks_dispatched, 1);
        assert_eq!(stats.results_logged, 1);
        assert_eq!(stats.skipped_tasks, 0);
        assert_eq!(stats.skipped_entries, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RunMetrics::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_logged();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().results_logged, 400);
    }
}
