use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::buffer::BoundedBuffer;
use crate::channel::{ProcessWorker, WorkerChannel, WorkerCommand};
use crate::config::CoordinatorConfig;
use crate::controller::{Controller, ControllerStats};
use crate::errors::{SearchError, SearchResult};
use crate::log::SearchLog;
use crate::metrics::{RunMetrics, RunStats};
use crate::searcher::Searcher;
use crate::task::Task;

/// A controller that did not finish cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerFailure {
    pub id: usize,
    pub message: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub controllers: Vec<ControllerStats>,
    pub failures: Vec<ControllerFailure>,
    pub elapsed: Duration,
    pub log_path: PathBuf,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a search with one worker process per controller
pub fn run(config: &CoordinatorConfig) -> SearchResult<RunSummary> {
    config.validate()?;
    let command = WorkerCommand::new(
        config.worker_program_path()?,
        config.query.clone(),
        config.output_dir.clone(),
    );
    debug!("Worker program: {}", command.program.display());
    run_with(config, |id| ProcessWorker::spawn(id, &command))
}

/// Runs a search, obtaining each controller's worker from `connect`.
///
/// `connect` is called with worker ids `1..=worker_count` before any thread
/// starts; the first error aborts the run and drops every worker connected so
/// far.
pub fn run_with<C, F>(config: &CoordinatorConfig, connect: F) -> SearchResult<RunSummary>
where
    C: WorkerChannel,
    F: FnMut(usize) -> SearchResult<C>,
{
    config.validate()?;
    Searcher::check_root(&config.search_path)?;

    let log = SearchLog::create(&config.log_path, &config.query)?;
    let summary = coordinate(config, &log, connect)?;
    log.finish()?;
    Ok(summary)
}

/// Runs the searcher and controllers against an already opened log
pub fn coordinate<C, F, W>(
    config: &CoordinatorConfig,
    log: &SearchLog<W>,
    mut connect: F,
) -> SearchResult<RunSummary>
where
    C: WorkerChannel,
    F: FnMut(usize) -> SearchResult<C>,
    W: Write + Send,
{
    let started = Instant::now();
    let worker_count = config.worker_count.get();

    let channels = (1..=worker_count)
        .map(&mut connect)
        .collect::<SearchResult<Vec<C>>>()?;
    info!(
        "Started {} workers, buffer capacity {}",
        worker_count, config.buffer_capacity
    );

    let buffer = BoundedBuffer::new(config.buffer_capacity);
    let metrics = RunMetrics::new();
    let searcher = Searcher::new(
        &config.search_path,
        &config.file_suffix,
        worker_count,
        metrics.clone(),
    );

    let (controller_results, searched) = thread::scope(|s| {
        let mut handles = Vec::with_capacity(worker_count);
        for (index, channel) in channels.into_iter().enumerate() {
            let id = index + 1;
            let name = format!("controller-{}", id);
            let controller = Controller::new(id, &buffer, log, channel, metrics.clone());
            match thread::Builder::new()
                .name(name.clone())
                .spawn_scoped(s, move || controller.run())
            {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    // Release the controllers already running before bailing out
                    for _ in 0..handles.len() {
                        buffer.put(Task::Sentinel);
                    }
                    return Err(SearchError::thread_spawn(name, e));
                }
            }
        }

        let searcher_handle = thread::Builder::new()
            .name("searcher".to_string())
            .spawn_scoped(s, || searcher.run(&buffer));
        let searched = match searcher_handle {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(SearchError::protocol("searcher thread panicked"))),
            Err(e) => {
                for _ in 0..handles.len() {
                    buffer.put(Task::Sentinel);
                }
                Err(SearchError::thread_spawn("searcher", e))
            }
        };

        let results: Vec<(usize, SearchResult<ControllerStats>)> = handles
            .into_iter()
            .map(|(id, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(SearchError::protocol(format!(
                        "controller {} panicked",
                        id
                    )))
                });
                (id, result)
            })
            .collect();

        Ok((results, searched))
    })?;

    searched?;

    let mut controllers = Vec::with_capacity(worker_count);
    let mut failures = Vec::new();
    for (id, result) in controller_results {
        match result {
            Ok(stats) => controllers.push(stats),
            Err(e) => {
                error!("Controller {} failed: {}", id, e);
                failures.push(ControllerFailure {
                    id,
                    message: e.to_string(),
                });
            }
        }
    }

    metrics.log_stats();
    let summary = RunSummary {
        stats: metrics.snapshot(),
        controllers,
        failures,
        elapsed: started.elapsed(),
        log_path: config.log_path.clone(),
    };
    info!(
        "Search complete. Logged {} results from {} files",
        summary.stats.results_logged, summary.stats.files_enqueued
    );
    Ok(summary)
}
