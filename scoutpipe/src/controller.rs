use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, trace, warn};

use crate::buffer::BoundedBuffer;
use crate::channel::WorkerChannel;
use crate::errors::SearchResult;
use crate::log::SearchLog;
use crate::metrics::RunMetrics;
use crate::protocol::{path_to_bytes, Frame};
use crate::task::Task;

/// Where a controller is in its conversation with its worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    AwaitTask,
    Dispatching(PathBuf),
    AwaitResults,
    Done,
}

/// Per-controller totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub id: usize,
    pub tasks: u64,
    pub results: u64,
}

/// Drives one worker: pulls tasks from the buffer, forwards them, and copies
/// every result the worker sends back into the shared log.
pub struct Controller<'a, C: WorkerChannel, W: Write> {
    id: usize,
    buffer: &'a BoundedBuffer<Task>,
    log: &'a SearchLog<W>,
    channel: C,
    metrics: RunMetrics,
    stats: ControllerStats,
    sentinel_seen: bool,
}

impl<'a, C: WorkerChannel, W: Write> Controller<'a, C, W> {
    pub fn new(
        id: usize,
        buffer: &'a BoundedBuffer<Task>,
        log: &'a SearchLog<W>,
        channel: C,
        metrics: RunMetrics,
    ) -> Self {
        Self {
            id,
            buffer,
            log,
            channel,
            metrics,
            stats: ControllerStats {
                id,
                ..Default::default()
            },
            sentinel_seen: false,
        }
    }

    /// Runs until this controller's sentinel has been handled.
    ///
    /// If the worker channel fails, the remaining tasks are discarded until
    /// the sentinel arrives so the searcher and the other controllers can
    /// still finish; the channel error is then returned.
    pub fn run(mut self) -> SearchResult<ControllerStats> {
        match self.drive() {
            Ok(()) => {
                debug!(
                    "Controller {} done: {} tasks, {} results",
                    self.id, self.stats.tasks, self.stats.results
                );
                Ok(self.stats)
            }
            Err(e) => {
                error!("Controller {} lost its worker: {}", self.id, e);
                if !self.sentinel_seen {
                    self.drain();
                }
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> SearchResult<()> {
        let mut state = ControllerState::AwaitTask;
        loop {
            state = match state {
                ControllerState::AwaitTask => match self.buffer.get() {
                    Task::Sentinel => {
                        self.sentinel_seen = true;
                        self.channel.send(&Frame::End)?;
                        ControllerState::Done
                    }
                    Task::Path(path) => ControllerState::Dispatching(path),
                },
                ControllerState::Dispatching(path) => {
                    trace!("Controller {} dispatching {}", self.id, path.display());
                    self.channel.send(&Frame::Data(path_to_bytes(&path)))?;
                    self.stats.tasks += 1;
                    self.metrics.record_dispatched();
                    ControllerState::AwaitResults
                }
                ControllerState::AwaitResults => match self.channel.receive()? {
                    Frame::Data(message) => {
                        self.log.append(&message)?;
                        self.stats.results += 1;
                        self.metrics.record_logged();
                        ControllerState::AwaitResults
                    }
                    Frame::End => ControllerState::AwaitTask,
                },
                ControllerState::Done => {
                    self.channel.wait()?;
                    return Ok(());
                }
            };
        }
    }

    fn drain(&mut self) {
        loop {
            match self.buffer.get() {
                Task::Sentinel => break,
                Task::Path(path) => {
                    warn!(
                        "Controller {} skipping {} after worker failure",
                        self.id,
                        path.display()
                    );
                    self.metrics.record_skipped_task();
                }
            }
        }
        self.sentinel_seen = true;
    }
}
