//! Worker lifecycle behind a send/receive/wait interface.
//!
//! Controllers only ever talk to a [`WorkerChannel`]. [`ProcessWorker`] backs
//! it with a child process whose stdin and stdout are the two halves of the
//! duplex channel; [`LocalWorker`] runs the same scanning loop in-process.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufReader, Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use crate::errors::{SearchError, SearchResult};
use crate::protocol::{path_from_bytes, Frame, FrameReader, FrameWriter};
use crate::search::Minion;

/// A duplex, framed conversation with exactly one worker
pub trait WorkerChannel: Send {
    /// Sends one frame to the worker
    fn send(&mut self, frame: &Frame) -> SearchResult<()>;

    /// Blocks until the worker's next frame arrives
    fn receive(&mut self) -> SearchResult<Frame>;

    /// Waits for the worker to finish after it has been told to stop
    fn wait(&mut self) -> SearchResult<()>;
}

/// How to launch a worker process
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub query: String,
    pub output_dir: PathBuf,
}

impl WorkerCommand {
    pub fn new(
        program: impl Into<PathBuf>,
        query: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            query: query.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Command-line arguments for worker `id`
    pub fn args(&self, id: usize) -> Vec<OsString> {
        vec![
            OsString::from("--output-dir"),
            self.output_dir.clone().into_os_string(),
            OsString::from("--"),
            OsString::from(id.to_string()),
            OsString::from(&self.query),
        ]
    }

    fn command(&self, id: usize) -> Command {
        let mut cmd = Command::new(&self.program);
        // Options first: everything after `--` is positional, so a query
        // such as `-v` is not parsed as a flag.
        cmd.args(self.args(id))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

/// A worker running as a child process
#[derive(Debug)]
pub struct ProcessWorker {
    id: usize,
    child: Child,
    writer: Option<FrameWriter<ChildStdin>>,
    reader: FrameReader<BufReader<ChildStdout>>,
    reaped: bool,
}

impl ProcessWorker {
    /// Launches worker `id` with its stdin and stdout piped back to us
    pub fn spawn(id: usize, command: &WorkerCommand) -> SearchResult<Self> {
        let mut child = command
            .command(id)
            .spawn()
            .map_err(|e| SearchError::worker_spawn(id, &command.program, e))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SearchError::worker_spawn(
                    id,
                    &command.program,
                    std::io::Error::other("worker stdio was not piped"),
                ));
            }
        };

        debug!("Spawned worker {} (pid {})", id, child.id());
        Ok(Self {
            id,
            child,
            writer: Some(FrameWriter::new(stdin)),
            reader: FrameReader::new(BufReader::new(stdout)),
            reaped: false,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl WorkerChannel for ProcessWorker {
    fn send(&mut self, frame: &Frame) -> SearchResult<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.send(frame),
            None => Err(SearchError::protocol(format!(
                "worker {} input already closed",
                self.id
            ))),
        }
    }

    fn receive(&mut self) -> SearchResult<Frame> {
        self.reader.read_frame()?.ok_or_else(|| {
            SearchError::protocol(format!("worker {} closed its output channel", self.id))
        })
    }

    fn wait(&mut self) -> SearchResult<()> {
        // Closing stdin lets a worker that missed the terminator see EOF.
        self.writer.take();
        let status = self.child.wait()?;
        self.reaped = true;
        if status.success() {
            debug!("Worker {} exited cleanly", self.id);
            Ok(())
        } else {
            Err(SearchError::WorkerExit {
                id: self.id,
                status,
            })
        }
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        if !self.reaped {
            warn!("Worker {} dropped before it was reaped, killing it", self.id);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// A worker that scans on the calling thread.
///
/// Answers are produced eagerly when a task is sent and buffered until the
/// controller receives them, so the conversation follows the same frames a
/// worker process would write.
#[derive(Debug)]
pub struct LocalWorker<D: Write + Send> {
    minion: Minion<D>,
    pending: VecDeque<Frame>,
    stopped: bool,
}

impl<D: Write + Send> LocalWorker<D> {
    pub fn new(minion: Minion<D>) -> Self {
        Self {
            minion,
            pending: VecDeque::new(),
            stopped: false,
        }
    }

    pub fn minion(&self) -> &Minion<D> {
        &self.minion
    }
}

impl LocalWorker<Vec<u8>> {
    /// A local worker whose diagnostics are kept in memory
    pub fn in_memory(id: usize, query: &str) -> SearchResult<Self> {
        Ok(Self::new(Minion::with_diagnostics(id, query, Vec::new())?))
    }
}

impl<D: Write + Send> WorkerChannel for LocalWorker<D> {
    fn send(&mut self, frame: &Frame) -> SearchResult<()> {
        if self.stopped {
            return Err(SearchError::protocol(format!(
                "worker {} input already closed",
                self.minion.id()
            )));
        }
        match frame {
            Frame::Data(payload) => {
                let mut out = FrameWriter::new(Vec::new());
                self.minion.handle_task(&path_from_bytes(payload), &mut out)?;

                let mut reader = FrameReader::new(Cursor::new(out.into_inner()));
                while let Some(frame) = reader.read_frame()? {
                    self.pending.push_back(frame);
                }
            }
            Frame::End => self.stopped = true,
        }
        Ok(())
    }

    fn receive(&mut self) -> SearchResult<Frame> {
        self.pending.pop_front().ok_or_else(|| {
            SearchError::protocol(format!(
                "worker {} has nothing to send",
                self.minion.id()
            ))
        })
    }

    fn wait(&mut self) -> SearchResult<()> {
        if self.stopped {
            Ok(())
        } else {
            Err(SearchError::protocol(format!(
                "worker {} was never told to stop",
                self.minion.id()
            )))
        }
    }
}

/// Path of the worker executable installed next to the running binary
pub fn sibling_worker_program(name: &str) -> SearchResult<PathBuf> {
    let exe = std::env::current_exe()?;
    let file_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    Ok(exe
        .parent()
        .map(|dir| dir.join(&file_name))
        .unwrap_or_else(|| Path::new(&file_name).to_path_buf()))
}
