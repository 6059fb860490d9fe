/// Error types for the search coordinator.
///
/// Failures fall into a small taxonomy:
///
/// 1. **Startup failures** (`WorkerSpawn`, `ThreadSpawn`) abort the run before any
///    task is dispatched.
/// 2. **Traversal failures** (`Traversal`) mean the search root could not be read.
/// 3. **Channel failures** (`Protocol`, `WorkerExit`, `IoError`) end a single
///    controller's conversation with its worker.
/// 4. **Configuration failures** (`ConfigError`, `ConfigLoad`) are reported before
///    anything starts.
///
/// A file that a worker cannot open is not an error at this level: the worker
/// logs it and still terminates the task's result stream.
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type for coordinator operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while coordinating a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Cannot open search path {path}: {source}")]
    Traversal {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to start worker {id} ({program}): {source}")]
    WorkerSpawn {
        id: usize,
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to start thread {name}: {source}")]
    ThreadSpawn {
        name: String,
        source: std::io::Error,
    },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Worker {id} exited with {status}")]
    WorkerExit { id: usize, status: ExitStatus },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn traversal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Traversal {
            path: path.into(),
            source,
        }
    }

    pub fn worker_spawn(id: usize, program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WorkerSpawn {
            id,
            program: program.into(),
            source,
        }
    }

    pub fn thread_spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            source,
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error prevented the run from starting at all
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::WorkerSpawn { .. } | Self::ThreadSpawn { .. } | Self::Traversal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let err = SearchError::traversal("missing", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SearchError::Traversal { .. }));
        assert!(err.is_startup_failure());

        let err = SearchError::worker_spawn(
            2,
            "scoutpipe-minion",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, SearchError::WorkerSpawn { id: 2, .. }));
        assert!(err.is_startup_failure());

        let err = SearchError::protocol("truncated frame header");
        assert!(matches!(err, SearchError::Protocol(_)));
        assert!(!err.is_startup_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::protocol("frame of 70000 bytes exceeds limit");
        assert_eq!(
            err.to_string(),
            "Protocol error: frame of 70000 bytes exceeds limit"
        );

        let err = SearchError::config_error("query must not be empty");
        assert_eq!(err.to_string(), "Configuration error: query must not be empty");

        let err = SearchError::thread_spawn(
            "controller-1",
            io::Error::new(io::ErrorKind::Other, "out of threads"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to start thread controller-1: out of threads"
        );
    }
}
