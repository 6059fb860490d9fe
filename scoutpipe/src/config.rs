use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::channel::sibling_worker_program;
use crate::errors::{SearchError, SearchResult};

/// Name of the worker binary looked up next to the coordinator
pub const WORKER_BINARY: &str = "scoutpipe-minion";

/// Configuration for one coordinated search run.
///
/// # Configuration Locations
///
/// Values are layered from, in increasing order of precedence:
/// 1. Global `$HOME/.config/scoutpipe/config.yaml`
/// 2. Local `.scoutpipe.yaml` in the current directory
/// 3. A file given with `--config`
///
/// Command-line arguments override all of them (see [`merge_with_cli`]).
///
/// # Configuration Format
///
/// ```yaml
/// # Number of worker processes (default: CPU cores)
/// worker_count: 4
///
/// # Slots in the task buffer
/// buffer_capacity: 16
///
/// # Only files whose names end with this are searched
/// file_suffix: ".txt"
///
/// # Where match results are collected
/// log_path: "searchlog.txt"
///
/// # Where each worker writes worker<id>.out
/// output_dir: "."
///
/// # Worker executable (default: scoutpipe-minion next to the coordinator)
/// worker_program: "/usr/local/bin/scoutpipe-minion"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// [`merge_with_cli`]: CoordinatorConfig::merge_with_cli
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Number of worker processes, each paired with one controller thread
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Capacity of the bounded task buffer
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: NonZeroUsize,

    /// Substring to search for, matched ASCII case-insensitively
    #[serde(default)]
    pub query: String,

    /// Root directory of the walk
    #[serde(default = "default_search_path")]
    pub search_path: PathBuf,

    /// Case-sensitive file name suffix selecting files to search
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Shared search log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Directory for per-worker diagnostic files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Worker executable; resolved next to the running binary when unset
    #[serde(default)]
    pub worker_program: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Values given on the command line; `None` means the flag was not passed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub worker_count: Option<NonZeroUsize>,
    pub buffer_capacity: Option<NonZeroUsize>,
    pub query: Option<String>,
    pub search_path: Option<PathBuf>,
    pub file_suffix: Option<String>,
    pub log_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub worker_program: Option<PathBuf>,
    pub log_level: Option<String>,
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_buffer_capacity() -> NonZeroUsize {
    NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN)
}

fn default_search_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_suffix() -> String {
    ".txt".to_string()
}

fn default_log_path() -> PathBuf {
    PathBuf::from("searchlog.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            buffer_capacity: default_buffer_capacity(),
            query: String::new(),
            search_path: default_search_path(),
            file_suffix: default_file_suffix(),
            log_path: default_log_path(),
            output_dir: default_output_dir(),
            worker_program: None,
            log_level: default_log_level(),
        }
    }
}

impl CoordinatorConfig {
    /// Convenience constructor for the four required values
    pub fn new(
        worker_count: NonZeroUsize,
        buffer_capacity: NonZeroUsize,
        query: impl Into<String>,
        search_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            worker_count,
            buffer_capacity,
            query: query.into(),
            search_path: search_path.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus `config_path`.
    ///
    /// An explicit path that does not exist is an error; missing default
    /// files are skipped.
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("scoutpipe/config.yaml")),
            Some(PathBuf::from(".scoutpipe.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges command-line values over file values.
    ///
    /// Every value present in `cli` wins, including one that happens to equal
    /// the built-in default; absent values leave the file's setting alone.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(worker_count) = cli.worker_count {
            self.worker_count = worker_count;
        }
        if let Some(buffer_capacity) = cli.buffer_capacity {
            self.buffer_capacity = buffer_capacity;
        }
        if let Some(query) = cli.query {
            self.query = query;
        }
        if let Some(search_path) = cli.search_path {
            self.search_path = search_path;
        }
        if let Some(file_suffix) = cli.file_suffix {
            self.file_suffix = file_suffix;
        }
        if let Some(log_path) = cli.log_path {
            self.log_path = log_path;
        }
        if let Some(output_dir) = cli.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(worker_program) = cli.worker_program {
            self.worker_program = Some(worker_program);
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects values the run cannot work with
    pub fn validate(&self) -> SearchResult<()> {
        if self.query.is_empty() {
            return Err(SearchError::config_error("query must not be empty"));
        }
        if self.file_suffix.is_empty() {
            return Err(SearchError::config_error("file suffix must not be empty"));
        }
        Ok(())
    }

    /// The worker executable to launch
    pub fn worker_program_path(&self) -> SearchResult<PathBuf> {
        match &self.worker_program {
            Some(program) => Ok(program.clone()),
            None => sibling_worker_program(WORKER_BINARY),
        }
    }
}
