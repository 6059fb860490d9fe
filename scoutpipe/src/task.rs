use std::path::{Path, PathBuf};

/// A unit of work handed from the searcher to a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// A file to scan
    Path(PathBuf),
    /// No more tasks for the controller that dequeues this
    Sentinel,
}

impl Task {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Task::Path(path) => Some(path),
            Task::Sentinel => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Task::Sentinel)
    }
}
