use std::fmt;
use std::path::{Path, PathBuf};

/// One occurrence of the query inside a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Identity of the worker that found the match
    pub worker_id: usize,
    /// The file the match was found in, as dispatched by the controller
    pub path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// 1-based byte offset of the match within its line
    pub column: usize,
}

impl MatchResult {
    pub fn new(worker_id: usize, path: &Path, line_number: usize, column: usize) -> Self {
        Self {
            worker_id,
            path: path.to_path_buf(),
            line_number,
            column,
        }
    }

    /// The newline-terminated line written to the log and diagnostic files
    pub fn to_message(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker{}: {}:{}:{}",
            self.worker_id,
            self.path.display(),
            self.line_number,
            self.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_format() {
        let result = MatchResult::new(3, Path::new("docs/notes.txt"), 12, 7);
        assert_eq!(result.to_string(), "worker3: docs/notes.txt:12:7");
        assert_eq!(result.to_message(), "worker3: docs/notes.txt:12:7\n");
    }
}
