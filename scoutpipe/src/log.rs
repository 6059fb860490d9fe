use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::errors::SearchResult;

/// Append-only search log shared by every controller.
///
/// Each [`append`](SearchLog::append) holds the lock for exactly one write, so
/// lines from different controllers never interleave within a line. The order
/// of lines across controllers is arrival order.
#[derive(Debug)]
pub struct SearchLog<W: Write = BufWriter<File>> {
    sink: Mutex<W>,
}

impl SearchLog<BufWriter<File>> {
    /// Creates (truncating) the log file at `path` and writes its header
    pub fn create(path: &Path, query: &str) -> SearchResult<Self> {
        let file = File::create(path)?;
        debug!("Search log opened at {}", path.display());
        Self::with_writer(BufWriter::new(file), query)
    }
}

impl<W: Write> SearchLog<W> {
    /// Wraps an arbitrary sink and writes the header to it
    pub fn with_writer(mut sink: W, query: &str) -> SearchResult<Self> {
        write!(
            sink,
            "Log File\nSearch for \"{}\" string\n----------------------\n",
            query
        )?;
        Ok(Self {
            sink: Mutex::new(sink),
        })
    }

    /// Appends `message` verbatim
    pub fn append(&self, message: &[u8]) -> SearchResult<()> {
        // A panic elsewhere cannot leave a half-written message behind the
        // lock, so the sink is still usable.
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(message)?;
        Ok(())
    }

    /// Flushes the sink and hands it back
    pub fn finish(self) -> SearchResult<W> {
        let mut sink = self.sink.into_inner().unwrap_or_else(PoisonError::into_inner);
        sink.flush()?;
        Ok(sink)
    }
}
