use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::matcher::QueryMatcher;
use crate::errors::SearchResult;
use crate::protocol::{path_from_bytes, Frame, FrameReader, FrameWriter};
use crate::results::MatchResult;

const BUFFER_CAPACITY: usize = 65536;

/// Name of the diagnostic file a worker writes into its output directory
pub fn diagnostic_file_name(id: usize) -> String {
    format!("worker{}.out", id)
}

/// Totals for one worker's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinionStats {
    pub tasks: u64,
    pub matches: u64,
    pub unreadable: u64,
}

/// The scanning half of a worker process.
///
/// A minion answers every task with zero or more match messages followed by a
/// terminator, whatever happens to the file, so its controller can always
/// move on. Every emitted message is also copied to the diagnostic sink.
#[derive(Debug)]
pub struct Minion<D: Write> {
    id: usize,
    matcher: QueryMatcher,
    diagnostics: D,
    stats: MinionStats,
}

impl Minion<BufWriter<File>> {
    /// Creates a minion whose diagnostics go to `<output_dir>/worker<id>.out`
    pub fn create(id: usize, query: &str, output_dir: &Path) -> SearchResult<Self> {
        fs::create_dir_all(output_dir)?;
        let path: PathBuf = output_dir.join(diagnostic_file_name(id));
        let file = File::create(&path)?;
        debug!("Worker {} writing diagnostics to {}", id, path.display());
        Self::with_diagnostics(id, query, BufWriter::new(file))
    }
}

impl<D: Write> Minion<D> {
    /// Creates a minion writing diagnostics to an arbitrary sink
    pub fn with_diagnostics(id: usize, query: &str, mut diagnostics: D) -> SearchResult<Self> {
        write!(
            diagnostics,
            "Search for \"{}\" string on Worker{}\n----------------------\n",
            query, id
        )?;
        Ok(Self {
            id,
            matcher: QueryMatcher::new(query),
            diagnostics,
            stats: MinionStats::default(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> MinionStats {
        self.stats
    }

    /// Runs the task loop until a terminator or a clean end of input.
    ///
    /// Each task frame is answered on `output`. Returns the lifetime totals.
    pub fn serve<R: Read, W: Write>(&mut self, input: R, output: W) -> SearchResult<MinionStats> {
        let mut reader = FrameReader::new(input);
        let mut writer = FrameWriter::new(output);

        loop {
            match reader.read_frame()? {
                Some(Frame::Data(payload)) => {
                    let path = path_from_bytes(&payload);
                    self.handle_task(&path, &mut writer)?;
                }
                Some(Frame::End) => {
                    debug!("Worker {} received shutdown", self.id);
                    break;
                }
                None => {
                    warn!("Worker {} input closed without shutdown frame", self.id);
                    break;
                }
            }
        }

        self.diagnostics.flush()?;
        Ok(self.stats)
    }

    /// Scans one file and answers with its matches and a terminator.
    ///
    /// Only failures to write the answer are returned; an unreadable file is
    /// logged and answered with a bare terminator.
    pub fn handle_task<W: Write>(
        &mut self,
        path: &Path,
        writer: &mut FrameWriter<W>,
    ) -> SearchResult<usize> {
        trace!("Worker {} scanning {}", self.id, path.display());
        self.stats.tasks += 1;

        let found = match File::open(path) {
            Ok(file) => self.scan(path, BufReader::with_capacity(BUFFER_CAPACITY, file), writer)?,
            Err(e) => {
                warn!("Worker {} cannot open {}: {}", self.id, path.display(), e);
                self.stats.unreadable += 1;
                0
            }
        };

        writer.send_end()?;
        self.diagnostics.flush()?;
        Ok(found)
    }

    fn scan<R: BufRead, W: Write>(
        &mut self,
        path: &Path,
        mut reader: R,
        writer: &mut FrameWriter<W>,
    ) -> SearchResult<usize> {
        let mut line = Vec::with_capacity(256);
        let mut line_number = 0;
        let mut found = 0;

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Worker {} stopped reading {} at line {}: {}",
                        self.id,
                        path.display(),
                        line_number + 1,
                        e
                    );
                    self.stats.unreadable += 1;
                    break;
                }
            }
            line_number += 1;

            let content = strip_line_ending(&line);
            for column in self.matcher.find_columns(content) {
                let message = MatchResult::new(self.id, path, line_number, column).to_message();
                self.diagnostics.write_all(message.as_bytes())?;
                writer.send_data(message.as_bytes())?;
                found += 1;
            }
        }

        self.stats.matches += found as u64;
        Ok(found)
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
