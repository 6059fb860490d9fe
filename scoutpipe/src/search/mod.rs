/// The scanning side of a worker process.
///
/// A worker receives file paths one at a time and answers each with the
/// positions of every case-insensitive occurrence of its query:
///
/// - [`QueryMatcher`] finds occurrences within a single line, including
///   overlapping ones.
/// - [`Minion`] owns the task loop: it reads task frames, scans the file line
///   by line, and writes one match frame per occurrence followed by a
///   terminator. It also mirrors every message to a per-worker diagnostic file.
///
/// The `scoutpipe-minion` binary is a thin wrapper that runs a `Minion` over
/// its standard input and output.
pub mod matcher;
pub mod worker;

pub use matcher::QueryMatcher;
pub use worker::{diagnostic_file_name, Minion, MinionStats};
