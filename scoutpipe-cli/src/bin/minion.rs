//! Worker process: answers framed task paths on stdin with framed match
//! messages on stdout. Never write anything else to stdout here.

use clap::Parser;
use scoutpipe::{search::Minion, SearchError};
use std::{io, path::PathBuf, process::ExitCode};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

/// Scan files sent by a scoutpipe coordinator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Worker identity used in messages and the diagnostic file name
    id: usize,

    /// Text to search for (case-insensitive)
    query: String,

    /// Directory for the worker<id>.out diagnostic file
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Worker {} failed: {}", cli.id, e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut minion = Minion::create(cli.id, &cli.query, &cli.output_dir)?;
    let stats = minion.serve(io::stdin().lock(), io::stdout().lock())?;
    debug!(
        "Worker {} finished: {} tasks, {} matches, {} unreadable",
        cli.id, stats.tasks, stats.matches, stats.unreadable
    );
    Ok(())
}
