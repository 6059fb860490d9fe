use clap::Parser;
use colored::Colorize;
use scoutpipe::{
    config::CliOverrides, coordinator::RunSummary, CoordinatorConfig, SearchError,
};
use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode, time::Duration};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

/// Search a directory tree in parallel with a pool of worker processes
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of worker processes
    worker_count: NonZeroUsize,

    /// Capacity of the task buffer
    buffer_capacity: NonZeroUsize,

    /// Text to search for (case-insensitive)
    query: String,

    /// Directory to search
    search_path: PathBuf,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only search files whose names end with this suffix [default: .txt]
    #[arg(short, long)]
    suffix: Option<String>,

    /// Search log to write [default: searchlog.txt]
    #[arg(short = 'o', long)]
    log_file: Option<PathBuf>,

    /// Directory for per-worker diagnostic files [default: .]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Worker executable (default: scoutpipe-minion next to this binary)
    #[arg(long)]
    worker: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: warn]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            worker_count: Some(self.worker_count),
            buffer_capacity: Some(self.buffer_capacity),
            query: Some(self.query.clone()),
            search_path: Some(self.search_path.clone()),
            file_suffix: self.suffix.clone(),
            log_path: self.log_file.clone(),
            output_dir: self.output_dir.clone(),
            worker_program: self.worker.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit with 1, help and version with 0
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(&cli) {
        Ok(summary) => {
            print_summary(&summary, cli.worker_count);
            if summary.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = CoordinatorConfig::load_from(cli.config.as_deref())?.merge_with_cli(cli.to_overrides());
    init_tracing(&config.log_level);
    scoutpipe::run(&config)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_summary(summary: &RunSummary, workers: NonZeroUsize) {
    let elapsed = Duration::from_millis(summary.elapsed.as_millis() as u64);
    println!(
        "Searched {} files with {} workers in {}",
        summary.stats.files_enqueued,
        workers,
        humantime::format_duration(elapsed)
    );
    println!(
        "Logged {} matches to {}",
        summary.stats.results_logged.to_string().green(),
        summary.log_path.display().to_string().blue()
    );

    if summary.stats.skipped_entries > 0 {
        eprintln!(
            "{}",
            format!(
                "Skipped {} unreadable directory entries",
                summary.stats.skipped_entries
            )
            .yellow()
        );
    }
    for failure in &summary.failures {
        eprintln!(
            "{} worker {}: {}",
            "failed:".red().bold(),
            failure.id,
            failure.message
        );
    }
    if summary.stats.skipped_tasks > 0 {
        eprintln!(
            "{}",
            format!(
                "{} files were not searched because their worker failed",
                summary.stats.skipped_tasks
            )
            .red()
        );
    }
}
