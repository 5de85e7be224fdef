//! vmsim - Paging Simulator Entry Point
//!
//! Usage: vmsim -n <frames> -a <opt|clock|lru|nfu> [OPTIONS] <tracefile>
//!
//! Arguments:
//!   tracefile - valgrind lackey style trace, one `<op> <hexaddr>,<size>` per line
//!
//! Options:
//!   -n, --frames <FRAMES>         Number of physical frames (repeatable)
//!   -a, --algorithm <ALGORITHM>   Replacement algorithm (repeatable)
//!       --dirty-only              Count only dirty evictions as writes to disk
//!   -v, --verbose                 Log every access to stderr
//!
//! Repeating `-n` or `-a` runs every combination in parallel and prints one
//! report per run.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vmsim::{simulate_many, Algorithm, RunConfig, TraceSource, WriteBackMode};

/// Trace-driven virtual memory paging simulator
#[derive(Parser, Debug)]
#[command(name = "vmsim", version, about, long_about = None)]
struct Cli {
    /// Number of physical frames
    #[arg(short = 'n', long = "frames", value_name = "FRAMES", required = true)]
    frames: Vec<usize>,

    /// Replacement algorithm: opt, clock, lru or nfu
    #[arg(
        short = 'a',
        long = "algorithm",
        value_name = "ALGORITHM",
        required = true,
        value_enum
    )]
    algorithms: Vec<Algorithm>,

    /// Count an eviction as a write to disk only if the victim was written
    #[arg(long)]
    dirty_only: bool,

    /// Log every access (hit, fault, eviction) to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Trace file to replay
    trace: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "vmsim=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Every (frames, algorithm) combination, validated before any I/O
fn build_configs(cli: &Cli) -> Result<Vec<RunConfig>> {
    let write_back = if cli.dirty_only {
        WriteBackMode::DirtyOnly
    } else {
        WriteBackMode::EveryEviction
    };

    let mut configs = Vec::with_capacity(cli.frames.len() * cli.algorithms.len());
    for &algorithm in &cli.algorithms {
        for &frames in &cli.frames {
            let config = RunConfig::new(frames, algorithm)
                .with_context(|| format!("invalid frame count {}", frames))?;
            configs.push(config.with_write_back(write_back));
        }
    }
    Ok(configs)
}

/// Main logic separated from main() for cleaner error handling
fn run(cli: &Cli) -> Result<()> {
    // Step 1: Validate configuration
    let configs = build_configs(cli)?;

    // Step 2: Read and validate the trace
    let trace = TraceSource::from_file(&cli.trace)
        .with_context(|| format!("cannot load trace {}", cli.trace.display()))?;
    info!(
        trace = %cli.trace.display(),
        records = trace.len(),
        skipped = trace.skipped(),
        runs = configs.len(),
        "trace loaded"
    );

    // Step 3: Replay
    let reports = simulate_many(trace.records(), &configs).context("simulation aborted")?;

    // Step 4: Report
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", report);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use vmsim::{ConfigError, NUM_PAGES};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_standard_invocation() {
        let cli = Cli::try_parse_from(["vmsim", "-n", "8", "-a", "opt", "gcc.trace"]).unwrap();
        assert_eq!(cli.frames, vec![8]);
        assert_eq!(cli.algorithms, vec![Algorithm::Opt]);
        assert_eq!(cli.trace, PathBuf::from("gcc.trace"));
        assert!(!cli.dirty_only);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        assert!(Cli::try_parse_from(["vmsim", "-n", "8", "-a", "fifo", "t"]).is_err());
    }

    #[test]
    fn test_rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["vmsim", "-n", "8", "t"]).is_err());
        assert!(Cli::try_parse_from(["vmsim", "-a", "lru", "t"]).is_err());
        assert!(Cli::try_parse_from(["vmsim", "-n", "8", "-a", "lru"]).is_err());
        assert!(Cli::try_parse_from(["vmsim", "-n", "eight", "-a", "lru", "t"]).is_err());
    }

    #[test]
    fn test_repeated_options_build_every_combination() {
        let cli = Cli::try_parse_from([
            "vmsim", "-n", "2", "-n", "4", "-a", "lru", "-a", "clock", "--dirty-only", "t",
        ])
        .unwrap();

        let configs = build_configs(&cli).unwrap();
        assert_eq!(configs.len(), 4);
        assert_eq!(configs[0], RunConfig::new(2, Algorithm::Lru).unwrap().with_write_back(WriteBackMode::DirtyOnly));
        assert_eq!(configs[3].frames(), 4);
        assert_eq!(configs[3].algorithm(), Algorithm::Clock);
    }

    #[test]
    fn test_zero_frames_is_fatal() {
        let cli = Cli::try_parse_from(["vmsim", "-n", "0", "-a", "lru", "t"]).unwrap();
        let err = build_configs(&cli).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ZeroFrames)));
    }

    #[test]
    fn test_oversized_frame_count_is_fatal() {
        let frames = (NUM_PAGES + 1).to_string();
        let cli = Cli::try_parse_from(["vmsim", "-n", frames.as_str(), "-a", "lru", "t"]).unwrap();
        let err = build_configs(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::TooManyFrames { .. })
        ));
    }

    #[test]
    fn test_missing_trace_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.trace");
        let cli = Cli::try_parse_from(["vmsim", "-n", "4", "-a", "nfu", path.to_str().unwrap()]).unwrap();
        assert!(run(&cli).is_err());
    }
}
