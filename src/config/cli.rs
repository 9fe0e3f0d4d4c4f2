//! CLI argument parsing using clap
//!
//! Every option can also be supplied through an `FSPERF_*` environment
//! variable, which lets one launcher script configure many processes.

use crate::config::workload::WorkloadType;
use clap::builder::FalseyValueParser;
use clap::{CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

/// fsperf - multi-threaded file workload generator
#[derive(Parser, Debug, Default)]
#[command(name = "fsperf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (command-line options take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Workload Options ===
    /// Workload: seq-wr, seq-rd, rnd-wr, rnd-rd, unlink, seq-rdwrmix
    #[arg(short = 'w', long, env = "FSPERF_LOAD")]
    pub workload: Option<WorkloadType>,

    /// Record (transfer) size, e.g. 4k, 64k, 1M
    #[arg(short = 'b', long, env = "FSPERF_RECSZ")]
    pub block_size: Option<String>,

    /// File size, e.g. 1M, 4G
    #[arg(short = 's', long, env = "FSPERF_FSZ")]
    pub file_size: Option<String>,

    /// Number of files each worker accesses
    #[arg(short = 'n', long, env = "FSPERF_FILES")]
    pub files: Option<u64>,

    /// Number of worker threads
    #[arg(short = 't', long, env = "FSPERF_THREADS")]
    pub threads: Option<usize>,

    /// Directory under which worker directories are placed
    #[arg(long, env = "FSPERF_BASEDIR")]
    pub base_dir: Option<PathBuf>,

    /// File name prefix
    #[arg(long, env = "FSPERF_PREFIX")]
    pub prefix: Option<String>,

    /// Maximum files placed in a leaf directory
    #[arg(long, env = "FSPERF_FILES_PER_DIR")]
    pub files_per_dir: Option<u64>,

    /// Requests per file for random workloads (0 = entire file)
    #[arg(long, env = "FSPERF_IOREQ")]
    pub io_requests: Option<u64>,

    /// Read percentage for the seq-rdwrmix workload (0-100)
    #[arg(long, env = "FSPERF_READ_PCT")]
    pub read_percent: Option<u8>,

    /// Delay after each file (e.g. 100us, 5ms, 1s)
    #[arg(long, env = "FSPERF_DELAY")]
    pub delay: Option<String>,

    /// Seed for offset shuffles and mixed-workload draws
    #[arg(long, env = "FSPERF_SEED")]
    pub seed: Option<u64>,

    // === Open Flags ===
    /// Use O_DIRECT for every file
    #[arg(long, env = "FSPERF_DIRECT", value_parser = FalseyValueParser::new())]
    pub direct: bool,

    /// Sequential writes append to existing files
    #[arg(long, env = "FSPERF_APPEND", value_parser = FalseyValueParser::new())]
    pub append: bool,

    /// Sequential writes overwrite existing files
    #[arg(long, env = "FSPERF_OVERWRITE", value_parser = FalseyValueParser::new())]
    pub overwrite: bool,

    /// fsync written files before closing them
    #[arg(long, env = "FSPERF_FSYNC_AT_CLOSE", value_parser = FalseyValueParser::new())]
    pub fsync_at_close: bool,

    // === Starting Gun ===
    /// Wait for this file to appear before starting the test
    #[arg(long, env = "FSPERF_STARTING_GUN")]
    pub starting_gun: Option<PathBuf>,

    /// Seconds each worker waits for the starting gun file
    #[arg(long, env = "FSPERF_STARTING_GUN_TIMEOUT")]
    pub starting_gun_timeout: Option<u64>,

    // === Backend ===
    /// Storage backend
    #[arg(long, value_enum, env = "FSPERF_BACKEND")]
    pub backend: Option<BackendArg>,

    // === Output Options ===
    /// Write a JSON report to this file
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Print only the aggregate result block
    #[arg(long)]
    pub no_per_worker: bool,

    /// Validate and print the configuration without running
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long, env = "FSPERF_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,
}

/// Storage backend choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Local or mounted filesystem through POSIX calls
    Posix,
    /// In-process memory store (smoke tests)
    Memory,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Usage summary shown after a configuration error
    pub fn usage() -> String {
        format!(
            "{}\n\nFor more information, try '--help'.",
            Self::command().render_usage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "fsperf",
            "-w",
            "rnd-rd",
            "-b",
            "4k",
            "-s",
            "1M",
            "-t",
            "4",
            "--backend",
            "memory",
            "--starting-gun",
            "/mnt/gv0/start",
        ])
        .unwrap();
        assert_eq!(cli.workload, Some(WorkloadType::RandomRead));
        assert_eq!(cli.block_size.as_deref(), Some("4k"));
        assert_eq!(cli.threads, Some(4));
        assert_eq!(cli.backend, Some(BackendArg::Memory));
        assert_eq!(cli.starting_gun, Some(PathBuf::from("/mnt/gv0/start")));
    }

    #[test]
    fn test_usage_names_binary_and_help() {
        let usage = Cli::usage();
        assert!(usage.starts_with("Usage: fsperf"));
        assert!(usage.ends_with("try '--help'."));
    }

    #[test]
    fn test_invalid_workload_rejected() {
        assert!(Cli::try_parse_from(["fsperf", "-w", "seq-write"]).is_err());
    }
}
