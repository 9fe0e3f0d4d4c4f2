//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;
pub mod workload;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use workload::*;

/// Complete test configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    /// Starting gun rendezvous (skipped when absent)
    #[serde(default)]
    pub starting_gun: Option<StartingGunConfig>,
    #[serde(default)]
    pub backend: BackendType,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker threads
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_threads() -> usize {
    1
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
        }
    }
}

/// Starting gun configuration
///
/// Every worker signals readiness next to the trigger file and then waits for
/// the trigger to appear before starting its measured run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartingGunConfig {
    /// Trigger file; readiness markers are created in its parent directory
    pub trigger: PathBuf,
    /// Seconds each worker waits for the trigger
    #[serde(default = "default_gun_timeout")]
    pub timeout_secs: u64,
    /// Milliseconds between trigger checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Milliseconds to wait after seeing the trigger so siblings see it too
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

fn default_gun_timeout() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_grace_ms() -> u64 {
    3000
}

impl StartingGunConfig {
    pub fn new(trigger: PathBuf) -> Self {
        Self {
            trigger,
            timeout_secs: default_gun_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            grace_ms: default_grace_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Generic filesystem through POSIX system calls
    Posix,
    /// In-process memory store
    Memory,
}

impl Default for BackendType {
    fn default() -> Self {
        Self::Posix
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Posix => write!(f, "posix"),
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report file path
    pub json_output: Option<PathBuf>,
    /// Print a result block per worker in addition to the aggregate
    #[serde(default = "default_per_worker")]
    pub per_worker: bool,
}

fn default_per_worker() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_output: None,
            per_worker: default_per_worker(),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Validate and print configuration without running
    #[serde(default)]
    pub dry_run: bool,
    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wl = &self.workload;
        writeln!(f, "BACKEND:")?;
        writeln!(f, "  type = {}", self.backend)?;
        writeln!(f, "WORKLOAD:")?;
        writeln!(f, "  type = {} ({})", wl.workload, wl.workload.description())?;
        writeln!(f, "  threads = {}", self.workers.threads)?;
        writeln!(f, "  base directory = {}", wl.base_dir.display())?;
        writeln!(f, "  file prefix = {}", wl.prefix)?;
        writeln!(f, "  file size = {} KB", wl.file_size / 1024)?;
        writeln!(f, "  file count = {}", wl.file_count)?;
        writeln!(f, "  record size = {} KB", wl.block_size / 1024)?;
        writeln!(f, "  files/dir = {}", wl.files_per_dir)?;
        writeln!(f, "  fsync-at-close? {}", yes_no(wl.fsync_at_close))?;
        if wl.workload.is_random() {
            writeln!(f, "  random read/write requests = {}", wl.effective_io_requests())?;
        }
        if wl.workload == WorkloadType::SequentialMixedReadWrite {
            writeln!(f, "  read percentage = {}", wl.effective_read_percent())?;
        }
        if wl.direct {
            writeln!(f, "  forcing use of direct I/O with O_DIRECT flag in open call")?;
        }
        if wl.append {
            writeln!(f, "  append to existing files")?;
        }
        if wl.overwrite {
            writeln!(f, "  overwrite existing files")?;
        }
        if let Some(us) = wl.delay_us {
            writeln!(f, "  delay after each file = {} usec", us)?;
        }
        if let Some(ref gun) = self.starting_gun {
            writeln!(f, "  starting gun = {}", gun.trigger.display())?;
            writeln!(f, "  start timeout = {} sec", gun.timeout_secs)?;
        }
        Ok(())
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}
