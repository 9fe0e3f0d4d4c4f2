//! Workload definition structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Named access pattern applied to every file a worker touches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkloadType {
    #[serde(rename = "seq-wr")]
    SequentialWrite,
    #[serde(rename = "seq-rd")]
    SequentialRead,
    #[serde(rename = "rnd-wr")]
    RandomWrite,
    #[serde(rename = "rnd-rd")]
    RandomRead,
    #[serde(rename = "unlink")]
    Delete,
    #[serde(rename = "seq-rdwrmix")]
    SequentialMixedReadWrite,
}

impl WorkloadType {
    pub const ALL: [WorkloadType; 6] = [
        WorkloadType::SequentialWrite,
        WorkloadType::SequentialRead,
        WorkloadType::RandomWrite,
        WorkloadType::RandomRead,
        WorkloadType::Delete,
        WorkloadType::SequentialMixedReadWrite,
    ];

    /// Short name used on the command line and in config files
    pub fn name(&self) -> &'static str {
        match self {
            WorkloadType::SequentialWrite => "seq-wr",
            WorkloadType::SequentialRead => "seq-rd",
            WorkloadType::RandomWrite => "rnd-wr",
            WorkloadType::RandomRead => "rnd-rd",
            WorkloadType::Delete => "unlink",
            WorkloadType::SequentialMixedReadWrite => "seq-rdwrmix",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkloadType::SequentialWrite => "sequential write",
            WorkloadType::SequentialRead => "sequential read",
            WorkloadType::RandomWrite => "random write",
            WorkloadType::RandomRead => "random read",
            WorkloadType::Delete => "delete",
            WorkloadType::SequentialMixedReadWrite => "mixed sequential read/write",
        }
    }

    /// Random workloads use positioned IO at offsets from the shared permutation
    pub fn is_random(&self) -> bool {
        matches!(self, WorkloadType::RandomWrite | WorkloadType::RandomRead)
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkloadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadType::ALL
            .iter()
            .copied()
            .find(|w| w.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = WorkloadType::ALL.iter().map(|w| w.name()).collect();
                format!("invalid workload type {} (expected one of {})", s, names.join(", "))
            })
    }
}

impl Default for WorkloadType {
    fn default() -> Self {
        Self::SequentialWrite
    }
}

/// Workload configuration shared read-only by every worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Access pattern
    #[serde(default)]
    pub workload: WorkloadType,
    /// Transfer size of one IO in bytes
    #[serde(default = "default_block_size")]
    pub block_size: u64,
    /// Size of each file in bytes
    #[serde(default = "default_file_size")]
    pub file_size: u64,
    /// Files processed by each worker
    #[serde(default = "default_file_count")]
    pub file_count: u64,
    /// IO requests per file for random workloads (0 = whole file)
    #[serde(default)]
    pub io_requests: u64,
    /// Maximum files in one leaf directory
    #[serde(default = "default_files_per_dir")]
    pub files_per_dir: u64,
    /// File name prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Directory under which the per-worker shard directories live
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Open every file with O_DIRECT
    #[serde(default)]
    pub direct: bool,
    /// Sequential writes append to existing files
    #[serde(default)]
    pub append: bool,
    /// Sequential writes overwrite existing files in place
    #[serde(default)]
    pub overwrite: bool,
    /// fsync written files before closing them
    #[serde(default)]
    pub fsync_at_close: bool,
    /// Pause after each file, in microseconds
    pub delay_us: Option<u64>,
    /// Read percentage for the mixed workload (0-100)
    pub read_percent: Option<u8>,
    /// Fixed seed for offset shuffles and mixed-mode draws
    pub seed: Option<u64>,
}

pub fn default_block_size() -> u64 {
    64 * 1024
}

pub fn default_file_size() -> u64 {
    1024 * 1024
}

pub fn default_file_count() -> u64 {
    100
}

pub fn default_files_per_dir() -> u64 {
    1000
}

pub fn default_prefix() -> String {
    "f".to_string()
}

pub fn default_base_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

/// Read share used by the mixed workload when none is configured
pub const DEFAULT_READ_PERCENT: u8 = 50;

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workload: WorkloadType::default(),
            block_size: default_block_size(),
            file_size: default_file_size(),
            file_count: default_file_count(),
            io_requests: 0,
            files_per_dir: default_files_per_dir(),
            prefix: default_prefix(),
            base_dir: default_base_dir(),
            direct: false,
            append: false,
            overwrite: false,
            fsync_at_close: false,
            delay_us: None,
            read_percent: None,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    /// Transfers that fit in one file
    pub fn max_io_requests(&self) -> u64 {
        if self.block_size == 0 {
            0
        } else {
            self.file_size / self.block_size
        }
    }

    /// Transfers issued per file: the configured count for random workloads,
    /// the whole file otherwise
    pub fn effective_io_requests(&self) -> u64 {
        if self.workload.is_random() && self.io_requests > 0 {
            self.io_requests
        } else {
            self.max_io_requests()
        }
    }

    pub fn effective_read_percent(&self) -> u8 {
        self.read_percent.unwrap_or(DEFAULT_READ_PERCENT)
    }
}
