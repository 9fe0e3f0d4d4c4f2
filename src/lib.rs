//! fsperf - multi-threaded file workload generator
//!
//! fsperf measures throughput and IOPS of a storage backend by running a fixed
//! file workload (sequential/random read or write, delete, or a mixed
//! sequential read/write) in several worker threads at once, optionally
//! lined up with workers in other processes through a shared "starting gun"
//! file.
//!
//! # Architecture
//!
//! - **Storage backends**: POSIX system calls, or an in-memory store
//! - **Workers**: one OS thread each, stepping through their files
//! - **Starting gun**: file-based rendezvous across processes and hosts
//! - **Random workloads**: one shared shuffled offset order per run
//! - **Results**: per-worker records merged into one aggregate

pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod output;
pub mod stats;
pub mod target;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{run, run_validated, RunReport};
pub use engine::StorageBackend;
pub use error::BenchError;
pub use stats::WorkerResult;
pub use worker::Worker;

/// Result type used throughout fsperf
pub type Result<T> = anyhow::Result<T>;
