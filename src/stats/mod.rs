//! Statistics collection
//!
//! Each worker owns one `WorkerResult` and fills it in as it goes; nothing is
//! shared between workers while they run. When a worker finishes, its result
//! is sent to the driver and never changes again.
//!
//! - **Per-worker records**: `WorkerResult` with `worker_id = Some(id)`
//! - **Aggregate record**: same shape, `worker_id = None` (see [`aggregator`])
//! - **Derived rates**: throughput, file rate and IOPS (see [`metrics`])
//!
//! # Example
//!
//! ```
//! use fsperf::stats::WorkerResult;
//!
//! let mut result = WorkerResult::new(0);
//! result.start_ns = 1_000;
//! result.record_transfer(65536);
//! result.files_written += 1;
//! result.end_ns = 2_000_001_000;
//!
//! assert_eq!(result.files_done(), 1);
//! assert_eq!(result.elapsed_secs(), 2.0);
//! ```

pub mod aggregator;
pub mod metrics;

use crate::util::time::ns_to_secs;
use serde::{Deserialize, Serialize};

/// Counters and interval of one worker, or of the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResult {
    /// `Some(id)` for a worker, `None` for the aggregate
    pub worker_id: Option<usize>,
    /// Clock reading after the starting gun
    pub start_ns: u64,
    /// Clock reading after the last file
    pub end_ns: u64,
    pub total_bytes: u64,
    pub io_count: u64,
    pub files_read: u64,
    pub files_written: u64,
    pub files_deleted: u64,
}

impl WorkerResult {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id: Some(worker_id),
            ..Default::default()
        }
    }

    /// Zeroed aggregate record
    pub fn aggregate() -> Self {
        Self::default()
    }

    /// Count one completed transfer
    #[inline]
    pub fn record_transfer(&mut self, bytes: usize) {
        self.io_count += 1;
        self.total_bytes += bytes as u64;
    }

    pub fn files_done(&self) -> u64 {
        self.files_read + self.files_written + self.files_deleted
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }

    pub fn elapsed_secs(&self) -> f64 {
        ns_to_secs(self.elapsed_ns())
    }

    pub fn is_aggregate(&self) -> bool {
        self.worker_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worker_result() {
        let r = WorkerResult::new(7);
        assert_eq!(r.worker_id, Some(7));
        assert!(!r.is_aggregate());
        assert_eq!(r.files_done(), 0);
        assert!(WorkerResult::aggregate().is_aggregate());
    }

    #[test]
    fn test_record_transfer_and_files_done() {
        let mut r = WorkerResult::new(0);
        for _ in 0..16 {
            r.record_transfer(65536);
        }
        r.files_written = 1;
        r.files_read = 2;
        r.files_deleted = 3;
        assert_eq!(r.io_count, 16);
        assert_eq!(r.total_bytes, 1024 * 1024);
        assert_eq!(r.files_done(), 6);
    }

    #[test]
    fn test_elapsed_never_negative() {
        let r = WorkerResult {
            start_ns: 10,
            end_ns: 5,
            ..Default::default()
        };
        assert_eq!(r.elapsed_ns(), 0);
    }

    #[test]
    fn test_serializes_sentinel_as_null() {
        let json = serde_json::to_value(WorkerResult::aggregate()).unwrap();
        assert!(json["worker_id"].is_null());
        let json = serde_json::to_value(WorkerResult::new(3)).unwrap();
        assert_eq!(json["worker_id"], 3);
    }
}
