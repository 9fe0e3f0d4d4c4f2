//! Derived rates
//!
//! All rates are computed from a `WorkerResult` and the record size:
//!
//! - `megabytes = io_count * block_size / 2^20`
//! - `throughput_mbps = megabytes / elapsed`
//! - `files_per_sec = files_done / elapsed`, reported as 0 below 10 files
//! - `iops = throughput_mbps * 1024 / (block_size / 1024)`
//!
//! A zero elapsed interval yields zero rates.

use crate::stats::WorkerResult;
use serde::Serialize;

/// File counts below this are too small for a meaningful file rate
pub const MIN_FILES_FOR_RATE: u64 = 10;

/// Rates derived from one result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub megabytes: f64,
    pub elapsed_secs: f64,
    pub throughput_mbps: f64,
    pub files_per_sec: f64,
    pub iops: f64,
    /// Share of completed files that were read, in percent
    pub actual_read_pct: Option<f64>,
}

impl Metrics {
    pub fn derive(result: &WorkerResult, block_size: u64) -> Self {
        let megabytes = (result.io_count as f64 * block_size as f64) / (1024.0 * 1024.0);
        let elapsed_secs = result.elapsed_secs();
        let files_done = result.files_done();

        let (throughput_mbps, files_per_sec) = if elapsed_secs > 0.0 {
            let files_per_sec = if files_done < MIN_FILES_FOR_RATE {
                0.0
            } else {
                files_done as f64 / elapsed_secs
            };
            (megabytes / elapsed_secs, files_per_sec)
        } else {
            (0.0, 0.0)
        };

        let block_size_kb = block_size as f64 / 1024.0;
        let iops = if block_size_kb > 0.0 {
            throughput_mbps * 1024.0 / block_size_kb
        } else {
            0.0
        };

        let actual_read_pct = if files_done > 0 {
            Some(result.files_read as f64 * 100.0 / files_done as f64)
        } else {
            None
        };

        Self {
            megabytes,
            elapsed_secs,
            throughput_mbps,
            files_per_sec,
            iops,
            actual_read_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sequential_write_rates() {
        let result = WorkerResult {
            worker_id: Some(0),
            start_ns: 0,
            end_ns: 2_000_000_000,
            total_bytes: 1600 * 65536,
            io_count: 1600,
            files_written: 100,
            ..Default::default()
        };
        let m = Metrics::derive(&result, 65536);
        assert!(approx(m.megabytes, 100.0));
        assert!(approx(m.elapsed_secs, 2.0));
        assert!(approx(m.throughput_mbps, 50.0));
        assert!(approx(m.files_per_sec, 50.0));
        assert!(approx(m.iops, 800.0));
        assert_eq!(m.actual_read_pct, Some(0.0));
    }

    #[test]
    fn test_file_rate_suppressed_below_ten_files() {
        let result = WorkerResult {
            end_ns: 1_000_000_000,
            io_count: 16,
            files_written: 9,
            ..Default::default()
        };
        let m = Metrics::derive(&result, 65536);
        assert_eq!(m.files_per_sec, 0.0);
        assert!(m.throughput_mbps > 0.0);
    }

    #[test]
    fn test_zero_elapsed_gives_zero_rates() {
        let result = WorkerResult {
            start_ns: 5,
            end_ns: 5,
            io_count: 10,
            files_deleted: 20,
            ..Default::default()
        };
        let m = Metrics::derive(&result, 4096);
        assert_eq!(m.throughput_mbps, 0.0);
        assert_eq!(m.files_per_sec, 0.0);
        assert_eq!(m.iops, 0.0);
    }

    #[test]
    fn test_actual_read_pct() {
        let result = WorkerResult {
            end_ns: 1,
            files_read: 30,
            files_written: 70,
            ..Default::default()
        };
        assert_eq!(Metrics::derive(&result, 4096).actual_read_pct, Some(30.0));
        assert_eq!(Metrics::derive(&WorkerResult::default(), 4096).actual_read_pct, None);
    }
}
