//! JSON output formatting
//!
//! Writes one report file per run holding:
//! - When and where the run happened (RFC 3339 timestamp, host name)
//! - The validated configuration
//! - Per-worker results with derived rates (optional)
//! - The aggregate result with derived rates

use crate::config::Config;
use crate::coordinator::RunReport;
use crate::stats::metrics::Metrics;
use crate::stats::WorkerResult;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Complete JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub tool: &'static str,
    pub version: &'static str,
    /// Wall-clock time the report was produced (RFC 3339)
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub config: Config,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<JsonResult>,
    pub aggregate: JsonResult,
}

/// One result with its derived rates
#[derive(Debug, Clone, Serialize)]
pub struct JsonResult {
    #[serde(flatten)]
    pub result: WorkerResult,
    pub files_done: u64,
    pub metrics: Metrics,
}

impl JsonResult {
    pub fn new(result: &WorkerResult, block_size: u64) -> Self {
        Self {
            result: result.clone(),
            files_done: result.files_done(),
            metrics: Metrics::derive(result, block_size),
        }
    }
}

/// Build the report for a finished run
pub fn build_report(report: &RunReport, now: DateTime<Utc>) -> JsonReport {
    let config = report.config.as_ref();
    let block_size = config.workload.block_size;
    let workers = if config.output.per_worker {
        report
            .per_worker
            .iter()
            .map(|r| JsonResult::new(r, block_size))
            .collect()
    } else {
        Vec::new()
    };

    JsonReport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now.to_rfc3339(),
        hostname: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
        config: config.clone(),
        workers,
        aggregate: JsonResult::new(&report.aggregate, block_size),
    }
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, report: &JsonReport) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output {}", output_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write JSON output {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_report(per_worker: bool) -> RunReport {
        let mut config = Config::default();
        config.output.per_worker = per_worker;
        let worker = WorkerResult {
            worker_id: Some(0),
            start_ns: 0,
            end_ns: 1_000_000_000,
            total_bytes: 16 * 65536,
            io_count: 16,
            files_written: 1,
            ..Default::default()
        };
        let aggregate = WorkerResult {
            worker_id: None,
            ..worker.clone()
        };
        RunReport {
            config: Arc::new(config),
            per_worker: vec![worker],
            aggregate,
        }
    }

    #[test]
    fn test_report_shape() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let json = serde_json::to_value(build_report(&sample_report(true), now)).unwrap();

        assert_eq!(json["tool"], "fsperf");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00+00:00");
        assert_eq!(json["config"]["workload"]["workload"], "seq-wr");
        assert_eq!(json["workers"][0]["worker_id"], 0);
        assert_eq!(json["workers"][0]["io_count"], 16);
        assert!(json["aggregate"]["worker_id"].is_null());
        assert_eq!(json["aggregate"]["files_done"], 1);
        assert_eq!(json["aggregate"]["metrics"]["throughput_mbps"], 1.0);
    }

    #[test]
    fn test_per_worker_omitted_when_disabled() {
        let json = serde_json::to_value(build_report(&sample_report(false), Utc::now())).unwrap();
        assert!(json.get("workers").is_none());
    }

    #[test]
    fn test_write_json_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_json_output(&path, &build_report(&sample_report(true), Utc::now())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["aggregate"]["io_count"], 16);
    }
}
