//! Human-readable text output

use crate::config::workload::WorkloadType;
use crate::coordinator::RunReport;
use crate::stats::metrics::Metrics;
use crate::stats::WorkerResult;
use std::fmt::Write;

/// Print every result block of a finished run to stdout
///
/// Per-worker blocks come first (unless disabled), then the aggregate.
pub fn print_report(report: &RunReport) {
    let config = &report.config;
    if config.output.per_worker {
        for result in &report.per_worker {
            let wl = &config.workload;
            print!("{}", format_result(result, wl.block_size, wl.workload));
        }
    }
    print!(
        "{}",
        format_result(&report.aggregate, config.workload.block_size, config.workload.workload)
    );
}

/// Render one result block
///
/// Counter lines are only shown when non-zero.
pub fn format_result(result: &WorkerResult, block_size: u64, workload: WorkloadType) -> String {
    let metrics = Metrics::derive(result, block_size);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = match result.worker_id {
        Some(id) => writeln!(out, "worker {:3} result:", id),
        None => writeln!(out, "aggregate result:"),
    };

    let mut line = |label: &str, value: String| {
        let _ = writeln!(out, "  {:<24} = {}", label, value);
    };

    if result.files_written > 0 {
        line("files written", result.files_written.to_string());
    }
    if result.files_read > 0 {
        line("files read", result.files_read.to_string());
    }
    if result.files_deleted > 0 {
        line("files deleted", result.files_deleted.to_string());
    }
    if result.files_done() > 0 {
        line("files done", result.files_done().to_string());
    }
    if workload == WorkloadType::SequentialMixedReadWrite {
        if let Some(pct) = metrics.actual_read_pct {
            line("fraction of files read", format!("{:.2}%", pct));
        }
    }
    if result.io_count > 0 {
        line("I/O (record) transfers", result.io_count.to_string());
    }
    if result.total_bytes > 0 {
        line("total bytes", result.total_bytes.to_string());
    }
    line("elapsed time", format!("{:.2} sec", metrics.elapsed_secs));
    if metrics.throughput_mbps > 0.0 {
        line("throughput", format!("{:.2} MB/sec", metrics.throughput_mbps));
    }
    if metrics.files_per_sec > 0.0 {
        line("file xfer rate", format!("{:.2} files/sec", metrics.files_per_sec));
    }
    if metrics.iops > 0.0 {
        line(
            "IOPS",
            format!("{:.3} (requested by application)", metrics.iops),
        );
    }
    out
}
