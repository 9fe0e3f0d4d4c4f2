//! Configuration validation
//!
//! Validation runs once, before any worker starts, and may adjust the
//! configuration in place (transfer size shrink, default random request count).
//! Every rejection is a `BenchError::Configuration`.

use super::*;
use crate::error::BenchError;
use crate::Result;
use tracing::warn;

/// Validate and normalize a complete configuration
pub fn validate_config(config: &mut Config) -> Result<()> {
    validate_workload(&mut config.workload)?;
    validate_workers(&config.workers)?;
    if let Some(ref gun) = config.starting_gun {
        validate_starting_gun(gun)?;
    }
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &mut WorkloadConfig) -> Result<()> {
    if workload.append && workload.overwrite {
        return Err(BenchError::config("append and overwrite modes are mutually exclusive").into());
    }

    if workload.block_size == 0 {
        return Err(BenchError::config("record size must be greater than zero").into());
    }
    if workload.file_size == 0 {
        return Err(BenchError::config("file size must be greater than zero").into());
    }
    if workload.files_per_dir == 0 {
        return Err(BenchError::config("files per directory must be greater than zero").into());
    }
    if workload.prefix.is_empty() || workload.prefix.contains('/') {
        return Err(BenchError::config(format!(
            "file prefix '{}' must be a non-empty name without '/'",
            workload.prefix
        ))
        .into());
    }

    if workload.block_size > workload.file_size {
        warn!(
            "record size {} exceeds file size {}, shrinking record size to file size",
            workload.block_size, workload.file_size
        );
        workload.block_size = workload.file_size;
    }

    if let Some(pct) = workload.read_percent {
        if pct > 100 {
            return Err(BenchError::config(format!(
                "read percentage must be between 0 and 100, got {}",
                pct
            ))
            .into());
        }
    }

    if workload.workload.is_random() {
        if workload.file_size % workload.block_size != 0 {
            return Err(BenchError::config(format!(
                "random workloads need the file size ({}) to be a multiple of the record size ({})",
                workload.file_size, workload.block_size
            ))
            .into());
        }
        let max = workload.max_io_requests();
        if workload.io_requests == 0 {
            workload.io_requests = max;
        } else if workload.io_requests > max {
            return Err(BenchError::config(format!(
                "io requests ({}) too large for file size and record size (max {})",
                workload.io_requests, max
            ))
            .into());
        }
    }

    if workload.direct && workload.block_size % 512 != 0 {
        warn!(
            "record size {} is not a multiple of 512, O_DIRECT transfers may be rejected",
            workload.block_size
        );
    }

    Ok(())
}

/// Validate worker configuration
pub fn validate_workers(workers: &WorkerConfig) -> Result<()> {
    if workers.threads == 0 {
        return Err(BenchError::config("threads must be at least 1").into());
    }
    Ok(())
}

/// Validate starting gun configuration
fn validate_starting_gun(gun: &StartingGunConfig) -> Result<()> {
    if gun.trigger.as_os_str().is_empty() {
        return Err(BenchError::config("starting gun path must not be empty").into());
    }
    if gun.trigger.file_name().is_none() {
        return Err(BenchError::config(format!(
            "starting gun path {} does not name a file",
            gun.trigger.display()
        ))
        .into());
    }
    if gun.poll_interval_ms == 0 {
        return Err(
            BenchError::config("starting gun poll interval must be greater than zero").into(),
        );
    }
    Ok(())
}
