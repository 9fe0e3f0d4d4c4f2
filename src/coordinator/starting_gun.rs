//! Starting gun rendezvous
//!
//! Lets worker threads in many processes, usually on many hosts, start their
//! measured runs at the same moment. Each worker:
//!
//! 1. Creates a readiness marker `<host>.<pid>.<worker>.ready` next to the
//!    trigger file, so whoever fires the gun can count ready workers
//! 2. Polls for the trigger file until it appears or the timeout expires
//! 3. Sleeps a grace period so every sibling also sees the trigger before
//!    anyone starts loading the storage
//!
//! The trigger is just a file; anything that can create a file on the shared
//! storage can fire the gun.

use crate::config::StartingGunConfig;
use crate::engine::{OpenFlags, StorageBackend};
use crate::error::BenchError;
use crate::Result;
use anyhow::Context;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Host name up to the first '.'
pub fn short_hostname() -> Result<String> {
    let host = hostname::get().context("Failed to read host name")?;
    let host = host.to_string_lossy();
    Ok(host.split('.').next().unwrap_or_default().to_string())
}

/// Readiness marker path for one worker of this process
pub fn marker_path(trigger: &Path, worker_id: usize) -> Result<PathBuf> {
    let dir = trigger.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!(
        "{}.{}.{}.ready",
        short_hostname()?,
        std::process::id(),
        worker_id
    )))
}

/// Announce readiness, then block until the trigger file exists
///
/// # Errors
///
/// - `BenchError::Configuration` if the readiness marker already exists
///   (two runs sharing a host, pid and worker id)
/// - `BenchError::Storage` if the marker cannot be created or the trigger
///   cannot be checked
/// - `BenchError::BarrierTimeout` if the trigger does not appear in time
pub fn wait_for_starting_gun(
    backend: &dyn StorageBackend,
    gun: &StartingGunConfig,
    worker_id: usize,
) -> Result<()> {
    let marker = marker_path(&gun.trigger, worker_id)?;
    signal_ready(backend, &marker)?;
    debug!(worker_id, marker = %marker.display(), "readiness marker created");

    info!(
        worker_id,
        "awaiting starting gun file {} (timeout {} sec)",
        gun.trigger.display(),
        gun.timeout_secs
    );
    poll_trigger(backend, gun)?;

    debug!(worker_id, grace_ms = gun.grace_ms, "starting gun fired");
    std::thread::sleep(gun.grace());
    Ok(())
}

fn signal_ready(backend: &dyn StorageBackend, marker: &Path) -> Result<()> {
    let handle = match backend.create(marker, OpenFlags::create_exclusive(), 0o666) {
        Ok(handle) => handle,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(BenchError::config(format!(
                "readiness marker {} already exists (same host, pid and worker id)",
                marker.display()
            ))
            .into());
        }
        Err(e) => return Err(BenchError::storage("create", marker, e).into()),
    };
    backend
        .close(handle)
        .map_err(|e| BenchError::storage("close", marker, e))?;
    Ok(())
}

fn poll_trigger(backend: &dyn StorageBackend, gun: &StartingGunConfig) -> Result<()> {
    let start = Instant::now();
    let deadline = start + gun.timeout();

    loop {
        match backend.stat(&gun.trigger) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BenchError::storage("stat", &gun.trigger, e).into()),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(BenchError::BarrierTimeout {
                trigger: gun.trigger.clone(),
                waited_secs: start.elapsed().as_secs(),
            }
            .into());
        }
        std::thread::sleep(gun.poll_interval().min(deadline - now));
    }
}
