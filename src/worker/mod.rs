//! Worker thread implementation
//!
//! The Worker is the execution unit of a run. Each worker thread owns one
//! `Worker`, walks its file indices in order and, for each file, steps through
//!
//! ```text
//! select action -> open/create -> transfer loop -> fsync? -> close -> delay?
//! ```
//!
//! accumulating a `WorkerResult`. Any storage failure outside the tolerated
//! cases aborts the worker and, through the driver, the whole run.
//!
//! # Architecture
//!
//! The Worker ties together:
//! - **StorageBackend**: every file operation
//! - **PathNamer**: file paths and leaf directories
//! - **OffsetPermutation**: shared transfer order for random workloads
//! - **StartBarrier**: optional rendezvous before the measured interval
//! - **AlignedBuffer**: the single transfer buffer
//!
//! # Example
//!
//! ```
//! use fsperf::config::Config;
//! use fsperf::engine::memory::MemoryBackend;
//! use fsperf::util::time::MonotonicClock;
//! use fsperf::worker::Worker;
//! use std::sync::Arc;
//!
//! let mut config = Config::default();
//! config.workload.base_dir = "/bench".into();
//! config.workload.file_count = 4;
//!
//! let backend = MemoryBackend::new();
//! let worker = Worker::new(
//!     0,
//!     Arc::new(config),
//!     Arc::new(backend.clone()),
//!     Arc::new(MonotonicClock::new()),
//!     None,
//! )?;
//! let result = worker.run()?;
//!
//! assert_eq!(result.files_written, 4);
//! assert_eq!(backend.file_count(), 4);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::workload::WorkloadType;
use crate::config::Config;
use crate::coordinator::starting_gun::wait_for_starting_gun;
use crate::distribution::OffsetPermutation;
use crate::engine::{FileHandle, OpenFlags, StorageBackend};
use crate::error::BenchError;
use crate::stats::WorkerResult;
use crate::target::path_for;
use crate::util::buffer::AlignedBuffer;
use crate::util::time::Clock;
use crate::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Permission bits for created files
const FILE_MODE: u32 = 0o666;
/// Permission bits for created leaf directories
const DIR_MODE: u32 = 0o755;

/// What happens to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Read,
    Write,
    Delete,
}

/// One worker's state
///
/// Workers share nothing mutable: configuration, backend, clock and the
/// permutation are read-only; buffer, RNG and result are owned.
pub struct Worker {
    id: usize,
    config: Arc<Config>,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    permutation: Option<Arc<OffsetPermutation>>,
    buffer: AlignedBuffer,
    /// Mixed-workload coin flips
    rng: Xoshiro256PlusPlus,
    io_requests: u64,
    result: WorkerResult,
}

impl Worker {
    /// Create a worker
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Configuration` if a random workload has no
    /// permutation, or one too short for the configured request count, or if
    /// the transfer buffer cannot be allocated.
    pub fn new(
        id: usize,
        config: Arc<Config>,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        permutation: Option<Arc<OffsetPermutation>>,
    ) -> Result<Self> {
        let wl = &config.workload;
        let io_requests = wl.effective_io_requests();

        if wl.workload.is_random() {
            match permutation {
                None => {
                    return Err(BenchError::config(format!(
                        "{} workload needs an offset permutation",
                        wl.workload
                    ))
                    .into());
                }
                Some(ref perm) if (perm.len() as u64) < io_requests => {
                    return Err(BenchError::config(format!(
                        "offset permutation holds {} records, {} requests per file configured",
                        perm.len(),
                        io_requests
                    ))
                    .into());
                }
                Some(_) => {}
            }
        }

        let mut buffer = AlignedBuffer::for_records(wl.block_size as usize)?;
        buffer.fill_pattern();

        let rng = match wl.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(id as u64)),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        Ok(Self {
            id,
            config,
            backend,
            clock,
            permutation,
            buffer,
            rng,
            io_requests,
            result: WorkerResult::new(id),
        })
    }

    /// Run the whole workload and hand back the result
    pub fn run(mut self) -> Result<WorkerResult> {
        if let Some(ref gun) = self.config.starting_gun {
            wait_for_starting_gun(self.backend.as_ref(), gun, self.id)?;
        }

        self.result.start_ns = self.clock.now_ns();
        debug!(worker_id = self.id, files = self.config.workload.file_count, "worker started");

        for file_index in 0..self.config.workload.file_count {
            self.process_file(file_index)?;
        }

        self.result.end_ns = self.clock.now_ns();
        debug!(
            worker_id = self.id,
            files_done = self.result.files_done(),
            io_count = self.result.io_count,
            "worker finished"
        );
        Ok(self.result)
    }

    /// Decide what to do with the next file
    fn select_action(&mut self) -> FileAction {
        match self.config.workload.workload {
            WorkloadType::Delete => FileAction::Delete,
            WorkloadType::SequentialWrite | WorkloadType::RandomWrite => FileAction::Write,
            WorkloadType::SequentialRead | WorkloadType::RandomRead => FileAction::Read,
            WorkloadType::SequentialMixedReadWrite => {
                let roll: u8 = self.rng.gen_range(0..100);
                if roll >= self.config.workload.effective_read_percent() {
                    FileAction::Write
                } else {
                    FileAction::Read
                }
            }
        }
    }

    fn process_file(&mut self, file_index: u64) -> Result<()> {
        let wl = &self.config.workload;
        let path = path_for(self.id, file_index, wl.files_per_dir, &wl.base_dir, &wl.prefix);
        let action = self.select_action();
        trace!(worker_id = self.id, file_index, ?action, path = %path.display());

        if action == FileAction::Delete {
            match self.backend.unlink(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "file already gone");
                }
                Err(e) => return Err(BenchError::storage("unlink", &path, e).into()),
            }
            self.result.files_deleted += 1;
            self.delay();
            return Ok(());
        }

        let (handle, start_offset) = self.open_file(action, &path)?;
        self.transfer(handle, action, &path, start_offset)?;

        if action == FileAction::Write && self.config.workload.fsync_at_close {
            self.backend
                .fsync(handle)
                .map_err(|e| BenchError::storage("fsync", &path, e))?;
        }
        self.backend
            .close(handle)
            .map_err(|e| BenchError::storage("close", &path, e))?;

        match action {
            FileAction::Write => self.result.files_written += 1,
            FileAction::Read => self.result.files_read += 1,
            FileAction::Delete => {}
        }
        self.delay();
        Ok(())
    }

    /// Open or create the file for `action`; returns the handle and the
    /// logical offset the first transfer lands at
    fn open_file(&self, action: FileAction, path: &Path) -> Result<(FileHandle, u64)> {
        let wl = &self.config.workload;
        let direct = wl.direct;

        if action == FileAction::Read {
            let handle = self
                .backend
                .open(path, OpenFlags::read_only().with_direct(direct))
                .map_err(|e| BenchError::storage("open", path, e))?;
            return Ok((handle, 0));
        }

        match wl.workload {
            WorkloadType::RandomWrite => {
                let handle = self
                    .backend
                    .open(path, OpenFlags::write_only().with_direct(direct))
                    .map_err(|e| BenchError::storage("open", path, e))?;
                Ok((handle, 0))
            }
            WorkloadType::SequentialMixedReadWrite => {
                let flags = OpenFlags::create_exclusive().with_direct(direct);
                match self.create_in_dir(path, flags) {
                    Ok(handle) => Ok((handle, 0)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        self.backend
                            .unlink(path)
                            .map_err(|e| BenchError::storage("unlink", path, e))?;
                        let handle = self
                            .create_in_dir(path, flags)
                            .map_err(|e| BenchError::storage("create", path, e))?;
                        Ok((handle, 0))
                    }
                    Err(e) => Err(BenchError::storage("create", path, e).into()),
                }
            }
            _ if wl.append => {
                let flags = OpenFlags {
                    create: true,
                    append: true,
                    ..OpenFlags::write_only()
                }
                .with_direct(direct);
                let handle = self
                    .create_in_dir(path, flags)
                    .map_err(|e| BenchError::storage("create", path, e))?;
                let end = self
                    .backend
                    .seek_end(handle)
                    .map_err(|e| BenchError::storage("lseek", path, e))?;
                Ok((handle, end))
            }
            _ if wl.overwrite => {
                let flags = OpenFlags {
                    create: true,
                    ..OpenFlags::write_only()
                }
                .with_direct(direct);
                let handle = self
                    .create_in_dir(path, flags)
                    .map_err(|e| BenchError::storage("create", path, e))?;
                Ok((handle, 0))
            }
            _ => {
                let flags = OpenFlags::create_exclusive().with_direct(direct);
                let handle = self
                    .create_in_dir(path, flags)
                    .map_err(|e| BenchError::storage("create", path, e))?;
                Ok((handle, 0))
            }
        }
    }

    /// Create a file, creating its leaf directory once if it is missing
    fn create_in_dir(&self, path: &Path, flags: OpenFlags) -> io::Result<FileHandle> {
        match self.backend.create(path, flags, FILE_MODE) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(dir) = path.parent() {
                    debug!(worker_id = self.id, dir = %dir.display(), "creating directory");
                    match self.backend.mkdir(dir, DIR_MODE) {
                        Ok(()) => {}
                        // Another worker or process got there first
                        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                        Err(e) => return Err(e),
                    }
                }
                self.backend.create(path, flags, FILE_MODE)
            }
            other => other,
        }
    }

    fn transfer(
        &mut self,
        handle: FileHandle,
        action: FileAction,
        path: &Path,
        start_offset: u64,
    ) -> Result<()> {
        let block_size = self.config.workload.block_size;
        let expected = block_size as usize;
        let is_write = action == FileAction::Write;

        let mut offset = start_offset;
        for i in 0..self.io_requests {
            let (op, moved) = match self.permutation {
                Some(ref perm) => {
                    offset = perm.offset(i as usize, block_size);
                    if is_write {
                        ("pwrite", self.backend.pwrite(handle, self.buffer.as_slice(), offset))
                    } else {
                        ("pread", self.backend.pread(handle, self.buffer.as_mut_slice(), offset))
                    }
                }
                None => {
                    if is_write {
                        ("write", self.backend.write(handle, self.buffer.as_slice()))
                    } else {
                        ("read", self.backend.read(handle, self.buffer.as_mut_slice()))
                    }
                }
            };

            let actual = moved.map_err(|e| BenchError::storage(op, path, e))?;
            if actual != expected {
                return Err(BenchError::ShortTransfer {
                    op,
                    path: path.to_path_buf(),
                    expected,
                    actual,
                }
                .into());
            }
            trace!(worker_id = self.id, op, offset, bytes = actual);

            self.result.record_transfer(actual);
            if self.permutation.is_none() {
                offset += block_size;
            }
        }
        Ok(())
    }

    fn delay(&self) {
        if let Some(us) = self.config.workload.delay_us {
            self.clock.sleep(Duration::from_micros(us));
        }
    }
}
