//! Storage backend abstraction
//!
//! This module defines the capability set the workload engine consumes from a
//! storage provider: create/open/read/write/fsync/close on file handles plus
//! unlink/mkdir/stat on paths. Providers are interchangeable; the worker never
//! knows which one it is talking to.
//!
//! # Error Classification
//!
//! Every call returns `std::io::Result`. The worker tolerates exactly two
//! kinds in specific situations, `io::ErrorKind::NotFound` and
//! `io::ErrorKind::AlreadyExists`; anything else is fatal to the run.
//!
//! # Providers
//!
//! - **Posix**: generic filesystem through libc system calls
//! - **Memory**: in-process file store that also records every call
//!
//! # Example
//!
//! ```
//! use fsperf::engine::{StorageBackend, OpenFlags, memory::MemoryBackend};
//! use std::path::Path;
//!
//! let backend = MemoryBackend::new();
//! backend.mkdir(Path::new("/data"), 0o755).unwrap();
//! let h = backend.create(Path::new("/data/f.0"), OpenFlags::create_exclusive(), 0o666).unwrap();
//! assert_eq!(backend.write(h, &[0u8; 4096]).unwrap(), 4096);
//! backend.close(h).unwrap();
//! assert_eq!(backend.stat(Path::new("/data/f.0")).unwrap().size, 4096);
//! ```

use crate::config::BackendType;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Storage provider used by every worker
///
/// One backend instance is shared by all workers of a run, so methods take
/// `&self` and implementations must be `Send + Sync`. Handles are only ever
/// used by the worker that opened them.
pub trait StorageBackend: Send + Sync {
    /// Create (or open-or-create, depending on `flags`) a file
    fn create(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<FileHandle>;

    /// Open an existing file
    fn open(&self, path: &Path, flags: OpenFlags) -> io::Result<FileHandle>;

    /// Read at the handle's current position
    fn read(&self, handle: FileHandle, buf: &mut [u8]) -> io::Result<usize>;

    /// Read at an explicit offset without moving the position
    fn pread(&self, handle: FileHandle, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write at the handle's current position
    fn write(&self, handle: FileHandle, buf: &[u8]) -> io::Result<usize>;

    /// Write at an explicit offset without moving the position
    fn pwrite(&self, handle: FileHandle, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Force file data to stable storage
    fn fsync(&self, handle: FileHandle) -> io::Result<()>;

    fn close(&self, handle: FileHandle) -> io::Result<()>;

    fn unlink(&self, path: &Path) -> io::Result<()>;

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Move the position to end of file, returning the new position
    fn seek_end(&self, handle: FileHandle) -> io::Result<u64>;

    /// End of the backend lifecycle; called once after all workers finish
    fn shutdown(&self) -> io::Result<()> {
        Ok(())
    }

    /// Short provider name for reports
    fn name(&self) -> &'static str;
}

/// Opaque handle to an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub(crate) i64);

impl FileHandle {
    pub fn raw(&self) -> i64 {
        self.0
    }
}

/// Result of `stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
}

/// Access mode of an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
}

/// Open flags understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub access: AccessMode,
    /// Create the file if missing
    pub create: bool,
    /// Fail with AlreadyExists if the file exists (requires `create`)
    pub exclusive: bool,
    /// Writes always go to end of file
    pub append: bool,
    /// Bypass the page cache (O_DIRECT)
    pub direct: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            access: AccessMode::ReadOnly,
            create: false,
            exclusive: false,
            append: false,
            direct: false,
        }
    }

    pub fn write_only() -> Self {
        Self {
            access: AccessMode::WriteOnly,
            ..Self::read_only()
        }
    }

    /// O_CREAT|O_EXCL|O_WRONLY
    pub fn create_exclusive() -> Self {
        Self {
            create: true,
            exclusive: true,
            ..Self::write_only()
        }
    }

    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn is_write(&self) -> bool {
        self.access != AccessMode::ReadOnly
    }

    pub fn is_read(&self) -> bool {
        self.access != AccessMode::WriteOnly
    }
}

/// Create the backend selected by configuration
pub fn create_backend(backend: BackendType) -> Arc<dyn StorageBackend> {
    match backend {
        BackendType::Posix => Arc::new(posix::PosixBackend::new()),
        BackendType::Memory => Arc::new(memory::MemoryBackend::new()),
    }
}

pub mod memory;
pub mod posix;
