//! In-memory storage backend
//!
//! This module provides a `StorageBackend` that keeps every file in process
//! memory. It behaves like a small POSIX filesystem (exclusive create, missing
//! parent directories, EOF on short files) and records each call it receives,
//! failed ones included, which makes it the backend of choice for tests and
//! smoke runs.
//!
//! # Features
//!
//! - Thread-safe: one instance is shared by all workers
//! - Records every call (kind, path, flags, offset, length) for verification
//! - Optional transfer cap to simulate short reads/writes
//! - Optional failure injection for a single operation kind
//!
//! Directories are tracked by path. Ancestors of a created directory are
//! implicit, so `mkdir("/a/b")` makes both `/a` and `/a/b` exist.

use super::{FileHandle, FileStat, OpenFlags, StorageBackend};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Kind of call received by the memory backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Open,
    Read,
    Write,
    Fsync,
    Close,
    Unlink,
    Mkdir,
    Stat,
    SeekEnd,
    Shutdown,
}

/// Record of one call, kept for test verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub path: PathBuf,
    /// Flags passed to create and open
    pub flags: Option<OpenFlags>,
    /// File offset the transfer started at (successful reads and writes only)
    pub offset: Option<u64>,
    /// Bytes actually transferred (reads and writes only)
    pub length: usize,
}

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    position: u64,
    flags: OpenFlags,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    handles: HashMap<i64, OpenFile>,
    next_handle: i64,
    operations: Vec<OperationRecord>,
    transfer_limit: Option<usize>,
    fail_on: Option<OperationKind>,
    shut_down: bool,
}

impl MemoryState {
    fn dir_exists(&self, path: &Path) -> bool {
        if path.as_os_str().is_empty() || path == Path::new("/") {
            return true;
        }
        self.dirs.iter().any(|d| d.starts_with(path))
    }

    fn record(&mut self, kind: OperationKind, path: &Path, offset: Option<u64>, length: usize) {
        self.operations.push(OperationRecord {
            kind,
            path: path.to_path_buf(),
            flags: None,
            offset,
            length,
        });
    }

    /// Path behind a handle, or an empty path for unknown handles
    fn path_of(&self, handle: FileHandle) -> PathBuf {
        self.handles
            .get(&handle.0)
            .map(|open| open.path.clone())
            .unwrap_or_default()
    }

    fn injected_failure(&self, kind: OperationKind) -> io::Result<()> {
        if self.fail_on == Some(kind) {
            Err(io::Error::from_raw_os_error(libc::EIO))
        } else {
            Ok(())
        }
    }

    fn capped(&self, requested: usize) -> usize {
        match self.transfer_limit {
            Some(limit) => requested.min(limit),
            None => requested,
        }
    }

    fn open_file(
        &mut self,
        path: &Path,
        flags: OpenFlags,
        kind: OperationKind,
    ) -> io::Result<FileHandle> {
        self.operations.push(OperationRecord {
            kind,
            path: path.to_path_buf(),
            flags: Some(flags),
            offset: None,
            length: 0,
        });
        self.injected_failure(kind)?;
        if self.dirs.contains(path) {
            return Err(io::Error::from_raw_os_error(libc::EISDIR));
        }

        let exists = self.files.contains_key(path);
        if exists && flags.create && flags.exclusive {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }
        if !exists {
            if !flags.create {
                return Err(io::Error::from_raw_os_error(libc::ENOENT));
            }
            let parent = path.parent().unwrap_or_else(|| Path::new(""));
            if !self.dir_exists(parent) {
                return Err(io::Error::from_raw_os_error(libc::ENOENT));
            }
            self.files.insert(path.to_path_buf(), Vec::new());
        }

        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(
            id,
            OpenFile {
                path: path.to_path_buf(),
                position: 0,
                flags,
            },
        );
        Ok(FileHandle(id))
    }

    fn do_read(
        &mut self,
        handle: FileHandle,
        buf: &mut [u8],
        at: Option<u64>,
    ) -> io::Result<usize> {
        let result = self.read_at(handle, buf, at);
        if result.is_err() {
            let path = self.path_of(handle);
            self.record(OperationKind::Read, &path, None, 0);
        }
        result
    }

    fn do_write(&mut self, handle: FileHandle, buf: &[u8], at: Option<u64>) -> io::Result<usize> {
        let result = self.write_at(handle, buf, at);
        if result.is_err() {
            let path = self.path_of(handle);
            self.record(OperationKind::Write, &path, None, 0);
        }
        result
    }

    fn read_at(
        &mut self,
        handle: FileHandle,
        buf: &mut [u8],
        at: Option<u64>,
    ) -> io::Result<usize> {
        self.injected_failure(OperationKind::Read)?;
        let (path, offset) = {
            let open = self
                .handles
                .get(&handle.0)
                .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))?;
            if !open.flags.is_read() {
                return Err(io::Error::from_raw_os_error(libc::EBADF));
            }
            (open.path.clone(), at.unwrap_or(open.position))
        };

        let want = self.capped(buf.len());
        let data = self
            .files
            .get(&path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        let start = (offset as usize).min(data.len());
        let n = want.min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);

        if at.is_none() {
            if let Some(open) = self.handles.get_mut(&handle.0) {
                open.position = offset + n as u64;
            }
        }
        self.record(OperationKind::Read, &path, Some(offset), n);
        Ok(n)
    }

    fn write_at(&mut self, handle: FileHandle, buf: &[u8], at: Option<u64>) -> io::Result<usize> {
        self.injected_failure(OperationKind::Write)?;
        let (path, append, position) = {
            let open = self
                .handles
                .get(&handle.0)
                .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))?;
            if !open.flags.is_write() {
                return Err(io::Error::from_raw_os_error(libc::EBADF));
            }
            (open.path.clone(), open.flags.append, open.position)
        };

        let n = self.capped(buf.len());
        let data = self
            .files
            .get_mut(&path)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        let offset = match at {
            Some(off) => off,
            None if append => data.len() as u64,
            None => position,
        };
        let start = offset as usize;
        if data.len() < start + n {
            data.resize(start + n, 0);
        }
        data[start..start + n].copy_from_slice(&buf[..n]);

        if at.is_none() {
            if let Some(open) = self.handles.get_mut(&handle.0) {
                open.position = offset + n as u64;
            }
        }
        self.record(OperationKind::Write, &path, Some(offset), n);
        Ok(n)
    }

    fn handle_path(&self, handle: FileHandle) -> io::Result<PathBuf> {
        self.handles
            .get(&handle.0)
            .map(|open| open.path.clone())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))
    }
}

/// Storage backend that keeps files in memory
///
/// Cloning is cheap and every clone shares the same file store, so a test can
/// hand one clone to the run and inspect another afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Create an empty store; only the root directory exists
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the store from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Place a file of `size` zero bytes, creating its directory
    pub fn insert_file(&self, path: impl Into<PathBuf>, size: usize) {
        let path = path.into();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            state.dirs.insert(parent.to_path_buf());
        }
        state.files.insert(path, vec![0u8; size]);
    }

    /// Current size of a file, if it exists
    pub fn file_size(&self, path: &Path) -> Option<u64> {
        self.state().files.get(path).map(|data| data.len() as u64)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.state().files.len()
    }

    /// Number of handles not yet closed
    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    /// Cap every read and write at `limit` bytes (None restores full transfers)
    pub fn set_transfer_limit(&self, limit: Option<usize>) {
        self.state().transfer_limit = limit;
    }

    /// Fail every call of `kind` with EIO (None disables injection)
    pub fn fail_on(&self, kind: Option<OperationKind>) {
        self.state().fail_on = kind;
    }

    /// Copy of every call received so far
    pub fn operations(&self) -> Vec<OperationRecord> {
        self.state().operations.clone()
    }

    /// Number of calls of one kind received so far
    pub fn count(&self, kind: OperationKind) -> usize {
        self.state().operations.iter().filter(|op| op.kind == kind).count()
    }

    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.state().shut_down
    }
}

impl StorageBackend for MemoryBackend {
    fn create(&self, path: &Path, flags: OpenFlags, _mode: u32) -> io::Result<FileHandle> {
        let flags = OpenFlags {
            create: true,
            ..flags
        };
        self.state().open_file(path, flags, OperationKind::Create)
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> io::Result<FileHandle> {
        self.state().open_file(path, flags, OperationKind::Open)
    }

    fn read(&self, handle: FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.state().do_read(handle, buf, None)
    }

    fn pread(&self, handle: FileHandle, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.state().do_read(handle, buf, Some(offset))
    }

    fn write(&self, handle: FileHandle, buf: &[u8]) -> io::Result<usize> {
        self.state().do_write(handle, buf, None)
    }

    fn pwrite(&self, handle: FileHandle, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.state().do_write(handle, buf, Some(offset))
    }

    fn fsync(&self, handle: FileHandle) -> io::Result<()> {
        let mut state = self.state();
        let path = state.path_of(handle);
        state.record(OperationKind::Fsync, &path, None, 0);
        state.injected_failure(OperationKind::Fsync)?;
        state.handle_path(handle)?;
        Ok(())
    }

    fn close(&self, handle: FileHandle) -> io::Result<()> {
        let mut state = self.state();
        let path = state.path_of(handle);
        state.record(OperationKind::Close, &path, None, 0);
        state.injected_failure(OperationKind::Close)?;
        state
            .handles
            .remove(&handle.0)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))?;
        Ok(())
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state();
        state.record(OperationKind::Unlink, path, None, 0);
        state.injected_failure(OperationKind::Unlink)?;
        if state.files.remove(path).is_none() {
            if state.dirs.contains(path) {
                return Err(io::Error::from_raw_os_error(libc::EISDIR));
            }
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        Ok(())
    }

    fn mkdir(&self, path: &Path, _mode: u32) -> io::Result<()> {
        let mut state = self.state();
        state.record(OperationKind::Mkdir, path, None, 0);
        state.injected_failure(OperationKind::Mkdir)?;
        if state.files.contains_key(path) || state.dir_exists(path) {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let mut state = self.state();
        state.record(OperationKind::Stat, path, None, 0);
        state.injected_failure(OperationKind::Stat)?;
        match state.files.get(path) {
            Some(data) => Ok(FileStat {
                size: data.len() as u64,
                is_dir: false,
            }),
            None if state.dir_exists(path) => Ok(FileStat { size: 0, is_dir: true }),
            None => Err(io::Error::from_raw_os_error(libc::ENOENT)),
        }
    }

    fn seek_end(&self, handle: FileHandle) -> io::Result<u64> {
        let mut state = self.state();
        let path = state.path_of(handle);
        state.record(OperationKind::SeekEnd, &path, None, 0);
        state.handle_path(handle)?;
        let end = state.files.get(&path).map(|d| d.len() as u64).unwrap_or(0);
        if let Some(open) = state.handles.get_mut(&handle.0) {
            open.position = end;
        }
        Ok(end)
    }

    fn shutdown(&self) -> io::Result<()> {
        let mut state = self.state();
        state.shut_down = true;
        state.record(OperationKind::Shutdown, Path::new(""), None, 0);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_write_read() {
        let backend = MemoryBackend::new();
        let path = Path::new("/f.0000000");

        let h = backend.create(path, OpenFlags::create_exclusive(), 0o666).unwrap();
        assert_eq!(backend.write(h, &[7u8; 4096]).unwrap(), 4096);
        assert_eq!(backend.write(h, &[8u8; 4096]).unwrap(), 4096);
        backend.close(h).unwrap();
        assert_eq!(backend.file_size(path), Some(8192));

        let h = backend.open(path, OpenFlags::read_only()).unwrap();
        let mut buf = [0u8; 4096];
        assert_eq!(backend.pread(h, &mut buf, 4096).unwrap(), 4096);
        assert!(buf.iter().all(|&b| b == 8));
        assert_eq!(backend.read(h, &mut buf).unwrap(), 4096);
        assert!(buf.iter().all(|&b| b == 7));
        backend.close(h).unwrap();
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn test_posix_like_errors() {
        let backend = MemoryBackend::new();

        let err = backend.open(Path::new("/missing"), OpenFlags::read_only()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err = backend
            .create(Path::new("/no/such/dir/f"), OpenFlags::create_exclusive(), 0o666)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        backend.mkdir(Path::new("/no/such/dir"), 0o755).unwrap();
        let h = backend
            .create(Path::new("/no/such/dir/f"), OpenFlags::create_exclusive(), 0o666)
            .unwrap();
        backend.close(h).unwrap();

        let err = backend
            .create(Path::new("/no/such/dir/f"), OpenFlags::create_exclusive(), 0o666)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        // Ancestors are implicit
        let err = backend.mkdir(Path::new("/no/such"), 0o755).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(backend.stat(Path::new("/no")).unwrap().is_dir);

        let err = backend.unlink(Path::new("/no/such/dir/g")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_at_eof_is_short() {
        let backend = MemoryBackend::new();
        backend.insert_file("/data/f", 100);

        let h = backend.open(Path::new("/data/f"), OpenFlags::read_only()).unwrap();
        let mut buf = [0u8; 4096];
        assert_eq!(backend.read(h, &mut buf).unwrap(), 100);
        assert_eq!(backend.read(h, &mut buf).unwrap(), 0);
        assert_eq!(backend.pread(h, &mut buf, 5000).unwrap(), 0);
        backend.close(h).unwrap();
    }

    #[test]
    fn test_append_writes_at_end() {
        let backend = MemoryBackend::new();
        backend.insert_file("/data/f", 1000);

        let flags = OpenFlags {
            append: true,
            ..OpenFlags::write_only()
        };
        let h = backend.create(Path::new("/data/f"), flags, 0o666).unwrap();
        backend.pwrite(h, &[1u8; 10], 0).unwrap();
        backend.write(h, &[1u8; 24]).unwrap();
        backend.close(h).unwrap();
        assert_eq!(backend.file_size(Path::new("/data/f")), Some(1024));
    }

    #[test]
    fn test_transfer_limit_and_failure_injection() {
        let backend = MemoryBackend::new();
        backend.set_transfer_limit(Some(100));
        let h = backend
            .create(Path::new("/f"), OpenFlags::create_exclusive(), 0o666)
            .unwrap();
        assert_eq!(backend.write(h, &[0u8; 4096]).unwrap(), 100);

        backend.fail_on(Some(OperationKind::Fsync));
        let err = backend.fsync(h).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
        backend.fail_on(None);
        backend.fsync(h).unwrap();
        backend.close(h).unwrap();
    }

    #[test]
    fn test_operation_log() {
        let backend = MemoryBackend::new();
        let h = backend
            .create(Path::new("/f"), OpenFlags::create_exclusive(), 0o666)
            .unwrap();
        backend.pwrite(h, &[0u8; 512], 8192).unwrap();
        backend.close(h).unwrap();
        backend.unlink(Path::new("/f")).unwrap();

        let ops = backend.operations();
        let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::Create,
                OperationKind::Write,
                OperationKind::Close,
                OperationKind::Unlink
            ]
        );
        assert_eq!(ops[1].offset, Some(8192));
        assert_eq!(ops[1].length, 512);
        assert_eq!(backend.count(OperationKind::Write), 1);

        backend.clear_operations();
        assert!(backend.operations().is_empty());
    }

    #[test]
    fn test_failed_calls_are_logged() {
        let backend = MemoryBackend::new();
        let missing = Path::new("/data/missing");

        assert!(backend.stat(missing).is_err());
        assert!(backend.stat(missing).is_err());
        assert!(backend.open(missing, OpenFlags::read_only()).is_err());
        assert!(backend.unlink(missing).is_err());
        assert!(backend
            .create(missing, OpenFlags::create_exclusive(), 0o666)
            .is_err());
        backend.fail_on(Some(OperationKind::Mkdir));
        assert!(backend.mkdir(Path::new("/data"), 0o755).is_err());

        assert_eq!(backend.count(OperationKind::Stat), 2);
        assert_eq!(backend.count(OperationKind::Open), 1);
        assert_eq!(backend.count(OperationKind::Unlink), 1);
        assert_eq!(backend.count(OperationKind::Create), 1);
        assert_eq!(backend.count(OperationKind::Mkdir), 1);
        assert!(backend
            .operations()
            .iter()
            .all(|op| op.path == missing || op.kind == OperationKind::Mkdir));
    }

    #[test]
    fn test_open_flags_are_logged() {
        let backend = MemoryBackend::new();
        backend.insert_file("/data/f", 10);

        let flags = OpenFlags::read_only().with_direct(true);
        let h = backend.open(Path::new("/data/f"), flags).unwrap();
        backend.close(h).unwrap();

        let ops = backend.operations();
        assert_eq!(ops[0].kind, OperationKind::Open);
        assert_eq!(ops[0].flags, Some(flags));
        assert_eq!(ops[1].flags, None);
    }

    #[test]
    fn test_clones_share_store() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        other.insert_file("/x/y", 10);
        assert!(backend.contains(Path::new("/x/y")));
        assert_eq!(backend.file_count(), 1);

        backend.shutdown().unwrap();
        assert!(other.is_shut_down());
    }
}
