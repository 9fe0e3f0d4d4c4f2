//! POSIX storage backend
//!
//! Talks to any mounted filesystem through blocking libc system calls. File
//! handles are raw file descriptors.
//!
//! # Features
//!
//! - Positioned IO with pread/pwrite, stream IO with read/write
//! - O_DIRECT, O_APPEND and O_EXCL passed straight through to open(2)
//! - One system call per transfer; a short count is returned as is
//! - EINTR is retried transparently

use super::{AccessMode, FileHandle, FileStat, OpenFlags, StorageBackend};
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Storage backend over the local (or mounted network) filesystem
#[derive(Debug, Default)]
pub struct PosixBackend;

impl PosixBackend {
    pub fn new() -> Self {
        Self
    }

    /// Translate `OpenFlags` into open(2) flags
    fn open_flags(flags: OpenFlags) -> libc::c_int {
        let mut raw = match flags.access {
            AccessMode::ReadOnly => libc::O_RDONLY,
            AccessMode::WriteOnly => libc::O_WRONLY,
        };
        if flags.create {
            raw |= libc::O_CREAT;
        }
        if flags.exclusive {
            raw |= libc::O_EXCL;
        }
        if flags.append {
            raw |= libc::O_APPEND;
        }
        if flags.direct {
            raw |= libc::O_DIRECT;
        }
        raw | libc::O_CLOEXEC
    }

    fn do_open(&self, path: &Path, raw_flags: libc::c_int, mode: u32) -> io::Result<FileHandle> {
        let c_path = path_to_cstring(path)?;
        loop {
            // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
            let fd = unsafe { libc::open(c_path.as_ptr(), raw_flags, mode as libc::c_uint) };
            if fd >= 0 {
                return Ok(FileHandle(fd as i64));
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// Issue one transfer, repeating it only when interrupted by a signal
    ///
    /// The byte count of the first completed call is returned unchanged, so
    /// the caller sees every short read or write.
    #[inline(always)]
    fn transfer_once<F>(mut call: F) -> io::Result<usize>
    where
        F: FnMut() -> isize,
    {
        loop {
            let result = call();
            if result >= 0 {
                return Ok(result as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

fn path_to_cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))
}

fn fd(handle: FileHandle) -> libc::c_int {
    handle.0 as libc::c_int
}

fn check(result: libc::c_int) -> io::Result<()> {
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

impl StorageBackend for PosixBackend {
    fn create(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<FileHandle> {
        let flags = OpenFlags {
            create: true,
            ..flags
        };
        self.do_open(path, Self::open_flags(flags), mode)
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> io::Result<FileHandle> {
        self.do_open(path, Self::open_flags(flags), 0)
    }

    fn read(&self, handle: FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        Self::transfer_once(|| {
            // SAFETY: pointer and length describe buf, which outlives the call
            unsafe { libc::read(fd(handle), buf.as_mut_ptr() as *mut libc::c_void, buf.len()) }
        })
    }

    fn pread(&self, handle: FileHandle, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Self::transfer_once(|| {
            // SAFETY: pointer and length describe buf, which outlives the call
            unsafe {
                libc::pread(
                    fd(handle),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    offset as libc::off_t,
                )
            }
        })
    }

    fn write(&self, handle: FileHandle, buf: &[u8]) -> io::Result<usize> {
        Self::transfer_once(|| {
            // SAFETY: pointer and length describe buf, which outlives the call
            unsafe { libc::write(fd(handle), buf.as_ptr() as *const libc::c_void, buf.len()) }
        })
    }

    fn pwrite(&self, handle: FileHandle, buf: &[u8], offset: u64) -> io::Result<usize> {
        Self::transfer_once(|| {
            // SAFETY: pointer and length describe buf, which outlives the call
            unsafe {
                libc::pwrite(
                    fd(handle),
                    buf.as_ptr() as *const libc::c_void,
                    buf.len(),
                    offset as libc::off_t,
                )
            }
        })
    }

    fn fsync(&self, handle: FileHandle) -> io::Result<()> {
        // SAFETY: fsync only requires a file descriptor
        check(unsafe { libc::fsync(fd(handle)) })
    }

    fn close(&self, handle: FileHandle) -> io::Result<()> {
        // SAFETY: the handle is owned by the caller and not used after close
        check(unsafe { libc::close(fd(handle)) })
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        let c_path = path_to_cstring(path)?;
        // SAFETY: c_path is a valid NUL-terminated string
        check(unsafe { libc::unlink(c_path.as_ptr()) })
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        let c_path = path_to_cstring(path)?;
        // SAFETY: c_path is a valid NUL-terminated string
        check(unsafe { libc::mkdir(c_path.as_ptr(), mode as libc::mode_t) })
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let c_path = path_to_cstring(path)?;
        // SAFETY: stat fills the zeroed struct on success; it is only read afterwards
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        check(unsafe { libc::stat(c_path.as_ptr(), &mut st) })?;
        Ok(FileStat {
            size: st.st_size as u64,
            is_dir: (st.st_mode & libc::S_IFMT) == libc::S_IFDIR,
        })
    }

    fn seek_end(&self, handle: FileHandle) -> io::Result<u64> {
        // SAFETY: lseek only requires a file descriptor
        let pos = unsafe { libc::lseek(fd(handle), 0, libc::SEEK_END) };
        if pos < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(pos as u64)
    }

    fn name(&self) -> &'static str {
        "posix"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.0000000");
        let backend = PosixBackend::new();

        let h = backend.create(&path, OpenFlags::create_exclusive(), 0o666).unwrap();
        assert_eq!(backend.write(h, &[0xABu8; 8192]).unwrap(), 8192);
        backend.fsync(h).unwrap();
        backend.close(h).unwrap();

        assert_eq!(backend.stat(&path).unwrap().size, 8192);

        let h = backend.open(&path, OpenFlags::read_only()).unwrap();
        let mut buf = vec![0u8; 4096];
        assert_eq!(backend.pread(h, &mut buf, 4096).unwrap(), 4096);
        assert!(buf.iter().all(|&b| b == 0xAB));
        assert_eq!(backend.read(h, &mut buf).unwrap(), 4096);
        backend.close(h).unwrap();
    }

    #[test]
    fn test_read_past_eof_is_short() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short");
        let backend = PosixBackend::new();

        let h = backend.create(&path, OpenFlags::create_exclusive(), 0o666).unwrap();
        backend.write(h, &[1u8; 100]).unwrap();
        backend.close(h).unwrap();

        let h = backend.open(&path, OpenFlags::read_only()).unwrap();
        let mut buf = vec![0u8; 4096];
        assert_eq!(backend.read(h, &mut buf).unwrap(), 100);
        backend.close(h).unwrap();
    }

    #[test]
    fn test_exclusive_create_reports_already_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup");
        let backend = PosixBackend::new();

        let h = backend.create(&path, OpenFlags::create_exclusive(), 0o666).unwrap();
        backend.close(h).unwrap();
        let err = backend.create(&path, OpenFlags::create_exclusive(), 0o666).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_missing_parent_and_missing_file_report_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = PosixBackend::new();

        let nested = dir.path().join("thrd000-d0000").join("f.0000000");
        let err = backend.create(&nested, OpenFlags::create_exclusive(), 0o666).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        backend.mkdir(nested.parent().unwrap(), 0o755).unwrap();
        assert!(backend.stat(nested.parent().unwrap()).unwrap().is_dir);
        let err = backend.mkdir(nested.parent().unwrap(), 0o755).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        let err = backend.unlink(&nested).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_short_read_is_returned_unchanged() {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: fds has room for the two descriptors pipe(2) fills in
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let (rd, wr) = (FileHandle(fds[0] as i64), FileHandle(fds[1] as i64));
        let backend = PosixBackend::new();

        assert_eq!(backend.write(wr, &[5u8; 100]).unwrap(), 100);
        let writer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            let backend = PosixBackend::new();
            backend.write(wr, &[6u8; 3996]).unwrap();
            backend.close(wr).unwrap();
        });

        let mut buf = vec![0u8; 4096];
        assert_eq!(backend.read(rd, &mut buf).unwrap(), 100);
        assert!(buf[..100].iter().all(|&b| b == 5));

        writer.join().unwrap();
        assert_eq!(backend.read(rd, &mut buf).unwrap(), 3996);
        backend.close(rd).unwrap();
    }

    #[test]
    fn test_append_and_seek_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grow");
        let backend = PosixBackend::new();

        let h = backend.create(&path, OpenFlags::create_exclusive(), 0o666).unwrap();
        backend.write(h, &[0u8; 1000]).unwrap();
        backend.close(h).unwrap();

        let flags = OpenFlags {
            append: true,
            ..OpenFlags::write_only()
        };
        let h = backend.create(&path, flags, 0o666).unwrap();
        assert_eq!(backend.seek_end(h).unwrap(), 1000);
        backend.write(h, &[0u8; 24]).unwrap();
        backend.close(h).unwrap();
        assert_eq!(backend.stat(&path).unwrap().size, 1024);
    }
}
