//! Deterministic (worker id, file index) to path mapping

use std::path::{Path, PathBuf};

/// Name of the leaf directory holding `file_index` for `worker_id`
///
/// `files_per_dir` must be non-zero (enforced by config validation).
#[inline]
pub fn leaf_dir_name(worker_id: usize, file_index: u64, files_per_dir: u64) -> String {
    let subdir = file_index / files_per_dir;
    format!("thrd{:03}-d{:04}", worker_id, subdir)
}

/// Full path of one file
///
/// `base_dir/thrd<worker:03>-d<subdir:04>/<prefix>.<index:07>` with
/// `subdir = file_index / files_per_dir`.
///
/// # Example
///
/// ```
/// use fsperf::target::path_for;
/// use std::path::Path;
///
/// let p = path_for(2, 1500, 1000, Path::new("/mnt/gv0"), "f");
/// assert_eq!(p, Path::new("/mnt/gv0/thrd002-d0001/f.0001500"));
/// ```
pub fn path_for(
    worker_id: usize,
    file_index: u64,
    files_per_dir: u64,
    base_dir: &Path,
    prefix: &str,
) -> PathBuf {
    base_dir
        .join(leaf_dir_name(worker_id, file_index, files_per_dir))
        .join(format!("{}.{:07}", prefix, file_index))
}
