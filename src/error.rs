//! Error taxonomy
//!
//! Every variant is fatal to the run. Errors travel through the crate as
//! `anyhow::Error` and can be recovered with `downcast_ref::<BenchError>()`
//! when a caller needs to distinguish them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal benchmark errors
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid or contradictory inputs, detected before any worker starts
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The starting gun trigger never appeared
    #[error("timed out after {waited_secs} sec waiting for starting gun file {}", trigger.display())]
    BarrierTimeout { trigger: PathBuf, waited_secs: u64 },

    /// A storage backend call failed outside the tolerated cases
    #[error("{op} {}: errno ({}) {source}", path.display(), source.raw_os_error().unwrap_or(0))]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Fewer bytes moved than requested
    #[error("{op} {}: short transfer, expected {expected} bytes, got {actual}", path.display())]
    ShortTransfer {
        op: &'static str,
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

impl BenchError {
    /// Build a configuration error from anything printable
    pub fn config(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }

    /// Wrap a backend failure with the operation and path it concerned
    pub fn storage(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        BenchError::Storage {
            op,
            path: path.into(),
            source,
        }
    }

    /// True if `err` carries a `BenchError::Configuration` anywhere in its chain
    pub fn is_configuration(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<BenchError>(), Some(BenchError::Configuration(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_names_operation_and_errno() {
        let err = BenchError::storage(
            "open",
            "/mnt/test/f.0000001",
            io::Error::from_raw_os_error(libc::EACCES),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("open /mnt/test/f.0000001"));
        assert!(msg.contains(&format!("errno ({})", libc::EACCES)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = BenchError::config("bad").into();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn test_is_configuration_sees_through_context() {
        let err = anyhow::Error::from(BenchError::config("bad")).context("loading config");
        assert!(BenchError::is_configuration(&err));

        let enoent = io::Error::from_raw_os_error(libc::ENOENT);
        let err: anyhow::Error = BenchError::storage("stat", "/x", enoent).into();
        assert!(!BenchError::is_configuration(&err));
    }
}
