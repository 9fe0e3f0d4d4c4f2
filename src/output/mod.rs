//! Output formatting
//!
//! - **text**: per-worker and aggregate result blocks on stdout
//! - **json**: optional machine-readable report file

pub mod json;
pub mod text;
