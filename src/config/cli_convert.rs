//! CLI to Config conversion utilities

use crate::config::cli;
use crate::config::BackendType;
use anyhow::{Context, Result};

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("k") || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches("k"), 1024u64)
    } else if s.ends_with("m") || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches("m"), 1024 * 1024)
    } else if s.ends_with("g") || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches("g"), 1024 * 1024 * 1024)
    } else if s.ends_with("t") || s.ends_with("tb") {
        (s.trim_end_matches("tb").trim_end_matches("t"), 1024 * 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str.parse()
        .with_context(|| format!("Invalid size format: {} (use suffixes K, M, G, or T)", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size too large: {}", s))
}

/// Parse a time string (e.g., "100us", "1ms", "10ms") to microseconds
pub fn parse_time_us(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("us") {
        (s.trim_end_matches("us"), 1u64)
    } else if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1000)
    } else if s.ends_with("s") {
        (s.trim_end_matches("s"), 1_000_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str.parse()
        .with_context(|| format!("Invalid time format: {}", s))?;

    Ok(num * multiplier)
}

/// Convert CLI BackendArg to config BackendType
pub fn convert_backend(cli_backend: cli::BackendArg) -> BackendType {
    match cli_backend {
        cli::BackendArg::Posix => BackendType::Posix,
        cli::BackendArg::Memory => BackendType::Memory,
    }
}
