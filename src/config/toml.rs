//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_backend, parse_size, parse_time_us};
use crate::error::BenchError;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with a base configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    let wl = &mut config.workload;

    if let Some(workload) = cli.workload {
        wl.workload = workload;
    }
    if let Some(ref s) = cli.block_size {
        wl.block_size = parse_size(s).context("Invalid record size")?;
    }
    if let Some(ref s) = cli.file_size {
        wl.file_size = parse_size(s).context("Invalid file size")?;
    }
    if let Some(files) = cli.files {
        wl.file_count = files;
    }
    if let Some(ref dir) = cli.base_dir {
        wl.base_dir = dir.clone();
    }
    if let Some(ref prefix) = cli.prefix {
        wl.prefix = prefix.clone();
    }
    if let Some(n) = cli.files_per_dir {
        wl.files_per_dir = n;
    }
    if let Some(n) = cli.io_requests {
        wl.io_requests = n;
    }
    if let Some(pct) = cli.read_percent {
        wl.read_percent = Some(pct);
    }
    if let Some(ref s) = cli.delay {
        wl.delay_us = Some(parse_time_us(s).context("Invalid delay")?);
    }
    if let Some(seed) = cli.seed {
        wl.seed = Some(seed);
    }

    // Flags can only switch features on
    wl.direct |= cli.direct;
    wl.append |= cli.append;
    wl.overwrite |= cli.overwrite;
    wl.fsync_at_close |= cli.fsync_at_close;

    if let Some(threads) = cli.threads {
        config.workers.threads = threads;
    }

    if let Some(ref trigger) = cli.starting_gun {
        let gun = config
            .starting_gun
            .get_or_insert_with(|| StartingGunConfig::new(trigger.clone()));
        gun.trigger = trigger.clone();
    }
    if let Some(timeout) = cli.starting_gun_timeout {
        match config.starting_gun {
            Some(ref mut gun) => gun.timeout_secs = timeout,
            None => {
                return Err(
                    BenchError::config("--starting-gun-timeout requires --starting-gun").into(),
                )
            }
        }
    }

    if let Some(backend) = cli.backend {
        config.backend = convert_backend(backend);
    }

    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.no_per_worker {
        config.output.per_worker = false;
    }
    config.runtime.dry_run |= cli.dry_run;
    config.runtime.debug |= cli.debug;

    Ok(config)
}
