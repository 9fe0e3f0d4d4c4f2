//! fsperf CLI entry point

use anyhow::Result;
use fsperf::config::cli::Cli;
use fsperf::config::toml::{merge_cli_with_config, parse_toml_file};
use fsperf::config::validator::validate_config;
use fsperf::config::Config;
use fsperf::engine::create_backend;
use fsperf::error::BenchError;
use fsperf::output::{json, text};
use fsperf::util::time::MonotonicClock;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("fsperf: {:#}", e);
        if BenchError::is_configuration(&e) {
            eprintln!("{}", Cli::usage());
        }
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    let mut config = merge_cli_with_config(&cli, base)?;
    validate_config(&mut config)?;

    println!("fsperf v{}", env!("CARGO_PKG_VERSION"));
    print!("{}", config);

    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let backend = create_backend(config.backend);
    let json_output = config.output.json_output.clone();
    let report = fsperf::run_validated(Arc::new(config), backend, Arc::new(MonotonicClock::new()))?;

    text::print_report(&report);

    if let Some(path) = json_output {
        let json_report = json::build_report(&report, chrono::Utc::now());
        json::write_json_output(&path, &json_report)?;
        info!("JSON report written to {}", path.display());
    }
    Ok(())
}
