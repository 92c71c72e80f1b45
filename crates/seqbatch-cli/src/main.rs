//! seqbatch - Main entry point

use chrono::Local;
use clap::Parser;
use seqbatch_cli::{commands, report, Cli, RunConfig};
use seqbatch_common::logging::{
    init_logging, per_run_file_name, LogConfig, LogFile, LogLevel, LogOutput,
};
use std::process;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    };

    // Console plus a per-run log file next to the batch files
    let namespace = &config.namespace;
    let base = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Both)
        .log_dir(namespace.dir().to_path_buf())
        .file(LogFile::Named(per_run_file_name(namespace.stem(), Local::now())))
        .build();

    // Environment variables take precedence
    let log_config = base.clone().with_env_overrides().unwrap_or(base);

    // Keep console output when the log file cannot be opened
    let guard = match init_logging(&log_config) {
        Ok(guard) => {
            if let Some(path) = log_config.file_path() {
                info!(log_file = %path.display(), "Logging to file");
            }
            Some(guard)
        },
        Err(e) => {
            let target = log_config
                .file_path()
                .unwrap_or_else(|| log_config.log_dir.clone());
            eprintln!(
                "Warning: could not open log file '{}' ({:#}), logging to the console only",
                target.display(),
                e
            );
            init_logging(&console_only(&log_config)).ok()
        },
    };

    info!(
        fasta = %config.fasta.display(),
        metadata = %config.metadata.display(),
        key = %config.key_column,
        batch_size = config.batch_size,
        "Starting run"
    );

    let result = commands::run::run(&config).await;

    let code = match result {
        Ok(outcome) => {
            report::print(&outcome);
            0
        },
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            1
        },
    };

    drop(guard);
    process::exit(code);
}

fn console_only(config: &LogConfig) -> LogConfig {
    LogConfig {
        output: LogOutput::Console,
        ..config.clone()
    }
}
