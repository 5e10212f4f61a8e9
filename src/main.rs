//! parfind - find files by glob, walking subdirectories on a worker pool
//!
//! Entry point for the CLI application.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use parfind::{ConsolePrinter, LogLevel, Results};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Find files whose name matches a glob pattern
#[derive(Parser, Debug)]
#[command(
    name = "parfind",
    version,
    about = "Find files whose name matches a glob pattern",
    after_help = "EXAMPLES:\n    \
        parfind -p '*.rs' -r src\n    \
        parfind -p 'IMG_*.jpg' -r -t 8 ~/Pictures\n    \
        parfind -p '*.log' -l verbose /var/log"
)]
struct CliArgs {
    /// Directory to start from
    #[arg(value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Glob pattern matched against file names
    #[arg(short = 'p', long, value_name = "PATTERN")]
    pattern: String,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Log level: trace, verbose, normal, error or off
    #[arg(short = 'l', long = "log-level", default_value = "normal", value_name = "LEVEL", value_parser = parse_level)]
    log_level: LogLevel,

    /// Extra worker threads, at most 255 (0 walks everything on the main thread)
    #[arg(short = 't', long, default_value_t = 0, value_name = "NUM")]
    threads: usize,

    /// Also fail when a directory below the root could not be read
    #[arg(long)]
    strict: bool,
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    s.parse().map_err(|e: parfind::FindError| e.to_string())
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = CliArgs::parse();

    setup_logging(args.log_level);

    let results = parfind::find()
        .root(&args.path)
        .pattern(&args.pattern)
        .recursive(args.recursive)
        .threads(args.threads)
        .log_level(args.log_level)
        .with_predicate(ConsolePrinter)
        .collect_errors(true)
        .run()
        .context("Traversal failed")?;

    debug!(
        files = results.stats.files,
        dirs = results.stats.dirs,
        workers = results.pool.spawned,
        elapsed_ms = results.stats.duration.as_millis() as u64,
        "traversal finished"
    );

    if !results.errors.is_empty() {
        info!(errors = results.errors.len(), "traversal completed with errors");
    }

    Ok(if exit_ok(&results, args.strict) { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// A failed root always fails the run. `--strict` also fails it on any error
/// collected below the root.
fn exit_ok(results: &Results, strict: bool) -> bool {
    if strict {
        results.is_clean()
    } else {
        results.is_success()
    }
}

fn setup_logging(level: LogLevel) {
    // RUST_LOG wins over -l when set.
    let filter = EnvFilter::builder()
        .with_default_directive(level.as_filter().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
