//! AO process host binary
//!
//! Usage:
//!   ao-process < messages.jsonl
//!   ao-process --config config/process.toml
//!   ao-process --script scripts/process.lua --inspect < messages.jsonl

use anyhow::{Context, Result};
use ao_actors::Process;
use ao_config::{ProcessConfig, ScriptSettings};
use ao_process_host::{init_logging, run_session};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ao-process")]
#[command(about = "Run an AO process over line-delimited JSON on stdin/stdout")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lua script to run instead of the native key/value handler
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Global function the script must define
    #[arg(long, requires = "script")]
    entry_point: Option<String>,

    /// Evaluate code in the script interpreter after init
    #[arg(long)]
    eval: Option<String>,

    /// Print the process state after input is exhausted
    #[arg(long)]
    inspect: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    init_logging(
        args.log_level.as_deref().unwrap_or(&config.logging.level),
        args.json_logs || config.logging.json,
    )?;

    info!("Starting AO process host");
    let mut process = Process::from_config(&config);
    process.init().map_err(|e| {
        error!("Failed to initialize process: {}", e);
        e
    })?;
    info!(id = %process.id(), handler = ?process.handler_kind(), "Process ready");

    let result = serve(&mut process, &args);
    process.teardown();
    result
}

fn load_config(args: &Args) -> Result<ProcessConfig> {
    let mut config = ProcessConfig::load(args.config.as_deref())?;

    if let Some(path) = &args.script {
        let mut script = ScriptSettings::new(path);
        if let Some(entry_point) = &args.entry_point {
            script.entry_point = entry_point.clone();
        }
        config.script = Some(script);
        config.expand_env_vars()?;
        config.validate().context("Invalid command line overrides")?;
    }

    Ok(config)
}

fn serve(process: &mut Process, args: &Args) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(code) = &args.eval {
        let result = process.eval(code).context("Eval failed")?;
        writeln!(out, "{}", result)?;
    }

    let summary = run_session(process, io::stdin().lock(), &mut out)?;
    info!(
        lines = summary.lines_read,
        responses = summary.responses,
        errors = summary.errors,
        "Input exhausted"
    );

    if args.inspect {
        let state = process.inspect_state()?;
        writeln!(out, "{}", state)?;
    }

    out.flush()?;
    Ok(())
}
