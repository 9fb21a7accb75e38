//! Headless VoxelScape session runner.
//!
//! This binary drives the simulation without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted play, CI testing and benchmarking.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin, clock moves on `advance`
//! cargo run -p voxelscape_headless
//!
//! # Follow wall time with a custom config
//! cargo run -p voxelscape_headless -- run --config session.ron --realtime
//!
//! # Verify determinism
//! cargo run -p voxelscape_headless -- verify --seed 12345 --runs 5 --ticks 1000
//!
//! # Benchmark combat ticks
//! cargo run -p voxelscape_headless -- benchmark --ticks 100000
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use voxelscape_core::config::SimConfig;
use voxelscape_headless::runner::{self, RunOptions};
use voxelscape_headless::scripted;

#[derive(Parser)]
#[command(name = "voxelscape_headless")]
#[command(about = "Headless VoxelScape session runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session on stdin/stdout
    Run {
        /// RON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dice seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Follow wall time instead of waiting for `advance`
        #[arg(long)]
        realtime: bool,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// RON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Combat ticks to run after the script
        #[arg(short, long, default_value = "1000")]
        ticks: u64,
    },

    /// Run N combat ticks for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,

        /// Dice seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            config,
            seed,
            realtime,
        }) => {
            cmd_run(config, seed, realtime);
        }
        Some(Commands::Verify {
            config,
            seed,
            runs,
            ticks,
        }) => {
            cmd_verify(config, seed, runs, ticks);
        }
        Some(Commands::Benchmark { ticks, seed }) => {
            cmd_benchmark(ticks, seed);
        }
        None => {
            // Default: interactive mode
            cmd_run(None, 0, false);
        }
    }
}

fn load_config(path: Option<PathBuf>) -> SimConfig {
    let Some(path) = path else {
        return SimConfig::default();
    };
    match SimConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    }
}

/// Run an interactive session
fn cmd_run(config: Option<PathBuf>, seed: u64, realtime: bool) {
    tracing::info!(seed, realtime, "Starting interactive session");

    let options = match RunOptions::load(config.as_deref(), seed, realtime) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runner::run(options) {
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(config: Option<PathBuf>, seed: u64, runs: u32, ticks: u64) {
    tracing::info!("Verifying determinism with seed {} ({} runs, {} ticks)", seed, runs, ticks);

    let config = load_config(config);
    let report = match scripted::verify(&config, seed, runs, ticks) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Failed to run verification: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!("PASS: All {runs} runs produced identical results");
        if let Some(hash) = report.hashes.first() {
            eprintln!("  State hash: {hash:016x}");
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        if let Some(run) = report.first_divergence() {
            eprintln!("  First divergent run: {run}");
        }
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  Run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
}

/// Run N ticks for benchmarking
fn cmd_benchmark(ticks: u64, seed: u64) {
    tracing::info!("Running {} tick benchmark", ticks);
    eprintln!("Running {ticks} ticks...");

    let report = match scripted::benchmark(&SimConfig::default(), seed, ticks) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Failed to start benchmark: {e}");
            std::process::exit(1);
        }
    };

    let secs = report.elapsed.as_secs_f64();
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {}", report.ticks);
    eprintln!("Duration: {secs:.3}s");
    eprintln!("Ticks/second: {:.1}", report.ticks_per_second());
    if report.ticks > 0 {
        eprintln!("ms/tick: {:.4}", secs * 1_000.0 / report.ticks as f64);
    }
    eprintln!("Kills: {}", report.kills);
    eprintln!("Deaths: {}", report.deaths);
    eprintln!("State hash: {:016x}", report.final_hash);
}
