//! Headless session runner for scripted play and CI verification.
//!
//! This crate drives a [`voxelscape_core::simulation::Simulation`] without
//! any rendering, controlled via JSON commands on stdin with responses on
//! stdout. This enables:
//!
//! - **Scripted play**: A controller can walk, fight and farm without graphics
//! - **CI verification**: Seeded runs must reproduce identical state hashes
//! - **Benchmarking**: Combat tick throughput on a busy session
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (advance, move, attack, etc.)
//! - **stdout**: Responses and state (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Step the clock by hand
//! echo '{"cmd":"advance","ms":600}' | cargo run -p voxelscape_headless -- run
//!
//! # Follow wall time
//! cargo run -p voxelscape_headless -- run --realtime
//!
//! # Verify determinism
//! cargo run -p voxelscape_headless -- verify --seed 7 --runs 5
//! ```

pub mod examine_client;
pub mod protocol;
pub mod runner;
pub mod scripted;

pub use examine_client::ExamineClient;
pub use protocol::{Command, Response};
pub use runner::{Flow, HeadlessRunner, Reply, RunOptions};
