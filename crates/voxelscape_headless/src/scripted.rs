//! Scripted sessions for the `verify` and `benchmark` sub-commands.
//!
//! The verify script is expressed in protocol [`Command`]s and fed through
//! [`HeadlessRunner::handle`], so a passing run also covers the command path
//! a controller would use.

use std::time::{Duration, Instant};

use voxelscape_core::config::SimConfig;
use voxelscape_core::simulation::Simulation;

use crate::protocol::{Command, MAX_ADVANCE_MS};
use crate::runner::HeadlessRunner;

/// Fight two goblins, then walk over and take the patch through a harvest.
pub fn stock_script() -> Vec<Command> {
    vec![
        Command::Attack { enemy_id: 1 },
        Command::Advance { ms: Some(8_000) },
        Command::Attack { enemy_id: 2 },
        Command::Advance { ms: Some(6_000) },
        Command::Interact { patch_id: 1 },
        Command::Advance { ms: Some(2_000) },
        Command::Interact { patch_id: 1 },
        Command::Interact { patch_id: 1 },
        Command::Interact { patch_id: 1 },
        Command::Advance { ms: Some(7_000) },
        Command::Interact { patch_id: 1 },
        Command::Move { x: 0.0, z: 0.0 },
    ]
}

/// Play `script` with seeded dice, then let `extra_ticks` combat ticks pass.
/// Returns the final state hash.
pub fn run_script(
    config: &SimConfig,
    seed: u64,
    script: &[Command],
    extra_ticks: u64,
) -> voxelscape_core::error::Result<u64> {
    let mut runner = HeadlessRunner::with_seed(config.clone(), seed)?;
    for cmd in script {
        runner.handle(cmd.clone());
    }
    let mut tail = config.combat_tick_ms.saturating_mul(extra_ticks);
    while tail > 0 {
        let ms = tail.min(MAX_ADVANCE_MS);
        runner.handle(Command::Advance { ms: Some(ms) });
        tail -= ms;
    }
    Ok(runner.simulation().state_hash())
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Final hash of every run.
    pub hashes: Vec<u64>,
    /// Ticks run after the script.
    pub ticks: u64,
}

impl VerifyReport {
    /// Whether every run agreed.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Index of the first run that disagreed with run 0.
    pub fn first_divergence(&self) -> Option<usize> {
        let first = self.hashes.first()?;
        self.hashes.iter().position(|h| h != first)
    }
}

/// Run the stock script `runs` times with the same seed.
pub fn verify(config: &SimConfig, seed: u64, runs: u32, ticks: u64) -> voxelscape_core::error::Result<VerifyReport> {
    let script = stock_script();
    let hashes = (0..runs)
        .map(|run| {
            let hash = run_script(config, seed, &script, ticks)?;
            tracing::debug!(run, hash = format_args!("{hash:016x}"), "Verify run finished");
            Ok(hash)
        })
        .collect::<voxelscape_core::error::Result<Vec<_>>>()?;
    Ok(VerifyReport { hashes, ticks })
}

/// Timing of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkReport {
    pub ticks: u64,
    pub elapsed: Duration,
    pub kills: u64,
    pub deaths: u64,
    pub final_hash: u64,
}

impl BenchmarkReport {
    /// Throughput.
    pub fn ticks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ticks as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

/// Time `ticks` combat ticks of non-stop fighting, frames included.
///
/// Whenever the player is idle and alive the next live enemy is attacked.
pub fn benchmark(config: &SimConfig, seed: u64, ticks: u64) -> voxelscape_core::error::Result<BenchmarkReport> {
    let tick_ms = config.combat_tick_ms;
    let mut sim = Simulation::with_seed(config.clone(), seed)?;
    let mut kills = 0u64;
    let mut deaths = 0u64;

    let start = Instant::now();
    for _ in 0..ticks {
        let session = sim.session_mut();
        if session.active_target().is_none() && !session.player().is_dying() {
            let target = session.enemies().find(|e| e.is_targetable()).map(|e| e.id);
            if let Some(id) = target {
                session.issue_attack(id);
            }
        }
        session.drain_messages();

        let events = sim.advance(tick_ms);
        kills += events.kills.len() as u64;
        deaths += u64::from(events.player_died);
    }
    let elapsed = start.elapsed();

    Ok(BenchmarkReport {
        ticks,
        elapsed,
        kills,
        deaths,
        final_hash: sim.state_hash(),
    })
}
