//! # VoxelScape Core
//!
//! Deterministic simulation engine for the VoxelScape skilling sandbox.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO (beyond loading a config file on request)
//! - No unseeded randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! The rendering, HUD and flavor-text layers consume the state exposed here
//! (positions, hit points, stage enums) and feed player commands back in.
//!
//! ## Crate Structure
//!
//! - [`progression`] - Experience to level and max-hit arithmetic
//! - [`farming`] - Farming patch state machine
//! - [`lifecycle`] - Player and enemy death/respawn sequencing
//! - [`combat`] - Fixed-cadence combat scheduler
//! - [`movement`] - Click-to-move and attack-intent targeting
//! - [`session`] - The owned simulation aggregate and command API
//! - [`simulation`] - Clock-driven driver running frames and ticks in order
//! - [`components`] - Player and enemy records
//! - [`messages`] - Tagged text events and the bounded message log
//! - [`examine`] - Flavor-text requests and fallbacks
//! - [`config`] - Tunables loaded from RON
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod config;
pub mod error;
pub mod examine;
pub mod farming;
pub mod lifecycle;
pub mod math;
pub mod messages;
pub mod movement;
pub mod progression;
pub mod session;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{Dice, SeededDice};
    pub use crate::components::{Enemy, EnemyId, EnemyPhase, Player, PlayerState, PlayerStats};
    pub use crate::config::SimConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::examine::{ExamineError, ExamineRequest};
    pub use crate::farming::{FarmingPatch, FarmingStage, PatchId};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::messages::{GameMessage, MessageKind, MessageLog};
    pub use crate::progression::{level_for_xp, max_hit_for_level, Skill, SkillLevels};
    pub use crate::session::{CommandOutcome, RejectReason, Session};
    pub use crate::simulation::{Simulation, TickEvents};
}
