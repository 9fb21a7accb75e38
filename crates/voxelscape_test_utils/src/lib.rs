//! # VoxelScape Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted dice and world fixtures
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

pub use fixtures::ScriptedDice;

/// Re-export proptest for convenience.
pub use proptest;
