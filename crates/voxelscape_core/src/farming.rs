//! Farming patch state machine.
//!
//! ```text
//! WEEDS --rake--> EMPTY --plant--> SEEDS --water--> GROWING_1
//!   ^                                                   | growth_stage_secs
//!   |                                                   v
//!   +-----------------harvest------- READY <------- GROWING_2
//! ```
//!
//! Growth is an elapsed-time counter fed by the simulation clock, never a
//! wall-clock deadline, so pausing the driver pauses the crops.

use serde::{Deserialize, Serialize};

use crate::config::PatchSite;
use crate::math::Vec2Fixed;

/// Unique, stable identifier for farming patches.
pub type PatchId = u32;

const MS_PER_SECOND: u64 = 1_000;

/// Growth stage of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FarmingStage {
    /// Overgrown; rake to clear.
    #[serde(rename = "WEEDS")]
    Weeds,
    /// Cleared soil; plant seeds.
    #[serde(rename = "EMPTY")]
    Empty,
    /// Seeds in the ground; water to start growth.
    #[serde(rename = "SEEDS")]
    Seeds,
    /// First growing stage.
    #[serde(rename = "GROWING_1")]
    Growing1,
    /// Second growing stage.
    #[serde(rename = "GROWING_2")]
    Growing2,
    /// Ready to harvest.
    #[serde(rename = "READY")]
    Ready,
}

impl FarmingStage {
    /// Upper-case label shown to the player and used as examine context.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            FarmingStage::Weeds => "WEEDS",
            FarmingStage::Empty => "EMPTY",
            FarmingStage::Seeds => "SEEDS",
            FarmingStage::Growing1 => "GROWING_1",
            FarmingStage::Growing2 => "GROWING_2",
            FarmingStage::Ready => "READY",
        }
    }

    /// Whether the stage only advances with time.
    #[must_use]
    pub const fn is_growing(self) -> bool {
        matches!(self, FarmingStage::Growing1 | FarmingStage::Growing2)
    }
}

/// What a player interaction did to a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchInteraction {
    /// WEEDS -> EMPTY.
    Raked,
    /// EMPTY -> SEEDS.
    Planted,
    /// SEEDS -> GROWING_1.
    Watered,
    /// READY -> WEEDS.
    Harvested,
    /// Growing; nothing changed.
    StillGrowing,
}

impl PatchInteraction {
    /// Message text for the interaction.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            PatchInteraction::Raked => "You rake the patch.",
            PatchInteraction::Planted => "You plant the seeds.",
            PatchInteraction::Watered => "You water the seeds.",
            PatchInteraction::Harvested => "You harvest the herbs. Smells like success!",
            PatchInteraction::StillGrowing => "The crops are still growing.",
        }
    }

    /// Whether the interaction changed the stage.
    #[must_use]
    pub const fn changed_stage(self) -> bool {
        !matches!(self, PatchInteraction::StillGrowing)
    }
}

/// One farming plot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FarmingPatch {
    /// Stable identity.
    pub id: PatchId,
    /// Display name.
    pub name: String,
    /// Centre of the plot.
    pub position: Vec2Fixed,
    stage: FarmingStage,
    growth_timer: u32,
    growth_remainder_ms: u64,
}

impl FarmingPatch {
    /// A patch overgrown with weeds.
    #[must_use]
    pub fn new(id: PatchId, name: impl Into<String>, position: Vec2Fixed) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            stage: FarmingStage::Weeds,
            growth_timer: 0,
            growth_remainder_ms: 0,
        }
    }

    /// Build a patch from its config entry.
    #[must_use]
    pub fn from_site(site: &PatchSite) -> Self {
        Self::new(site.id, site.name.clone(), site.position)
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> FarmingStage {
        self.stage
    }

    /// Whole seconds of growth since watering.
    #[must_use]
    pub const fn growth_timer(&self) -> u32 {
        self.growth_timer
    }

    /// Apply the stage's player interaction.
    ///
    /// Proximity is the caller's concern; XP is awarded by the caller from
    /// the returned value.
    pub fn interact(&mut self) -> PatchInteraction {
        let outcome = match self.stage {
            FarmingStage::Weeds => {
                self.stage = FarmingStage::Empty;
                PatchInteraction::Raked
            }
            FarmingStage::Empty => {
                self.stage = FarmingStage::Seeds;
                PatchInteraction::Planted
            }
            FarmingStage::Seeds => {
                self.stage = FarmingStage::Growing1;
                self.growth_timer = 0;
                self.growth_remainder_ms = 0;
                PatchInteraction::Watered
            }
            FarmingStage::Ready => {
                self.stage = FarmingStage::Weeds;
                PatchInteraction::Harvested
            }
            FarmingStage::Growing1 | FarmingStage::Growing2 => PatchInteraction::StillGrowing,
        };

        if outcome.changed_stage() {
            tracing::info!(patch = self.id, stage = self.stage.label(), "Patch interaction");
        }
        outcome
    }

    /// Advance growth by one elapsed second.
    ///
    /// No-op outside the GROWING stages. Returns whether the stage changed.
    pub fn grow_tick(&mut self, stage_secs: u32) -> bool {
        if !self.stage.is_growing() {
            return false;
        }

        self.growth_timer = self.growth_timer.saturating_add(1);
        let next = if self.growth_timer >= stage_secs.saturating_mul(2) {
            FarmingStage::Ready
        } else if self.growth_timer >= stage_secs {
            FarmingStage::Growing2
        } else {
            self.stage
        };

        if next == self.stage {
            return false;
        }
        self.stage = next;
        tracing::info!(patch = self.id, stage = next.label(), timer = self.growth_timer, "Patch grew");
        true
    }

    /// Feed elapsed simulation time; every whole second runs a
    /// [`grow_tick`](Self::grow_tick). Returns whether the stage changed.
    pub fn advance_growth(&mut self, elapsed_ms: u64, stage_secs: u32) -> bool {
        if !self.stage.is_growing() {
            return false;
        }

        self.growth_remainder_ms = self.growth_remainder_ms.saturating_add(elapsed_ms);
        let mut changed = false;
        while self.growth_remainder_ms >= MS_PER_SECOND && self.stage.is_growing() {
            self.growth_remainder_ms -= MS_PER_SECOND;
            changed |= self.grow_tick(stage_secs);
        }

        if !self.stage.is_growing() {
            self.growth_remainder_ms = 0;
        }
        changed
    }
}
