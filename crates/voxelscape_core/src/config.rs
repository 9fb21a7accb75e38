//! Simulation tunables.
//!
//! Every field has a default reproducing the shipped game, and every field
//! is `#[serde(default)]`, so a RON file only needs to name what it changes:
//!
//! ```ron
//! SimConfig(
//!     combat_tick_ms: 400,
//!     melee_range: 2.0,
//! )
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::EnemyId;
use crate::error::{GameError, Result};
use crate::farming::PatchId;
use crate::math::{fixed_decimal, vec2_decimal, Fixed, Vec2Fixed};

/// Longest accepted frame or combat tick cadence.
pub const MAX_CADENCE_MS: u64 = 60_000;

/// Experience awarded by each action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpTable {
    /// Farming XP for raking weeds.
    #[serde(with = "fixed_decimal")]
    pub rake: Fixed,
    /// Farming XP for harvesting a ready patch.
    #[serde(with = "fixed_decimal")]
    pub harvest: Fixed,
    /// Melee XP per point of damage dealt.
    #[serde(with = "fixed_decimal")]
    pub melee_per_damage: Fixed,
    /// Hitpoints XP per point of damage dealt.
    #[serde(with = "fixed_decimal")]
    pub hitpoints_per_damage: Fixed,
    /// Melee XP bonus for a kill.
    #[serde(with = "fixed_decimal")]
    pub kill_bonus: Fixed,
}

impl Default for XpTable {
    fn default() -> Self {
        Self {
            rake: Fixed::from_num(5),
            harvest: Fixed::from_num(50),
            melee_per_damage: Fixed::from_num(4),
            hitpoints_per_damage: Fixed::from_num(1.33),
            kill_bonus: Fixed::from_num(20),
        }
    }
}

/// One entry of the fixed enemy roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// Stable identity.
    pub id: EnemyId,
    /// Display name.
    pub name: String,
    /// Display level.
    pub level: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Where the enemy stands.
    #[serde(with = "vec2_decimal")]
    pub position: Vec2Fixed,
}

impl EnemySpawn {
    fn goblin(id: EnemyId, x: i32, z: i32) -> Self {
        Self {
            id,
            name: "Goblin".to_string(),
            level: 2,
            max_hp: 5,
            position: Vec2Fixed::from_ints(x, z),
        }
    }
}

/// One farming plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSite {
    /// Stable identity.
    pub id: PatchId,
    /// Display name, also used when examining.
    pub name: String,
    /// Centre of the plot.
    #[serde(with = "vec2_decimal")]
    pub position: Vec2Fixed,
}

/// All simulation tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Combat tick cadence.
    pub combat_tick_ms: u64,
    /// Frame step used by the fixed-step driver.
    pub frame_ms: u64,
    /// Delay between an enemy's death and its return.
    pub enemy_respawn_delay_ms: u64,
    /// How long the player stays inert after dying.
    pub player_death_delay_ms: u64,
    /// Melee engagement range (exclusive).
    #[serde(with = "fixed_decimal")]
    pub melee_range: Fixed,
    /// Farther than this from a patch and interaction walks there instead.
    #[serde(with = "fixed_decimal")]
    pub patch_interaction_radius: Fixed,
    /// Offset along +z from a patch centre used as the walk-to point.
    #[serde(with = "fixed_decimal")]
    pub patch_approach_offset: Fixed,
    /// How far from an enemy an attack command parks the player.
    #[serde(with = "fixed_decimal")]
    pub attack_approach_distance: Fixed,
    /// Player walking speed in units per second.
    #[serde(with = "fixed_decimal")]
    pub player_speed: Fixed,
    /// Arrival tolerance for movement.
    #[serde(with = "fixed_decimal")]
    pub arrival_epsilon: Fixed,
    /// Seconds spent in each growing stage.
    pub growth_stage_secs: u32,
    /// Probability of an enemy counter-hit landing.
    #[serde(with = "fixed_decimal")]
    pub counter_hit_chance: Fixed,
    /// Damage of a landed counter-hit.
    pub counter_hit_damage: u32,
    /// Respawn point.
    #[serde(with = "vec2_decimal")]
    pub home: Vec2Fixed,
    /// Messages retained by a [`crate::messages::MessageLog`].
    pub message_history: usize,
    /// Experience table.
    pub xp: XpTable,
    /// Hitpoints XP a fresh player starts with.
    #[serde(with = "fixed_decimal")]
    pub starting_hitpoints_xp: Fixed,
    /// Enemy roster.
    pub enemies: Vec<EnemySpawn>,
    /// Farming plots.
    pub patches: Vec<PatchSite>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            combat_tick_ms: 600,
            frame_ms: 16,
            enemy_respawn_delay_ms: 10_000,
            player_death_delay_ms: 4_000,
            melee_range: Fixed::from_num(1.8),
            patch_interaction_radius: Fixed::from_num(3),
            patch_approach_offset: Fixed::from_num(1.2),
            attack_approach_distance: Fixed::from_num(1.2),
            player_speed: Fixed::from_num(7.2),
            arrival_epsilon: Fixed::from_num(0.1),
            growth_stage_secs: 3,
            counter_hit_chance: Fixed::from_num(0.5),
            counter_hit_damage: 1,
            home: Vec2Fixed::ZERO,
            message_history: 16,
            xp: XpTable::default(),
            starting_hitpoints_xp: Fixed::from_num(240),
            enemies: vec![
                EnemySpawn::goblin(1, 5, -5),
                EnemySpawn::goblin(2, 8, -3),
                EnemySpawn::goblin(3, 2, -7),
            ],
            patches: vec![PatchSite {
                id: 1,
                name: "Herb Patch".to_string(),
                position: Vec2Fixed::from_ints(5, 5),
            }],
        }
    }
}

impl SimConfig {
    /// Parse and validate a config from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] for malformed RON and
    /// [`GameError::InvalidConfig`] for unusable values.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: SimConfig = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigRead`] if the file cannot be read, plus
    /// everything [`from_ron_str`](Self::from_ron_str) can return.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| GameError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_ron_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded simulation config");
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GameError::InvalidConfig(msg.to_string()));

        if self.combat_tick_ms == 0 {
            return invalid("combat_tick_ms must be positive");
        }
        if self.frame_ms == 0 {
            return invalid("frame_ms must be positive");
        }
        if self.combat_tick_ms > MAX_CADENCE_MS || self.frame_ms > MAX_CADENCE_MS {
            return invalid("combat_tick_ms and frame_ms must be at most 60000");
        }
        if self.growth_stage_secs == 0 {
            return invalid("growth_stage_secs must be positive");
        }
        if self.melee_range <= Fixed::ZERO {
            return invalid("melee_range must be positive");
        }
        if self.patch_interaction_radius <= Fixed::ZERO {
            return invalid("patch_interaction_radius must be positive");
        }
        if self.player_speed <= Fixed::ZERO {
            return invalid("player_speed must be positive");
        }
        if self.arrival_epsilon < Fixed::ZERO {
            return invalid("arrival_epsilon must not be negative");
        }
        if self.counter_hit_chance < Fixed::ZERO || self.counter_hit_chance > Fixed::from_num(1) {
            return invalid("counter_hit_chance must be within [0, 1]");
        }
        if self.message_history == 0 {
            return invalid("message_history must be positive");
        }

        let mut enemy_ids = HashSet::new();
        for enemy in &self.enemies {
            if !enemy_ids.insert(enemy.id) {
                return Err(GameError::InvalidConfig(format!(
                    "duplicate enemy id {}",
                    enemy.id
                )));
            }
            if enemy.max_hp == 0 {
                return Err(GameError::InvalidConfig(format!(
                    "enemy {} has no hit points",
                    enemy.id
                )));
            }
        }

        let mut patch_ids = HashSet::new();
        for patch in &self.patches {
            if !patch_ids.insert(patch.id) {
                return Err(GameError::InvalidConfig(format!(
                    "duplicate patch id {}",
                    patch.id
                )));
            }
        }

        Ok(())
    }
}
