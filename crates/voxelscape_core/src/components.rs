//! Entity records: the player and the enemy roster.
//!
//! Records are plain data plus the invariant-keeping mutators. Lifecycle
//! transitions live in [`crate::lifecycle`]; this module only guarantees
//! that hit points stay within `0..=max` and that XP never goes down.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::progression::{level_for_xp, Skill, SkillLevels};

/// Unique, stable identifier for enemies.
pub type EnemyId = u32;

/// Simulation timestamp in milliseconds on the monotonic sim clock.
pub type Timestamp = u64;

// ============================================================================
// Player
// ============================================================================

/// Experience pools and hit points.
///
/// Maximum hit points are not stored: they are the hitpoints level, derived
/// from `hitpoints_xp` on every read, so no stale value can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(with = "fixed_serde")]
    agility_xp: Fixed,
    #[serde(with = "fixed_serde")]
    farming_xp: Fixed,
    #[serde(with = "fixed_serde")]
    melee_xp: Fixed,
    #[serde(with = "fixed_serde")]
    hitpoints_xp: Fixed,
    current_hp: u32,
}

impl PlayerStats {
    /// Fresh stats at full health.
    #[must_use]
    pub fn new(starting_hitpoints_xp: Fixed) -> Self {
        let hitpoints_xp = starting_hitpoints_xp.max(Fixed::ZERO);
        Self {
            agility_xp: Fixed::ZERO,
            farming_xp: Fixed::ZERO,
            melee_xp: Fixed::ZERO,
            hitpoints_xp,
            current_hp: level_for_xp(hitpoints_xp),
        }
    }

    /// Experience in a skill.
    #[must_use]
    pub const fn xp(&self, skill: Skill) -> Fixed {
        match skill {
            Skill::Agility => self.agility_xp,
            Skill::Farming => self.farming_xp,
            Skill::Melee => self.melee_xp,
            Skill::Hitpoints => self.hitpoints_xp,
        }
    }

    /// Level in a skill.
    #[must_use]
    pub fn level(&self, skill: Skill) -> u32 {
        level_for_xp(self.xp(skill))
    }

    /// Levels of every skill.
    #[must_use]
    pub fn levels(&self) -> SkillLevels {
        SkillLevels {
            agility: self.level(Skill::Agility),
            farming: self.level(Skill::Farming),
            melee: self.level(Skill::Melee),
            hitpoints: self.level(Skill::Hitpoints),
        }
    }

    /// Maximum hit points: the hitpoints level.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        level_for_xp(self.hitpoints_xp)
    }

    /// Current hit points.
    #[must_use]
    pub const fn current_hp(&self) -> u32 {
        self.current_hp
    }

    /// Add experience to a skill.
    ///
    /// Non-positive amounts are ignored; XP is never spent.
    pub fn award_xp(&mut self, skill: Skill, amount: Fixed) {
        if amount <= Fixed::ZERO {
            if amount < Fixed::ZERO {
                tracing::warn!(?skill, amount = %amount, "Ignoring negative XP award");
            }
            return;
        }

        let pool = match skill {
            Skill::Agility => &mut self.agility_xp,
            Skill::Farming => &mut self.farming_xp,
            Skill::Melee => &mut self.melee_xp,
            Skill::Hitpoints => &mut self.hitpoints_xp,
        };
        *pool = pool.saturating_add(amount);
    }

    /// Apply damage, clamping at zero. Returns the damage actually taken.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current_hp);
        self.current_hp -= actual;
        actual
    }

    /// Restore to full health.
    pub fn restore_full(&mut self) {
        self.current_hp = self.max_hp();
    }

    /// Whether hit points are exhausted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current_hp == 0
    }

    /// Test/debug hook to place the player at an exact hit point value.
    ///
    /// Clamped to `0..=max_hp`.
    pub fn set_current_hp(&mut self, hp: u32) {
        self.current_hp = hp.min(self.max_hp());
    }
}

/// Player lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Normal play.
    Alive,
    /// Inert until the respawn deadline.
    Dying {
        /// When the player returns home.
        respawn_at: Timestamp,
    },
}

/// The player character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Experience and hit points.
    pub stats: PlayerStats,
    /// Lifecycle state.
    pub state: PlayerState,
    /// Current ground position.
    pub position: Vec2Fixed,
    /// Commanded destination, if walking.
    pub destination: Option<Vec2Fixed>,
    /// Point the character is facing toward, if any.
    pub facing: Option<Vec2Fixed>,
}

impl Player {
    /// A fresh player standing at `home`.
    #[must_use]
    pub fn new(starting_hitpoints_xp: Fixed, home: Vec2Fixed) -> Self {
        Self {
            stats: PlayerStats::new(starting_hitpoints_xp),
            state: PlayerState::Alive,
            position: home,
            destination: None,
            facing: None,
        }
    }

    /// Whether the player is in the death sequence.
    #[must_use]
    pub const fn is_dying(&self) -> bool {
        matches!(self.state, PlayerState::Dying { .. })
    }
}

// ============================================================================
// Enemies
// ============================================================================

/// Enemy lifecycle phase, derived from the record's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyPhase {
    /// Targetable.
    Alive,
    /// Hit points reached zero this tick; respawn not yet scheduled.
    Dying,
    /// Dead, waiting for the respawn deadline.
    Respawning {
        /// When the enemy returns.
        at: Timestamp,
    },
}

/// A roster enemy. Death is a state; enemies are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enemy {
    /// Stable identity.
    pub id: EnemyId,
    /// Display name.
    pub name: String,
    /// Display level.
    pub level: u32,
    /// Current hit points.
    pub current_hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Position, owned by the idle/animation layer.
    pub position: Vec2Fixed,
    /// Whether the enemy is dead.
    pub is_dead: bool,
    /// Respawn deadline while dead.
    pub respawn_at: Option<Timestamp>,
}

impl Enemy {
    /// A live enemy at full health.
    #[must_use]
    pub fn new(id: EnemyId, name: impl Into<String>, level: u32, max_hp: u32, position: Vec2Fixed) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            current_hp: max_hp,
            max_hp,
            position,
            is_dead: false,
            respawn_at: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> EnemyPhase {
        match (self.is_dead, self.respawn_at) {
            (false, _) => EnemyPhase::Alive,
            (true, None) => EnemyPhase::Dying,
            (true, Some(at)) => EnemyPhase::Respawning { at },
        }
    }

    /// Whether the enemy can be attacked.
    #[must_use]
    pub const fn is_targetable(&self) -> bool {
        !self.is_dead && self.current_hp > 0
    }

    /// Apply damage, clamping at zero. Returns the damage actually taken.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current_hp);
        self.current_hp -= actual;
        actual
    }
}
