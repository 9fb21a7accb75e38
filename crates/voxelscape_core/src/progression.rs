//! Experience to level arithmetic.
//!
//! Pure, allocation-free functions called on every XP change and every
//! combat tick. The same curve is applied to every skill; the hitpoints
//! level doubles as the player's maximum hit points.

use serde::{Deserialize, Serialize};

use crate::math::{isqrt, Fixed};

/// Trainable skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Tracked for display only; nothing awards it.
    Agility,
    /// Raking and harvesting patches.
    Farming,
    /// Accuracy-free melee: drives max hit.
    Melee,
    /// Drives maximum hit points.
    Hitpoints,
}

impl Skill {
    /// All skills in display order.
    pub const ALL: [Skill; 4] = [
        Skill::Agility,
        Skill::Farming,
        Skill::Melee,
        Skill::Hitpoints,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Skill::Agility => "Agility",
            Skill::Farming => "Farming",
            Skill::Melee => "Melee",
            Skill::Hitpoints => "Hitpoints",
        }
    }
}

/// Level for an experience total.
///
/// `floor(0.25 * floor(sqrt(xp * 5 + 100)) + 1)`, computed exactly:
/// flooring a non-negative value before an integer square root gives the
/// same result as flooring the real square root. Negative input counts as 0.
///
/// # Example
///
/// ```
/// use voxelscape_core::math::Fixed;
/// use voxelscape_core::progression::level_for_xp;
///
/// assert_eq!(level_for_xp(Fixed::ZERO), 3);
/// assert_eq!(level_for_xp(Fixed::from_num(240)), 10);
/// ```
#[must_use]
pub fn level_for_xp(xp: Fixed) -> u32 {
    let xp = xp.max(Fixed::ZERO);
    let scaled = xp
        .saturating_mul(Fixed::from_num(5))
        .saturating_add(Fixed::from_num(100));
    let root = isqrt(scaled.to_num::<u64>());
    // `root` is at most ~46341 for the largest representable XP.
    (root / 4 + 1) as u32
}

/// Inclusive upper bound of a single melee damage roll.
///
/// `floor(1 + level / 2)`.
#[must_use]
pub const fn max_hit_for_level(level: u32) -> u32 {
    1 + level / 2
}

/// Per-skill level snapshot, as shown on the skills panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkillLevels {
    /// Agility level.
    pub agility: u32,
    /// Farming level.
    pub farming: u32,
    /// Melee level.
    pub melee: u32,
    /// Hitpoints level.
    pub hitpoints: u32,
}

impl SkillLevels {
    /// Level of a single skill.
    #[must_use]
    pub const fn get(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Agility => self.agility,
            Skill::Farming => self.farming,
            Skill::Melee => self.melee,
            Skill::Hitpoints => self.hitpoints,
        }
    }

    /// Total level across the trained skills (agility excluded).
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.farming + self.melee + self.hitpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_at_zero_xp() {
        // sqrt(100) = 10 -> floor(2.5 + 1) = 3
        assert_eq!(level_for_xp(Fixed::ZERO), 3);
    }

    #[test]
    fn test_starting_hitpoints_level() {
        // sqrt(1300) = 36.05 -> floor(9 + 1) = 10
        assert_eq!(level_for_xp(Fixed::from_num(240)), 10);
    }

    #[test]
    fn test_level_boundaries_are_exact() {
        // xp*5 + 100 = 400 -> sqrt 20 -> level 6; 395 -> sqrt 19 -> level 5.
        assert_eq!(level_for_xp(Fixed::from_num(60)), 6);
        assert_eq!(level_for_xp(Fixed::from_num(59)), 5);
    }

    #[test]
    fn test_negative_xp_is_clamped() {
        assert_eq!(level_for_xp(Fixed::from_num(-50)), level_for_xp(Fixed::ZERO));
    }

    #[test]
    fn test_huge_xp_does_not_overflow() {
        assert!(level_for_xp(Fixed::MAX) > 1);
    }

    #[test]
    fn test_max_hit_formula() {
        assert_eq!(max_hit_for_level(1), 1);
        assert_eq!(max_hit_for_level(2), 2);
        assert_eq!(max_hit_for_level(3), 2);
        assert_eq!(max_hit_for_level(10), 6);
    }

    #[test]
    fn test_total_level_excludes_agility() {
        let levels = SkillLevels {
            agility: 50,
            farming: 3,
            melee: 4,
            hitpoints: 10,
        };
        assert_eq!(levels.total(), 17);
        assert_eq!(levels.get(Skill::Agility), 50);
    }

    proptest! {
        #[test]
        fn prop_level_is_monotonic(a in 0u32..2_000_000, b in 0u32..2_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for_xp(Fixed::from_num(lo)) <= level_for_xp(Fixed::from_num(hi)));
        }

        #[test]
        fn prop_level_is_at_least_one(xp in 0u32..u32::MAX / 8) {
            prop_assert!(level_for_xp(Fixed::from_num(xp)) >= 1);
        }

        #[test]
        fn prop_max_hit_matches_formula(level in 1u32..10_000) {
            prop_assert_eq!(max_hit_for_level(level), (1.0 + f64::from(level) / 2.0).floor() as u32);
        }
    }
}
