//! Test fixtures and helpers.
//!
//! Pre-built worlds and dice with known outcomes for consistent testing.

use std::collections::VecDeque;

use fixed::types::I32F32;
use voxelscape_core::combat::Dice;
use voxelscape_core::config::SimConfig;
use voxelscape_core::math::Vec2Fixed;
use voxelscape_core::session::Session;
use voxelscape_core::simulation::Simulation;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Dice replaying queued results.
///
/// Once a queue runs dry the matching default is used: a miss and no
/// counter-hit unless configured otherwise. Damage is always capped at the
/// requested maximum.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    damage: VecDeque<u32>,
    counters: VecDeque<bool>,
    default_damage: u32,
    default_counter: bool,
    damage_rolls: usize,
    counter_rolls: usize,
}

impl ScriptedDice {
    /// Dice that always miss and never counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dice that always roll `damage` (capped at max hit) and never counter.
    #[must_use]
    pub fn always_hit(damage: u32) -> Self {
        Self {
            default_damage: damage,
            ..Self::default()
        }
    }

    /// Queue damage rolls.
    #[must_use]
    pub fn with_damage<I: IntoIterator<Item = u32>>(mut self, rolls: I) -> Self {
        self.damage.extend(rolls);
        self
    }

    /// Queue counter-attack outcomes.
    #[must_use]
    pub fn with_counters<I: IntoIterator<Item = bool>>(mut self, outcomes: I) -> Self {
        self.counters.extend(outcomes);
        self
    }

    /// Outcome of counter-attacks once the queue is empty.
    #[must_use]
    pub fn counters_by_default(mut self, lands: bool) -> Self {
        self.default_counter = lands;
        self
    }

    /// Damage rolls requested so far.
    #[must_use]
    pub fn damage_rolls(&self) -> usize {
        self.damage_rolls
    }

    /// Counter-attack rolls requested so far.
    #[must_use]
    pub fn counter_rolls(&self) -> usize {
        self.counter_rolls
    }
}

impl Dice for ScriptedDice {
    fn roll_damage(&mut self, max_hit: u32) -> u32 {
        self.damage_rolls += 1;
        self.damage.pop_front().unwrap_or(self.default_damage).min(max_hit)
    }

    fn counter_attack_lands(&mut self, _chance: I32F32) -> bool {
        self.counter_rolls += 1;
        self.counters.pop_front().unwrap_or(self.default_counter)
    }
}

/// A fresh session with the default world.
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn default_session() -> Session {
    Session::new(SimConfig::default()).expect("default config is valid")
}

/// A simulation over the default world driven by `dice`.
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn simulation_with<D: Dice>(dice: D) -> Simulation<D> {
    Simulation::new(SimConfig::default(), dice).expect("default config is valid")
}

/// A simulation with the player already in melee range of goblin 1 at
/// (5, -5) and engaged with it.
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn engaged_simulation<D: Dice>(dice: D) -> Simulation<D> {
    let mut sim = simulation_with(dice);
    let session = sim.session_mut();
    session.player_mut().position = Vec2Fixed::from_ints(5, -4);
    session.issue_attack(1);
    session.drain_messages();
    sim
}

/// A simulation with the player standing next to patch 1 at (5, 5).
///
/// # Panics
///
/// Panics if the default config is invalid.
#[must_use]
pub fn simulation_at_patch<D: Dice>(dice: D) -> Simulation<D> {
    let mut sim = simulation_with(dice);
    sim.session_mut().player_mut().position = Vec2Fixed::from_ints(5, 6);
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_dice_replays_then_defaults() {
        let mut dice = ScriptedDice::always_hit(1)
            .with_damage([3, 0])
            .with_counters([true]);

        assert_eq!(dice.roll_damage(5), 3);
        assert_eq!(dice.roll_damage(5), 0);
        assert_eq!(dice.roll_damage(5), 1);
        assert!(dice.counter_attack_lands(fixed(0)));
        assert!(!dice.counter_attack_lands(fixed(1)));
        assert_eq!(dice.damage_rolls(), 3);
        assert_eq!(dice.counter_rolls(), 2);
    }

    #[test]
    fn test_counter_default_applies_after_queue() {
        let mut dice = ScriptedDice::new().with_counters([false]).counters_by_default(true);
        assert!(!dice.counter_attack_lands(fixed(1)));
        assert!(dice.counter_attack_lands(fixed(0)));
        assert!(dice.counter_attack_lands(fixed(0)));
        assert_eq!(dice.roll_damage(3), 0);
    }

    #[test]
    fn test_default_session_matches_default_simulation() {
        let session = default_session();
        let sim = simulation_with(ScriptedDice::new());
        assert_eq!(session.enemies().count(), sim.session().enemies().count());
        assert_eq!(session.patches().count(), 1);
        assert_eq!(session.player().position, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_scripted_damage_is_capped() {
        let mut dice = ScriptedDice::new().with_damage([9]);
        assert_eq!(dice.roll_damage(2), 2);
    }

    #[test]
    fn test_engaged_fixture_is_in_range() {
        let sim = engaged_simulation(ScriptedDice::new());
        let session = sim.session();
        let goblin = session.enemy(1).unwrap();
        assert_eq!(session.active_target(), Some(1));
        assert!(session.player().position.is_within(goblin.position, fixed_f(1.8)));
    }
}
