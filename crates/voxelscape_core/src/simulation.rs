//! Clock-driven simulation driver.
//!
//! [`Simulation`] owns the [`Session`], the dice and the clock. Two cadences
//! share the session: frames (movement, death-delay expiry, crop growth)
//! every `frame_ms` and combat ticks every `combat_tick_ms`. Advancing the
//! clock replays every due step in chronological order, frame before tick
//! when both fall on the same millisecond, and each step runs to
//! completion before the next starts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{self, Dice, SeededDice};
use crate::components::{EnemyId, Timestamp};
use crate::config::SimConfig;
use crate::error::{GameError, Result};
use crate::farming::PatchId;
use crate::lifecycle;
use crate::movement;
use crate::session::Session;

/// One landed (or missed) player swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitEvent {
    /// Enemy swung at.
    pub target: EnemyId,
    /// Damage rolled; 0 is a miss.
    pub damage: u32,
}

/// Events generated while stepping the simulation.
///
/// These events can be used by the presentation layer to trigger effects,
/// sounds, animations, etc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Player swings.
    pub hits: Vec<HitEvent>,
    /// Damage the player took from counter-attacks.
    pub damage_taken: u32,
    /// Enemies killed.
    pub kills: Vec<EnemyId>,
    /// Enemies that came back.
    pub enemy_respawns: Vec<EnemyId>,
    /// Patches whose stage advanced with time.
    pub patches_grown: Vec<PatchId>,
    /// The player entered the death sequence.
    pub player_died: bool,
    /// The player finished the death sequence.
    pub player_respawned: bool,
}

impl TickEvents {
    /// Fold later events into these.
    pub fn merge(&mut self, other: TickEvents) {
        self.hits.extend(other.hits);
        self.damage_taken = self.damage_taken.saturating_add(other.damage_taken);
        self.kills.extend(other.kills);
        self.enemy_respawns.extend(other.enemy_respawns);
        self.patches_grown.extend(other.patches_grown);
        self.player_died |= other.player_died;
        self.player_respawned |= other.player_respawned;
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Cadence bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct Clock {
    now_ms: Timestamp,
    next_frame_ms: Timestamp,
    next_tick_ms: Timestamp,
    ticks: u64,
}

/// The deterministic simulation driver.
///
/// # Step Order
///
/// Each frame at time `t`:
/// 1. Player death-delay expiry
/// 2. Movement and facing
/// 3. Crop growth
///
/// Each combat tick at time `t` runs [`combat::run_combat_tick`].
#[derive(Debug)]
pub struct Simulation<D: Dice = SeededDice> {
    session: Session,
    dice: D,
    clock: Clock,
    running: bool,
}

impl Simulation<SeededDice> {
    /// Create a simulation with seeded production dice.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config fails validation.
    ///
    /// # Example
    ///
    /// ```
    /// use voxelscape_core::config::SimConfig;
    /// use voxelscape_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::with_seed(SimConfig::default(), 7).unwrap();
    /// sim.advance(1_200);
    /// assert_eq!(sim.now_ms(), 1_200);
    /// assert_eq!(sim.tick_count(), 2);
    /// ```
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self> {
        Self::new(config, SeededDice::new(seed))
    }
}

impl<D: Dice> Simulation<D> {
    /// Create a simulation at time 0 with the given dice.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if the config fails validation.
    pub fn new(config: SimConfig, dice: D) -> Result<Self> {
        let clock = Clock {
            now_ms: 0,
            next_frame_ms: config.frame_ms,
            next_tick_ms: config.combat_tick_ms,
            ticks: 0,
        };
        let session = Session::new(config)?;
        Ok(Self {
            session,
            dice,
            clock,
            running: true,
        })
    }

    /// The simulated world.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable world access, for issuing commands.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The dice.
    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now_ms(&self) -> Timestamp {
        self.clock.now_ms
    }

    /// Combat ticks resolved so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.clock.ticks
    }

    /// Whether cadences are still live.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Stop every cadence. Later calls to [`advance`](Self::advance),
    /// [`frame`](Self::frame) and [`combat_tick`](Self::combat_tick) do
    /// nothing. Idempotent.
    pub fn shutdown(&mut self) {
        if self.running {
            tracing::info!(now = self.clock.now_ms, ticks = self.clock.ticks, "Simulation shut down");
        }
        self.running = false;
    }

    /// Move the clock forward, running every frame and tick that falls due.
    ///
    /// Work is linear in `elapsed_ms`. The clock stops one cadence short of
    /// `Timestamp::MAX` so that due times never saturate.
    pub fn advance(&mut self, elapsed_ms: u64) -> TickEvents {
        let mut events = TickEvents::default();
        if !self.running {
            return events;
        }

        let config = &self.session.config;
        let horizon = Timestamp::MAX - config.frame_ms.max(config.combat_tick_ms);
        let end = self
            .clock
            .now_ms
            .saturating_add(elapsed_ms)
            .min(horizon)
            .max(self.clock.now_ms);
        loop {
            let frame_due = self.clock.next_frame_ms;
            let tick_due = self.clock.next_tick_ms;
            if frame_due.min(tick_due) > end {
                break;
            }

            if frame_due <= tick_due {
                self.set_now(frame_due);
                let frame_ms = self.session.config.frame_ms;
                events.merge(self.run_frame(frame_ms));
                self.clock.next_frame_ms = frame_due.saturating_add(frame_ms);
            } else {
                self.set_now(tick_due);
                events.merge(self.run_tick());
                self.clock.next_tick_ms = tick_due.saturating_add(self.session.config.combat_tick_ms);
            }
        }
        self.set_now(end);

        events
    }

    /// Run one frame step of `dt_ms` at the current time.
    pub fn frame(&mut self, dt_ms: u64) -> TickEvents {
        if !self.running {
            return TickEvents::default();
        }
        self.run_frame(dt_ms)
    }

    /// Resolve one combat tick at the current time.
    pub fn combat_tick(&mut self) -> TickEvents {
        if !self.running {
            return TickEvents::default();
        }
        self.run_tick()
    }

    fn set_now(&mut self, now: Timestamp) {
        self.clock.now_ms = now;
        self.session.now_ms = now;
    }

    fn run_frame(&mut self, dt_ms: u64) -> TickEvents {
        let now = self.clock.now_ms;
        let mut events = TickEvents {
            player_respawned: lifecycle::update_player(&mut self.session, now),
            ..TickEvents::default()
        };

        movement::step_movement(&mut self.session, dt_ms);

        let stage_secs = self.session.config.growth_stage_secs;
        for patch in self.session.patches.values_mut() {
            if patch.advance_growth(dt_ms, stage_secs) {
                events.patches_grown.push(patch.id);
            }
        }

        events
    }

    fn run_tick(&mut self) -> TickEvents {
        let now = self.clock.now_ms;
        let events = combat::run_combat_tick(&mut self.session, &mut self.dice, now);
        self.clock.ticks += 1;

        #[cfg(feature = "debug-validation")]
        assert!(
            self.session.hp_within_bounds(),
            "hit points out of bounds after tick {}",
            self.clock.ticks
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.clock.ticks, now, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Calculate a hash of the complete simulation state.
    ///
    /// Two simulations fed the same config, seed and commands produce the
    /// same hash at the same time.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.clock.hash(&mut hasher);
        self.session.player.hash(&mut hasher);
        self.session.active_target.hash(&mut hasher);

        // BTreeMap iteration is already in id order.
        self.session.enemies.len().hash(&mut hasher);
        for enemy in self.session.enemies.values() {
            enemy.hash(&mut hasher);
        }
        self.session.patches.len().hash(&mut hasher);
        for patch in self.session.patches.values() {
            patch.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the session and clock.
    ///
    /// Dice state is not included; a restored simulation keeps rolling with
    /// its own dice.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(&(&self.session, &self.clock))
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize simulation: {e}")))
    }

    /// Replace the session and clock with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Snapshot`] if decoding fails.
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let (session, clock): (Session, Clock) = bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize simulation: {e}")))?;
        self.session = session;
        self.clock = clock;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PlayerState;
    use crate::farming::FarmingStage;
    use crate::math::{Fixed, Vec2Fixed};

    /// Dice that always hit for one and never counter.
    struct SteadyDice;

    impl Dice for SteadyDice {
        fn roll_damage(&mut self, max_hit: u32) -> u32 {
            max_hit.min(1)
        }

        fn counter_attack_lands(&mut self, _chance: Fixed) -> bool {
            false
        }
    }

    fn sim() -> Simulation<SteadyDice> {
        Simulation::new(SimConfig::default(), SteadyDice).unwrap()
    }

    #[test]
    fn test_cadences() {
        let mut sim = sim();
        sim.advance(599);
        assert_eq!(sim.tick_count(), 0);
        sim.advance(1);
        assert_eq!(sim.tick_count(), 1);
        sim.advance(6_000);
        assert_eq!(sim.tick_count(), 11);
        assert_eq!(sim.now_ms(), 6_600);
        assert_eq!(sim.session().now_ms(), 6_600);
    }

    #[test]
    fn test_advance_stops_short_of_clock_limit() {
        let mut sim = sim();
        let start = Timestamp::MAX - 2_000;
        sim.clock = Clock {
            now_ms: start,
            next_frame_ms: start + 16,
            next_tick_ms: start + 600,
            ticks: 0,
        };
        sim.set_now(start);

        sim.advance(u64::MAX);
        assert_eq!(sim.now_ms(), Timestamp::MAX - 600);
        assert_eq!(sim.tick_count(), 2);

        sim.advance(u64::MAX);
        assert_eq!(sim.now_ms(), Timestamp::MAX - 600);
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn test_clock_past_limit_does_not_move() {
        let mut sim = sim();
        sim.clock = Clock {
            now_ms: Timestamp::MAX - 10,
            next_frame_ms: Timestamp::MAX,
            next_tick_ms: Timestamp::MAX,
            ticks: 0,
        };
        sim.set_now(Timestamp::MAX - 10);

        assert!(sim.advance(u64::MAX).is_empty());
        assert_eq!(sim.now_ms(), Timestamp::MAX - 10);
    }

    #[test]
    fn test_split_advances_match_single_advance() {
        let mut a = sim();
        let mut b = sim();
        a.session_mut().issue_attack(1);
        b.session_mut().issue_attack(1);

        a.advance(5_000);
        for _ in 0..50 {
            b.advance(100);
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_attack_walks_then_kills() {
        let mut sim = sim();
        sim.session_mut().issue_attack(1);

        let events = sim.advance(10_000);
        assert_eq!(events.kills, vec![1]);
        assert_eq!(events.hits.len(), 5);
        assert!(sim.session().enemy(1).unwrap().is_dead);
    }

    #[test]
    fn test_player_respawns_during_frames() {
        let mut sim = sim();
        let session = sim.session_mut();
        session.player_mut().position = Vec2Fixed::from_ints(4, 4);
        session.player_mut().stats.set_current_hp(0);
        lifecycle::kill_player(session, 0);

        let events = sim.advance(3_990);
        assert!(!events.player_respawned);
        let events = sim.advance(20);
        assert!(events.player_respawned);
        assert_eq!(sim.session().player().state, PlayerState::Alive);
        assert_eq!(sim.session().player().position, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_crops_grow_with_clock() {
        let mut sim = sim();
        let session = sim.session_mut();
        session.player_mut().position = Vec2Fixed::from_ints(5, 6);
        for _ in 0..3 {
            session.interact_with_patch(1);
        }

        let events = sim.advance(6_000);
        assert_eq!(events.patches_grown, vec![1, 1]);
        assert_eq!(sim.session().patch(1).unwrap().stage(), FarmingStage::Ready);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut sim = sim();
        sim.advance(600);
        let hash = sim.state_hash();

        sim.shutdown();
        sim.shutdown();
        assert!(!sim.is_running());
        assert!(sim.advance(10_000).is_empty());
        assert!(sim.combat_tick().is_empty());
        assert!(sim.frame(16).is_empty());
        assert_eq!(sim.now_ms(), 600);
        assert_eq!(sim.state_hash(), hash);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut sim = sim();
        sim.session_mut().issue_attack(2);
        sim.advance(2_000);
        let snapshot = sim.snapshot().unwrap();
        let hash = sim.state_hash();

        sim.advance(5_000);
        assert_ne!(sim.state_hash(), hash);

        sim.restore(&snapshot).unwrap();
        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.now_ms(), 2_000);
    }

    #[test]
    fn test_restore_garbage_fails() {
        let mut sim = sim();
        assert!(matches!(sim.restore(&[1, 2, 3]), Err(GameError::Snapshot(_))));
    }

    #[test]
    fn test_merge_accumulates() {
        let mut a = TickEvents {
            kills: vec![1],
            damage_taken: 1,
            ..TickEvents::default()
        };
        a.merge(TickEvents {
            kills: vec![2],
            damage_taken: 2,
            player_died: true,
            ..TickEvents::default()
        });
        assert_eq!(a.kills, vec![1, 2]);
        assert_eq!(a.damage_taken, 3);
        assert!(a.player_died);
        assert!(!a.is_empty());
    }
}
