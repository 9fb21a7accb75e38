//! Fixed-cadence combat resolution.
//!
//! One call to [`run_combat_tick`] is one complete exchange: the respawn
//! sweep, the player's swing at the active target, and the counter-attack.
//! The call takes `&mut Session` for its whole duration, so no frame or
//! other tick can observe a half-resolved exchange.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::components::Timestamp;
use crate::lifecycle;
use crate::math::Fixed;
use crate::progression::{max_hit_for_level, Skill};
use crate::session::Session;
use crate::simulation::{HitEvent, TickEvents};

/// Source of combat randomness.
///
/// Implementations must be deterministic for a given construction so that
/// runs can be replayed.
pub trait Dice {
    /// Damage roll, uniform over `0..=max_hit`. Zero is a miss.
    fn roll_damage(&mut self, max_hit: u32) -> u32;

    /// Whether an enemy counter-attack with the given hit chance lands.
    fn counter_attack_lands(&mut self, chance: Fixed) -> bool;
}

/// Seeded production dice backed by ChaCha8.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    /// Dice producing the same sequence for the same seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Dice for SeededDice {
    fn roll_damage(&mut self, max_hit: u32) -> u32 {
        self.rng.random_range(0..=max_hit)
    }

    fn counter_attack_lands(&mut self, chance: Fixed) -> bool {
        // An I32F32 in [0, 1] has exactly 2^32 fractional steps, so comparing
        // a uniform u32 against the raw bits is an exact Bernoulli trial.
        let threshold = chance.to_bits().clamp(0, 1_i64 << 32);
        i64::from(self.rng.random::<u32>()) < threshold
    }
}

/// Resolve one combat tick at time `now`.
///
/// 1. Respawn sweep, which runs even while the player is dying.
/// 2. Skip the rest while the player is dying.
/// 3. Re-resolve the target; clear it if missing or dead.
/// 4. Out of melee range: no damage either way.
/// 5. Roll `0..=max_hit` from the melee level and apply it, awarding melee
///    and hitpoints XP for damage dealt.
/// 6. A kill ends the tick with no counter-attack.
/// 7. Otherwise the enemy counter-attacks; reaching 0 HP kills the player.
pub fn run_combat_tick<D: Dice + ?Sized>(session: &mut Session, dice: &mut D, now: Timestamp) -> TickEvents {
    let mut events = TickEvents {
        enemy_respawns: lifecycle::respawn_sweep(session, now),
        ..TickEvents::default()
    };

    if session.player.is_dying() {
        return events;
    }

    let Some(target_id) = session.resolve_target() else {
        return events;
    };

    let player_position = session.player.position;
    let melee_level = session.player.stats.level(Skill::Melee);
    let max_hit = max_hit_for_level(melee_level);
    let melee_range = session.config.melee_range;

    let Some(enemy) = session.enemies.get_mut(&target_id) else {
        return events;
    };
    if !player_position.is_within(enemy.position, melee_range) {
        return events;
    }

    let damage = dice.roll_damage(max_hit).min(max_hit);
    enemy.apply_damage(damage);
    let slain = enemy.current_hp == 0;
    let enemy_hp = enemy.current_hp;
    events.hits.push(HitEvent {
        target: target_id,
        damage,
    });

    if damage > 0 {
        let dealt = Fixed::from_num(damage);
        let xp = &session.config.xp;
        let melee_xp = dealt.saturating_mul(xp.melee_per_damage);
        let hitpoints_xp = dealt.saturating_mul(xp.hitpoints_per_damage);
        session.player.stats.award_xp(Skill::Melee, melee_xp);
        session.player.stats.award_xp(Skill::Hitpoints, hitpoints_xp);
    }

    tracing::debug!(now, target = target_id, damage, max_hit, enemy_hp, "Player swing");

    if slain {
        lifecycle::kill_enemy(session, target_id, now);
        events.kills.push(target_id);
        return events;
    }

    if dice.counter_attack_lands(session.config.counter_hit_chance) {
        let taken = session.player.stats.apply_damage(session.config.counter_hit_damage);
        events.damage_taken = taken;
        tracing::debug!(now, target = target_id, taken, hp = session.player.stats.current_hp(), "Counter-attack");

        if session.player.stats.is_depleted() {
            events.player_died = lifecycle::kill_player(session, now);
        }
    }

    events
}
