//! Player and enemy death/respawn sequencing.
//!
//! Player: `ALIVE -> DYING -> ALIVE` with the respawn deadline held in
//! [`PlayerState::Dying`]. Enemies: `ALIVE -> DYING -> RESPAWNING -> ALIVE`,
//! where DYING lasts zero time because the kill transition schedules the
//! respawn in the same call. All deadlines are absolute simulation times;
//! nothing here fires on its own.

use crate::components::{EnemyId, PlayerState, Timestamp};
use crate::messages::MessageKind;
use crate::progression::Skill;
use crate::session::Session;

/// Put the player into the death sequence.
///
/// Clears the combat target and the walk destination and emits the danger
/// message. Returns `false` if the player was already dying.
pub fn kill_player(session: &mut Session, now: Timestamp) -> bool {
    if session.player.is_dying() {
        return false;
    }

    let respawn_at = now.saturating_add(session.config.player_death_delay_ms);
    session.player.state = PlayerState::Dying { respawn_at };
    session.player.destination = None;
    session.active_target = None;
    session.emit("Oh dear, you are dead!", MessageKind::Danger);

    tracing::info!(now, respawn_at, "Player died");
    true
}

/// Finish the death sequence once its deadline has passed.
///
/// Restores full hit points and sends the player home. Returns whether the
/// player respawned.
pub fn update_player(session: &mut Session, now: Timestamp) -> bool {
    let PlayerState::Dying { respawn_at } = session.player.state else {
        return false;
    };
    if now < respawn_at {
        return false;
    }

    let player = &mut session.player;
    player.stats.restore_full();
    player.position = session.config.home;
    player.destination = None;
    player.facing = None;
    player.state = PlayerState::Alive;
    session.emit("You have respawned at home.", MessageKind::Info);

    tracing::info!(now, hp = session.player.stats.current_hp(), "Player respawned");
    true
}

/// Kill an enemy and schedule its respawn.
///
/// Detaches it as the combat target, awards the kill bonus and emits the
/// kill message. Returns `false` for an unknown or already dead enemy.
pub fn kill_enemy(session: &mut Session, id: EnemyId, now: Timestamp) -> bool {
    let delay = session.config.enemy_respawn_delay_ms;
    let Some(enemy) = session.enemies.get_mut(&id) else {
        return false;
    };
    if enemy.is_dead {
        return false;
    }

    enemy.current_hp = 0;
    enemy.is_dead = true;
    enemy.respawn_at = Some(now.saturating_add(delay));
    let text = format!("You defeated the {}!", enemy.name);

    if session.active_target == Some(id) {
        session.active_target = None;
    }
    let bonus = session.config.xp.kill_bonus;
    session.player.stats.award_xp(Skill::Melee, bonus);
    session.emit(text, MessageKind::Action);

    tracing::info!(enemy = id, now, respawn_at = now.saturating_add(delay), "Enemy killed");
    true
}

/// Revive every dead enemy whose respawn deadline has passed.
///
/// Returns the revived ids in id order.
pub fn respawn_sweep(session: &mut Session, now: Timestamp) -> Vec<EnemyId> {
    let delay = session.config.enemy_respawn_delay_ms;
    let mut revived = Vec::new();

    for enemy in session.enemies.values_mut().filter(|e| e.is_dead) {
        match enemy.respawn_at {
            Some(at) if now >= at => {
                enemy.current_hp = enemy.max_hp;
                enemy.is_dead = false;
                enemy.respawn_at = None;
                revived.push(enemy.id);
                tracing::info!(enemy = enemy.id, now, "Enemy respawned");
            }
            Some(_) => {}
            None => {
                tracing::warn!(enemy = enemy.id, "Dead enemy had no respawn deadline; scheduling one");
                enemy.respawn_at = Some(now.saturating_add(delay));
            }
        }
    }

    revived
}
