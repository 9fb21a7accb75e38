//! Click-to-move and attack-intent targeting.
//!
//! Movement runs every frame, independent of the combat cadence. The combat
//! range check gates damage until the walk brings the player close enough.

use crate::components::EnemyId;
use crate::math::{Fixed, Vec2Fixed};
use crate::messages::MessageKind;
use crate::session::{CommandOutcome, RejectReason, Session};

/// Set a new walk destination. Always drops the combat target.
pub fn move_player_to(session: &mut Session, point: Vec2Fixed) -> CommandOutcome {
    if session.player.is_dying() {
        return CommandOutcome::Rejected(RejectReason::PlayerDying);
    }

    session.player.destination = Some(point);
    session.active_target = None;
    CommandOutcome::Accepted
}

/// Walk up to an enemy and make it the combat target in one operation.
///
/// The approach point sits `attack_approach_distance` from the enemy on the
/// side facing the player.
pub fn issue_attack(session: &mut Session, id: EnemyId) -> CommandOutcome {
    if session.player.is_dying() {
        return CommandOutcome::Rejected(RejectReason::PlayerDying);
    }
    let Some(enemy) = session.enemies.get(&id) else {
        return CommandOutcome::Rejected(RejectReason::UnknownEnemy(id));
    };
    if !enemy.is_targetable() {
        return CommandOutcome::Rejected(RejectReason::EnemyDead(id));
    }

    let approach = approach_point(
        enemy.position,
        session.player.position,
        session.config.attack_approach_distance,
    );
    let text = format!("You attack the {}!", enemy.name);

    session.player.destination = Some(approach);
    session.active_target = Some(id);
    session.emit(text, MessageKind::Action);
    CommandOutcome::Accepted
}

/// Point `distance` away from `target` toward `from`, or along +x when the
/// two coincide.
#[must_use]
pub fn approach_point(target: Vec2Fixed, from: Vec2Fixed, distance: Fixed) -> Vec2Fixed {
    let direction = (from - target).normalize();
    let direction = if direction == Vec2Fixed::ZERO {
        Vec2Fixed::new(Fixed::from_num(1), Fixed::ZERO)
    } else {
        direction
    };
    target + direction.scale(distance)
}

/// Advance the player toward its destination for one frame of `dt_ms`.
///
/// Dying players neither move nor turn. Returns `true` on the frame the
/// player arrives.
pub fn step_movement(session: &mut Session, dt_ms: u64) -> bool {
    if session.player.is_dying() {
        return false;
    }

    let epsilon = session.config.arrival_epsilon;
    let mut arrived = false;

    if let Some(destination) = session.player.destination {
        let player = &mut session.player;
        if player.position.distance(destination) > epsilon {
            let dt = Fixed::saturating_from_num(dt_ms);
            let step = session.config.player_speed.saturating_mul(dt) / Fixed::from_num(1_000);
            player.position = player.position.move_towards(destination, step);
            player.facing = Some(destination);
        }
        if player.position.distance(destination) <= epsilon {
            player.destination = None;
            arrived = true;
        }
    }

    if session.player.destination.is_none() {
        if let Some(target) = session.active_target.and_then(|id| session.enemies.get(&id)) {
            session.player.facing = Some(target.position);
        }
    }

    arrived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::lifecycle;

    fn session() -> Session {
        Session::new(SimConfig::default()).unwrap()
    }

    fn walk(session: &mut Session, frames: usize) {
        for _ in 0..frames {
            step_movement(session, 16);
        }
    }

    #[test]
    fn test_move_clears_target() {
        let mut session = session();
        assert_eq!(session.issue_attack(1), CommandOutcome::Accepted);
        assert_eq!(session.active_target(), Some(1));

        assert_eq!(session.move_player_to(Vec2Fixed::from_ints(1, 1)), CommandOutcome::Accepted);
        assert_eq!(session.active_target(), None);
        assert_eq!(session.player().destination, Some(Vec2Fixed::from_ints(1, 1)));
    }

    #[test]
    fn test_attack_sets_approach_and_target() {
        let mut session = session();
        session.player.position = Vec2Fixed::from_ints(5, 0);

        assert_eq!(session.issue_attack(1), CommandOutcome::Accepted);
        // Goblin 1 at (5, -5); approach from +z.
        let dest = session.player().destination.unwrap();
        let epsilon = Fixed::from_num(0.001);
        assert!((dest.x - Fixed::from_num(5)).abs() < epsilon);
        assert!((dest.z - Fixed::from_num(-3.8)).abs() < epsilon);
        assert_eq!(session.drain_messages()[0].text, "You attack the Goblin!");
    }

    #[test]
    fn test_attack_rejections() {
        let mut session = session();
        assert_eq!(
            session.issue_attack(9),
            CommandOutcome::Rejected(RejectReason::UnknownEnemy(9))
        );

        lifecycle::kill_enemy(&mut session, 2, 0);
        session.drain_messages();
        assert_eq!(
            session.issue_attack(2),
            CommandOutcome::Rejected(RejectReason::EnemyDead(2))
        );
        assert!(session.drain_messages().is_empty());
    }

    #[test]
    fn test_commands_rejected_while_dying() {
        let mut session = session();
        session.player.stats.set_current_hp(0);
        lifecycle::kill_player(&mut session, 0);

        let dying = CommandOutcome::Rejected(RejectReason::PlayerDying);
        assert_eq!(session.move_player_to(Vec2Fixed::from_ints(2, 2)), dying);
        assert_eq!(session.issue_attack(1), dying);
        assert_eq!(session.interact_with_patch(1), dying);
        assert_eq!(session.player().destination, None);
    }

    #[test]
    fn test_walk_reaches_destination_without_overshoot() {
        let mut session = session();
        session.move_player_to(Vec2Fixed::from_ints(3, 4));

        // 5 units at 7.2 u/s is ~0.69 s, i.e. 44 frames of 16 ms.
        walk(&mut session, 40);
        assert!(session.player().destination.is_some());
        walk(&mut session, 10);
        assert_eq!(session.player().destination, None);
        assert!(session.player().position.distance(Vec2Fixed::from_ints(3, 4)) <= Fixed::from_num(0.1));
    }

    #[test]
    fn test_far_destination_makes_progress() {
        let mut session = session();
        let far = Vec2Fixed::from_ints(50_000, 0);
        session.move_player_to(far);

        walk(&mut session, 1);
        // 7.2 u/s for 16 ms.
        let epsilon = Fixed::from_num(0.001);
        assert!((session.player().position.x - Fixed::from_num(0.1152)).abs() < epsilon);
        assert_eq!(session.player().position.z, Fixed::ZERO);
        assert_eq!(session.player().destination, Some(far));
    }

    #[test]
    fn test_edge_of_range_destination() {
        let mut session = session();
        let corner = Vec2Fixed::new(Fixed::MAX, Fixed::MIN);
        session.move_player_to(corner);

        walk(&mut session, 3);
        let position = session.player().position;
        assert!(position.x > Fixed::ZERO && position.z < Fixed::ZERO);
        assert!(session.player().destination.is_some());
    }

    #[test]
    fn test_oversized_frame_arrives_in_one_step() {
        let mut session = session();
        session.move_player_to(Vec2Fixed::from_ints(3, 4));

        assert!(step_movement(&mut session, u64::MAX));
        assert_eq!(session.player().position, Vec2Fixed::from_ints(3, 4));
        assert_eq!(session.player().destination, None);
    }

    #[test]
    fn test_facing_tracks_target_after_arrival() {
        let mut session = session();
        session.player.position = Vec2Fixed::from_ints(5, -4);
        session.issue_attack(1);
        walk(&mut session, 20);

        assert_eq!(session.player().destination, None);
        assert_eq!(session.player().facing, Some(Vec2Fixed::from_ints(5, -5)));
    }

    #[test]
    fn test_dying_player_does_not_move() {
        let mut session = session();
        session.move_player_to(Vec2Fixed::from_ints(3, 0));
        session.player.stats.set_current_hp(0);
        lifecycle::kill_player(&mut session, 0);

        walk(&mut session, 30);
        assert_eq!(session.player().position, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_approach_point_when_overlapping() {
        let at = Vec2Fixed::from_ints(2, 2);
        let point = approach_point(at, at, Fixed::from_num(1));
        assert_eq!(point, Vec2Fixed::from_ints(3, 2));
    }
}
