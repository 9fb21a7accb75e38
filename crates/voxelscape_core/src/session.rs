//! The owned simulation aggregate and its command API.
//!
//! A [`Session`] holds every mutable record: the player, the enemy roster,
//! the farming patches, the active combat target and the message outbox.
//! Systems in [`crate::lifecycle`], [`crate::combat`] and
//! [`crate::movement`] are functions over `(&mut Session, now)`; nothing is
//! global.
//!
//! Commands never fail hard. Each returns a [`CommandOutcome`] saying
//! whether it was applied, converted into a corrective move, or rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Enemy, EnemyId, Player, Timestamp};
use crate::config::SimConfig;
use crate::error::Result;
use crate::examine::ExamineRequest;
use crate::farming::{FarmingPatch, PatchId, PatchInteraction};
use crate::math::{Fixed, Vec2Fixed};
use crate::messages::{GameMessage, MessageKind};
use crate::movement;
use crate::progression::{Skill, SkillLevels};

/// Why a command was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", content = "id", rename_all = "snake_case")]
pub enum RejectReason {
    /// The player is in the death sequence.
    PlayerDying,
    /// No enemy has this id.
    UnknownEnemy(EnemyId),
    /// The enemy is dead or respawning.
    EnemyDead(EnemyId),
    /// No patch has this id.
    UnknownPatch(PatchId),
}

/// Result of a player command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// Applied as issued.
    Accepted,
    /// Converted into a corrective move (walking to an out-of-range patch).
    Redirected,
    /// Not applied.
    Rejected(RejectReason),
}

impl CommandOutcome {
    /// Whether the command changed anything.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        !matches!(self, CommandOutcome::Rejected(_))
    }
}

/// Complete simulation state for one play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) config: SimConfig,
    pub(crate) now_ms: Timestamp,
    pub(crate) player: Player,
    pub(crate) enemies: BTreeMap<EnemyId, Enemy>,
    pub(crate) patches: BTreeMap<PatchId, FarmingPatch>,
    pub(crate) active_target: Option<EnemyId>,
    pub(crate) outbox: Vec<GameMessage>,
}

impl Session {
    /// Build a fresh world from a config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::InvalidConfig`] if the config
    /// fails validation.
    ///
    /// # Example
    ///
    /// ```
    /// use voxelscape_core::config::SimConfig;
    /// use voxelscape_core::session::Session;
    ///
    /// let session = Session::new(SimConfig::default()).unwrap();
    /// assert_eq!(session.player().stats.max_hp(), 10);
    /// assert_eq!(session.enemies().count(), 3);
    /// ```
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let player = Player::new(config.starting_hitpoints_xp, config.home);
        let enemies = config
            .enemies
            .iter()
            .map(|spawn| {
                let enemy = Enemy::new(spawn.id, spawn.name.clone(), spawn.level, spawn.max_hp, spawn.position);
                (spawn.id, enemy)
            })
            .collect();
        let patches = config
            .patches
            .iter()
            .map(|site| (site.id, FarmingPatch::from_site(site)))
            .collect();

        Ok(Self {
            config,
            now_ms: 0,
            player,
            enemies,
            patches,
            active_target: None,
            outbox: Vec::new(),
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Tunables this session was built with.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now_ms(&self) -> Timestamp {
        self.now_ms
    }

    /// The player.
    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable player access for scripted setups.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Enemies in id order.
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    /// Look up an enemy.
    #[must_use]
    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    /// Mutable enemy access for scripted setups.
    pub fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(&id)
    }

    /// Patches in id order.
    pub fn patches(&self) -> impl Iterator<Item = &FarmingPatch> {
        self.patches.values()
    }

    /// Look up a patch.
    #[must_use]
    pub fn patch(&self, id: PatchId) -> Option<&FarmingPatch> {
        self.patches.get(&id)
    }

    /// Current combat target, if any. May dangle; always re-resolve.
    #[must_use]
    pub const fn active_target(&self) -> Option<EnemyId> {
        self.active_target
    }

    /// Skill levels for the skills panel.
    #[must_use]
    pub fn skill_levels(&self) -> SkillLevels {
        self.player.stats.levels()
    }

    /// Take every message emitted since the last drain.
    pub fn drain_messages(&mut self) -> Vec<GameMessage> {
        std::mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Walk to a ground point, dropping any combat target.
    pub fn move_player_to(&mut self, point: Vec2Fixed) -> CommandOutcome {
        movement::move_player_to(self, point)
    }

    /// Walk up to an enemy and engage it.
    pub fn issue_attack(&mut self, enemy: EnemyId) -> CommandOutcome {
        movement::issue_attack(self, enemy)
    }

    /// Work a farming patch.
    ///
    /// Out of range, the player is sent walking to the patch instead and the
    /// outcome is [`CommandOutcome::Redirected`].
    pub fn interact_with_patch(&mut self, id: PatchId) -> CommandOutcome {
        if self.player.is_dying() {
            return CommandOutcome::Rejected(RejectReason::PlayerDying);
        }
        let Some(patch) = self.patches.get(&id) else {
            return CommandOutcome::Rejected(RejectReason::UnknownPatch(id));
        };

        let radius = self.config.patch_interaction_radius;
        if self.player.position.distance_squared(patch.position) > radius.saturating_mul(radius) {
            let approach = patch.position + Vec2Fixed::new(Fixed::ZERO, self.config.patch_approach_offset);
            self.player.destination = Some(approach);
            self.active_target = None;
            self.emit("Walking to patch...", MessageKind::Info);
            return CommandOutcome::Redirected;
        }

        let Some(patch) = self.patches.get_mut(&id) else {
            return CommandOutcome::Rejected(RejectReason::UnknownPatch(id));
        };
        let interaction = patch.interact();
        let xp = match interaction {
            PatchInteraction::Raked => Some(self.config.xp.rake),
            PatchInteraction::Harvested => Some(self.config.xp.harvest),
            _ => None,
        };
        if let Some(amount) = xp {
            self.player.stats.award_xp(Skill::Farming, amount);
        }

        let kind = if interaction.changed_stage() {
            MessageKind::Action
        } else {
            MessageKind::Info
        };
        self.emit(interaction.message(), kind);
        CommandOutcome::Accepted
    }

    /// Start examining a patch. Returns the request for the flavor-text
    /// collaborator, or `None` for an unknown id.
    pub fn examine_patch(&mut self, id: PatchId) -> Option<ExamineRequest> {
        let patch = self.patches.get(&id)?;
        let request = ExamineRequest::new(
            patch.name.clone(),
            format!("Current stage: {}.", patch.stage().label()),
        );
        self.emit(format!("Examining {}...", request.object), MessageKind::Info);
        Some(request)
    }

    /// Start examining an enemy. Returns `None` for an unknown id.
    pub fn examine_enemy(&mut self, id: EnemyId) -> Option<ExamineRequest> {
        let enemy = self.enemies.get(&id)?;
        let context = if enemy.is_dead {
            format!("A defeated level {} {}.", enemy.level, enemy.name)
        } else {
            format!("A level {} {} with {} hitpoints.", enemy.level, enemy.name, enemy.current_hp)
        };
        let request = ExamineRequest::new(enemy.name.clone(), context);
        self.emit(format!("Examining {}...", request.object), MessageKind::Info);
        Some(request)
    }

    /// Record flavor text produced for an earlier examine request.
    pub fn record_examine(&mut self, text: impl Into<String>) {
        self.emit(text, MessageKind::Examine);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn emit(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.outbox.push(GameMessage::new(text, kind, self.now_ms));
    }

    /// Resolve the active target, clearing it if it dangles or is dead.
    pub(crate) fn resolve_target(&mut self) -> Option<EnemyId> {
        let id = self.active_target?;
        match self.enemies.get(&id) {
            Some(enemy) if enemy.is_targetable() => Some(id),
            Some(_) => {
                self.active_target = None;
                None
            }
            None => {
                tracing::warn!(target_id = id, "Clearing dangling combat target");
                self.active_target = None;
                None
            }
        }
    }

    /// Whether every record satisfies `0 <= current_hp <= max_hp`.
    #[must_use]
    pub fn hp_within_bounds(&self) -> bool {
        let stats = &self.player.stats;
        stats.current_hp() <= stats.max_hp()
            && self.enemies.values().all(|e| e.current_hp <= e.max_hp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farming::FarmingStage;

    fn session() -> Session {
        Session::new(SimConfig::default()).unwrap()
    }

    fn texts(session: &mut Session) -> Vec<String> {
        session.drain_messages().into_iter().map(|m| m.text).collect()
    }

    #[test]
    fn test_new_session_matches_config() {
        let session = session();
        assert_eq!(session.player().position, Vec2Fixed::ZERO);
        assert_eq!(session.player().stats.current_hp(), 10);
        assert_eq!(session.enemies().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(session.patch(1).map(|p| p.stage()), Some(FarmingStage::Weeds));
        assert_eq!(session.active_target(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            combat_tick_ms: 0,
            ..SimConfig::default()
        };
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_far_patch_redirects_to_approach_point() {
        let mut session = session();
        assert_eq!(session.interact_with_patch(1), CommandOutcome::Redirected);

        let expected = Vec2Fixed::new(Fixed::from_num(5), Fixed::from_num(6.2));
        assert_eq!(session.player().destination, Some(expected));
        assert_eq!(session.patch(1).map(|p| p.stage()), Some(FarmingStage::Weeds));
        assert_eq!(texts(&mut session), vec!["Walking to patch..."]);
    }

    #[test]
    fn test_raking_awards_farming_xp() {
        let mut session = session();
        session.player_mut().position = Vec2Fixed::from_ints(5, 6);

        assert_eq!(session.interact_with_patch(1), CommandOutcome::Accepted);
        assert_eq!(session.patch(1).map(|p| p.stage()), Some(FarmingStage::Empty));
        assert_eq!(session.player().stats.xp(Skill::Farming), Fixed::from_num(5));
        assert_eq!(texts(&mut session), vec!["You rake the patch."]);
    }

    #[test]
    fn test_patch_at_exact_radius_is_in_range() {
        let mut session = session();
        session.player_mut().position = Vec2Fixed::from_ints(5, 8);
        assert_eq!(session.interact_with_patch(1), CommandOutcome::Accepted);
    }

    #[test]
    fn test_unknown_patch_rejected() {
        let mut session = session();
        assert_eq!(
            session.interact_with_patch(42),
            CommandOutcome::Rejected(RejectReason::UnknownPatch(42))
        );
        assert!(session.drain_messages().is_empty());
    }

    #[test]
    fn test_examine_patch_context() {
        let mut session = session();
        let request = session.examine_patch(1).unwrap();
        assert_eq!(request.object, "Herb Patch");
        assert_eq!(request.context, "Current stage: WEEDS.");
        assert_eq!(texts(&mut session), vec!["Examining Herb Patch..."]);

        assert!(session.examine_patch(9).is_none());
        assert!(session.examine_enemy(9).is_none());
    }

    #[test]
    fn test_record_examine_is_examine_kind() {
        let mut session = session();
        session.record_examine("A patch of weeds.");
        let messages = session.drain_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Examine);
    }

    #[test]
    fn test_dangling_target_is_cleared() {
        let mut session = session();
        session.active_target = Some(99);
        assert_eq!(session.resolve_target(), None);
        assert_eq!(session.active_target(), None);
    }

    #[test]
    fn test_reject_reason_serialization() {
        let json = serde_json::to_string(&RejectReason::EnemyDead(2)).unwrap();
        assert_eq!(json, r#"{"reason":"enemy_dead","id":2}"#);
    }
}
