//! JSON protocol for headless session communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses and session state
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","now_ms":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Every command is answered; new chat-log lines follow as `messages`
//! 4. `quit` is answered with `bye` and the runner exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","now_ms":0}
//! -> {"cmd":"attack","enemy_id":1}
//! <- {"type":"ack","cmd":"attack"}
//! <- {"type":"messages","messages":[{"text":"You attack the Goblin!","kind":"action","at_ms":0}]}
//! -> {"cmd":"advance","ms":1200}
//! <- {"type":"events","now_ms":1200,"events":{...}}
//! -> {"cmd":"interact","patch_id":1}
//! <- {"type":"ack","cmd":"interact","redirected":true}
//! -> {"cmd":"hash"}
//! <- {"type":"hash","now_ms":1200,"hash":1234567890}
//! ```

use serde::{Deserialize, Serialize};
use voxelscape_core::components::{Enemy, EnemyId, EnemyPhase, Player};
use voxelscape_core::farming::{FarmingPatch, FarmingStage, PatchId};
use voxelscape_core::math::Vec2Fixed;
use voxelscape_core::messages::GameMessage;
use voxelscape_core::progression::SkillLevels;
use voxelscape_core::session::RejectReason;
use voxelscape_core::simulation::TickEvents;

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Longest clock jump a single `advance` may request (one hour).
pub const MAX_ADVANCE_MS: u64 = 3_600_000;

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the clock by `ms` (default: one combat tick, at most
    /// [`MAX_ADVANCE_MS`]).
    Advance {
        #[serde(default)]
        ms: Option<u64>,
    },

    /// Walk to a ground point.
    Move { x: f64, z: f64 },

    /// Attack an enemy.
    Attack { enemy_id: EnemyId },

    /// Work a farming patch (or walk to it).
    Interact { patch_id: PatchId },

    /// Ask for flavor text about a patch.
    Examine { patch_id: PatchId },

    /// Ask for flavor text about an enemy.
    ExamineEnemy { enemy_id: EnemyId },

    /// Query current session state without advancing time.
    Query,

    /// Replay the retained chat log.
    Messages,

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, now_ms: u64 },

    /// Command applied. `redirected` marks an interaction turned into a walk.
    Ack {
        cmd: String,
        #[serde(default, skip_serializing_if = "is_false")]
        redirected: bool,
    },

    /// Command refused; state unchanged.
    Rejected { cmd: String, reason: RejectReason },

    /// What happened during an `advance`.
    Events { now_ms: u64, events: TickEvents },

    /// Current session state.
    State(Box<StateView>),

    /// Chat-log lines.
    Messages { messages: Vec<GameMessage> },

    /// State hash for determinism verification.
    Hash { now_ms: u64, hash: u64 },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// State Types
// ============================================================================

/// Full session snapshot for a `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub now_ms: u64,
    pub ticks: u64,
    pub player: PlayerView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EnemyId>,
    pub levels: SkillLevels,
    pub total_level: u32,
    pub enemies: Vec<EnemyView>,
    pub patches: Vec<PatchView>,
    pub hash: u64,
}

/// The player as seen by a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub x: f64,
    pub z: f64,
    pub hp: u32,
    pub max_hp: u32,
    pub dying: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<[f64; 2]>,
}

/// One enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyView {
    pub id: EnemyId,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub x: f64,
    pub z: f64,
    pub phase: EnemyPhase,
}

/// One farming patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchView {
    pub id: PatchId,
    pub name: String,
    pub x: f64,
    pub z: f64,
    pub stage: FarmingStage,
    pub growth_timer: u32,
}

fn coords(point: Vec2Fixed) -> [f64; 2] {
    [point.x.to_num(), point.z.to_num()]
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        let [x, z] = coords(player.position);
        Self {
            x,
            z,
            hp: player.stats.current_hp(),
            max_hp: player.stats.max_hp(),
            dying: player.is_dying(),
            destination: player.destination.map(coords),
        }
    }
}

impl From<&Enemy> for EnemyView {
    fn from(enemy: &Enemy) -> Self {
        let [x, z] = coords(enemy.position);
        Self {
            id: enemy.id,
            name: enemy.name.clone(),
            level: enemy.level,
            hp: enemy.current_hp,
            max_hp: enemy.max_hp,
            x,
            z,
            phase: enemy.phase(),
        }
    }
}

impl From<&FarmingPatch> for PatchView {
    fn from(patch: &FarmingPatch) -> Self {
        let [x, z] = coords(patch.position);
        Self {
            id: patch.id,
            name: patch.name.clone(),
            x,
            z,
            stage: patch.stage(),
            growth_timer: patch.growth_timer(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(now_ms: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            now_ms,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            redirected: false,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Move { .. } => "move",
            Self::Attack { .. } => "attack",
            Self::Interact { .. } => "interact",
            Self::Examine { .. } => "examine",
            Self::ExamineEnemy { .. } => "examine_enemy",
            Self::Query => "query",
            Self::Messages => "messages",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advance_command() {
        let cmd = Command::from_json(r#"{"cmd":"advance","ms":1200}"#).unwrap();
        assert_eq!(cmd, Command::Advance { ms: Some(1200) });
    }

    #[test]
    fn test_default_advance_is_one_tick() {
        let cmd = Command::from_json(r#"{"cmd":"advance"}"#).unwrap();
        assert_eq!(cmd, Command::Advance { ms: None });
    }

    #[test]
    fn test_parse_move_command() {
        let json = r#"{"cmd":"move","x":2.5,"z":-4.0}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Move { x, z } if x == 2.5 && z == -4.0));
    }

    #[test]
    fn test_unknown_command_fails() {
        assert!(Command::from_json(r#"{"cmd":"teleport","x":1}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_names_match_tags() {
        let commands = [
            Command::Advance { ms: None },
            Command::Attack { enemy_id: 1 },
            Command::ExamineEnemy { enemy_id: 1 },
            Command::Quit,
        ];
        for cmd in commands {
            let json = serde_json::to_string(&cmd).unwrap();
            assert!(json.contains(&format!(r#""cmd":"{}""#, cmd.name())), "{json}");
        }
    }

    #[test]
    fn test_ack_omits_redirected_unless_set() {
        assert_eq!(Response::ack("move").to_json_line(), "{\"type\":\"ack\",\"cmd\":\"move\"}\n");

        let redirected = Response::Ack {
            cmd: "interact".to_string(),
            redirected: true,
        };
        assert!(redirected.to_json_line().contains(r#""redirected":true"#));
    }

    #[test]
    fn test_serialize_rejected_response() {
        let resp = Response::Rejected {
            cmd: "attack".to_string(),
            reason: RejectReason::EnemyDead(2),
        };
        let json = resp.to_json_line();
        assert!(json.contains(r#""type":"rejected""#));
        assert!(json.contains(r#""reason":{"reason":"enemy_dead","id":2}"#), "{json}");
    }

    #[test]
    fn test_player_view_uses_decimal_coordinates() {
        let mut player = Player::new(voxelscape_core::math::Fixed::from_num(240), Vec2Fixed::ZERO);
        player.position = Vec2Fixed::new(
            voxelscape_core::math::Fixed::from_num(1.5),
            voxelscape_core::math::Fixed::from_num(-2),
        );

        let view = PlayerView::from(&player);
        assert_eq!((view.x, view.z), (1.5, -2.0));
        assert_eq!((view.hp, view.max_hp), (10, 10));
        assert!(!view.dying);
        assert_eq!(view.destination, None);
    }

    #[test]
    fn test_ready_line() {
        let json = Response::ready(0).to_json_line();
        assert_eq!(json, "{\"type\":\"ready\",\"version\":\"1.0\",\"now_ms\":0}\n");
    }
}
