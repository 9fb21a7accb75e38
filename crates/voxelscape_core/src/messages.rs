//! Tagged text events emitted on state transitions.
//!
//! The session only appends; whoever drains the outbox decides how much
//! history to keep. [`MessageLog`] is the bounded history the headless
//! runner uses.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::Timestamp;

/// Greeting every fresh log starts with.
pub const WELCOME_TEXT: &str = "Welcome to VoxelScape.";

/// Severity/category of a message, used by the presentation layer for color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Neutral information.
    Info,
    /// Something the player did.
    Action,
    /// Flavor text from examining an object.
    Examine,
    /// The player died.
    Danger,
}

/// One emitted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Display text.
    pub text: String,
    /// Category.
    pub kind: MessageKind,
    /// Simulation time of emission.
    pub at_ms: Timestamp,
}

impl GameMessage {
    /// Create a message.
    #[must_use]
    pub fn new(text: impl Into<String>, kind: MessageKind, at_ms: Timestamp) -> Self {
        Self {
            text: text.into(),
            kind,
            at_ms,
        }
    }
}

/// Bounded FIFO of recent messages; the oldest entry is dropped when full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    capacity: usize,
    entries: VecDeque<GameMessage>,
}

impl MessageLog {
    /// Create a log holding at most `capacity` messages, seeded with the
    /// welcome greeting.
    ///
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity);
        entries.push_back(GameMessage::new(WELCOME_TEXT, MessageKind::Info, 0));
        Self { capacity, entries }
    }

    /// Append a message, evicting the oldest if full.
    pub fn push(&mut self, message: GameMessage) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
    }

    /// Append every message from an iterator, in order.
    pub fn extend<I: IntoIterator<Item = GameMessage>>(&mut self, messages: I) {
        for message in messages {
            self.push(message);
        }
    }

    /// Messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &GameMessage> {
        self.entries.iter()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no messages are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent message.
    #[must_use]
    pub fn latest(&self) -> Option<&GameMessage> {
        self.entries.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_starts_with_welcome() {
        let log = MessageLog::new(16);
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().map(|m| m.text.as_str()), Some(WELCOME_TEXT));
    }

    #[test]
    fn test_log_drops_oldest_when_full() {
        let mut log = MessageLog::new(3);
        for i in 0..5 {
            log.push(GameMessage::new(format!("msg {i}"), MessageKind::Action, i));
        }

        let texts: Vec<_> = log.iter().map(|m| m.text.clone()).collect();
        assert_eq!(texts, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut log = MessageLog::new(0);
        log.push(GameMessage::new("only", MessageKind::Danger, 1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().map(|m| m.kind), Some(MessageKind::Danger));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MessageKind::Danger).unwrap();
        assert_eq!(json, "\"danger\"");
    }
}
