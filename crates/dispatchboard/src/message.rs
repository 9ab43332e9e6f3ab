//! Broadcast messages.

use serde::{Deserialize, Serialize};

/// Maximum number of messages kept in the history.
///
/// Adding a message beyond this evicts the oldest ones silently.
pub const MESSAGE_HISTORY_LIMIT: usize = 100;

/// Urgency of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational.
    Low,
    /// Normal operational traffic.
    #[default]
    Medium,
    /// Needs immediate attention.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.pad("low"),
            Self::Medium => f.pad("medium"),
            Self::High => f.pad("high"),
        }
    }
}

/// A stored broadcast message. Messages are never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, `MSG-<millis>-<suffix>`.
    pub id: String,
    /// Sender label.
    pub from: String,
    /// Message body.
    pub message: String,
    /// Free-text time label.
    pub time: String,
    /// Urgency.
    pub priority: Priority,
    /// Channel the message was broadcast on.
    pub channel: String,
}

/// The caller-supplied fields of a new message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Sender label.
    pub from: String,
    /// Message body.
    pub message: String,
    /// Free-text time label.
    pub time: String,
    /// Urgency.
    pub priority: Priority,
    /// Channel to broadcast on.
    pub channel: String,
}

impl NewMessage {
    /// Attach an identifier, producing the stored form.
    #[must_use]
    pub fn into_message(self, id: String) -> Message {
        Message {
            id,
            from: self.from,
            message: self.message,
            time: self.time,
            priority: self.priority,
            channel: self.channel,
        }
    }
}

/// Put `message` at the front of `history` and drop anything past the limit.
pub(crate) fn push_front_bounded(history: &mut Vec<Message>, message: Message) {
    history.insert(0, message);
    history.truncate(MESSAGE_HISTORY_LIMIT);
}
