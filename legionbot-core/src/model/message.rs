use serde::{Deserialize, Serialize};

/// Inbound chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Platform message id, used for deletion.
    pub id: String,
    pub channel: String,
    /// Lowercase sender name.
    pub username: String,
    pub is_moderator: bool,
    pub text: String,
}

impl ChatMessage {
    /// Synthetic message used when the engine starts a round on its own.
    #[must_use]
    pub fn system(channel: &str, username: &str) -> Self {
        Self {
            id: String::new(),
            channel: channel.to_string(),
            username: username.to_string(),
            is_moderator: false,
            text: String::new(),
        }
    }

    /// Whether the sender is the channel owner.
    #[must_use]
    pub fn is_broadcaster(&self) -> bool {
        self.username == self.channel
    }
}

/// Private message routed to a channel with an active round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whisper {
    pub channel: String,
    pub username: String,
    pub text: String,
}
