//! Chat platform gateway.
//!
//! [`ChatGateway`] is the seam to the chat platform. Outbound side effects
//! never call it directly: they go through the per-channel [`Outbox`] so
//! that a channel's actions keep program order and respect the rate limit.
//! Metadata lookups go through [`MetadataCache`].

pub mod cache;
pub mod console;
pub mod outbox;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legionbot_core::error::GatewayError;

pub use cache::MetadataCache;
pub use console::ConsoleGateway;
pub use outbox::{OutboundAction, Outbox};

/// Chat platform primitives.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Posts `text` into `channel` as the bot.
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), GatewayError>;

    /// Posts `text` into a channel the bot does not moderate.
    async fn send_foreign_message(&self, channel: &str, text: &str) -> Result<(), GatewayError>;

    async fn delete_message(&self, channel: &str, message_id: &str) -> Result<(), GatewayError>;

    async fn timeout_user(
        &self,
        channel: &str,
        username: &str,
        duration: Duration,
        reason: &str,
    ) -> Result<(), GatewayError>;

    async fn unban_user(&self, channel: &str, username: &str) -> Result<(), GatewayError>;

    async fn set_emote_only(&self, channel: &str, enabled: bool) -> Result<(), GatewayError>;

    /// Current concurrent viewers.
    async fn viewer_count(&self, channel: &str) -> Result<u32, GatewayError>;

    /// When the current broadcast went live, `None` when offline.
    async fn stream_start_time(&self, channel: &str)
    -> Result<Option<DateTime<Utc>>, GatewayError>;

    /// Lowercase names of users currently in chat.
    async fn viewer_list(&self, channel: &str) -> Result<Vec<String>, GatewayError>;
}
