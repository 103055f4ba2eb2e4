//! Text completion backend.
//!
//! Used for Pinhead's word generation and guess classification, and for
//! replies when the bot is mentioned. Callers bound every call with their own
//! deadline and validate the raw reply with the helpers in [`parse`].

pub mod openai;
pub mod parse;

use async_trait::async_trait;
use legionbot_core::error::CompletionError;

pub use openai::OpenAiCompletion;

/// A chat-style completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Completes `user` under the instructions in `system`.
    ///
    /// `system` may be empty, in which case `user` carries the whole prompt.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

/// Backend used when no endpoint is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }
}
