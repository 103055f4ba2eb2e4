//! Collaborators shared by the orchestrator and every mode.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use legionbot_core::error::CompletionError;
use legionbot_core::model::{ChannelState, ChatMessage, ModeState, Outcome};
use tracing::warn;

use crate::completion::Completion;
use crate::gateway::{MetadataCache, Outbox};
use crate::i18n::Localizer;
use crate::observability::metrics;
use crate::store::ChannelStore;
use crate::timers::TimerService;

/// Who the bot is, for exemptions and mention detection.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Lowercase bot account name.
    pub username: String,
    /// Lowercase name of the bot's operator.
    pub owner: String,
    /// Extra lowercase names the bot answers to.
    pub aliases: Vec<String>,
}

impl Identity {
    /// Whether `username` is the bot account or its operator.
    #[must_use]
    pub fn is_staff(&self, username: &str) -> bool {
        username == self.username || (!self.owner.is_empty() && username == self.owner)
    }

    /// Senders that passive hits never target: the broadcaster, moderators,
    /// other bots and the operator.
    #[must_use]
    pub fn is_exempt(&self, message: &ChatMessage) -> bool {
        message.is_broadcaster()
            || message.is_moderator
            || message.username.contains("bot")
            || self.is_staff(&message.username)
    }

    /// Whether `text` names the bot or one of its aliases.
    #[must_use]
    pub fn is_mentioned(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        std::iter::once(&self.username)
            .chain(&self.aliases)
            .filter(|name| !name.is_empty())
            .any(|name| {
                text.split(|c: char| !c.is_alphanumeric() && c != '_')
                    .any(|word| word == name)
            })
    }
}

/// Everything a mode needs to act on a channel.
pub struct Services {
    pub store: ChannelStore,
    pub timers: TimerService,
    pub outbox: Outbox,
    pub metadata: MetadataCache,
    pub locales: Arc<dyn Localizer>,
    pub completion: Arc<dyn Completion>,
    pub identity: Identity,
    pub completion_timeout: Duration,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("store", &self.store)
            .field("identity", &self.identity)
            .field("completion_timeout", &self.completion_timeout)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Queues the localized `key` for `channel`.
    pub fn say(&self, channel: &str, lang: &str, key: &str, args: &[(&str, &str)]) {
        self.outbox
            .send_message(channel, self.locales.get(lang, key, args));
    }

    /// Queues a localized reply addressed to `username`.
    pub fn reply(&self, channel: &str, lang: &str, key: &str, username: &str) {
        self.say(channel, lang, key, &[("USERNAME", username)]);
    }

    /// Runs a completion bounded by the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or `CompletionError::Timeout`.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        tokio::time::timeout(self.completion_timeout, self.completion.complete(system, user))
            .await
            .map_err(|_| CompletionError::Timeout(self.completion_timeout))?
    }

    /// Starts a round if the channel is idle and returns its language.
    ///
    /// Logs a warning and returns `None` when a round is already running.
    pub fn begin_round(&self, channel: &str, state: ModeState) -> Option<String> {
        let mode = state.name();
        let lang = self.store.update(channel, |record| {
            record
                .begin_round(state, Utc::now())
                .then(|| record.settings.language.clone())
        });
        match lang {
            Some(lang) => {
                metrics::record_round_started(mode);
                Some(lang)
            }
            None => {
                warn!(channel, mode, "start ignored, a round is already running");
                None
            }
        }
    }

    /// Ends the round with `outcome` if `mode` is still the running one.
    ///
    /// `f` runs inside the same transaction first; returning `None` leaves
    /// the round running. Returns the channel language and the closure's
    /// result.
    pub fn finish_if_active<R>(
        &self,
        channel: &str,
        mode: &str,
        outcome: Outcome,
        f: impl FnOnce(&mut ChannelState) -> Option<R>,
    ) -> Option<(String, R)> {
        let result = self.store.update(channel, |record| {
            if record.active_mode() != mode {
                return None;
            }
            let extra = f(record)?;
            record.finish_round(outcome, Utc::now());
            Some((record.settings.language.clone(), extra))
        });
        if result.is_some() {
            metrics::record_round_finished(mode, outcome);
        }
        result
    }
}

/// Bernoulli trial with probability `chance`.
#[must_use]
pub fn roll(chance: f64) -> bool {
    rand::random::<f64>() < chance
}

/// Splits a `!command rest` message into its lowercase command word and the
/// remainder. Returns `None` for ordinary chat.
#[must_use]
pub fn parse_command(text: &str) -> Option<(String, &str)> {
    let text = text.trim_start();
    if !text.starts_with('!') {
        return None;
    }
    let (word, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    Some((word.to_lowercase(), rest.trim()))
}

/// Lowercase target name from command arguments, without a leading `@`.
#[must_use]
pub fn normalize_target(args: &str) -> Option<String> {
    args.split_whitespace()
        .next()
        .map(|name| name.trim_start_matches('@').to_lowercase())
        .filter(|name| !name.is_empty())
}
