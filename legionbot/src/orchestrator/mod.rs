//! Routes chat events to commands, the start gate, or the running mode.
//!
//! The orchestrator owns an ordered registry of modes and never looks at
//! their concrete types. Per message it:
//!
//! 1. drops the message if the channel is disabled or muted,
//! 2. registers the sender as a participant,
//! 3. runs generic commands,
//! 4. when idle, offers the message to idle handlers and evaluates the start
//!    gate; when a round is running, delegates to that mode.

pub mod commands;
pub mod selection;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use legionbot_core::error::EngineError;
use legionbot_core::model::{ChannelState, ChatMessage, Health, Whisper};
use tracing::{debug, info, warn};

use crate::modes::{self, Antagonist};
use crate::services::{Services, parse_command};

pub use selection::select_weighted;
pub use status::ChannelStatus;

/// Entry point for inbound chat events.
pub struct Orchestrator {
    services: Arc<Services>,
    modes: IndexMap<&'static str, Arc<dyn Antagonist>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("modes", &self.modes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator over the five built-in modes.
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        let modes = modes::builtin(&services);
        Self::with_modes(services, modes)
    }

    /// Orchestrator over an explicit registry; order is selection order.
    #[must_use]
    pub fn with_modes(services: Arc<Services>, modes: Vec<Arc<dyn Antagonist>>) -> Self {
        let modes = modes.into_iter().map(|m| (m.name(), m)).collect();
        Self { services, modes }
    }

    #[must_use]
    pub const fn services(&self) -> &Arc<Services> {
        &self.services
    }

    #[must_use]
    pub fn mode(&self, name: &str) -> Option<&Arc<dyn Antagonist>> {
        self.modes.get(name)
    }

    /// Startup migration over every persisted channel.
    ///
    /// Rounds cannot survive a restart because their timers are gone, so any
    /// recorded round is cleared. Missing mode settings are filled in, and
    /// participants left dead or bleeding are set to injured.
    pub fn init(&self) {
        let now = Utc::now();
        for channel in self.services.store.list_channel_names() {
            let aborted = self.services.store.update(&channel, |state| {
                let aborted = state.abort_round(now);
                self.ensure_defaults(state);
                for participant in state.participants.values_mut() {
                    if matches!(participant.health(), Health::Dead | Health::DeepWound) {
                        participant.set_health(Health::Injured);
                    }
                }
                aborted
            });
            if let Some(mode) = aborted {
                info!(channel = %channel, mode, "cleared stale round");
            }
        }
    }

    fn ensure_defaults(&self, state: &mut ChannelState) -> bool {
        self.modes
            .values()
            .fold(false, |changed, mode| mode.ensure_default_settings(state) | changed)
    }

    /// Handles one chat message.
    pub async fn handle_message(&self, message: &ChatMessage) {
        let mut message = message.clone();
        message.channel = message.channel.to_lowercase();
        message.username = message.username.to_lowercase();
        let channel = message.channel.clone();

        let now = Utc::now();
        let snapshot = self.services.store.update(&channel, |state| {
            if state.is_muted(now) {
                return None;
            }
            self.ensure_defaults(state);
            state.participant_mut(&message.username);
            Some(state.clone())
        });
        let Some(snapshot) = snapshot else {
            debug!(channel = %channel, "channel muted, message dropped");
            return;
        };
        let lang = snapshot.settings.language.clone();

        if commands::handle(&self.services, &message, &lang).await {
            return;
        }

        let active = snapshot.active_mode();
        if !active.is_empty() {
            match self.modes.get(active) {
                Some(mode) => mode.handle_message(&message).await,
                None => warn!(channel = %channel, mode = active, "active mode is not registered"),
            }
            return;
        }

        if parse_command(&message.text).is_some_and(|(c, _)| c == "!killer") {
            self.services.say(&channel, &lang, "commands_general", &[]);
            return;
        }
        for mode in self.modes.values() {
            if mode.handle_idle_message(&message).await {
                return;
            }
        }

        if self.evaluate(&snapshot).await.is_ready() {
            self.start_random_mode(&message).await;
        }
    }

    /// Starts a weighted-random enabled mode if the channel is idle.
    ///
    /// Returns the started mode's name.
    pub async fn start_random_mode(&self, trigger: &ChatMessage) -> Option<&'static str> {
        let channel = &trigger.channel;
        let state = self.services.store.get(channel);
        if !state.is_idle() || state.is_muted(Utc::now()) {
            return None;
        }
        let candidates = self.enabled_modes(&state);
        if candidates.is_empty() {
            debug!(channel = %channel, "no enabled modes");
            return None;
        }

        let min_viewers = state.settings.general.min_viewers;
        let viewers = self.services.metadata.viewer_count(channel).await;
        if viewers < min_viewers {
            debug!(channel = %channel, viewers, min_viewers, "not enough viewers");
            return None;
        }

        let chosen = select_weighted(&candidates, &mut rand::rng()).map(Arc::clone)?;
        info!(channel = %channel, mode = chosen.name(), "starting mode");
        chosen.start(trigger).await;
        Some(chosen.name())
    }

    /// Administrative start of a named mode.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ModeActive` if a round is running,
    /// `EngineError::ChannelMuted` if the channel is disabled or muted, and
    /// `EngineError::UnknownMode` if no mode has that name.
    pub async fn start_specific_mode(&self, channel: &str, name: &str) -> Result<(), EngineError> {
        let channel = channel.to_lowercase();
        let state = self.services.store.get(&channel);
        if !state.is_idle() {
            return Err(EngineError::ModeActive {
                channel,
                mode: state.active_mode().to_string(),
            });
        }
        if state.is_muted(Utc::now()) {
            return Err(EngineError::ChannelMuted(channel));
        }
        let mode = self
            .modes
            .get(name)
            .ok_or_else(|| EngineError::UnknownMode(name.to_string()))?;
        let trigger = ChatMessage::system(&channel, &self.services.identity.username);
        mode.start(&trigger).await;
        Ok(())
    }

    /// Offers a whisper to every channel with a running round.
    pub async fn handle_whisper(&self, username: &str, text: &str) {
        let now = Utc::now();
        for state in self.services.store.list_all() {
            if state.is_muted(now) || state.is_idle() {
                continue;
            }
            let Some(mode) = self.modes.get(state.active_mode()) else {
                continue;
            };
            let whisper = Whisper {
                channel: state.channel.clone(),
                username: username.to_lowercase(),
                text: text.to_string(),
            };
            mode.handle_whisper(&whisper).await;
        }
    }

    /// `channel` was raided by `from`.
    pub async fn raid_received(&self, channel: &str, from: &str) {
        let channel = channel.to_lowercase();
        let state = self.services.store.get(&channel);
        if !state.settings.chat.start_on_raid || state.is_muted(Utc::now()) || !state.is_idle() {
            return;
        }
        let candidates = self.enabled_modes(&state);
        let Some(chosen) = select_weighted(&candidates, &mut rand::rng()).map(Arc::clone) else {
            return;
        };
        info!(channel = %channel, from, mode = chosen.name(), "starting mode on raid");
        chosen
            .start(&ChatMessage::system(&channel, &from.to_lowercase()))
            .await;
    }

    /// `channel` raided `target`.
    pub fn raid_sent(&self, channel: &str, target: &str) {
        let state = self.services.store.get(&channel.to_lowercase());
        let chat = &state.settings.chat;
        if !chat.follow_raids || chat.follow_raids_message.is_empty() {
            return;
        }
        self.services
            .outbox
            .send_foreign_message(&target.to_lowercase(), chat.follow_raids_message.clone());
    }

    /// The broadcast in `channel` ended.
    pub fn stream_offline(&self, channel: &str) {
        self.services.metadata.invalidate(&channel.to_lowercase());
    }

    /// Readiness of `channel` for display.
    pub async fn channel_status(&self, channel: &str) -> ChannelStatus {
        let state = self.services.store.get(&channel.to_lowercase());
        self.evaluate(&state).await
    }

    /// Applies the start gate checks in order, stopping at the first that
    /// blocks.
    async fn evaluate(&self, state: &ChannelState) -> ChannelStatus {
        let now = Utc::now();
        let channel = &state.channel;
        if state.settings.disabled {
            return ChannelStatus::Disabled;
        }
        if let Some(until) = state.disabled_until.filter(|until| *until > now) {
            return ChannelStatus::Muted {
                remaining: (until - now).to_std().unwrap_or_default(),
            };
        }
        if !state.is_idle() {
            let mode = state.active_mode();
            let remaining = self
                .modes
                .get(mode)
                .map_or(Duration::ZERO, |m| m.time_remaining(channel));
            return ChannelStatus::Active { mode, remaining };
        }
        if self.enabled_modes(state).is_empty() {
            return ChannelStatus::AllModesDisabled;
        }

        let general = &state.settings.general;
        let since_last = (now - state.last_activation).to_std().unwrap_or_default();
        if since_last < general.delay_between_modes {
            return ChannelStatus::Cooldown {
                remaining: general.delay_between_modes - since_last,
            };
        }

        let Some(start) = self.services.metadata.stream_start(channel).await else {
            return ChannelStatus::Offline;
        };
        let live_for = (now - start).to_std().unwrap_or_default();
        if live_for < general.delay_at_stream_start {
            return ChannelStatus::StreamStartGrace {
                remaining: general.delay_at_stream_start - live_for,
            };
        }

        let viewers = self.services.metadata.viewer_count(channel).await;
        if viewers < general.min_viewers {
            return ChannelStatus::NotEnoughViewers {
                current: viewers,
                required: general.min_viewers,
            };
        }
        ChannelStatus::Ready
    }

    fn enabled_modes(&self, state: &ChannelState) -> Vec<(Arc<dyn Antagonist>, u32)> {
        self.modes
            .values()
            .filter(|m| m.enabled(&state.settings))
            .map(|m| (Arc::clone(m), m.weight(&state.settings)))
            .collect()
    }
}

