//! Dredge: nightfall, and chat votes someone out.
//!
//! Chat is switched to emote-only for the night. Viewers whisper the bot the
//! name of a sacrifice; at dawn a unique plurality with more than one vote
//! is hooked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use legionbot_core::model::{
    ChannelState, ChatMessage, DREDGE, DredgeState, Health, ModeState, Outcome, Whisper, keys,
};
use legionbot_core::settings::{DredgeSettings, Settings};
use tracing::{debug, info};

use super::Antagonist;
use crate::observability::metrics;
use crate::services::{Services, normalize_target, parse_command};

const NIGHTFALL_TIMER: &str = "!!nightfall!!";

#[derive(Clone)]
pub struct Dredge {
    services: Arc<Services>,
}

impl Dredge {
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn arm_nightfall(&self, channel: &str, duration: Duration) {
        let this = self.clone();
        let channel_owned = channel.to_string();
        self.services
            .timers
            .start(channel, NIGHTFALL_TIMER, duration, async move {
                this.on_dawn(&channel_owned);
            });
    }

    fn on_dawn(&self, channel: &str) {
        let resolved = self.services.store.update(channel, |state| {
            let Some(ModeState::Dredge(dredge)) = &state.mode_state else {
                return None;
            };
            let winner = dredge
                .winner()
                .map(str::to_string)
                .filter(|w| !state.health_of(w).is_out());
            let lang = state.settings.language.clone();
            let cfg = state.settings.modes.dredge();
            let now = Utc::now();
            if let Some(winner) = &winner {
                let participant = state.participant_mut(winner);
                participant.set_health(Health::Hooked);
                participant.stats.incr(keys::HOOKS);
                state.finish_round(Outcome::Success, now);
            } else {
                state.finish_round(Outcome::Fail, now);
            }
            Some((lang, winner, cfg))
        });
        let Some((lang, winner, cfg)) = resolved else {
            return;
        };

        let svc = &self.services;
        svc.outbox.set_emote_only(channel, false);
        if let Some(winner) = winner {
            info!(channel, username = %winner, "dredge took a sacrifice");
            metrics::record_round_finished(DREDGE, Outcome::Success);
            svc.timers.stop(channel, &winner);
            svc.outbox
                .timeout_user(channel, &winner, cfg.hook_ban_time, "sacrificed to dredge");
            svc.reply(channel, &lang, "dredge_hit_dead", &winner);
        } else {
            info!(channel, "dredge left without a sacrifice");
            metrics::record_round_finished(DREDGE, Outcome::Fail);
            svc.say(channel, &lang, "dredge_go_away", &[]);
        }
    }
}

#[async_trait]
impl Antagonist for Dredge {
    fn name(&self) -> &'static str {
        DREDGE
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.modes.dredge().enabled
    }

    fn weight(&self, settings: &Settings) -> u32 {
        settings.modes.dredge().weight
    }

    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool {
        if state.settings.modes.dredge.is_some() {
            return false;
        }
        state.settings.modes.dredge = Some(DredgeSettings::default());
        true
    }

    async fn start(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let Some(lang) = self
            .services
            .begin_round(channel, ModeState::Dredge(DredgeState::default()))
        else {
            return;
        };
        let cfg = self.services.store.get(channel).settings.modes.dredge();
        info!(channel, "dredge round started");
        self.services.say(channel, &lang, "start_dredge", &[]);
        self.services.outbox.set_emote_only(channel, true);
        self.arm_nightfall(channel, cfg.timeout);
    }

    async fn handle_message(&self, message: &ChatMessage) {
        if let Some((command, _)) = parse_command(&message.text)
            && command == "!killer"
        {
            let lang = self.services.store.get(&message.channel).settings.language;
            self.services
                .say(&message.channel, &lang, "commands_dredge", &[]);
        }
    }

    async fn handle_whisper(&self, whisper: &Whisper) {
        let voter = whisper.username.to_lowercase();
        if voter == whisper.channel
            || voter.contains("bot")
            || self.services.identity.is_staff(&voter)
        {
            return;
        }
        let Some(nominee) = normalize_target(&whisper.text) else {
            return;
        };

        let recorded = self.services.store.update(&whisper.channel, |state| {
            let Some(ModeState::Dredge(dredge)) = &mut state.mode_state else {
                return false;
            };
            dredge.votes.insert(voter.clone(), nominee.clone());
            true
        });
        if recorded {
            debug!(channel = %whisper.channel, voter = %voter, nominee = %nominee, "dredge vote recorded");
        }
    }

    fn time_remaining(&self, channel: &str) -> Duration {
        self.services.timers.remaining(channel, NIGHTFALL_TIMER)
    }
}

