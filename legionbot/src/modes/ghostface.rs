//! GhostFace: stalks chatters and hooks anyone caught twice.
//!
//! The first hit on a participant only marks them, and nobody is stalked
//! twice in one round. A hit on someone still marked from an earlier round
//! hooks them and ends the round. A successful `!reveal` chases GhostFace
//! away, but the revealer is marked for it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use legionbot_core::model::{
    ChannelState, ChatMessage, GHOSTFACE, GhostFaceState, Health, ModeState, Outcome, keys,
};
use legionbot_core::settings::{GhostFaceSettings, Settings};
use tracing::info;

use super::{Antagonist, should_react};
use crate::observability::metrics;
use crate::services::{Services, parse_command, roll};

const STALK_TIMER: &str = "!!gf_stalk!!";

#[derive(Debug, Clone, PartialEq, Eq)]
enum StalkResult {
    Ignored,
    Marked,
    /// Hooked; carries how many participants were stalked this round.
    Hooked(usize),
}

#[derive(Clone)]
pub struct GhostFace {
    services: Arc<Services>,
}

impl GhostFace {
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn arm_stalk(&self, channel: &str, duration: Duration) {
        let this = self.clone();
        let channel_owned = channel.to_string();
        self.services
            .timers
            .start(channel, STALK_TIMER, duration, async move {
                this.on_timeout(&channel_owned);
            });
    }

    fn on_timeout(&self, channel: &str) {
        let finished = self
            .services
            .finish_if_active(channel, GHOSTFACE, Outcome::Fail, |state| {
                Some(stalked_count(state))
            });
        if let Some((lang, count)) = finished {
            info!(channel, stalked = count, "ghostface left");
            self.services
                .say(channel, &lang, "gf_go_away", &[("COUNT", &count.to_string())]);
        }
    }

    fn hit(&self, channel: &str, username: &str) {
        let now = Utc::now();
        let (result, lang, cfg) = self.services.store.update(channel, |state| {
            let cfg = state.settings.modes.ghostface();
            let result = apply_stalk(state, username, now);
            (result, state.settings.language.clone(), cfg)
        });

        if let StalkResult::Hooked(count) = result {
            metrics::record_round_finished(GHOSTFACE, Outcome::Success);
            self.after_hook(channel, &lang, username, count, &cfg);
        }
    }

    fn after_hook(
        &self,
        channel: &str,
        lang: &str,
        username: &str,
        count: usize,
        cfg: &GhostFaceSettings,
    ) {
        let svc = &self.services;
        svc.timers.stop(channel, STALK_TIMER);
        svc.timers.stop(channel, username);
        svc.outbox
            .timeout_user(channel, username, cfg.hook_ban_time, "hooked by ghostface");
        svc.reply(channel, lang, "gf_hit_dead", username);
        svc.say(channel, lang, "gf_go_away", &[("COUNT", &count.to_string())]);
    }

    fn reveal(&self, channel: &str, username: &str) {
        let cfg = self.services.store.get(channel).settings.modes.ghostface();
        if !roll(cfg.reveal_chance) {
            let lang = self.services.store.get(channel).settings.language;
            self.services.reply(channel, &lang, "gf_reveal_fail", username);
            self.hit(channel, username);
            return;
        }

        let revealed = self
            .services
            .finish_if_active(channel, GHOSTFACE, Outcome::Fail, |state| {
                let Some(ModeState::GhostFace(gf)) = &mut state.mode_state else {
                    return None;
                };
                gf.stalked_this_round.insert(username.to_string());
                let stalked = gf.stalked_this_round.clone();
                let revealer = state.participant_mut(username);
                revealer.marked = true;
                revealer.stats.incr(keys::STUNS);
                state.clear_marks_except(&stalked);
                Some(stalked.len())
            });
        if let Some((lang, count)) = revealed {
            let svc = &self.services;
            svc.timers.stop(channel, STALK_TIMER);
            svc.reply(channel, &lang, "gf_reveal", username);
            svc.reply(channel, &lang, "gf_revealed", username);
            svc.say(channel, &lang, "gf_go_away", &[("COUNT", &count.to_string())]);
        }
    }
}

fn stalked_count(state: &ChannelState) -> usize {
    match &state.mode_state {
        Some(ModeState::GhostFace(gf)) => gf.stalked_this_round.len(),
        _ => 0,
    }
}

/// Mark-then-hook rule, applied inside the channel transaction.
fn apply_stalk(state: &mut ChannelState, username: &str, now: chrono::DateTime<Utc>) -> StalkResult {
    let stalked_already = match &state.mode_state {
        Some(ModeState::GhostFace(gf)) => gf.stalked_this_round.contains(username),
        _ => return StalkResult::Ignored,
    };
    if stalked_already || state.health_of(username).is_out() {
        return StalkResult::Ignored;
    }

    let marked = state.participant_mut(username).marked;
    if !marked {
        state.participant_mut(username).marked = true;
        if let Some(ModeState::GhostFace(gf)) = &mut state.mode_state {
            gf.stalked_this_round.insert(username.to_string());
        }
        state.last_activation = now;
        return StalkResult::Marked;
    }

    let stalked = match &state.mode_state {
        Some(ModeState::GhostFace(gf)) => gf.stalked_this_round.clone(),
        _ => return StalkResult::Ignored,
    };
    let participant = state.participant_mut(username);
    participant.marked = false;
    participant.set_health(Health::Hooked);
    participant.stats.incr(keys::HOOKS);
    state.clear_marks_except(&stalked);
    state.finish_round(Outcome::Success, now);
    StalkResult::Hooked(stalked.len())
}

#[async_trait]
impl Antagonist for GhostFace {
    fn name(&self) -> &'static str {
        GHOSTFACE
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.modes.ghostface().enabled
    }

    fn weight(&self, settings: &Settings) -> u32 {
        settings.modes.ghostface().weight
    }

    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool {
        if state.settings.modes.ghostface.is_some() {
            return false;
        }
        state.settings.modes.ghostface = Some(GhostFaceSettings::default());
        true
    }

    async fn start(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let Some(lang) = self
            .services
            .begin_round(channel, ModeState::GhostFace(GhostFaceState::default()))
        else {
            return;
        };
        let cfg = self.services.store.get(channel).settings.modes.ghostface();
        info!(channel, "ghostface round started");
        self.services.say(channel, &lang, "start_gf", &[]);
        self.arm_stalk(channel, cfg.timeout);
    }

    async fn handle_message(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let user = &message.username;
        let snapshot = self.services.store.get(channel);
        if snapshot.active_mode() != GHOSTFACE {
            return;
        }
        let lang = &snapshot.settings.language;
        let health = snapshot.health_of(user);

        if let Some((command, _)) = parse_command(&message.text) {
            match command.as_str() {
                "!killer" => self.services.say(channel, lang, "commands_gf", &[]),
                "!tbag" if health.is_out() => {
                    self.services.reply(channel, lang, "cant_do_rn", user);
                }
                "!tbag" => {
                    self.services.reply(channel, lang, "gf_tbag", user);
                    self.hit(channel, user);
                }
                "!reveal" => {
                    let marked = snapshot.participants.get(user.as_str()).is_some_and(|p| p.marked);
                    if health.is_out() || marked {
                        self.services.reply(channel, lang, "cant_do_rn", user);
                    } else {
                        self.reveal(channel, user);
                    }
                }
                _ => {}
            }
            return;
        }

        let cfg = snapshot.settings.modes.ghostface();
        if !should_react(
            snapshot.last_activation,
            Utc::now(),
            cfg.min_delay_between_hits,
            cfg.react_chance,
        ) {
            return;
        }
        match health {
            Health::Hooked => self.services.reply(channel, lang, "gf_on_hook_camp", user),
            Health::Dead => {}
            _ if self.services.identity.is_exempt(message) => {}
            _ => self.hit(channel, user),
        }
    }

    async fn handle_idle_message(&self, message: &ChatMessage) -> bool {
        match parse_command(&message.text) {
            Some((command, _)) if command == "!reveal" => {
                let lang = self.services.store.get(&message.channel).settings.language;
                self.services
                    .reply(&message.channel, &lang, "gf_reveal_wasted", &message.username);
                true
            }
            _ => false,
        }
    }

    fn time_remaining(&self, channel: &str) -> Duration {
        self.services.timers.remaining(channel, STALK_TIMER)
    }
}
