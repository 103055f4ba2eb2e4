//! Legion: a frenzy that wounds whoever talks.
//!
//! Every hit deep-wounds its target and extends the frenzy. The hit that
//! would reach `fatal_hit` hooks instead. Hitting someone who is already
//! deep-wounded lets them body-block, which ends the frenzy. Survivors can
//! fight back with `!pallet`, `!locker` and `!tbag`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use legionbot_core::model::{
    ChannelState, ChatMessage, Health, LEGION, LegionState, ModeState, Outcome, keys,
};
use legionbot_core::settings::{LegionSettings, Settings};
use tracing::{debug, info};

use super::{Antagonist, should_react, wounds};
use crate::observability::metrics;
use crate::services::{Services, parse_command, roll};

const FRENZY_TIMER: &str = "!!frenzy!!";

/// Result of one hit transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HitResult {
    /// Mode ended or target not eligible.
    Ignored,
    Missed,
    Hooked,
    BodyBlocked,
    Wounded { prefinal: bool },
}

#[derive(Clone)]
pub struct Legion {
    services: Arc<Services>,
}

impl Legion {
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn arm_frenzy(&self, channel: &str, duration: Duration) {
        let this = self.clone();
        let channel_owned = channel.to_string();
        self.services
            .timers
            .start(channel, FRENZY_TIMER, duration, async move {
                this.on_frenzy_timeout(&channel_owned);
            });
    }

    fn on_frenzy_timeout(&self, channel: &str) {
        if let Some((lang, ())) =
            self.services
                .finish_if_active(channel, LEGION, Outcome::Fail, |_| Some(()))
        {
            info!(channel, "legion frenzy timed out");
            self.services.say(channel, &lang, "frenzy_timeout", &[]);
        }
    }

    /// Stops the frenzy and the target's bleed-out after a round-ending hook.
    fn hook_side_effects(&self, channel: &str, username: &str, cfg: &LegionSettings) {
        let svc = &self.services;
        svc.timers.stop(channel, FRENZY_TIMER);
        svc.timers.stop(channel, username);
        svc.outbox
            .timeout_user(channel, username, cfg.hook_ban_time, "hooked by legion");
    }

    /// Applies a hit on `username`.
    fn hit(&self, channel: &str, username: &str) {
        let now = Utc::now();
        let (result, lang, cfg) = self.services.store.update(channel, |state| {
            let cfg = state.settings.modes.legion();
            let lang = state.settings.language.clone();
            let result = apply_hit(state, username, &cfg, now);
            (result, lang, cfg)
        });

        let svc = &self.services;
        match result {
            HitResult::Ignored => {}
            HitResult::Missed => {
                svc.timers.stop(channel, FRENZY_TIMER);
                svc.reply(channel, &lang, "on_frenzy_miss", username);
            }
            HitResult::Hooked => {
                self.hook_side_effects(channel, username, &cfg);
                svc.reply(channel, &lang, "on_frenzy_hit_dead", username);
            }
            HitResult::BodyBlocked => {
                svc.timers.stop(channel, FRENZY_TIMER);
                wounds::arm_bleed_out(
                    svc,
                    channel,
                    username,
                    cfg.deep_wound_timeout,
                    cfg.bleed_out_ban_time,
                );
                svc.reply(channel, &lang, "on_frenzy_hit_deep_wound", username);
            }
            HitResult::Wounded { prefinal } => {
                wounds::arm_bleed_out(
                    svc,
                    channel,
                    username,
                    cfg.deep_wound_timeout,
                    cfg.bleed_out_ban_time,
                );
                self.arm_frenzy(channel, cfg.frenzy_timeout);
                let key = if prefinal {
                    "on_frenzy_hit_prefinal"
                } else {
                    "on_frenzy_hit"
                };
                svc.reply(channel, &lang, key, username);
            }
        }

        if let Some(outcome) = result.outcome() {
            debug!(channel, username, outcome = outcome.as_str(), "legion round resolved");
            metrics::record_round_finished(LEGION, outcome);
        }
    }

    /// Runs `!pallet` or `!locker` for `username`.
    fn stun_attempt(&self, channel: &str, username: &str, locker: bool) {
        let (stunned, lang, cfg) = self.services.store.update(channel, |state| {
            let cfg = state.settings.modes.legion();
            let lang = state.settings.language.clone();
            if state.active_mode() != LEGION {
                return (None, lang, cfg);
            }
            let chance = if locker {
                cfg.locker_stun_chance
            } else {
                cfg.pallet_stun_chance
            };
            if roll(chance) {
                state.participant_mut(username).stats.incr(keys::STUNS);
                state.finish_round(Outcome::Stun, Utc::now());
                (Some(true), lang, cfg)
            } else {
                (Some(false), lang, cfg)
            }
        });

        let svc = &self.services;
        match stunned {
            None => {}
            Some(true) => {
                metrics::record_round_finished(LEGION, Outcome::Stun);
                svc.timers.stop(channel, FRENZY_TIMER);
                let key = if locker { "locker_success" } else { "pallet_success" };
                svc.reply(channel, &lang, key, username);
            }
            Some(false) if locker => {
                svc.reply(channel, &lang, "locker_failed", username);
                self.locker_grab(channel, username, &cfg);
            }
            Some(false) => {
                svc.reply(channel, &lang, "pallet_failed", username);
                self.hit(channel, username);
            }
        }
    }

    fn locker_grab(&self, channel: &str, username: &str, cfg: &LegionSettings) {
        if !roll(cfg.locker_grab_chance) {
            self.hit(channel, username);
            return;
        }
        let hooked = self.services.finish_if_active(channel, LEGION, Outcome::Success, |state| {
            let participant = state.participant_mut(username);
            participant.set_health(Health::Hooked);
            participant.stats.incr(keys::HOOKS);
            Some(())
        });
        if let Some((lang, ())) = hooked {
            self.hook_side_effects(channel, username, cfg);
            self.services.reply(channel, &lang, "locker_grab", username);
        }
    }
}

impl HitResult {
    const fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Missed => Some(Outcome::Miss),
            Self::Hooked => Some(Outcome::Success),
            Self::BodyBlocked => Some(Outcome::BodyBlock),
            Self::Ignored | Self::Wounded { .. } => None,
        }
    }
}

/// Hit rules, applied inside the channel transaction.
fn apply_hit(
    state: &mut ChannelState,
    username: &str,
    cfg: &LegionSettings,
    now: chrono::DateTime<Utc>,
) -> HitResult {
    let Some(ModeState::Legion(legion)) = &state.mode_state else {
        return HitResult::Ignored;
    };
    let hit_count = legion.hit_count;
    let health = state.health_of(username);
    if health.is_out() {
        return HitResult::Ignored;
    }

    if !roll(cfg.hit_chance) {
        state.finish_round(Outcome::Miss, now);
        return HitResult::Missed;
    }

    if hit_count + 1 >= cfg.fatal_hit {
        let participant = state.participant_mut(username);
        participant.set_health(Health::Hooked);
        participant.stats.incr(keys::HOOKS);
        state.finish_round(Outcome::Success, now);
        return HitResult::Hooked;
    }

    if health == Health::DeepWound {
        if !roll(cfg.body_block_success_chance) {
            return HitResult::Ignored;
        }
        state
            .participant_mut(username)
            .stats
            .incr(keys::BODY_BLOCKS);
        state.finish_round(Outcome::BodyBlock, now);
        return HitResult::BodyBlocked;
    }

    let new_count = hit_count + 1;
    if let Some(ModeState::Legion(legion)) = &mut state.mode_state {
        legion.hit_count = new_count;
    }
    state.stats.incr(keys::HITS);
    state.last_activation = now;
    let participant = state.participant_mut(username);
    participant.stats.incr(keys::HITS);
    participant.set_health(Health::DeepWound);
    HitResult::Wounded {
        prefinal: new_count + 1 >= cfg.fatal_hit,
    }
}

#[async_trait]
impl Antagonist for Legion {
    fn name(&self) -> &'static str {
        LEGION
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.modes.legion().enabled
    }

    fn weight(&self, settings: &Settings) -> u32 {
        settings.modes.legion().weight
    }

    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool {
        if state.settings.modes.legion.is_some() {
            return false;
        }
        state.settings.modes.legion = Some(LegionSettings::default());
        true
    }

    async fn start(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let Some(lang) = self
            .services
            .begin_round(channel, ModeState::Legion(LegionState::default()))
        else {
            return;
        };
        let cfg = self.services.store.get(channel).settings.modes.legion();
        info!(channel, "legion round started");
        self.services.say(channel, &lang, "start_legion", &[]);
        self.arm_frenzy(channel, cfg.frenzy_timeout);
    }

    async fn handle_message(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let user = &message.username;
        let snapshot = self.services.store.get(channel);
        if snapshot.active_mode() != LEGION {
            return;
        }
        let lang = &snapshot.settings.language;
        let health = snapshot.health_of(user);

        if let Some((command, _)) = parse_command(&message.text) {
            let wasted = match command.as_str() {
                "!killer" => {
                    self.services.say(channel, lang, "commands_legion", &[]);
                    return;
                }
                "!pallet" => "pallet_wasted",
                "!locker" => "locker_wasted",
                "!tbag" => "tbag_wasted",
                _ => return,
            };
            if health.is_out() {
                self.services.reply(channel, lang, "cant_do_rn", user);
            } else if health == Health::DeepWound {
                self.services.reply(channel, lang, wasted, user);
            } else {
                match command.as_str() {
                    "!pallet" => self.stun_attempt(channel, user, false),
                    "!locker" => self.stun_attempt(channel, user, true),
                    _ => {
                        self.services.reply(channel, lang, "tbag_success", user);
                        self.hit(channel, user);
                    }
                }
            }
            return;
        }

        let cfg = snapshot.settings.modes.legion();
        if !should_react(
            snapshot.last_activation,
            Utc::now(),
            cfg.min_delay_between_hits,
            cfg.react_chance,
        ) {
            return;
        }
        match health {
            Health::Hooked => self.services.reply(channel, lang, "on_hook_camp", user),
            Health::Dead => self.services.reply(channel, lang, "on_dead_camp", user),
            _ if self.services.identity.is_exempt(message) => {}
            _ => self.hit(channel, user),
        }
    }

    async fn handle_idle_message(&self, message: &ChatMessage) -> bool {
        let Some((command, _)) = parse_command(&message.text) else {
            return false;
        };
        let key = match command.as_str() {
            "!pallet" => "pallet_wasted",
            "!locker" => "locker_wasted",
            "!tbag" => "tbag_wasted",
            _ => return false,
        };
        let lang = self.services.store.get(&message.channel).settings.language;
        self.services
            .reply(&message.channel, &lang, key, &message.username);
        true
    }

    fn time_remaining(&self, channel: &str) -> Duration {
        self.services.timers.remaining(channel, FRENZY_TIMER)
    }
}
