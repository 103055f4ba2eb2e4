//! Commands that work regardless of the running mode.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use legionbot_core::model::{ChannelState, ChatMessage, DREDGE, Health, keys};
use tracing::{info, warn};

use crate::completion::parse;
use crate::observability::metrics;
use crate::services::{Services, normalize_target, parse_command};

/// Reply produced by a command transaction: locale key and the user it
/// names.
type Reply = (&'static str, String);

/// Runs a generic command or mention reply.
///
/// Returns `true` when the message was consumed.
pub async fn handle(services: &Arc<Services>, message: &ChatMessage, lang: &str) -> bool {
    let channel = &message.channel;
    let user = &message.username;

    let Some((command, args)) = parse_command(&message.text) else {
        if services.identity.is_mentioned(&message.text) && !services.identity.is_staff(user) {
            spawn_mention_reply(services, message, lang);
            return true;
        }
        return false;
    };

    let reply = match command.as_str() {
        "!legiontimeout" => {
            if message.is_broadcaster() {
                legion_timeout(services, channel, lang, args);
            }
            return true;
        }
        "!hp" => {
            let target = normalize_target(args).unwrap_or_else(|| user.clone());
            let health = services
                .store
                .update(channel, |state| state.participant_mut(&target).health());
            (health.as_str(), target)
        }
        "!heal" => {
            let target = normalize_target(args).unwrap_or_else(|| user.clone());
            let (reply, healed) = services
                .store
                .update(channel, |state| heal(state, user, &target));
            if healed {
                services.timers.stop(channel, &target);
            }
            reply
        }
        "!unhook" => {
            let target = normalize_target(args).unwrap_or_else(|| user.clone());
            let (reply, unhooked) = services
                .store
                .update(channel, |state| unhook(state, user, &target));
            if unhooked {
                services.timers.stop(channel, &target);
                services.outbox.unban_user(channel, &target);
            }
            reply
        }
        "!mend" => {
            let (reply, mended) = services.store.update(channel, |state| mend(state, user));
            if mended {
                services.timers.stop(channel, user);
            }
            reply
        }
        _ => return false,
    };

    let (key, name) = reply;
    services.reply(channel, lang, key, &name);
    true
}

fn legion_timeout(services: &Services, channel: &str, lang: &str, args: &str) {
    let raw = args.trim();
    let duration = match humantime::parse_duration(raw) {
        Ok(d) if !d.is_zero() => d,
        _ => {
            services.say(channel, lang, "legiontimeout_invalid", &[("VALUE", raw)]);
            return;
        }
    };
    let aborted = mute(services, channel, duration);
    if aborted == Some(DREDGE) {
        services.outbox.set_emote_only(channel, false);
    }
    let shown = humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string();
    services.say(channel, lang, "legiontimeout_set", &[("DURATION", &shown)]);
}

/// Mutes `channel` for `duration`, aborting any running round and its
/// timers in the same transaction. Returns the aborted mode.
pub fn mute(services: &Services, channel: &str, duration: Duration) -> Option<&'static str> {
    let now = Utc::now();
    let until = chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
    let aborted = services.store.update(channel, |state| {
        state.disabled_until = Some(until);
        services.timers.stop_all(channel);
        state.abort_round(now)
    });
    info!(channel, until = %until, aborted = aborted.unwrap_or(""), "channel muted");
    if aborted.is_some() {
        metrics::record_round_aborted();
    }
    aborted
}

fn heal(state: &mut ChannelState, healer: &str, target: &str) -> (Reply, bool) {
    if healer == target {
        return (("cant_heal_self", healer.to_string()), false);
    }
    if state.health_of(healer).is_out() {
        return (("cant_do_rn", healer.to_string()), false);
    }
    match state.participant_mut(target).health() {
        health @ (Health::Healthy | Health::Hooked | Health::Dead) => {
            ((health.as_str(), target.to_string()), false)
        }
        Health::Injured | Health::DeepWound => {
            state.participant_mut(target).set_health(Health::Healthy);
            state.participant_mut(healer).stats.incr(keys::HEALS);
            (("on_heal", target.to_string()), true)
        }
    }
}

fn unhook(state: &mut ChannelState, rescuer: &str, target: &str) -> (Reply, bool) {
    if rescuer == target {
        return (("cant_unhook_self", rescuer.to_string()), false);
    }
    if state.health_of(rescuer).is_out() {
        return (("cant_do_rn", rescuer.to_string()), false);
    }
    if state.participant_mut(target).health() != Health::Hooked {
        return (("not_hooked", target.to_string()), false);
    }
    state.participant_mut(target).set_health(Health::Healthy);
    state.participant_mut(rescuer).stats.incr(keys::UNHOOKS);
    (("on_unhooked", target.to_string()), true)
}

fn mend(state: &mut ChannelState, user: &str) -> (Reply, bool) {
    let participant = state.participant_mut(user);
    if participant.health() != Health::DeepWound {
        return (("not_deep_wound", user.to_string()), false);
    }
    participant.set_health(Health::Injured);
    (("on_mend", user.to_string()), true)
}

fn spawn_mention_reply(services: &Arc<Services>, message: &ChatMessage, lang: &str) {
    let services = Arc::clone(services);
    let message = message.clone();
    let lang = lang.to_string();
    tokio::spawn(async move {
        let system = services.locales.get(&lang, "generic_response_prompt", &[]);
        let text = match services.complete(&system, &message.text).await {
            Ok(raw) => parse::free_text(&raw),
            Err(e) => Err(e),
        };
        match text {
            Ok(text) => services
                .outbox
                .send_message(&message.channel, format!("@{} {text}", message.username)),
            Err(e) => warn!(channel = %message.channel, error = %e, "mention reply failed"),
        }
    });
}
