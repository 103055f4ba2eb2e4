//! Per-participant bleed-out and recovery timers.
//!
//! Both timers use the participant's name as the timer key, so healing,
//! mending or unhooking a participant only has to stop that one key.

use std::sync::Arc;
use std::time::Duration;

use legionbot_core::model::{Health, keys};
use tracing::debug;

use crate::services::Services;

/// Arms the bleed-out for `username`: still deep-wounded after
/// `deep_wound_timeout` means dead, banned for `ban`, then recovered to
/// injured once the ban has run out.
pub fn arm_bleed_out(
    services: &Arc<Services>,
    channel: &str,
    username: &str,
    deep_wound_timeout: Duration,
    ban: Duration,
) {
    let svc = Arc::clone(services);
    let channel_owned = channel.to_string();
    let user = username.to_string();
    services.timers.start(channel, username, deep_wound_timeout, async move {
        bleed_out(&svc, &channel_owned, &user, ban);
    });
}

fn bleed_out(services: &Arc<Services>, channel: &str, username: &str, ban: Duration) {
    let lang = services.store.update(channel, |state| {
        if state.health_of(username) != Health::DeepWound {
            return None;
        }
        let participant = state.participant_mut(username);
        participant.set_health(Health::Dead);
        participant.stats.incr(keys::BLEED_OUTS);
        Some(state.settings.language.clone())
    });
    let Some(lang) = lang else {
        debug!(channel, username, "bleed-out skipped, participant no longer deep-wounded");
        return;
    };

    services
        .outbox
        .timeout_user(channel, username, ban, "bled out");
    services.reply(channel, &lang, "on_dead", username);
    arm_recovery(services, channel, username, ban);
}

/// Arms the dead → injured recovery for `username` after `after`.
pub fn arm_recovery(services: &Arc<Services>, channel: &str, username: &str, after: Duration) {
    let svc = Arc::clone(services);
    let channel_owned = channel.to_string();
    let user = username.to_string();
    services.timers.start(channel, username, after, async move {
        svc.store.update(&channel_owned, |state| {
            if state.health_of(&user) == Health::Dead {
                state.participant_mut(&user).set_health(Health::Injured);
            }
        });
    });
}
