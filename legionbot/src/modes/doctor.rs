//! Doctor: madness that scrambles chat.
//!
//! While the round runs, a reacting hit deletes the sender's message and
//! posts a garbled copy. Nobody can be hooked; the round always ends when
//! the madness timer runs out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use legionbot_core::model::{ChannelState, ChatMessage, DOCTOR, ModeState, Outcome};
use legionbot_core::settings::{DoctorSettings, Settings};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use super::{Antagonist, should_react};
use crate::services::{Services, parse_command};

const MADNESS_TIMER: &str = "!!madness!!";

#[derive(Clone)]
pub struct Doctor {
    services: Arc<Services>,
}

impl Doctor {
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn arm_madness(&self, channel: &str, duration: Duration) {
        let this = self.clone();
        let channel_owned = channel.to_string();
        self.services
            .timers
            .start(channel, MADNESS_TIMER, duration, async move {
                this.on_timeout(&channel_owned);
            });
    }

    fn on_timeout(&self, channel: &str) {
        if let Some((lang, ())) =
            self.services
                .finish_if_active(channel, DOCTOR, Outcome::Fail, |_| Some(()))
        {
            info!(channel, "doctor left");
            self.services.say(channel, &lang, "doctor_go_away", &[]);
        }
    }
}

/// Shuffles the inner letters of every word longer than three characters,
/// keeping the first and last letter in place.
pub fn corrupt(text: &str, rng: &mut impl Rng) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                let last = chars.len() - 1;
                chars[1..last].shuffle(rng);
            }
            chars.into_iter().collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Antagonist for Doctor {
    fn name(&self) -> &'static str {
        DOCTOR
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.modes.doctor().enabled
    }

    fn weight(&self, settings: &Settings) -> u32 {
        settings.modes.doctor().weight
    }

    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool {
        if state.settings.modes.doctor.is_some() {
            return false;
        }
        state.settings.modes.doctor = Some(DoctorSettings::default());
        true
    }

    async fn start(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let Some(lang) = self.services.begin_round(channel, ModeState::Doctor) else {
            return;
        };
        let cfg = self.services.store.get(channel).settings.modes.doctor();
        info!(channel, "doctor round started");
        self.services.say(channel, &lang, "start_doctor", &[]);
        self.arm_madness(channel, cfg.timeout);
    }

    async fn handle_message(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let snapshot = self.services.store.get(channel);
        if snapshot.active_mode() != DOCTOR {
            return;
        }

        if let Some((command, _)) = parse_command(&message.text) {
            if command == "!killer" {
                self.services
                    .say(channel, &snapshot.settings.language, "commands_doctor", &[]);
            }
            return;
        }
        if self.services.identity.is_exempt(message)
            || snapshot.health_of(&message.username).is_out()
        {
            return;
        }

        let cfg = snapshot.settings.modes.doctor();
        if !should_react(
            snapshot.last_activation,
            Utc::now(),
            cfg.min_delay_between_hits,
            cfg.react_chance,
        ) {
            return;
        }

        let accepted = self.services.store.update(channel, |state| {
            if state.active_mode() != DOCTOR {
                return false;
            }
            state.last_activation = Utc::now();
            true
        });
        if !accepted {
            return;
        }

        let garbled = corrupt(&message.text, &mut rand::rng());
        if !message.id.is_empty() {
            self.services.outbox.delete_message(channel, &message.id);
        }
        self.services
            .outbox
            .send_message(channel, format!("{}: {garbled}", message.username));
    }

    fn time_remaining(&self, channel: &str) -> Duration {
        self.services.timers.remaining(channel, MADNESS_TIMER)
    }
}
