//! Pinhead: a word puzzle box.
//!
//! On start the completion backend picks a topic and a secret word. Chat asks
//! yes/no questions or guesses with `!solve`. Solving the box ends the round
//! as a failure for Pinhead; if the box timer runs out, chains deep-wound a
//! handful of random viewers instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use legionbot_core::model::{
    ChannelState, ChatMessage, Health, ModeState, Outcome, PINHEAD, PinheadState, keys,
};
use legionbot_core::settings::{PinheadSettings, Settings};
use rand::seq::SliceRandom;
use tracing::{info, warn};

use super::{Antagonist, wounds};
use crate::completion::parse::{self, GuessVerdict, TopicWord};
use crate::services::{Services, parse_command};

const BOX_TIMER: &str = "!!box!!";

#[derive(Clone)]
pub struct Pinhead {
    services: Arc<Services>,
}

impl Pinhead {
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn arm_box(&self, channel: &str, duration: Duration) {
        let this = self.clone();
        let channel_owned = channel.to_string();
        self.services
            .timers
            .start(channel, BOX_TIMER, duration, async move {
                this.on_timeout(&channel_owned).await;
            });
    }

    async fn generate(&self, lang: &str, cfg: &PinheadSettings) -> Option<TopicWord> {
        let topics = cfg.topic_list();
        let topic_list = if topics.is_empty() {
            "cities".to_string()
        } else {
            topics.join(", ")
        };
        let prompt = self.services.locales.get(
            lang,
            "pinhead_generate_prompt",
            &[("TOPIC_LIST", &topic_list)],
        );
        match self.services.complete("", &prompt).await {
            Ok(raw) => parse::topic_word(&raw)
                .inspect_err(|e| warn!(error = %e, "unusable pinhead word"))
                .ok(),
            Err(e) => {
                warn!(error = %e, "pinhead word generation failed");
                None
            }
        }
    }

    async fn classify(&self, lang: &str, word: &str, question: &str) -> GuessVerdict {
        if question == word {
            return GuessVerdict::Correct;
        }
        let system = self
            .services
            .locales
            .get(lang, "pinhead_guess_prompt", &[("THE_WORD", word)]);
        match self.services.complete(&system, question).await {
            Ok(raw) => parse::guess_verdict(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "unusable pinhead verdict");
                GuessVerdict::Invalid
            }),
            Err(e) => {
                warn!(error = %e, "pinhead guess classification failed");
                GuessVerdict::Invalid
            }
        }
    }

    async fn solve(&self, message: &ChatMessage, args: &str, word: &str, lang: &str) {
        let channel = &message.channel;
        let user = &message.username;
        let question = args.replace('@', "").trim().to_lowercase();
        if question.is_empty() {
            return;
        }

        let verdict = self.classify(lang, word, &question).await;
        let key = match verdict {
            GuessVerdict::Correct => {
                let solved = self
                    .services
                    .finish_if_active(channel, PINHEAD, Outcome::Fail, |state| {
                        matches!(&state.mode_state, Some(ModeState::Pinhead(p)) if p.word == word)
                            .then_some(())
                    });
                if let Some((lang, ())) = solved {
                    info!(channel, username = %user, "pinhead box solved");
                    self.services.timers.stop(channel, BOX_TIMER);
                    self.services.say(
                        channel,
                        &lang,
                        "pinhead_failure",
                        &[("USERNAME", user), ("WORD", word)],
                    );
                }
                return;
            }
            GuessVerdict::Yes => "pinhead_yes",
            GuessVerdict::No => "pinhead_no",
            GuessVerdict::Maybe => "pinhead_maybe",
            GuessVerdict::Invalid => "pinhead_incorrect",
        };
        self.services.say(
            channel,
            lang,
            key,
            &[("USERNAME", user), ("QUESTION", &question)],
        );
    }

    async fn on_timeout(&self, channel: &str) {
        if self.services.store.get(channel).active_mode() != PINHEAD {
            return;
        }
        let viewers = self.services.metadata.viewer_list(channel).await;
        let identity = &self.services.identity;
        let mut candidates: Vec<String> = viewers
            .into_iter()
            .filter(|v| v != channel && !identity.is_staff(v))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates.shuffle(&mut rand::rng());

        let finished = self
            .services
            .finish_if_active(channel, PINHEAD, Outcome::Success, |state| {
                let cfg = state.settings.modes.pinhead();
                let victims = pick_victims(state, &candidates, cfg.victim_count as usize);
                Some((victims, cfg))
            });
        let Some((lang, (victims, cfg))) = finished else {
            return;
        };

        for victim in &victims {
            wounds::arm_bleed_out(
                &self.services,
                channel,
                victim,
                cfg.deep_wound_timeout,
                cfg.bleed_out_ban_time,
            );
        }
        info!(channel, victims = victims.len(), "pinhead box expired");
        self.services.say(
            channel,
            &lang,
            "pinhead_success",
            &[("VICTIMS", &victims.join(", "))],
        );
    }
}

/// Deep-wounds up to `count` eligible candidates, in candidate order.
fn pick_victims(state: &mut ChannelState, candidates: &[String], count: usize) -> Vec<String> {
    let victims: Vec<String> = candidates
        .iter()
        .filter(|name| !state.health_of(name).is_out())
        .take(count)
        .cloned()
        .collect();
    for victim in &victims {
        state.stats.incr(keys::HITS);
        let participant = state.participant_mut(victim);
        participant.stats.incr(keys::HITS);
        participant.set_health(Health::DeepWound);
    }
    victims
}

#[async_trait]
impl Antagonist for Pinhead {
    fn name(&self) -> &'static str {
        PINHEAD
    }

    fn enabled(&self, settings: &Settings) -> bool {
        settings.modes.pinhead().enabled
    }

    fn weight(&self, settings: &Settings) -> u32 {
        settings.modes.pinhead().weight
    }

    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool {
        if state.settings.modes.pinhead.is_some() {
            return false;
        }
        state.settings.modes.pinhead = Some(PinheadSettings::default());
        true
    }

    async fn start(&self, message: &ChatMessage) {
        let channel = &message.channel;
        let snapshot = self.services.store.get(channel);
        if !snapshot.is_idle() {
            warn!(channel, mode = snapshot.active_mode(), "start ignored, a round is already running");
            return;
        }
        let cfg = snapshot.settings.modes.pinhead();
        let Some(TopicWord { topic, word }) =
            self.generate(&snapshot.settings.language, &cfg).await
        else {
            warn!(channel, "pinhead not started without a secret word");
            return;
        };

        let state = ModeState::Pinhead(PinheadState {
            topic: topic.clone(),
            word,
        });
        let Some(lang) = self.services.begin_round(channel, state) else {
            return;
        };
        info!(channel, topic = %topic, "pinhead round started");
        if cfg.show_topic {
            self.services
                .say(channel, &lang, "start_pinhead", &[("TOPIC", &topic)]);
        } else {
            self.services.say(channel, &lang, "start_pinhead_secret", &[]);
        }
        self.arm_box(channel, cfg.timeout);
    }

    async fn handle_message(&self, message: &ChatMessage) {
        let snapshot = self.services.store.get(&message.channel);
        let Some(ModeState::Pinhead(pinhead)) = &snapshot.mode_state else {
            return;
        };
        let lang = &snapshot.settings.language;
        match parse_command(&message.text) {
            Some((command, _)) if command == "!killer" => {
                self.services
                    .say(&message.channel, lang, "commands_pinhead", &[]);
            }
            Some((command, args)) if command == "!solve" => {
                self.solve(message, args, &pinhead.word, lang).await;
            }
            _ => {}
        }
    }

    fn time_remaining(&self, channel: &str) -> Duration {
        self.services.timers.remaining(channel, BOX_TIMER)
    }
}
