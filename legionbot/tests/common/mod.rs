//! Shared integration-test harness: a recording gateway, a scripted
//! completion backend and an engine wired over them.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legionbot::completion::Completion;
use legionbot::error::{CompletionError, GatewayError};
use legionbot::gateway::{ChatGateway, MetadataCache, Outbox};
use legionbot::i18n::Localizer;
use legionbot::modes::Antagonist;
use legionbot::orchestrator::Orchestrator;
use legionbot::services::{Identity, Services};
use legionbot::store::ChannelStore;
use legionbot::timers::TimerService;
use legionbot_core::model::{ChannelState, ChatMessage};
use legionbot_core::settings::Settings;

pub const CHANNEL: &str = "streamer";

// ============================================================================
// Recording gateway
// ============================================================================

/// One outbound call seen by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Message { channel: String, text: String },
    Foreign { channel: String, text: String },
    Delete { channel: String, id: String },
    Timeout { channel: String, username: String, duration: Duration },
    Unban { channel: String, username: String },
    EmoteOnly { channel: String, enabled: bool },
}

impl Recorded {
    fn channel(&self) -> &str {
        match self {
            Self::Message { channel, .. }
            | Self::Foreign { channel, .. }
            | Self::Delete { channel, .. }
            | Self::Timeout { channel, .. }
            | Self::Unban { channel, .. }
            | Self::EmoteOnly { channel, .. } => channel,
        }
    }
}

#[derive(Debug)]
pub struct RecordingGateway {
    pub viewers: AtomicU32,
    pub stream_start: Mutex<Option<DateTime<Utc>>>,
    pub chatters: Mutex<Vec<String>>,
    actions: Mutex<Vec<Recorded>>,
}

impl RecordingGateway {
    fn new(viewers: u32, stream_start: Option<DateTime<Utc>>) -> Self {
        Self {
            viewers: AtomicU32::new(viewers),
            stream_start: Mutex::new(stream_start),
            chatters: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, action: Recorded) {
        self.actions.lock().unwrap().push(action);
    }

    /// Everything recorded for `channel` so far.
    pub fn actions(&self, channel: &str) -> Vec<Recorded> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.channel() == channel)
            .cloned()
            .collect()
    }

    /// Text of every chat message posted in `channel`.
    pub fn messages(&self, channel: &str) -> Vec<String> {
        self.actions(channel)
            .into_iter()
            .filter_map(|a| match a {
                Recorded::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Users timed out in `channel`, with durations.
    pub fn timeouts(&self, channel: &str) -> Vec<(String, Duration)> {
        self.actions(channel)
            .into_iter()
            .filter_map(|a| match a {
                Recorded::Timeout { username, duration, .. } => Some((username, duration)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), GatewayError> {
        self.record(Recorded::Message {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_foreign_message(&self, channel: &str, text: &str) -> Result<(), GatewayError> {
        self.record(Recorded::Foreign {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel: &str, message_id: &str) -> Result<(), GatewayError> {
        self.record(Recorded::Delete {
            channel: channel.to_string(),
            id: message_id.to_string(),
        });
        Ok(())
    }

    async fn timeout_user(
        &self,
        channel: &str,
        username: &str,
        duration: Duration,
        _reason: &str,
    ) -> Result<(), GatewayError> {
        self.record(Recorded::Timeout {
            channel: channel.to_string(),
            username: username.to_string(),
            duration,
        });
        Ok(())
    }

    async fn unban_user(&self, channel: &str, username: &str) -> Result<(), GatewayError> {
        self.record(Recorded::Unban {
            channel: channel.to_string(),
            username: username.to_string(),
        });
        Ok(())
    }

    async fn set_emote_only(&self, channel: &str, enabled: bool) -> Result<(), GatewayError> {
        self.record(Recorded::EmoteOnly {
            channel: channel.to_string(),
            enabled,
        });
        Ok(())
    }

    async fn viewer_count(&self, _channel: &str) -> Result<u32, GatewayError> {
        Ok(self.viewers.load(Ordering::SeqCst))
    }

    async fn stream_start_time(
        &self,
        _channel: &str,
    ) -> Result<Option<DateTime<Utc>>, GatewayError> {
        Ok(*self.stream_start.lock().unwrap())
    }

    async fn viewer_list(&self, _channel: &str) -> Result<Vec<String>, GatewayError> {
        Ok(self.chatters.lock().unwrap().clone())
    }
}

// ============================================================================
// Scripted completion and key localizer
// ============================================================================

/// Returns queued replies in order; errors once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn push(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompletionError::Request("script exhausted".to_string()))
    }
}

/// Renders `key` followed by its arguments, e.g. `on_heal USERNAME=bob`.
#[derive(Debug, Default)]
pub struct KeyLocalizer;

impl Localizer for KeyLocalizer {
    fn get(&self, _lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        std::iter::once(key.to_string())
            .chain(args.iter().map(|(k, v)| format!("{k}={v}")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub services: Arc<Services>,
    pub gateway: Arc<RecordingGateway>,
    pub completion: Arc<ScriptedCompletion>,
}

pub struct HarnessBuilder {
    viewers: u32,
    stream_start: Option<DateTime<Utc>>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            viewers: 10,
            stream_start: Some(Utc::now() - chrono::Duration::hours(2)),
        }
    }
}

impl HarnessBuilder {
    pub const fn viewers(mut self, viewers: u32) -> Self {
        self.viewers = viewers;
        self
    }

    pub const fn stream_start(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.stream_start = start;
        self
    }

    /// Engine over the five built-in modes.
    pub fn build(self) -> Harness {
        self.build_with(|services| legionbot::modes::builtin(services))
    }

    /// Engine over the modes returned by `modes`.
    pub fn build_with(
        self,
        modes: impl FnOnce(&Arc<Services>) -> Vec<Arc<dyn Antagonist>>,
    ) -> Harness {
        let gateway = Arc::new(RecordingGateway::new(self.viewers, self.stream_start));
        let completion = Arc::new(ScriptedCompletion::default());
        let services = Arc::new(Services {
            store: ChannelStore::in_memory(),
            timers: TimerService::new(),
            outbox: Outbox::new(gateway.clone(), Duration::ZERO, Duration::from_secs(1)),
            metadata: MetadataCache::new(
                gateway.clone(),
                Duration::ZERO,
                Duration::ZERO,
                Duration::from_secs(1),
            ),
            locales: Arc::new(KeyLocalizer),
            completion: completion.clone(),
            identity: Identity {
                username: "legionbot".to_string(),
                owner: "operator".to_string(),
                aliases: vec!["legion".to_string()],
            },
            completion_timeout: Duration::from_secs(1),
        });
        let modes = modes(&services);
        let orchestrator = Orchestrator::with_modes(Arc::clone(&services), modes);
        Harness {
            orchestrator,
            services,
            gateway,
            completion,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn new() -> Self {
        HarnessBuilder::default().build()
    }

    /// Edits the settings of `channel`.
    pub fn configure(&self, channel: &str, f: impl FnOnce(&mut Settings)) {
        self.services.store.update(channel, |state| f(&mut state.settings));
    }

    /// Gate settings that never block: no cooldown, no grace, one viewer.
    pub fn open_gate(&self, channel: &str) {
        self.configure(channel, |s| {
            s.general.delay_between_modes = Duration::ZERO;
            s.general.delay_at_stream_start = Duration::ZERO;
            s.general.min_viewers = 1;
        });
    }

    pub fn state(&self, channel: &str) -> ChannelState {
        self.services.store.get(channel)
    }

    /// Sends a chat line from `username`.
    pub async fn chat(&self, channel: &str, username: &str, text: &str) {
        self.chatters_add(username);
        let message = ChatMessage {
            id: format!("msg-{username}-{}", text.len()),
            channel: channel.to_string(),
            username: username.to_string(),
            is_moderator: false,
            text: text.to_string(),
        };
        self.orchestrator.handle_message(&message).await;
    }

    fn chatters_add(&self, username: &str) {
        let mut chatters = self.gateway.chatters.lock().unwrap();
        if !chatters.iter().any(|c| c == username) {
            chatters.push(username.to_string());
        }
    }

    /// Waits until every outbound action queued for `channel` has run.
    pub async fn flush(&self, channel: &str) {
        self.services.outbox.flush(channel).await;
    }

    /// Flushes repeatedly until `channel` has at least `count` messages or
    /// about a second has passed; returns what arrived.
    pub async fn wait_for_messages(&self, channel: &str, count: usize) -> Vec<String> {
        for _ in 0..100 {
            self.flush(channel).await;
            let messages = self.gateway.messages(channel);
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.gateway.messages(channel)
    }
}
