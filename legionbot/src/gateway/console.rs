//! Console gateway: prints outbound actions to stdout.
//!
//! Metadata comes from fixed values that can be changed at runtime, and the
//! viewer list is whoever has chatted in the channel so far.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use legionbot_core::error::GatewayError;
use tracing::info;

use super::ChatGateway;

/// Stdout-backed gateway for local runs.
#[derive(Debug)]
pub struct ConsoleGateway {
    viewer_count: AtomicU32,
    stream_start: Mutex<Option<DateTime<Utc>>>,
    chatters: DashMap<String, BTreeSet<String>>,
}

impl ConsoleGateway {
    #[must_use]
    pub fn new(viewer_count: u32, stream_start: Option<DateTime<Utc>>) -> Self {
        Self {
            viewer_count: AtomicU32::new(viewer_count),
            stream_start: Mutex::new(stream_start),
            chatters: DashMap::new(),
        }
    }

    pub fn set_viewer_count(&self, count: u32) {
        self.viewer_count.store(count, Ordering::Relaxed);
    }

    pub fn set_stream_start(&self, start: Option<DateTime<Utc>>) {
        *self
            .stream_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = start;
    }

    /// Records `username` as present in `channel`.
    pub fn note_chatter(&self, channel: &str, username: &str) {
        self.chatters
            .entry(channel.to_string())
            .or_default()
            .insert(username.to_lowercase());
    }

    fn emit(line: &str) {
        println!("{line}");
    }
}

#[async_trait]
impl ChatGateway for ConsoleGateway {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), GatewayError> {
        Self::emit(&format!("[#{channel}] {text}"));
        Ok(())
    }

    async fn send_foreign_message(&self, channel: &str, text: &str) -> Result<(), GatewayError> {
        Self::emit(&format!("[#{channel} (foreign)] {text}"));
        Ok(())
    }

    async fn delete_message(&self, channel: &str, message_id: &str) -> Result<(), GatewayError> {
        Self::emit(&format!("[#{channel}] <deleted message {message_id}>"));
        Ok(())
    }

    async fn timeout_user(
        &self,
        channel: &str,
        username: &str,
        duration: Duration,
        reason: &str,
    ) -> Result<(), GatewayError> {
        info!(channel, username, ?duration, reason, "timeout");
        Self::emit(&format!(
            "[#{channel}] <{username} timed out for {}>",
            humantime::format_duration(duration)
        ));
        Ok(())
    }

    async fn unban_user(&self, channel: &str, username: &str) -> Result<(), GatewayError> {
        Self::emit(&format!("[#{channel}] <{username} unbanned>"));
        Ok(())
    }

    async fn set_emote_only(&self, channel: &str, enabled: bool) -> Result<(), GatewayError> {
        let state = if enabled { "on" } else { "off" };
        Self::emit(&format!("[#{channel}] <emote-only {state}>"));
        Ok(())
    }

    async fn viewer_count(&self, _channel: &str) -> Result<u32, GatewayError> {
        Ok(self.viewer_count.load(Ordering::Relaxed))
    }

    async fn stream_start_time(
        &self,
        _channel: &str,
    ) -> Result<Option<DateTime<Utc>>, GatewayError> {
        Ok(*self
            .stream_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner))
    }

    async fn viewer_list(&self, channel: &str) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .chatters
            .get(channel)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default())
    }
}
