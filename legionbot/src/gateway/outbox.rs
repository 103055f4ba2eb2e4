//! Per-channel outbound worker queues.
//!
//! Each channel gets one worker task, spawned on first use, that executes
//! queued actions strictly in order with at least `rate_interval` between
//! consecutive gateway calls. Every call is bounded by `call_timeout`;
//! failures are logged and counted, never retried.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use legionbot_core::error::GatewayError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ChatGateway;
use crate::observability::metrics;

/// A queued side effect. The queue key is the target channel.
#[derive(Debug)]
pub enum OutboundAction {
    SendMessage(String),
    SendForeignMessage(String),
    DeleteMessage(String),
    TimeoutUser {
        username: String,
        duration: Duration,
        reason: String,
    },
    UnbanUser(String),
    SetEmoteOnly(bool),
    /// Completes once everything queued before it has run.
    Flush(oneshot::Sender<()>),
}

impl OutboundAction {
    /// Metric label for the action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "send_message",
            Self::SendForeignMessage(_) => "send_foreign_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::TimeoutUser { .. } => "timeout_user",
            Self::UnbanUser(_) => "unban_user",
            Self::SetEmoteOnly(_) => "set_emote_only",
            Self::Flush(_) => "flush",
        }
    }
}

/// Rate-limited, order-preserving outbound queues.
pub struct Outbox {
    gateway: Arc<dyn ChatGateway>,
    queues: DashMap<String, mpsc::UnboundedSender<OutboundAction>>,
    rate_interval: Duration,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("queues", &self.queues.len())
            .field("rate_interval", &self.rate_interval)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl Outbox {
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, rate_interval: Duration, call_timeout: Duration) -> Self {
        Self {
            gateway,
            queues: DashMap::new(),
            rate_interval,
            call_timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn send_message(&self, channel: &str, text: impl Into<String>) {
        self.enqueue(channel, OutboundAction::SendMessage(text.into()));
    }

    pub fn send_foreign_message(&self, channel: &str, text: impl Into<String>) {
        self.enqueue(channel, OutboundAction::SendForeignMessage(text.into()));
    }

    pub fn delete_message(&self, channel: &str, message_id: &str) {
        self.enqueue(channel, OutboundAction::DeleteMessage(message_id.to_string()));
    }

    pub fn timeout_user(&self, channel: &str, username: &str, duration: Duration, reason: &str) {
        self.enqueue(
            channel,
            OutboundAction::TimeoutUser {
                username: username.to_string(),
                duration,
                reason: reason.to_string(),
            },
        );
    }

    pub fn unban_user(&self, channel: &str, username: &str) {
        self.enqueue(channel, OutboundAction::UnbanUser(username.to_string()));
    }

    pub fn set_emote_only(&self, channel: &str, enabled: bool) {
        self.enqueue(channel, OutboundAction::SetEmoteOnly(enabled));
    }

    /// Waits until every action queued for `channel` so far has run.
    pub async fn flush(&self, channel: &str) {
        let (tx, rx) = oneshot::channel();
        self.enqueue(channel, OutboundAction::Flush(tx));
        let _ = rx.await;
    }

    /// Stops every worker; queued actions are dropped.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn enqueue(&self, channel: &str, action: OutboundAction) {
        let sender = self
            .queues
            .entry(channel.to_string())
            .or_insert_with(|| self.spawn_worker(channel))
            .clone();
        if let Err(e) = sender.send(action) {
            warn!(channel, action = e.0.name(), "outbox closed, dropping action");
        }
    }

    fn spawn_worker(&self, channel: &str) -> mpsc::UnboundedSender<OutboundAction> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gateway = Arc::clone(&self.gateway);
        let cancel = self.cancel.clone();
        let channel = channel.to_string();
        let rate_interval = self.rate_interval;
        let call_timeout = self.call_timeout;

        tokio::spawn(async move {
            let mut last_call: Option<Instant> = None;
            loop {
                let action = tokio::select! {
                    () = cancel.cancelled() => break,
                    action = rx.recv() => match action {
                        Some(action) => action,
                        None => break,
                    },
                };

                if let OutboundAction::Flush(done) = action {
                    let _ = done.send(());
                    continue;
                }

                if !rate_interval.is_zero()
                    && let Some(last) = last_call
                {
                    tokio::time::sleep_until(last + rate_interval).await;
                }
                dispatch(gateway.as_ref(), &channel, action, call_timeout).await;
                last_call = Some(Instant::now());
            }
            debug!(channel = %channel, "outbox worker stopped");
        });

        tx
    }
}

async fn dispatch(
    gateway: &dyn ChatGateway,
    channel: &str,
    action: OutboundAction,
    call_timeout: Duration,
) {
    let name = action.name();
    let call = async {
        match action {
            OutboundAction::SendMessage(text) => gateway.send_message(channel, &text).await,
            OutboundAction::SendForeignMessage(text) => {
                gateway.send_foreign_message(channel, &text).await
            }
            OutboundAction::DeleteMessage(id) => gateway.delete_message(channel, &id).await,
            OutboundAction::TimeoutUser {
                username,
                duration,
                reason,
            } => {
                gateway
                    .timeout_user(channel, &username, duration, &reason)
                    .await
            }
            OutboundAction::UnbanUser(username) => gateway.unban_user(channel, &username).await,
            OutboundAction::SetEmoteOnly(enabled) => gateway.set_emote_only(channel, enabled).await,
            OutboundAction::Flush(done) => {
                let _ = done.send(());
                Ok(())
            }
        }
    };

    let result = tokio::time::timeout(call_timeout, call)
        .await
        .unwrap_or(Err(GatewayError::Timeout { operation: name }));

    match result {
        Ok(()) => metrics::record_outbound(name, true),
        Err(e) => {
            warn!(channel, action = name, error = %e, "outbound call failed");
            metrics::record_outbound(name, false);
        }
    }
}
