//! Named single-shot timers keyed by `(channel, name)`.
//!
//! Each timer is a spawned task racing its sleep against a
//! [`CancellationToken`]. Re-arming a key cancels the previous task, and a
//! generation counter makes sure a superseded task that already woke up can
//! not run its callback. The service knows nothing about game state:
//! callbacks must open their own store transaction before touching a record.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::observability::metrics;

type TimerKey = (String, String);

#[derive(Debug)]
struct TimerEntry {
    deadline: Instant,
    cancel: CancellationToken,
    generation: u64,
}

/// Per-channel named timers.
#[derive(Debug, Default)]
pub struct TimerService {
    timers: Arc<DashMap<TimerKey, TimerEntry>>,
    next_generation: AtomicU64,
}

impl TimerService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `name` in `channel`, replacing any live timer under that key.
    ///
    /// `callback` runs once on its own task after `duration`, unless the
    /// timer is stopped or re-armed first.
    pub fn start<F>(&self, channel: &str, name: &str, duration: Duration, callback: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = (channel.to_string(), name.to_string());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let entry = TimerEntry {
            deadline: Instant::now() + duration,
            cancel: cancel.clone(),
            generation,
        };
        if let Some(previous) = self.timers.insert(key.clone(), entry) {
            previous.cancel.cancel();
        }

        let timers = Arc::clone(&self.timers);
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!(channel = %key.0, timer = %key.1, "timer cancelled");
                }
                () = tokio::time::sleep(duration) => {
                    let current = timers
                        .remove_if(&key, |_, entry| entry.generation == generation)
                        .is_some();
                    if current {
                        trace!(channel = %key.0, timer = %key.1, "timer fired");
                        metrics::record_timer_fired();
                        callback.await;
                    }
                }
            }
        });
    }

    /// Cancels `name` in `channel` if it is armed.
    pub fn stop(&self, channel: &str, name: &str) {
        if let Some((_, entry)) = self
            .timers
            .remove(&(channel.to_string(), name.to_string()))
        {
            entry.cancel.cancel();
        }
    }

    /// Cancels every timer of `channel`.
    pub fn stop_all(&self, channel: &str) {
        self.timers.retain(|(owner, _), entry| {
            if owner == channel {
                entry.cancel.cancel();
                false
            } else {
                true
            }
        });
    }

    /// Time left until `name` fires, zero when it is not armed.
    #[must_use]
    pub fn remaining(&self, channel: &str, name: &str) -> Duration {
        self.timers
            .get(&(channel.to_string(), name.to_string()))
            .map_or(Duration::ZERO, |entry| {
                entry.deadline.saturating_duration_since(Instant::now())
            })
    }

    /// Number of armed timers in `channel`.
    #[must_use]
    pub fn armed(&self, channel: &str) -> usize {
        self.timers.iter().filter(|e| e.key().0 == channel).count()
    }
}
