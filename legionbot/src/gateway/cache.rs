//! Cached stream metadata.
//!
//! Viewer counts expire after `viewer_ttl`. A known stream start time stays
//! cached until [`MetadataCache::invalidate`] is called on stream end; an
//! unknown start time (offline, lookup failed) is retried after
//! `unknown_start_ttl`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::warn;

use super::ChatGateway;

#[derive(Debug, Clone, Copy)]
struct Cached<T> {
    value: T,
    expires: Option<Instant>,
}

impl<T: Copy> Cached<T> {
    fn fresh(&self, now: Instant) -> Option<T> {
        match self.expires {
            Some(at) if at <= now => None,
            _ => Some(self.value),
        }
    }
}

/// TTL cache in front of the gateway's metadata lookups.
pub struct MetadataCache {
    gateway: Arc<dyn ChatGateway>,
    viewer_ttl: Duration,
    unknown_start_ttl: Duration,
    call_timeout: Duration,
    viewers: DashMap<String, Cached<u32>>,
    starts: DashMap<String, Cached<Option<DateTime<Utc>>>>,
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("viewer_ttl", &self.viewer_ttl)
            .field("unknown_start_ttl", &self.unknown_start_ttl)
            .finish_non_exhaustive()
    }
}

impl MetadataCache {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        viewer_ttl: Duration,
        unknown_start_ttl: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            viewer_ttl,
            unknown_start_ttl,
            call_timeout,
            viewers: DashMap::new(),
            starts: DashMap::new(),
        }
    }

    /// Current viewer count; zero when the lookup fails.
    pub async fn viewer_count(&self, channel: &str) -> u32 {
        let now = Instant::now();
        if let Some(count) = self.viewers.get(channel).and_then(|c| c.fresh(now)) {
            return count;
        }

        let lookup = tokio::time::timeout(self.call_timeout, self.gateway.viewer_count(channel));
        match lookup.await {
            Ok(Ok(count)) => {
                self.viewers.insert(
                    channel.to_string(),
                    Cached {
                        value: count,
                        expires: Some(Instant::now() + self.viewer_ttl),
                    },
                );
                count
            }
            Ok(Err(e)) => {
                warn!(channel, error = %e, "viewer count lookup failed");
                0
            }
            Err(_) => {
                warn!(channel, "viewer count lookup timed out");
                0
            }
        }
    }

    /// When the current broadcast went live, `None` when offline or unknown.
    pub async fn stream_start(&self, channel: &str) -> Option<DateTime<Utc>> {
        let now = Instant::now();
        if let Some(start) = self.starts.get(channel).and_then(|c| c.fresh(now)) {
            return start;
        }

        let lookup =
            tokio::time::timeout(self.call_timeout, self.gateway.stream_start_time(channel));
        let start = match lookup.await {
            Ok(Ok(start)) => start,
            Ok(Err(e)) => {
                warn!(channel, error = %e, "stream start lookup failed");
                None
            }
            Err(_) => {
                warn!(channel, "stream start lookup timed out");
                None
            }
        };

        let expires = start
            .is_none()
            .then(|| Instant::now() + self.unknown_start_ttl);
        self.starts.insert(
            channel.to_string(),
            Cached {
                value: start,
                expires,
            },
        );
        start
    }

    /// Drops the cached start time, e.g. when the stream goes offline.
    pub fn invalidate(&self, channel: &str) {
        self.starts.remove(channel);
    }

    /// Uncached viewer list; empty when the lookup fails.
    pub async fn viewer_list(&self, channel: &str) -> Vec<String> {
        let lookup = tokio::time::timeout(self.call_timeout, self.gateway.viewer_list(channel));
        match lookup.await {
            Ok(Ok(list)) => list.into_iter().map(|v| v.to_lowercase()).collect(),
            Ok(Err(e)) => {
                warn!(channel, error = %e, "viewer list lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(channel, "viewer list lookup timed out");
                Vec::new()
            }
        }
    }
}
