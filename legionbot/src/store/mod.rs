//! Channel state store.
//!
//! Every mutation of a channel record goes through [`ChannelStore::update`]:
//! the closure runs under that channel's mutex and the result is written
//! through to the backend before the lock is released. Different channels
//! never contend. Closures are synchronous, so no `.await` can happen while
//! a channel is locked.

pub mod backend;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use legionbot_core::model::ChannelState;
use tracing::{error, warn};

pub use backend::{JsonDirBackend, MemoryBackend, StateBackend};

type Slot = Arc<Mutex<ChannelState>>;

/// Transactional per-channel record store.
pub struct ChannelStore {
    backend: Arc<dyn StateBackend>,
    slots: DashMap<String, Slot>,
}

impl std::fmt::Debug for ChannelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStore")
            .field("loaded", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl ChannelStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            slots: DashMap::new(),
        }
    }

    /// In-memory store for tests and dry runs.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    fn slot(&self, channel: &str) -> Slot {
        if let Some(slot) = self.slots.get(channel) {
            return Arc::clone(slot.value());
        }
        let slot = self
            .slots
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.load_or_default(channel))));
        Arc::clone(slot.value())
    }

    fn load_or_default(&self, channel: &str) -> ChannelState {
        match self.backend.load(channel) {
            Ok(Some(state)) => state,
            Ok(None) => ChannelState::new(channel),
            Err(e) => {
                error!(channel, error = %e, "failed to load channel record, starting fresh");
                ChannelState::new(channel)
            }
        }
    }

    /// Snapshot of the record, a fresh default when the channel is new.
    #[must_use]
    pub fn get(&self, channel: &str) -> ChannelState {
        let slot = self.slot(channel);
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Applies `f` to the record atomically and persists the result.
    pub fn update<R>(&self, channel: &str, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let slot = self.slot(channel);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut guard);
        if let Err(e) = self.backend.save(&guard) {
            error!(channel, error = %e, "failed to persist channel record");
        }
        result
    }

    /// Every known channel name, persisted or only loaded in memory.
    #[must_use]
    pub fn list_channel_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.slots.iter().map(|s| s.key().clone()).collect();
        match self.backend.channel_names() {
            Ok(persisted) => names.extend(persisted),
            Err(e) => warn!(error = %e, "failed to list persisted channels"),
        }
        names.into_iter().collect()
    }

    /// Snapshots of every known channel.
    #[must_use]
    pub fn list_all(&self) -> Vec<ChannelState> {
        self.list_channel_names()
            .iter()
            .map(|name| self.get(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legionbot_core::model::{Health, ModeState, keys};
    use std::thread;

    #[test]
    fn test_get_creates_default() {
        let store = ChannelStore::in_memory();
        let state = store.get("fresh");
        assert_eq!(state, ChannelState::new("fresh"));
    }

    #[test]
    fn test_update_persists_through_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let store = ChannelStore::new(backend.clone());
        store.update("chan", |s| {
            s.participant_mut("alice").set_health(Health::Injured);
        });

        let persisted = backend.load("chan").unwrap().unwrap();
        assert_eq!(persisted.health_of("alice"), Health::Injured);

        let reopened = ChannelStore::new(backend);
        assert_eq!(reopened.get("chan").health_of("alice"), Health::Injured);
    }

    #[test]
    fn test_concurrent_begin_round_starts_once() {
        let store = Arc::new(ChannelStore::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.update("chan", |s| s.begin_round(ModeState::Doctor, chrono::Utc::now()))
                })
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|started| *started)
            .count();
        assert_eq!(started, 1);
        assert_eq!(store.get("chan").stats.get(keys::TOTAL), 1);
    }

    #[test]
    fn test_list_channel_names_merges_sources() {
        let backend = Arc::new(MemoryBackend::new());
        backend.save(&ChannelState::new("persisted")).unwrap();
        let store = ChannelStore::new(backend);
        let _ = store.get("loaded");
        assert_eq!(store.list_channel_names(), vec!["loaded", "persisted"]);
        assert_eq!(store.list_all().len(), 2);
    }
}
