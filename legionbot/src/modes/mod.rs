//! Killer modes.
//!
//! Each mode is a small state machine over the channel record. All of them
//! follow the same shape: `start` opens a round inside a transaction guarded
//! by "channel is idle", announces it, and arms a primary timer whose expiry
//! resolves the round. Chat and command handlers mutate health and mode state
//! in one transaction each, then perform outbound side effects after the
//! transaction has been released.

pub mod doctor;
pub mod dredge;
pub mod ghostface;
pub mod legion;
pub mod pinhead;
pub mod wounds;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use legionbot_core::model::{ChannelState, ChatMessage, Whisper};
use legionbot_core::settings::Settings;

pub use doctor::Doctor;
pub use dredge::Dredge;
pub use ghostface::GhostFace;
pub use legion::Legion;
pub use pinhead::Pinhead;

use crate::services::{Services, roll};

/// A killer mode the orchestrator can start and route chat to.
///
/// No method returns an error: precondition violations are logged and
/// ignored, collaborator failures resolve the round on its failure branch.
#[async_trait]
pub trait Antagonist: Send + Sync {
    /// Registry name, also the persisted mode tag.
    fn name(&self) -> &'static str;

    fn enabled(&self, settings: &Settings) -> bool;

    fn weight(&self, settings: &Settings) -> u32;

    /// Fills in this mode's settings block when missing.
    ///
    /// Returns `true` if the record changed.
    fn ensure_default_settings(&self, state: &mut ChannelState) -> bool;

    /// Opens a round in `message.channel` if it is idle.
    async fn start(&self, message: &ChatMessage);

    /// Handles chat while this mode's round is running.
    async fn handle_message(&self, message: &ChatMessage);

    /// Offers chat to the mode while the channel is idle.
    ///
    /// Returns `true` when the message was consumed.
    async fn handle_idle_message(&self, _message: &ChatMessage) -> bool {
        false
    }

    async fn handle_whisper(&self, _whisper: &Whisper) {}

    /// Time until the round's primary timer fires.
    fn time_remaining(&self, channel: &str) -> Duration;
}

/// Registry of the built-in modes in selection order.
#[must_use]
pub fn builtin(services: &Arc<Services>) -> Vec<Arc<dyn Antagonist>> {
    vec![
        Arc::new(Legion::new(Arc::clone(services))),
        Arc::new(GhostFace::new(Arc::clone(services))),
        Arc::new(Doctor::new(Arc::clone(services))),
        Arc::new(Pinhead::new(Arc::clone(services))),
        Arc::new(Dredge::new(Arc::clone(services))),
    ]
}

/// Whether a passive hit may happen now: the minimum delay since the last
/// activation has passed and the reaction roll succeeds.
pub(crate) fn should_react(
    last_activation: DateTime<Utc>,
    now: DateTime<Utc>,
    min_delay: Duration,
    react_chance: f64,
) -> bool {
    let since = (now - last_activation).to_std().unwrap_or_default();
    since >= min_delay && roll(react_chance)
}
