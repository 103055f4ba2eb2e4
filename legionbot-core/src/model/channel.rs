use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Health, ModeState, Participant, Stats, keys};
use crate::settings::Settings;

/// How a round ended; each maps to a channel stat key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Fail,
    Miss,
    Stun,
    BodyBlock,
}

impl Outcome {
    /// Channel stat key incremented for this outcome.
    #[must_use]
    pub const fn stat_key(self) -> &'static str {
        match self {
            Self::Success => keys::SUCCESS,
            Self::Fail => keys::FAIL,
            Self::Miss => keys::MISS,
            Self::Stun => keys::STUNS,
            Self::BodyBlock => keys::BODY_BLOCKS,
        }
    }

    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Miss => "miss",
            Self::Stun => "stun",
            Self::BodyBlock => "body_block",
        }
    }
}

/// The per-channel record; the unit of transactional mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    pub channel: String,

    /// Running round, if any. The active mode name is derived from it.
    #[serde(default, deserialize_with = "lenient_mode_state")]
    pub mode_state: Option<ModeState>,

    /// Start or end of the most recent round, or the last accepted hit.
    #[serde(default = "epoch")]
    pub last_activation: DateTime<Utc>,

    #[serde(default)]
    pub stats: Stats,

    /// Lowercase username to participant.
    #[serde(default)]
    pub participants: BTreeMap<String, Participant>,

    #[serde(default)]
    pub settings: Settings,

    /// Administrative mute deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_until: Option<DateTime<Utc>>,
}

const fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Undecodable mode state is logged and read as "no active mode".
fn lenient_mode_state<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ModeState>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_value(raw) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            tracing::error!(error = %e, "failed to decode mode state, treating as idle");
            Ok(None)
        }
    }
}

impl ChannelState {
    /// Fresh record with default settings.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            mode_state: None,
            last_activation: epoch(),
            stats: Stats::default(),
            participants: BTreeMap::new(),
            settings: Settings::default(),
            disabled_until: None,
        }
    }

    /// Name of the running mode, or `""` when idle.
    #[must_use]
    pub fn active_mode(&self) -> &'static str {
        self.mode_state.as_ref().map_or("", ModeState::name)
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.mode_state.is_none()
    }

    /// Whether the channel is switched off or inside an administrative mute.
    #[must_use]
    pub fn is_muted(&self, now: DateTime<Utc>) -> bool {
        self.settings.disabled || self.disabled_until.is_some_and(|until| until > now)
    }

    /// Participant entry, created healthy on first access.
    pub fn participant_mut(&mut self, username: &str) -> &mut Participant {
        self.participants.entry(username.to_string()).or_default()
    }

    /// Health of `username`; unseen users are healthy.
    #[must_use]
    pub fn health_of(&self, username: &str) -> Health {
        self.participants
            .get(username)
            .map_or(Health::Healthy, Participant::health)
    }

    /// Starts a round if the channel is idle.
    ///
    /// Returns `false`, changing nothing, when a round is already running.
    pub fn begin_round(&mut self, state: ModeState, now: DateTime<Utc>) -> bool {
        if self.mode_state.is_some() {
            return false;
        }
        self.mode_state = Some(state);
        self.last_activation = now;
        self.stats.incr(keys::TOTAL);
        true
    }

    /// Ends the running round, recording `outcome`.
    ///
    /// Returns the mode that was running, or `None` when already idle.
    pub fn finish_round(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Option<&'static str> {
        let state = self.mode_state.take()?;
        self.last_activation = now;
        self.stats.incr(outcome.stat_key());
        Some(state.name())
    }

    /// Clears any running round without recording an outcome.
    pub fn abort_round(&mut self, now: DateTime<Utc>) -> Option<&'static str> {
        let state = self.mode_state.take()?;
        self.last_activation = now;
        Some(state.name())
    }

    /// Clears `marked` on every participant not in `keep`.
    pub fn clear_marks_except(&mut self, keep: &std::collections::BTreeSet<String>) {
        for (name, participant) in &mut self.participants {
            if !keep.contains(name) {
                participant.marked = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DredgeState, GhostFaceState, LegionState, PinheadState};
    use chrono::TimeZone;

    fn sample(mode: Option<ModeState>) -> ChannelState {
        let mut state = ChannelState::new("streamer");
        state.mode_state = mode;
        state.last_activation = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        state.stats.incr(keys::TOTAL);
        state.participant_mut("alice").set_health(Health::DeepWound);
        state.participant_mut("bob").marked = true;
        state.participant_mut("bob").stats.incr(keys::HOOKS);
        state.disabled_until = Some(Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());
        state.settings.modes.legion = Some(crate::settings::LegionSettings::default());
        state
    }

    #[test]
    fn test_round_trip_every_mode_state() {
        let modes = [
            None,
            Some(ModeState::Legion(LegionState { hit_count: 2 })),
            Some(ModeState::GhostFace(GhostFaceState {
                stalked_this_round: ["alice".to_string()].into(),
            })),
            Some(ModeState::Doctor),
            Some(ModeState::Pinhead(PinheadState {
                topic: "animals".to_string(),
                word: "otter".to_string(),
            })),
            Some(ModeState::Dredge(DredgeState {
                votes: [("alice".to_string(), "bob".to_string())].into(),
            })),
        ];

        for mode in modes {
            let original = sample(mode);
            let json = serde_json::to_string(&original).unwrap();
            let decoded: ChannelState = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_corrupt_mode_state_reads_as_idle() {
        let json = r#"{"channel":"c","modeState":{"mode":"trapper","traps":4}}"#;
        let state: ChannelState = serde_json::from_str(json).unwrap();
        assert!(state.is_idle());
        assert_eq!(state.active_mode(), "");
    }

    #[test]
    fn test_minimal_record_loads_with_defaults() {
        let state: ChannelState = serde_json::from_str(r#"{"channel":"c"}"#).unwrap();
        assert_eq!(state, ChannelState::new("c"));
    }

    #[test]
    fn test_begin_round_only_when_idle() {
        let mut state = ChannelState::new("c");
        let now = Utc::now();
        assert!(state.begin_round(ModeState::Doctor, now));
        assert!(!state.begin_round(ModeState::Legion(LegionState::default()), now));
        assert_eq!(state.active_mode(), "doctor");
        assert_eq!(state.stats.get(keys::TOTAL), 1);
    }

    #[test]
    fn test_finish_round_records_outcome() {
        let mut state = ChannelState::new("c");
        let now = Utc::now();
        state.begin_round(ModeState::Doctor, now);
        assert_eq!(state.finish_round(Outcome::Fail, now), Some("doctor"));
        assert_eq!(state.finish_round(Outcome::Fail, now), None);
        assert_eq!(state.stats.get(keys::FAIL), 1);
        assert!(state.is_idle());
    }

    #[test]
    fn test_mute_window() {
        let mut state = ChannelState::new("c");
        let now = Utc::now();
        assert!(!state.is_muted(now));
        state.disabled_until = Some(now + chrono::Duration::minutes(5));
        assert!(state.is_muted(now));
        assert!(!state.is_muted(now + chrono::Duration::minutes(6)));
    }

    #[test]
    fn test_clear_marks_except() {
        let mut state = ChannelState::new("c");
        state.participant_mut("a").marked = true;
        state.participant_mut("b").marked = true;
        state.clear_marks_except(&["a".to_string()].into());
        assert!(state.participants["a"].marked);
        assert!(!state.participants["b"].marked);
    }
}
