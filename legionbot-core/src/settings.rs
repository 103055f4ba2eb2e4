//! Per-channel settings schema.
//!
//! Settings live inside the persisted channel record. Every field has a
//! default so records written before a field existed keep loading. Mode
//! sub-configs are optional: a missing one is filled in by the owning mode's
//! `ensure_default_settings` and read through accessors that fall back to
//! defaults in the meantime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::serde_duration;

/// Top-level channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Global toggle; a disabled channel ignores all chat traffic.
    pub disabled: bool,

    /// Locale used for every announcement in this channel.
    pub language: String,

    /// Cross-mode timing and gating.
    pub general: GeneralSettings,

    /// Chat and raid behaviour.
    pub chat: ChatSettings,

    /// Per-mode configuration.
    pub modes: ModeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disabled: false,
            language: "en".to_string(),
            general: GeneralSettings::default(),
            chat: ChatSettings::default(),
            modes: ModeSettings::default(),
        }
    }
}

/// Gating applied before any mode may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    /// Minimum time between the end of one round and the start of the next.
    #[serde(with = "serde_duration")]
    pub delay_between_modes: Duration,

    /// Grace period after the stream goes live.
    #[serde(with = "serde_duration")]
    pub delay_at_stream_start: Duration,

    /// Minimum concurrent viewers for a round to start.
    pub min_viewers: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            delay_between_modes: Duration::from_secs(2 * 60 * 60),
            delay_at_stream_start: Duration::from_secs(30 * 60),
            min_viewers: 5,
        }
    }
}

/// Chat lifecycle behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Force a round when another channel raids this one.
    pub start_on_raid: bool,

    /// Send a farewell into the channel this one raids.
    pub follow_raids: bool,

    /// Text of the farewell message.
    pub follow_raids_message: String,
}

/// Optional per-mode sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legion: Option<LegionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghostface: Option<GhostFaceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinhead: Option<PinheadSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dredge: Option<DredgeSettings>,
}

impl ModeSettings {
    /// Legion config, or defaults when the sub-config is missing.
    #[must_use]
    pub fn legion(&self) -> LegionSettings {
        self.legion.clone().unwrap_or_default()
    }

    /// GhostFace config, or defaults when the sub-config is missing.
    #[must_use]
    pub fn ghostface(&self) -> GhostFaceSettings {
        self.ghostface.clone().unwrap_or_default()
    }

    /// Doctor config, or defaults when the sub-config is missing.
    #[must_use]
    pub fn doctor(&self) -> DoctorSettings {
        self.doctor.clone().unwrap_or_default()
    }

    /// Pinhead config, or defaults when the sub-config is missing.
    #[must_use]
    pub fn pinhead(&self) -> PinheadSettings {
        self.pinhead.clone().unwrap_or_default()
    }

    /// Dredge config, or defaults when the sub-config is missing.
    #[must_use]
    pub fn dredge(&self) -> DredgeSettings {
        self.dredge.clone().unwrap_or_default()
    }
}

// ============================================================================
// Mode sub-configs
// ============================================================================

/// Legion: frenzy with probabilistic hits and counter-play commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegionSettings {
    pub enabled: bool,
    pub weight: u32,
    pub body_block_success_chance: f64,
    #[serde(with = "serde_duration")]
    pub deep_wound_timeout: Duration,
    /// Hit number that hooks the target.
    pub fatal_hit: u32,
    #[serde(with = "serde_duration")]
    pub frenzy_timeout: Duration,
    pub hit_chance: f64,
    #[serde(with = "serde_duration")]
    pub hook_ban_time: Duration,
    pub locker_grab_chance: f64,
    pub locker_stun_chance: f64,
    #[serde(with = "serde_duration")]
    pub min_delay_between_hits: Duration,
    pub pallet_stun_chance: f64,
    pub react_chance: f64,
    #[serde(with = "serde_duration")]
    pub bleed_out_ban_time: Duration,
}

impl Default for LegionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 100,
            body_block_success_chance: 0.2,
            deep_wound_timeout: Duration::from_secs(60),
            fatal_hit: 5,
            frenzy_timeout: Duration::from_secs(3 * 60),
            hit_chance: 0.96,
            hook_ban_time: Duration::from_secs(60),
            locker_grab_chance: 0.3,
            locker_stun_chance: 0.25,
            min_delay_between_hits: Duration::from_secs(5),
            pallet_stun_chance: 0.18,
            react_chance: 0.3,
            bleed_out_ban_time: Duration::from_secs(30),
        }
    }
}

/// GhostFace: two-hit stalking with a reveal counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GhostFaceSettings {
    pub enabled: bool,
    pub weight: u32,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    #[serde(with = "serde_duration")]
    pub min_delay_between_hits: Duration,
    pub react_chance: f64,
    pub reveal_chance: f64,
    #[serde(with = "serde_duration")]
    pub hook_ban_time: Duration,
}

impl Default for GhostFaceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 100,
            timeout: Duration::from_secs(3 * 60),
            min_delay_between_hits: Duration::from_secs(5),
            react_chance: 0.3,
            reveal_chance: 0.2,
            hook_ban_time: Duration::from_secs(60),
        }
    }
}

/// Doctor: a timed madness window that scrambles messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorSettings {
    pub enabled: bool,
    pub weight: u32,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    #[serde(with = "serde_duration")]
    pub min_delay_between_hits: Duration,
    pub react_chance: f64,
}

impl Default for DoctorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 50,
            timeout: Duration::from_secs(2 * 60),
            min_delay_between_hits: Duration::from_secs(5),
            react_chance: 0.3,
        }
    }
}

/// Pinhead: a guessing puzzle backed by text completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinheadSettings {
    pub enabled: bool,
    pub weight: u32,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    /// Number of viewers deep-wounded when the puzzle is not solved.
    pub victim_count: u32,
    pub show_topic: bool,
    /// Comma-separated topic list.
    pub topics: String,
    #[serde(with = "serde_duration")]
    pub deep_wound_timeout: Duration,
    #[serde(with = "serde_duration")]
    pub bleed_out_ban_time: Duration,
}

impl Default for PinheadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 30,
            timeout: Duration::from_secs(5 * 60),
            victim_count: 3,
            show_topic: true,
            topics: "cities, animals, food".to_string(),
            deep_wound_timeout: Duration::from_secs(60),
            bleed_out_ban_time: Duration::from_secs(30),
        }
    }
}

impl PinheadSettings {
    /// Trimmed, lowercased, non-empty topics.
    #[must_use]
    pub fn topic_list(&self) -> Vec<String> {
        self.topics
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Dredge: whisper voting under emote-only chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DredgeSettings {
    pub enabled: bool,
    pub weight: u32,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    #[serde(with = "serde_duration")]
    pub hook_ban_time: Duration,
}

impl Default for DredgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 30,
            timeout: Duration::from_secs(2 * 60),
            hook_ban_time: Duration::from_secs(60),
        }
    }
}
