//! Why a channel will, or will not, get a killer right now.

use std::time::Duration;

use crate::i18n::Localizer;

/// Channel readiness, in the order the checks are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Switched off in settings.
    Disabled,
    /// Inside a `!legiontimeout` window.
    Muted { remaining: Duration },
    Active {
        mode: &'static str,
        remaining: Duration,
    },
    AllModesDisabled,
    Cooldown { remaining: Duration },
    /// Stream went live too recently.
    StreamStartGrace { remaining: Duration },
    /// No known stream start.
    Offline,
    NotEnoughViewers { current: u32, required: u32 },
    Ready,
}

impl ChannelStatus {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Localized one-line description.
    #[must_use]
    pub fn describe(&self, locales: &dyn Localizer, lang: &str) -> String {
        match self {
            Self::Disabled => locales.get(lang, "channel_status_disabled", &[]),
            Self::Muted { remaining } => locales.get(
                lang,
                "channel_status_muted",
                &[("REMAINING", &format_remaining(*remaining))],
            ),
            Self::Active { mode, remaining } => {
                let mode_name = locales.get(lang, &format!("mode_{mode}"), &[]);
                locales.get(
                    lang,
                    "channel_status_active",
                    &[
                        ("MODE", &mode_name),
                        ("REMAINING", &format_remaining(*remaining)),
                    ],
                )
            }
            Self::AllModesDisabled => locales.get(lang, "channel_status_all_modes_disabled", &[]),
            Self::Cooldown { remaining } => locales.get(
                lang,
                "channel_status_cooldown",
                &[("REMAINING", &format_remaining(*remaining))],
            ),
            Self::StreamStartGrace { remaining } => locales.get(
                lang,
                "channel_status_stream_start",
                &[("REMAINING", &format_remaining(*remaining))],
            ),
            Self::Offline => locales.get(lang, "channel_status_offline", &[]),
            Self::NotEnoughViewers { current, required } => locales.get(
                lang,
                "channel_status_viewers",
                &[
                    ("CURRENT", &current.to_string()),
                    ("REQUIRED", &required.to_string()),
                ],
            ),
            Self::Ready => locales.get(lang, "channel_status_ready", &[]),
        }
    }
}

/// Whole seconds, human formatted.
fn format_remaining(remaining: Duration) -> String {
    humantime::format_duration(Duration::from_secs(remaining.as_secs())).to_string()
}
