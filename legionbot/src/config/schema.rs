//! Process configuration schema.
//!
//! This is the operator's YAML file, not the per-channel game settings
//! (those live in the channel records, see `legionbot_core::settings`).

use std::path::PathBuf;
use std::time::Duration;

use legionbot_core::serde_duration;
use serde::{Deserialize, Serialize};

/// Root of the YAML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    pub bot: IdentityConfig,
    pub store: StoreConfig,
    pub locales: LocalesConfig,
    /// Text completion backend; absent disables Pinhead and mention replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionConfig>,
    pub outbound: OutboundConfig,
    pub cache: CacheConfig,
    pub metrics: MetricsConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Bot account name.
    pub username: String,

    /// Operator account, exempt from hits.
    pub owner: String,

    /// Extra names that count as a mention.
    pub aliases: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username: "legionbot".to_string(),
            owner: String::new(),
            aliases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Records are lost on exit.
    #[default]
    Memory,
    /// One JSON file per channel.
    JsonDir,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,

    /// Directory for `json_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalesConfig {
    /// Directory of `<lang>.json` overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,

    pub model: String,

    /// Bearer token; usually `${OPENAI_API_KEY}`.
    pub api_key: String,

    #[serde(with = "serde_duration")]
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboundConfig {
    /// Minimum spacing between two gateway calls for the same channel.
    #[serde(with = "serde_duration")]
    pub rate_interval: Duration,

    /// Deadline for a single gateway call.
    #[serde(with = "serde_duration")]
    pub call_timeout: Duration,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            rate_interval: Duration::from_millis(1500),
            call_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(with = "serde_duration")]
    pub viewer_ttl: Duration,

    /// How long an unknown stream start is remembered.
    #[serde(with = "serde_duration")]
    pub unknown_stream_start_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            viewer_ttl: Duration::from_secs(300),
            unknown_stream_start_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prometheus listener port on 127.0.0.1; absent disables the listener.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Simulated platform for `legionbot run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Channels announced at startup.
    pub channels: Vec<String>,

    pub viewer_count: u32,

    /// How long the simulated stream has been live; absent means offline.
    #[serde(
        with = "optional_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub stream_uptime: Option<Duration>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            viewer_count: 10,
            stream_uptime: Some(Duration::from_secs(3600)),
        }
    }
}

mod optional_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
