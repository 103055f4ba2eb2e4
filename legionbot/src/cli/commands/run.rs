//! `run`: wire the collaborators and drive the engine from the console.

use std::sync::Arc;

use chrono::Utc;
use legionbot_core::error::{ConfigError, LegionBotError};
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::completion::{Completion, DisabledCompletion, OpenAiCompletion};
use crate::config::{BotConfig, ConfigLoader, StoreKind};
use crate::console;
use crate::gateway::{ChatGateway, ConsoleGateway, MetadataCache, Outbox};
use crate::i18n::{Locales, Localizer};
use crate::observability::init_metrics;
use crate::orchestrator::Orchestrator;
use crate::services::{Identity, Services};
use crate::store::{ChannelStore, JsonDirBackend, MemoryBackend, StateBackend};
use crate::timers::TimerService;

/// Longest wait for queued chat actions on shutdown.
const SHUTDOWN_DRAIN: std::time::Duration = std::time::Duration::from_secs(5);

/// Start the bot with the console chat driver.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a collaborator
/// cannot be built, or reading stdin fails.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), LegionBotError> {
    let config = match &args.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            let load_result = ConfigLoader::new().load(path)?;
            for warning in &load_result.warnings {
                tracing::warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            load_result.config
        }
        None => {
            tracing::info!("no configuration file, using defaults");
            Arc::new(BotConfig::default())
        }
    };

    init_metrics(config.metrics.port)?;
    if let Some(port) = config.metrics.port {
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let stream_start = config
        .console
        .stream_uptime
        .and_then(|uptime| chrono::Duration::from_std(uptime).ok())
        .map(|uptime| Utc::now() - uptime);
    let gateway = Arc::new(ConsoleGateway::new(config.console.viewer_count, stream_start));

    let services = Arc::new(build_services(&config, Arc::clone(&gateway) as Arc<dyn ChatGateway>)?);
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&services)));
    orchestrator.init();

    for channel in &config.console.channels {
        tracing::info!(channel = %channel.to_lowercase(), "channel joined");
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let result = console::drive(orchestrator, gateway, input, cancel).await;

    let channels = services.store.list_channel_names();
    let drain = futures::future::join_all(
        channels.iter().map(|channel| services.outbox.flush(channel)),
    );
    if tokio::time::timeout(SHUTDOWN_DRAIN, drain).await.is_err() {
        tracing::warn!("outbound queues not drained before shutdown");
    }
    services.outbox.shutdown();
    tracing::info!("shut down");
    result
}

/// Builds the shared collaborators described by `config` on top of
/// `gateway`.
///
/// # Errors
///
/// Returns an error if the store directory, locale overrides or completion
/// client cannot be set up.
pub fn build_services(
    config: &BotConfig,
    gateway: Arc<dyn ChatGateway>,
) -> Result<Services, LegionBotError> {
    let backend: Arc<dyn StateBackend> = match config.store.kind {
        StoreKind::Memory => Arc::new(MemoryBackend::new()),
        StoreKind::JsonDir => {
            let dir = config
                .store
                .path
                .clone()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "store.path".to_string(),
                    value: "<unset>".to_string(),
                    expected: "a directory for the json_dir store".to_string(),
                })?;
            Arc::new(JsonDirBackend::open(dir)?)
        }
    };

    let locales: Arc<dyn Localizer> = match &config.locales.dir {
        Some(dir) => Arc::new(Locales::with_overrides(dir)?),
        None => Arc::new(Locales::builtin()),
    };

    let (completion, completion_timeout): (Arc<dyn Completion>, _) = match &config.completion {
        Some(c) => (
            Arc::new(OpenAiCompletion::new(&c.endpoint, &c.model, &c.api_key)?),
            c.timeout,
        ),
        None => (Arc::new(DisabledCompletion), std::time::Duration::from_secs(1)),
    };

    let outbound = &config.outbound;
    let cache = &config.cache;
    Ok(Services {
        store: ChannelStore::new(backend),
        timers: TimerService::new(),
        outbox: Outbox::new(
            Arc::clone(&gateway),
            outbound.rate_interval,
            outbound.call_timeout,
        ),
        metadata: MetadataCache::new(
            gateway,
            cache.viewer_ttl,
            cache.unknown_stream_start_ttl,
            outbound.call_timeout,
        ),
        locales,
        completion,
        identity: Identity {
            username: config.bot.username.to_lowercase(),
            owner: config.bot.owner.to_lowercase(),
            aliases: config
                .bot
                .aliases
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        },
        completion_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn builds_from_defaults() {
        let mut config = BotConfig::default();
        config.bot.username = "LegionBot".to_string();
        config.bot.owner = "Operator".to_string();
        config.bot.aliases = vec!["Legion".to_string(), "  ".to_string()];
        let gateway = Arc::new(ConsoleGateway::new(3, None));
        let services = build_services(&config, gateway).unwrap();
        assert_eq!(services.identity.username, "legionbot");
        assert_eq!(services.identity.owner, "operator");
        assert_eq!(services.identity.aliases, vec!["legion"]);
        assert_eq!(services.metadata.viewer_count("chan").await, 3);
    }

    #[tokio::test]
    async fn json_dir_store_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig {
            store: StoreConfig {
                kind: StoreKind::JsonDir,
                path: Some(dir.path().join("state")),
            },
            ..BotConfig::default()
        };
        let services = build_services(&config, Arc::new(ConsoleGateway::new(0, None))).unwrap();
        services.store.update("chan", |state| state.settings.language = "ru".to_string());
        assert!(dir.path().join("state").join("chan.json").exists());
    }
}
