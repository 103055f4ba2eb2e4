//! Console chat driver for `legionbot run`.
//!
//! Reads one event per stdin line:
//!
//! ```text
//! #channel user: text       chat message
//! #channel @user: text      chat message from a moderator
//! /w user text              whisper to the bot
//! /raid from to             `from` raids `to`
//! /offline channel          the broadcast in `channel` ended
//! /status channel           print the channel's readiness
//! ```

use std::sync::Arc;

use legionbot_core::error::LegionBotError;
use legionbot_core::model::ChatMessage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::gateway::ConsoleGateway;
use crate::orchestrator::Orchestrator;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Chat(ChatMessage),
    Whisper { username: String, text: String },
    Raid { from: String, to: String },
    Offline(String),
    Status(String),
}

/// Parses a console line; `None` for blank or malformed input.
#[must_use]
pub fn parse_line(line: &str) -> Option<ConsoleEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('#') {
        let (channel, rest) = rest.split_once(char::is_whitespace)?;
        let (sender, text) = rest.split_once(':')?;
        let sender = sender.trim();
        let (username, is_moderator) = sender
            .strip_prefix('@')
            .map_or((sender, false), |name| (name, true));
        if channel.is_empty() || username.is_empty() {
            return None;
        }
        return Some(ConsoleEvent::Chat(ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.to_lowercase(),
            username: username.to_lowercase(),
            is_moderator,
            text: text.trim().to_string(),
        }));
    }

    let mut words = line.split_whitespace();
    match words.next()? {
        "/w" => {
            let username = words.next()?.to_lowercase();
            let text = words.collect::<Vec<_>>().join(" ");
            Some(ConsoleEvent::Whisper { username, text })
        }
        "/raid" => {
            let from = words.next()?.to_lowercase();
            let to = words.next()?.to_lowercase();
            Some(ConsoleEvent::Raid { from, to })
        }
        "/offline" => words.next().map(|c| ConsoleEvent::Offline(c.to_lowercase())),
        "/status" => words.next().map(|c| ConsoleEvent::Status(c.to_lowercase())),
        _ => None,
    }
}

/// Feeds `input` lines to the orchestrator until EOF or cancellation.
///
/// # Errors
///
/// Returns `LegionBotError::Io` if reading `input` fails.
pub async fn drive<R>(
    orchestrator: Arc<Orchestrator>,
    gateway: Arc<ConsoleGateway>,
    input: R,
    cancel: CancellationToken,
) -> Result<(), LegionBotError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("console input closed");
            break;
        };
        let Some(event) = parse_line(&line) else {
            if !line.trim().is_empty() {
                warn!(line = %line, "unrecognized console line");
            }
            continue;
        };
        dispatch(&orchestrator, &gateway, event).await;
    }
    Ok(())
}

async fn dispatch(orchestrator: &Orchestrator, gateway: &ConsoleGateway, event: ConsoleEvent) {
    match event {
        ConsoleEvent::Chat(message) => {
            gateway.note_chatter(&message.channel, &message.username);
            orchestrator.handle_message(&message).await;
        }
        ConsoleEvent::Whisper { username, text } => {
            orchestrator.handle_whisper(&username, &text).await;
        }
        ConsoleEvent::Raid { from, to } => {
            orchestrator.raid_sent(&from, &to);
            orchestrator.raid_received(&to, &from).await;
        }
        ConsoleEvent::Offline(channel) => orchestrator.stream_offline(&channel),
        ConsoleEvent::Status(channel) => {
            let services = orchestrator.services();
            let lang = services.store.get(&channel).settings.language;
            let status = orchestrator.channel_status(&channel).await;
            println!(
                "[#{channel} status] {}",
                status.describe(services.locales.as_ref(), &lang)
            );
        }
    }
}
