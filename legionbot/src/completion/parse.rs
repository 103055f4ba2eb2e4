//! Validation of raw completion replies.

use std::sync::LazyLock;

use legionbot_core::error::CompletionError;
use regex::Regex;

static TOPIC_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^RESULT\s+(\w+)\s+(\w+)$").unwrap_or_else(|_| unreachable!())
});

static FREE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^RESULT\s+(.*)$").unwrap_or_else(|_| unreachable!()));

/// A secret word and the topic it was drawn from, both lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicWord {
    pub topic: String,
    pub word: String,
}

/// Classification of a Pinhead guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessVerdict {
    Correct,
    Yes,
    No,
    Maybe,
    Invalid,
}

/// Parses `RESULT <topic> <word>`.
///
/// # Errors
///
/// Returns `CompletionError::InvalidFormat` when the reply does not match.
pub fn topic_word(raw: &str) -> Result<TopicWord, CompletionError> {
    let caps = TOPIC_WORD
        .captures(raw.trim())
        .ok_or_else(|| CompletionError::InvalidFormat(raw.to_string()))?;
    Ok(TopicWord {
        topic: caps[1].to_lowercase(),
        word: caps[2].to_lowercase(),
    })
}

/// Parses a guess classification (`ok`, `ans y`, `ans n`, `maybe`, `invalid`).
///
/// # Errors
///
/// Returns `CompletionError::InvalidFormat` for anything else.
pub fn guess_verdict(raw: &str) -> Result<GuessVerdict, CompletionError> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match normalized.trim_end_matches('.') {
        "ok" => Ok(GuessVerdict::Correct),
        "ans y" | "ans yes" => Ok(GuessVerdict::Yes),
        "ans n" | "ans no" => Ok(GuessVerdict::No),
        "maybe" => Ok(GuessVerdict::Maybe),
        "invalid" | "incorrect" => Ok(GuessVerdict::Invalid),
        _ => Err(CompletionError::InvalidFormat(raw.to_string())),
    }
}

/// Parses `RESULT <free text>` and returns the trimmed text.
///
/// # Errors
///
/// Returns `CompletionError::InvalidFormat` when the prefix is missing or
/// the text is empty.
pub fn free_text(raw: &str) -> Result<String, CompletionError> {
    FREE_TEXT
        .captures(raw.trim())
        .map(|caps| caps[1].trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| CompletionError::InvalidFormat(raw.to_string()))
}
