//! `legionbot` - chat-triggered killer minigame engine
//!
//! Chat activity in a channel may spawn one of several antagonist rounds
//! (Legion, Ghost Face, Doctor, Pinhead, Dredge). Each round is a small
//! state machine over a persisted per-channel record, driven by chat
//! messages, whispers and named timers.

pub mod cli;
pub mod completion;
pub mod config;
pub mod console;
pub mod gateway;
pub mod i18n;
pub mod modes;
pub mod observability;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod timers;

pub use legionbot_core::error;
