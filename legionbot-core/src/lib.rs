//! `legionbot` Core - shared data model and settings schema
//!
//! This crate provides the persisted channel record, the per-channel
//! settings schema and the error types shared by the `legionbot` engine
//! and any administrative tooling that reads or writes channel records.

pub mod error;
pub mod model;
pub mod serde_duration;
pub mod settings;
