//! Process configuration.
//!
//! Loads the operator's YAML file: bot identity, store backend, completion
//! endpoint, rate limits, cache lifetimes and the console simulation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
