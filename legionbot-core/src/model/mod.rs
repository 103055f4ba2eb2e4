//! Persisted channel record and inbound event shapes.

mod channel;
mod message;
mod mode_state;
mod participant;
mod stats;

pub use channel::{ChannelState, Outcome};
pub use message::{ChatMessage, Whisper};
pub use mode_state::{
    DOCTOR, DREDGE, DredgeState, GHOSTFACE, GhostFaceState, LEGION, LegionState, MODE_NAMES,
    ModeState, PINHEAD, PinheadState,
};
pub use participant::{Health, Participant};
pub use stats::{Stats, keys};
