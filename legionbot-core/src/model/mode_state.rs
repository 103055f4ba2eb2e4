use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const LEGION: &str = "legion";
pub const GHOSTFACE: &str = "ghostface";
pub const DOCTOR: &str = "doctor";
pub const PINHEAD: &str = "pinhead";
pub const DREDGE: &str = "dredge";

/// Every mode name in registration order.
pub const MODE_NAMES: [&str; 5] = [LEGION, GHOSTFACE, DOCTOR, PINHEAD, DREDGE];

/// Transient state of the running round, tagged by the owning mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ModeState {
    Legion(LegionState),
    GhostFace(GhostFaceState),
    Doctor,
    Pinhead(PinheadState),
    Dredge(DredgeState),
}

impl ModeState {
    /// Name of the owning mode.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Legion(_) => LEGION,
            Self::GhostFace(_) => GHOSTFACE,
            Self::Doctor => DOCTOR,
            Self::Pinhead(_) => PINHEAD,
            Self::Dredge(_) => DREDGE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegionState {
    pub hit_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GhostFaceState {
    pub stalked_this_round: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinheadState {
    pub topic: String,
    pub word: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DredgeState {
    /// Voter to nominee.
    pub votes: BTreeMap<String, String>,
}

impl DredgeState {
    /// Unique plurality nominee with more than one vote.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for nominee in self.votes.values() {
            *counts.entry(nominee.as_str()).or_default() += 1;
        }

        let max = counts.values().copied().max()?;
        if max <= 1 {
            return None;
        }

        let mut leaders = counts.iter().filter(|(_, c)| **c == max);
        let (first, _) = leaders.next()?;
        if leaders.next().is_some() {
            return None;
        }
        Some(first)
    }
}
