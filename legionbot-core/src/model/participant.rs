use std::fmt;

use serde::{Deserialize, Serialize};

use super::Stats;

/// Participant health progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    #[default]
    Healthy,
    Injured,
    DeepWound,
    Hooked,
    Dead,
}

impl Health {
    /// Stable wire name, also the locale key for `!hp` replies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Injured => "injured",
            Self::DeepWound => "deep_wound",
            Self::Hooked => "hooked",
            Self::Dead => "dead",
        }
    }

    /// Hooked or dead participants sit the round out.
    #[must_use]
    pub const fn is_out(self) -> bool {
        matches!(self, Self::Hooked | Self::Dead)
    }

    /// A dead participant may only recover to injured.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        match self {
            Self::Dead => matches!(next, Self::Injured | Self::Dead),
            _ => true,
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat user tracked within one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    health: Health,

    /// GhostFace's first-hit flag.
    pub marked: bool,

    pub stats: Stats,
}

impl Participant {
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Moves to `next` unless the transition is illegal.
    ///
    /// Returns `false` and leaves health untouched when rejected.
    pub fn set_health(&mut self, next: Health) -> bool {
        if !self.health.can_become(next) {
            tracing::warn!(from = %self.health, to = %next, "rejected health transition");
            return false;
        }
        self.health = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_is_healthy() {
        let p = Participant::default();
        assert_eq!(p.health(), Health::Healthy);
        assert!(!p.marked);
    }

    #[test]
    fn test_dead_cannot_be_hooked() {
        let mut p = Participant::default();
        assert!(p.set_health(Health::DeepWound));
        assert!(p.set_health(Health::Dead));
        assert!(!p.set_health(Health::Hooked));
        assert!(!p.set_health(Health::Healthy));
        assert_eq!(p.health(), Health::Dead);
        assert!(p.set_health(Health::Injured));
        assert_eq!(p.health(), Health::Injured);
    }

    #[test]
    fn test_health_wire_names() {
        assert_eq!(
            serde_json::to_string(&Health::DeepWound).unwrap(),
            r#""deep_wound""#
        );
        let h: Health = serde_json::from_str(r#""hooked""#).unwrap();
        assert_eq!(h, Health::Hooked);
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        fn any_health() -> impl Strategy<Value = Health> {
            prop_oneof![
                Just(Health::Healthy),
                Just(Health::Injured),
                Just(Health::DeepWound),
                Just(Health::Hooked),
                Just(Health::Dead),
            ]
        }

        proptest! {
            #[test]
            fn dead_only_leaves_to_injured(steps in proptest::collection::vec(any_health(), 1..32)) {
                let mut p = Participant::default();
                for next in steps {
                    let before = p.health();
                    p.set_health(next);
                    if before == Health::Dead {
                        prop_assert!(matches!(p.health(), Health::Dead | Health::Injured));
                    }
                }
            }
        }
    }
}
