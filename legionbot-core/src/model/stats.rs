use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stat key names shared by channel and participant counters.
pub mod keys {
    pub const TOTAL: &str = "total";
    pub const SUCCESS: &str = "success";
    pub const FAIL: &str = "fail";
    pub const MISS: &str = "miss";
    pub const HITS: &str = "hits";
    pub const BLEED_OUTS: &str = "bleedOuts";
    pub const STUNS: &str = "stuns";
    pub const BODY_BLOCKS: &str = "bodyBlocks";
    pub const HOOKS: &str = "hooks";
    pub const HEALS: &str = "heals";
    pub const UNHOOKS: &str = "unhooks";
}

/// Monotonic counters keyed by outcome name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats(BTreeMap<String, u64>);

impl Stats {
    /// Increments `key` by one.
    pub fn incr(&mut self, key: &str) {
        *self.0.entry(key.to_string()).or_default() += 1;
    }

    /// Current value of `key`, zero when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Iterates counters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
