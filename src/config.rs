//! Cache configuration.
//!
//! Constructed once per process and injected into [`crate::loader::EvidenceLoader`];
//! there is no ambient global instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the evidence cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of distinct parent keys held in the cache
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Consecutive batch failures for one key before its circuit opens
    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: u32,

    /// Recovery supervisor backoff schedule for the 1st, 2nd, 3rd+ consecutive
    /// crash. Later crashes reuse the last entry.
    #[serde(default = "default_recovery_backoff", with = "duration_vec_ms")]
    pub recovery_backoff: Vec<Duration>,

    /// Maximum simultaneous per-item evidence queries during a fallback load
    #[serde(default = "default_fallback_concurrency")]
    pub fallback_concurrency: usize,
}

fn default_max_cache_size() -> usize {
    50
}

fn default_fallback_threshold() -> u32 {
    3
}

fn default_recovery_backoff() -> Vec<Duration> {
    vec![
        Duration::from_secs(5),
        Duration::from_secs(30),
        Duration::from_secs(120),
    ]
}

fn default_fallback_concurrency() -> usize {
    4
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            fallback_threshold: default_fallback_threshold(),
            recovery_backoff: default_recovery_backoff(),
            fallback_concurrency: default_fallback_concurrency(),
        }
    }
}

/// Serialize backoff durations as whole milliseconds for config files
mod duration_vec_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|d| d.as_millis() as u64))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let ms: Vec<u64> = Vec::deserialize(d)?;
        Ok(ms.into_iter().map(Duration::from_millis).collect())
    }
}
