//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::suggest::MAX_SUGGESTIONS;

/// Tunables for an `Engine`. Every field has a default, so a partial TOML
/// table deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after an edit before analysis starts
    pub debounce_ms: u64,
    /// Cap on returned suggestions
    pub max_suggestions: usize,
    /// How many accepted suggestions each buffer remembers
    pub recent_capacity: usize,
    /// Snapshots older than this are flagged stale (0 disables the check)
    pub metadata_ttl_secs: u64,
    /// Lint rule ids to skip
    pub disabled_rules: Vec<String>,
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn metadata_ttl(&self) -> Option<Duration> {
        (self.metadata_ttl_secs > 0).then(|| Duration::from_secs(self.metadata_ttl_secs))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 120,
            max_suggestions: MAX_SUGGESTIONS,
            recent_capacity: 16,
            metadata_ttl_secs: 300,
            disabled_rules: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(120));
        assert_eq!(config.max_suggestions, 50);
        assert_eq!(config.metadata_ttl(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = EngineConfig {
            metadata_ttl_secs: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.metadata_ttl(), None);
    }
}
