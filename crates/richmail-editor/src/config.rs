//! Editable surface configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default number of times a saved selection may be reused.
pub const MAX_RANGE_REUSES: usize = 3;

/// Configuration for an [`EditableSurface`](crate::EditableSurface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Delay before the placeholder state is recomputed, in milliseconds.
    pub placeholder_debounce_ms: u64,
    /// Delay between a paste and its cleanup, in milliseconds.
    pub cleanup_delay_ms: u64,
    /// Times a saved selection may be restored before it is considered stale.
    pub max_range_reuses: usize,
    /// Rich (HTML) surface; plain surfaces never embed pasted links.
    pub rich: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            placeholder_debounce_ms: 100,
            cleanup_delay_ms: 0,
            max_range_reuses: MAX_RANGE_REUSES,
            rich: true,
        }
    }
}

impl SurfaceConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a plain-text surface.
    #[must_use]
    pub fn plain() -> Self {
        Self::default().rich(false)
    }

    /// Loads configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets rich or plain mode.
    #[must_use]
    pub const fn rich(mut self, rich: bool) -> Self {
        self.rich = rich;
        self
    }

    /// Sets the placeholder debounce.
    #[must_use]
    pub const fn placeholder_debounce_ms(mut self, ms: u64) -> Self {
        self.placeholder_debounce_ms = ms;
        self
    }

    /// Sets the paste cleanup delay.
    #[must_use]
    pub const fn cleanup_delay_ms(mut self, ms: u64) -> Self {
        self.cleanup_delay_ms = ms;
        self
    }

    /// Sets the selection reuse cap.
    #[must_use]
    pub const fn max_range_reuses(mut self, reuses: usize) -> Self {
        self.max_range_reuses = reuses;
        self
    }

    /// Returns the placeholder debounce as a duration.
    #[must_use]
    pub const fn placeholder_debounce(&self) -> Duration {
        Duration::from_millis(self.placeholder_debounce_ms)
    }

    /// Returns the cleanup delay as a duration.
    #[must_use]
    pub const fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SurfaceConfig::default();
        assert_eq!(config.placeholder_debounce(), Duration::from_millis(100));
        assert_eq!(config.cleanup_delay(), Duration::ZERO);
        assert_eq!(config.max_range_reuses, 3);
        assert!(config.rich);
    }

    #[test]
    fn test_from_json() {
        let config = SurfaceConfig::from_json(r#"{"rich": false, "cleanup_delay_ms": 5}"#).unwrap();
        assert!(!config.rich);
        assert_eq!(config.cleanup_delay(), Duration::from_millis(5));
        assert_eq!(config.max_range_reuses, MAX_RANGE_REUSES);
    }
}
