//! Sanitizer configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::url::{DEFAULT_SERVICE_PATH, PLACEHOLDER_IMAGE};

/// Default base URL of emoji images.
pub const DEFAULT_EMOJI_BASE: &str = "/img/emoji/72x72";

/// Configuration for a [`SanitizerSession`](crate::SanitizerSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Image substituted for rejected URLs.
    pub placeholder_image_url: String,
    /// Base URL of emoji images (`{base}/{codepoints}.png`).
    pub emoji_image_base: String,
    /// Same-origin download path prefix.
    pub service_path: String,
    /// Whether emoji are converted to images.
    pub convert_emoji: bool,
    /// Maximum memoized results; `0` keeps every result.
    pub cache_capacity: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            placeholder_image_url: PLACEHOLDER_IMAGE.to_string(),
            emoji_image_base: DEFAULT_EMOJI_BASE.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            convert_emoji: true,
            cache_capacity: 0,
        }
    }
}

impl SanitizerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the placeholder image URL.
    #[must_use]
    pub fn placeholder_image_url(mut self, url: impl Into<String>) -> Self {
        self.placeholder_image_url = url.into();
        self
    }

    /// Sets the emoji image base URL.
    #[must_use]
    pub fn emoji_image_base(mut self, base: impl Into<String>) -> Self {
        self.emoji_image_base = base.into();
        self
    }

    /// Sets the same-origin service path prefix.
    #[must_use]
    pub fn service_path(mut self, path: impl Into<String>) -> Self {
        self.service_path = path.into();
        self
    }

    /// Enables or disables emoji conversion.
    #[must_use]
    pub const fn convert_emoji(mut self, enabled: bool) -> Self {
        self.convert_emoji = enabled;
        self
    }

    /// Bounds the memoization cache.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
