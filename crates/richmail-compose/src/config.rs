//! Composer configuration.

use richmail_editor::SurfaceConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::SmimeMode;
use crate::previous_mail::PreviousMailPolicy;

/// Default id of the separator element some providers put before quoted
/// history.
pub const DEFAULT_QUOTE_SEPARATOR: &str = "zwchr";

/// Configuration for a [`Composer`](crate::Composer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Id of the provider's quote separator element.
    pub quote_separator: String,
    /// Policy applied when a reply or forward opens.
    pub previous_mail_policy: PreviousMailPolicy,
    /// S/MIME mode used when sending.
    pub smime: SmimeMode,
    /// Whether quoted content is shown in the editor.
    pub expand_previous_mails: bool,
    /// Editing surface settings.
    pub surface: SurfaceConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            quote_separator: DEFAULT_QUOTE_SEPARATOR.to_string(),
            previous_mail_policy: PreviousMailPolicy::default(),
            smime: SmimeMode::None,
            expand_previous_mails: true,
            surface: SurfaceConfig::default(),
        }
    }
}

impl ComposerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the quote separator id.
    #[must_use]
    pub fn quote_separator(mut self, id: impl Into<String>) -> Self {
        self.quote_separator = id.into();
        self
    }

    /// Sets the initial previous-mail policy.
    #[must_use]
    pub const fn previous_mail_policy(mut self, policy: PreviousMailPolicy) -> Self {
        self.previous_mail_policy = policy;
        self
    }

    /// Sets the S/MIME mode.
    #[must_use]
    pub const fn smime(mut self, mode: SmimeMode) -> Self {
        self.smime = mode;
        self
    }

    /// Sets whether quoted content is shown in the editor.
    #[must_use]
    pub const fn expand_previous_mails(mut self, expand: bool) -> Self {
        self.expand_previous_mails = expand;
        self
    }

    /// Sets the editing surface configuration.
    #[must_use]
    pub const fn surface(mut self, surface: SurfaceConfig) -> Self {
        self.surface = surface;
        self
    }
}
