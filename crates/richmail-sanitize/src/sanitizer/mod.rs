//! The sanitization pipeline.
//!
//! 1. Purify the raw HTML with the configured `ammonia` builder.
//! 2. Parse the result into a scratch [`Document`].
//! 3. Convert emoji to trusted images.
//! 4. Run caller passes.
//! 5. Filter `style` attributes and inline `<style>` rules.
//! 6. Compute safe regions.
//! 7. Apply the built-in rules outside them.
//! 8. Run caller follow-ups.

mod inline;
mod pass;
mod rules;

pub use inline::inline_styles;
pub use pass::Pass;
pub use rules::{
    Rule, RuleContext, SAFE_ID_ATTR, SafeIdRule, StripAttributesRule, UrlRule, apply_rules,
    default_rules,
};

use crate::config::SanitizerConfig;
use crate::dom::Document;
use crate::emoji::emoji_to_images;
use crate::policy::{SanitizePolicy, UrlContext};
use crate::purify::Purifier;
use crate::safe_region::{SafeRegions, SafeToken};

/// Per-call sanitization options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitizeOptions {
    /// The message is stored in a local folder.
    pub is_local_folder: bool,
}

impl SanitizeOptions {
    /// Options for a message stored in a local folder.
    #[must_use]
    pub const fn local_folder() -> Self {
        Self {
            is_local_folder: true,
        }
    }

    /// The URL context these options imply.
    #[must_use]
    pub const fn url_context(self) -> UrlContext {
        if self.is_local_folder {
            UrlContext::local_folder()
        } else {
            UrlContext::remote()
        }
    }
}

/// Borrowed session state the pipeline runs against.
pub(crate) struct Pipeline<'a> {
    pub config: &'a SanitizerConfig,
    pub policy: &'a SanitizePolicy,
    pub purifier: &'a Purifier,
    pub token: &'a SafeToken,
    pub rules: &'a [Box<dyn Rule>],
}

impl Pipeline<'_> {
    pub(crate) fn run(
        &self,
        html: &str,
        passes: &mut [&mut dyn Pass],
        options: SanitizeOptions,
    ) -> Document {
        let purified = self.purifier.purify(html, options.is_local_folder);
        let mut doc = Document::parse(&purified);
        let body = doc.ensure_body();

        if self.config.convert_emoji {
            let converted =
                emoji_to_images(&mut doc, body, &self.config.emoji_image_base, self.token);
            if converted > 0 {
                tracing::trace!(converted, "converted emoji");
            }
        }

        for pass in passes.iter_mut() {
            pass.before(&mut doc, body);
        }

        let root = doc.root();
        let regions = SafeRegions::compute(&doc, root, self.token);
        let inlined = inline_styles(&mut doc, self.policy, &regions);

        let regions = SafeRegions::compute(&doc, body, self.token);
        let ctx = RuleContext {
            regions: &regions,
            policy: self.policy,
            urls: options.url_context(),
        };
        let rewritten = apply_rules(&mut doc, body, self.rules, &ctx);
        tracing::debug!(
            input_len = html.len(),
            inlined,
            rewritten,
            safe_nodes = regions.len(),
            "sanitized html"
        );

        for pass in passes.iter_mut() {
            pass.after(&mut doc, body);
        }
        doc
    }
}
