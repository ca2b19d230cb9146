//! First-stage purification with `ammonia`.
//!
//! The purifier removes everything that can execute: disallowed tags,
//! event-handler attributes, and URLs outside the allowed schemes. Its
//! output is re-parsed and refined by the post-processing rules.

use std::collections::HashSet;

use ammonia::Builder;

use crate::policy::{
    DROP_CONTENT_TAGS, EXTRA_TAGS, FORBIDDEN_ATTRS, FORBIDDEN_TAGS, GENERIC_ATTRS,
    LOCAL_FOLDER_SCHEMES, URL_SCHEMES,
};

/// Configured purifiers for remote and local-folder content.
#[derive(Debug)]
pub struct Purifier {
    remote: Builder<'static>,
    local: Builder<'static>,
}

impl Default for Purifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Purifier {
    /// Creates the purifiers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remote: builder(URL_SCHEMES.iter().copied().collect()),
            local: builder(
                URL_SCHEMES
                    .iter()
                    .chain(LOCAL_FOLDER_SCHEMES)
                    .copied()
                    .collect(),
            ),
        }
    }

    /// Purifies `html`, returning serialized markup.
    #[must_use]
    pub fn purify(&self, html: &str, is_local_folder: bool) -> String {
        let builder = if is_local_folder {
            &self.local
        } else {
            &self.remote
        };
        builder.clean(html).to_string()
    }
}

fn builder(schemes: HashSet<&'static str>) -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .add_tags(EXTRA_TAGS)
        .rm_tags(FORBIDDEN_TAGS)
        .rm_clean_content_tags(&["style"])
        .add_clean_content_tags(DROP_CONTENT_TAGS)
        .add_generic_attributes(GENERIC_ATTRS)
        .add_generic_attribute_prefixes(&["data-"])
        .url_schemes(schemes)
        .strip_comments(true)
        .attribute_filter(|_element, attribute, value| {
            if FORBIDDEN_ATTRS.contains(&attribute) {
                None
            } else {
                Some(value.into())
            }
        })
        // Retained links must never navigate the host window.
        .set_tag_attribute_value("a", "target", "_blank")
        .set_tag_attribute_value("area", "target", "_blank");
    builder
}
