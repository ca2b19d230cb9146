//! Sanitizer sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SanitizerConfig;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::policy::SanitizePolicy;
use crate::purify::Purifier;
use crate::safe_region::SafeToken;
use crate::sanitizer::{Pass, Pipeline, Rule, SanitizeOptions, default_rules};

/// A long-lived sanitizer.
///
/// A session owns the purifier configuration, the safe-region token and a
/// memoization cache. The token is generated once and never changes, so
/// markup stamped by this session's templates stays trusted for as long as
/// the session lives, and markup from any other source never is.
pub struct SanitizerSession {
    config: SanitizerConfig,
    policy: SanitizePolicy,
    purifier: Purifier,
    token: SafeToken,
    rules: Vec<Box<dyn Rule>>,
    cache: Mutex<HashMap<String, Arc<str>>>,
}

impl std::fmt::Debug for SanitizerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizerSession")
            .field("config", &self.config)
            .field("token", &self.token)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for SanitizerSession {
    fn default() -> Self {
        Self::with_policy(SanitizerConfig::default(), SanitizePolicy::default())
    }
}

impl SanitizerSession {
    /// Creates a session from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured service path cannot be compiled.
    pub fn new(config: SanitizerConfig) -> Result<Self> {
        let policy = SanitizePolicy::from_config(&config)?;
        Ok(Self::with_policy(config, policy))
    }

    fn with_policy(config: SanitizerConfig, policy: SanitizePolicy) -> Self {
        let token = SafeToken::generate();
        tracing::debug!(token = token.attr_name(), "created sanitizer session");
        Self {
            config,
            policy,
            purifier: Purifier::new(),
            token,
            rules: default_rules(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    /// Returns the safe-region token.
    #[must_use]
    pub const fn token(&self) -> &SafeToken {
        &self.token
    }

    /// Returns the safe-region marker attribute name.
    #[must_use]
    pub fn safe_attr_name(&self) -> &str {
        self.token.attr_name()
    }

    /// Marks `node` as the root of a safe region.
    pub fn stamp(&self, doc: &mut Document, node: NodeId) {
        self.token.stamp(doc, node);
    }

    /// Sanitizes `html` with default options, memoizing the result.
    ///
    /// Identical inputs return the same shared string. Entries are never
    /// invalidated; when a capacity is configured and reached, the cache is
    /// cleared before the new entry is stored.
    #[must_use]
    pub fn sanitize(&self, html: &str) -> Arc<str> {
        if let Some(hit) = self.lock_cache().get(html) {
            return Arc::clone(hit);
        }

        let result: Arc<str> = self
            .do_sanitize_html(html, &mut [], SanitizeOptions::default())
            .into();

        let mut cache = self.lock_cache();
        let capacity = self.config.cache_capacity;
        if capacity > 0 && cache.len() >= capacity {
            tracing::debug!(capacity, "sanitize cache full, clearing");
            cache.clear();
        }
        Arc::clone(cache.entry(html.to_string()).or_insert(result))
    }

    /// Returns the number of memoized results.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Sanitizes `html` into a scratch document.
    ///
    /// Never fails: unparseable input yields an empty body.
    #[must_use]
    pub fn do_sanitize(
        &self,
        html: &str,
        passes: &mut [&mut dyn Pass],
        options: SanitizeOptions,
    ) -> Document {
        self.pipeline().run(html, passes, options)
    }

    /// Sanitizes `html` and serializes the body.
    ///
    /// A single leading newline, which the parser would otherwise eat on
    /// the next round trip, is stripped.
    #[must_use]
    pub fn do_sanitize_html(
        &self,
        html: &str,
        passes: &mut [&mut dyn Pass],
        options: SanitizeOptions,
    ) -> String {
        let doc = self.do_sanitize(html, passes, options);
        let out = doc.body().map(|b| doc.inner_html(b)).unwrap_or_default();
        match out.strip_prefix('\n') {
            Some(rest) => rest.to_string(),
            None => out,
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            config: &self.config,
            policy: &self.policy,
            purifier: &self.purifier,
            token: &self.token,
            rules: &self.rules,
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<str>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_is_memoized() {
        let session = SanitizerSession::default();
        let first = session.sanitize("<p onclick=\"x()\">hi</p>");
        let second = session.sanitize("<p onclick=\"x()\">hi</p>");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, "<p>hi</p>");
        assert_eq!(session.cached_len(), 1);
    }

    #[test]
    fn test_cache_capacity() {
        let session = SanitizerSession::new(SanitizerConfig::new().cache_capacity(2)).unwrap();
        let _ = session.sanitize("a");
        let _ = session.sanitize("b");
        let _ = session.sanitize("c");
        assert_eq!(session.cached_len(), 1);
    }

    #[test]
    fn test_sessions_have_distinct_tokens() {
        let a = SanitizerSession::default();
        let b = SanitizerSession::default();
        assert_ne!(a.safe_attr_name(), b.safe_attr_name());
    }

    #[test]
    fn test_passes_run_before_and_after() {
        struct Marker {
            saw_style_block: bool,
        }
        impl Pass for Marker {
            fn before(&mut self, doc: &mut Document, _body: NodeId) {
                self.saw_style_block = !doc.elements_by_tag(doc.root(), "style").is_empty();
            }
            fn after(&mut self, doc: &mut Document, body: NodeId) {
                let p = doc.create_element("hr");
                doc.append_child(body, p);
            }
        }

        let session = SanitizerSession::default();
        let mut marker = Marker {
            saw_style_block: false,
        };
        let html = session.do_sanitize_html(
            "<style>p{color:red}</style><p>x</p>",
            &mut [&mut marker],
            SanitizeOptions::default(),
        );
        assert!(marker.saw_style_block);
        assert_eq!(html, "<p style=\"color: red;\">x</p><hr>");
    }

    #[test]
    fn test_closure_pass() {
        let session = SanitizerSession::default();
        let mut count = 0;
        let mut pass = |doc: &mut Document, body: NodeId| {
            count = doc.elements_by_tag(body, "p").len();
        };
        let _ = session.do_sanitize("<p>a</p><p>b</p>", &mut [&mut pass], SanitizeOptions::default());
        assert_eq!(count, 2);
    }

    #[test]
    fn test_leading_newline_stripped() {
        let session = SanitizerSession::default();
        assert_eq!(
            session.do_sanitize_html("\n<p>x</p>", &mut [], SanitizeOptions::default()),
            "<p>x</p>"
        );
    }
}
