//! Crawl scope by URL prefix.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

// ============================================================================
// UrlScope
// ============================================================================

/// Set of URL prefixes a crawl stays within.
///
/// Only absolute `http` and `https` URLs are admitted. Fragments are
/// stripped before matching. An empty scope admits every such URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlScope {
    prefixes: Vec<String>,
}

impl UrlScope {
    /// Creates an empty scope.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope from prefixes.
    #[must_use]
    pub fn from_prefixes(prefixes: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        prefixes
            .into_iter()
            .fold(Self::new(), |scope, prefix| scope.with_prefix(prefix.as_ref()))
    }

    /// Adds a prefix.
    ///
    /// Parseable prefixes are normalized the same way candidate URLs are, so
    /// `http://example.com` matches `http://example.com/page`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = normalize(prefix).unwrap_or_else(|| prefix.to_string());
        if !prefix.is_empty() && !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
        self
    }

    /// Returns the normalized prefixes.
    #[inline]
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns `true` if no prefix restricts the scope.
    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Returns the normalized URL if it is in scope.
    #[must_use]
    pub fn admit(&self, url: &str) -> Option<String> {
        let normalized = normalize(url)?;
        let in_scope = self.is_unrestricted()
            || self.prefixes.iter().any(|p| normalized.starts_with(p.as_str()));
        in_scope.then_some(normalized)
    }

    /// Returns `true` if the URL is in scope.
    #[inline]
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.admit(url).is_some()
    }
}

/// Parses an absolute http(s) URL and strips its fragment.
#[must_use]
pub fn normalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.into())
}

// ============================================================================
// Tests
// ============================================================================
