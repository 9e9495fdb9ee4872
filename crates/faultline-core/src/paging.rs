//! Repository paging/query options
//!
//! `PagingOptions` is the request descriptor every repository query accepts.
//! Offset paging (`page`, 1-based) and cursor paging (`before`/`after`,
//! opaque ordering keys compared lexicographically) are mutually exclusive:
//! when a page number is supplied the cursor fields are ignored.

use serde::{Deserialize, Serialize};

/// Limit applied when the caller does not supply one (or supplies zero).
pub const DEFAULT_LIMIT: u64 = 10;
/// Hard ceiling on the page size a caller may request.
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagingOptions {
    pub limit: Option<u64>,
    /// 1-based page number. Takes precedence over `before`/`after`.
    pub page: Option<u64>,
    /// Only return entities with id strictly less than this key.
    pub before: Option<String>,
    /// Only return entities with id strictly greater than this key.
    pub after: Option<String>,
    /// Serve the result from cache when possible. Ignored for paged queries.
    #[serde(default)]
    pub use_cache: bool,
}

impl PagingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    pub fn cached(mut self) -> Self {
        self.use_cache = true;
        self
    }

    /// The effective page size, clamped to `[1, MAX_LIMIT]`.
    pub fn clamped_limit(&self) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    /// Number of rows to skip for offset paging, when a page is set.
    pub fn skip(&self) -> Option<u64> {
        self.page.map(|p| (p.max(1) - 1) * self.clamped_limit())
    }

    /// Cursor filters, honoring page/cursor exclusivity: `None` when a page
    /// number is set, otherwise the (`before`, `after`) pair.
    pub fn cursors(&self) -> Option<(Option<&str>, Option<&str>)> {
        if self.page.is_some() {
            return None;
        }
        if self.before.is_none() && self.after.is_none() {
            return None;
        }
        Some((self.before.as_deref(), self.after.as_deref()))
    }

    /// True when the query requests a specific page or cursor window.
    /// Such results must never be served from cache.
    pub fn is_paged(&self) -> bool {
        self.page.is_some() || self.before.is_some() || self.after.is_some()
    }
}
