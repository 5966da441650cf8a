//! Per-item bookkeeping records.

/// A cached item together with its timestamp metadata.
///
/// Entries are immutable: marking an access or a modification produces a
/// new entry via [`with_accessed`](CacheEntry::with_accessed) or
/// [`with_modified`](CacheEntry::with_modified) instead of mutating in
/// place. The cache owns its entries exclusively and only ever hands the
/// wrapped item back to callers, so the metadata cannot be observed or
/// raced from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    item: T,
    created: i64,
    accessed: Option<i64>,
    modified: Option<i64>,
}

impl<T> CacheEntry<T> {
    /// A fresh entry created at `created`, never accessed or modified.
    pub fn new(item: T, created: i64) -> Self {
        Self {
            item,
            created,
            accessed: None,
            modified: None,
        }
    }

    /// The wrapped item.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consume the entry, returning the wrapped item.
    pub fn into_item(self) -> T {
        self.item
    }

    /// When the entry was first inserted. Fixed for the lifetime of the
    /// key's occupancy; modification does not change it.
    pub fn created(&self) -> i64 {
        self.created
    }

    /// When the item was last read out, if ever.
    pub fn accessed(&self) -> Option<i64> {
        self.accessed
    }

    /// When the item was last replaced, if ever.
    pub fn modified(&self) -> Option<i64> {
        self.modified
    }

    /// This entry marked as accessed at `at`.
    pub fn with_accessed(self, at: i64) -> Self {
        Self {
            accessed: Some(at),
            ..self
        }
    }

    /// This entry with the item replaced at `at`. The creation and
    /// access timestamps carry over.
    pub fn with_modified(self, item: T, at: i64) -> Self {
        Self {
            item,
            modified: Some(at),
            ..self
        }
    }
}
