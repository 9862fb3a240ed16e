//! Structural deduplication of mapped documents.
//!
//! [`ValueCache::store`] hands back one canonical `Arc<Document>` per
//! structurally distinct document. Documents hash and compare by value, with
//! object keys kept sorted, so equality does not depend on the order in which
//! an object was populated. Entries live until the cache is dropped.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::document::Document;

#[derive(Debug, Default)]
pub struct ValueCache {
    entries: Mutex<HashSet<Arc<Document>>>,
    stores: AtomicUsize,
    hits: AtomicUsize,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical instance equal to `document`, registering
    /// `document` itself when no equal one is known yet.
    ///
    /// Accepts owned documents as well as already shared ones; storing a
    /// canonical reference returns that same reference.
    pub fn store(&self, document: impl Into<Arc<Document>>) -> Arc<Document> {
        let document = document.into();
        self.stores.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        if let Some(canonical) = entries.get(&document) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(canonical);
        }
        entries.insert(Arc::clone(&document));
        document
    }

    /// Number of distinct documents retained.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            stores: self.stores.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            distinct: self.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Arc<Document>>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub stores: usize,
    pub hits: usize,
    pub distinct: usize,
}
