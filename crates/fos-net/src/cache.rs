//! Source Cache
//!
//! Memoizes one shared fetch per source identifier. Concurrent and later
//! callers await the same future. Successful text is kept for the cache's
//! lifetime; a failure evicts its entry before any caller sees the error,
//! so the next request starts a fresh fetch.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::{Fetcher, NetError};

/// Shared, memoized fetch of one source's text
pub type SourceFuture = Shared<LocalBoxFuture<'static, Result<Rc<str>, NetError>>>;

struct CacheInner {
    name: &'static str,
    fetcher: Rc<dyn Fetcher>,
    /// Entries are tagged so a stale failure never evicts a newer fetch
    entries: RefCell<HashMap<String, (u64, SourceFuture)>>,
    next_tag: Cell<u64>,
}

/// Memoizing source cache
#[derive(Clone)]
pub struct SourceCache {
    inner: Rc<CacheInner>,
}

impl std::fmt::Debug for SourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCache")
            .field("name", &self.inner.name)
            .field("entries", &self.len())
            .finish()
    }
}

impl SourceCache {
    /// `name` labels log lines ("source", "fallback")
    pub fn new(name: &'static str, fetcher: Rc<dyn Fetcher>) -> Self {
        Self {
            inner: Rc::new(CacheInner {
                name,
                fetcher,
                entries: RefCell::new(HashMap::new()),
                next_tag: Cell::new(0),
            }),
        }
    }

    /// Get the pending or completed fetch for `id`, starting one if needed
    pub fn get(&self, id: &str) -> SourceFuture {
        if let Some((_, pending)) = self.inner.entries.borrow().get(id) {
            tracing::trace!(cache = self.inner.name, id, "Source cache hit");
            return pending.clone();
        }

        let tag = self.inner.next_tag.get();
        self.inner.next_tag.set(tag + 1);

        tracing::debug!(cache = self.inner.name, id, "Fetching source");
        let request = self.inner.fetcher.fetch(id);
        let weak: Weak<CacheInner> = Rc::downgrade(&self.inner);
        let key = id.to_string();

        let future = async move {
            let result: Result<Rc<str>, NetError> = match request.await {
                Ok(response) if response.ok() => response.text().map(Rc::from),
                Ok(response) => Err(NetError::Http {
                    status: response.status,
                    status_text: response.status_text,
                }),
                Err(e) => Err(e),
            };

            if let Err(e) = &result {
                if let Some(inner) = weak.upgrade() {
                    let mut entries = inner.entries.borrow_mut();
                    if entries.get(&key).map(|(t, _)| *t) == Some(tag) {
                        entries.remove(&key);
                    }
                    tracing::warn!(cache = inner.name, id = %key, error = %e, "Source fetch failed, evicted");
                }
            }
            result
        }
        .boxed_local()
        .shared();

        self.inner.entries.borrow_mut().insert(id.to_string(), (tag, future.clone()));
        future
    }

    /// Drop the entry for `id`. Returns whether one existed.
    pub fn invalidate(&self, id: &str) -> bool {
        let removed = self.inner.entries.borrow_mut().remove(id).is_some();
        if removed {
            tracing::debug!(cache = self.inner.name, id, "Source invalidated");
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.entries.borrow_mut().clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.entries.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryFetcher, Response};

    fn cache(fetcher: &MemoryFetcher) -> SourceCache {
        SourceCache::new("source", Rc::new(fetcher.clone()))
    }

    #[test]
    fn test_concurrent_gets_share_one_fetch() {
        let fetcher = MemoryFetcher::new();
        fetcher.route("/c/x.html", "<template></template>");
        let cache = cache(&fetcher);

        let (a, b) = smol::block_on(futures::future::join(cache.get("/c/x.html"), cache.get("/c/x.html")));
        assert_eq!(&*a.unwrap(), "<template></template>");
        assert!(b.is_ok());
        assert_eq!(fetcher.requests("/c/x.html"), 1);

        // Later callers reuse the completed result
        smol::block_on(cache.get("/c/x.html")).unwrap();
        assert_eq!(fetcher.requests("/c/x.html"), 1);
    }

    #[test]
    fn test_failure_evicts_before_observed() {
        let fetcher = MemoryFetcher::new();
        fetcher.respond("/c/x.html", Response::with_status(500, "Internal Server Error", ""));
        let cache = cache(&fetcher);

        let err = smol::block_on(cache.get("/c/x.html")).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!cache.contains("/c/x.html"));

        fetcher.route("/c/x.html", "ok");
        assert_eq!(&*smol::block_on(cache.get("/c/x.html")).unwrap(), "ok");
        assert_eq!(fetcher.requests("/c/x.html"), 2);
    }

    #[test]
    fn test_stale_failure_keeps_newer_entry() {
        let fetcher = MemoryFetcher::new();
        fetcher.fail("/x", "reset");
        let cache = cache(&fetcher);

        let stale = cache.get("/x");
        cache.invalidate("/x");
        fetcher.route("/x", "fresh");
        let fresh = cache.get("/x");

        assert!(smol::block_on(stale).is_err());
        assert!(cache.contains("/x"));
        assert_eq!(&*smol::block_on(fresh).unwrap(), "fresh");
    }

    #[test]
    fn test_invalidate_and_clear() {
        let fetcher = MemoryFetcher::new();
        fetcher.route("/a", "a").route("/b", "b");
        let cache = cache(&fetcher);

        smol::block_on(cache.get("/a")).unwrap();
        smol::block_on(cache.get("/b")).unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("/a"));
        assert!(!cache.invalidate("/a"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
