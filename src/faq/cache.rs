//! TTL cache in front of a [`FaqSource`].
//!
//! Refreshes lazily on read. A failed refresh keeps serving the previous
//! entries (or none) and retries after `min(ttl, 60s)` instead of hitting the
//! page on every message.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::{FaqEntry, FaqSource};

const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(60);

struct Cached {
    entries: Arc<Vec<FaqEntry>>,
    expires_at: Instant,
}

pub struct DynamicFaqs {
    source: Box<dyn FaqSource>,
    ttl: Duration,
    cached: RwLock<Option<Cached>>,
}

impl DynamicFaqs {
    pub fn new(source: Box<dyn FaqSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current entries, refreshing first when the cache has expired.
    pub fn entries(&self) -> Arc<Vec<FaqEntry>> {
        let now = Instant::now();
        {
            let cached = self.cached.read();
            if let Some(c) = cached.as_ref().filter(|c| now < c.expires_at) {
                return c.entries.clone();
            }
        }

        let mut cached = self.cached.write();
        // another caller may have refreshed while we waited for the lock
        if let Some(c) = cached.as_ref().filter(|c| now < c.expires_at) {
            return c.entries.clone();
        }

        let previous = cached.as_ref().map(|c| c.entries.clone());
        let fresh = match self.source.fetch() {
            Ok(entries) => Cached {
                entries: Arc::new(entries),
                expires_at: now + self.ttl,
            },
            Err(e) => {
                tracing::warn!(error = %e, stale = previous.as_ref().map_or(0, |p| p.len()), "FAQ refresh failed");
                Cached {
                    entries: previous.unwrap_or_default(),
                    expires_at: now + self.ttl.min(RETRY_AFTER_FAILURE),
                }
            }
        };
        let entries = fresh.entries.clone();
        *cached = Some(fresh);
        entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::super::FaqFetchError;
    use super::*;

    #[derive(Clone, Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
        down: Arc<AtomicBool>,
    }

    impl FaqSource for Counting {
        fn fetch(&self) -> Result<Vec<FaqEntry>, FaqFetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.down.load(Ordering::SeqCst) {
                return Err(FaqFetchError::Parse("down".into()));
            }
            Ok(vec![FaqEntry::new("store hours", &format!("version {n}"))])
        }
    }

    #[test]
    fn fetches_once_within_ttl() {
        let source = Counting::default();
        let faqs = DynamicFaqs::new(Box::new(source.clone()), Duration::from_secs(3600));
        for _ in 0..5 {
            assert_eq!(faqs.entries()[0].answer, "version 1");
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_ttl_refetches_every_read() {
        let source = Counting::default();
        let faqs = DynamicFaqs::new(Box::new(source.clone()), Duration::ZERO);
        faqs.entries();
        assert_eq!(faqs.entries()[0].answer, "version 2");
    }

    #[test]
    fn failure_keeps_stale_entries() {
        let source = Counting::default();
        let faqs = DynamicFaqs::new(Box::new(source.clone()), Duration::ZERO);
        assert_eq!(faqs.entries().len(), 1);

        source.down.store(true, Ordering::SeqCst);
        let entries = faqs.entries();
        assert_eq!(entries[0].answer, "version 1");
    }

    #[test]
    fn failure_without_cache_is_empty() {
        let source = Counting::default();
        source.down.store(true, Ordering::SeqCst);
        let faqs = DynamicFaqs::new(Box::new(source.clone()), Duration::from_secs(3600));
        assert!(faqs.entries().is_empty());
        // backs off instead of refetching on every read
        assert!(faqs.entries().is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
