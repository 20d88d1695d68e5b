//! Shared, refreshable snapshot of discount rules.
//!
//! Every price shown or charged reads the same snapshot, so the catalog, the
//! cart and checkout never disagree about which discounts exist.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use atelier_pricing::DiscountRule;

use crate::discount_source::DiscountSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Refetch once the snapshot is older than this.
    Ttl(Duration),
    /// Refetch only after [`DiscountCache::invalidate`].
    Manual,
}

impl RefreshPolicy {
    /// `0` selects manual refresh.
    pub fn from_secs(secs: u64) -> Self {
        match secs {
            0 => RefreshPolicy::Manual,
            s => RefreshPolicy::Ttl(Duration::seconds(i64::try_from(s).unwrap_or(i64::MAX))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub refreshes: u64,
    pub failures: u64,
}

#[derive(Debug)]
struct Snapshot {
    rules: Arc<[DiscountRule]>,
    loaded_at: Option<DateTime<Utc>>,
    stale: bool,
    /// Bumped by every invalidation.
    generation: u64,
}

pub struct DiscountCache<S> {
    source: S,
    policy: RefreshPolicy,
    snapshot: RwLock<Snapshot>,
    hits: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl<S: DiscountSource> DiscountCache<S> {
    pub fn new(source: S, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            snapshot: RwLock::new(Snapshot {
                rules: Arc::from(Vec::new()),
                loaded_at: None,
                stale: true,
                generation: 0,
            }),
            hits: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current rules, refetching first when the snapshot is stale or expired.
    ///
    /// A failed refetch keeps serving the previous snapshot and retries on the
    /// next call.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Arc<[DiscountRule]> {
        if let Ok(current) = self.snapshot.read() {
            if self.is_fresh(&current, now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(&current.rules);
            }
        }

        match self.refresh(now) {
            Ok(rules) => rules,
            Err(error) => {
                tracing::warn!(error = %error, "discount refresh failed; serving previous snapshot");
                self.current_rules()
            }
        }
    }

    /// Refetch unconditionally.
    ///
    /// An invalidation that lands while the fetch is running leaves the stored
    /// snapshot stale, so the next read fetches again.
    pub fn refresh(&self, now: DateTime<Utc>) -> anyhow::Result<Arc<[DiscountRule]>> {
        let started_at = self.generation();
        let rules: Arc<[DiscountRule]> = match self.source.fetch() {
            Ok(rules) => Arc::from(rules),
            Err(error) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(error);
            }
        };

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(rule_count = rules.len(), "discount cache refreshed");

        if let Ok(mut snapshot) = self.snapshot.write() {
            snapshot.rules = Arc::clone(&rules);
            snapshot.loaded_at = Some(now);
            snapshot.stale = snapshot.generation != started_at;
        }
        Ok(rules)
    }

    /// Mark the snapshot stale; the next read refetches.
    pub fn invalidate(&self) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            snapshot.stale = true;
            snapshot.generation = snapshot.generation.wrapping_add(1);
        }
        tracing::debug!("discount cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn generation(&self) -> u64 {
        self.snapshot.read().map(|s| s.generation).unwrap_or_default()
    }

    fn current_rules(&self) -> Arc<[DiscountRule]> {
        match self.snapshot.read() {
            Ok(snapshot) => Arc::clone(&snapshot.rules),
            Err(_) => Arc::from(Vec::new()),
        }
    }

    fn is_fresh(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> bool {
        let Some(loaded_at) = snapshot.loaded_at else {
            return false;
        };
        if snapshot.stale {
            return false;
        }
        match self.policy {
            RefreshPolicy::Manual => true,
            RefreshPolicy::Ttl(ttl) => now - loaded_at < ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_catalog::{DiscountScope, ProductId};
    use atelier_core::{AggregateId, Percent};
    use atelier_pricing::PromotionWindow;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Mutex, mpsc};

    struct Feed {
        percent: Mutex<u8>,
        fail: AtomicBool,
        calls: AtomicU64,
    }

    #[derive(Clone)]
    struct Scripted(Arc<Feed>);

    impl std::ops::Deref for Scripted {
        type Target = Feed;

        fn deref(&self) -> &Feed {
            &self.0
        }
    }

    impl Scripted {
        fn new(percent: u8) -> Self {
            Self(Arc::new(Feed {
                percent: Mutex::new(percent),
                fail: AtomicBool::new(false),
                calls: AtomicU64::new(0),
            }))
        }
    }

    impl DiscountSource for Scripted {
        fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("feed unavailable");
            }
            let percent = *self.percent.lock().unwrap();
            let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            Ok(vec![DiscountRule::new(
                DiscountScope::Product(ProductId::new(AggregateId::new())),
                Percent::new(percent).unwrap(),
                PromotionWindow::new(start, start + Duration::days(365)),
            )])
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn ttl_serves_hits_until_expiry() {
        let source = Scripted::new(10);
        let cache = DiscountCache::new(source.clone(), RefreshPolicy::Ttl(Duration::seconds(60)));

        assert_eq!(cache.snapshot(t(0))[0].percent.value(), 10);
        *source.percent.lock().unwrap() = 30;
        assert_eq!(cache.snapshot(t(59))[0].percent.value(), 10);
        assert_eq!(cache.snapshot(t(60))[0].percent.value(), 30);

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 1, refreshes: 2, failures: 0 });
    }

    #[test]
    fn manual_policy_refetches_only_after_invalidate() {
        let source = Scripted::new(10);
        let cache = DiscountCache::new(source.clone(), RefreshPolicy::from_secs(0));
        assert_eq!(cache.policy(), RefreshPolicy::Manual);

        cache.snapshot(t(0));
        *source.percent.lock().unwrap() = 50;
        assert_eq!(cache.snapshot(t(86_400))[0].percent.value(), 10);

        cache.invalidate();
        assert_eq!(cache.snapshot(t(86_401))[0].percent.value(), 50);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let source = Scripted::new(25);
        let cache = DiscountCache::new(source.clone(), RefreshPolicy::Manual);
        cache.snapshot(t(0));

        source.fail.store(true, Ordering::SeqCst);
        cache.invalidate();
        let rules = cache.snapshot(t(1));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].percent.value(), 25);
        assert!(cache.refresh(t(2)).is_err());
        assert_eq!(cache.stats().failures, 2);

        source.fail.store(false, Ordering::SeqCst);
        *source.percent.lock().unwrap() = 40;
        assert_eq!(cache.snapshot(t(3))[0].percent.value(), 40);
    }

    /// Blocks its first fetch between reading the percent and returning.
    struct Gated {
        percent: Mutex<u8>,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl DiscountSource for Gated {
        fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>> {
            let percent = *self.percent.lock().unwrap();
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                let release = self.release.lock().unwrap().take();
                if let Some(release) = release {
                    release.recv().unwrap();
                }
            }
            let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            Ok(vec![DiscountRule::new(
                DiscountScope::Product(ProductId::new(AggregateId::new())),
                Percent::new(percent).unwrap(),
                PromotionWindow::new(start, start + Duration::days(365)),
            )])
        }
    }

    #[test]
    fn invalidate_during_refresh_is_not_lost() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let cache = DiscountCache::new(
            Gated {
                percent: Mutex::new(10),
                entered: Mutex::new(Some(entered_tx)),
                release: Mutex::new(Some(release_rx)),
            },
            RefreshPolicy::Manual,
        );

        std::thread::scope(|s| {
            let reader = s.spawn(|| cache.snapshot(t(0))[0].percent.value());
            entered_rx.recv().unwrap();

            *cache.source().percent.lock().unwrap() = 40;
            cache.invalidate();
            release_tx.send(()).unwrap();

            assert_eq!(reader.join().unwrap(), 10);
        });

        assert_eq!(cache.snapshot(t(1))[0].percent.value(), 40);
        assert_eq!(cache.snapshot(t(2))[0].percent.value(), 40);
        assert_eq!(cache.stats().refreshes, 2);
    }

    #[test]
    fn failure_before_first_load_serves_nothing() {
        let source = Scripted::new(25);
        source.fail.store(true, Ordering::SeqCst);
        let cache = DiscountCache::new(source.clone(), RefreshPolicy::Manual);
        assert!(cache.snapshot(t(0)).is_empty());
    }
}
