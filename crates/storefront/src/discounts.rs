use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use atelier_catalog::{Discount, DiscountId};
use atelier_infra::{DiscountSource, InMemoryStore, JsonDiscountSource, Store};
use atelier_pricing::DiscountRule;

/// Discount rules as the resolver sees them: every live back-office discount,
/// plus the optional external feed.
///
/// The feed fails on its own. When it cannot be read, the last rules it
/// delivered stand in for it and back-office discounts are still current.
pub struct CatalogDiscounts {
    discounts: Arc<InMemoryStore<DiscountId, Discount>>,
    feed: Option<JsonDiscountSource>,
    last_feed: RwLock<Vec<DiscountRule>>,
    feed_failures: AtomicU64,
}

impl CatalogDiscounts {
    pub fn new(
        discounts: Arc<InMemoryStore<DiscountId, Discount>>,
        feed: Option<JsonDiscountSource>,
    ) -> Self {
        Self {
            discounts,
            feed,
            last_feed: RwLock::new(Vec::new()),
            feed_failures: AtomicU64::new(0),
        }
    }

    /// Number of feed reads that failed and fell back to the last good rules.
    pub fn feed_failures(&self) -> u64 {
        self.feed_failures.load(Ordering::Relaxed)
    }

    fn feed_rules(&self, feed: &JsonDiscountSource) -> Vec<DiscountRule> {
        match feed.fetch() {
            Ok(rules) => {
                if let Ok(mut last) = self.last_feed.write() {
                    last.clone_from(&rules);
                }
                rules
            }
            Err(error) => {
                self.feed_failures.fetch_add(1, Ordering::Relaxed);
                let last = self
                    .last_feed
                    .read()
                    .map(|rules| rules.clone())
                    .unwrap_or_default();
                tracing::warn!(
                    error = %error,
                    kept_rules = last.len(),
                    "external discount feed unavailable; keeping last good feed"
                );
                last
            }
        }
    }
}

impl DiscountSource for CatalogDiscounts {
    fn fetch(&self) -> anyhow::Result<Vec<DiscountRule>> {
        let mut rules: Vec<DiscountRule> = self
            .discounts
            .list()
            .iter()
            .filter_map(DiscountRule::from_discount)
            .collect();
        if let Some(feed) = &self.feed {
            rules.extend(self.feed_rules(feed));
        }
        Ok(rules)
    }
}
