use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::{
    Category, CategoryId, Discount, DiscountId, Product, ProductId,
};
use atelier_core::{CustomerId, DomainError};
use atelier_infra::{
    AggregateRepository, DiscountCache, DispatchError, InMemoryStore, JsonDiscountSource,
};
use atelier_pricing::{CatalogItem, DiscountRule, PriceResolver, ResolvedPrice};
use atelier_sales::{Cart, Order, OrderId};

use crate::clock::Clock;
use crate::config::StorefrontConfig;
use crate::discounts::CatalogDiscounts;
use crate::error::{StorefrontError, StorefrontResult};

pub(crate) type CategoryRepo = AggregateRepository<Category, InMemoryStore<CategoryId, Category>>;
pub(crate) type ProductRepo = AggregateRepository<Product, InMemoryStore<ProductId, Product>>;
pub(crate) type DiscountRepo =
    AggregateRepository<Discount, Arc<InMemoryStore<DiscountId, Discount>>>;
pub(crate) type OrderRepo = AggregateRepository<Order, InMemoryStore<OrderId, Order>>;

/// A product as listed in the shop, priced at the moment of listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub price: ResolvedPrice,
}

/// Storefront application service: back-office administration and the
/// shopper-facing catalog, cart and checkout.
///
/// Every price (listing, cart, checkout) goes through the same
/// [`PriceResolver`] over the same discount snapshot.
pub struct Storefront {
    pub(crate) categories: CategoryRepo,
    pub(crate) products: ProductRepo,
    pub(crate) discounts: DiscountRepo,
    pub(crate) orders: OrderRepo,
    pub(crate) carts: InMemoryStore<CustomerId, Cart>,
    pub(crate) discount_cache: DiscountCache<CatalogDiscounts>,
    pub(crate) resolver: PriceResolver,
    pub(crate) clock: Arc<dyn Clock>,
    catalog_lock: Mutex<()>,
    cart_lock: Mutex<()>,
}

impl Storefront {
    pub fn new(config: &StorefrontConfig, clock: Arc<dyn Clock>) -> Self {
        let discount_store = Arc::new(InMemoryStore::new());
        let feed = config.discount_feed.clone().map(JsonDiscountSource::from_path);

        tracing::info!(
            strategy = ?config.strategy,
            rounding = ?config.rounding,
            cache = ?config.cache_refresh,
            external_feed = feed.is_some(),
            "storefront initialised"
        );

        Self {
            categories: AggregateRepository::new(InMemoryStore::new(), "catalog.category"),
            products: AggregateRepository::new(InMemoryStore::new(), "catalog.product"),
            discounts: AggregateRepository::new(Arc::clone(&discount_store), "catalog.discount"),
            orders: AggregateRepository::new(InMemoryStore::new(), "sales.order"),
            carts: InMemoryStore::new(),
            discount_cache: DiscountCache::new(
                CatalogDiscounts::new(discount_store, feed),
                config.cache_refresh,
            ),
            resolver: PriceResolver::new(config.strategy, config.rounding),
            clock,
            catalog_lock: Mutex::new(()),
            cart_lock: Mutex::new(()),
        }
    }

    pub fn resolver(&self) -> PriceResolver {
        self.resolver
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Drop the cached discount snapshot so the next price lookup refetches.
    pub fn refresh_discounts(&self) {
        self.discount_cache.invalidate();
    }

    pub fn discount_cache_stats(&self) -> atelier_infra::CacheStats {
        self.discount_cache.stats()
    }

    /// External feed reads that failed since startup.
    pub fn discount_feed_failures(&self) -> u64 {
        self.discount_cache.source().feed_failures()
    }

    pub(crate) fn discount_rules(&self, now: DateTime<Utc>) -> Arc<[DiscountRule]> {
        self.discount_cache.snapshot(now)
    }

    pub(crate) fn price_with(
        &self,
        product: &Product,
        rules: &[DiscountRule],
        now: DateTime<Utc>,
    ) -> ResolvedPrice {
        let item = CatalogItem::assemble(
            product.id_typed(),
            product.category_id(),
            product.base_price(),
            rules,
        );
        self.resolver.resolve(&item, now)
    }

    pub(crate) fn sellable_product(&self, product_id: ProductId) -> StorefrontResult<Product> {
        self.products
            .get(&product_id)
            .filter(Product::can_be_sold)
            .ok_or(StorefrontError::Dispatch(DispatchError::NotFound))
    }

    pub(crate) fn live_category(&self, category_id: CategoryId) -> StorefrontResult<Category> {
        self.categories
            .get(&category_id)
            .filter(Category::is_live)
            .ok_or(StorefrontError::Dispatch(DispatchError::NotFound))
    }

    pub(crate) fn lock_catalog(&self) -> StorefrontResult<MutexGuard<'_, ()>> {
        self.catalog_lock
            .lock()
            .map_err(|_| DispatchError::Store("catalog lock poisoned".to_string()).into())
    }

    pub(crate) fn lock_carts(&self) -> StorefrontResult<MutexGuard<'_, ()>> {
        self.cart_lock
            .lock()
            .map_err(|_| DispatchError::Store("cart lock poisoned".to_string()).into())
    }

    pub(crate) fn order_or_not_found(&self, order_id: OrderId) -> StorefrontResult<Order> {
        self.orders
            .get(&order_id)
            .ok_or_else(|| DomainError::not_found().into())
    }
}
