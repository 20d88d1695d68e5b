//! Back-office operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::{
    ActivateProduct, ArchiveProduct, Category, CategoryCommand, CategoryId, CreateCategory,
    CreateDiscount, CreateProduct, DeleteDiscount, Discount, DiscountCommand, DiscountId,
    DiscountScope, DiscountStatus, Product, ProductCommand, ProductId, ProductStatus,
    RemoveCategory, RenameCategory, ReviseDiscount, ReviseProduct,
};
use atelier_core::{AggregateId, DomainError, ExpectedVersion, Money, Percent};
use atelier_sales::{ChangeStatus, DateRange, Order, OrderCommand, OrderId, OrderStatus, SalesSummary};

use crate::error::StorefrontResult;
use crate::storefront::Storefront;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub base_price: Money,
}

/// Editable product fields; the SKU is fixed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRevision {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub base_price: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiscount {
    pub scope: DiscountScope,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRevision {
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// One row of the back-office discounts table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountListing {
    pub discount_id: DiscountId,
    pub scope: DiscountScope,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: DiscountStatus,
    pub version: u64,
}

impl Storefront {
    pub fn create_category(&self, name: &str) -> StorefrontResult<Category> {
        let category_id = CategoryId::new(AggregateId::new());
        let committed = self.categories.execute(
            category_id,
            ExpectedVersion::Exact(0),
            CategoryCommand::CreateCategory(CreateCategory {
                category_id,
                name: name.to_string(),
                occurred_at: self.now(),
            }),
            Category::empty,
        )?;
        Ok(committed.aggregate)
    }

    pub fn rename_category(
        &self,
        category_id: CategoryId,
        name: &str,
        expected: ExpectedVersion,
    ) -> StorefrontResult<Category> {
        let committed = self.categories.execute(
            category_id,
            expected,
            CategoryCommand::RenameCategory(RenameCategory {
                category_id,
                name: name.to_string(),
                occurred_at: self.now(),
            }),
            Category::empty,
        )?;
        Ok(committed.aggregate)
    }

    /// Refused while any non-archived product is still filed under the category.
    pub fn remove_category(&self, category_id: CategoryId) -> StorefrontResult<()> {
        let _guard = self.lock_catalog()?;
        let assigned = self
            .products
            .list()
            .iter()
            .filter(|p| p.category_id() == Some(category_id))
            .filter(|p| p.status() != ProductStatus::Archived)
            .count();
        if assigned > 0 {
            return Err(DomainError::conflict(format!(
                "category still has {assigned} product(s) assigned"
            ))
            .into());
        }

        self.categories.execute(
            category_id,
            ExpectedVersion::Any,
            CategoryCommand::RemoveCategory(RemoveCategory {
                category_id,
                occurred_at: self.now(),
            }),
            Category::empty,
        )?;
        Ok(())
    }

    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .categories
            .list()
            .into_iter()
            .filter(Category::is_live)
            .collect();
        categories.sort_by(|a, b| a.name().cmp(b.name()));
        categories
    }

    /// New products start as drafts; SKUs are unique across the catalog.
    pub fn create_product(&self, new: NewProduct) -> StorefrontResult<Product> {
        let _guard = self.lock_catalog()?;
        if let Some(category_id) = new.category_id {
            self.live_category(category_id)?;
        }
        let sku = new.sku.trim();
        if self.products.list().iter().any(|p| p.sku() == sku) {
            return Err(DomainError::conflict(format!("SKU '{sku}' is already in use")).into());
        }

        let product_id = ProductId::new(AggregateId::new());
        let committed = self.products.execute(
            product_id,
            ExpectedVersion::Exact(0),
            ProductCommand::CreateProduct(CreateProduct {
                product_id,
                sku: sku.to_string(),
                name: new.name,
                category_id: new.category_id,
                base_price: new.base_price,
                occurred_at: self.now(),
            }),
            Product::empty,
        )?;
        Ok(committed.aggregate)
    }

    pub fn revise_product(
        &self,
        product_id: ProductId,
        revision: ProductRevision,
        expected: ExpectedVersion,
    ) -> StorefrontResult<Product> {
        let _guard = self.lock_catalog()?;
        if let Some(category_id) = revision.category_id {
            self.live_category(category_id)?;
        }
        let committed = self.products.execute(
            product_id,
            expected,
            ProductCommand::ReviseProduct(ReviseProduct {
                product_id,
                name: revision.name,
                category_id: revision.category_id,
                base_price: revision.base_price,
                occurred_at: self.now(),
            }),
            Product::empty,
        )?;
        Ok(committed.aggregate)
    }

    pub fn activate_product(&self, product_id: ProductId) -> StorefrontResult<Product> {
        let committed = self.products.execute(
            product_id,
            ExpectedVersion::Any,
            ProductCommand::ActivateProduct(ActivateProduct {
                product_id,
                occurred_at: self.now(),
            }),
            Product::empty,
        )?;
        Ok(committed.aggregate)
    }

    pub fn archive_product(&self, product_id: ProductId) -> StorefrontResult<Product> {
        let committed = self.products.execute(
            product_id,
            ExpectedVersion::Any,
            ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: self.now(),
            }),
            Product::empty,
        )?;
        Ok(committed.aggregate)
    }

    /// Every product, whatever its status, sorted by SKU.
    pub fn products(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .list()
            .into_iter()
            .filter(Product::is_created)
            .collect();
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        products
    }

    pub fn create_discount(&self, new: NewDiscount) -> StorefrontResult<Discount> {
        match new.scope {
            DiscountScope::Product(product_id) => {
                self.products
                    .get(&product_id)
                    .filter(Product::is_created)
                    .ok_or(DomainError::NotFound)?;
            }
            DiscountScope::Category(category_id) => {
                self.live_category(category_id)?;
            }
        }

        let discount_id = DiscountId::new(AggregateId::new());
        let committed = self.discounts.execute(
            discount_id,
            ExpectedVersion::Exact(0),
            DiscountCommand::CreateDiscount(CreateDiscount {
                discount_id,
                scope: new.scope,
                percent: new.percent,
                starts_at: new.starts_at,
                ends_at: new.ends_at,
                occurred_at: self.now(),
            }),
            Discount::empty,
        )?;
        self.discount_cache.invalidate();
        Ok(committed.aggregate)
    }

    pub fn revise_discount(
        &self,
        discount_id: DiscountId,
        revision: DiscountRevision,
        expected: ExpectedVersion,
    ) -> StorefrontResult<Discount> {
        let committed = self.discounts.execute(
            discount_id,
            expected,
            DiscountCommand::ReviseDiscount(ReviseDiscount {
                discount_id,
                percent: revision.percent,
                starts_at: revision.starts_at,
                ends_at: revision.ends_at,
                occurred_at: self.now(),
            }),
            Discount::empty,
        )?;
        self.discount_cache.invalidate();
        Ok(committed.aggregate)
    }

    pub fn delete_discount(&self, discount_id: DiscountId) -> StorefrontResult<()> {
        self.discounts.execute(
            discount_id,
            ExpectedVersion::Any,
            DiscountCommand::DeleteDiscount(DeleteDiscount {
                discount_id,
                occurred_at: self.now(),
            }),
            Discount::empty,
        )?;
        self.discount_cache.invalidate();
        Ok(())
    }

    /// Live discounts with their status right now, soonest start first.
    pub fn list_discounts(&self) -> Vec<DiscountListing> {
        let now = self.now();
        let mut listings: Vec<DiscountListing> = self
            .discounts
            .list()
            .iter()
            .filter(|d| d.is_live())
            .filter_map(|d| {
                Some(DiscountListing {
                    discount_id: d.id_typed(),
                    scope: d.scope()?,
                    percent: d.percent(),
                    starts_at: d.starts_at(),
                    ends_at: d.ends_at(),
                    status: d.status_at(now),
                    version: atelier_core::AggregateRoot::version(d),
                })
            })
            .collect();
        listings.sort_by(|a, b| {
            a.starts_at
                .cmp(&b.starts_at)
                .then(a.discount_id.cmp(&b.discount_id))
        });
        listings
    }

    pub fn update_order_status(&self, order_id: OrderId, to: OrderStatus) -> StorefrontResult<Order> {
        let committed = self.orders.execute(
            order_id,
            ExpectedVersion::Any,
            OrderCommand::ChangeStatus(ChangeStatus {
                order_id,
                to,
                occurred_at: self.now(),
            }),
            Order::empty,
        )?;
        Ok(committed.aggregate)
    }

    pub fn sales_summary(&self, range: Option<DateRange>, top_n: usize) -> SalesSummary {
        let orders = self.orders.list();
        SalesSummary::compute(&orders, range, top_n)
    }
}
