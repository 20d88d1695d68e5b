use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::{CategoryId, Discount, DiscountId, DiscountScope, ProductId};
use atelier_core::{Money, Percent};

use crate::window::PromotionWindow;

/// The resolver's view of a discount: scope, percentage and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: Option<DiscountId>,
    pub scope: DiscountScope,
    pub percent: Percent,
    pub window: PromotionWindow,
}

impl DiscountRule {
    pub fn new(scope: DiscountScope, percent: Percent, window: PromotionWindow) -> Self {
        Self {
            id: None,
            scope,
            percent,
            window,
        }
    }

    /// Snapshot a live catalog discount. Deleted or never-created discounts yield `None`.
    pub fn from_discount(discount: &Discount) -> Option<Self> {
        if !discount.is_live() {
            return None;
        }
        let scope = discount.scope()?;
        Some(Self {
            id: Some(discount.id_typed()),
            scope,
            percent: discount.percent(),
            window: PromotionWindow::new(discount.starts_at(), discount.ends_at()),
        })
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.window.contains(now)
    }

    /// Whether this rule targets the product directly or through its category.
    pub fn applies_to(&self, product_id: ProductId, category_id: Option<CategoryId>) -> bool {
        match self.scope {
            DiscountScope::Product(target) => target == product_id,
            DiscountScope::Category(target) => category_id == Some(target),
        }
    }
}

/// A product as the resolver sees it: base price plus both discount pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub product_id: ProductId,
    pub category_id: Option<CategoryId>,
    pub base_price: Money,
    pub product_discounts: Vec<DiscountRule>,
    pub category_discounts: Vec<DiscountRule>,
}

impl CatalogItem {
    pub fn new(product_id: ProductId, category_id: Option<CategoryId>, base_price: Money) -> Self {
        Self {
            product_id,
            category_id,
            base_price,
            product_discounts: Vec::new(),
            category_discounts: Vec::new(),
        }
    }

    /// Build an item from a snapshot of every known discount, keeping only the
    /// rules aimed at this product or its category.
    pub fn assemble<'a, I>(
        product_id: ProductId,
        category_id: Option<CategoryId>,
        base_price: Money,
        rules: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'a DiscountRule>,
    {
        let mut item = Self::new(product_id, category_id, base_price);
        for rule in rules {
            if !rule.applies_to(product_id, category_id) {
                continue;
            }
            if rule.scope.is_product() {
                item.product_discounts.push(*rule);
            } else {
                item.category_discounts.push(*rule);
            }
        }
        item
    }

    pub fn with_product_discount(mut self, rule: DiscountRule) -> Self {
        self.product_discounts.push(rule);
        self
    }

    pub fn with_category_discount(mut self, rule: DiscountRule) -> Self {
        self.category_discounts.push(rule);
        self
    }

    /// Union of both pools.
    pub fn candidates(&self) -> impl Iterator<Item = &DiscountRule> {
        self.product_discounts.iter().chain(self.category_discounts.iter())
    }
}
