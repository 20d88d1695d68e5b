//! Effective price resolution.
//!
//! Given a product's base price and every discount that could touch it, pick
//! the percentage that applies at `now` and compute the final price. There are
//! no error paths: malformed or unparseable windows simply never match.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{DomainError, Money, Percent, PriceRounding};

use crate::rule::{CatalogItem, DiscountRule};

/// Outcome of resolving a single item.
///
/// `discount_percent` is the winning rule's percentage even when rounding
/// absorbs the whole markdown (a 1% rule on a 99-cent item under whole-unit
/// rounding). Use [`ResolvedPrice::is_discounted`] to decide whether to show a
/// sale badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub original_price: Money,
    pub discount_percent: Percent,
    pub final_price: Money,
}

impl ResolvedPrice {
    fn undiscounted(original_price: Money) -> Self {
        Self {
            original_price,
            discount_percent: Percent::ZERO,
            final_price: original_price,
        }
    }

    /// True when the shopper actually pays less than the original price.
    pub fn is_discounted(&self) -> bool {
        self.final_price < self.original_price
    }

    /// `original_price - final_price`.
    pub fn savings(&self) -> Money {
        self.original_price.saturating_sub(self.final_price)
    }
}

/// How competing active discounts are reduced to one percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Largest active percentage, whatever its scope.
    #[default]
    HighestActive,
    /// Largest active product discount; category discounts only when that is zero.
    ProductFirst,
}

impl FromStr for ResolutionStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" | "highest_active" | "highest-active" => Ok(Self::HighestActive),
            "product-first" | "product_first" => Ok(Self::ProductFirst),
            other => Err(DomainError::validation(format!(
                "unknown discount strategy '{other}'"
            ))),
        }
    }
}

/// Resolver configuration shared by every caller that shows or charges a price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceResolver {
    strategy: ResolutionStrategy,
    rounding: PriceRounding,
}

impl PriceResolver {
    pub fn new(strategy: ResolutionStrategy, rounding: PriceRounding) -> Self {
        Self { strategy, rounding }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    pub fn rounding(&self) -> PriceRounding {
        self.rounding
    }

    pub fn resolve(&self, item: &CatalogItem, now: DateTime<Utc>) -> ResolvedPrice {
        let percent = self.winning_percent(item, now);
        if percent.is_zero() {
            return ResolvedPrice::undiscounted(item.base_price);
        }
        ResolvedPrice {
            original_price: item.base_price,
            discount_percent: percent,
            final_price: item.base_price.percent_off(percent, self.rounding),
        }
    }

    /// The percentage that applies to `item` at `now`, zero when nothing is active.
    pub fn winning_percent(&self, item: &CatalogItem, now: DateTime<Utc>) -> Percent {
        match self.strategy {
            ResolutionStrategy::HighestActive => highest_active(item.candidates(), now),
            ResolutionStrategy::ProductFirst => {
                let product = highest_active(item.product_discounts.iter(), now);
                if product.is_zero() {
                    highest_active(item.category_discounts.iter(), now)
                } else {
                    product
                }
            }
        }
    }
}

/// Resolve with the default strategy and rounding.
pub fn resolve(item: &CatalogItem, now: DateTime<Utc>) -> ResolvedPrice {
    PriceResolver::default().resolve(item, now)
}

fn highest_active<'a, I>(rules: I, now: DateTime<Utc>) -> Percent
where
    I: Iterator<Item = &'a DiscountRule>,
{
    rules
        .filter(|rule| rule.is_active_at(now))
        .map(|rule| rule.percent)
        .max()
        .unwrap_or(Percent::ZERO)
}

/// Whole percentage represented by marking `original` down to `sale`.
///
/// Rounded half-up; a sale price at or above the original is 0%, a zero
/// original is 0%, a zero sale price is 100%.
pub fn percent_off(original: Money, sale: Money) -> Percent {
    if original.is_zero() || sale >= original {
        return Percent::ZERO;
    }
    let off = u128::from(original.minor() - sale.minor());
    let whole = u128::from(original.minor());
    let pct = (off * 200 + whole) / (whole * 2);
    Percent::new(pct.min(100) as u8).unwrap_or(Percent::MAX)
}
