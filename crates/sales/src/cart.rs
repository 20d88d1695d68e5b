//! Shopping cart.
//!
//! A cart only remembers which products and how many. Prices are resolved every
//! time it is viewed, so a discount that starts or ends while the shopper is
//! browsing shows up on the next render.

use serde::{Deserialize, Serialize};

use atelier_catalog::ProductId;
use atelier_core::{CustomerId, DomainError, DomainResult, Money};
use atelier_pricing::ResolvedPrice;

use crate::order::OrderLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    customer_id: CustomerId,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            lines: Vec::new(),
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Lines in the order products were first added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Add `quantity` units, merging into an existing line for the same product.
    pub fn add_item(&mut self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::validation("quantity too large"))?;
            }
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
        Ok(())
    }

    /// Replace a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(DomainError::NotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> DomainResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Price every line with `price_of`. Products it cannot price (archived,
    /// deleted) are listed in `unavailable` instead of failing the whole cart.
    pub fn price<F>(&self, mut price_of: F) -> DomainResult<CartTotals>
    where
        F: FnMut(ProductId) -> Option<PricedProduct>,
    {
        let mut totals = CartTotals::default();
        for line in &self.lines {
            let Some(product) = price_of(line.product_id) else {
                totals.unavailable.push(line.product_id);
                continue;
            };
            let priced = PricedLine::new(line.product_id, line.quantity, product)?;
            totals.subtotal = add(totals.subtotal, priced.line_subtotal)?;
            totals.discount_total = add(totals.discount_total, priced.line_discount)?;
            totals.total = add(totals.total, priced.line_total)?;
            totals.lines.push(priced);
        }
        Ok(totals)
    }
}

fn add(a: Money, b: Money) -> DomainResult<Money> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::validation("cart total overflows"))
}

fn mul(unit: Money, quantity: u32) -> DomainResult<Money> {
    unit.checked_mul(quantity)
        .ok_or_else(|| DomainError::validation("cart total overflows"))
}

/// What the cart needs to know about a product at pricing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub name: String,
    pub price: ResolvedPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit: ResolvedPrice,
    /// `original_price * quantity`
    pub line_subtotal: Money,
    pub line_discount: Money,
    /// `final_price * quantity`
    pub line_total: Money,
}

impl PricedLine {
    fn new(product_id: ProductId, quantity: u32, product: PricedProduct) -> DomainResult<Self> {
        let unit = product.price;
        let line_subtotal = mul(unit.original_price, quantity)?;
        let line_total = mul(unit.final_price, quantity)?;
        Ok(Self {
            product_id,
            name: product.name,
            quantity,
            unit,
            line_subtotal,
            line_discount: line_subtotal.saturating_sub(line_total),
            line_total,
        })
    }

    /// Snapshot of this line as it is charged on an order.
    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            name: self.name.clone(),
            quantity: self.quantity,
            unit_price: self.unit.original_price,
            discount_percent: self.unit.discount_percent,
            unit_final_price: self.unit.final_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub lines: Vec<PricedLine>,
    /// Sum of undiscounted line prices.
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
    pub unavailable: Vec<ProductId>,
}

impl CartTotals {
    pub fn is_fully_available(&self) -> bool {
        self.unavailable.is_empty()
    }
}
