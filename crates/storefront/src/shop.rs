//! Shopper-facing catalog, cart and checkout.

use atelier_catalog::{CategoryId, ProductId};
use atelier_core::{AggregateId, CustomerId, DomainError, ExpectedVersion};
use atelier_infra::Store;
use atelier_pricing::ResolvedPrice;
use atelier_sales::{Cart, CartTotals, Order, OrderCommand, OrderId, PlaceOrder, PricedProduct};

use crate::error::StorefrontResult;
use crate::storefront::{CatalogEntry, Storefront};

impl Storefront {
    /// Active products, optionally limited to one category, sorted by name.
    pub fn catalog(&self, category: Option<CategoryId>) -> Vec<CatalogEntry> {
        let now = self.now();
        let rules = self.discount_rules(now);

        let mut entries: Vec<CatalogEntry> = self
            .products
            .list()
            .into_iter()
            .filter(|p| p.can_be_sold())
            .filter(|p| category.is_none() || p.category_id() == category)
            .map(|p| CatalogEntry {
                product_id: p.id_typed(),
                sku: p.sku().to_string(),
                name: p.name().to_string(),
                category_id: p.category_id(),
                price: self.price_with(&p, &rules, now),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.product_id.cmp(&b.product_id)));
        entries
    }

    pub fn price_of(&self, product_id: ProductId) -> StorefrontResult<ResolvedPrice> {
        let product = self.sellable_product(product_id)?;
        let now = self.now();
        let rules = self.discount_rules(now);
        Ok(self.price_with(&product, &rules, now))
    }

    pub fn add_to_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> StorefrontResult<CartTotals> {
        self.sellable_product(product_id)?;
        self.modify_cart(customer_id, |cart| cart.add_item(product_id, quantity))
    }

    /// Zero removes the line.
    pub fn update_cart_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> StorefrontResult<CartTotals> {
        self.modify_cart(customer_id, |cart| cart.set_quantity(product_id, quantity))
    }

    pub fn remove_from_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> StorefrontResult<CartTotals> {
        self.modify_cart(customer_id, |cart| cart.remove_item(product_id))
    }

    /// The cart priced right now.
    pub fn view_cart(&self, customer_id: CustomerId) -> StorefrontResult<CartTotals> {
        let cart = self
            .carts
            .get(&customer_id)
            .unwrap_or_else(|| Cart::new(customer_id));
        self.price_cart(&cart)
    }

    /// Turn the cart into an order at the prices in effect now, then empty it.
    pub fn checkout(&self, customer_id: CustomerId) -> StorefrontResult<Order> {
        let _guard = self.lock_carts()?;
        let mut cart = self
            .carts
            .get(&customer_id)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::validation("cart is empty"))?;

        let now = self.now();
        let totals = self.price_cart_at(&cart, now)?;
        if !totals.is_fully_available() {
            return Err(DomainError::validation(format!(
                "{} item(s) in the cart are no longer available",
                totals.unavailable.len()
            ))
            .into());
        }

        let order_id = OrderId::new(AggregateId::new());
        let committed = self.orders.execute(
            order_id,
            ExpectedVersion::Exact(0),
            OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                customer_id,
                lines: totals.lines.iter().map(|l| l.to_order_line()).collect(),
                occurred_at: now,
            }),
            Order::empty,
        )?;

        cart.clear();
        self.carts.upsert(customer_id, cart);

        let order = committed.aggregate;
        tracing::info!(
            order_id = %order_id,
            customer_id = %customer_id,
            total = %order.total(),
            discount = %order.discount_total(),
            items = order.item_count(),
            "order placed"
        );
        Ok(order)
    }

    pub fn order(&self, order_id: OrderId) -> StorefrontResult<Order> {
        self.order_or_not_found(order_id)
    }

    /// Newest first.
    pub fn orders_for_customer(&self, customer_id: CustomerId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .list()
            .into_iter()
            .filter(|o| o.customer_id() == Some(customer_id))
            .collect();
        orders.sort_by(|a, b| {
            b.placed_at()
                .cmp(&a.placed_at())
                .then(b.id_typed().cmp(&a.id_typed()))
        });
        orders
    }

    fn modify_cart<F>(&self, customer_id: CustomerId, change: F) -> StorefrontResult<CartTotals>
    where
        F: FnOnce(&mut Cart) -> Result<(), DomainError>,
    {
        let _guard = self.lock_carts()?;
        let mut cart = self
            .carts
            .get(&customer_id)
            .unwrap_or_else(|| Cart::new(customer_id));
        change(&mut cart)?;
        let totals = self.price_cart(&cart)?;
        self.carts.upsert(customer_id, cart);
        Ok(totals)
    }

    fn price_cart(&self, cart: &Cart) -> StorefrontResult<CartTotals> {
        self.price_cart_at(cart, self.now())
    }

    fn price_cart_at(&self, cart: &Cart, now: chrono::DateTime<chrono::Utc>) -> StorefrontResult<CartTotals> {
        let rules = self.discount_rules(now);
        let totals = cart.price(|product_id| {
            let product = self.products.get(&product_id).filter(|p| p.can_be_sold())?;
            Some(PricedProduct {
                name: product.name().to_string(),
                price: self.price_with(&product, &rules, now),
            })
        })?;
        Ok(totals)
    }
}
