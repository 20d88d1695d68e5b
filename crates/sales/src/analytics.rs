//! Sales reporting over placed orders.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use atelier_catalog::ProductId;
use atelier_core::{DomainError, DomainResult, Money};

use crate::order::{Order, OrderStatus};

/// Calendar date range, inclusive on both ends (UTC dates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::validation("date range starts after it ends"));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub units: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Charged amount across non-cancelled orders.
    pub revenue: Money,
    /// Non-cancelled orders.
    pub order_count: u64,
    pub average_order_value: Money,
    /// Every order in range, cancelled included.
    pub orders_by_status: BTreeMap<OrderStatus, u64>,
    pub revenue_by_day: BTreeMap<NaiveDate, Money>,
    pub discount_given: Money,
    pub top_products: Vec<ProductSales>,
}

impl SalesSummary {
    /// Single pass over `orders`; unplaced orders and orders outside `range` are skipped.
    pub fn compute<'a, I>(orders: I, range: Option<DateRange>, top_n: usize) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut summary = Self::default();
        let mut revenue: u128 = 0;
        let mut discount: u128 = 0;
        let mut by_day: BTreeMap<NaiveDate, u128> = BTreeMap::new();
        let mut by_product: HashMap<ProductId, (u64, u128)> = HashMap::new();

        for order in orders {
            let Some(placed_at) = order.placed_at() else {
                continue;
            };
            let day = placed_at.date_naive();
            if range.is_some_and(|r| !r.contains(day)) {
                continue;
            }

            *summary.orders_by_status.entry(order.status()).or_insert(0) += 1;
            if order.status() == OrderStatus::Cancelled {
                continue;
            }

            summary.order_count += 1;
            revenue += u128::from(order.total().minor());
            discount += u128::from(order.discount_total().minor());
            *by_day.entry(day).or_insert(0) += u128::from(order.total().minor());

            for line in order.lines() {
                let entry = by_product.entry(line.product_id).or_insert((0, 0));
                entry.0 += u64::from(line.quantity);
                entry.1 += u128::from(line.unit_final_price.minor()) * u128::from(line.quantity);
            }
        }

        summary.revenue = clamp(revenue);
        summary.discount_given = clamp(discount);
        summary.average_order_value = match summary.order_count {
            0 => Money::ZERO,
            n => clamp(revenue / u128::from(n)),
        };
        summary.revenue_by_day = by_day.into_iter().map(|(d, v)| (d, clamp(v))).collect();

        let mut products: Vec<ProductSales> = by_product
            .into_iter()
            .map(|(product_id, (units, revenue))| ProductSales {
                product_id,
                units,
                revenue: clamp(revenue),
            })
            .collect();
        products.sort_by(|a, b| b.units.cmp(&a.units).then(a.product_id.cmp(&b.product_id)));
        products.truncate(top_n);
        summary.top_products = products;

        summary
    }
}

fn clamp(v: u128) -> Money {
    Money::from_minor(u64::try_from(v).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{ChangeStatus, OrderCommand, OrderId, OrderLine, PlaceOrder};
    use atelier_core::{Aggregate, AggregateId, CustomerId, Percent};
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, d, 15, 30, 0).unwrap()
    }

    fn line(product_id: ProductId, quantity: u32, unit: u64, final_price: u64) -> OrderLine {
        OrderLine {
            product_id,
            name: "Wool coat".to_string(),
            quantity,
            unit_price: Money::from_minor(unit),
            discount_percent: Percent::ZERO,
            unit_final_price: Money::from_minor(final_price),
        }
    }

    fn order(at: DateTime<Utc>, lines: Vec<OrderLine>, status: Option<OrderStatus>) -> Order {
        let order_id = OrderId::new(AggregateId::new());
        let mut order = Order::empty(order_id);
        let place = OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            customer_id: CustomerId::new(),
            lines,
            occurred_at: at,
        });
        for e in order.handle(&place).unwrap() {
            order.apply(&e);
        }
        if let Some(to) = status {
            let cmd = OrderCommand::ChangeStatus(ChangeStatus { order_id, to, occurred_at: at });
            for e in order.handle(&cmd).unwrap() {
                order.apply(&e);
            }
        }
        order
    }

    #[test]
    fn empty_input_is_all_zero() {
        let summary = SalesSummary::compute(std::iter::empty(), None, 5);
        assert_eq!(summary, SalesSummary::default());
    }

    #[test]
    fn cancelled_orders_only_count_by_status() {
        let (coat, hat) = (ProductId::new(AggregateId::new()), ProductId::new(AggregateId::new()));
        let orders = vec![
            order(day(1), vec![line(coat, 1, 1_000, 800)], None),
            order(day(1), vec![line(hat, 2, 300, 300)], Some(OrderStatus::Processing)),
            order(day(2), vec![line(coat, 5, 1_000, 1_000)], Some(OrderStatus::Cancelled)),
            order(day(3), vec![line(hat, 1, 300, 300), line(coat, 1, 1_000, 900)], None),
        ];

        let summary = SalesSummary::compute(&orders, None, 10);
        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.revenue, Money::from_minor(800 + 600 + 1_200));
        assert_eq!(summary.average_order_value, Money::from_minor(866));
        assert_eq!(summary.discount_given, Money::from_minor(300));
        assert_eq!(summary.orders_by_status[&OrderStatus::Pending], 2);
        assert_eq!(summary.orders_by_status[&OrderStatus::Processing], 1);
        assert_eq!(summary.orders_by_status[&OrderStatus::Cancelled], 1);

        let d1 = day(1).date_naive();
        let d3 = day(3).date_naive();
        assert_eq!(summary.revenue_by_day.len(), 2);
        assert_eq!(summary.revenue_by_day[&d1], Money::from_minor(1_400));
        assert_eq!(summary.revenue_by_day[&d3], Money::from_minor(1_200));

        assert_eq!(summary.top_products.len(), 2);
        assert_eq!(summary.top_products[0].product_id, hat);
        assert_eq!(summary.top_products[0].units, 3);
        assert_eq!(summary.top_products[1].units, 2);
        assert_eq!(summary.top_products[1].revenue, Money::from_minor(1_700));
    }

    #[test]
    fn range_is_inclusive_on_both_dates() {
        let p = ProductId::new(AggregateId::new());
        let orders: Vec<Order> = (1..=5)
            .map(|d| order(day(d), vec![line(p, 1, 100, 100)], None))
            .collect();
        let range = DateRange::new(day(2).date_naive(), day(4).date_naive()).unwrap();

        let summary = SalesSummary::compute(&orders, Some(range), 3);
        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.revenue, Money::from_minor(300));
    }

    #[test]
    fn top_products_ties_break_on_product_id() {
        let mut ids = [
            ProductId::new(AggregateId::new()),
            ProductId::new(AggregateId::new()),
            ProductId::new(AggregateId::new()),
        ];
        let orders: Vec<Order> = ids
            .iter()
            .map(|p| order(day(1), vec![line(*p, 2, 100, 100)], None))
            .collect();
        ids.sort();

        let summary = SalesSummary::compute(&orders, None, 2);
        let top: Vec<ProductId> = summary.top_products.iter().map(|p| p.product_id).collect();
        assert_eq!(top, ids[..2].to_vec());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = DateRange::new(day(5).date_naive(), day(1).date_naive()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
