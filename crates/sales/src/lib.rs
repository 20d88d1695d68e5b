//! Sales domain module.
//!
//! Carts, placed orders and sales reporting, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod analytics;
pub mod cart;
pub mod order;

pub use analytics::{DateRange, ProductSales, SalesSummary};
pub use cart::{Cart, CartLine, CartTotals, PricedLine, PricedProduct};
pub use order::{
    ChangeStatus, Order, OrderCommand, OrderEvent, OrderId, OrderLine, OrderPlaced, OrderStatus,
    OrderStatusChanged, PlaceOrder,
};
