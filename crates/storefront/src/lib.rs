//! Storefront application layer.
//!
//! Wires the catalog, pricing and sales domains onto in-memory storage behind
//! one service, [`Storefront`], used by both the back office and the shop.

pub mod admin;
pub mod clock;
pub mod config;
pub mod discounts;
pub mod error;
pub mod shop;
pub mod storefront;

pub use admin::{DiscountListing, DiscountRevision, NewDiscount, NewProduct, ProductRevision};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, StorefrontConfig};
pub use discounts::CatalogDiscounts;
pub use error::{StorefrontError, StorefrontResult};
pub use storefront::{CatalogEntry, Storefront};
