//! Discount resolution and price computation.
//!
//! Given a catalog item and the time-bounded percentage discounts scoped to the
//! item or its category, [`PriceResolver::resolve`] picks the single applicable
//! percentage at an instant and computes the sale price. It is a pure function
//! of its inputs: no IO, no clock, no shared state.

pub mod feed;
pub mod resolver;
pub mod rule;
pub mod window;

pub use feed::{DiscountRecord, RecordScope};
pub use resolver::{percent_off, resolve, PriceResolver, ResolutionStrategy, ResolvedPrice};
pub use rule::{CatalogItem, DiscountRule};
pub use window::{parse_instant, PromotionWindow};
