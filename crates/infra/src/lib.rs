//! Infrastructure layer: storage, aggregate repositories and the discount feed.

pub mod discount_cache;
pub mod discount_source;
pub mod repository;
pub mod store;

pub use discount_cache::{CacheStats, DiscountCache, RefreshPolicy};
pub use discount_source::{DiscountSource, JsonDiscountSource};
pub use repository::{AggregateRepository, Committed, DispatchError};
pub use store::{InMemoryStore, Store};
