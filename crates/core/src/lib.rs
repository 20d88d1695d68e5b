//! `atelier-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the catalog, pricing
//! and sales modules (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AggregateId, CustomerId};
pub use money::{Money, Percent, PriceRounding};
