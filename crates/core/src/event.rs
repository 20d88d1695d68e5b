use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate.
///
/// Events are immutable and versioned. The repository logs them by
/// `event_type` after a command commits.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "catalog.discount.created").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
