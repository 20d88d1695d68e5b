//! Time-bounded percentage discounts, scoped to a product or a category.
//!
//! This is the back-office view: creating, revising and deleting discounts with
//! form-level validation. Which discount applies to a price is decided by
//! `atelier-pricing`, which deliberately tolerates windows this module would
//! reject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Event, Percent};

use crate::category::CategoryId;
use crate::product::ProductId;

/// Discount identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountId(pub AggregateId);

impl DiscountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DiscountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a discount targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "target_id", rename_all = "lowercase")]
pub enum DiscountScope {
    Product(ProductId),
    Category(CategoryId),
}

impl DiscountScope {
    pub fn is_product(&self) -> bool {
        matches!(self, DiscountScope::Product(_))
    }
}

/// Where `now` falls relative to a discount's window (both bounds inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountStatus {
    Scheduled,
    Active,
    Expired,
}

/// Aggregate root: Discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    id: DiscountId,
    scope: Option<DiscountScope>,
    percent: Percent,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Discount {
    pub fn empty(id: DiscountId) -> Self {
        Self {
            id,
            scope: None,
            percent: Percent::ZERO,
            starts_at: DateTime::<Utc>::MIN_UTC,
            ends_at: DateTime::<Utc>::MIN_UTC,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DiscountId {
        self.id
    }

    /// `None` until the discount has been created.
    pub fn scope(&self) -> Option<DiscountScope> {
        self.scope
    }

    pub fn percent(&self) -> Percent {
        self.percent
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Created and not deleted.
    pub fn is_live(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> DiscountStatus {
        if now < self.starts_at {
            DiscountStatus::Scheduled
        } else if now > self.ends_at {
            DiscountStatus::Expired
        } else {
            DiscountStatus::Active
        }
    }
}

impl AggregateRoot for Discount {
    type Id = DiscountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDiscount {
    pub discount_id: DiscountId,
    pub scope: DiscountScope,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// The scope is fixed at creation; revising changes percent and window only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseDiscount {
    pub discount_id: DiscountId,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDiscount {
    pub discount_id: DiscountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountCommand {
    CreateDiscount(CreateDiscount),
    ReviseDiscount(ReviseDiscount),
    DeleteDiscount(DeleteDiscount),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCreated {
    pub discount_id: DiscountId,
    pub scope: DiscountScope,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRevised {
    pub discount_id: DiscountId,
    pub percent: Percent,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountDeleted {
    pub discount_id: DiscountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountEvent {
    DiscountCreated(DiscountCreated),
    DiscountRevised(DiscountRevised),
    DiscountDeleted(DiscountDeleted),
}

impl Event for DiscountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DiscountEvent::DiscountCreated(_) => "catalog.discount.created",
            DiscountEvent::DiscountRevised(_) => "catalog.discount.revised",
            DiscountEvent::DiscountDeleted(_) => "catalog.discount.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DiscountEvent::DiscountCreated(e) => e.occurred_at,
            DiscountEvent::DiscountRevised(e) => e.occurred_at,
            DiscountEvent::DiscountDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Discount {
    type Command = DiscountCommand;
    type Event = DiscountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DiscountEvent::DiscountCreated(e) => {
                self.id = e.discount_id;
                self.scope = Some(e.scope);
                self.percent = e.percent;
                self.starts_at = e.starts_at;
                self.ends_at = e.ends_at;
                self.created = true;
            }
            DiscountEvent::DiscountRevised(e) => {
                self.percent = e.percent;
                self.starts_at = e.starts_at;
                self.ends_at = e.ends_at;
            }
            DiscountEvent::DiscountDeleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DiscountCommand::CreateDiscount(cmd) => self.handle_create(cmd),
            DiscountCommand::ReviseDiscount(cmd) => self.handle_revise(cmd),
            DiscountCommand::DeleteDiscount(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Discount {
    fn ensure_live(&self, discount_id: DiscountId) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::not_found());
        }
        if self.id != discount_id {
            return Err(DomainError::invariant("discount_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateDiscount) -> Result<Vec<DiscountEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("discount already exists"));
        }
        validate_window(cmd.starts_at, cmd.ends_at)?;

        Ok(vec![DiscountEvent::DiscountCreated(DiscountCreated {
            discount_id: cmd.discount_id,
            scope: cmd.scope,
            percent: cmd.percent,
            starts_at: cmd.starts_at,
            ends_at: cmd.ends_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseDiscount) -> Result<Vec<DiscountEvent>, DomainError> {
        self.ensure_live(cmd.discount_id)?;
        validate_window(cmd.starts_at, cmd.ends_at)?;

        Ok(vec![DiscountEvent::DiscountRevised(DiscountRevised {
            discount_id: cmd.discount_id,
            percent: cmd.percent,
            starts_at: cmd.starts_at,
            ends_at: cmd.ends_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteDiscount) -> Result<Vec<DiscountEvent>, DomainError> {
        self.ensure_live(cmd.discount_id)?;

        Ok(vec![DiscountEvent::DiscountDeleted(DiscountDeleted {
            discount_id: cmd.discount_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), DomainError> {
    if starts_at >= ends_at {
        return Err(DomainError::validation(
            "discount must start before it ends",
        ));
    }
    Ok(())
}
