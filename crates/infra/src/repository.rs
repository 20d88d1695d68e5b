//! Command execution for state-stored aggregates.
//!
//! ```text
//! Command
//!   -> load current state (or a fresh instance)
//!   -> optimistic version check
//!   -> handle (pure decision, produces events)
//!   -> apply events
//!   -> save
//! ```
//!
//! Writes through one repository are serialised, so the version check and the
//! save cannot interleave with another command on the same store.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Mutex;

use thiserror::Error;

use atelier_core::{Aggregate, AggregateRoot, DomainError, Event, ExpectedVersion};

use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    #[error("not found")]
    NotFound,
    /// Duplicate creation or a no-op transition.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Optimistic concurrency failure (stale aggregate version).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
    #[error("store unavailable: {0}")]
    Store(String),
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => DispatchError::InvalidId(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
        }
    }
}

/// Aggregate state after a successful command plus the events that produced it.
#[derive(Debug, Clone)]
pub struct Committed<A: Aggregate> {
    pub aggregate: A,
    pub events: Vec<A::Event>,
}

/// Loads, decides, applies and saves one aggregate type.
pub struct AggregateRepository<A, S> {
    store: S,
    aggregate_type: &'static str,
    write_lock: Mutex<()>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, S> AggregateRepository<A, S> {
    pub fn new(store: S, aggregate_type: &'static str) -> Self {
        Self {
            store,
            aggregate_type,
            write_lock: Mutex::new(()),
            _aggregate: PhantomData,
        }
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }
}

impl<A, S> AggregateRepository<A, S>
where
    A: Aggregate<Error = DomainError> + Clone,
    A::Id: Clone + Eq + Hash + core::fmt::Display,
    S: Store<A::Id, A>,
{
    pub fn get(&self, id: &A::Id) -> Option<A> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<A> {
        self.store.list()
    }

    /// Run `command` against the aggregate `id`, creating it with `make_aggregate`
    /// when the store has no record yet.
    ///
    /// Returns the new state and the committed events. A command that decides
    /// no events leaves the store untouched.
    pub fn execute(
        &self,
        id: A::Id,
        expected: ExpectedVersion,
        command: A::Command,
        make_aggregate: impl FnOnce(A::Id) -> A,
    ) -> Result<Committed<A>, DispatchError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| DispatchError::Store(format!("{} write lock poisoned", self.aggregate_type)))?;

        let mut aggregate = self
            .store
            .get(&id)
            .unwrap_or_else(|| make_aggregate(id.clone()));

        expected
            .check(aggregate.version())
            .map_err(|e| DispatchError::Concurrency(e.to_string()))?;

        let events = aggregate.handle(&command).map_err(DispatchError::from)?;
        if events.is_empty() {
            return Ok(Committed { aggregate, events });
        }

        for event in &events {
            aggregate.apply(event);
            tracing::info!(
                aggregate_type = self.aggregate_type,
                aggregate_id = %id,
                event_type = event.event_type(),
                version = aggregate.version(),
                "event committed"
            );
        }

        self.store.upsert(id, aggregate.clone());
        Ok(Committed { aggregate, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use atelier_catalog::{
        Category, CategoryCommand, CategoryId, CreateCategory, RemoveCategory, RenameCategory,
    };
    use atelier_core::AggregateId;
    use chrono::Utc;
    use std::sync::Arc;

    type Repo = AggregateRepository<Category, InMemoryStore<CategoryId, Category>>;

    fn repo() -> Repo {
        AggregateRepository::new(InMemoryStore::new(), "catalog.category")
    }

    fn create(repo: &Repo, name: &str) -> CategoryId {
        let id = CategoryId::new(AggregateId::new());
        repo.execute(
            id,
            ExpectedVersion::Exact(0),
            CategoryCommand::CreateCategory(CreateCategory {
                category_id: id,
                name: name.to_string(),
                occurred_at: Utc::now(),
            }),
            Category::empty,
        )
        .unwrap();
        id
    }

    fn rename(id: CategoryId, name: &str) -> CategoryCommand {
        CategoryCommand::RenameCategory(RenameCategory {
            category_id: id,
            name: name.to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn execute_persists_new_state() {
        let repo = repo();
        let id = create(&repo, "Outerwear");

        let committed = repo
            .execute(id, ExpectedVersion::Any, rename(id, "Coats"), Category::empty)
            .unwrap();
        assert_eq!(committed.events.len(), 1);
        assert_eq!(committed.aggregate.version(), 2);

        let stored = repo.get(&id).unwrap();
        assert_eq!(stored.name(), "Coats");
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn stale_version_is_a_concurrency_error() {
        let repo = repo();
        let id = create(&repo, "Knitwear");

        let err = repo
            .execute(id, ExpectedVersion::Exact(0), rename(id, "Jumpers"), Category::empty)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
        assert_eq!(repo.get(&id).unwrap().name(), "Knitwear");
    }

    #[test]
    fn domain_errors_are_mapped_and_nothing_is_saved() {
        let repo = repo();
        let missing = CategoryId::new(AggregateId::new());
        let err = repo
            .execute(
                missing,
                ExpectedVersion::Any,
                CategoryCommand::RemoveCategory(RemoveCategory {
                    category_id: missing,
                    occurred_at: Utc::now(),
                }),
                Category::empty,
            )
            .unwrap_err();
        assert_eq!(err, DispatchError::NotFound);
        assert!(repo.get(&missing).is_none());

        let id = create(&repo, "Denim");
        let err = repo
            .execute(id, ExpectedVersion::Any, rename(id, "  "), Category::empty)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[test]
    fn concurrent_renames_each_apply_once() {
        let repo = Arc::new(repo());
        let id = create(&repo, "Shoes");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    repo.execute(id, ExpectedVersion::Any, rename(id, &format!("Shoes {i}")), Category::empty)
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(repo.get(&id).unwrap().version(), 9);
    }
}
