use thiserror::Error;

use atelier_core::DomainError;
use atelier_infra::DispatchError;

use crate::config::ConfigError;

pub type StorefrontResult<T> = Result<T, StorefrontError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<DomainError> for StorefrontError {
    fn from(value: DomainError) -> Self {
        StorefrontError::Dispatch(DispatchError::from(value))
    }
}

impl StorefrontError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorefrontError::Dispatch(DispatchError::NotFound))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StorefrontError::Dispatch(DispatchError::Validation(_)))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorefrontError::Dispatch(DispatchError::Conflict(_) | DispatchError::Concurrency(_))
        )
    }
}
