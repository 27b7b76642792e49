//! Engine-level error taxonomy returned by every orchestration operation.

use thiserror::Error;

use docflow_core::{DomainError, TransitionError};

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Stale state that survived the automatic retry, or a uniqueness clash.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Infrastructure failure or an exhausted retry budget.
    #[error("system error: {0}")]
    System(String),
}

impl EngineError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::Transition(t) => EngineError::Transition(t),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::NotFound(what) => EngineError::NotFound(what),
            // Another tenant's document is indistinguishable from a missing one.
            DomainError::TenantIsolation(msg) => EngineError::NotFound(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateNumber { .. }
            | StoreError::DuplicateLink { .. }
            | StoreError::Conflict(_) => EngineError::Conflict(value.to_string()),
            StoreError::NotFound(_) | StoreError::TenantIsolation(_) => {
                EngineError::NotFound(value.to_string())
            }
            StoreError::Serialization(_) | StoreError::Backend(_) => {
                EngineError::System(value.to_string())
            }
        }
    }
}
