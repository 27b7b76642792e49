//! Domain error model.

use thiserror::Error;

use crate::document::DocumentKind;
use crate::id::DocumentId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// An attempted status move that the document's transition table does not allow.
///
/// Carries enough context (which document, from where, to where) for a caller
/// to display the failure or retry against fresh state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal {kind} transition {from} -> {to} (document {document_id})")]
pub struct TransitionError {
    pub kind: DocumentKind,
    pub document_id: DocumentId,
    pub from: &'static str,
    pub to: &'static str,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// illegal transitions, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. missing client, negative quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A status transition is not allowed from the current status.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced document or line item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stale state, or the requested link already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An operation crossed the tenant boundary.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn tenant_isolation(msg: impl Into<String>) -> Self {
        Self::TenantIsolation(msg.into())
    }

    pub fn transition(
        kind: DocumentKind,
        document_id: DocumentId,
        from: &'static str,
        to: &'static str,
    ) -> Self {
        Self::Transition(TransitionError {
            kind,
            document_id,
            from,
            to,
        })
    }
}
