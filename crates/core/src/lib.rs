//! `docflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every document
//! module: identifiers, the error model, the aggregate contract and the
//! transition-table machinery behind each document's status lifecycle.

pub mod aggregate;
pub mod context;
pub mod document;
pub mod error;
pub mod id;
pub mod lifecycle;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, execute};
pub use context::RequestContext;
pub use document::{Document, DocumentKind, DocumentRef};
pub use error::{DomainError, DomainResult, TransitionError};
pub use id::{ClientId, DocumentId, ScheduleId, TenantId, UserId};
pub use lifecycle::{Status, TransitionTable};
