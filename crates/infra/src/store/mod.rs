//! Document store boundary.
//!
//! Persistence is an external collaborator; this module defines the
//! tenant-scoped contract the engine relies on (uniqueness, link constraint,
//! compare-and-set updates) and an in-memory implementation of it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{DocumentQuery, DocumentStore, StoreError, StoredDocument};
