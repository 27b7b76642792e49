//! Status lifecycles expressed as explicit transition tables.
//!
//! Each document type declares a closed status enum and a static table mapping
//! every status to the statuses it may move to next. Aggregates consult the
//! table before emitting any status-changing event, so an illegal move is
//! rejected with a `TransitionError` instead of being applied.

use crate::document::DocumentKind;
use crate::error::{DomainError, DomainResult};
use crate::id::DocumentId;

/// A closed, per-document-type status enum.
pub trait Status: Copy + Eq + core::hash::Hash + core::fmt::Debug + 'static {
    /// Stable lowercase name used in storage, notifications and errors.
    fn as_str(&self) -> &'static str;
}

/// Map from a status to the statuses it may legally move to.
///
/// Statuses absent from the table, or listed with no successors, are terminal.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    kind: DocumentKind,
    edges: &'static [(S, &'static [S])],
}

impl<S> TransitionTable<S> {
    pub const fn new(kind: DocumentKind, edges: &'static [(S, &'static [S])]) -> Self {
        Self { kind, edges }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

impl<S: Status> TransitionTable<S> {
    /// Statuses reachable in one step from `from`.
    pub fn next_states(&self, from: S) -> &'static [S] {
        self.edges
            .iter()
            .find(|(s, _)| *s == from)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn allows(&self, from: S, to: S) -> bool {
        self.next_states(from).contains(&to)
    }

    pub fn is_terminal(&self, status: S) -> bool {
        self.next_states(status).is_empty()
    }

    /// Validate `from -> to` for a specific document.
    pub fn check(&self, document_id: DocumentId, from: S, to: S) -> DomainResult<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(DomainError::transition(
                self.kind,
                document_id,
                from.as_str(),
                to.as_str(),
            ))
        }
    }
}
