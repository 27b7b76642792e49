//! Document kinds and typed cross-document references.

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::id::{ClientId, DocumentId, TenantId};
use crate::lifecycle::Status;

/// The business document types managed by the lifecycle engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    Invoice,
    DeliveryNote,
    JobCard,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Quote,
        DocumentKind::Invoice,
        DocumentKind::DeliveryNote,
        DocumentKind::JobCard,
    ];

    /// Stable, storage-friendly name (e.g. `"delivery_note"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
            DocumentKind::DeliveryNote => "delivery_note",
            DocumentKind::JobCard => "job_card",
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed pointer at another document (e.g. an invoice's source quote).
///
/// Optional foreign keys are modelled as `Option<DocumentRef>` so that every
/// call site has to handle the absent case.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: DocumentId,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: DocumentId) -> Self {
        Self { kind, id }
    }

    pub fn quote(id: DocumentId) -> Self {
        Self::new(DocumentKind::Quote, id)
    }

    pub fn invoice(id: DocumentId) -> Self {
        Self::new(DocumentKind::Invoice, id)
    }

    pub fn job_card(id: DocumentId) -> Self {
        Self::new(DocumentKind::JobCard, id)
    }
}

impl core::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Common surface of every persisted business document.
///
/// Lets the orchestration layer number, store, link and delete documents
/// without knowing their concrete type.
pub trait Document: Aggregate<Id = DocumentId, Error = DomainError> + Clone {
    const KIND: DocumentKind;

    type Status: Status;

    /// A not-yet-created instance, ready to handle its creation command.
    fn empty(id: DocumentId) -> Self;

    fn tenant_id(&self) -> Option<TenantId>;

    fn number(&self) -> &str;

    fn status(&self) -> Self::Status;

    fn client_id(&self) -> Option<ClientId>;

    /// The upstream document this one was converted from, if any.
    fn source(&self) -> Option<DocumentRef>;

    /// Whether the document is still in its early, deletable status.
    fn is_deletable(&self) -> bool;
}
