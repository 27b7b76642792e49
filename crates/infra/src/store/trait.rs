use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use docflow_core::{
    AggregateRoot, ClientId, Document, DocumentId, DocumentKind, DocumentRef, ExpectedVersion,
    Status, TenantId,
};
use std::sync::Arc;

/// A persisted document: the serialized aggregate plus the metadata the store
/// indexes and constrains on.
///
/// `status` and `version` are the compare-and-set keys for updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    pub tenant_id: TenantId,
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub number: String,
    pub status: String,
    pub client_id: Option<ClientId>,
    /// Upstream document this one was converted from.
    pub source: Option<DocumentRef>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl StoredDocument {
    /// Snapshot a created document for persistence.
    pub fn from_document<D>(document: &D, at: DateTime<Utc>) -> Result<Self, StoreError>
    where
        D: Document + Serialize,
    {
        let tenant_id = document.tenant_id().ok_or_else(|| {
            StoreError::TenantIsolation(format!(
                "{} {} has no tenant; only created documents can be stored",
                D::KIND,
                document.id()
            ))
        })?;
        let payload = serde_json::to_value(document)
            .map_err(|e| StoreError::Serialization(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            tenant_id,
            id: *document.id(),
            kind: D::KIND,
            number: document.number().to_string(),
            status: document.status().as_str().to_string(),
            client_id: document.client_id(),
            source: document.source(),
            version: document.version(),
            created_at: at,
            updated_at: at,
            payload,
        })
    }

    /// Deserialize the payload back into its aggregate.
    pub fn decode<D>(&self) -> Result<D, StoreError>
    where
        D: Document + DeserializeOwned,
    {
        if self.kind != D::KIND {
            return Err(StoreError::NotFound(format!(
                "{} {} (stored as {})",
                D::KIND,
                self.id,
                self.kind
            )));
        }
        serde_json::from_value(self.payload.clone())
            .map_err(|e| StoreError::Serialization(format!("payload deserialization failed: {e}")))
    }

    pub fn doc_ref(&self) -> DocumentRef {
        DocumentRef::new(self.kind, self.id)
    }
}

/// Tenant-scoped query filters. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub kind: Option<DocumentKind>,
    pub status: Option<String>,
    pub client_id: Option<ClientId>,
    pub source: Option<DocumentRef>,
}

impl DocumentQuery {
    pub fn kind(kind: DocumentKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_source(mut self, source: DocumentRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.kind.is_none_or(|k| k == doc.kind)
            && self.status.as_deref().is_none_or(|s| s == doc.status)
            && self.client_id.is_none_or(|c| doc.client_id == Some(c))
            && self.source.is_none_or(|s| doc.source == Some(s))
    }
}

/// Document store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `(tenant, kind, number)` is already taken.
    #[error("duplicate {kind} number '{number}'")]
    DuplicateNumber { kind: DocumentKind, number: String },

    /// A `kind` document already references `linked_to`.
    #[error("{linked_to} already has a {kind} ({existing})")]
    DuplicateLink {
        kind: DocumentKind,
        linked_to: DocumentRef,
        existing: DocumentId,
    },

    /// Compare-and-set precondition failed.
    #[error("stale write: {0}")]
    Conflict(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Tenant-scoped document persistence boundary.
///
/// Implementations must enforce:
/// - uniqueness of `(tenant_id, kind, number)`
/// - at most one document of a given kind per `(tenant_id, source)` link
/// - compare-and-set on `(version, status)` for updates and deletes
/// - no delete of a document another document links to, checked atomically
///   with the removal
/// - tenant isolation on every read and write
pub trait DocumentStore: Send + Sync {
    fn create(&self, document: StoredDocument) -> Result<StoredDocument, StoreError>;

    fn get(&self, tenant_id: TenantId, id: DocumentId)
    -> Result<Option<StoredDocument>, StoreError>;

    /// Replace a document if it is still at `expected_version` and
    /// `expected_status`.
    fn update(
        &self,
        document: StoredDocument,
        expected_version: ExpectedVersion,
        expected_status: &str,
    ) -> Result<StoredDocument, StoreError>;

    fn delete(
        &self,
        tenant_id: TenantId,
        id: DocumentId,
        expected_status: &str,
    ) -> Result<(), StoreError>;

    /// Matching documents ordered by kind, then number.
    fn query(
        &self,
        tenant_id: TenantId,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn create(&self, document: StoredDocument) -> Result<StoredDocument, StoreError> {
        (**self).create(document)
    }

    fn get(
        &self,
        tenant_id: TenantId,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        (**self).get(tenant_id, id)
    }

    fn update(
        &self,
        document: StoredDocument,
        expected_version: ExpectedVersion,
        expected_status: &str,
    ) -> Result<StoredDocument, StoreError> {
        (**self).update(document, expected_version, expected_status)
    }

    fn delete(
        &self,
        tenant_id: TenantId,
        id: DocumentId,
        expected_status: &str,
    ) -> Result<(), StoreError> {
        (**self).delete(tenant_id, id, expected_status)
    }

    fn query(
        &self,
        tenant_id: TenantId,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        (**self).query(tenant_id, query)
    }
}
