use std::collections::HashMap;
use std::sync::RwLock;

use docflow_core::{DocumentId, DocumentRef, ExpectedVersion, TenantId};

use super::r#trait::{DocumentQuery, DocumentStore, StoreError, StoredDocument};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct DocKey {
    tenant_id: TenantId,
    id: DocumentId,
}

/// In-memory document store.
///
/// Intended for tests/dev. Every constraint is checked under a single write
/// lock, which stands in for a database's unique indexes and row-level CAS.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<DocKey, StoredDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl DocumentStore for InMemoryDocumentStore {
    fn create(&self, document: StoredDocument) -> Result<StoredDocument, StoreError> {
        let key = DocKey {
            tenant_id: document.tenant_id,
            id: document.id,
        };

        let mut docs = self.docs.write().map_err(|_| poisoned())?;

        if docs.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "{} {} already exists",
                document.kind, document.id
            )));
        }

        let same_tenant_kind = docs
            .values()
            .filter(|d| d.tenant_id == document.tenant_id && d.kind == document.kind);

        for existing in same_tenant_kind {
            if existing.number == document.number {
                return Err(StoreError::DuplicateNumber {
                    kind: document.kind,
                    number: document.number.clone(),
                });
            }
            if let Some(linked_to) = document.source {
                if existing.source == Some(linked_to) {
                    return Err(StoreError::DuplicateLink {
                        kind: document.kind,
                        linked_to,
                        existing: existing.id,
                    });
                }
            }
        }

        docs.insert(key, document.clone());
        Ok(document)
    }

    fn get(
        &self,
        tenant_id: TenantId,
        id: DocumentId,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs.get(&DocKey { tenant_id, id }).cloned())
    }

    fn update(
        &self,
        mut document: StoredDocument,
        expected_version: ExpectedVersion,
        expected_status: &str,
    ) -> Result<StoredDocument, StoreError> {
        let key = DocKey {
            tenant_id: document.tenant_id,
            id: document.id,
        };

        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let current = docs.get(&key).ok_or_else(|| {
            StoreError::NotFound(format!("{} {}", document.kind, document.id))
        })?;

        if !expected_version.matches(current.version) {
            return Err(StoreError::Conflict(format!(
                "{} {}: expected {expected_version:?}, found version {}",
                current.kind, current.id, current.version
            )));
        }
        if current.status != expected_status {
            return Err(StoreError::Conflict(format!(
                "{} {}: expected status '{expected_status}', found '{}'",
                current.kind, current.id, current.status
            )));
        }
        if current.kind != document.kind
            || current.number != document.number
            || current.source != document.source
        {
            return Err(StoreError::Conflict(format!(
                "{} {}: kind, number and source are immutable",
                current.kind, current.id
            )));
        }

        document.created_at = current.created_at;
        docs.insert(key, document.clone());
        Ok(document)
    }

    fn delete(
        &self,
        tenant_id: TenantId,
        id: DocumentId,
        expected_status: &str,
    ) -> Result<(), StoreError> {
        let key = DocKey { tenant_id, id };
        let mut docs = self.docs.write().map_err(|_| poisoned())?;

        let current = docs
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        if current.status != expected_status {
            return Err(StoreError::Conflict(format!(
                "{} {id}: expected status '{expected_status}', found '{}'",
                current.kind, current.status
            )));
        }

        let target = DocumentRef::new(current.kind, id);
        if let Some(dependent) = docs
            .values()
            .find(|d| d.tenant_id == tenant_id && d.source == Some(target))
        {
            return Err(StoreError::Conflict(format!(
                "{} {} is referenced by {} {}",
                current.kind, current.number, dependent.kind, dependent.number
            )));
        }

        docs.remove(&key);
        Ok(())
    }

    fn query(
        &self,
        tenant_id: TenantId,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        let mut out: Vec<StoredDocument> = docs
            .values()
            .filter(|d| d.tenant_id == tenant_id && query.matches(d))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.kind, &a.number).cmp(&(b.kind, &b.number)));
        Ok(out)
    }
}
