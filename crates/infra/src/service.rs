//! Document service: the single creation and mutation path for every document.
//!
//! ```text
//! create:  number → build command → handle/apply → store.create (unique number, unique link)
//! execute: load → decode → handle/apply → store.update (CAS on version + status) → notify
//! ```
//!
//! Numbering collisions are retried with a recomputed number up to
//! `numbering.max_attempts`. A stale write is retried `conflict_retries` times
//! by re-reading the document and re-validating the command against it.

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use docflow_core::{
    AggregateRoot, Document, DocumentId, DocumentKind, DocumentRef, ExpectedVersion,
    RequestContext, Status, execute,
};
use docflow_events::{Notifier, StatusChanged};
use docflow_invoicing::{Invoice, InvoiceCommand, InvoiceStatus, MarkInvoiceOverdue};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::numbering::NumberingService;
use crate::store::{DocumentQuery, DocumentStore, StoreError, StoredDocument};

/// Outcome of a create that may carry a source link.
#[derive(Debug)]
pub(crate) enum Created<D> {
    New(D),
    /// The link is taken; holds the document that already claims it.
    AlreadyLinked(DocumentId),
}

enum Attempt<D> {
    Committed(D),
    Stale(String),
}

pub struct DocumentService<S, N> {
    store: S,
    notifier: N,
    numbering: NumberingService,
    config: EngineConfig,
}

impl<S, N> DocumentService<S, N> {
    pub fn new(store: S, notifier: N, config: EngineConfig) -> Self {
        Self {
            store,
            notifier,
            numbering: NumberingService::new(config.numbering.clone()),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `date` plus the configured payment term.
    pub fn default_due_date(&self, date: NaiveDate) -> NaiveDate {
        date.checked_add_days(Days::new(u64::from(self.config.invoice_due_days)))
            .unwrap_or(date)
    }

    /// `date` plus the configured quote validity.
    pub fn default_valid_until(&self, date: NaiveDate) -> NaiveDate {
        date.checked_add_days(Days::new(u64::from(self.config.quote_validity_days)))
            .unwrap_or(date)
    }
}

impl<S, N> DocumentService<S, N>
where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
{
    /// Create a new document in its initial status.
    ///
    /// `build` receives the fresh id and allocated number and returns the
    /// creation command; it may be called again if the number is taken.
    pub fn create<D, F>(&self, ctx: &RequestContext, build: F) -> Result<D, EngineError>
    where
        D: Document + Serialize + DeserializeOwned,
        F: Fn(DocumentId, String) -> D::Command,
    {
        match self.create_linked(ctx, build)? {
            Created::New(doc) => Ok(doc),
            Created::AlreadyLinked(existing) => Err(EngineError::Conflict(format!(
                "source is already linked to {} {existing}",
                D::KIND
            ))),
        }
    }

    pub(crate) fn create_linked<D, F>(
        &self,
        ctx: &RequestContext,
        build: F,
    ) -> Result<Created<D>, EngineError>
    where
        D: Document + Serialize + DeserializeOwned,
        F: Fn(DocumentId, String) -> D::Command,
    {
        let tenant_id = ctx.tenant_id();
        let attempts = self.config.numbering.max_attempts.max(1);

        for attempt in 1..=attempts {
            let number = self.numbering.next_number(&self.store, tenant_id, D::KIND)?;
            let id = DocumentId::new();
            let mut doc = D::empty(id);
            execute(&mut doc, &build(id, number.clone()))?;
            if doc.tenant_id() != Some(tenant_id) {
                return Err(EngineError::Validation(format!(
                    "{} command tenant does not match the request tenant",
                    D::KIND
                )));
            }

            let record = StoredDocument::from_document(&doc, Utc::now())?;
            match self.store.create(record) {
                Ok(_) => {
                    info!(
                        tenant_id = %tenant_id,
                        kind = %D::KIND,
                        document_id = %id,
                        number = %number,
                        "document created"
                    );
                    self.notify(ctx, D::KIND, id, &number, None, doc.status().as_str());
                    return Ok(Created::New(doc));
                }
                Err(StoreError::DuplicateNumber { .. }) => {
                    warn!(
                        tenant_id = %tenant_id,
                        kind = %D::KIND,
                        number = %number,
                        attempt,
                        "document number taken; recomputing"
                    );
                }
                Err(StoreError::DuplicateLink { existing, .. }) => {
                    debug!(
                        tenant_id = %tenant_id,
                        kind = %D::KIND,
                        existing = %existing,
                        "source already linked"
                    );
                    return Ok(Created::AlreadyLinked(existing));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::System(format!(
            "could not allocate a unique {} number after {attempts} attempts",
            D::KIND
        )))
    }

    /// Run a command against a stored document and persist the result.
    pub fn execute<D>(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        command: &D::Command,
    ) -> Result<D, EngineError>
    where
        D: Document + Serialize + DeserializeOwned,
    {
        let mut retries_left = self.config.conflict_retries;
        loop {
            match self.try_execute::<D>(ctx, id, command)? {
                Attempt::Committed(doc) => return Ok(doc),
                Attempt::Stale(msg) if retries_left > 0 => {
                    retries_left -= 1;
                    debug!(
                        tenant_id = %ctx.tenant_id(),
                        kind = %D::KIND,
                        document_id = %id,
                        reason = %msg,
                        "stale write; re-reading"
                    );
                }
                Attempt::Stale(msg) => return Err(EngineError::Conflict(msg)),
            }
        }
    }

    fn try_execute<D>(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
        command: &D::Command,
    ) -> Result<Attempt<D>, EngineError>
    where
        D: Document + Serialize + DeserializeOwned,
    {
        let record = self.load_record(ctx, id)?;
        let mut doc: D = record.decode()?;
        let before = doc.status();

        let events = execute(&mut doc, command)?;
        if events.is_empty() {
            return Ok(Attempt::Committed(doc));
        }

        let mut next = StoredDocument::from_document(&doc, Utc::now())?;
        next.created_at = record.created_at;

        match self
            .store
            .update(next, ExpectedVersion::Exact(record.version), &record.status)
        {
            Ok(_) => {
                let after = doc.status();
                if after != before {
                    info!(
                        tenant_id = %ctx.tenant_id(),
                        kind = %D::KIND,
                        document_id = %id,
                        number = %doc.number(),
                        from = before.as_str(),
                        to = after.as_str(),
                        "status changed"
                    );
                    self.notify(
                        ctx,
                        D::KIND,
                        id,
                        doc.number(),
                        Some(before.as_str()),
                        after.as_str(),
                    );
                }
                Ok(Attempt::Committed(doc))
            }
            Err(StoreError::Conflict(msg)) => Ok(Attempt::Stale(msg)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get<D>(&self, ctx: &RequestContext, id: DocumentId) -> Result<D, EngineError>
    where
        D: Document + DeserializeOwned,
    {
        Ok(self.load_record(ctx, id)?.decode()?)
    }

    pub fn list(
        &self,
        ctx: &RequestContext,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, EngineError> {
        Ok(self.store.query(ctx.tenant_id(), query)?)
    }

    /// Every `D` matching `query` (the kind filter is forced to `D::KIND`).
    pub fn list_documents<D>(
        &self,
        ctx: &RequestContext,
        query: &DocumentQuery,
    ) -> Result<Vec<D>, EngineError>
    where
        D: Document + DeserializeOwned,
    {
        let query = DocumentQuery {
            kind: Some(D::KIND),
            ..query.clone()
        };
        self.store
            .query(ctx.tenant_id(), &query)?
            .iter()
            .map(|r| r.decode::<D>().map_err(EngineError::from))
            .collect()
    }

    /// The `D` converted from `source`, if one exists.
    pub fn find_linked<D>(
        &self,
        ctx: &RequestContext,
        source: DocumentRef,
    ) -> Result<Option<D>, EngineError>
    where
        D: Document + DeserializeOwned,
    {
        let query = DocumentQuery::kind(D::KIND).with_source(source);
        match self.store.query(ctx.tenant_id(), &query)?.first() {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    /// Delete a document that is still in its initial status and that no
    /// other document was converted from. The store checks the links under
    /// the same write as the removal.
    pub fn delete<D>(&self, ctx: &RequestContext, id: DocumentId) -> Result<(), EngineError>
    where
        D: Document + DeserializeOwned,
    {
        let tenant_id = ctx.tenant_id();
        let record = self.load_record(ctx, id)?;
        let doc: D = record.decode()?;

        if !doc.is_deletable() {
            return Err(EngineError::Conflict(format!(
                "{} {} cannot be deleted in status '{}'",
                D::KIND,
                doc.number(),
                record.status
            )));
        }

        match self.store.delete(tenant_id, id, &record.status) {
            Ok(()) => {}
            Err(StoreError::Conflict(msg)) => return Err(EngineError::Conflict(msg)),
            Err(e) => return Err(e.into()),
        }
        info!(
            tenant_id = %tenant_id,
            kind = %D::KIND,
            document_id = %id,
            number = %doc.number(),
            "document deleted"
        );
        Ok(())
    }

    /// Move every sent invoice whose due date is before `as_of` to `overdue`.
    ///
    /// Invoices paid while the sweep runs are skipped. Returns the ids marked.
    pub fn sweep_overdue(
        &self,
        ctx: &RequestContext,
        as_of: NaiveDate,
    ) -> Result<Vec<DocumentId>, EngineError> {
        let sent = DocumentQuery::kind(DocumentKind::Invoice).with_status(InvoiceStatus::Sent.as_str());
        let candidates: Vec<Invoice> = self.list_documents(ctx, &sent)?;

        let mut marked = Vec::new();
        for invoice in candidates.iter().filter(|i| i.is_past_due(as_of)) {
            let id = invoice.id_typed();
            let command = InvoiceCommand::MarkOverdue(MarkInvoiceOverdue {
                tenant_id: ctx.tenant_id(),
                invoice_id: id,
                as_of,
                occurred_at: Utc::now(),
            });
            match self.execute::<Invoice>(ctx, id, &command) {
                Ok(_) => marked.push(id),
                Err(EngineError::Transition(t)) => {
                    debug!(document_id = %id, error = %t, "invoice moved on during sweep; skipping");
                }
                Err(e) => return Err(e),
            }
        }

        if !marked.is_empty() {
            info!(tenant_id = %ctx.tenant_id(), count = marked.len(), %as_of, "invoices marked overdue");
        }
        Ok(marked)
    }

    fn load_record(
        &self,
        ctx: &RequestContext,
        id: DocumentId,
    ) -> Result<StoredDocument, EngineError> {
        self.store
            .get(ctx.tenant_id(), id)?
            .ok_or_else(|| EngineError::NotFound(format!("document {id}")))
    }

    fn notify(
        &self,
        ctx: &RequestContext,
        kind: DocumentKind,
        document_id: DocumentId,
        number: &str,
        old_status: Option<&str>,
        new_status: &str,
    ) {
        let message = StatusChanged {
            notification_id: Uuid::now_v7(),
            tenant_id: ctx.tenant_id(),
            kind,
            document_id,
            number: number.to_string(),
            old_status: old_status.map(str::to_owned),
            new_status: new_status.to_string(),
            actor: ctx.user_id(),
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.notifier.publish(message) {
            warn!(
                tenant_id = %ctx.tenant_id(),
                kind = %kind,
                document_id = %document_id,
                error = ?e,
                "status notification not delivered"
            );
        }
    }
}
