//! Conversion pipeline: derive a downstream document from an upstream one.
//!
//! ```text
//! Quote (accepted)      → Invoice        (lines verbatim, cost preserved)
//! JobCard (diagnosing+) → Quote          (labour/part tagging, cost zeroed)
//! JobCard (completed)   → Invoice        (labour/part tagging, cost zeroed)
//! Invoice               → DeliveryNote   (description + quantity only)
//! ```
//!
//! Every conversion is idempotent: the store allows at most one document of a
//! kind per source, and a second conversion returns the document that already
//! holds the link, whether it was found up front or lost a creation race.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use docflow_core::{Document, DocumentId, DocumentRef, RequestContext, Status};
use docflow_delivery::{CreateDeliveryNote, DeliveryItem, DeliveryNote, DeliveryNoteCommand};
use docflow_events::{Notifier, StatusChanged};
use docflow_invoicing::{CreateInvoice, Invoice, InvoiceCommand};
use docflow_jobcards::{
    AdvanceJobCard, ItemType, JobCard, JobCardCommand, JobCardLine, JobCardStatus,
};
use docflow_pricing::{Decimal, LineItem};
use docflow_quotes::{CreateQuote, Quote, QuoteCommand, QuoteDetails};

use crate::clients::ClientDirectory;
use crate::error::EngineError;
use crate::service::{Created, DocumentService};
use crate::store::DocumentStore;

impl<S, N> DocumentService<S, N>
where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
{
    /// Invoice an accepted quote. Client, description, tax rate and lines
    /// (including cost prices) are copied; the invoice starts as a draft.
    pub fn convert_quote_to_invoice(
        &self,
        ctx: &RequestContext,
        quote_id: DocumentId,
        date: NaiveDate,
    ) -> Result<Invoice, EngineError> {
        let source = DocumentRef::quote(quote_id);
        if let Some(existing) = self.find_linked::<Invoice>(ctx, source)? {
            return Ok(existing);
        }

        let quote: Quote = self.get(ctx, quote_id)?;
        if !quote.is_convertible() {
            return Err(EngineError::Validation(format!(
                "quote {} must be accepted before it can be invoiced (status: {})",
                quote.number(),
                quote.status().as_str()
            )));
        }

        let due_date = self.default_due_date(date);
        let invoice: Invoice = self.create_or_existing(ctx, |invoice_id, number| {
            InvoiceCommand::CreateInvoice(CreateInvoice {
                tenant_id: ctx.tenant_id(),
                invoice_id,
                number,
                client_id: quote.client_id(),
                date,
                due_date,
                tax_rate: quote.tax_rate(),
                lines: quote.lines().to_vec(),
                description: quote.details().description.clone(),
                source: Some(source),
                purchase_order_number: None,
                occurred_at: Utc::now(),
            })
        })?;

        info!(
            tenant_id = %ctx.tenant_id(),
            quote = %quote.number(),
            invoice = %invoice.number(),
            "quote converted to invoice"
        );
        Ok(invoice)
    }

    /// Raise a quote from a job card once diagnosis has started. A `diagnosed`
    /// job card moves on to `quoted`.
    ///
    /// The quote and the job card advance are two writes. If the advance
    /// fails after the quote is committed, calling this again finds the
    /// linked quote and completes the advance without creating another.
    pub fn convert_job_card_to_quote(
        &self,
        ctx: &RequestContext,
        job_card_id: DocumentId,
        date: NaiveDate,
    ) -> Result<Quote, EngineError> {
        let source = DocumentRef::job_card(job_card_id);
        let job_card: JobCard = self.get(ctx, job_card_id)?;

        let quote: Quote = match self.find_linked::<Quote>(ctx, source)? {
            Some(existing) => existing,
            None => {
                if !job_card.can_raise_quote() {
                    return Err(EngineError::Validation(format!(
                        "job card {} cannot be quoted before diagnosis (status: {})",
                        job_card.number(),
                        job_card.status().as_str()
                    )));
                }
                let valid_until = self.default_valid_until(date);
                let lines = job_card_lines(job_card.lines());
                let description = work_description(&job_card);
                self.create_or_existing(ctx, |quote_id, number| {
                    QuoteCommand::CreateQuote(CreateQuote {
                        tenant_id: ctx.tenant_id(),
                        quote_id,
                        number,
                        client_id: job_card.client_id(),
                        date,
                        valid_until,
                        tax_rate: job_card.work().tax_rate,
                        lines: lines.clone(),
                        details: QuoteDetails {
                            description: description.clone(),
                            ..QuoteDetails::default()
                        },
                        source_job_card_id: Some(job_card_id),
                        occurred_at: Utc::now(),
                    })
                })?
            }
        };

        if job_card.status() == JobCardStatus::Diagnosed {
            self.advance_job_card(ctx, job_card_id, JobCardStatus::Quoted)?;
        }
        Ok(quote)
    }

    /// Invoice a completed job card and move it to `invoiced`.
    ///
    /// Retrying after a failed advance returns the linked invoice and
    /// finishes the move to `invoiced`.
    pub fn convert_job_card_to_invoice(
        &self,
        ctx: &RequestContext,
        job_card_id: DocumentId,
        date: NaiveDate,
    ) -> Result<Invoice, EngineError> {
        let source = DocumentRef::job_card(job_card_id);
        let job_card: JobCard = self.get(ctx, job_card_id)?;

        let invoice: Invoice = match self.find_linked::<Invoice>(ctx, source)? {
            Some(existing) => existing,
            None => {
                if !job_card.can_raise_invoice() {
                    return Err(EngineError::Validation(format!(
                        "job card {} must be completed before it can be invoiced (status: {})",
                        job_card.number(),
                        job_card.status().as_str()
                    )));
                }
                let due_date = self.default_due_date(date);
                let lines = job_card_lines(job_card.lines());
                let description = work_description(&job_card);
                self.create_or_existing(ctx, |invoice_id, number| {
                    InvoiceCommand::CreateInvoice(CreateInvoice {
                        tenant_id: ctx.tenant_id(),
                        invoice_id,
                        number,
                        client_id: job_card.client_id(),
                        date,
                        due_date,
                        tax_rate: job_card.work().tax_rate,
                        lines: lines.clone(),
                        description: description.clone(),
                        source: Some(source),
                        purchase_order_number: None,
                        occurred_at: Utc::now(),
                    })
                })?
            }
        };

        if job_card.status() == JobCardStatus::Completed {
            self.advance_job_card(ctx, job_card_id, JobCardStatus::Invoiced)?;
        }
        Ok(invoice)
    }

    /// Issue the delivery note for an invoice. Client name and delivery
    /// address come from the client directory; lines keep only description
    /// and quantity.
    pub fn convert_invoice_to_delivery_note<C>(
        &self,
        ctx: &RequestContext,
        invoice_id: DocumentId,
        clients: &C,
        date: NaiveDate,
    ) -> Result<DeliveryNote, EngineError>
    where
        C: ClientDirectory + ?Sized,
    {
        if let Some(existing) =
            self.find_linked::<DeliveryNote>(ctx, DocumentRef::invoice(invoice_id))?
        {
            return Ok(existing);
        }

        let invoice: Invoice = self.get(ctx, invoice_id)?;
        let client_id = invoice.client_id().ok_or_else(|| {
            EngineError::Validation(format!("invoice {} has no client", invoice.number()))
        })?;
        let client = clients
            .get(ctx.tenant_id(), client_id)
            .ok_or_else(|| EngineError::NotFound(format!("client {client_id}")))?;

        let items: Vec<DeliveryItem> = invoice
            .lines()
            .iter()
            .map(|l| DeliveryItem::new(l.description.clone(), l.quantity))
            .collect();

        let note: DeliveryNote = self.create_or_existing(ctx, |delivery_note_id, number| {
            DeliveryNoteCommand::CreateDeliveryNote(CreateDeliveryNote {
                tenant_id: ctx.tenant_id(),
                delivery_note_id,
                number,
                client_id: Some(client.id),
                client_name: client.name.clone(),
                date,
                delivery_address: client.address.clone(),
                invoice_id: Some(invoice_id),
                items: items.clone(),
                occurred_at: Utc::now(),
            })
        })?;

        info!(
            tenant_id = %ctx.tenant_id(),
            invoice = %invoice.number(),
            delivery_note = %note.number(),
            "delivery note issued"
        );
        Ok(note)
    }

    fn create_or_existing<D, F>(&self, ctx: &RequestContext, build: F) -> Result<D, EngineError>
    where
        D: Document + Serialize + DeserializeOwned,
        F: Fn(DocumentId, String) -> D::Command,
    {
        match self.create_linked(ctx, build)? {
            Created::New(doc) => Ok(doc),
            Created::AlreadyLinked(existing) => self.get(ctx, existing),
        }
    }

    fn advance_job_card(
        &self,
        ctx: &RequestContext,
        job_card_id: DocumentId,
        to: JobCardStatus,
    ) -> Result<JobCard, EngineError> {
        self.execute(
            ctx,
            job_card_id,
            &JobCardCommand::Advance(AdvanceJobCard {
                tenant_id: ctx.tenant_id(),
                job_card_id,
                to,
                occurred_at: Utc::now(),
            }),
        )
    }
}

/// Job card lines as customer-facing line items: labour is prefixed, part
/// numbers are appended and the internal cost is dropped.
pub fn job_card_lines(lines: &[JobCardLine]) -> Vec<LineItem> {
    lines
        .iter()
        .map(|line| {
            let description = match (line.item_type, &line.part_number) {
                (ItemType::Labour, _) => format!("[Labour] {}", line.item.description),
                (ItemType::Part, Some(part)) => {
                    format!("{} (Part #{part})", line.item.description)
                }
                (ItemType::Part, None) => line.item.description.clone(),
            };
            LineItem {
                description,
                quantity: line.item.quantity,
                unit_price: line.item.unit_price,
                cost_price: Decimal::ZERO,
            }
        })
        .collect()
}

fn work_description(job_card: &JobCard) -> Option<String> {
    let work = job_card.work();
    let parts: Vec<&str> = [work.diagnosis.as_deref(), work.recommended_work.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}
