//! Shared fixtures for the infra unit and integration tests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use docflow_core::{ClientId, DocumentId, RequestContext, TenantId, UserId};
use docflow_events::{InMemoryNotifier, StatusChanged};
use docflow_invoicing::{CreateInvoice, Invoice, InvoiceCommand};
use docflow_jobcards::{
    AdvanceJobCard, Asset, JobCard, JobCardCommand, JobCardStatus, OpenJobCard, Priority,
    WorkDetails,
};
use docflow_pricing::{Decimal, LineItem};
use docflow_quotes::{
    AcceptQuote, CreateQuote, Quote, QuoteCommand, QuoteDetails, SendQuote,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::service::DocumentService;
use crate::store::InMemoryDocumentStore;

pub(crate) type MemService =
    DocumentService<Arc<InMemoryDocumentStore>, Arc<InMemoryNotifier<StatusChanged>>>;

pub(crate) fn setup() -> (MemService, RequestContext) {
    let svc = DocumentService::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryNotifier::new()),
        EngineConfig::default(),
    );
    (svc, RequestContext::new(TenantId::new(), UserId::new()))
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Two widgets at 100, costing 60 each.
pub(crate) fn widget_line() -> LineItem {
    LineItem::new("Widget", Decimal::TWO, Decimal::ONE_HUNDRED, Decimal::from(60)).unwrap()
}

pub(crate) fn draft_quote(
    svc: &MemService,
    ctx: &RequestContext,
    client_id: ClientId,
    lines: Vec<LineItem>,
) -> Quote {
    let on = date(2024, 1, 2);
    svc.create(ctx, |quote_id, number| {
        QuoteCommand::CreateQuote(CreateQuote {
            tenant_id: ctx.tenant_id(),
            quote_id,
            number,
            client_id: Some(client_id),
            date: on,
            valid_until: svc.default_valid_until(on),
            tax_rate: Decimal::from(15),
            lines: lines.clone(),
            details: QuoteDetails {
                description: Some("Widget supply".to_string()),
                ..QuoteDetails::default()
            },
            source_job_card_id: None,
            occurred_at: Utc::now(),
        })
    })
    .unwrap()
}

pub(crate) fn send_quote(ctx: &RequestContext, quote_id: DocumentId) -> QuoteCommand {
    QuoteCommand::SendQuote(SendQuote {
        tenant_id: ctx.tenant_id(),
        quote_id,
        occurred_at: Utc::now(),
    })
}

pub(crate) fn accept_quote(ctx: &RequestContext, quote_id: DocumentId) -> QuoteCommand {
    QuoteCommand::AcceptQuote(AcceptQuote {
        tenant_id: ctx.tenant_id(),
        quote_id,
        occurred_at: Utc::now(),
    })
}

pub(crate) fn accepted_quote(svc: &MemService, ctx: &RequestContext, client_id: ClientId) -> Quote {
    let quote = draft_quote(svc, ctx, client_id, vec![widget_line()]);
    svc.execute::<Quote>(ctx, quote.id_typed(), &send_quote(ctx, quote.id_typed()))
        .unwrap();
    svc.execute::<Quote>(ctx, quote.id_typed(), &accept_quote(ctx, quote.id_typed()))
        .unwrap()
}

/// A draft invoice dated 2024-01-02, due 2024-02-01.
pub(crate) fn draft_invoice(
    svc: &MemService,
    ctx: &RequestContext,
    client_id: ClientId,
    lines: Vec<LineItem>,
) -> Invoice {
    let on = date(2024, 1, 2);
    svc.create(ctx, |invoice_id, number| {
        InvoiceCommand::CreateInvoice(CreateInvoice {
            tenant_id: ctx.tenant_id(),
            invoice_id,
            number,
            client_id: Some(client_id),
            date: on,
            due_date: svc.default_due_date(on),
            tax_rate: Decimal::from(15),
            lines: lines.clone(),
            description: None,
            source: None,
            purchase_order_number: None,
            occurred_at: Utc::now(),
        })
    })
    .unwrap()
}

pub(crate) fn open_job_card(
    svc: &MemService,
    ctx: &RequestContext,
    client_id: ClientId,
    work: WorkDetails,
) -> JobCard {
    svc.create(ctx, |job_card_id, number| {
        JobCardCommand::OpenJobCard(OpenJobCard {
            tenant_id: ctx.tenant_id(),
            job_card_id,
            number,
            client_id: Some(client_id),
            received_on: date(2024, 3, 1),
            asset: Asset {
                make: Some("Toyota".to_string()),
                model: Some("Hilux".to_string()),
                ..Asset::default()
            },
            priority: Priority::Normal,
            work: work.clone(),
            occurred_at: Utc::now(),
        })
    })
    .unwrap()
}

pub(crate) fn advance_job_card(
    svc: &MemService,
    ctx: &RequestContext,
    job_card_id: DocumentId,
    to: JobCardStatus,
) -> Result<JobCard, EngineError> {
    svc.execute(
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
