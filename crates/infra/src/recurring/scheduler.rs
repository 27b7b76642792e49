//! Recurring scheduler.
//!
//! `tick(now)` is an explicit function of time: every active schedule whose
//! `next_run_at` has passed gets exactly one new document, created through the
//! normal document service path (numbering, validation, notification), and
//! advances by one frequency unit from its previous `next_run_at`.
//!
//! A run is claimed on the schedule (compare-and-swap) before the document is
//! created. A schedule stopped or run elsewhere after it was found due loses
//! the claim and produces nothing. A claimed run whose creation fails is
//! logged and not retried.
//!
//! Ticks are single-flight: a tick that starts while another is running
//! returns immediately with `skipped` set.

use std::sync::{Arc, Mutex, TryLockError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use docflow_core::{
    AggregateRoot, Document, DocumentKind, DocumentRef, RequestContext, ScheduleId,
};
use docflow_events::{Notifier, StatusChanged};
use docflow_invoicing::{CreateInvoice, Invoice, InvoiceCommand};
use docflow_quotes::{CreateQuote, Quote, QuoteCommand, QuoteDetails};
use docflow_recurring::{DocumentTemplate, Frequency, RecurringSchedule};

use crate::error::EngineError;
use crate::service::DocumentService;
use crate::store::{DocumentStore, StoreError};

use super::store::{ScheduleStore, ScheduleVersion};

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Another tick was already running; nothing was attempted.
    pub skipped: bool,
    pub created: Vec<(ScheduleId, DocumentRef)>,
    /// Changed after being found due (stopped, or run by someone else).
    pub superseded: Vec<ScheduleId>,
    pub failed: Vec<ScheduleId>,
}

pub struct RecurringScheduler<S, N, R> {
    service: Arc<DocumentService<S, N>>,
    schedules: R,
    in_flight: Mutex<()>,
}

impl<S, N, R> RecurringScheduler<S, N, R>
where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
    R: ScheduleStore,
{
    pub fn new(service: Arc<DocumentService<S, N>>, schedules: R) -> Self {
        Self {
            service,
            schedules,
            in_flight: Mutex::new(()),
        }
    }

    pub fn schedules(&self) -> &R {
        &self.schedules
    }

    /// Schedule copies of an existing quote or invoice. The source's client,
    /// tax rate, lines and free text are frozen into the schedule now; later
    /// edits to the source do not reach future copies.
    pub fn create_schedule(
        &self,
        ctx: &RequestContext,
        source: DocumentRef,
        frequency: Frequency,
        first_run_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<RecurringSchedule, EngineError> {
        let template = match source.kind {
            DocumentKind::Quote => {
                let quote: Quote = self.service.get(ctx, source.id)?;
                DocumentTemplate {
                    client_id: require_client(quote.client_id(), quote.number())?,
                    tax_rate: quote.tax_rate(),
                    lines: quote.lines().to_vec(),
                    description: quote.details().description.clone(),
                    terms: quote.details().terms.clone(),
                    lead_time: quote.details().lead_time.clone(),
                    notes: quote.details().notes.clone(),
                }
            }
            DocumentKind::Invoice => {
                let invoice: Invoice = self.service.get(ctx, source.id)?;
                DocumentTemplate {
                    client_id: require_client(invoice.client_id(), invoice.number())?,
                    tax_rate: invoice.tax_rate(),
                    lines: invoice.lines().to_vec(),
                    description: invoice.description().map(str::to_owned),
                    terms: None,
                    lead_time: None,
                    notes: None,
                }
            }
            other => {
                return Err(EngineError::Validation(format!(
                    "a {other} cannot be scheduled to recur"
                )));
            }
        };

        let schedule = RecurringSchedule::new(
            ctx.tenant_id(),
            source,
            frequency,
            first_run_at,
            ends_at,
            template,
            ctx.user_id(),
            Utc::now(),
        )?;
        self.schedules.insert(schedule.clone())?;

        info!(
            tenant_id = %ctx.tenant_id(),
            schedule_id = %schedule.id,
            source = %source,
            next_run_at = %schedule.next_run_at,
            "recurring schedule created"
        );
        Ok(schedule)
    }

    pub fn get(
        &self,
        ctx: &RequestContext,
        id: ScheduleId,
    ) -> Result<RecurringSchedule, EngineError> {
        self.schedules
            .get(ctx.tenant_id(), id)?
            .ok_or_else(|| EngineError::NotFound(format!("schedule {id}")))
    }

    pub fn list(&self, ctx: &RequestContext) -> Result<Vec<RecurringSchedule>, EngineError> {
        Ok(self.schedules.list(ctx.tenant_id())?)
    }

    /// Deactivate a schedule. It is kept as history.
    pub fn stop(
        &self,
        ctx: &RequestContext,
        id: ScheduleId,
    ) -> Result<RecurringSchedule, EngineError> {
        let mut retries_left = self.service.config().conflict_retries;
        loop {
            let mut schedule = self.get(ctx, id)?;
            if !schedule.is_active {
                return Ok(schedule);
            }
            let expected = ScheduleVersion::of(&schedule);
            schedule.stop();
            match self.schedules.update(schedule.clone(), expected) {
                Ok(()) => {
                    info!(tenant_id = %ctx.tenant_id(), schedule_id = %id, "recurring schedule stopped");
                    return Ok(schedule);
                }
                Err(StoreError::Conflict(_)) if retries_left > 0 => retries_left -= 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run every schedule due at `now` once.
    ///
    /// A failing schedule is logged and reported; it does not stop the others.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, EngineError> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                debug!(%now, "scheduler tick already in flight; skipping");
                return Ok(TickReport {
                    skipped: true,
                    ..TickReport::default()
                });
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let due = self.schedules.due(now)?;
        let mut report = TickReport::default();

        for schedule in due {
            let id = schedule.id;
            match self.run_schedule(schedule, now) {
                Ok(Some(created)) => report.created.push((id, created)),
                Ok(None) => report.superseded.push(id),
                Err(e) => {
                    warn!(schedule_id = %id, error = %e, "recurring schedule run failed");
                    report.failed.push(id);
                }
            }
        }

        if !report.created.is_empty() || !report.failed.is_empty() {
            info!(
                %now,
                created = report.created.len(),
                failed = report.failed.len(),
                "scheduler tick complete"
            );
        }
        Ok(report)
    }

    fn run_schedule(
        &self,
        schedule: RecurringSchedule,
        now: DateTime<Utc>,
    ) -> Result<Option<DocumentRef>, EngineError> {
        let expected = ScheduleVersion::of(&schedule);
        let mut claimed = schedule;
        claimed.claim_run(now)?;
        match self.schedules.update(claimed.clone(), expected) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                debug!(
                    tenant_id = %claimed.tenant_id,
                    schedule_id = %claimed.id,
                    "schedule changed after it was found due; run dropped"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let created = match self.instantiate(&claimed, now) {
            Ok(created) => created,
            Err(e) => {
                warn!(
                    tenant_id = %claimed.tenant_id,
                    schedule_id = %claimed.id,
                    run_count = claimed.run_count,
                    error = %e,
                    "claimed run produced no document"
                );
                return Err(e);
            }
        };
        self.record_document(&claimed, created);

        debug!(
            tenant_id = %claimed.tenant_id,
            schedule_id = %claimed.id,
            document = %created,
            next_run_at = %claimed.next_run_at,
            active = claimed.is_active,
            "recurring document created"
        );
        Ok(Some(created))
    }

    fn instantiate(
        &self,
        schedule: &RecurringSchedule,
        now: DateTime<Utc>,
    ) -> Result<DocumentRef, EngineError> {
        let ctx = RequestContext::new(schedule.tenant_id, schedule.created_by);
        let template = &schedule.template;
        let date = now.date_naive();

        match schedule.target_kind() {
            DocumentKind::Quote => {
                let valid_until = self.service.default_valid_until(date);
                let quote: Quote = self.service.create(&ctx, |quote_id, number| {
                    QuoteCommand::CreateQuote(CreateQuote {
                        tenant_id: ctx.tenant_id(),
                        quote_id,
                        number,
                        client_id: Some(template.client_id),
                        date,
                        valid_until,
                        tax_rate: template.tax_rate,
                        lines: template.lines.clone(),
                        details: QuoteDetails {
                            description: template.description.clone(),
                            terms: template.terms.clone(),
                            lead_time: template.lead_time.clone(),
                            notes: template.notes.clone(),
                        },
                        source_job_card_id: None,
                        occurred_at: now,
                    })
                })?;
                Ok(DocumentRef::quote(*quote.id()))
            }
            DocumentKind::Invoice => {
                let due_date = self.service.default_due_date(date);
                let invoice: Invoice = self.service.create(&ctx, |invoice_id, number| {
                    InvoiceCommand::CreateInvoice(CreateInvoice {
                        tenant_id: ctx.tenant_id(),
                        invoice_id,
                        number,
                        client_id: Some(template.client_id),
                        date,
                        due_date,
                        tax_rate: template.tax_rate,
                        lines: template.lines.clone(),
                        description: template.description.clone(),
                        source: None,
                        purchase_order_number: None,
                        occurred_at: now,
                    })
                })?;
                Ok(DocumentRef::invoice(*invoice.id()))
            }
            other => Err(EngineError::Validation(format!(
                "schedule {} targets a {other}",
                schedule.id
            ))),
        }
    }

    /// Point the schedule at its latest document. The run is already claimed,
    /// so losing this write only loses the pointer.
    fn record_document(&self, claimed: &RecurringSchedule, created: DocumentRef) {
        let mut retries_left = self.service.config().conflict_retries;
        loop {
            let result = self
                .schedules
                .get(claimed.tenant_id, claimed.id)
                .and_then(|current| {
                    let mut current = current.ok_or_else(|| {
                        StoreError::NotFound(format!("schedule {}", claimed.id))
                    })?;
                    let expected = ScheduleVersion::of(&current);
                    current.record_document(created.id);
                    self.schedules.update(current, expected)
                });
            match result {
                Ok(()) => return,
                Err(StoreError::Conflict(_)) if retries_left > 0 => retries_left -= 1,
                Err(e) => {
                    warn!(
                        tenant_id = %claimed.tenant_id,
                        schedule_id = %claimed.id,
                        document = %created,
                        error = %e,
                        "could not record the schedule's latest document"
                    );
                    return;
                }
            }
        }
    }
}

fn require_client(
    client_id: Option<docflow_core::ClientId>,
    number: &str,
) -> Result<docflow_core::ClientId, EngineError> {
    client_id.ok_or_else(|| EngineError::Validation(format!("{number} has no client")))
}
