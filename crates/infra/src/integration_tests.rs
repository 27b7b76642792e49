//! End-to-end document lifecycle over the in-memory store.
//!
//! Quote → Invoice → payment → DeliveryNote, job card workflow enforcement,
//! recurring generation, overdue sweep and profitability, all through the
//! document service.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{TimeZone, Utc};

    use docflow_core::{ClientId, Document, DocumentKind, DocumentRef, RequestContext};
    use docflow_delivery::{DeliveryItem, DeliveryNote, DeliveryNoteStatus};
    use docflow_events::Notifier;
    use docflow_invoicing::{
        Invoice, InvoiceCommand, InvoiceStatus, MarkInvoicePaid, PaymentMethod, SendInvoice,
    };
    use docflow_jobcards::{JobCardStatus, WorkDetails};
    use docflow_pricing::Decimal;
    use docflow_quotes::{Quote, QuoteStatus};
    use docflow_recurring::Frequency;

    use crate::clients::{Client, ClientDirectory, InMemoryClientDirectory};
    use crate::error::EngineError;
    use crate::recurring::{InMemoryScheduleStore, RecurringScheduler};
    use crate::store::DocumentQuery;
    use crate::testing::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn mark_paid(
        ctx: &RequestContext,
        invoice: &Invoice,
        method: Option<PaymentMethod>,
        paid_on: Option<chrono::NaiveDate>,
    ) -> InvoiceCommand {
        InvoiceCommand::MarkPaid(MarkInvoicePaid {
            tenant_id: ctx.tenant_id(),
            invoice_id: invoice.id_typed(),
            method,
            paid_on,
            reference: None,
            occurred_at: Utc::now(),
        })
    }

    fn send_invoice(ctx: &RequestContext, invoice: &Invoice) -> InvoiceCommand {
        InvoiceCommand::SendInvoice(SendInvoice {
            tenant_id: ctx.tenant_id(),
            invoice_id: invoice.id_typed(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn quote_to_delivery_scenario() {
        docflow_observability::init();

        let (svc, ctx) = setup();
        let notifications = svc.notifier().subscribe();
        let clients = InMemoryClientDirectory::new();
        let client = Client::new("Acme Ltd").with_address("12 Dock Road");
        clients.upsert(ctx.tenant_id(), client.clone());

        // Quote: 2 × 100, cost 60, 15% tax.
        let quote = draft_quote(&svc, &ctx, client.id, vec![widget_line()]);
        assert_eq!(quote.number(), "Q-0001");
        let totals = quote.totals().rounded();
        assert_eq!(totals.subtotal, d("200.00"));
        assert_eq!(totals.tax, d("30.00"));
        assert_eq!(totals.total, d("230.00"));
        assert_eq!(quote.cost_summary().margin_percent, d("40"));

        svc.execute::<Quote>(&ctx, quote.id_typed(), &send_quote(&ctx, quote.id_typed()))
            .unwrap();
        let accepted: Quote = svc
            .execute(&ctx, quote.id_typed(), &accept_quote(&ctx, quote.id_typed()))
            .unwrap();
        assert_eq!(accepted.status(), QuoteStatus::Accepted);

        // Convert twice: one invoice.
        let invoice = svc
            .convert_quote_to_invoice(&ctx, quote.id_typed(), date(2024, 1, 10))
            .unwrap();
        assert_eq!(invoice.number(), "INV-0001");
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.source(), Some(DocumentRef::quote(quote.id_typed())));
        assert_eq!(invoice.totals().rounded().total, d("230.00"));
        let again = svc
            .convert_quote_to_invoice(&ctx, quote.id_typed(), date(2024, 1, 11))
            .unwrap();
        assert_eq!(again.id_typed(), invoice.id_typed());
        assert_eq!(
            svc.list(&ctx, &DocumentQuery::kind(DocumentKind::Invoice))
                .unwrap()
                .len(),
            1
        );

        // Pay.
        svc.execute::<Invoice>(&ctx, invoice.id_typed(), &send_invoice(&ctx, &invoice))
            .unwrap();
        let err = svc
            .execute::<Invoice>(
                &ctx,
                invoice.id_typed(),
                &mark_paid(&ctx, &invoice, None, Some(date(2024, 2, 1))),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        svc.execute::<Invoice>(
            &ctx,
            invoice.id_typed(),
            &mark_paid(&ctx, &invoice, Some(PaymentMethod::Cash), Some(date(2024, 2, 1))),
        )
        .unwrap();
        let paid: Invoice = svc.get(&ctx, invoice.id_typed()).unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);
        let payment = paid.payment().unwrap();
        assert_eq!(payment.method, PaymentMethod::Cash);
        assert_eq!(payment.paid_on, date(2024, 2, 1));

        // Deliver, twice: one note.
        let note = svc
            .convert_invoice_to_delivery_note(&ctx, invoice.id_typed(), &clients, date(2024, 2, 2))
            .unwrap();
        assert_eq!(note.number(), "DN-0001");
        assert_eq!(note.status(), DeliveryNoteStatus::Pending);
        assert_eq!(note.items(), &[DeliveryItem::new("Widget", d("2"))]);
        let same: DeliveryNote = svc
            .convert_invoice_to_delivery_note(&ctx, invoice.id_typed(), &clients, date(2024, 2, 3))
            .unwrap();
        assert_eq!(same.id_typed(), note.id_typed());

        // Every status change was announced, creations included.
        let statuses: Vec<(DocumentKind, Option<String>, String)> = notifications
            .drain()
            .into_iter()
            .map(|n| (n.kind, n.old_status, n.new_status))
            .collect();
        let s = |v: &str| v.to_string();
        assert_eq!(
            statuses,
            vec![
                (DocumentKind::Quote, None, s("draft")),
                (DocumentKind::Quote, Some(s("draft")), s("sent")),
                (DocumentKind::Quote, Some(s("sent")), s("accepted")),
                (DocumentKind::Invoice, None, s("draft")),
                (DocumentKind::Invoice, Some(s("draft")), s("sent")),
                (DocumentKind::Invoice, Some(s("sent")), s("paid")),
                (DocumentKind::DeliveryNote, None, s("pending")),
            ]
        );

        // Profit measured against the taxed total.
        let report = svc.profitability(&ctx).unwrap();
        assert_eq!(report.invoices.len(), 1);
        assert_eq!(report.invoices[0].profit, d("110.00"));
        assert_eq!(report.client(client.id).unwrap().invoice_count, 1);
    }

    #[test]
    fn job_card_cannot_skip_ahead() {
        let (svc, ctx) = setup();
        let card = open_job_card(&svc, &ctx, ClientId::new(), WorkDetails::default());

        let err = advance_job_card(&svc, &ctx, card.id_typed(), JobCardStatus::Completed)
            .unwrap_err();
        match err {
            EngineError::Transition(t) => {
                assert_eq!(t.kind, DocumentKind::JobCard);
                assert_eq!(t.from, "received");
                assert_eq!(t.to, "completed");
            }
            other => panic!("expected a transition error, got {other:?}"),
        }

        let card = advance_job_card(&svc, &ctx, card.id_typed(), JobCardStatus::Diagnosing)
            .unwrap();
        assert_eq!(card.status(), JobCardStatus::Diagnosing);
    }

    #[test]
    fn monthly_schedule_tick() {
        let (svc, ctx) = setup();
        let svc = Arc::new(svc);
        let source = draft_invoice(&svc, &ctx, ClientId::new(), vec![widget_line()]);
        let scheduler = RecurringScheduler::new(svc.clone(), InMemoryScheduleStore::new());
        let schedule = scheduler
            .create_schedule(
                &ctx,
                DocumentRef::invoice(source.id_typed()),
                Frequency::Monthly,
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                None,
            )
            .unwrap();

        let report = scheduler
            .tick(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(report.created.len(), 1);

        let schedule = scheduler.get(&ctx, schedule.id).unwrap();
        assert_eq!(
            schedule.next_run_at,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            svc.list(&ctx, &DocumentQuery::kind(DocumentKind::Invoice))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn overdue_sweep_marks_only_past_due_sent_invoices() {
        let (svc, ctx) = setup();
        let client_id = ClientId::new();
        // Both dated 2024-01-02, due 2024-02-01.
        let sent = draft_invoice(&svc, &ctx, client_id, vec![widget_line()]);
        let draft = draft_invoice(&svc, &ctx, client_id, vec![widget_line()]);
        svc.execute::<Invoice>(&ctx, sent.id_typed(), &send_invoice(&ctx, &sent))
            .unwrap();

        assert!(svc.sweep_overdue(&ctx, date(2024, 2, 1)).unwrap().is_empty());
        let marked = svc.sweep_overdue(&ctx, date(2024, 2, 2)).unwrap();
        assert_eq!(marked, vec![sent.id_typed()]);

        let sent: Invoice = svc.get(&ctx, sent.id_typed()).unwrap();
        assert_eq!(sent.status(), InvoiceStatus::Overdue);
        let draft: Invoice = svc.get(&ctx, draft.id_typed()).unwrap();
        assert_eq!(draft.status(), InvoiceStatus::Draft);

        // Overdue invoices can still be paid.
        svc.execute::<Invoice>(
            &ctx,
            sent.id_typed(),
            &mark_paid(&ctx, &sent, Some(PaymentMethod::BankTransfer), Some(date(2024, 2, 10))),
        )
        .unwrap();
    }

    #[test]
    fn racing_conversions_yield_one_invoice() {
        let (svc, ctx) = setup();
        let svc = Arc::new(svc);
        let quote = accepted_quote(&svc, &ctx, ClientId::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let svc = svc.clone();
                let quote_id = quote.id_typed();
                thread::spawn(move || {
                    svc.convert_quote_to_invoice(&ctx, quote_id, date(2024, 1, 10))
                        .map(|i| i.id_typed())
                })
            })
            .collect();

        let ids: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            svc.list(&ctx, &DocumentQuery::kind(DocumentKind::Invoice))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn tenants_never_see_each_other() {
        let (svc, ctx) = setup();
        let quote = draft_quote(&svc, &ctx, ClientId::new(), vec![widget_line()]);
        let other = RequestContext::new(docflow_core::TenantId::new(), docflow_core::UserId::new());

        assert!(svc.list(&other, &DocumentQuery::default()).unwrap().is_empty());
        assert!(matches!(
            svc.convert_quote_to_invoice(&other, quote.id_typed(), date(2024, 1, 10)),
            Err(EngineError::NotFound(_))
        ));
        // Numbering is per tenant.
        let theirs = draft_quote(&svc, &other, ClientId::new(), vec![widget_line()]);
        assert_eq!(theirs.number(), "Q-0001");
    }
}
