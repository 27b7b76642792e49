use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{
    Aggregate, AggregateRoot, ClientId, Document, DocumentId, DocumentKind, DocumentRef,
    DomainError, Status, TenantId, TransitionTable,
};
use docflow_events::Event;
use docflow_pricing::{CostSummary, LineItem, Totals, validate_lines, validate_tax_rate};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl Status for InvoiceStatus {
    fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

/// `draft → sent → paid`, `sent → overdue → paid`. `paid` is terminal.
pub const INVOICE_TRANSITIONS: TransitionTable<InvoiceStatus> = TransitionTable::new(
    DocumentKind::Invoice,
    &[
        (InvoiceStatus::Draft, &[InvoiceStatus::Sent]),
        (InvoiceStatus::Sent, &[InvoiceStatus::Paid, InvoiceStatus::Overdue]),
        (InvoiceStatus::Overdue, &[InvoiceStatus::Paid]),
    ],
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
    Other,
}

/// Payment details. Present on an invoice if and only if it is `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    pub reference: Option<String>,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: DocumentId,
    tenant_id: Option<TenantId>,
    number: String,
    client_id: Option<ClientId>,
    date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    status: InvoiceStatus,
    tax_rate: Decimal,
    lines: Vec<LineItem>,
    description: Option<String>,
    source: Option<DocumentRef>,
    purchase_order_number: Option<String>,
    payment: Option<Payment>,
    version: u64,
    created: bool,
}

impl Invoice {
    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn purchase_order_number(&self) -> Option<&str> {
        self.purchase_order_number.as_deref()
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.lines, self.tax_rate)
    }

    pub fn cost_summary(&self) -> CostSummary {
        CostSummary::compute(&self.lines)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, InvoiceStatus::Draft)
    }

    /// A sent invoice whose due date lies strictly before `as_of`.
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.status == InvoiceStatus::Sent && self.due_date.is_some_and(|due| due < as_of)
    }
}

impl AggregateRoot for Invoice {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for Invoice {
    const KIND: DocumentKind = DocumentKind::Invoice;

    type Status = InvoiceStatus;

    fn empty(id: DocumentId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: String::new(),
            client_id: None,
            date: None,
            due_date: None,
            status: InvoiceStatus::Draft,
            tax_rate: Decimal::ZERO,
            lines: Vec::new(),
            description: None,
            source: None,
            purchase_order_number: None,
            payment: None,
            version: 0,
            created: false,
        }
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn number(&self) -> &str {
        &self.number
    }

    fn status(&self) -> InvoiceStatus {
        self.status
    }

    fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    fn source(&self) -> Option<DocumentRef> {
        self.source
    }

    fn is_deletable(&self) -> bool {
        self.created && self.status == InvoiceStatus::Draft
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub number: String,
    pub client_id: Option<ClientId>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub description: Option<String>,
    /// Quote or job card this invoice was converted from.
    pub source: Option<DocumentRef>,
    pub purchase_order_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateInvoice (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub client_id: Option<ClientId>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub description: Option<String>,
    pub purchase_order_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoicePaid.
///
/// `method` and `paid_on` are optional at the type level so that a request
/// missing them is rejected as a validation failure rather than unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoicePaid {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub method: Option<PaymentMethod>,
    pub paid_on: Option<NaiveDate>,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiceOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiceOverdue {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub as_of: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    UpdateInvoice(UpdateInvoice),
    SendInvoice(SendInvoice),
    MarkPaid(MarkInvoicePaid),
    MarkOverdue(MarkInvoiceOverdue),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub number: String,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub description: Option<String>,
    pub source: Option<DocumentRef>,
    pub purchase_order_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdated {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub description: Option<String>,
    pub purchase_order_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSent {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub payment: Payment,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMarkedOverdue {
    pub tenant_id: TenantId,
    pub invoice_id: DocumentId,
    pub as_of: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceUpdated(InvoiceUpdated),
    InvoiceSent(InvoiceSent),
    InvoicePaid(InvoicePaid),
    InvoiceMarkedOverdue(InvoiceMarkedOverdue),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceUpdated(_) => "invoicing.invoice.updated",
            InvoiceEvent::InvoiceSent(_) => "invoicing.invoice.sent",
            InvoiceEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            InvoiceEvent::InvoiceMarkedOverdue(_) => "invoicing.invoice.overdue",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceUpdated(e) => e.occurred_at,
            InvoiceEvent::InvoiceSent(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceMarkedOverdue(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = e.number.clone();
                self.client_id = Some(e.client_id);
                self.date = Some(e.date);
                self.due_date = Some(e.due_date);
                self.tax_rate = e.tax_rate;
                self.lines = e.lines.clone();
                self.description = e.description.clone();
                self.source = e.source;
                self.purchase_order_number = e.purchase_order_number.clone();
                self.status = InvoiceStatus::Draft;
                self.payment = None;
                self.created = true;
            }
            InvoiceEvent::InvoiceUpdated(e) => {
                self.client_id = Some(e.client_id);
                self.date = Some(e.date);
                self.due_date = Some(e.due_date);
                self.tax_rate = e.tax_rate;
                self.lines = e.lines.clone();
                self.description = e.description.clone();
                self.purchase_order_number = e.purchase_order_number.clone();
            }
            InvoiceEvent::InvoiceSent(_) => {
                self.status = InvoiceStatus::Sent;
            }
            InvoiceEvent::InvoicePaid(e) => {
                // Payment fields and status change together.
                self.status = InvoiceStatus::Paid;
                self.payment = Some(e.payment.clone());
            }
            InvoiceEvent::InvoiceMarkedOverdue(_) => {
                self.status = InvoiceStatus::Overdue;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::UpdateInvoice(cmd) => self.handle_update(cmd),
            InvoiceCommand::SendInvoice(cmd) => self.handle_send(cmd),
            InvoiceCommand::MarkPaid(cmd) => self.handle_mark_paid(cmd),
            InvoiceCommand::MarkOverdue(cmd) => self.handle_mark_overdue(cmd),
        }
    }
}

impl Invoice {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        match self.tenant_id {
            None => Err(DomainError::not_found(format!("invoice {}", self.id))),
            Some(t) if t == tenant_id => Ok(()),
            Some(_) => Err(DomainError::tenant_isolation(
                "invoice belongs to another tenant",
            )),
        }
    }

    fn ensure_invoice_id(&self, invoice_id: DocumentId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify invoice once it has been sent",
            ));
        }
        Ok(())
    }

    fn validate_content(
        client_id: Option<ClientId>,
        date: NaiveDate,
        due_date: NaiveDate,
        tax_rate: Decimal,
        lines: &[LineItem],
    ) -> Result<ClientId, DomainError> {
        let client_id =
            client_id.ok_or_else(|| DomainError::validation("invoice requires a client"))?;
        if due_date < date {
            return Err(DomainError::validation(
                "invoice due_date must not be before its date",
            ));
        }
        validate_tax_rate(tax_rate)?;
        validate_lines(lines)?;
        Ok(client_id)
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("invoice number is required"));
        }
        if let Some(source) = cmd.source {
            if !matches!(source.kind, DocumentKind::Quote | DocumentKind::JobCard) {
                return Err(DomainError::validation(format!(
                    "an invoice cannot be sourced from a {}",
                    source.kind
                )));
            }
        }
        let client_id = Self::validate_content(
            cmd.client_id,
            cmd.date,
            cmd.due_date,
            cmd.tax_rate,
            &cmd.lines,
        )?;

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            number: cmd.number.clone(),
            client_id,
            date: cmd.date,
            due_date: cmd.due_date,
            tax_rate: cmd.tax_rate,
            lines: cmd.lines.clone(),
            description: cmd.description.clone(),
            source: cmd.source,
            purchase_order_number: cmd.purchase_order_number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_modifiable()?;
        let client_id = Self::validate_content(
            cmd.client_id,
            cmd.date,
            cmd.due_date,
            cmd.tax_rate,
            &cmd.lines,
        )?;

        Ok(vec![InvoiceEvent::InvoiceUpdated(InvoiceUpdated {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            client_id,
            date: cmd.date,
            due_date: cmd.due_date,
            tax_rate: cmd.tax_rate,
            lines: cmd.lines.clone(),
            description: cmd.description.clone(),
            purchase_order_number: cmd.purchase_order_number.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send(&self, cmd: &SendInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        INVOICE_TRANSITIONS.check(self.id, self.status, InvoiceStatus::Sent)?;
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot send invoice without lines"));
        }

        Ok(vec![InvoiceEvent::InvoiceSent(InvoiceSent {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_paid(&self, cmd: &MarkInvoicePaid) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        INVOICE_TRANSITIONS.check(self.id, self.status, InvoiceStatus::Paid)?;

        let method = cmd.method.ok_or_else(|| {
            DomainError::validation(format!(
                "payment method is required to mark invoice {} paid",
                self.id
            ))
        })?;
        let paid_on = cmd.paid_on.ok_or_else(|| {
            DomainError::validation(format!(
                "payment date is required to mark invoice {} paid",
                self.id
            ))
        })?;
        let reference = cmd
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_owned);

        Ok(vec![InvoiceEvent::InvoicePaid(InvoicePaid {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            payment: Payment {
                method,
                paid_on,
                reference,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_overdue(
        &self,
        cmd: &MarkInvoiceOverdue,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        INVOICE_TRANSITIONS.check(self.id, self.status, InvoiceStatus::Overdue)?;
        if !self.is_past_due(cmd.as_of) {
            return Err(DomainError::validation(format!(
                "invoice {} is not past its due date as of {}",
                self.id, cmd.as_of
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceMarkedOverdue(InvoiceMarkedOverdue {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            as_of: cmd.as_of,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::execute;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn day(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn create_cmd(tenant_id: TenantId, invoice_id: DocumentId) -> CreateInvoice {
        CreateInvoice {
            tenant_id,
            invoice_id,
            number: "INV-0001".to_string(),
            client_id: Some(ClientId::new()),
            date: day(2024, 1, 2),
            due_date: day(2024, 2, 1),
            tax_rate: d("15"),
            lines: vec![LineItem::new("Widget", d("2"), d("100"), d("60")).unwrap()],
            description: None,
            source: None,
            purchase_order_number: Some("PO-77".to_string()),
            occurred_at: test_time(),
        }
    }

    fn sent_invoice() -> (Invoice, TenantId, DocumentId) {
        let tenant_id = test_tenant_id();
        let invoice_id = DocumentId::new();
        let mut invoice = Invoice::empty(invoice_id);
        execute(
            &mut invoice,
            &InvoiceCommand::CreateInvoice(create_cmd(tenant_id, invoice_id)),
        )
        .unwrap();
        execute(
            &mut invoice,
            &InvoiceCommand::SendInvoice(SendInvoice {
                tenant_id,
                invoice_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        (invoice, tenant_id, invoice_id)
    }

    fn pay(
        tenant_id: TenantId,
        invoice_id: DocumentId,
        method: Option<PaymentMethod>,
    ) -> InvoiceCommand {
        InvoiceCommand::MarkPaid(MarkInvoicePaid {
            tenant_id,
            invoice_id,
            method,
            paid_on: Some(day(2024, 1, 10)),
            reference: None,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_invoice_emits_created_event_in_draft() {
        let tenant_id = test_tenant_id();
        let invoice_id = DocumentId::new();
        let invoice = Invoice::empty(invoice_id);

        let events = invoice
            .handle(&InvoiceCommand::CreateInvoice(create_cmd(tenant_id, invoice_id)))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "invoicing.invoice.created");

        let mut invoice = invoice;
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.purchase_order_number(), Some("PO-77"));
        assert_eq!(invoice.totals().rounded().total, d("230"));
        assert!(invoice.payment().is_none());
    }

    #[test]
    fn marking_paid_without_method_is_a_validation_error() {
        let (invoice, tenant_id, invoice_id) = sent_invoice();
        let err = invoice.handle(&pay(tenant_id, invoice_id, None)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("method")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(invoice.status(), InvoiceStatus::Sent);
        assert!(invoice.payment().is_none());
    }

    #[test]
    fn marking_paid_sets_status_and_payment_together() {
        let (mut invoice, tenant_id, invoice_id) = sent_invoice();
        execute(
            &mut invoice,
            &pay(tenant_id, invoice_id, Some(PaymentMethod::Cash)),
        )
        .unwrap();

        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        let payment = invoice.payment().unwrap();
        assert_eq!(payment.method, PaymentMethod::Cash);
        assert_eq!(payment.paid_on, day(2024, 1, 10));
        assert!(INVOICE_TRANSITIONS.is_terminal(InvoiceStatus::Paid));
    }

    #[test]
    fn cannot_pay_a_draft() {
        let tenant_id = test_tenant_id();
        let invoice_id = DocumentId::new();
        let mut invoice = Invoice::empty(invoice_id);
        execute(
            &mut invoice,
            &InvoiceCommand::CreateInvoice(create_cmd(tenant_id, invoice_id)),
        )
        .unwrap();

        let err = invoice
            .handle(&pay(tenant_id, invoice_id, Some(PaymentMethod::Card)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Transition(_)));
    }

    #[test]
    fn overdue_requires_due_date_to_have_passed() {
        let (mut invoice, tenant_id, invoice_id) = sent_invoice();
        let overdue = |as_of| {
            InvoiceCommand::MarkOverdue(MarkInvoiceOverdue {
                tenant_id,
                invoice_id,
                as_of,
                occurred_at: test_time(),
            })
        };

        assert!(matches!(
            invoice.handle(&overdue(day(2024, 2, 1))),
            Err(DomainError::Validation(_))
        ));

        execute(&mut invoice, &overdue(day(2024, 2, 2))).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Overdue);

        execute(
            &mut invoice,
            &pay(tenant_id, invoice_id, Some(PaymentMethod::BankTransfer)),
        )
        .unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn cannot_update_after_sending() {
        let (invoice, tenant_id, invoice_id) = sent_invoice();
        let cmd = create_cmd(tenant_id, invoice_id);
        let err = invoice
            .handle(&InvoiceCommand::UpdateInvoice(UpdateInvoice {
                tenant_id,
                invoice_id,
                client_id: cmd.client_id,
                date: cmd.date,
                due_date: cmd.due_date,
                tax_rate: cmd.tax_rate,
                lines: cmd.lines,
                description: None,
                purchase_order_number: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn delivery_note_is_not_a_valid_source() {
        let invoice_id = DocumentId::new();
        let mut cmd = create_cmd(test_tenant_id(), invoice_id);
        cmd.source = Some(DocumentRef::new(DocumentKind::DeliveryNote, DocumentId::new()));
        let err = Invoice::empty(invoice_id)
            .handle(&InvoiceCommand::CreateInvoice(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_method() -> impl Strategy<Value = Option<PaymentMethod>> {
            prop_oneof![
                Just(None),
                Just(Some(PaymentMethod::Cash)),
                Just(Some(PaymentMethod::BankTransfer)),
                Just(Some(PaymentMethod::Card)),
                Just(Some(PaymentMethod::Cheque)),
            ]
        }

        proptest! {
            /// Property: payment details are present exactly when the invoice is paid.
            #[test]
            fn payment_present_iff_paid(
                methods in proptest::collection::vec(any_method(), 1..6),
            ) {
                let (mut invoice, tenant_id, invoice_id) = sent_invoice();
                for method in methods {
                    let _ = execute(&mut invoice, &pay(tenant_id, invoice_id, method));
                    prop_assert_eq!(
                        invoice.payment().is_some(),
                        invoice.status() == InvoiceStatus::Paid
                    );
                }
            }
        }
    }
}
