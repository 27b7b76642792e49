use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{
    Aggregate, AggregateRoot, ClientId, Document, DocumentId, DocumentKind, DocumentRef,
    DomainError, Status, TenantId, TransitionTable,
};
use docflow_events::Event;
use docflow_pricing::{CostSummary, LineItem, PriceInput, Totals, validate_lines, validate_tax_rate};

/// Quote status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl Status for QuoteStatus {
    fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
        }
    }
}

/// `draft → sent → accepted | rejected`, and `rejected → draft` to revise.
///
/// `accepted` is terminal for status purposes; it may still branch into an
/// invoice conversion.
pub const QUOTE_TRANSITIONS: TransitionTable<QuoteStatus> = TransitionTable::new(
    DocumentKind::Quote,
    &[
        (QuoteStatus::Draft, &[QuoteStatus::Sent]),
        (QuoteStatus::Sent, &[QuoteStatus::Accepted, QuoteStatus::Rejected]),
        (QuoteStatus::Rejected, &[QuoteStatus::Draft]),
    ],
);

/// Free-text fields carried by a quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDetails {
    pub description: Option<String>,
    pub terms: Option<String>,
    pub lead_time: Option<String>,
    pub notes: Option<String>,
}

/// Aggregate root: Quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    id: DocumentId,
    tenant_id: Option<TenantId>,
    number: String,
    client_id: Option<ClientId>,
    date: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
    status: QuoteStatus,
    tax_rate: Decimal,
    lines: Vec<LineItem>,
    details: QuoteDetails,
    source_job_card_id: Option<DocumentId>,
    rejection_reason: Option<String>,
    version: u64,
    created: bool,
}

impl Quote {
    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn details(&self) -> &QuoteDetails {
        &self.details
    }

    pub fn source_job_card_id(&self) -> Option<DocumentId> {
        self.source_job_card_id
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.lines, self.tax_rate)
    }

    /// Internal-only cost and margin figures.
    pub fn cost_summary(&self) -> CostSummary {
        CostSummary::compute(&self.lines)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, QuoteStatus::Draft)
    }

    /// Only accepted quotes may be converted into an invoice.
    pub fn is_convertible(&self) -> bool {
        matches!(self.status, QuoteStatus::Accepted)
    }
}

impl AggregateRoot for Quote {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for Quote {
    const KIND: DocumentKind = DocumentKind::Quote;

    type Status = QuoteStatus;

    fn empty(id: DocumentId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: String::new(),
            client_id: None,
            date: None,
            valid_until: None,
            status: QuoteStatus::Draft,
            tax_rate: Decimal::ZERO,
            lines: Vec::new(),
            details: QuoteDetails::default(),
            source_job_card_id: None,
            rejection_reason: None,
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

    fn status(&self) -> QuoteStatus {
        self.status
    }

    fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    fn source(&self) -> Option<DocumentRef> {
        self.source_job_card_id.map(DocumentRef::job_card)
    }

    fn is_deletable(&self) -> bool {
        self.created && self.status == QuoteStatus::Draft
    }
}

/// Command: CreateQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub number: String,
    pub client_id: Option<ClientId>,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub details: QuoteDetails,
    pub source_job_card_id: Option<DocumentId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateQuote (draft only; replaces editable fields wholesale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub client_id: Option<ClientId>,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub details: QuoteDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RepriceQuoteLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepriceQuoteLine {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub line_index: usize,
    pub input: PriceInput,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseQuote (rejected → draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseQuote {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteCommand {
    CreateQuote(CreateQuote),
    UpdateQuote(UpdateQuote),
    RepriceLine(RepriceQuoteLine),
    SendQuote(SendQuote),
    AcceptQuote(AcceptQuote),
    RejectQuote(RejectQuote),
    ReviseQuote(ReviseQuote),
}

/// Event: QuoteCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCreated {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub number: String,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub details: QuoteDetails,
    pub source_job_card_id: Option<DocumentId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteUpdated {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub client_id: ClientId,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub details: QuoteDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRepriced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRepriced {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub line_index: usize,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSent {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAccepted {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRejected {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteRevised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRevised {
    pub tenant_id: TenantId,
    pub quote_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteEvent {
    QuoteCreated(QuoteCreated),
    QuoteUpdated(QuoteUpdated),
    LineRepriced(LineRepriced),
    QuoteSent(QuoteSent),
    QuoteAccepted(QuoteAccepted),
    QuoteRejected(QuoteRejected),
    QuoteRevised(QuoteRevised),
}

impl Event for QuoteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuoteEvent::QuoteCreated(_) => "quotes.quote.created",
            QuoteEvent::QuoteUpdated(_) => "quotes.quote.updated",
            QuoteEvent::LineRepriced(_) => "quotes.quote.line_repriced",
            QuoteEvent::QuoteSent(_) => "quotes.quote.sent",
            QuoteEvent::QuoteAccepted(_) => "quotes.quote.accepted",
            QuoteEvent::QuoteRejected(_) => "quotes.quote.rejected",
            QuoteEvent::QuoteRevised(_) => "quotes.quote.revised",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuoteEvent::QuoteCreated(e) => e.occurred_at,
            QuoteEvent::QuoteUpdated(e) => e.occurred_at,
            QuoteEvent::LineRepriced(e) => e.occurred_at,
            QuoteEvent::QuoteSent(e) => e.occurred_at,
            QuoteEvent::QuoteAccepted(e) => e.occurred_at,
            QuoteEvent::QuoteRejected(e) => e.occurred_at,
            QuoteEvent::QuoteRevised(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Quote {
    type Command = QuoteCommand;
    type Event = QuoteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuoteEvent::QuoteCreated(e) => {
                self.id = e.quote_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = e.number.clone();
                self.client_id = Some(e.client_id);
                self.date = Some(e.date);
                self.valid_until = Some(e.valid_until);
                self.tax_rate = e.tax_rate;
                self.lines = e.lines.clone();
                self.details = e.details.clone();
                self.source_job_card_id = e.source_job_card_id;
                self.status = QuoteStatus::Draft;
                self.created = true;
            }
            QuoteEvent::QuoteUpdated(e) => {
                self.client_id = Some(e.client_id);
                self.date = Some(e.date);
                self.valid_until = Some(e.valid_until);
                self.tax_rate = e.tax_rate;
                self.lines = e.lines.clone();
                self.details = e.details.clone();
            }
            QuoteEvent::LineRepriced(e) => {
                if let Some(line) = self.lines.get_mut(e.line_index) {
                    *line = e.line.clone();
                }
            }
            QuoteEvent::QuoteSent(_) => {
                self.status = QuoteStatus::Sent;
            }
            QuoteEvent::QuoteAccepted(_) => {
                self.status = QuoteStatus::Accepted;
            }
            QuoteEvent::QuoteRejected(e) => {
                self.status = QuoteStatus::Rejected;
                self.rejection_reason = e.reason.clone();
            }
            QuoteEvent::QuoteRevised(_) => {
                self.status = QuoteStatus::Draft;
                self.rejection_reason = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuoteCommand::CreateQuote(cmd) => self.handle_create(cmd),
            QuoteCommand::UpdateQuote(cmd) => self.handle_update(cmd),
            QuoteCommand::RepriceLine(cmd) => self.handle_reprice(cmd),
            QuoteCommand::SendQuote(cmd) => self.handle_send(cmd),
            QuoteCommand::AcceptQuote(cmd) => self.handle_accept(cmd),
            QuoteCommand::RejectQuote(cmd) => self.handle_reject(cmd),
            QuoteCommand::ReviseQuote(cmd) => self.handle_revise(cmd),
        }
    }
}

fn validate_content(
    client_id: Option<ClientId>,
    date: NaiveDate,
    valid_until: NaiveDate,
    tax_rate: Decimal,
    lines: &[LineItem],
) -> Result<ClientId, DomainError> {
    let client_id =
        client_id.ok_or_else(|| DomainError::validation("quote requires a client"))?;
    if valid_until < date {
        return Err(DomainError::validation(
            "quote valid_until must not be before its date",
        ));
    }
    validate_tax_rate(tax_rate)?;
    validate_lines(lines)?;
    Ok(client_id)
}

impl Quote {
    fn ensure_exists(&self, tenant_id: TenantId, quote_id: DocumentId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("quote {quote_id}")));
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::tenant_isolation("quote belongs to another tenant"));
        }
        if self.id != quote_id {
            return Err(DomainError::invariant("quote_id mismatch"));
        }
        Ok(())
    }

    fn ensure_transition(&self, to: QuoteStatus) -> Result<(), DomainError> {
        QUOTE_TRANSITIONS.check(self.id, self.status, to)
    }

    fn handle_create(&self, cmd: &CreateQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quote already exists"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("quote number is required"));
        }
        let client_id = validate_content(
            cmd.client_id,
            cmd.date,
            cmd.valid_until,
            cmd.tax_rate,
            &cmd.lines,
        )?;

        Ok(vec![QuoteEvent::QuoteCreated(QuoteCreated {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            number: cmd.number.clone(),
            client_id,
            date: cmd.date,
            valid_until: cmd.valid_until,
            tax_rate: cmd.tax_rate,
            lines: cmd.lines.clone(),
            details: cmd.details.clone(),
            source_job_card_id: cmd.source_job_card_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify quote once it has been sent",
            ));
        }
        let client_id = validate_content(
            cmd.client_id,
            cmd.date,
            cmd.valid_until,
            cmd.tax_rate,
            &cmd.lines,
        )?;

        Ok(vec![QuoteEvent::QuoteUpdated(QuoteUpdated {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            client_id,
            date: cmd.date,
            valid_until: cmd.valid_until,
            tax_rate: cmd.tax_rate,
            lines: cmd.lines.clone(),
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reprice(&self, cmd: &RepriceQuoteLine) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify quote once it has been sent",
            ));
        }
        let mut line = self
            .lines
            .get(cmd.line_index)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "line {} on quote {}",
                    cmd.line_index, cmd.quote_id
                ))
            })?;
        line.reprice(cmd.input)?;

        Ok(vec![QuoteEvent::LineRepriced(LineRepriced {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            line_index: cmd.line_index,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send(&self, cmd: &SendQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        self.ensure_transition(QuoteStatus::Sent)?;
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot send quote without lines"));
        }

        Ok(vec![QuoteEvent::QuoteSent(QuoteSent {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        self.ensure_transition(QuoteStatus::Accepted)?;

        Ok(vec![QuoteEvent::QuoteAccepted(QuoteAccepted {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        self.ensure_transition(QuoteStatus::Rejected)?;

        Ok(vec![QuoteEvent::QuoteRejected(QuoteRejected {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.quote_id)?;
        self.ensure_transition(QuoteStatus::Draft)?;

        Ok(vec![QuoteEvent::QuoteRevised(QuoteRevised {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
