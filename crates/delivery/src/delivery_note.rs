use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{
    Aggregate, AggregateRoot, ClientId, Document, DocumentId, DocumentKind, DocumentRef,
    DomainError, Status, TenantId, TransitionTable,
};
use docflow_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryNoteStatus {
    Pending,
    Delivered,
}

impl Status for DeliveryNoteStatus {
    fn as_str(&self) -> &'static str {
        match self {
            DeliveryNoteStatus::Pending => "pending",
            DeliveryNoteStatus::Delivered => "delivered",
        }
    }
}

pub const DELIVERY_NOTE_TRANSITIONS: TransitionTable<DeliveryNoteStatus> = TransitionTable::new(
    DocumentKind::DeliveryNote,
    &[(DeliveryNoteStatus::Pending, &[DeliveryNoteStatus::Delivered])],
);

/// A delivered line: what and how many. Delivery notes carry no prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub description: String,
    pub quantity: Decimal,
}

impl DeliveryItem {
    pub fn new(description: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
        }
    }
}

/// Aggregate root: DeliveryNote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNote {
    id: DocumentId,
    tenant_id: Option<TenantId>,
    number: String,
    client_id: Option<ClientId>,
    client_name: String,
    date: Option<NaiveDate>,
    delivery_address: Option<String>,
    status: DeliveryNoteStatus,
    invoice_id: Option<DocumentId>,
    items: Vec<DeliveryItem>,
    delivered_on: Option<NaiveDate>,
    received_by: Option<String>,
    version: u64,
    created: bool,
}

impl DeliveryNote {
    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn invoice_id(&self) -> Option<DocumentId> {
        self.invoice_id
    }

    pub fn items(&self) -> &[DeliveryItem] {
        &self.items
    }

    pub fn delivered_on(&self) -> Option<NaiveDate> {
        self.delivered_on
    }

    pub fn received_by(&self) -> Option<&str> {
        self.received_by.as_deref()
    }
}

impl AggregateRoot for DeliveryNote {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for DeliveryNote {
    const KIND: DocumentKind = DocumentKind::DeliveryNote;

    type Status = DeliveryNoteStatus;

    fn empty(id: DocumentId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: String::new(),
            client_id: None,
            client_name: String::new(),
            date: None,
            delivery_address: None,
            status: DeliveryNoteStatus::Pending,
            invoice_id: None,
            items: Vec::new(),
            delivered_on: None,
            received_by: None,
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

    fn status(&self) -> DeliveryNoteStatus {
        self.status
    }

    fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    fn source(&self) -> Option<DocumentRef> {
        self.invoice_id.map(DocumentRef::invoice)
    }

    fn is_deletable(&self) -> bool {
        self.created && self.status == DeliveryNoteStatus::Pending
    }
}

/// Command: CreateDeliveryNote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeliveryNote {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub number: String,
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub date: NaiveDate,
    pub delivery_address: Option<String>,
    pub invoice_id: Option<DocumentId>,
    pub items: Vec<DeliveryItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDeliveryNote (pending only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDeliveryNote {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub date: NaiveDate,
    pub delivery_address: Option<String>,
    pub items: Vec<DeliveryItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDelivered {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub delivered_on: NaiveDate,
    pub received_by: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryNoteCommand {
    CreateDeliveryNote(CreateDeliveryNote),
    UpdateDeliveryNote(UpdateDeliveryNote),
    MarkDelivered(MarkDelivered),
}

/// Event: DeliveryNoteCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNoteCreated {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub number: String,
    pub client_id: ClientId,
    pub client_name: String,
    pub date: NaiveDate,
    pub delivery_address: Option<String>,
    pub invoice_id: Option<DocumentId>,
    pub items: Vec<DeliveryItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryNoteUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNoteUpdated {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub date: NaiveDate,
    pub delivery_address: Option<String>,
    pub items: Vec<DeliveryItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryNoteDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNoteDelivered {
    pub tenant_id: TenantId,
    pub delivery_note_id: DocumentId,
    pub delivered_on: NaiveDate,
    pub received_by: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryNoteEvent {
    DeliveryNoteCreated(DeliveryNoteCreated),
    DeliveryNoteUpdated(DeliveryNoteUpdated),
    DeliveryNoteDelivered(DeliveryNoteDelivered),
}

impl Event for DeliveryNoteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryNoteEvent::DeliveryNoteCreated(_) => "delivery.delivery_note.created",
            DeliveryNoteEvent::DeliveryNoteUpdated(_) => "delivery.delivery_note.updated",
            DeliveryNoteEvent::DeliveryNoteDelivered(_) => "delivery.delivery_note.delivered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryNoteEvent::DeliveryNoteCreated(e) => e.occurred_at,
            DeliveryNoteEvent::DeliveryNoteUpdated(e) => e.occurred_at,
            DeliveryNoteEvent::DeliveryNoteDelivered(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DeliveryNote {
    type Command = DeliveryNoteCommand;
    type Event = DeliveryNoteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryNoteEvent::DeliveryNoteCreated(e) => {
                self.id = e.delivery_note_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = e.number.clone();
                self.client_id = Some(e.client_id);
                self.client_name = e.client_name.clone();
                self.date = Some(e.date);
                self.delivery_address = e.delivery_address.clone();
                self.invoice_id = e.invoice_id;
                self.items = e.items.clone();
                self.status = DeliveryNoteStatus::Pending;
                self.created = true;
            }
            DeliveryNoteEvent::DeliveryNoteUpdated(e) => {
                self.date = Some(e.date);
                self.delivery_address = e.delivery_address.clone();
                self.items = e.items.clone();
            }
            DeliveryNoteEvent::DeliveryNoteDelivered(e) => {
                self.status = DeliveryNoteStatus::Delivered;
                self.delivered_on = Some(e.delivered_on);
                self.received_by = e.received_by.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryNoteCommand::CreateDeliveryNote(cmd) => self.handle_create(cmd),
            DeliveryNoteCommand::UpdateDeliveryNote(cmd) => self.handle_update(cmd),
            DeliveryNoteCommand::MarkDelivered(cmd) => self.handle_mark_delivered(cmd),
        }
    }
}

fn validate_items(items: &[DeliveryItem]) -> Result<(), DomainError> {
    for item in items {
        if item.description.trim().is_empty() {
            return Err(DomainError::validation(
                "delivery item description is required",
            ));
        }
        if item.quantity < Decimal::ZERO {
            return Err(DomainError::validation("delivery item quantity must be >= 0"));
        }
    }
    Ok(())
}

impl DeliveryNote {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        match self.tenant_id {
            None => Err(DomainError::not_found(format!("delivery note {}", self.id))),
            Some(t) if t == tenant_id => Ok(()),
            Some(_) => Err(DomainError::tenant_isolation(
                "delivery note belongs to another tenant",
            )),
        }
    }

    fn ensure_delivery_note_id(&self, id: DocumentId) -> Result<(), DomainError> {
        if self.id != id {
            return Err(DomainError::invariant("delivery_note_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreateDeliveryNote,
    ) -> Result<Vec<DeliveryNoteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("delivery note already exists"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("delivery note number is required"));
        }
        let client_id = cmd
            .client_id
            .ok_or_else(|| DomainError::validation("delivery note requires a client"))?;
        validate_items(&cmd.items)?;

        Ok(vec![DeliveryNoteEvent::DeliveryNoteCreated(
            DeliveryNoteCreated {
                tenant_id: cmd.tenant_id,
                delivery_note_id: cmd.delivery_note_id,
                number: cmd.number.clone(),
                client_id,
                client_name: cmd.client_name.clone(),
                date: cmd.date,
                delivery_address: cmd.delivery_address.clone(),
                invoice_id: cmd.invoice_id,
                items: cmd.items.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update(
        &self,
        cmd: &UpdateDeliveryNote,
    ) -> Result<Vec<DeliveryNoteEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_delivery_note_id(cmd.delivery_note_id)?;
        if self.status != DeliveryNoteStatus::Pending {
            return Err(DomainError::invariant(
                "cannot modify a delivery note once delivered",
            ));
        }
        validate_items(&cmd.items)?;

        Ok(vec![DeliveryNoteEvent::DeliveryNoteUpdated(
            DeliveryNoteUpdated {
                tenant_id: cmd.tenant_id,
                delivery_note_id: cmd.delivery_note_id,
                date: cmd.date,
                delivery_address: cmd.delivery_address.clone(),
                items: cmd.items.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_delivered(
        &self,
        cmd: &MarkDelivered,
    ) -> Result<Vec<DeliveryNoteEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_delivery_note_id(cmd.delivery_note_id)?;
        DELIVERY_NOTE_TRANSITIONS.check(self.id, self.status, DeliveryNoteStatus::Delivered)?;

        Ok(vec![DeliveryNoteEvent::DeliveryNoteDelivered(
            DeliveryNoteDelivered {
                tenant_id: cmd.tenant_id,
                delivery_note_id: cmd.delivery_note_id,
                delivered_on: cmd.delivered_on,
                received_by: cmd.received_by.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
