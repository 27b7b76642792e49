//! Export view handed to the rendering collaborator.
//!
//! A [`FinalizedDocument`] has every field resolved and its totals computed
//! and rounded. It never carries cost prices, cost subtotals or margins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use docflow_core::{Document, DocumentKind, DocumentRef, RequestContext, Status};
use docflow_delivery::DeliveryNote;
use docflow_events::{Notifier, StatusChanged};
use docflow_invoicing::{Invoice, PaymentMethod};
use docflow_jobcards::JobCard;
use docflow_pricing::{Decimal, LineItem, Totals, round_money};
use docflow_quotes::Quote;

use crate::clients::{Client, ClientDirectory};
use crate::conversion::job_card_lines;
use crate::error::EngineError;
use crate::service::DocumentService;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<&Client> for PartyInfo {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            address: client.address.clone(),
        }
    }
}

/// Delivery notes print quantities only, so prices are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub line_total: Option<Decimal>,
}

impl FinalizedLine {
    fn priced(line: &LineItem) -> Self {
        Self {
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: Some(round_money(line.unit_price)),
            line_total: Some(round_money(line.line_total())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedDocument {
    pub kind: DocumentKind,
    pub number: String,
    pub status: String,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub client: Option<PartyInfo>,
    pub delivery_address: Option<String>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub lead_time: Option<String>,
    pub notes: Option<String>,
    pub reference: Option<String>,
    pub lines: Vec<FinalizedLine>,
    pub tax_rate: Option<Decimal>,
    /// Rounded to two decimals. Absent for delivery notes.
    pub totals: Option<Totals>,
    pub payment: Option<PaymentInfo>,
}

impl FinalizedDocument {
    fn base<D: Document>(doc: &D, client: Option<&Client>) -> Self {
        Self {
            kind: D::KIND,
            number: doc.number().to_string(),
            status: doc.status().as_str().to_string(),
            date: None,
            due_date: None,
            valid_until: None,
            client: client.map(PartyInfo::from),
            delivery_address: None,
            description: None,
            terms: None,
            lead_time: None,
            notes: None,
            reference: None,
            lines: Vec::new(),
            tax_rate: None,
            totals: None,
            payment: None,
        }
    }

    pub fn from_quote(quote: &Quote, client: Option<&Client>) -> Self {
        let details = quote.details();
        Self {
            date: quote.date(),
            valid_until: quote.valid_until(),
            description: details.description.clone(),
            terms: details.terms.clone(),
            lead_time: details.lead_time.clone(),
            notes: details.notes.clone(),
            lines: quote.lines().iter().map(FinalizedLine::priced).collect(),
            tax_rate: Some(quote.tax_rate()),
            totals: Some(quote.totals().rounded()),
            ..Self::base(quote, client)
        }
    }

    pub fn from_invoice(invoice: &Invoice, client: Option<&Client>) -> Self {
        Self {
            date: invoice.date(),
            due_date: invoice.due_date(),
            description: invoice.description().map(str::to_owned),
            reference: invoice.purchase_order_number().map(str::to_owned),
            lines: invoice.lines().iter().map(FinalizedLine::priced).collect(),
            tax_rate: Some(invoice.tax_rate()),
            totals: Some(invoice.totals().rounded()),
            payment: invoice.payment().map(|p| PaymentInfo {
                method: p.method,
                paid_on: p.paid_on,
                reference: p.reference.clone(),
            }),
            ..Self::base(invoice, client)
        }
    }

    /// Name and address come from the note itself, as captured at issue time.
    pub fn from_delivery_note(note: &DeliveryNote, client: Option<&Client>) -> Self {
        let mut party = client.map(PartyInfo::from).unwrap_or(PartyInfo {
            name: note.client_name().to_string(),
            email: None,
            phone: None,
            address: None,
        });
        party.name = note.client_name().to_string();
        party.address = note.delivery_address().map(str::to_owned);

        Self {
            date: note.date(),
            client: Some(party),
            delivery_address: note.delivery_address().map(str::to_owned),
            lines: note
                .items()
                .iter()
                .map(|i| FinalizedLine {
                    description: i.description.clone(),
                    quantity: i.quantity,
                    unit_price: None,
                    line_total: None,
                })
                .collect(),
            ..Self::base(note, client)
        }
    }

    pub fn from_job_card(card: &JobCard, client: Option<&Client>) -> Self {
        let work = card.work();
        let lines = job_card_lines(card.lines());
        Self {
            date: card.received_on(),
            description: work.diagnosis.clone(),
            notes: work.recommended_work.clone(),
            lines: lines.iter().map(FinalizedLine::priced).collect(),
            tax_rate: Some(work.tax_rate),
            totals: Some(Totals::compute(&lines, work.tax_rate).rounded()),
            ..Self::base(card, client)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
}

/// Presentation choices the renderer applies; the engine does not interpret
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutDescriptor {
    pub template: String,
    pub paper: PaperSize,
    pub accent_color: Option<String>,
    pub logo_path: Option<String>,
    pub footer: Option<String>,
}

impl Default for LayoutDescriptor {
    fn default() -> Self {
        Self {
            template: "standard".to_string(),
            paper: PaperSize::default(),
            accent_color: None,
            logo_path: None,
            footer: None,
        }
    }
}

/// Rendering/export collaborator.
pub trait Renderer {
    type Output;
    type Error: core::fmt::Debug;

    fn render(
        &self,
        document: &FinalizedDocument,
        layout: &LayoutDescriptor,
    ) -> Result<Self::Output, Self::Error>;
}

/// Renders to a JSON object `{ "layout": …, "document": … }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    type Output = serde_json::Value;
    type Error = serde_json::Error;

    fn render(
        &self,
        document: &FinalizedDocument,
        layout: &LayoutDescriptor,
    ) -> Result<Self::Output, Self::Error> {
        Ok(serde_json::json!({
            "layout": serde_json::to_value(layout)?,
            "document": serde_json::to_value(document)?,
        }))
    }
}

impl<S, N> DocumentService<S, N>
where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
{
    /// Resolve a stored document into its export view.
    pub fn finalize<C>(
        &self,
        ctx: &RequestContext,
        document: DocumentRef,
        clients: &C,
    ) -> Result<FinalizedDocument, EngineError>
    where
        C: ClientDirectory + ?Sized,
    {
        let lookup = |client_id: Option<docflow_core::ClientId>| {
            client_id.and_then(|id| clients.get(ctx.tenant_id(), id))
        };

        Ok(match document.kind {
            DocumentKind::Quote => {
                let quote: Quote = self.get(ctx, document.id)?;
                FinalizedDocument::from_quote(&quote, lookup(quote.client_id()).as_ref())
            }
            DocumentKind::Invoice => {
                let invoice: Invoice = self.get(ctx, document.id)?;
                FinalizedDocument::from_invoice(&invoice, lookup(invoice.client_id()).as_ref())
            }
            DocumentKind::DeliveryNote => {
                let note: DeliveryNote = self.get(ctx, document.id)?;
                FinalizedDocument::from_delivery_note(&note, lookup(note.client_id()).as_ref())
            }
            DocumentKind::JobCard => {
                let card: JobCard = self.get(ctx, document.id)?;
                FinalizedDocument::from_job_card(&card, lookup(card.client_id()).as_ref())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryClientDirectory;
    use crate::testing::*;
    use docflow_quotes::{QuoteCommand, QuoteDetails, UpdateQuote};

    #[test]
    fn export_view_carries_rounded_totals_and_no_cost() {
        let (svc, ctx) = setup();
        let clients = InMemoryClientDirectory::new();
        let client = Client::new("Acme").with_address("1 Main St");
        clients.upsert(ctx.tenant_id(), client.clone());

        let third = LineItem::new("Consulting", "1".parse().unwrap(), "33.333".parse().unwrap(), "10".parse().unwrap())
            .unwrap();
        let quote = draft_quote(&svc, &ctx, client.id, vec![widget_line(), third]);

        let view = svc
            .finalize(&ctx, DocumentRef::quote(quote.id_typed()), &clients)
            .unwrap();
        assert_eq!(view.number, "Q-0001");
        assert_eq!(view.client.as_ref().map(|c| c.name.as_str()), Some("Acme"));

        let totals = view.totals.unwrap();
        assert_eq!(totals.subtotal, "233.33".parse::<Decimal>().unwrap());
        assert_eq!(totals.tax, "35.00".parse::<Decimal>().unwrap());
        assert_eq!(totals.total, "268.33".parse::<Decimal>().unwrap());

        let rendered = JsonRenderer.render(&view, &LayoutDescriptor::default()).unwrap();
        let text = rendered.to_string().to_lowercase();
        assert!(!text.contains("cost"));
        assert!(!text.contains("margin"));
        assert_eq!(rendered["layout"]["template"], "standard");
    }

    #[test]
    fn quote_view_carries_lead_time() {
        let (svc, ctx) = setup();
        let quote = draft_quote(&svc, &ctx, docflow_core::ClientId::new(), vec![widget_line()]);
        svc.execute::<Quote>(
            &ctx,
            quote.id_typed(),
            &QuoteCommand::UpdateQuote(UpdateQuote {
                tenant_id: ctx.tenant_id(),
                quote_id: quote.id_typed(),
                client_id: quote.client_id(),
                date: date(2024, 1, 2),
                valid_until: date(2024, 2, 1),
                tax_rate: quote.tax_rate(),
                lines: quote.lines().to_vec(),
                details: QuoteDetails {
                    lead_time: Some("3 days".to_string()),
                    ..quote.details().clone()
                },
                occurred_at: chrono::Utc::now(),
            }),
        )
        .unwrap();

        let view = svc
            .finalize(&ctx, DocumentRef::quote(quote.id_typed()), &InMemoryClientDirectory::new())
            .unwrap();
        assert_eq!(view.lead_time.as_deref(), Some("3 days"));
        let rendered = JsonRenderer.render(&view, &LayoutDescriptor::default()).unwrap();
        assert_eq!(rendered["document"]["leadTime"], "3 days");
    }

    #[test]
    fn delivery_note_view_has_no_prices() {
        let (svc, ctx) = setup();
        let clients = InMemoryClientDirectory::new();
        let client = Client::new("Acme").with_address("1 Main St");
        clients.upsert(ctx.tenant_id(), client.clone());
        let invoice = draft_invoice(&svc, &ctx, client.id, vec![widget_line()]);
        let note = svc
            .convert_invoice_to_delivery_note(&ctx, invoice.id_typed(), &clients, date(2024, 2, 2))
            .unwrap();

        let view = svc
            .finalize(&ctx, DocumentRef::new(DocumentKind::DeliveryNote, note.id_typed()), &clients)
            .unwrap();
        assert!(view.totals.is_none());
        assert_eq!(view.delivery_address.as_deref(), Some("1 Main St"));
        assert!(view.lines.iter().all(|l| l.unit_price.is_none()));
    }
}
