//! Read-only reports derived from stored documents.

pub mod profitability;

pub use profitability::{
    ClientProfit, InvoiceProfit, MonthlyProfit, ProfitabilityReport, YearMonth,
};

use docflow_core::RequestContext;
use docflow_events::{Notifier, StatusChanged};
use docflow_invoicing::Invoice;

use crate::error::EngineError;
use crate::service::DocumentService;
use crate::store::{DocumentQuery, DocumentStore};

impl<S, N> DocumentService<S, N>
where
    S: DocumentStore,
    N: Notifier<StatusChanged>,
{
    /// Profitability over every invoice of the tenant, whatever its status.
    pub fn profitability(&self, ctx: &RequestContext) -> Result<ProfitabilityReport, EngineError> {
        let invoices: Vec<Invoice> = self.list_documents(ctx, &DocumentQuery::default())?;
        Ok(ProfitabilityReport::from_invoices(&invoices))
    }
}
