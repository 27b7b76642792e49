//! Sequential, human-readable document numbers per tenant and kind.
//!
//! Numbers are derived from what is already stored: the highest trailing
//! numeric suffix plus one. Nothing is reserved; two concurrent creators can
//! compute the same number, and the store's uniqueness constraint rejects the
//! second, which recomputes and retries.

use docflow_core::{DocumentKind, TenantId};

use crate::config::NumberingConfig;
use crate::store::{DocumentQuery, DocumentStore, StoreError};

#[derive(Debug, Clone)]
pub struct NumberingService {
    config: NumberingConfig,
}

impl NumberingService {
    pub fn new(config: NumberingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NumberingConfig {
        &self.config
    }

    /// The number the next `kind` document for `tenant_id` should take.
    pub fn next_number<S>(
        &self,
        store: &S,
        tenant_id: TenantId,
        kind: DocumentKind,
    ) -> Result<String, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let existing = store.query(tenant_id, &DocumentQuery::kind(kind))?;
        let max = existing
            .iter()
            .filter_map(|d| trailing_number(&d.number))
            .max()
            .unwrap_or(0);
        Ok(self.format(kind, max.saturating_add(1)))
    }

    pub fn format(&self, kind: DocumentKind, n: u64) -> String {
        format!(
            "{}-{:0width$}",
            self.config.prefix(kind),
            n,
            width = self.config.width
        )
    }
}

/// Trailing run of ASCII digits, e.g. `CASE-0007` → 7. Numbers entered by hand
/// without a numeric suffix are ignored.
pub fn trailing_number(number: &str) -> Option<u64> {
    let digits_start = number
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    number[digits_start..].parse().ok()
}
