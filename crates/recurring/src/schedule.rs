use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{
    ClientId, DocumentId, DocumentKind, DocumentRef, DomainError, ScheduleId, TenantId, UserId,
};
use docflow_pricing::{LineItem, validate_lines, validate_tax_rate};

use crate::frequency::Frequency;

/// Frozen copy of the source document's content, taken when the schedule is
/// created. Later edits to the source do not affect future instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub client_id: ClientId,
    pub tax_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub description: Option<String>,
    pub terms: Option<String>,
    #[serde(default)]
    pub lead_time: Option<String>,
    pub notes: Option<String>,
}

/// A document re-instantiated from a template on a fixed cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: ScheduleId,
    pub tenant_id: TenantId,
    /// The quote or invoice the template was frozen from.
    pub source: DocumentRef,
    pub frequency: Frequency,
    pub is_active: bool,
    pub next_run_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub template: DocumentTemplate,
    pub run_count: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_document_id: Option<DocumentId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl RecurringSchedule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        source: DocumentRef,
        frequency: Frequency,
        first_run_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        template: DocumentTemplate,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !matches!(source.kind, DocumentKind::Quote | DocumentKind::Invoice) {
            return Err(DomainError::validation(format!(
                "a {} cannot be scheduled to recur",
                source.kind
            )));
        }
        frequency.validate()?;
        if ends_at.is_some_and(|end| end < first_run_at) {
            return Err(DomainError::validation(
                "schedule ends_at must not be before its first run",
            ));
        }
        validate_tax_rate(template.tax_rate)?;
        validate_lines(&template.lines)?;

        Ok(Self {
            id: ScheduleId::new(),
            tenant_id,
            source,
            frequency,
            is_active: true,
            next_run_at: first_run_at,
            ends_at,
            template,
            run_count: 0,
            last_run_at: None,
            last_document_id: None,
            created_by,
            created_at,
        })
    }

    /// Kind of document each run produces.
    pub fn target_kind(&self) -> DocumentKind {
        self.source.kind
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.next_run_at <= now
            && self.ends_at.is_none_or(|end| self.next_run_at <= end)
    }

    /// Claim the run due at `next_run_at` and advance it by one unit from its
    /// previous value, not from `ran_at`. Deactivates the schedule once the
    /// next run would fall after `ends_at`.
    pub fn claim_run(&mut self, ran_at: DateTime<Utc>) -> Result<(), DomainError> {
        let next = self.frequency.advance(self.next_run_at).ok_or_else(|| {
            DomainError::invariant(format!(
                "schedule {} cannot advance past {}",
                self.id, self.next_run_at
            ))
        })?;

        self.next_run_at = next;
        self.run_count += 1;
        self.last_run_at = Some(ran_at);
        if self.ends_at.is_some_and(|end| next > end) {
            self.is_active = false;
        }
        Ok(())
    }

    /// Remember the document produced by the last claimed run.
    pub fn record_document(&mut self, document_id: DocumentId) {
        self.last_document_id = Some(document_id);
    }

    /// Stopped schedules are kept as history.
    pub fn stop(&mut self) {
        self.is_active = false;
    }
}
