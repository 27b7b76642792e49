use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{
    Aggregate, AggregateRoot, ClientId, Document, DocumentId, DocumentKind, DocumentRef,
    DomainError, Status, TenantId, TransitionTable,
};
use docflow_events::Event;
use docflow_pricing::{CostSummary, LineItem, Totals, validate_line_count, validate_tax_rate};

/// Workshop job card status, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCardStatus {
    Received,
    Diagnosing,
    Diagnosed,
    Quoted,
    Approved,
    InProgress,
    AwaitingParts,
    QualityCheck,
    Completed,
    Invoiced,
    Collected,
}

impl Status for JobCardStatus {
    fn as_str(&self) -> &'static str {
        match self {
            JobCardStatus::Received => "received",
            JobCardStatus::Diagnosing => "diagnosing",
            JobCardStatus::Diagnosed => "diagnosed",
            JobCardStatus::Quoted => "quoted",
            JobCardStatus::Approved => "approved",
            JobCardStatus::InProgress => "in_progress",
            JobCardStatus::AwaitingParts => "awaiting_parts",
            JobCardStatus::QualityCheck => "quality_check",
            JobCardStatus::Completed => "completed",
            JobCardStatus::Invoiced => "invoiced",
            JobCardStatus::Collected => "collected",
        }
    }
}

/// Strictly ordered workflow. The only lateral move is the
/// `in_progress ↔ awaiting_parts` loop; work resumes from `awaiting_parts`
/// back into `in_progress` before it can reach `quality_check`.
pub const JOB_CARD_TRANSITIONS: TransitionTable<JobCardStatus> = TransitionTable::new(
    DocumentKind::JobCard,
    &[
        (JobCardStatus::Received, &[JobCardStatus::Diagnosing]),
        (JobCardStatus::Diagnosing, &[JobCardStatus::Diagnosed]),
        (JobCardStatus::Diagnosed, &[JobCardStatus::Quoted]),
        (JobCardStatus::Quoted, &[JobCardStatus::Approved]),
        (JobCardStatus::Approved, &[JobCardStatus::InProgress]),
        (
            JobCardStatus::InProgress,
            &[JobCardStatus::AwaitingParts, JobCardStatus::QualityCheck],
        ),
        (JobCardStatus::AwaitingParts, &[JobCardStatus::InProgress]),
        (JobCardStatus::QualityCheck, &[JobCardStatus::Completed]),
        (JobCardStatus::Completed, &[JobCardStatus::Invoiced]),
        (JobCardStatus::Invoiced, &[JobCardStatus::Collected]),
    ],
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// The vehicle or asset being worked on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub description: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub registration: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Labour,
    Part,
}

/// A job card line: a priced line item tagged as labour or part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCardLine {
    pub item_type: ItemType,
    pub part_number: Option<String>,
    pub item: LineItem,
}

impl JobCardLine {
    pub fn labour(item: LineItem) -> Self {
        Self {
            item_type: ItemType::Labour,
            part_number: None,
            item,
        }
    }

    pub fn part(item: LineItem, part_number: Option<String>) -> Self {
        Self {
            item_type: ItemType::Part,
            part_number,
            item,
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        self.item.validate()?;
        if self.item_type == ItemType::Labour && self.part_number.is_some() {
            return Err(DomainError::validation(
                "labour lines cannot carry a part number",
            ));
        }
        Ok(())
    }
}

/// Work description and priced lines; editable until the job is completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDetails {
    pub diagnosis: Option<String>,
    pub recommended_work: Option<String>,
    pub lines: Vec<JobCardLine>,
    pub tax_rate: Decimal,
}

/// Aggregate root: JobCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCard {
    id: DocumentId,
    tenant_id: Option<TenantId>,
    number: String,
    client_id: Option<ClientId>,
    received_on: Option<NaiveDate>,
    asset: Asset,
    priority: Priority,
    status: JobCardStatus,
    work: WorkDetails,
    version: u64,
    created: bool,
}

impl JobCard {
    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn received_on(&self) -> Option<NaiveDate> {
        self.received_on
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn work(&self) -> &WorkDetails {
        &self.work
    }

    pub fn lines(&self) -> &[JobCardLine] {
        &self.work.lines
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.work.lines.iter().map(|l| l.item.clone()).collect()
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.line_items(), self.work.tax_rate)
    }

    pub fn cost_summary(&self) -> CostSummary {
        CostSummary::compute(&self.line_items())
    }

    /// Work may be edited until the job reaches `completed`.
    pub fn is_work_editable(&self) -> bool {
        self.status < JobCardStatus::Completed
    }

    /// A quote can be raised once diagnosis has started.
    pub fn can_raise_quote(&self) -> bool {
        self.status >= JobCardStatus::Diagnosing
    }

    pub fn can_raise_invoice(&self) -> bool {
        self.status == JobCardStatus::Completed
    }
}

impl AggregateRoot for JobCard {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for JobCard {
    const KIND: DocumentKind = DocumentKind::JobCard;

    type Status = JobCardStatus;

    fn empty(id: DocumentId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: String::new(),
            client_id: None,
            received_on: None,
            asset: Asset::default(),
            priority: Priority::default(),
            status: JobCardStatus::Received,
            work: WorkDetails::default(),
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

    fn status(&self) -> JobCardStatus {
        self.status
    }

    fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    fn source(&self) -> Option<DocumentRef> {
        None
    }

    fn is_deletable(&self) -> bool {
        self.created && self.status == JobCardStatus::Received
    }
}

/// Command: OpenJobCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenJobCard {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub number: String,
    pub client_id: Option<ClientId>,
    pub received_on: NaiveDate,
    pub asset: Asset,
    pub priority: Priority,
    pub work: WorkDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateWork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWork {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub priority: Priority,
    pub work: WorkDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdvanceJobCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceJobCard {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub to: JobCardStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCardCommand {
    OpenJobCard(OpenJobCard),
    UpdateWork(UpdateWork),
    Advance(AdvanceJobCard),
}

/// Event: JobCardOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCardOpened {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub number: String,
    pub client_id: ClientId,
    pub received_on: NaiveDate,
    pub asset: Asset,
    pub priority: Priority,
    pub work: WorkDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUpdated {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub priority: Priority,
    pub work: WorkDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobCardAdvanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCardAdvanced {
    pub tenant_id: TenantId,
    pub job_card_id: DocumentId,
    pub from: JobCardStatus,
    pub to: JobCardStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCardEvent {
    JobCardOpened(JobCardOpened),
    WorkUpdated(WorkUpdated),
    JobCardAdvanced(JobCardAdvanced),
}

impl Event for JobCardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            JobCardEvent::JobCardOpened(_) => "jobcards.job_card.opened",
            JobCardEvent::WorkUpdated(_) => "jobcards.job_card.work_updated",
            JobCardEvent::JobCardAdvanced(_) => "jobcards.job_card.advanced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JobCardEvent::JobCardOpened(e) => e.occurred_at,
            JobCardEvent::WorkUpdated(e) => e.occurred_at,
            JobCardEvent::JobCardAdvanced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for JobCard {
    type Command = JobCardCommand;
    type Event = JobCardEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            JobCardEvent::JobCardOpened(e) => {
                self.id = e.job_card_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = e.number.clone();
                self.client_id = Some(e.client_id);
                self.received_on = Some(e.received_on);
                self.asset = e.asset.clone();
                self.priority = e.priority;
                self.work = e.work.clone();
                self.status = JobCardStatus::Received;
                self.created = true;
            }
            JobCardEvent::WorkUpdated(e) => {
                self.priority = e.priority;
                self.work = e.work.clone();
            }
            JobCardEvent::JobCardAdvanced(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            JobCardCommand::OpenJobCard(cmd) => self.handle_open(cmd),
            JobCardCommand::UpdateWork(cmd) => self.handle_update_work(cmd),
            JobCardCommand::Advance(cmd) => self.handle_advance(cmd),
        }
    }
}

fn validate_work(work: &WorkDetails) -> Result<(), DomainError> {
    validate_tax_rate(work.tax_rate)?;
    validate_line_count(work.lines.len())?;
    work.lines.iter().try_for_each(JobCardLine::validate)
}

impl JobCard {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        match self.tenant_id {
            None => Err(DomainError::not_found(format!("job card {}", self.id))),
            Some(t) if t == tenant_id => Ok(()),
            Some(_) => Err(DomainError::tenant_isolation(
                "job card belongs to another tenant",
            )),
        }
    }

    fn ensure_job_card_id(&self, job_card_id: DocumentId) -> Result<(), DomainError> {
        if self.id != job_card_id {
            return Err(DomainError::invariant("job_card_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenJobCard) -> Result<Vec<JobCardEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("job card already exists"));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("job card number is required"));
        }
        let client_id = cmd
            .client_id
            .ok_or_else(|| DomainError::validation("job card requires a client"))?;
        validate_work(&cmd.work)?;

        Ok(vec![JobCardEvent::JobCardOpened(JobCardOpened {
            tenant_id: cmd.tenant_id,
            job_card_id: cmd.job_card_id,
            number: cmd.number.clone(),
            client_id,
            received_on: cmd.received_on,
            asset: cmd.asset.clone(),
            priority: cmd.priority,
            work: cmd.work.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_work(&self, cmd: &UpdateWork) -> Result<Vec<JobCardEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_job_card_id(cmd.job_card_id)?;
        if !self.is_work_editable() {
            return Err(DomainError::invariant(format!(
                "cannot modify job card work once {}",
                self.status.as_str()
            )));
        }
        validate_work(&cmd.work)?;

        Ok(vec![JobCardEvent::WorkUpdated(WorkUpdated {
            tenant_id: cmd.tenant_id,
            job_card_id: cmd.job_card_id,
            priority: cmd.priority,
            work: cmd.work.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_advance(&self, cmd: &AdvanceJobCard) -> Result<Vec<JobCardEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_job_card_id(cmd.job_card_id)?;
        JOB_CARD_TRANSITIONS.check(self.id, self.status, cmd.to)?;

        Ok(vec![JobCardEvent::JobCardAdvanced(JobCardAdvanced {
            tenant_id: cmd.tenant_id,
            job_card_id: cmd.job_card_id,
            from: self.status,
            to: cmd.to,
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

    fn opened() -> (JobCard, TenantId, DocumentId) {
        let tenant_id = TenantId::new();
        let id = DocumentId::new();
        let mut card = JobCard::empty(id);
        execute(
            &mut card,
            &JobCardCommand::OpenJobCard(OpenJobCard {
                tenant_id,
                job_card_id: id,
                number: "JC-0001".to_string(),
                client_id: Some(ClientId::new()),
                received_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                asset: Asset {
                    registration: Some("CA 123-456".to_string()),
                    ..Asset::default()
                },
                priority: Priority::High,
                work: WorkDetails {
                    tax_rate: d("15"),
                    lines: vec![
                        JobCardLine::labour(
                            LineItem::new("Brake service", d("2"), d("450"), d("0")).unwrap(),
                        ),
                        JobCardLine::part(
                            LineItem::new("Brake pads", d("1"), d("600"), d("380")).unwrap(),
                            Some("BP-221".to_string()),
                        ),
                    ],
                    ..WorkDetails::default()
                },
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (card, tenant_id, id)
    }

    fn advance(tenant_id: TenantId, id: DocumentId, to: JobCardStatus) -> JobCardCommand {
        JobCardCommand::Advance(AdvanceJobCard {
            tenant_id,
            job_card_id: id,
            to,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn skipping_from_received_to_completed_is_a_transition_error() {
        let (card, tenant_id, id) = opened();
        let err = card
            .handle(&advance(tenant_id, id, JobCardStatus::Completed))
            .unwrap_err();
        match err {
            DomainError::Transition(t) => {
                assert_eq!(t.from, "received");
                assert_eq!(t.to, "completed");
                assert_eq!(t.kind, DocumentKind::JobCard);
            }
            other => panic!("expected transition error, got {other:?}"),
        }
    }

    #[test]
    fn walks_the_full_workflow_with_a_parts_detour() {
        let (mut card, tenant_id, id) = opened();
        for to in [
            JobCardStatus::Diagnosing,
            JobCardStatus::Diagnosed,
            JobCardStatus::Quoted,
            JobCardStatus::Approved,
            JobCardStatus::InProgress,
            JobCardStatus::AwaitingParts,
            JobCardStatus::InProgress,
            JobCardStatus::QualityCheck,
            JobCardStatus::Completed,
            JobCardStatus::Invoiced,
            JobCardStatus::Collected,
        ] {
            execute(&mut card, &advance(tenant_id, id, to)).unwrap();
            assert_eq!(card.status(), to);
        }
        assert!(JOB_CARD_TRANSITIONS.is_terminal(JobCardStatus::Collected));
    }

    #[test]
    fn work_is_locked_once_completed() {
        let (mut card, tenant_id, id) = opened();
        let update = JobCardCommand::UpdateWork(UpdateWork {
            tenant_id,
            job_card_id: id,
            priority: Priority::Normal,
            work: WorkDetails {
                diagnosis: Some("Worn pads".to_string()),
                ..card.work().clone()
            },
            occurred_at: Utc::now(),
        });
        execute(&mut card, &update).unwrap();
        assert_eq!(card.work().diagnosis.as_deref(), Some("Worn pads"));

        for to in [
            JobCardStatus::Diagnosing,
            JobCardStatus::Diagnosed,
            JobCardStatus::Quoted,
            JobCardStatus::Approved,
            JobCardStatus::InProgress,
            JobCardStatus::QualityCheck,
            JobCardStatus::Completed,
        ] {
            execute(&mut card, &advance(tenant_id, id, to)).unwrap();
        }
        assert!(card.can_raise_invoice());
        let err = card.handle(&update).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn labour_lines_cannot_carry_part_numbers() {
        let line = JobCardLine {
            item_type: ItemType::Labour,
            part_number: Some("X".to_string()),
            item: LineItem::new("Fitting", d("1"), d("10"), d("0")).unwrap(),
        };
        assert!(matches!(line.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn totals_cover_labour_and_parts() {
        let (card, _, _) = opened();
        let totals = card.totals().rounded();
        assert_eq!(totals.subtotal, d("1500"));
        assert_eq!(totals.total, d("1725"));
        assert_eq!(card.cost_summary().cost_subtotal, d("380"));
    }
}
