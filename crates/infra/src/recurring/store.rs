use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use docflow_core::{ScheduleId, TenantId};
use docflow_recurring::RecurringSchedule;

use crate::store::StoreError;

/// Compare-and-set key for schedule updates.
///
/// A run bumps `run_count`; a stop clears `is_active`. Either one invalidates a
/// concurrent writer's snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScheduleVersion {
    pub run_count: u32,
    pub is_active: bool,
}

impl ScheduleVersion {
    pub fn of(schedule: &RecurringSchedule) -> Self {
        Self {
            run_count: schedule.run_count,
            is_active: schedule.is_active,
        }
    }
}

/// Persistence for recurring schedules.
pub trait ScheduleStore: Send + Sync {
    fn insert(&self, schedule: RecurringSchedule) -> Result<(), StoreError>;

    fn get(
        &self,
        tenant_id: TenantId,
        id: ScheduleId,
    ) -> Result<Option<RecurringSchedule>, StoreError>;

    /// Replace a schedule if it is still at `expected`.
    fn update(
        &self,
        schedule: RecurringSchedule,
        expected: ScheduleVersion,
    ) -> Result<(), StoreError>;

    /// All of a tenant's schedules, active or not, oldest first.
    fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringSchedule>, StoreError>;

    /// Active schedules of every tenant whose next run is at or before `now`.
    fn due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringSchedule>, StoreError>;
}

impl<S> ScheduleStore for Arc<S>
where
    S: ScheduleStore + ?Sized,
{
    fn insert(&self, schedule: RecurringSchedule) -> Result<(), StoreError> {
        (**self).insert(schedule)
    }

    fn get(
        &self,
        tenant_id: TenantId,
        id: ScheduleId,
    ) -> Result<Option<RecurringSchedule>, StoreError> {
        (**self).get(tenant_id, id)
    }

    fn update(
        &self,
        schedule: RecurringSchedule,
        expected: ScheduleVersion,
    ) -> Result<(), StoreError> {
        (**self).update(schedule, expected)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringSchedule>, StoreError> {
        (**self).list(tenant_id)
    }

    fn due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringSchedule>, StoreError> {
        (**self).due(now)
    }
}

/// In-memory schedule store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    inner: RwLock<HashMap<(TenantId, ScheduleId), RecurringSchedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl ScheduleStore for InMemoryScheduleStore {
    fn insert(&self, schedule: RecurringSchedule) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (schedule.tenant_id, schedule.id);
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "schedule {} already exists",
                schedule.id
            )));
        }
        map.insert(key, schedule);
        Ok(())
    }

    fn get(
        &self,
        tenant_id: TenantId,
        id: ScheduleId,
    ) -> Result<Option<RecurringSchedule>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(tenant_id, id)).cloned())
    }

    fn update(
        &self,
        schedule: RecurringSchedule,
        expected: ScheduleVersion,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (schedule.tenant_id, schedule.id);
        let current = map
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("schedule {}", schedule.id)))?;

        let found = ScheduleVersion::of(current);
        if found != expected {
            return Err(StoreError::Conflict(format!(
                "schedule {}: expected {expected:?}, found {found:?}",
                schedule.id
            )));
        }
        map.insert(key, schedule);
        Ok(())
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringSchedule>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut out: Vec<RecurringSchedule> = map
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.created_at, s.id));
        Ok(out)
    }

    fn due(&self, now: DateTime<Utc>) -> Result<Vec<RecurringSchedule>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut out: Vec<RecurringSchedule> =
            map.values().filter(|s| s.is_due(now)).cloned().collect();
        out.sort_by_key(|s| (s.next_run_at, s.id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use docflow_core::{ClientId, DocumentId, DocumentRef, UserId};
    use docflow_pricing::Decimal;
    use docflow_recurring::{DocumentTemplate, Frequency};

    fn schedule(tenant_id: TenantId, first_run: DateTime<Utc>) -> RecurringSchedule {
        RecurringSchedule::new(
            tenant_id,
            DocumentRef::invoice(DocumentId::new()),
            Frequency::Monthly,
            first_run,
            None,
            DocumentTemplate {
                client_id: ClientId::new(),
                tax_rate: Decimal::ZERO,
                lines: Vec::new(),
                description: None,
                terms: None,
                lead_time: None,
                notes: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn due_spans_tenants_and_skips_future_and_stopped() {
        let store = InMemoryScheduleStore::new();
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let a = schedule(TenantId::new(), jan);
        let b = schedule(TenantId::new(), jan);
        let later = schedule(a.tenant_id, mar);
        let mut stopped = schedule(a.tenant_id, jan);
        stopped.stop();
        for s in [&a, &b, &later, &stopped] {
            store.insert(s.clone()).unwrap();
        }

        let due = store
            .due(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
            .unwrap();
        let mut ids: Vec<ScheduleId> = due.iter().map(|s| s.id).collect();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn update_rejects_a_stale_snapshot() {
        let store = InMemoryScheduleStore::new();
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let original = schedule(TenantId::new(), jan);
        store.insert(original.clone()).unwrap();

        let mut stopped = original.clone();
        stopped.stop();
        store
            .update(stopped, ScheduleVersion::of(&original))
            .unwrap();

        let mut ran = original.clone();
        ran.claim_run(jan).unwrap();
        let err = store
            .update(ran, ScheduleVersion::of(&original))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn reads_are_tenant_scoped() {
        let store = InMemoryScheduleStore::new();
        let s = schedule(TenantId::new(), Utc::now());
        store.insert(s.clone()).unwrap();

        assert!(store.get(TenantId::new(), s.id).unwrap().is_none());
        assert_eq!(store.list(s.tenant_id).unwrap().len(), 1);
    }
}
