//! Recurring documents: schedule persistence, the `tick` scheduler and its
//! background worker.

pub mod scheduler;
pub mod store;
pub mod worker;

pub use scheduler::{RecurringScheduler, TickReport};
pub use store::{InMemoryScheduleStore, ScheduleStore, ScheduleVersion};
pub use worker::{SchedulerWorker, WorkerHandle};
