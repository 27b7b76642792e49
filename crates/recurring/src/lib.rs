//! Recurring document schedules.
//!
//! A schedule freezes a template from an existing quote or invoice and tells
//! the scheduler when the next copy is due. Pure data and date arithmetic; the
//! scheduler loop lives in `docflow-infra`.

pub mod frequency;
pub mod schedule;

pub use frequency::Frequency;
pub use schedule::{DocumentTemplate, RecurringSchedule};
