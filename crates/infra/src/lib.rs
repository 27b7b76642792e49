//! Orchestration layer: storage boundary, numbering, the document service,
//! conversions, recurring schedules, reporting and export.

pub mod clients;
pub mod config;
pub mod conversion;
pub mod error;
pub mod export;
pub mod numbering;
pub mod recurring;
pub mod reporting;
pub mod service;
pub mod store;

pub use clients::{Client, ClientDirectory, InMemoryClientDirectory};
pub use config::{EngineConfig, NumberingConfig};
pub use error::EngineError;
pub use export::{FinalizedDocument, JsonRenderer, LayoutDescriptor, Renderer};
pub use numbering::NumberingService;
pub use recurring::{InMemoryScheduleStore, RecurringScheduler, SchedulerWorker, TickReport};
pub use reporting::ProfitabilityReport;
pub use service::DocumentService;
pub use store::{DocumentQuery, DocumentStore, InMemoryDocumentStore, StoreError, StoredDocument};

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub(crate) mod testing;
