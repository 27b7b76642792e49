//! Document events and the notification boundary.
//!
//! Domain crates emit typed events implementing [`Event`]. The orchestration
//! layer turns status-changing events into [`StatusChanged`] notifications and
//! hands them to a [`Notifier`], fire-and-forget.

pub mod event;
pub mod in_memory;
pub mod notification;
pub mod notifier;

pub use event::Event;
pub use in_memory::{InMemoryNotifier, InMemoryNotifierError};
pub use notification::StatusChanged;
pub use notifier::{Notifier, Subscription};
