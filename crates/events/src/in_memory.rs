//! In-memory notifier for tests/dev.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::notifier::{Notifier, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryNotifierError {
    #[error("notifier lock poisoned")]
    Poisoned,
}

/// In-memory fan-out notifier.
///
/// - No IO
/// - Best-effort fan-out; dropped subscribers are pruned on publish
#[derive(Debug)]
pub struct InMemoryNotifier<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryNotifier<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryNotifier<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Notifier<M> for InMemoryNotifier<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryNotifierError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryNotifierError::Poisoned)?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
