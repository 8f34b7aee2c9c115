//! Settle-once completion signal
//!
//! A package-manager command may report its outcome through a callback, a
//! returned future, or both. [`settle_once`] hands out a cloneable
//! [`Completion`] for every reporting path and a single [`Settled`] receiver:
//! the first outcome wins and every later one is discarded.

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::RegistryResult;

/// Producer side; clone it into every path that may report completion
pub struct Completion<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<RegistryResult<T>>>>>,
}

/// Consumer side; yields the first reported outcome
pub struct Settled<T> {
    receiver: oneshot::Receiver<RegistryResult<T>>,
}

/// Create a connected completion/receiver pair
pub fn settle_once<T>() -> (Completion<T>, Settled<T>) {
    let (sender, receiver) = oneshot::channel();
    let completion = Completion {
        slot: Arc::new(Mutex::new(Some(sender))),
    };
    (completion, Settled { receiver })
}

impl<T> Completion<T> {
    /// Report an outcome. Returns `true` only for the call that settled.
    pub fn settle(&self, outcome: RegistryResult<T>) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(sender) => {
                // A dropped receiver still counts as settled
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub fn reject(&self, error: pkgfetch_core::FetchError) -> bool {
        self.settle(Err(error))
    }

    /// Check if an outcome was already reported
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T> Settled<T> {
    /// Wait for the first outcome.
    ///
    /// Returns `None` when every [`Completion`] was dropped without settling.
    pub async fn wait(self) -> Option<RegistryResult<T>> {
        self.receiver.await.ok()
    }
}
