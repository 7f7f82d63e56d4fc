//! Queue persistence: the pending and failed write lists.
//!
//! Both lists are stored whole, as JSON arrays, and rewritten on every
//! mutation. Order in the array is creation order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::QueuedWrite;

use super::{Result, Storage, keys};

/// Durable home of the write queue.
///
/// Loading never fails on bad data: a missing or malformed list is empty.
pub trait QueueStore {
    /// Loads pending writes in creation order.
    fn load(&self) -> Result<Vec<QueuedWrite>>;

    /// Replaces the pending list.
    fn save(&self, items: &[QueuedWrite]) -> Result<()>;

    /// Loads writes that exhausted their retries.
    fn load_failed(&self) -> Result<Vec<QueuedWrite>>;

    /// Replaces the failed list.
    fn save_failed(&self, items: &[QueuedWrite]) -> Result<()>;
}

impl QueueStore for Storage {
    fn load(&self) -> Result<Vec<QueuedWrite>> {
        Ok(self.get_json(keys::PENDING_SYNC)?.unwrap_or_default())
    }

    fn save(&self, items: &[QueuedWrite]) -> Result<()> {
        self.set_json(keys::PENDING_SYNC, items)
    }

    fn load_failed(&self) -> Result<Vec<QueuedWrite>> {
        Ok(self.get_json(keys::FAILED_SYNC)?.unwrap_or_default())
    }

    fn save_failed(&self, items: &[QueuedWrite]) -> Result<()> {
        self.set_json(keys::FAILED_SYNC, items)
    }
}

/// In-memory queue store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    pending: Mutex<Vec<QueuedWrite>>,
    failed: Mutex<Vec<QueuedWrite>>,
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> Result<Vec<QueuedWrite>> {
        Ok(lock(&self.pending).clone())
    }

    fn save(&self, items: &[QueuedWrite]) -> Result<()> {
        *lock(&self.pending) = items.to_vec();
        Ok(())
    }

    fn load_failed(&self) -> Result<Vec<QueuedWrite>> {
        Ok(lock(&self.failed).clone())
    }

    fn save_failed(&self, items: &[QueuedWrite]) -> Result<()> {
        *lock(&self.failed) = items.to_vec();
        Ok(())
    }
}

/// Locks a list, recovering from poisoning; the data is plain values.
fn lock(list: &Mutex<Vec<QueuedWrite>>) -> MutexGuard<'_, Vec<QueuedWrite>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}
