//! Offline write queue and sync engine.
//!
//! Every mutating action goes through [`SyncEngine::submit_write`]. When the
//! device is online the write is sent straight to the remote store; when it
//! is offline, or the remote call fails, the write is queued locally and
//! replayed by [`SyncEngine::drain_queue`] once connectivity returns.
//!
//! Validation failures are never queued: they come back to the caller as
//! [`SyncError`] immediately. Remote failures are never returned at all:
//! the write is queued and the caller is told it was deferred.
//!
//! Queued writes are replayed one at a time in creation order. A write that
//! fails [`MAX_RETRIES`](crate::model::MAX_RETRIES) drains in a row is moved
//! to the failed list, where it stays until retried or discarded.

mod listeners;
mod validate;

use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use jiff::Timestamp;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{MachineState, MotorHoursUpdate, QueuedWrite, WriteOp};
use crate::remote::{self, Filter, RemoteError, RemoteStore};
use crate::storage::{QueueStore, StorageError};

pub use listeners::ListenerId;
pub use validate::{validate_motor_hours, validate_record};

use listeners::Listeners;

/// Errors returned to the caller of a submit.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("motor-hours cannot go backwards: {attempted} is below the current {current}")]
    MotorHoursRegression { current: f64, attempted: f64 },

    #[error("unknown machine '{requested}' (this device tracks '{tracked}')")]
    UnknownMachine { requested: String, tracked: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("failed to persist write queue: {0}")]
    Storage(#[from] StorageError),
}

/// What happened to a submitted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The remote store accepted the write.
    Applied,

    /// The write was queued for a later drain.
    Queued(Uuid),
}

impl Submission {
    pub fn applied_immediately(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Summary of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Writes the remote store accepted.
    pub succeeded: usize,

    /// Writes that failed but stay queued for another attempt.
    pub retrying: usize,

    /// Writes moved to the failed list: out of retries, or no longer valid.
    pub failed: usize,
}

/// Why a replay didn't go through.
enum ReplayError {
    /// The write broke a business rule; retrying can't help.
    Invalid(SyncError),
    Remote(RemoteError),
}

/// The offline-first write path for one machine.
pub struct SyncEngine<S, R> {
    store: S,
    remote: R,

    /// Last state the remote store confirmed.
    machine: Mutex<MachineState>,

    online: AtomicBool,
    draining: AtomicBool,

    /// Serializes load-modify-save cycles on the store.
    queue_lock: Mutex<()>,

    depth_listeners: Listeners<usize>,
    drain_listeners: Listeners<DrainReport>,
}

impl<S: QueueStore, R: RemoteStore> SyncEngine<S, R> {
    /// Creates an engine that starts out online.
    pub fn new(store: S, remote: R, machine: MachineState) -> Self {
        Self {
            store,
            remote,
            machine: Mutex::new(machine),
            online: AtomicBool::new(true),
            draining: AtomicBool::new(false),
            queue_lock: Mutex::new(()),
            depth_listeners: Listeners::new(),
            drain_listeners: Listeners::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a connectivity change. Going from offline to online drains
    /// the queue and returns the report.
    pub fn set_online(&self, online: bool) -> Option<DrainReport> {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            info!("connection restored");
            Some(self.drain_queue())
        } else {
            None
        }
    }

    /// Snapshot of the last confirmed machine state.
    pub fn machine_state(&self) -> MachineState {
        self.lock_machine().clone()
    }

    /// The value a new motor-hours reading is checked against: the highest
    /// of the confirmed value and every reading still queued.
    pub fn current_motor_hours(&self) -> Result<f64, StorageError> {
        let machine = self.lock_machine();
        self.known_motor_hours(&machine)
    }

    // ── Submission ──

    /// Submits a write, applying it now if possible and queuing it otherwise.
    pub fn submit_write(&self, op: WriteOp) -> Result<Submission, SyncError> {
        match op {
            WriteOp::ServiceRecord(ref row) | WriteOp::OperationRecord(ref row) => {
                validate_record(row)?;
                if self.is_online() {
                    match self.apply(&op) {
                        Ok(()) => return Ok(Submission::Applied),
                        Err(e) => warn!(kind = op.kind().label(), error = %e, "write failed, queuing"),
                    }
                }
                self.enqueue(op)
            }
            WriteOp::MotorHours(ref update) => {
                let mut machine = self.lock_machine();
                if update.machine_id != machine.machine_id {
                    return Err(SyncError::UnknownMachine {
                        requested: update.machine_id.clone(),
                        tracked: machine.machine_id.clone(),
                    });
                }
                validate_motor_hours(self.known_motor_hours(&machine)?, update.new_mth)?;

                // Earlier readings still queued must land first.
                if self.is_online() && !self.has_pending_motor_hours()? {
                    match self.apply(&op) {
                        Ok(()) => {
                            confirm(&mut machine, update);
                            return Ok(Submission::Applied);
                        }
                        Err(e) => warn!(error = %e, "motor-hours update failed, queuing"),
                    }
                }
                self.enqueue(op)
            }
        }
    }

    /// Records a new motor-hours reading for the tracked machine.
    pub fn submit_motor_hours_update(
        &self,
        machine_id: &str,
        new_value: f64,
    ) -> Result<Submission, SyncError> {
        self.submit_write(WriteOp::MotorHours(MotorHoursUpdate {
            machine_id: machine_id.to_string(),
            new_mth: new_value,
            timestamp: Timestamp::now(),
        }))
    }

    // ── Drain ──

    /// Replays every queued write, oldest first, one at a time.
    ///
    /// Never fails: per-write errors are logged and counted. A drain started
    /// while another is running returns an empty report without doing
    /// anything.
    pub fn drain_queue(&self) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("drain already running");
            return DrainReport::default();
        }
        let _running = ClearOnDrop(&self.draining);

        let items = match self.store.load() {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "failed to load write queue");
                return DrainReport::default();
            }
        };
        if !items.is_empty() {
            info!(count = items.len(), "draining write queue");
        }

        let mut report = DrainReport::default();
        for item in items {
            match self.replay(&item) {
                Ok(()) => {
                    self.remove_pending(item.id);
                    report.succeeded += 1;
                }
                Err(ReplayError::Invalid(e)) => {
                    warn!(id = %item.id, error = %e, "queued write is no longer valid");
                    if self.move_to_failed(item.id) {
                        report.failed += 1;
                    } else {
                        report.retrying += 1;
                    }
                }
                Err(ReplayError::Remote(e)) => {
                    warn!(id = %item.id, retries = item.retries, error = %e, "sync failed");
                    if self.record_failure(item.id) {
                        report.retrying += 1;
                    } else {
                        warn!(id = %item.id, "out of retries, moving to failed list");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            retrying = report.retrying,
            failed = report.failed,
            "drain complete"
        );
        self.drain_listeners.emit(&report);
        report
    }

    // ── Queue inspection ──

    /// Number of writes waiting to be synced. Zero if the store can't be read.
    pub fn pending_count(&self) -> usize {
        match self.store.load() {
            Ok(items) => items.len(),
            Err(e) => {
                warn!(error = %e, "failed to read write queue");
                0
            }
        }
    }

    pub fn pending_items(&self) -> Result<Vec<QueuedWrite>, StorageError> {
        self.store.load()
    }

    /// Writes that were taken out of the queue without reaching the remote.
    pub fn failed_items(&self) -> Result<Vec<QueuedWrite>, StorageError> {
        self.store.load_failed()
    }

    /// Puts a failed write back at the end of the queue with a fresh retry
    /// budget. Returns `false` if no failed write has that id.
    pub fn retry_failed(&self, id: Uuid) -> Result<bool, StorageError> {
        let depth = {
            let _guard = self.lock_queue();
            let mut failed = self.store.load_failed()?;
            let Some(index) = failed.iter().position(|w| w.id == id) else {
                return Ok(false);
            };
            let mut item = failed.remove(index);
            item.retries = 0;

            let mut pending = self.store.load()?;
            pending.push(item);
            self.store.save(&pending)?;
            self.store.save_failed(&failed)?;
            pending.len()
        };
        self.depth_listeners.emit(&depth);
        Ok(true)
    }

    /// Drops a failed write for good. Returns `false` if no failed write has
    /// that id.
    pub fn discard_failed(&self, id: Uuid) -> Result<bool, StorageError> {
        let _guard = self.lock_queue();
        let mut failed = self.store.load_failed()?;
        let before = failed.len();
        failed.retain(|w| w.id != id);
        if failed.len() == before {
            return Ok(false);
        }
        self.store.save_failed(&failed)?;
        Ok(true)
    }

    // ── Notifications ──

    /// Calls `callback` with the new queue depth whenever it changes.
    pub fn on_depth_change(&self, callback: impl Fn(&usize) + Send + Sync + 'static) -> ListenerId {
        self.depth_listeners.add(callback)
    }

    /// Calls `callback` with the report at the end of every drain.
    pub fn on_drain_complete(
        &self,
        callback: impl Fn(&DrainReport) + Send + Sync + 'static,
    ) -> ListenerId {
        self.drain_listeners.add(callback)
    }

    /// Removes a listener registered with either subscription method.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.depth_listeners.remove(id) || self.drain_listeners.remove(id)
    }

    // ── Internals ──

    /// Sends one write to the remote store.
    fn apply(&self, op: &WriteOp) -> remote::Result<()> {
        match op {
            WriteOp::ServiceRecord(row) => self.remote.insert(remote::SERVICE_RECORDS, row),
            WriteOp::OperationRecord(row) => self.remote.insert(remote::OPERATION_RECORDS, row),
            WriteOp::MotorHours(update) => {
                let mut patch = Map::new();
                patch.insert(remote::MACHINE_MTH.into(), Value::from(update.new_mth));
                patch.insert(
                    remote::MACHINE_MTH_UPDATED_AT.into(),
                    Value::from(update.timestamp.to_string()),
                );
                self.remote.update(
                    remote::MACHINES,
                    &Filter::eq("id", &update.machine_id),
                    &patch,
                )
            }
        }
    }

    /// Re-checks a queued write against the current state, then applies it.
    fn replay(&self, item: &QueuedWrite) -> Result<(), ReplayError> {
        match &item.op {
            WriteOp::ServiceRecord(row) | WriteOp::OperationRecord(row) => {
                validate_record(row).map_err(ReplayError::Invalid)?;
                self.apply(&item.op).map_err(ReplayError::Remote)
            }
            WriteOp::MotorHours(update) => {
                let mut machine = self.lock_machine();
                validate_motor_hours(machine.motor_hours, update.new_mth)
                    .map_err(ReplayError::Invalid)?;
                self.apply(&item.op).map_err(ReplayError::Remote)?;
                confirm(&mut machine, update);
                Ok(())
            }
        }
    }

    fn enqueue(&self, op: WriteOp) -> Result<Submission, SyncError> {
        let write = QueuedWrite::new(op);
        let id = write.id;
        debug!(%id, kind = write.op.kind().label(), "queuing write");
        let depth = {
            let _guard = self.lock_queue();
            let mut pending = self.store.load()?;
            pending.push(write);
            self.store.save(&pending)?;
            pending.len()
        };
        self.depth_listeners.emit(&depth);
        Ok(Submission::Queued(id))
    }

    fn remove_pending(&self, id: Uuid) {
        let result = self.update_pending(|pending| {
            pending.retain(|w| w.id != id);
        });
        if let Err(e) = result {
            warn!(%id, error = %e, "failed to remove synced write from queue");
        }
    }

    /// Bumps the retry count of a queued write. Moves it to the failed list
    /// once retries run out. Returns `true` while the write stays queued.
    fn record_failure(&self, id: Uuid) -> bool {
        match self.settle(id, |item| !item.record_failure()) {
            Ok(moved) => !moved,
            Err(e) => {
                warn!(%id, error = %e, "failed to record retry");
                true
            }
        }
    }

    /// Returns `true` once the write is on the failed list.
    fn move_to_failed(&self, id: Uuid) -> bool {
        self.settle(id, |_| true).unwrap_or_else(|e| {
            warn!(%id, error = %e, "failed to move write to failed list");
            false
        })
    }

    /// Updates the pending write `id` with `f`, moving it to the failed list
    /// when `f` returns `true`. Returns whether it moved.
    ///
    /// The failed list is saved before the write leaves the pending list: a
    /// storage error may leave the write on both lists, never on neither.
    fn settle(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut QueuedWrite) -> bool,
    ) -> Result<bool, StorageError> {
        let depth = {
            let _guard = self.lock_queue();
            let mut pending = self.store.load()?;
            let Some(index) = pending.iter().position(|w| w.id == id) else {
                return Ok(false);
            };
            if !f(&mut pending[index]) {
                self.store.save(&pending)?;
                return Ok(false);
            }

            let mut failed = self.store.load_failed()?;
            failed.push(pending[index].clone());
            self.store.save_failed(&failed)?;

            pending.remove(index);
            self.store.save(&pending)?;
            pending.len()
        };
        self.depth_listeners.emit(&depth);
        Ok(true)
    }

    /// Load-modify-save on the pending list, announcing depth changes.
    fn update_pending(&self, f: impl FnOnce(&mut Vec<QueuedWrite>)) -> Result<(), StorageError> {
        let (before, after) = {
            let _guard = self.lock_queue();
            let mut pending = self.store.load()?;
            let before = pending.len();
            f(&mut pending);
            self.store.save(&pending)?;
            (before, pending.len())
        };
        if before != after {
            self.depth_listeners.emit(&after);
        }
        Ok(())
    }

    fn known_motor_hours(&self, machine: &MachineState) -> Result<f64, StorageError> {
        let pending = self.store.load()?;
        Ok(pending
            .iter()
            .filter_map(|w| match &w.op {
                WriteOp::MotorHours(u) if u.machine_id == machine.machine_id => Some(u.new_mth),
                _ => None,
            })
            .fold(machine.motor_hours, f64::max))
    }

    fn has_pending_motor_hours(&self) -> Result<bool, StorageError> {
        Ok(self
            .store
            .load()?
            .iter()
            .any(|w| matches!(w.op, WriteOp::MotorHours(_))))
    }

    fn lock_machine(&self) -> MutexGuard<'_, MachineState> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queue(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Applies a reading the remote accepted. Never lowers the value.
fn confirm(machine: &mut MachineState, update: &MotorHoursUpdate) {
    if update.new_mth >= machine.motor_hours {
        machine.motor_hours = update.new_mth;
        machine.updated_at = Some(update.timestamp);
    }
}

/// Clears the drain flag when the drain ends, however it ends.
struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
