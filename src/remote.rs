//! The remote data store: where service records, operation records and
//! machine rows ultimately live.
//!
//! The sync engine only needs two calls, so that is all [`RemoteStore`]
//! exposes. [`PostgrestStore`] speaks the hosted backend's REST dialect.

mod postgrest;

use serde_json::{Map, Value};

pub use postgrest::PostgrestStore;

/// Table receiving service records.
pub const SERVICE_RECORDS: &str = "servisni_zaznamy";
/// Table receiving operation records.
pub const OPERATION_RECORDS: &str = "provozni_zaznamy";
/// Table holding one row per machine.
pub const MACHINES: &str = "stroje";

/// Column holding a machine's motor-hours.
pub const MACHINE_MTH: &str = "aktualni_mth";
/// Column holding when motor-hours were last updated.
pub const MACHINE_MTH_UPDATED_AT: &str = "datum_posledni_aktualizace_mth";

/// Errors from the remote store. All of them are treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote rejected the write ({status}): {body}")]
    Rejected { status: u16, body: String },
}

pub type Result<T> = core::result::Result<T, RemoteError>;

/// Row selector for updates: `column = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub equals: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, equals: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            equals: equals.into(),
        }
    }
}

/// Request/response access to the hosted backend.
pub trait RemoteStore {
    /// Inserts one row into `table`.
    fn insert(&self, table: &str, row: &Map<String, Value>) -> Result<()>;

    /// Applies `patch` to every row of `table` matching `filter`.
    fn update(&self, table: &str, filter: &Filter, patch: &Map<String, Value>) -> Result<()>;
}

/// Stand-in used when no backend is configured: every call fails, so every
/// write lands in the queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl RemoteStore for Unconfigured {
    fn insert(&self, _table: &str, _row: &Map<String, Value>) -> Result<()> {
        Err(RemoteError::NotConfigured)
    }

    fn update(&self, _table: &str, _filter: &Filter, _patch: &Map<String, Value>) -> Result<()> {
        Err(RemoteError::NotConfigured)
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn insert(&self, table: &str, row: &Map<String, Value>) -> Result<()> {
        (**self).insert(table, row)
    }

    fn update(&self, table: &str, filter: &Filter, patch: &Map<String, Value>) -> Result<()> {
        (**self).update(table, filter, patch)
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    fn insert(&self, table: &str, row: &Map<String, Value>) -> Result<()> {
        (**self).insert(table, row)
    }

    fn update(&self, table: &str, filter: &Filter, patch: &Map<String, Value>) -> Result<()> {
        (**self).update(table, filter, patch)
    }
}
