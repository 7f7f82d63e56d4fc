//! Local persistence for the device.
//!
//! Everything lives in one `SQLite` file under the storage root, as JSON
//! text in a key-value table:
//!
//! ```text
//! <root>/
//!   local.sqlite     # kv(key, value)
//! ```
//!
//! Keys are fixed (see [`keys`]). A value that fails to parse is treated as
//! absent; there is no schema migration.

mod kv;
mod machine;
mod preferences;
mod queue;

use std::{env, fs, io, path::PathBuf};

use rusqlite::Connection;

pub use queue::{MemoryQueueStore, QueueStore};

/// Fixed keys in the local key-value table.
pub mod keys {
    /// Writes waiting to reach the remote store.
    pub const PENDING_SYNC: &str = "pendingSync";
    /// Writes that ran out of retries.
    pub const FAILED_SYNC: &str = "failedSync";
    /// Last confirmed machine state.
    pub const MACHINE_STATE: &str = "machine-state";
    /// Dismissed notification keys.
    pub const DISMISSED_NOTIFICATIONS: &str = "dismissed-notifications";
    /// High-contrast display preference.
    pub const SUN_GLARE: &str = "emanuai-sun-glare";
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage.
///
/// Holds only the database path; each operation opens its own connection,
/// so a `Storage` can be cloned and shared freely.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Creates a storage instance rooted at the given directory.
    ///
    /// The directory and database are created if they don't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let storage = Self {
            path: root.join("local.sqlite"),
        };
        storage.connect()?;
        Ok(storage)
    }

    /// Returns the default storage root: `$MOWDECK_HOME`, else `~/.mowdeck/`.
    pub fn default_root() -> Option<PathBuf> {
        if let Ok(home) = env::var("MOWDECK_HOME")
            && !home.is_empty()
        {
            return Some(PathBuf::from(home));
        }
        dirs::home_dir().map(|h| h.join(".mowdeck"))
    }

    /// Opens a connection, creating the table on first use.
    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(conn)
    }
}
