//! Raw key-value access.

use rusqlite::OptionalExtension;
use serde::{Serialize, de::DeserializeOwned};

use super::{Result, Storage};

impl Storage {
    /// Reads the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Removes `key`. Idempotent.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Reads and parses a JSON value.
    ///
    /// Malformed JSON reads as `None`: a corrupt value must never block the
    /// device from working.
    pub(super) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                Ok(None)
            }
        }
    }

    /// Serializes `value` as JSON and stores it under `key`.
    pub(super) fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_storage;

    #[test]
    fn get_missing_key_is_none() {
        let (_dir, storage) = test_storage();
        assert_eq!(storage.get("nope").unwrap(), None);
    }

    #[test]
    fn set_overwrites() {
        let (_dir, storage) = test_storage();
        storage.set("k", "one").unwrap();
        storage.set("k", "two").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, storage) = test_storage();
        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn malformed_json_reads_as_none() {
        let (_dir, storage) = test_storage();
        storage.set("k", "{not json").unwrap();
        let value: Option<Vec<String>> = storage.get_json("k").unwrap();
        assert!(value.is_none());
    }
}
