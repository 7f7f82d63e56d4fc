//! Display preferences kept on the device.

use std::collections::BTreeSet;

use super::{Result, Storage, keys};

impl Storage {
    /// Notification keys the technician has dismissed.
    pub fn dismissed_notifications(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .get_json(keys::DISMISSED_NOTIFICATIONS)?
            .unwrap_or_default())
    }

    /// Adds a key to the dismissed set. Returns `false` if it was already there.
    pub fn dismiss_notification(&self, dismiss_key: &str) -> Result<bool> {
        let mut dismissed = self.dismissed_notifications()?;
        let added = dismissed.insert(dismiss_key.to_string());
        if added {
            self.set_json(keys::DISMISSED_NOTIFICATIONS, &dismissed)?;
        }
        Ok(added)
    }

    /// Whether high-contrast sun-glare mode is on. Anything but `"true"` is off.
    pub fn sun_glare(&self) -> Result<bool> {
        Ok(self.get(keys::SUN_GLARE)?.as_deref() == Some("true"))
    }

    pub fn set_sun_glare(&self, on: bool) -> Result<()> {
        self.set(keys::SUN_GLARE, if on { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::tests::test_storage;

    #[test]
    fn dismiss_is_remembered() {
        let (_dir, storage) = test_storage();

        assert!(storage.dismiss_notification("oil_250").unwrap());
        assert!(!storage.dismiss_notification("oil_250").unwrap());

        let dismissed = storage.dismissed_notifications().unwrap();
        assert_eq!(dismissed.len(), 1);
        assert!(dismissed.contains("oil_250"));
    }

    #[test]
    fn malformed_dismissed_set_reads_as_empty() {
        let (_dir, storage) = test_storage();
        storage.set(keys::DISMISSED_NOTIFICATIONS, "oops").unwrap();

        assert!(storage.dismissed_notifications().unwrap().is_empty());
    }

    #[test]
    fn sun_glare_defaults_off() {
        let (_dir, storage) = test_storage();
        assert!(!storage.sun_glare().unwrap());

        storage.set_sun_glare(true).unwrap();
        assert!(storage.sun_glare().unwrap());

        storage.set(keys::SUN_GLARE, "yes").unwrap();
        assert!(!storage.sun_glare().unwrap());
    }
}
