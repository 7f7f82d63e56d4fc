//! Mowdeck configuration.
//!
//! Loaded from `config.toml` in the storage root (`~/.mowdeck/` unless
//! `MOWDECK_HOME` is set). The file must exist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::route::client::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_PROFILE, DEFAULT_ROUTING_URL, DEFAULT_TIMEOUT,
};
use crate::storage::Storage;

/// Mowdeck configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The machine this device tracks.
    pub machine_id: String,

    /// Hosted backend. Without it every write stays queued.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RoutingConfig {
    pub url: String,
    pub profile: String,
    pub timeout_secs: u64,
    pub cache_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ROUTING_URL.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl RoutingConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the storage root.
    /// Returns an error if the file is missing or invalid.
    pub fn load() -> Result<Self, String> {
        let path = Self::path().ok_or("could not determine home directory")?;

        if !path.exists() {
            return Err(format!(
                "no config file found at {}\n\
                 Create one with at minimum:\n\n\
                 machine-id = \"your-machine-id\"",
                path.display()
            ));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        Self::parse(&contents, &path)
    }

    /// The config file path: `<storage root>/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Storage::default_root().map(|root| root.join("config.toml"))
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.machine_id.trim().is_empty() {
            return Err(format!(
                "machine-id is empty in {}\n\
                 Set it to the id of the machine this device tracks.",
                path.display()
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<Config, String> {
        Config::parse(contents, Path::new("config.toml"))
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("machine-id = \"xrot-01\"").unwrap();

        assert_eq!(config.machine_id, "xrot-01");
        assert!(config.remote.is_none());
        assert_eq!(config.routing.url, DEFAULT_ROUTING_URL);
        assert_eq!(config.routing.profile, "driving");
        assert_eq!(config.routing.timeout(), Duration::from_secs(5));
        assert_eq!(config.routing.cache_capacity, 200);
    }

    #[test]
    fn full_config() {
        let config = parse(
            r#"
            machine-id = "xrot-01"

            [remote]
            url = "https://project.supabase.co"
            api-key = "secret"

            [routing]
            url = "http://localhost:5000"
            cache-capacity = 50
            "#,
        )
        .unwrap();

        let remote = config.remote.unwrap();
        assert_eq!(remote.url, "https://project.supabase.co");
        assert_eq!(remote.api_key, "secret");
        assert_eq!(config.routing.url, "http://localhost:5000");
        assert_eq!(config.routing.cache_capacity, 50);
        assert_eq!(config.routing.timeout_secs, 5);
    }

    #[test]
    fn empty_machine_id_is_rejected() {
        let err = parse("machine-id = \"  \"").unwrap_err();
        assert!(err.contains("machine-id is empty"));
    }

    #[test]
    fn missing_machine_id_is_invalid() {
        let err = parse("[routing]\nprofile = \"foot\"").unwrap_err();
        assert!(err.starts_with("invalid config"));
    }
}
