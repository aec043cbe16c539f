//! Configuration management for afeflow.
//!
//! Settings load from a TOML file with serde defaults, after `.env` has
//! been applied by the binary. Environment variables override the database
//! location and the extraction backend endpoint.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::ExtractionBackendConfig;
use crate::models::Actor;
use crate::repository::DbContext;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILE: &str = "afeflow.toml";

/// An API key mapped to an actor identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub actor_id: String,
    pub org_id: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3050
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory for the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database file path. Defaults to `<data_dir>/afeflow.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Organization used by CLI commands and seed fixtures.
    #[serde(default = "default_org_id")]
    pub default_org_id: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extraction: ExtractionBackendConfig,
    /// API keys accepted by the HTTP entrypoints.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("afeflow")
}

fn default_org_id() -> String {
    "default".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: None,
            default_org_id: default_org_id(),
            server: ServerConfig::default(),
            extraction: ExtractionBackendConfig::default(),
            api_keys: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or from `afeflow.toml` in the
    /// working directory, falling back to defaults. Environment variables
    /// `AFEFLOW_DATABASE` and `AFEFLOW_EXTRACTION_ENDPOINT` override.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw)?
            }
            None => {
                let default_path = Path::new(SETTINGS_FILE);
                if default_path.exists() {
                    let raw = std::fs::read_to_string(default_path)?;
                    toml::from_str(&raw)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(db) = std::env::var("AFEFLOW_DATABASE") {
            settings.database_path = Some(PathBuf::from(db));
        }
        if let Ok(endpoint) = std::env::var("AFEFLOW_EXTRACTION_ENDPOINT") {
            settings.extraction.endpoint = endpoint;
        }

        Ok(settings)
    }

    /// Resolved database file path.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("afeflow.db"))
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        if let Some(parent) = self.database_path().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Create a database context for the configured database.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_sqlite_path(&self.database_path())
    }

    /// Resolve a presented API key to an actor identity.
    pub fn resolve_api_key(&self, key: &str) -> Option<Actor> {
        self.api_keys
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| Actor::new(entry.actor_id.clone(), entry.org_id.clone()))
    }

    /// Actor identity used by local CLI commands.
    pub fn cli_actor(&self) -> Actor {
        Actor::new("cli", self.default_org_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_toml() {
        let settings: Settings = toml::from_str(
            r#"
            default_org_id = "permian-ops"

            [server]
            port = 8080

            [extraction]
            model = "llama3.1:70b"

            [[api_keys]]
            key = "secret-1"
            actor_id = "user-7"
            org_id = "permian-ops"
            "#,
        )
        .unwrap();

        assert_eq!(settings.default_org_id, "permian-ops");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.extraction.model, "llama3.1:70b");

        let actor = settings.resolve_api_key("secret-1").unwrap();
        assert_eq!(actor.id, "user-7");
        assert_eq!(actor.org_id, "permian-ops");
        assert!(settings.resolve_api_key("wrong").is_none());
    }

    #[test]
    fn test_database_path_defaults_under_data_dir() {
        let settings = Settings {
            data_dir: PathBuf::from("/tmp/afeflow-test"),
            ..Default::default()
        };
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/tmp/afeflow-test/afeflow.db")
        );
    }
}
