//! Configuration management

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{FirebaseStore, LedPaths, MemoryStore, RealtimeStore, UnconfiguredStore};

/// Defaults match the paths the ESP32 firmware uses
const DEFAULT_PREFIX: &str = "artifacts/default-app-id/public/data/led_rtdb_control";
const DEFAULT_COMMAND: &str = "command";
const DEFAULT_STATE: &str = "currentLedState";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Firebase,
    /// In-process store with an emulated device (no network)
    Memory,
}

#[derive(Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
    /// e.g. https://<project>-default-rtdb.firebaseio.com
    pub database_url: Option<String>,
    /// Database secret or ID token, sent as the `auth` query parameter
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            database_url: None,
            auth_token: None,
            request_timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_timeout_secs(),
        }
    }
}

// Keep the token out of `?config` logging
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("database_url", &self.database_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_state")]
    pub state: String,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_state() -> String {
    DEFAULT_STATE.to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            command: default_command(),
            state: default_state(),
        }
    }
}

impl Config {
    pub fn led_paths(&self) -> Result<LedPaths> {
        LedPaths::under(&self.paths.prefix, &self.paths.command, &self.paths.state)
            .context("Invalid LED paths in configuration")
    }

    /// Build the configured store backend
    pub fn build_store(&self) -> Result<Arc<dyn RealtimeStore>> {
        match self.store.backend {
            Backend::Firebase => {
                let url = self
                    .store
                    .database_url
                    .as_deref()
                    .context("store.database_url is required for the firebase backend")?;
                let store = FirebaseStore::new(
                    url,
                    self.store.auth_token.clone(),
                    Duration::from_secs(self.store.request_timeout_secs),
                    Duration::from_secs(self.store.connect_timeout_secs),
                )?;
                Ok(Arc::new(store))
            }
            Backend::Memory => Ok(Arc::new(MemoryStore::with_device_echo(self.led_paths()?))),
        }
    }

    /// Like [`Config::build_store`], but a backend that cannot be built is
    /// replaced by an [`UnconfiguredStore`] so the screen can report it
    pub fn build_store_or_unconfigured(&self) -> Arc<dyn RealtimeStore> {
        match self.build_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Store setup failed: {:#}", e);
                Arc::new(UnconfiguredStore::new(format!("{:#}", e)))
            }
        }
    }
}

pub fn get_config_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "electronic-click", "led-remote-control")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration: defaults, then a config file, then `LEDCTL_*` env vars.
///
/// With `file` set the file must exist; otherwise `config.{toml,json,...}`
/// in the platform config directory is used when present.
pub fn load_config(file: Option<&Path>) -> Result<Config> {
    let file_source = match file {
        Some(path) => ::config::File::from(path.to_path_buf()).required(true),
        None => ::config::File::with_name(&get_config_dir().join("config").to_string_lossy())
            .required(false),
    };

    let config = ::config::Config::builder()
        // Start with defaults
        .set_default("port", i64::from(default_port()))?
        .add_source(file_source)
        // Override with environment variables (LEDCTL_PORT, LEDCTL_STORE__DATABASE_URL, etc.)
        .add_source(
            ::config::Environment::with_prefix("LEDCTL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to load configuration")?;

    Ok(config.try_deserialize()?)
}
