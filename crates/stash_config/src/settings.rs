use std::{
    net::{AddrParseError, IpAddr},
    path::PathBuf,
};

use serde::Deserialize;

use crate::validation::{ConfigReport, validate};

/// Config file looked up in the working directory. Missing is fine.
pub const CONFIG_FILE: &str = "stash.conf";

// =======================================================
// GLOBAL
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default tracing filter. `RUST_LOG` still wins when set.
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl GlobalConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

// =======================================================
// STORE
// =======================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared file, visible to control invocations.
    #[default]
    Sqlite,
    /// Process-local; `--clear-cache` from another process cannot see it.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: Option<String>,
}

impl StoreConfig {
    /// Database file, falling back to the per-user cache directory.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }
}

/// `<user cache dir>/stash/stash.sqlite`, or the temp dir when the platform
/// has no cache dir.
pub fn default_database_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stash")
        .join("stash.sqlite")
}

// =======================================================
// SERVER
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
        }
    }
}

impl ServerConfig {
    pub fn host(&self) -> Result<IpAddr, AddrParseError> {
        self.host.trim().parse()
    }
}

// =======================================================
// STASH CONFIG
// =======================================================
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StashConfig {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl StashConfig {
    /// Validate the configuration and return a report of warnings and errors.
    pub fn validate(&self) -> ConfigReport {
        validate(self)
    }

    /// INI file first, then `STASH_<SECTION>__<KEY>` environment overrides.
    pub fn from_file(file_name: &str) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::new(file_name, config::FileFormat::Ini).required(false))
            .add_source(
                config::Environment::with_prefix("STASH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        built.try_deserialize()
    }

    pub fn from_file_or_default(file_name: &str) -> Self {
        match Self::from_file(file_name) {
            Ok(cfg) => {
                let report = cfg.validate();
                if report.has_errors() {
                    eprintln!("Invalid config in '{file_name}':");
                    eprintln!("{}", report.format());
                    eprintln!("Using default config...");
                    StashConfig::default()
                } else {
                    if report.has_warnings() {
                        eprintln!("Config warnings in '{file_name}':");
                        eprintln!("{}", report.format());
                    }
                    cfg
                }
            }
            Err(e) => {
                eprintln!("Error reading config '{file_name}': {e}");
                eprintln!("Using default config...");
                StashConfig::default()
            }
        }
    }
}
