mod cli;
mod settings;
mod validation;

pub use cli::{Cli, DEFAULT_PORT, Mode, UsageError};
pub use settings::{
    CONFIG_FILE, GlobalConfig, ServerConfig, StashConfig, StoreBackend, StoreConfig,
    default_database_path,
};
pub use validation::{ConfigReport, Issue, Severity, validate};
