use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Port used when `--port` is omitted.
pub const DEFAULT_PORT: u16 = 3000;

/// Caching proxy for a single origin server.
///
/// Start a server with `--origin`, clear its cache from another shell with
/// `--clear-cache`.
#[derive(Debug, Parser)]
#[command(name = "stash", version, about)]
pub struct Cli {
    /// Port the proxy listens on
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<String>,

    /// Origin server URL, e.g. https://example.org
    #[arg(short, long, value_name = "URL")]
    pub origin: Option<String>,

    /// Clear the cache of the running proxy server
    #[arg(long)]
    pub clear_cache: bool,

    /// SQLite file shared by the server and control invocations
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}

/// What this invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Serve { port: u16, origin: String },
    ClearCache,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Missing command line arguments")]
    MissingArguments,

    #[error("--origin is required to start the proxy server")]
    MissingOrigin,

    #[error("Port must be a number between 0 and 65535: {0}")]
    InvalidPort(String),

    #[error("Origin must be an absolute URL: {0}")]
    InvalidOrigin(String),
}

impl Cli {
    /// Resolve the flags into a mode.
    ///
    /// `--clear-cache` is checked first and wins over server flags.
    pub fn mode(&self) -> Result<Mode, UsageError> {
        if self.clear_cache {
            return Ok(Mode::ClearCache);
        }

        let origin = match (&self.origin, &self.port) {
            (Some(origin), _) => origin,
            (None, Some(_)) => return Err(UsageError::MissingOrigin),
            (None, None) => return Err(UsageError::MissingArguments),
        };

        let port = match &self.port {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| UsageError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        if url::Url::parse(origin).is_err() {
            return Err(UsageError::InvalidOrigin(origin.clone()));
        }

        Ok(Mode::Serve {
            port,
            origin: origin.clone(),
        })
    }
}
