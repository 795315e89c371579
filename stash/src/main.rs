mod store;

use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use stash_config::{CONFIG_FILE, Cli, Mode, StashConfig};
use stash_core::ProxyServer;
use stash_proxy::ControlClient;
use tracing::{error, info};
use utils::init_tracing;

use crate::store::Store;

/// Exit code for bad command line usage.
const USAGE_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut cfg = StashConfig::from_file_or_default(CONFIG_FILE);
    if let Some(db) = &cli.database {
        cfg.store.path = Some(db.display().to_string());
    }

    init_tracing(cfg.global.log_level());

    let mode = match cli.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{e}\n");
            eprintln!("{}", Cli::command().render_help());
            return Ok(ExitCode::from(USAGE_EXIT));
        }
    };

    match mode {
        Mode::Serve { port, origin } => run_server(&cfg, port, &origin).await,
        Mode::ClearCache => run_clear_cache(&cfg).await,
    }
}

async fn run_server(cfg: &StashConfig, port: u16, origin: &str) -> anyhow::Result<ExitCode> {
    let host = cfg
        .server
        .host()
        .with_context(|| format!("Invalid server.host '{}'", cfg.server.host))?;

    let store = Store::open(cfg)?;

    let server = ProxyServer::new(store.shared())
        .with_host(host)
        .start(port, origin)
        .await
        .with_context(|| format!("Failed to start proxy server on port {port}"))?;

    println!("Caching proxy listening on port {}, forwarding to {origin}", server.port());

    shutdown_signal().await?;
    info!(target: "stash::cli", "Shutdown signal received");

    server.stop().await.context("Failed to stop proxy server")?;
    store.close()?;

    Ok(ExitCode::SUCCESS)
}

async fn run_clear_cache(cfg: &StashConfig) -> anyhow::Result<ExitCode> {
    let store = Store::open(cfg)?;
    let client = ControlClient::new(store.shared()).context("Failed to build HTTP client")?;

    let outcome = client.clear_remote_cache().await;
    drop(client);
    store.close()?;

    match outcome {
        Ok(()) => {
            println!("Cache cleared");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(target: "stash::cli", error = %e, "Cache clear failed");
            eprintln!("Failed to clear cache: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Ctrl+C everywhere, plus SIGTERM on unix.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl+C")?,
            _ = term.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")
    }
}
