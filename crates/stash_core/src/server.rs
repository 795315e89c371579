use std::{
    convert::Infallible,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    pin::pin,
    sync::Arc,
    time::Duration,
};

use hyper::{Request, body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use stash_store::{ConfigStore, validate_origin};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{error::ServerError, router, state::AppState};

/// Pause after a failed `accept()` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Builder for a proxy listener bound to one store.
pub struct ProxyServer {
    store: Arc<dyn ConfigStore>,
    host: IpAddr,
}

impl ProxyServer {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Listen on `host` instead of every interface.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Start serving.
    ///
    /// Order:
    /// 1) validate the origin (no side effects on failure)
    /// 2) bind; a busy port is `BindFailed` and the store is left alone, so a
    ///    sibling server already on that port keeps its registration
    /// 3) reset the store atomically: empty cache, bound port, new origin
    /// 4) spawn the accept loop
    ///
    /// Resolves once the socket is accepting connections. With `port = 0` the
    /// OS-assigned port is the one written to the registry.
    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn start(&self, port: u16, origin: &str) -> Result<RunningServer, ServerError> {
        validate_origin(origin).map_err(|_| ServerError::InvalidOrigin(origin.to_string()))?;
        let state = AppState::new(self.store.clone())?;

        let listen_addr = SocketAddr::new(self.host, port);
        let listener = match TcpListener::bind(listen_addr).await {
            Ok(l) => {
                info!(target: "stash::master", listen = %listen_addr, "Bind() successful");
                l
            }
            Err(source) => {
                error!(
                    target: "stash::master",
                    listen = %listen_addr,
                    error = ?source,
                    "Failed to bind listener"
                );
                return Err(ServerError::BindFailed { port, source });
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::BindFailed { port, source })?;

        self.store.reset(local_addr.port(), origin)?;

        info!(
            target: "stash::master",
            port = local_addr.port(),
            %origin,
            "Proxy server started"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(listener, local_addr, state, shutdown_rx));

        Ok(RunningServer {
            local_addr,
            store: self.store.clone(),
            shutdown_tx,
            accept_task,
        })
    }
}

/// Handle to a listening proxy.
///
/// Dropping it without [`stop`](RunningServer::stop) also closes the
/// listener, but leaves the port registered in the store.
pub struct RunningServer {
    local_addr: SocketAddr,
    store: Arc<dyn ConfigStore>,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop serving.
    ///
    /// Clears the cache and the port registry first, so no later control
    /// client finds a stale port, then closes the listener and waits for
    /// in-flight connections to finish. A miss that completes during the
    /// drain may store its body, so the cache is cleared once more after the
    /// last connection is gone.
    pub async fn stop(self) -> Result<(), ServerError> {
        info!(target: "stash::master", port = self.port(), "Stopping proxy server");

        let released = self.store.release();
        if let Err(e) = &released {
            error!(target: "stash::master", error = ?e, "Failed to release store state");
        }

        let _ = self.shutdown_tx.send(true);
        self.accept_task.await?;
        released?;

        let late_entries = self.store.cache_len()?;
        if late_entries > 0 {
            debug!(
                target: "stash::master",
                entries = late_entries,
                "Dropping entries stored by draining connections"
            );
            self.store.clear_all()?;
        }

        info!(target: "stash::master", "Proxy server stopped");
        Ok(())
    }
}

#[instrument(skip(listener, state, shutdown), fields(listen = %local_addr))]
async fn accept_loop(
    listener: TcpListener,
    local_addr: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(target: "stash::master", "accept_loop started for listening socket");

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, client_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(
                            target: "stash::master",
                            error = ?e,
                            "Failed to accept connection"
                        );
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                debug!(
                    target: "stash::master",
                    %client_addr,
                    in_flight = connections.len(),
                    "New connection accepted"
                );

                connections.spawn(serve_connection(
                    stream,
                    client_addr,
                    state.clone(),
                    shutdown.clone(),
                ));
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    error!(target: "stash::worker", error = ?e, "Connection task panicked");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    // No new connections from here on
    drop(listener);

    info!(
        target: "stash::master",
        in_flight = connections.len(),
        "Listener closed; draining connections"
    );

    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            error!(target: "stash::worker", error = ?e, "Connection task panicked");
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    client_addr: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(router::route(req, &state).await) }
    });

    let mut conn = pin!(http1::Builder::new().serve_connection(io, service));
    let mut draining = false;

    let result = loop {
        tokio::select! {
            res = conn.as_mut() => break res,
            _ = shutdown.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    match result {
        Ok(()) => debug!(target: "stash::worker", %client_addr, "Connection closed"),
        Err(e) => debug!(
            target: "stash::worker",
            %client_addr,
            error = ?e,
            "Connection closed with error"
        ),
    }
}
