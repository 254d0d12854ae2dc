//! HTTP front end.
//!
//! One tokio task per connection, HTTP/1 via hyper. Every connection is
//! bounded by the configured request timeout. On Ctrl+C or SIGTERM the
//! accept loop stops and open connections are asked to close once their
//! current request is answered.

pub mod handler;
pub mod response;

use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::qr::QrEncoder;
use crate::render::Renderer;
use crate::store::SharedStore;

pub use handler::{dispatch, handle_request, AppRequest};

/// Everything a request handler needs.
#[derive(Debug)]
pub struct AppState {
    /// The content record behind the QR code.
    pub store: SharedStore,
    /// Page templates.
    pub renderer: Renderer,
    /// Encoder for the fixed visitor URL.
    pub qr: QrEncoder,
    /// Loaded configuration.
    pub config: Config,
}

impl AppState {
    /// Build the shared state around an already opened store.
    ///
    /// # Errors
    ///
    /// Returns an error if the templates do not compile or the base URL is
    /// invalid.
    pub fn new(config: Config, store: SharedStore) -> Result<Self> {
        Ok(Self {
            store,
            renderer: Renderer::new()?,
            qr: QrEncoder::from_config(&config)?,
            config,
        })
    }
}

/// Bind the configured address and serve until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!("QR code points at {}", state.qr.target_url());

    run(listener, state, shutdown_signal()).await;
    Ok(())
}

/// Accept connections on `listener` until `shutdown` completes, then wait
/// up to one request timeout for open connections to finish.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let mut connections = JoinSet::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    connections.spawn(handle_connection(
                        stream,
                        Arc::clone(&state),
                        stop_rx.clone(),
                    ));
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            },
            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }

        while connections.try_join_next().is_some() {}
    }

    stop_tx.send_replace(true);
    let grace = state.config.request_timeout();
    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(grace, drain).await.is_err() {
        warn!(
            "{} connection(s) still open after {}s, aborting",
            connections.len(),
            grace.as_secs()
        );
        connections.shutdown().await;
    }
    info!("Server stopped");
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<AppState>,
    mut stop: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let timeout = state.config.request_timeout();

    let conn = http1::Builder::new().serve_connection(
        io,
        service_fn(move |req| handle_request(req, Arc::clone(&state))),
    );
    tokio::pin!(conn);

    let served = async {
        let finished = tokio::select! {
            result = conn.as_mut() => Some(result),
            _ = stop.wait_for(|stopping| *stopping) => None,
        };
        match finished {
            Some(result) => result,
            None => {
                debug!("Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    };

    match tokio::time::timeout(timeout, served).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Connection error: {}", e),
        Err(_) => warn!("Connection timed out after {}s", timeout.as_secs()),
    }
}

/// Resolve when Ctrl+C or SIGTERM is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
