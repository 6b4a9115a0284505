//! Web server for detecting and sharing.

pub mod assets;
pub mod card;
pub mod error;
pub mod routes;
pub mod templates;

pub use assets::{content_type, StaticAssets};
pub use error::ApiError;
pub use routes::{build_router, AppState};
pub use card::{render_card, CardError, CardView, CARD_HEIGHT, CARD_WIDTH};
pub use templates::{ShareView, TemplateEngine, Templates};

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use tokio::net::TcpListener as TokioTcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use crate::share::{default_ttl, ShareStore};

/// Find an available port starting from the given base port.
///
/// Tries ports sequentially until finding one that's available.
pub fn find_available_port(host: IpAddr, base_port: u16) -> Option<u16> {
    (base_port..=base_port.saturating_add(100))
        .find(|&port| TcpListener::bind((host, port)).is_ok())
}

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: IpAddr,
    /// Base port to try binding to (defaults to 3000).
    pub base_port: u16,
    /// Whether to open the browser automatically.
    pub open_browser: bool,
    /// Base URL for share links; the request Host header is used when unset.
    pub public_url: Option<String>,
    /// How long shares stay viewable.
    pub ttl: chrono::Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            base_port: DEFAULT_PORT,
            open_browser: true,
            public_url: None,
            ttl: default_ttl(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Handle to a server running in the background.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Local URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Server task ended abnormally");
        }
    }
}

/// Start the server in the background with a fresh share store.
pub async fn start_server(config: &ServerConfig) -> anyhow::Result<ServerHandle> {
    let store = ShareStore::with_system_clock(config.ttl);
    let state = AppState::new(store)?
        .with_public_url(config.public_url.clone())
        .with_max_body_bytes(config.max_body_bytes);
    start_server_with_state(Arc::new(state), config).await
}

/// Start the server in the background with caller-supplied state.
pub async fn start_server_with_state(
    state: Arc<AppState>,
    config: &ServerConfig,
) -> anyhow::Result<ServerHandle> {
    let port = find_available_port(config.host, config.base_port)
        .ok_or_else(|| anyhow::anyhow!("No available port found"))?;
    let listener = TokioTcpListener::bind(SocketAddr::new(config.host, port)).await?;
    let addr = listener.local_addr()?;

    let app = build_router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "Server error");
        }
    });

    info!(%addr, "Server listening");
    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Run the web server until Ctrl+C or SIGTERM.
///
/// All shares live in memory and are gone once this returns.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let handle = start_server(&config).await?;
    let url = handle.url();

    println!("Server running at: {}", url);
    println!("Press Ctrl+C to stop");

    if config.open_browser {
        if let Err(e) = webbrowser::open(&url) {
            warn!(error = %e, "Failed to open browser");
        }
    }

    shutdown_signal().await;
    handle.stop().await;

    println!("\nServer stopped");
    Ok(())
}

/// Wait for the shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
