//! outfitsave-server: HTTP surface for outfits and share links.
//!
//! Routes:
//!
//! - `POST /api/outfits`: create an outfit owned by the caller
//! - `GET /api/outfits/:id`: read an outfit (public, or owned by the caller)
//! - `POST /api/outfits/:id/share`: owner-only; returns `{ shareSlug, shareUrl }`
//! - `GET /api/share/:slug`: resolve a share slug to its outfit
//! - `GET /healthz`
//! - `GET /metrics`: Prometheus text when built with the `prometheus` feature
//!
//! The caller's identity comes from the `x-user-id` header, which the
//! fronting auth layer is expected to set after validating the session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use outfitsave_config::OutfitSaveConfig;
use outfitsave_core::{AllocatorSettings, OutfitStore, SlugAllocator};
use outfitsave_telemetry::{NoopShareMetrics, ShareMetrics};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[cfg(feature = "prometheus")]
use outfitsave_telemetry::PrometheusShareMetrics;

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{CreateOutfitRequest, CurrentUser, ShareResponse, USER_ID_HEADER};

/// Error type for the HTTP server.
///
/// This is intentionally lightweight; callers (typically `outfitsaved`) can map it
/// into their own error types if desired.
#[derive(Debug)]
pub enum ServerError {
    /// Failed to bind on the requested address.
    BindFailed(String),
    /// The HTTP server encountered a runtime error.
    ServeFailed(String),
    /// Metrics backend could not be set up.
    Telemetry(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::BindFailed(msg) => write!(f, "failed to bind HTTP server: {}", msg),
            ServerError::ServeFailed(msg) => write!(f, "HTTP server error: {}", msg),
            ServerError::Telemetry(msg) => write!(f, "metrics setup failed: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

/// Where share links point.
#[derive(Debug, Clone)]
pub struct ShareLinks {
    /// Public origin, e.g. `https://outfitsave.app`.
    pub base_url: String,
    /// Path between origin and slug, e.g. `/outfits/share`.
    pub path_prefix: String,
}

/// Configuration for the outfitsave HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server on.
    pub bind_addr: SocketAddr,

    pub links: ShareLinks,

    pub allocator: AllocatorSettings,

    /// Serve Prometheus metrics on `/metrics`.
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// Build server settings from validated configuration.
    pub fn from_config(cfg: &OutfitSaveConfig, bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            links: ShareLinks {
                base_url: cfg.share.base_url.clone(),
                path_prefix: cfg.share.path_prefix.clone(),
            },
            allocator: cfg.allocator_settings(),
            metrics_enabled: cfg.metrics_enabled(),
        }
    }
}

/// Shared application state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: Arc<dyn OutfitStore>,
    pub(crate) allocator: Arc<SlugAllocator<dyn OutfitStore>>,
    pub(crate) links: Arc<ShareLinks>,
    pub(crate) metrics: Arc<dyn ShareMetrics>,

    #[cfg(feature = "prometheus")]
    pub(crate) prometheus: Option<Arc<PrometheusShareMetrics>>,
}

impl AppState {
    /// Build state with a no-op metrics sink.
    pub fn new(
        store: Arc<dyn OutfitStore>,
        links: ShareLinks,
        settings: AllocatorSettings,
    ) -> Self {
        Self::with_metrics(store, links, settings, Arc::new(NoopShareMetrics))
    }

    /// Build state reporting into `metrics`.
    pub fn with_metrics(
        store: Arc<dyn OutfitStore>,
        links: ShareLinks,
        settings: AllocatorSettings,
        metrics: Arc<dyn ShareMetrics>,
    ) -> Self {
        let allocator = SlugAllocator::new(Arc::clone(&store))
            .with_settings(settings)
            .with_metrics(Arc::clone(&metrics));

        Self {
            store,
            allocator: Arc::new(allocator),
            links: Arc::new(links),
            metrics,
            #[cfg(feature = "prometheus")]
            prometheus: None,
        }
    }

    /// Build state backed by a Prometheus recorder that `/metrics` exports.
    #[cfg(feature = "prometheus")]
    pub fn with_prometheus(
        store: Arc<dyn OutfitStore>,
        links: ShareLinks,
        settings: AllocatorSettings,
    ) -> Result<Self, ServerError> {
        let prometheus = Arc::new(
            PrometheusShareMetrics::new().map_err(|e| ServerError::Telemetry(e.to_string()))?,
        );
        let metrics: Arc<dyn ShareMetrics> = prometheus.clone();
        let mut state = Self::with_metrics(store, links, settings, metrics);
        state.prometheus = Some(prometheus);
        Ok(state)
    }
}

/// Build the application router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/outfits", post(routes::create_outfit))
        .route("/api/outfits/:id", get(routes::get_outfit))
        .route("/api/outfits/:id/share", post(routes::share_outfit))
        .route("/api/share/:slug", get(routes::get_shared_outfit))
        .route("/healthz", get(routes::healthz))
        .route("/metrics", get(routes::metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::track_requests,
        ))
        .with_state(state)
}

/// Handle to the outfitsave HTTP server.
///
/// `run` does not return until the listener fails. Callers that want finer
/// control can `spawn` it and manage the `JoinHandle`.
pub struct OutfitSaveServer {
    cfg: ServerConfig,
    state: AppState,
}

impl OutfitSaveServer {
    /// Create a server over `store`.
    ///
    /// With the `prometheus` feature and metrics enabled, share metrics are
    /// recorded into a Prometheus registry served on `/metrics`; otherwise a
    /// no-op recorder is used.
    pub fn new(cfg: ServerConfig, store: Arc<dyn OutfitStore>) -> Result<Self, ServerError> {
        #[cfg(feature = "prometheus")]
        let state = if cfg.metrics_enabled {
            AppState::with_prometheus(store, cfg.links.clone(), cfg.allocator)?
        } else {
            AppState::new(store, cfg.links.clone(), cfg.allocator)
        };

        #[cfg(not(feature = "prometheus"))]
        let state = AppState::new(store, cfg.links.clone(), cfg.allocator);

        Ok(Self { cfg, state })
    }

    /// Shared metrics sink used by the server.
    pub fn metrics_recorder(&self) -> Arc<dyn ShareMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Spawn the HTTP server onto the current Tokio runtime and return a handle.
    pub fn spawn(self) -> JoinHandle<Result<(), ServerError>> {
        tokio::spawn(self.run())
    }

    /// Run the HTTP server until it fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.cfg.bind_addr;

        info!("outfitsave-server: binding HTTP server on {}", addr);

        let app = router(self.state);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(e.to_string()))?;

        info!(
            "outfitsave-server: listening on {} (share links under {}{})",
            addr, self.cfg.links.base_url, self.cfg.links.path_prefix
        );

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(s) => s,
                Err(e) => {
                    error!("outfitsave-server: accept error: {}", e);
                    return Err(ServerError::ServeFailed(e.to_string()));
                }
            };

            let svc = app.clone();
            let io = TokioIo::new(stream);
            let conn = http1::Builder::new().serve_connection(io, TowerToHyperService::new(svc));

            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    error!("outfitsave-server: error serving {}: {}", peer_addr, e);
                }
            });
        }
    }
}
