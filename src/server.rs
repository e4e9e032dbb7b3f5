//! HTTP Query Service.
//!
//! Read-only JSON API over a [`CatalogStore`]. The store handle is injected
//! through axum's `State` extractor; no handler holds global state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/products` | Filtered, sorted, paginated product list |
//! | `GET` | `/api/products/{barcode}` | Single product or 404 |
//! | `GET` | `/api/stats/nutriscore` | Product count per grade |
//! | `GET` | `/api/stats/categories` | Top-N category tally |
//! | `GET` | `/api/health` | Liveness, `{ "ok": true }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "Not found" }
//! ```
//!
//! `404` for unknown barcodes, `400` for parameters rejected by the strict
//! parameter policy, `500` for store failures.
//!
//! # CORS
//!
//! Any origin may issue `GET` requests, so a browser client can be served
//! from a different host.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use crate::catalog::{self, ProductPage};
use crate::config::{ApiConfig, Config};
use crate::error::ApiError;
use crate::models::Product;
use crate::query::{ListParams, TopParams};
use crate::sqlite_store::SqliteStore;
use crate::store::{CatalogStore, CategoryCount, GradeCount};

/// Shared state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn CatalogStore>,
    api: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, api: ApiConfig) -> Self {
        Self {
            store,
            api: Arc::new(api),
        }
    }
}

/// Build the API router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/products", get(handle_list_products))
        .route("/api/products/{barcode}", get(handle_get_product))
        .route("/api/stats/nutriscore", get(handle_nutriscore_stats))
        .route("/api/stats/categories", get(handle_category_stats))
        .route("/api/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Open the SQLite store and serve the API on `[server].bind` until Ctrl+C
/// or SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    info!("Opening catalog at {}", config.db.path.display());
    let store = Arc::new(SqliteStore::open(config).await?);

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("API listening on http://{}", listener.local_addr()?);

    let shared: Arc<dyn CatalogStore> = store.clone();
    serve(listener, AppState::new(shared, config.api.clone()), shutdown_signal()).await?;

    store.close().await;
    info!("Server shut down");
    Ok(())
}

/// Serve the API on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
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

// ============ GET /api/products ============

async fn handle_list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductPage>, ApiError> {
    let query = params.resolve(&state.api)?;
    debug!(?query, "list products");

    let page = catalog::list_products(state.store.as_ref(), &query).await?;
    Ok(Json(page))
}

// ============ GET /api/products/{barcode} ============

async fn handle_get_product(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .store
        .get_product(&barcode)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

// ============ GET /api/stats/* ============

async fn handle_nutriscore_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<GradeCount>>, ApiError> {
    Ok(Json(state.store.grade_distribution().await?))
}

async fn handle_category_stats(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let top = params.resolve(&state.api)?;
    Ok(Json(state.store.category_distribution(top).await?))
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
