// =============================================================================
// STOREFRONT SERVICE - Main Entry Point
// =============================================================================
// Backend of a handmade-textiles storefront.
//
// WHAT THIS SERVICE DOES:
// - Serves the public catalog (products, collections, page content)
// - Places cash-on-delivery orders, decrementing stock atomically
// - Sends order confirmation emails in the background
// - Exposes the admin back-office API behind a shared secret
// - Exposes Prometheus metrics
// =============================================================================

mod auth;
mod catalog;
mod config;
mod content;
mod error;
mod extract;
mod handlers;
mod metrics;
mod models;
mod notify;
mod orders;
mod store;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::content::ContentGenerator;
use crate::metrics::{setup_metrics, track_http};
use crate::notify::{LogMailer, Mailer, Notifier, SmtpMailer};
use crate::orders::OrderService;
use crate::store::{PgStore, Store};

/// Confirmations waiting for the mail worker before new ones are dropped
const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

/// How long shutdown waits for queued confirmations to go out
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every handler through `State<Arc<AppState>>`.
//
// LEARNING NOTE:
// `store` is a trait object (`Arc<dyn Store>`), so handlers never know which
// backend they talk to. Production passes a PgStore; the handler tests pass
// an in-memory store through the very same router.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orders: OrderService,
    pub content: ContentGenerator,
    /// Shared secret expected in `x-admin-password`
    pub admin_password: String,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Only present when REDIS_URL is set and reachable
    pub redis: Option<redis::aio::ConnectionManager>,
}

// -----------------------------------------------------------------------------
// ROUTES
// -----------------------------------------------------------------------------
// LEARNING NOTE:
// `route_layer` only wraps routes that matched, so unknown paths get a plain
// 404 instead of a 401 from the admin gate, and `track_http` can label
// requests by route template (`/products/:slug`) rather than raw path.
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/admin/dashboard", get(handlers::admin::dashboard))
        .route("/admin/products", post(handlers::admin::create_product))
        .route(
            "/admin/products/:id",
            put(handlers::admin::update_product).delete(handlers::admin::delete_product),
        )
        .route("/admin/collections", post(handlers::admin::create_collection))
        .route(
            "/admin/collections/:id",
            put(handlers::admin::update_collection).delete(handlers::admin::delete_collection),
        )
        .route("/admin/orders", get(handlers::admin::list_orders))
        .route("/admin/orders/:id", get(handlers::admin::get_order))
        .route(
            "/admin/orders/:id/status",
            patch(handlers::admin::update_order_status),
        )
        .route(
            "/admin/content",
            get(handlers::admin::list_page_content).post(handlers::admin::create_page_content),
        )
        .route("/admin/content/:key", put(handlers::admin::update_page_content))
        .route("/admin/settings/:key", put(handlers::admin::upsert_setting))
        .route(
            "/admin/ai/product-description",
            post(handlers::admin::generate_product_description),
        )
        .route(
            "/admin/ai/page-content",
            post(handlers::admin::generate_page_content),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        // ----- Health, readiness & metrics -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Public catalog -----
        .route("/products", get(handlers::catalog::list_products))
        .route("/products/:slug", get(handlers::catalog::get_product))
        .route(
            "/products/:slug/structured-data",
            get(handlers::catalog::product_structured_data),
        )
        .route("/collections", get(handlers::catalog::list_collections))
        .route("/collections/:slug", get(handlers::catalog::get_collection))
        // ----- Orders -----
        .route("/orders", post(handlers::orders::place_order))
        .route("/orders/:order_number", get(handlers::orders::get_order))
        // ----- Content -----
        .route("/content/:key", get(handlers::content::get_page_content))
        .route("/settings", get(handlers::content::get_settings))
        .merge(admin)
        // Route-level so the middleware sees the matched route template
        .route_layer(middleware::from_fn(track_http))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    // A missing .env file is fine; real deployments set the environment
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls levels, e.g. RUST_LOG=info,storefront_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Storefront Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        smtp = config.smtp.is_some(),
        ai = config.ai.is_some(),
        redis = config.redis_url.is_some(),
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Connect to PostgreSQL and prepare the schema
    // -------------------------------------------------------------------------
    let pg = PgStore::connect(&config.database_url).await?;
    info!("Connected to PostgreSQL");
    pg.run_migrations().await?;
    info!("Database migrations completed");
    if config.seed_sample_data {
        pg.seed_sample_data().await?;
    }
    let store: Arc<dyn Store> = Arc::new(pg);
    info!(backend = store.backend_tag(), "Store ready");

    // -------------------------------------------------------------------------
    // STEP 6: Connect to Redis (optional)
    // -------------------------------------------------------------------------
    // Redis only caches generated copy, so the service runs without it
    let redis = match &config.redis_url {
        Some(url) => match connect_redis(url).await {
            Ok(conn) => {
                info!("Connected to Redis");
                Some(conn)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, content cache disabled");
                None
            }
        },
        None => None,
    };

    // -------------------------------------------------------------------------
    // STEP 7: Build services and application state
    // -------------------------------------------------------------------------
    // The notifier owns the sending side of a bounded channel; the worker
    // task returned next to it owns the receiving side and the mailer
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.site.name)?),
        None => {
            warn!("SMTP not configured, confirmation emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (notifier, notification_worker) = Notifier::spawn(mailer, NOTIFICATION_QUEUE_CAPACITY);

    let state = Arc::new(AppState {
        store: store.clone(),
        orders: OrderService::new(store, notifier),
        content: ContentGenerator::new(config.ai.clone(), config.site.clone(), redis.clone())?,
        admin_password: config.admin_password.clone(),
        metrics_handle,
        redis,
    });

    // -------------------------------------------------------------------------
    // STEP 8: Start the HTTP server
    // -------------------------------------------------------------------------
    // Serves until Ctrl+C or SIGTERM, then stops accepting connections and
    // waits for in-flight requests
    let app = router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Storefront Service is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // -------------------------------------------------------------------------
    // STEP 9: Drain pending confirmation emails
    // -------------------------------------------------------------------------
    // The router (and with it the last Notifier) is gone, so the channel is
    // closed and the worker exits once the queue is empty
    info!("Draining notification queue");
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, notification_worker)
        .await
        .is_err()
    {
        warn!("Notification queue not drained before timeout");
    }

    info!("Storefront Service stopped");
    Ok(())
}

async fn connect_redis(url: &str) -> anyhow::Result<redis::aio::ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(redis::aio::ConnectionManager::new(client).await?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
}
