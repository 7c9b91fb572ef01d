//! Tidepool storefront - public e-commerce API.
//!
//! # Architecture
//!
//! - Axum JSON API consumed by the web client
//! - `PostgreSQL` for the product catalog and basket records
//! - Stripe for payment intents and promo code resolution
//! - Anonymous-capable baskets correlated by an opaque cookie token
//!
//! The basket reconciliation service is the core of this binary: it keeps a
//! mutable basket consistent with its external payment intent across
//! independent requests, with no server-side session.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tidepool_storefront::config::StorefrontConfig;
use tidepool_storefront::state::AppState;
use tidepool_storefront::{db, routes};

/// Wire up telemetry: a fmt layer for logs plus a Sentry layer that turns
/// warnings and errors into events and info/debug into breadcrumbs.
///
/// Returns the Sentry guard, which must outlive the server, when a DSN is
/// configured.
fn init_telemetry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config
                    .sentry_environment
                    .clone()
                    .map(std::borrow::Cow::Owned),
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tidepool_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
            tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
            tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
            _ => sentry_tracing::EventFilter::Ignore,
        }))
        .init();

    if guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    guard
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers sit outermost so every request is covered
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");
    let _sentry_guard = init_telemetry(&config);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // Migrations are not run on startup; use `tidepool-cli migrate`.
    let state = AppState::new(config.clone(), pool).expect("Failed to initialize application state");
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("storefront listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness probe. Says nothing about dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: `503` until the database answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Resolve on Ctrl+C or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
