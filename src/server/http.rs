//! HTTP server implementation for the travels service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};
use tokio::signal;

use super::config::ServerConfig;
use super::handlers::{self, AppState};
use super::metrics::Metrics;
use super::middleware::track_requests;
use crate::travels::TravelDb;

/// HTTP server for the travels engine.
pub struct TravelServer {
    db: Arc<TravelDb>,
    config: ServerConfig,
    now: i64,
}

impl TravelServer {
    /// Create a new server. `now` is the data-generation timestamp the age
    /// filters are anchored to.
    pub fn new(db: Arc<TravelDb>, config: ServerConfig, now: i64) -> Self {
        Self { db, config, now }
    }

    /// Run the HTTP server until SIGINT or SIGTERM.
    pub async fn run(self) {
        let metrics = Arc::new(Metrics::new());
        let state = AppState {
            db: self.db,
            now: self.now,
            metrics,
        };
        let app = router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .unwrap();

        tracing::info!("Server shut down gracefully");
    }
}

/// Build the route table. `/…/new` and `/…/{id}` coexist because the router
/// prefers literal segments over captures. Unhandled methods fall through to
/// 404, not 405: any method+path pair outside the table is an unknown route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/users/new",
            post(handlers::create_user).fallback(handlers::not_found),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .post(handlers::update_user)
                .fallback(handlers::not_found),
        )
        .route(
            "/users/{id}/visits",
            get(handlers::get_user_visits).fallback(handlers::not_found),
        )
        .route(
            "/locations/new",
            post(handlers::create_location).fallback(handlers::not_found),
        )
        .route(
            "/locations/{id}",
            get(handlers::get_location)
                .post(handlers::update_location)
                .fallback(handlers::not_found),
        )
        .route(
            "/locations/{id}/avg",
            get(handlers::get_location_avg).fallback(handlers::not_found),
        )
        .route(
            "/visits/new",
            post(handlers::create_visit).fallback(handlers::not_found),
        )
        .route(
            "/visits/{id}",
            get(handlers::get_visit)
                .post(handlers::update_visit)
                .fallback(handlers::not_found),
        )
        .route(
            "/metrics",
            get(handlers::metrics).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Listen for SIGTERM (container termination) and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
