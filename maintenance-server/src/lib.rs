pub mod background;
pub mod config;
pub mod engine;
mod error;
pub mod helpers;
pub mod platform;
mod routes;
pub mod service;
pub mod sessions;
pub mod settings;
pub mod state;
pub mod ticker;
pub mod validation;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub use error::{AppError, ErrorResponse};
use service::Maintenance;
use sessions::SessionPlatform;

pub struct AppState {
    pub service: Arc<Maintenance>,
    pub sessions: Arc<SessionPlatform>,
    /// Bearer token for admin routes; `None` leaves them open.
    pub admin_token: Option<String>,
    /// Upper bound for blocking service calls made by a handler.
    pub task_timeout: Duration,
}

/// Create the application router with the given state and limits
pub fn create_app(state: AppState, request_body_limit: usize, request_timeout: Duration) -> Router {
    let state = Arc::new(state);

    // Called by the game server for every connection attempt
    let player_routes = Router::new()
        .route("/join", post(routes::join))
        .route("/leave", post(routes::leave));

    let admin_routes = Router::new()
        .route("/maintenance", post(routes::set_maintenance))
        .route("/timer/start", post(routes::start_timer))
        .route("/timer/schedule", post(routes::schedule_timer))
        .route("/timer/cancel", post(routes::cancel_timer))
        .route(
            "/whitelist",
            get(routes::list_whitelist).post(routes::add_whitelist),
        )
        .route("/whitelist/{uuid}", delete(routes::remove_whitelist))
        .route("/reload", post(routes::reload));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/status", get(routes::status))
        .merge(player_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
