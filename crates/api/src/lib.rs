//! `api` crate: HTTP layer of the board automation service.
//!
//! Exposes:
//!   POST   /api/v1/boards/{boardId}/events
//!   GET    /api/v1/boards/{boardId}/rules
//!   POST   /api/v1/boards/{boardId}/rules
//!   GET    /api/v1/rules/{id}
//!   PUT    /api/v1/rules/{id}
//!   DELETE /api/v1/rules/{id}
//!   POST   /api/v1/rules/{id}/toggle
//!   GET    /api/v1/rules/{id}/logs
//!   GET    /api/v1/templates
//!   POST   /api/v1/boards/{boardId}/templates/{templateId}
//!   GET    /api/v1/boards/{boardId}/webhooks
//!   POST   /api/v1/boards/{boardId}/webhooks
//!   GET    /api/v1/webhooks/{id}
//!   PUT    /api/v1/webhooks/{id}
//!   DELETE /api/v1/webhooks/{id}
//!   POST   /api/v1/webhooks/{id}/rotate
//!   GET    /api/v1/webhooks/{id}/logs
//!   POST   /api/v1/hooks/{webhookId}
//!   GET    /health

pub mod error;
pub mod handlers;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use state::{AppState, Backends, Stores};

use handlers::{events, health, hooks, rules, templates, webhooks};

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/boards/:board_id/events", post(events::ingest))
        .route("/boards/:board_id/rules", get(rules::list).post(rules::create))
        .route(
            "/rules/:id",
            get(rules::get).put(rules::update).delete(rules::delete),
        )
        .route("/rules/:id/toggle", post(rules::toggle))
        .route("/rules/:id/logs", get(rules::logs))
        .route("/templates", get(templates::list))
        .route(
            "/boards/:board_id/templates/:template_id",
            post(templates::instantiate),
        )
        .route(
            "/boards/:board_id/webhooks",
            get(webhooks::list).post(webhooks::create),
        )
        .route(
            "/webhooks/:id",
            get(webhooks::get).put(webhooks::update).delete(webhooks::delete),
        )
        .route("/webhooks/:id/rotate", post(webhooks::rotate))
        .route("/webhooks/:id/logs", get(webhooks::logs))
        .route("/hooks/:webhook_id", post(hooks::receive));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves.  In-flight requests finish first.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "API server listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
