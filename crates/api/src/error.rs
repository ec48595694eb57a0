//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`.  Internal failures are
//! logged in full and answered with a generic body; webhook
//! authentication failures never say which check failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::{EngineError, GatewayError};
use queue::QueueError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("event queue unavailable: {0}")]
    Queue(#[from] QueueError),
}

fn engine_status(e: &EngineError) -> (StatusCode, String) {
    match e {
        EngineError::Configuration(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        EngineError::RuleNotFound(_)
        | EngineError::WebhookNotFound(_)
        | EngineError::LogNotFound(_)
        | EngineError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        EngineError::LogFinalized(_) | EngineError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, e.to_string())
        }
        EngineError::Serialization(_) | EngineError::CorruptRecord(_) | EngineError::Database(_) => {
            error!(error = %e, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Engine(e) => engine_status(e),
            Self::Gateway(GatewayError::NotFound | GatewayError::Disabled) => {
                (StatusCode::NOT_FOUND, "webhook not found".to_owned())
            }
            Self::Gateway(GatewayError::Unauthorized(_)) => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_owned())
            }
            Self::Gateway(e @ GatewayError::InvalidPayload(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Gateway(GatewayError::Engine(e)) => engine_status(e),
            Self::Queue(e) => {
                error!(error = %e, "event rejected");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
