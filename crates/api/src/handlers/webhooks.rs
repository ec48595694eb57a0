use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine::service::{CreatedWebhook, WebhookDraft, WebhookUpdate};
use engine::{AutomationLog, AutomationWebhook};
use uuid::Uuid;

use super::LogQuery;
use crate::{ApiError, AppState};

pub async fn list(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AutomationWebhook>>, ApiError> {
    Ok(Json(state.webhooks.list(&board_id).await?))
}

/// The response is the only place the secret is ever shown.
pub async fn create(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    Json(draft): Json<WebhookDraft>,
) -> Result<(StatusCode, Json<CreatedWebhook>), ApiError> {
    let created = state.webhooks.create(&board_id, draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AutomationWebhook>, ApiError> {
    Ok(Json(state.webhooks.get(id).await?))
}

pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(update): Json<WebhookUpdate>,
) -> Result<Json<AutomationWebhook>, ApiError> {
    Ok(Json(state.webhooks.update(id, update).await?))
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.webhooks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<CreatedWebhook>, ApiError> {
    Ok(Json(state.webhooks.rotate_secret(id).await?))
}

pub async fn logs(
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AutomationLog>>, ApiError> {
    Ok(Json(state.webhooks.logs(id, query.limit).await?))
}
