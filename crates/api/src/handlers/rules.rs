use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use engine::service::{RuleDraft, RuleUpdate};
use engine::{AutomationLog, AutomationRule};
use serde::Deserialize;
use uuid::Uuid;

use super::LogQuery;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct Toggle {
    pub enabled: bool,
}

pub async fn list(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AutomationRule>>, ApiError> {
    Ok(Json(state.rules.list(&board_id).await?))
}

pub async fn create(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    Json(draft): Json<RuleDraft>,
) -> Result<(StatusCode, Json<AutomationRule>), ApiError> {
    let rule = state.rules.create(&board_id, draft).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AutomationRule>, ApiError> {
    Ok(Json(state.rules.get(id).await?))
}

pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(update): Json<RuleUpdate>,
) -> Result<Json<AutomationRule>, ApiError> {
    Ok(Json(state.rules.update(id, update).await?))
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.rules.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<Toggle>,
) -> Result<Json<AutomationRule>, ApiError> {
    Ok(Json(state.rules.set_enabled(id, body.enabled).await?))
}

pub async fn logs(
    Path(id): Path<Uuid>,
    Query(query): Query<LogQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AutomationLog>>, ApiError> {
    Ok(Json(state.rules.logs(id, query.limit).await?))
}
