use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use engine::templates::{AutomationTemplate, TemplateOverrides};
use engine::AutomationRule;
use serde::Deserialize;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiateTemplate {
    pub created_by_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub target_list_id: Option<String>,
    #[serde(default)]
    pub trigger_list_id: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<AutomationTemplate>> {
    Json(state.rules.templates().list())
}

pub async fn instantiate(
    Path((board_id, template_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(body): Json<InstantiateTemplate>,
) -> Result<(StatusCode, Json<AutomationRule>), ApiError> {
    let overrides = TemplateOverrides {
        name: body.name,
        priority: body.priority,
        target_list_id: body.target_list_id,
        trigger_list_id: body.trigger_list_id,
    };
    let rule = state
        .rules
        .instantiate_template(&template_id, &board_id, &body.created_by_id, overrides)
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}
