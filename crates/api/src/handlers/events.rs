//! Event ingest.  Events are queued and processed in the background; the
//! emitter only learns whether the event was accepted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use engine::{EventContext, TriggerEvent, TriggerType};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEvent {
    #[serde(rename = "type")]
    pub event_type: TriggerType,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: EventContext,
}

pub async fn ingest(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<IngestEvent>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut event = TriggerEvent::new(body.event_type, board_id, body.context);
    if let Some(at) = body.occurred_at {
        event = event.at(at);
    }
    debug!(board_id = %event.board_id, event = %event.event_type, "event accepted");
    state.events.try_enqueue(event)?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": true }))))
}
