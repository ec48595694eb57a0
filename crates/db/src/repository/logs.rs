//! `automation_logs` operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::AutomationLogRow, DbError};

const COLUMNS: &str = "id, rule_id, webhook_id, trigger_event, trigger_data, status, \
     actions_executed, error, started_at, completed_at, duration_ms";

pub async fn insert_log(pool: &PgPool, row: &AutomationLogRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO automation_logs
            (id, rule_id, webhook_id, trigger_event, trigger_data, status,
             actions_executed, error, started_at, completed_at, duration_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(row.id)
    .bind(row.rule_id)
    .bind(row.webhook_id)
    .bind(&row.trigger_event)
    .bind(&row.trigger_data)
    .bind(&row.status)
    .bind(&row.actions_executed)
    .bind(&row.error)
    .bind(row.started_at)
    .bind(row.completed_at)
    .bind(row.duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update a log that has not reached a terminal status yet.
///
/// Returns `false` when nothing was updated: the log is missing or already
/// `success`, `failed` or `skipped`.
pub async fn update_open_log(pool: &PgPool, row: &AutomationLogRow) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE automation_logs
        SET status = $2, actions_executed = $3, error = $4, started_at = $5,
            completed_at = $6, duration_ms = $7
        WHERE id = $1 AND status IN ('pending', 'running')
        "#,
    )
    .bind(row.id)
    .bind(&row.status)
    .bind(&row.actions_executed)
    .bind(&row.error)
    .bind(row.started_at)
    .bind(row.completed_at)
    .bind(row.duration_ms)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_log(pool: &PgPool, id: Uuid) -> Result<Option<AutomationLogRow>, DbError> {
    let row = sqlx::query_as::<_, AutomationLogRow>(&format!(
        "SELECT {COLUMNS} FROM automation_logs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Most recent first.
pub async fn list_logs_for_rule(
    pool: &PgPool,
    rule_id: Uuid,
    limit: i64,
) -> Result<Vec<AutomationLogRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationLogRow>(&format!(
        "SELECT {COLUMNS} FROM automation_logs WHERE rule_id = $1 \
         ORDER BY started_at DESC LIMIT $2"
    ))
    .bind(rule_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most recent first.
pub async fn list_logs_for_webhook(
    pool: &PgPool,
    webhook_id: Uuid,
    limit: i64,
) -> Result<Vec<AutomationLogRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationLogRow>(&format!(
        "SELECT {COLUMNS} FROM automation_logs WHERE webhook_id = $1 \
         ORDER BY started_at DESC LIMIT $2"
    ))
    .bind(webhook_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
