//! `automation_webhooks` operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::AutomationWebhookRow, DbError};

const COLUMNS: &str = "id, board_id, name, secret_ciphertext, webhook_url, enabled, \
     require_signature, allowed_ips, call_count, last_called_at, actions, created_by_id, \
     created_at, updated_at";

pub async fn insert_webhook(pool: &PgPool, row: &AutomationWebhookRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO automation_webhooks
            (id, board_id, name, secret_ciphertext, webhook_url, enabled, require_signature,
             allowed_ips, call_count, last_called_at, actions, created_by_id, created_at,
             updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(row.id)
    .bind(&row.board_id)
    .bind(&row.name)
    .bind(&row.secret_ciphertext)
    .bind(&row.webhook_url)
    .bind(row.enabled)
    .bind(row.require_signature)
    .bind(&row.allowed_ips)
    .bind(row.call_count)
    .bind(row.last_called_at)
    .bind(&row.actions)
    .bind(&row.created_by_id)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_webhook(pool: &PgPool, id: Uuid) -> Result<Option<AutomationWebhookRow>, DbError> {
    let row = sqlx::query_as::<_, AutomationWebhookRow>(&format!(
        "SELECT {COLUMNS} FROM automation_webhooks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Newest first.
pub async fn list_webhooks_for_board(
    pool: &PgPool,
    board_id: &str,
) -> Result<Vec<AutomationWebhookRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationWebhookRow>(&format!(
        "SELECT {COLUMNS} FROM automation_webhooks WHERE board_id = $1 ORDER BY created_at DESC"
    ))
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrite configuration and secret.  Counters are left alone.
///
/// Returns `DbError::NotFound` if no row was updated.
pub async fn update_webhook(pool: &PgPool, row: &AutomationWebhookRow) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE automation_webhooks
        SET name = $2, secret_ciphertext = $3, webhook_url = $4, enabled = $5,
            require_signature = $6, allowed_ips = $7, actions = $8, updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(&row.name)
    .bind(&row.secret_ciphertext)
    .bind(&row.webhook_url)
    .bind(row.enabled)
    .bind(row.require_signature)
    .bind(&row.allowed_ips)
    .bind(&row.actions)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Delete a webhook; its logs go with it (`ON DELETE CASCADE`).
pub async fn delete_webhook(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM automation_webhooks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Bump `call_count` atomically and return the new value.
pub async fn record_call(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<i64, DbError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE automation_webhooks
        SET call_count = call_count + 1, last_called_at = $2
        WHERE id = $1
        RETURNING call_count
        "#,
    )
    .bind(id)
    .bind(at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
