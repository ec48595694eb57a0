//! `automation_rules` operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::AutomationRuleRow, DbError};

const COLUMNS: &str = "id, board_id, name, description, enabled, trigger_type, trigger_config, \
     conditions, actions, priority, max_executions, execution_count, last_executed_at, \
     is_template, template_id, created_by_id, created_at, updated_at";

pub async fn insert_rule(pool: &PgPool, row: &AutomationRuleRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO automation_rules
            (id, board_id, name, description, enabled, trigger_type, trigger_config,
             conditions, actions, priority, max_executions, execution_count,
             last_executed_at, is_template, template_id, created_by_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(row.id)
    .bind(&row.board_id)
    .bind(&row.name)
    .bind(&row.description)
    .bind(row.enabled)
    .bind(&row.trigger_type)
    .bind(&row.trigger_config)
    .bind(&row.conditions)
    .bind(&row.actions)
    .bind(row.priority)
    .bind(row.max_executions)
    .bind(row.execution_count)
    .bind(row.last_executed_at)
    .bind(row.is_template)
    .bind(&row.template_id)
    .bind(&row.created_by_id)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_rule(pool: &PgPool, id: Uuid) -> Result<Option<AutomationRuleRow>, DbError> {
    let row = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        "SELECT {COLUMNS} FROM automation_rules WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Every rule of a board, newest first.
pub async fn list_rules_for_board(
    pool: &PgPool,
    board_id: &str,
) -> Result<Vec<AutomationRuleRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        "SELECT {COLUMNS} FROM automation_rules WHERE board_id = $1 ORDER BY created_at DESC"
    ))
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_enabled_rules_for_board(
    pool: &PgPool,
    board_id: &str,
) -> Result<Vec<AutomationRuleRow>, DbError> {
    let rows = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        "SELECT {COLUMNS} FROM automation_rules WHERE board_id = $1 AND enabled"
    ))
    .bind(board_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrite the configuration columns.  Counters are left alone.
///
/// Returns `DbError::NotFound` if no row was updated.
pub async fn update_rule(pool: &PgPool, row: &AutomationRuleRow) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE automation_rules
        SET name = $2, description = $3, enabled = $4, trigger_type = $5,
            trigger_config = $6, conditions = $7, actions = $8, priority = $9,
            max_executions = $10, is_template = $11, template_id = $12, updated_at = $13
        WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(&row.name)
    .bind(&row.description)
    .bind(row.enabled)
    .bind(&row.trigger_type)
    .bind(&row.trigger_config)
    .bind(&row.conditions)
    .bind(&row.actions)
    .bind(row.priority)
    .bind(row.max_executions)
    .bind(row.is_template)
    .bind(&row.template_id)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Delete a rule; its logs go with it (`ON DELETE CASCADE`).
///
/// Returns `false` if no row was deleted.
pub async fn delete_rule(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM automation_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Bump `execution_count` in a single conditional UPDATE.
///
/// Returns the new count, or `None` when the rule is capped out or gone.
pub async fn claim_execution(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<Option<i64>, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE automation_rules
        SET execution_count = execution_count + 1, last_executed_at = $2
        WHERE id = $1
          AND (max_executions IS NULL OR execution_count < max_executions)
        RETURNING execution_count
        "#,
    )
    .bind(id)
    .bind(at)
    .fetch_optional(pool)
    .await?;

    Ok(count)
}
