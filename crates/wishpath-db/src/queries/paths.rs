//! Database query functions for the `paths` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PathRow, PathStatus};

/// Insert a path at the end of its plan's path list.
///
/// Fails with a foreign-key violation when `plan_id` does not exist.
pub async fn insert_path(
    pool: &PgPool,
    plan_id: Uuid,
    title: &str,
    description: &str,
    status: PathStatus,
) -> Result<PathRow> {
    let path = sqlx::query_as::<_, PathRow>(
        "INSERT INTO paths (plan_id, title, description, status, position) \
         VALUES ($1, $2, $3, $4, \
                 (SELECT COALESCE(MAX(position) + 1, 0) FROM paths WHERE plan_id = $1)) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(title)
    .bind(description)
    .bind(status)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert path into plan {plan_id}"))?;

    Ok(path)
}

/// List all paths of a plan in insertion order.
pub async fn list_paths_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PathRow>> {
    let paths = sqlx::query_as::<_, PathRow>(
        "SELECT * FROM paths WHERE plan_id = $1 ORDER BY position, created_at",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list paths for plan {plan_id}"))?;

    Ok(paths)
}

/// Update the user-editable columns of a path. Returns rows affected.
pub async fn update_path(
    pool: &PgPool,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    status: Option<PathStatus>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE paths SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             status = COALESCE($4, status) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(status)
    .execute(pool)
    .await
    .with_context(|| format!("failed to update path {id}"))?;

    Ok(result.rows_affected())
}

/// Delete a path and its milestones. Returns rows affected.
pub async fn delete_path(pool: &PgPool, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM paths WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete path {id}"))?;

    Ok(result.rows_affected())
}
