//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PlanRow, PlanStatus};

/// Column updates for a plan row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PlanRowUpdate<'a> {
    pub title: Option<&'a str>,
    pub status: Option<PlanStatus>,
    pub progress: Option<i16>,
    pub total_tasks: Option<i32>,
    pub completed_tasks: Option<i32>,
    pub total_budget: Option<f64>,
    pub spent_budget: Option<f64>,
}

/// Insert a new plan row in `draft` status.
pub async fn insert_plan(pool: &PgPool, title: &str) -> Result<PlanRow> {
    let plan = sqlx::query_as::<_, PlanRow>(
        "INSERT INTO plans (title) \
         VALUES ($1) \
         RETURNING *",
    )
    .bind(title)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<PlanRow>> {
    let plan = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List all plans, newest first.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<PlanRow>> {
    let plans = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}

/// Apply a partial update and return the updated row, or `None` when the
/// plan does not exist.
pub async fn update_plan(
    pool: &PgPool,
    id: Uuid,
    update: &PlanRowUpdate<'_>,
) -> Result<Option<PlanRow>> {
    let plan = sqlx::query_as::<_, PlanRow>(
        "UPDATE plans SET \
             title = COALESCE($2, title), \
             status = COALESCE($3, status), \
             progress = COALESCE($4, progress), \
             total_tasks = COALESCE($5, total_tasks), \
             completed_tasks = COALESCE($6, completed_tasks), \
             total_budget = COALESCE($7, total_budget), \
             spent_budget = COALESCE($8, spent_budget), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(update.title)
    .bind(update.status)
    .bind(update.progress)
    .bind(update.total_tasks)
    .bind(update.completed_tasks)
    .bind(update.total_budget)
    .bind(update.spent_budget)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update plan {id}"))?;

    Ok(plan)
}
