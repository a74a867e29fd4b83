//! Database query functions for the `milestones` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MilestoneRow;

/// Column updates for a milestone row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct MilestoneRowUpdate<'a> {
    pub title: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub notes: Option<&'a str>,
    pub completed: Option<bool>,
}

/// Insert an incomplete milestone at the end of its path.
///
/// Fails with a foreign-key violation when `path_id` does not exist.
pub async fn insert_milestone(
    pool: &PgPool,
    path_id: Uuid,
    title: &str,
    date: NaiveDate,
    notes: Option<&str>,
) -> Result<MilestoneRow> {
    let milestone = sqlx::query_as::<_, MilestoneRow>(
        "INSERT INTO milestones (path_id, title, date, notes, completed, position) \
         VALUES ($1, $2, $3, $4, FALSE, \
                 (SELECT COALESCE(MAX(position) + 1, 0) FROM milestones WHERE path_id = $1)) \
         RETURNING *",
    )
    .bind(path_id)
    .bind(title)
    .bind(date)
    .bind(notes)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert milestone into path {path_id}"))?;

    Ok(milestone)
}

/// List every milestone belonging to any path of `plan_id`, ordered by
/// path then position.
pub async fn list_milestones_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<MilestoneRow>> {
    let milestones = sqlx::query_as::<_, MilestoneRow>(
        "SELECT m.* FROM milestones m \
         JOIN paths p ON p.id = m.path_id \
         WHERE p.plan_id = $1 \
         ORDER BY p.position, m.position, m.created_at",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list milestones for plan {plan_id}"))?;

    Ok(milestones)
}

/// Apply a partial update. Returns rows affected.
pub async fn update_milestone(
    pool: &PgPool,
    id: Uuid,
    update: &MilestoneRowUpdate<'_>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE milestones SET \
             title = COALESCE($2, title), \
             date = COALESCE($3, date), \
             notes = COALESCE($4, notes), \
             completed = COALESCE($5, completed) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.title)
    .bind(update.date)
    .bind(update.notes)
    .bind(update.completed)
    .execute(pool)
    .await
    .with_context(|| format!("failed to update milestone {id}"))?;

    Ok(result.rows_affected())
}

/// Delete a milestone. Returns rows affected.
pub async fn delete_milestone(pool: &PgPool, id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM milestones WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete milestone {id}"))?;

    Ok(result.rows_affected())
}
