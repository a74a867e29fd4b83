//! PostgreSQL-backed [`PlanStore`].
//!
//! Thin adapter over the `wishpath-db` query layer. Query functions return
//! `anyhow::Result` with context attached; this module digs the underlying
//! `sqlx::Error` out of the chain and classifies it:
//!
//! | cause                                   | kind           |
//! |-----------------------------------------|----------------|
//! | SQLSTATE 28000 / 28P01                  | authentication |
//! | SQLSTATE 42501                          | permission     |
//! | SQLSTATE 23503, missing row             | not found      |
//! | I/O, TLS, pool timeout / closed         | network        |
//! | anything else                           | unknown        |

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use wishpath_db::models::{MilestoneRow, PathRow, PlanRow};
use wishpath_db::queries::milestones::{self as milestone_db, MilestoneRowUpdate};
use wishpath_db::queries::paths as path_db;
use wishpath_db::queries::plans::{self as plan_db, PlanRowUpdate};

use super::trait_def::PlanStore;
use crate::error::{Entity, StoreError};
use crate::model::{
    Milestone, MilestoneUpdate, NewMilestone, NewPath, NewPlan, Path, PathUpdate, Plan,
    PlanFields, PlanMetrics,
};

#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Classify a query failure. `entity`/`id` name the record a not-found
/// condition refers to.
pub fn classify(err: &anyhow::Error, entity: Entity, id: Uuid) -> StoreError {
    match err.chain().find_map(|e| e.downcast_ref::<sqlx::Error>()) {
        Some(sqlx_err) => classify_sqlx(sqlx_err, entity, id),
        None => StoreError::Unknown(format!("{err:#}")),
    }
}

fn classify_sqlx(err: &sqlx::Error, entity: Entity, id: Uuid) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::not_found(entity, id),
        sqlx::Error::Io(e) => StoreError::Network(e.to_string()),
        sqlx::Error::Tls(e) => StoreError::Network(e.to_string()),
        sqlx::Error::PoolTimedOut => {
            StoreError::Network("timed out waiting for a database connection".to_string())
        }
        sqlx::Error::PoolClosed => StoreError::Network("connection pool closed".to_string()),
        sqlx::Error::WorkerCrashed => {
            StoreError::Network("database connection worker crashed".to_string())
        }
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("28000") | Some("28P01") => StoreError::Authentication(db.message().to_string()),
            Some("42501") => StoreError::Permission(db.message().to_string()),
            Some("23503") => StoreError::not_found(entity, id),
            _ => StoreError::Unknown(db.message().to_string()),
        },
        other => StoreError::Unknown(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn percent_from_row(value: i16) -> u8 {
    value.clamp(0, 100) as u8
}

fn count_from_row(value: i32) -> u32 {
    value.max(0) as u32
}

fn plan_from_row(row: PlanRow) -> Plan {
    Plan {
        id: row.id,
        title: row.title,
        status: row.status,
        progress: percent_from_row(row.progress),
        metrics: PlanMetrics {
            total_tasks: count_from_row(row.total_tasks),
            completed_tasks: count_from_row(row.completed_tasks),
            total_budget: row.total_budget,
            spent_budget: row.spent_budget,
        },
        paths: Vec::new(),
    }
}

/// Path progress is not stored; it is filled in by the aggregator.
fn path_from_row(row: PathRow) -> Path {
    Path {
        id: row.id,
        plan_id: row.plan_id,
        title: row.title,
        description: row.description,
        status: row.status,
        progress: 0,
        milestones: Vec::new(),
    }
}

fn milestone_from_row(row: MilestoneRow) -> Milestone {
    Milestone {
        id: row.id,
        path_id: row.path_id,
        title: row.title,
        date: row.date,
        completed: row.completed,
        notes: row.notes,
    }
}

/// Assemble a tree from rows already sorted by position.
fn assemble_tree(plan: PlanRow, paths: Vec<PathRow>, milestones: Vec<MilestoneRow>) -> Plan {
    let mut by_path: HashMap<Uuid, Vec<Milestone>> = HashMap::new();
    for row in milestones {
        by_path
            .entry(row.path_id)
            .or_default()
            .push(milestone_from_row(row));
    }

    let mut tree = plan_from_row(plan);
    tree.paths = paths
        .into_iter()
        .map(|row| {
            let mut path = path_from_row(row);
            path.milestones = by_path.remove(&path.id).unwrap_or_default();
            path
        })
        .collect();
    tree
}

fn not_found_if_zero(rows: u64, entity: Entity, id: Uuid) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::not_found(entity, id))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PlanStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn create_plan(&self, fields: &NewPlan) -> Result<Plan, StoreError> {
        let row = plan_db::insert_plan(&self.pool, &fields.title)
            .await
            .map_err(|e| classify(&e, Entity::Plan, Uuid::nil()))?;
        Ok(plan_from_row(row))
    }

    async fn get_plan_tree(&self, plan_id: Uuid) -> Result<Plan, StoreError> {
        let classify_plan = |e: anyhow::Error| classify(&e, Entity::Plan, plan_id);

        let plan = plan_db::get_plan(&self.pool, plan_id)
            .await
            .map_err(classify_plan)?
            .ok_or_else(|| StoreError::not_found(Entity::Plan, plan_id))?;
        let paths = path_db::list_paths_for_plan(&self.pool, plan_id)
            .await
            .map_err(classify_plan)?;
        let milestones = milestone_db::list_milestones_for_plan(&self.pool, plan_id)
            .await
            .map_err(classify_plan)?;

        Ok(assemble_tree(plan, paths, milestones))
    }

    async fn update_plan(&self, plan_id: Uuid, fields: &PlanFields) -> Result<Plan, StoreError> {
        let update = PlanRowUpdate {
            title: fields.title.as_deref(),
            status: fields.status,
            progress: fields.progress.map(i16::from),
            total_tasks: fields.total_tasks.map(|n| n.min(i32::MAX as u32) as i32),
            completed_tasks: fields.completed_tasks.map(|n| n.min(i32::MAX as u32) as i32),
            total_budget: fields.total_budget,
            spent_budget: fields.spent_budget,
        };
        plan_db::update_plan(&self.pool, plan_id, &update)
            .await
            .map_err(|e| classify(&e, Entity::Plan, plan_id))?
            .ok_or_else(|| StoreError::not_found(Entity::Plan, plan_id))?;

        self.get_plan_tree(plan_id).await
    }

    async fn create_path(&self, plan_id: Uuid, fields: &NewPath) -> Result<Path, StoreError> {
        let row = path_db::insert_path(
            &self.pool,
            plan_id,
            &fields.title,
            &fields.description,
            fields.status,
        )
        .await
        .map_err(|e| classify(&e, Entity::Plan, plan_id))?;
        Ok(path_from_row(row))
    }

    async fn update_path(&self, path_id: Uuid, fields: &PathUpdate) -> Result<(), StoreError> {
        let rows = path_db::update_path(
            &self.pool,
            path_id,
            fields.title.as_deref(),
            fields.description.as_deref(),
            fields.status,
        )
        .await
        .map_err(|e| classify(&e, Entity::Path, path_id))?;
        not_found_if_zero(rows, Entity::Path, path_id)
    }

    async fn delete_path(&self, path_id: Uuid) -> Result<(), StoreError> {
        let rows = path_db::delete_path(&self.pool, path_id)
            .await
            .map_err(|e| classify(&e, Entity::Path, path_id))?;
        not_found_if_zero(rows, Entity::Path, path_id)
    }

    async fn create_milestone(
        &self,
        path_id: Uuid,
        fields: &NewMilestone,
    ) -> Result<Milestone, StoreError> {
        let row = milestone_db::insert_milestone(
            &self.pool,
            path_id,
            &fields.title,
            fields.date,
            fields.notes.as_deref(),
        )
        .await
        .map_err(|e| classify(&e, Entity::Path, path_id))?;
        Ok(milestone_from_row(row))
    }

    async fn update_milestone(
        &self,
        milestone_id: Uuid,
        fields: &MilestoneUpdate,
    ) -> Result<(), StoreError> {
        let update = MilestoneRowUpdate {
            title: fields.title.as_deref(),
            date: fields.date,
            notes: fields.notes.as_deref(),
            completed: fields.completed,
        };
        let rows = milestone_db::update_milestone(&self.pool, milestone_id, &update)
            .await
            .map_err(|e| classify(&e, Entity::Milestone, milestone_id))?;
        not_found_if_zero(rows, Entity::Milestone, milestone_id)
    }

    async fn delete_milestone(&self, milestone_id: Uuid) -> Result<(), StoreError> {
        let rows = milestone_db::delete_milestone(&self.pool, milestone_id)
            .await
            .map_err(|e| classify(&e, Entity::Milestone, milestone_id))?;
        not_found_if_zero(rows, Entity::Milestone, milestone_id)
    }
}
