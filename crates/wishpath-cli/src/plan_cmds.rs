//! Handlers for `wishpath plan` subcommands.
//!
//! - `wishpath plan create <title>`
//! - `wishpath plan list`
//! - `wishpath plan show <plan-id> [--json]`
//! - `wishpath plan update <plan-id> [--title] [--status] [--total-budget] [--spent-budget]`

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use wishpath_core::model::{NewPlan, PlanUpdate};
use wishpath_core::reload::fetch_tree;
use wishpath_core::{CoordinatorConfig, PgPlanStore, PlanStore};
use wishpath_db::queries::plans as plan_db;

use crate::PlanCommands;
use crate::render;
use crate::session::EditSession;

pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    config: &CoordinatorConfig,
) -> Result<()> {
    match command {
        PlanCommands::Create { title } => cmd_create(pool, &title).await,
        PlanCommands::List => cmd_list(pool).await,
        PlanCommands::Show { plan_id, json } => cmd_show(pool, plan_id, json).await,
        PlanCommands::Update {
            plan_id,
            title,
            status,
            total_budget,
            spent_budget,
        } => {
            let updates = PlanUpdate {
                title,
                status,
                total_budget,
                spent_budget,
            };
            cmd_update(pool, config, plan_id, updates).await
        }
    }
}

async fn cmd_create(pool: &PgPool, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        bail!("plan title must not be empty");
    }

    let store = PgPlanStore::new(pool.clone());
    let plan = store
        .create_plan(&NewPlan {
            title: title.to_string(),
        })
        .await
        .context("failed to create plan")?;

    println!("Plan created: {}", plan.id);
    println!("  Title:  {}", plan.title);
    println!("  Status: {}", plan.status);
    println!();
    println!("Next: `wishpath path add {} <title>`", plan.id);
    Ok(())
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let plans = plan_db::list_plans(pool).await?;
    if plans.is_empty() {
        println!("No plans found. Use `wishpath plan create <title>` to create one.");
        return Ok(());
    }
    render::print_plan_table(&plans);
    Ok(())
}

/// Show a plan with freshly derived progress. Read-only: stored aggregates
/// are not corrected here.
async fn cmd_show(pool: &PgPool, plan_id: Uuid, json: bool) -> Result<()> {
    let store = PgPlanStore::new(pool.clone());
    let (plan, _) = fetch_tree(&store, plan_id)
        .await
        .with_context(|| format!("failed to load plan {plan_id}"))?;

    if json {
        let out = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
        println!("{out}");
    } else {
        render::print_tree(&plan);
    }
    Ok(())
}

async fn cmd_update(
    pool: &PgPool,
    config: &CoordinatorConfig,
    plan_id: Uuid,
    updates: PlanUpdate,
) -> Result<()> {
    if updates.is_empty() {
        bail!("nothing to update; pass --title, --status, --total-budget or --spent-budget");
    }

    let session = EditSession::open(pool, plan_id, config).await?;
    let result = session.coordinator().update_plan(updates).await;
    let plan = session.finish().await;
    result?;

    println!("Plan updated.");
    println!();
    render::print_tree(&plan);
    Ok(())
}
