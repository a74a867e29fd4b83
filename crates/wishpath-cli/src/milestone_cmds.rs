//! Handlers for `wishpath milestone` subcommands.
//!
//! `toggle` and `update` are applied optimistically by the coordinator; the
//! command still waits for the follow-up reload before printing.

use anyhow::{Result, bail};
use sqlx::PgPool;

use wishpath_core::CoordinatorConfig;
use wishpath_core::model::{MilestoneUpdate, NewMilestone};

use crate::MilestoneCommands;
use crate::render;
use crate::session::EditSession;

pub async fn run_milestone_command(
    command: MilestoneCommands,
    pool: &PgPool,
    config: &CoordinatorConfig,
) -> Result<()> {
    match command {
        MilestoneCommands::Add {
            plan_id,
            path_id,
            title,
            date,
            notes,
        } => {
            let mut milestone = NewMilestone::new(title);
            if let Some(date) = date {
                milestone = milestone.with_date(date);
            }
            if let Some(notes) = notes {
                milestone = milestone.with_notes(notes);
            }

            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session.coordinator().add_milestone(path_id, milestone).await;
            let plan = session.finish().await;
            let created = result?;

            println!("Milestone created: {}", created.id);
            println!();
            render::print_tree(&plan);
        }
        MilestoneCommands::Toggle {
            plan_id,
            path_id,
            milestone_id,
        } => {
            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session
                .coordinator()
                .toggle_milestone_completion(path_id, milestone_id)
                .await;
            let plan = session.finish().await;
            let completed = result?;

            let state = if completed { "completed" } else { "not completed" };
            println!("Milestone {milestone_id} marked {state}.");
            println!();
            render::print_tree(&plan);
        }
        MilestoneCommands::Update {
            plan_id,
            path_id,
            milestone_id,
            title,
            date,
            notes,
            completed,
        } => {
            let updates = MilestoneUpdate {
                title,
                date,
                notes,
                completed,
            };
            if updates.is_empty() {
                bail!("nothing to update; pass --title, --date, --notes or --completed");
            }

            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session
                .coordinator()
                .update_milestone(path_id, milestone_id, updates)
                .await;
            let plan = session.finish().await;
            result?;

            println!("Milestone {milestone_id} updated.");
            println!();
            render::print_tree(&plan);
        }
        MilestoneCommands::Delete {
            plan_id,
            path_id,
            milestone_id,
        } => {
            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session
                .coordinator()
                .delete_milestone(path_id, milestone_id)
                .await;
            let plan = session.finish().await;
            result?;

            println!("Milestone {milestone_id} deleted.");
            println!();
            render::print_tree(&plan);
        }
    }
    Ok(())
}
