//! Handlers for `wishpath path` subcommands.

use anyhow::{Result, bail};
use sqlx::PgPool;

use wishpath_core::CoordinatorConfig;
use wishpath_core::model::PathUpdate;

use crate::PathCommands;
use crate::render;
use crate::session::EditSession;

pub async fn run_path_command(
    command: PathCommands,
    pool: &PgPool,
    config: &CoordinatorConfig,
) -> Result<()> {
    match command {
        PathCommands::Add { plan_id, title } => {
            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session.coordinator().add_path(&title).await;
            let plan = session.finish().await;
            let path = result?;

            println!("Path created: {}", path.id);
            println!();
            render::print_tree(&plan);
        }
        PathCommands::Update {
            plan_id,
            path_id,
            title,
            description,
            status,
        } => {
            let updates = PathUpdate {
                title,
                description,
                status,
            };
            if updates.is_empty() {
                bail!("nothing to update; pass --title, --description or --status");
            }

            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session.coordinator().update_path(path_id, updates).await;
            let plan = session.finish().await;
            result?;

            println!("Path {path_id} updated.");
            println!();
            render::print_tree(&plan);
        }
        PathCommands::Delete { plan_id, path_id } => {
            let session = EditSession::open(pool, plan_id, config).await?;
            let result = session.coordinator().delete_path(path_id).await;
            let plan = session.finish().await;
            result?;

            println!("Path {path_id} deleted.");
            println!();
            render::print_tree(&plan);
        }
    }
    Ok(())
}
