mod config;
mod milestone_cmds;
mod path_cmds;
mod plan_cmds;
mod render;
mod session;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use wishpath_db::config::DbConfig;
use wishpath_db::models::{PathStatus, PlanStatus};
use wishpath_db::pool;

use config::WishpathConfig;

#[derive(Parser)]
#[command(name = "wishpath", about = "Track plans, paths and milestones")]
struct Cli {
    /// Database URL (overrides WISHPATH_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a wishpath config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database and run migrations
    DbInit,
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Path management
    Path {
        #[command(subcommand)]
        command: PathCommands,
    },
    /// Milestone management
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create an empty draft plan
    Create {
        title: String,
    },
    /// List all plans
    List,
    /// Show a plan with its paths and milestones
    Show {
        plan_id: Uuid,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit plan header fields
    Update {
        plan_id: Uuid,
        #[arg(long)]
        title: Option<String>,
        /// draft, review, active, completed or archived
        #[arg(long)]
        status: Option<PlanStatus>,
        #[arg(long)]
        total_budget: Option<f64>,
        #[arg(long)]
        spent_budget: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum PathCommands {
    /// Add an empty path to a plan
    Add {
        plan_id: Uuid,
        title: String,
    },
    /// Edit a path
    Update {
        plan_id: Uuid,
        path_id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// planning, in_progress, completed or paused
        #[arg(long)]
        status: Option<PathStatus>,
    },
    /// Delete a path and its milestones
    Delete {
        plan_id: Uuid,
        path_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum MilestoneCommands {
    /// Add a milestone to a path
    Add {
        plan_id: Uuid,
        path_id: Uuid,
        title: String,
        /// Target date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Flip a milestone between completed and not completed
    Toggle {
        plan_id: Uuid,
        path_id: Uuid,
        milestone_id: Uuid,
    },
    /// Edit a milestone
    Update {
        plan_id: Uuid,
        path_id: Uuid,
        milestone_id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Delete a milestone
    Delete {
        plan_id: Uuid,
        path_id: Uuid,
        milestone_id: Uuid,
    },
}

/// Execute the `wishpath init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        session: config::SessionSection::default(),
    };
    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `wishpath db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `wishpath db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = WishpathConfig::resolve(cli_db_url)?;

    println!("Initializing wishpath database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("wishpath db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Plan { command } => {
            let resolved = WishpathConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                plan_cmds::run_plan_command(command, &db_pool, &resolved.coordinator).await;
            db_pool.close().await;
            result?;
        }
        Commands::Path { command } => {
            let resolved = WishpathConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                path_cmds::run_path_command(command, &db_pool, &resolved.coordinator).await;
            db_pool.close().await;
            result?;
        }
        Commands::Milestone { command } => {
            let resolved = WishpathConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                milestone_cmds::run_milestone_command(command, &db_pool, &resolved.coordinator)
                    .await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::ffi::{OsStr, OsString};
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets or clears an env var and restores the previous value on drop.
    /// Only use while holding [`lock_env`].
    pub struct EnvGuard {
        key: &'static str,
        original: Option<OsString>,
    }

    impl EnvGuard {
        pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
            let original = std::env::var_os(key);
            unsafe { std::env::set_var(key, value) };
            Self { key, original }
        }

        pub fn unset(key: &'static str) -> Self {
            let original = std::env::var_os(key);
            unsafe { std::env::remove_var(key) };
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => unsafe { std::env::set_var(self.key, value) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }
}
