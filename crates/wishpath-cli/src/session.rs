//! One-shot editing session used by every mutating command.
//!
//! Opens a coordinator on the PostgreSQL store, lets the command run one
//! operation, then waits for any debounced reload so the printed tree is
//! the settled one. Notifications raised along the way go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use wishpath_core::model::Plan;
use wishpath_core::{CoordinatorConfig, MutationCoordinator, Notification, PgPlanStore};

pub struct EditSession {
    coordinator: MutationCoordinator,
    notifications: broadcast::Receiver<Notification>,
}

impl EditSession {
    pub async fn open(pool: &PgPool, plan_id: Uuid, config: &CoordinatorConfig) -> Result<Self> {
        let store = Arc::new(PgPlanStore::new(pool.clone()));
        let coordinator = MutationCoordinator::open(store, plan_id, config)
            .await
            .with_context(|| format!("failed to open plan {plan_id}"))?;
        let notifications = coordinator.session().notifications();
        tracing::debug!(plan_id = %plan_id, "edit session opened");
        Ok(Self {
            coordinator,
            notifications,
        })
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Settle pending reloads, report notifications and return the final
    /// tree.
    pub async fn finish(mut self) -> Plan {
        self.coordinator.settle().await;
        self.coordinator.shutdown();

        loop {
            match self.notifications.try_recv() {
                Ok(notification) => crate::render::print_notification(&notification),
                Err(TryRecvError::Lagged(skipped)) => {
                    eprintln!("warning: {skipped} notifications were dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        self.coordinator.session().snapshot()
    }
}
