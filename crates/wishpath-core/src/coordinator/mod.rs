//! Mutation coordinator: applies one logical edit to a plan at a time.
//!
//! Two flavours of operation:
//!
//! - **Structural** (add/update/delete path, add/delete milestone, plan
//!   header edits): the store is called first and the local tree is only
//!   touched by the reload that follows a confirmed write.
//! - **Optimistic** (toggle/update milestone): the edit and the derived
//!   progress are applied locally before the store call. A failure restores
//!   the pre-edit snapshot verbatim; a confirmed completion change schedules
//!   a debounced reload.
//!
//! Every failure is returned to the caller and also published once on the
//! session's notification channel. Nothing retries.

mod in_flight;

use std::sync::Arc;

use uuid::Uuid;

use crate::aggregate::refresh_derived;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Entity, Operation};
use crate::model::{
    Milestone, MilestoneUpdate, NewMilestone, NewPath, Path, PathUpdate, Plan, PlanFields,
    PlanUpdate,
};
use crate::reload::{fetch_tree, ReloadController};
use crate::session::{Notification, PlanSession};
use crate::store::PlanStore;

use in_flight::{InFlight, InFlightGuard};

/// Coordinates edits to a single plan session. Cheap to clone; clones share
/// the session, the reload controller and the in-flight set.
#[derive(Clone)]
pub struct MutationCoordinator {
    store: Arc<dyn PlanStore>,
    session: PlanSession,
    reload: ReloadController,
    in_flight: InFlight,
}

impl MutationCoordinator {
    /// Build a coordinator around an existing session.
    pub fn new(
        store: Arc<dyn PlanStore>,
        session: PlanSession,
        config: &CoordinatorConfig,
    ) -> Self {
        let reload = ReloadController::new(
            Arc::clone(&store),
            session.clone(),
            config.reload_debounce,
        );
        Self {
            store,
            session,
            reload,
            in_flight: InFlight::default(),
        }
    }

    /// Load a plan from the store and start a session for it.
    pub async fn open(
        store: Arc<dyn PlanStore>,
        plan_id: Uuid,
        config: &CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let (plan, write_back) = fetch_tree(store.as_ref(), plan_id)
            .await
            .map_err(|e| CoordinatorError::store(Operation::Reload, e))?;

        tracing::info!(
            plan_id = %plan_id,
            paths = plan.paths.len(),
            progress = plan.progress,
            "plan session opened"
        );

        let session = PlanSession::new(plan, config.notification_capacity);
        let coordinator = Self::new(store, session, config);
        if let Some(fields) = write_back {
            coordinator.reload.write_back(&fields).await;
        }
        Ok(coordinator)
    }

    pub fn session(&self) -> &PlanSession {
        &self.session
    }

    pub fn reload_controller(&self) -> &ReloadController {
        &self.reload
    }

    pub fn plan_id(&self) -> Uuid {
        self.session.plan_id()
    }

    // -----------------------------------------------------------------------
    // Structural operations
    // -----------------------------------------------------------------------

    /// Create a new empty path in `planning` status.
    pub async fn add_path(&self, title: &str) -> Result<Path, CoordinatorError> {
        let op = Operation::AddPath;
        let title = self.validate_title(op, title)?;

        let path = self
            .store
            .create_path(self.plan_id(), &NewPath::titled(title))
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(plan_id = %self.plan_id(), path_id = %path.id, "path created");
        self.reload.refresh_after_commit().await;
        Ok(path)
    }

    pub async fn update_path(
        &self,
        path_id: Uuid,
        mut updates: PathUpdate,
    ) -> Result<(), CoordinatorError> {
        let op = Operation::UpdatePath;
        if updates.is_empty() {
            return Err(self.fail(CoordinatorError::InvalidInput("nothing to update".into()), op));
        }
        updates.title = self.validate_optional_title(op, updates.title)?;
        self.require_path(op, path_id)?;
        let _guard = self.claim(op, Entity::Path, path_id)?;

        self.store
            .update_path(path_id, &updates)
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(plan_id = %self.plan_id(), path_id = %path_id, "path updated");
        self.reload.refresh_after_commit().await;
        Ok(())
    }

    /// Delete a path and, through the store's cascade, its milestones.
    pub async fn delete_path(&self, path_id: Uuid) -> Result<(), CoordinatorError> {
        let op = Operation::DeletePath;
        self.require_path(op, path_id)?;
        let _guard = self.claim(op, Entity::Path, path_id)?;

        self.store
            .delete_path(path_id)
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(plan_id = %self.plan_id(), path_id = %path_id, "path deleted");
        self.reload.refresh_after_commit().await;
        Ok(())
    }

    /// Create an incomplete milestone at the end of a path.
    pub async fn add_milestone(
        &self,
        path_id: Uuid,
        milestone: NewMilestone,
    ) -> Result<Milestone, CoordinatorError> {
        let op = Operation::AddMilestone;
        let title = self.validate_title(op, &milestone.title)?;
        self.require_path(op, path_id)?;

        let milestone = NewMilestone { title, ..milestone };
        let created = self
            .store
            .create_milestone(path_id, &milestone)
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(
            plan_id = %self.plan_id(),
            path_id = %path_id,
            milestone_id = %created.id,
            "milestone created"
        );
        self.reload.refresh_after_commit().await;
        Ok(created)
    }

    pub async fn delete_milestone(
        &self,
        path_id: Uuid,
        milestone_id: Uuid,
    ) -> Result<(), CoordinatorError> {
        let op = Operation::DeleteMilestone;
        self.require_milestone(op, path_id, milestone_id)?;
        let _guard = self.claim(op, Entity::Milestone, milestone_id)?;

        self.store
            .delete_milestone(milestone_id)
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(
            plan_id = %self.plan_id(),
            milestone_id = %milestone_id,
            "milestone deleted"
        );
        self.reload.refresh_after_commit().await;
        Ok(())
    }

    /// Edit plan header fields such as the title, a manual status change or
    /// the budgets. Returns the reloaded plan.
    pub async fn update_plan(&self, mut updates: PlanUpdate) -> Result<Plan, CoordinatorError> {
        let op = Operation::UpdatePlan;
        if updates.is_empty() {
            return Err(self.fail(CoordinatorError::InvalidInput("nothing to update".into()), op));
        }
        updates.title = self.validate_optional_title(op, updates.title)?;
        let plan_id = self.plan_id();
        let _guard = self.claim(op, Entity::Plan, plan_id)?;

        self.store
            .update_plan(plan_id, &PlanFields::from(&updates))
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))?;

        tracing::info!(plan_id = %plan_id, "plan updated");
        self.reload.refresh_after_commit().await;
        Ok(self.session.snapshot())
    }

    // -----------------------------------------------------------------------
    // Optimistic operations
    // -----------------------------------------------------------------------

    /// Flip a milestone's completion flag. Returns the new value.
    ///
    /// The flip and the recomputed progress are visible to subscribers while
    /// the store call is outstanding.
    pub async fn toggle_milestone_completion(
        &self,
        path_id: Uuid,
        milestone_id: Uuid,
    ) -> Result<bool, CoordinatorError> {
        let op = Operation::ToggleMilestone;
        let _guard = self.claim(op, Entity::Milestone, milestone_id)?;
        let completed = !self.require_milestone(op, path_id, milestone_id)?.completed;

        let snapshot = self.apply_optimistic(|plan| {
            if let Some(milestone) = plan.milestone_mut(path_id, milestone_id) {
                milestone.completed = completed;
            }
        });

        match self
            .store
            .update_milestone(milestone_id, &MilestoneUpdate::completed(completed))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    plan_id = %self.plan_id(),
                    milestone_id = %milestone_id,
                    completed,
                    "milestone completion confirmed"
                );
                self.reload.schedule_reload();
                Ok(completed)
            }
            Err(e) => {
                self.rollback(op, snapshot);
                Err(self.fail(CoordinatorError::store(op, e), op))
            }
        }
    }

    /// Apply a partial milestone edit optimistically. A debounced reload is
    /// scheduled only when the edit touches `completed`.
    pub async fn update_milestone(
        &self,
        path_id: Uuid,
        milestone_id: Uuid,
        mut updates: MilestoneUpdate,
    ) -> Result<(), CoordinatorError> {
        let op = Operation::UpdateMilestone;
        if updates.is_empty() {
            return Err(self.fail(CoordinatorError::InvalidInput("nothing to update".into()), op));
        }
        updates.title = self.validate_optional_title(op, updates.title)?;
        let _guard = self.claim(op, Entity::Milestone, milestone_id)?;
        self.require_milestone(op, path_id, milestone_id)?;

        let snapshot = self.apply_optimistic(|plan| {
            if let Some(milestone) = plan.milestone_mut(path_id, milestone_id) {
                updates.apply_to(milestone);
            }
        });

        match self.store.update_milestone(milestone_id, &updates).await {
            Ok(()) => {
                tracing::info!(
                    plan_id = %self.plan_id(),
                    milestone_id = %milestone_id,
                    "milestone update confirmed"
                );
                if updates.completed.is_some() {
                    self.reload.schedule_reload();
                }
                Ok(())
            }
            Err(e) => {
                self.rollback(op, snapshot);
                Err(self.fail(CoordinatorError::store(op, e), op))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Resync
    // -----------------------------------------------------------------------

    /// Refetch the plan from the store right away.
    pub async fn reload(&self) -> Result<(), CoordinatorError> {
        let op = Operation::Reload;
        self.reload
            .reload_now()
            .await
            .map_err(|e| self.fail(CoordinatorError::store(op, e), op))
    }

    /// Wait for any debounced reload to finish.
    pub async fn settle(&self) {
        self.reload.settle().await;
    }

    /// Cancel pending reloads. Operations still work but schedule nothing.
    pub fn shutdown(&self) {
        self.reload.shutdown();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Snapshot the tree, then apply `edit` and re-derive progress.
    fn apply_optimistic(&self, edit: impl FnOnce(&mut Plan)) -> Plan {
        let snapshot = self.session.snapshot();
        self.session.modify(|plan| {
            edit(plan);
            refresh_derived(plan);
            true
        });
        snapshot
    }

    fn rollback(&self, op: Operation, snapshot: Plan) {
        self.session.replace(snapshot);
        tracing::warn!(
            plan_id = %self.plan_id(),
            operation = %op,
            "optimistic change rolled back"
        );
    }

    /// Log and publish a failure, handing the error back for returning.
    fn fail(&self, err: CoordinatorError, op: Operation) -> CoordinatorError {
        tracing::warn!(
            plan_id = %self.plan_id(),
            operation = %op,
            kind = %err.kind(),
            error = %err,
            "operation failed"
        );
        self.session.notify(Notification::failed(op, &err));
        err
    }

    fn claim(
        &self,
        op: Operation,
        entity: Entity,
        id: Uuid,
    ) -> Result<InFlightGuard, CoordinatorError> {
        self.in_flight.claim(entity, id).map_err(|e| self.fail(e, op))
    }

    fn validate_title(&self, op: Operation, title: &str) -> Result<String, CoordinatorError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(self.fail(
                CoordinatorError::InvalidInput("title must not be empty".into()),
                op,
            ));
        }
        Ok(trimmed.to_string())
    }

    fn validate_optional_title(
        &self,
        op: Operation,
        title: Option<String>,
    ) -> Result<Option<String>, CoordinatorError> {
        title.map(|t| self.validate_title(op, &t)).transpose()
    }

    fn require_path(&self, op: Operation, path_id: Uuid) -> Result<(), CoordinatorError> {
        if self.session.with_plan(|plan| plan.path(path_id).is_some()) {
            Ok(())
        } else {
            Err(self.fail(CoordinatorError::UnknownPath(path_id), op))
        }
    }

    fn require_milestone(
        &self,
        op: Operation,
        path_id: Uuid,
        milestone_id: Uuid,
    ) -> Result<Milestone, CoordinatorError> {
        let found = self.session.with_plan(|plan| match plan.path(path_id) {
            None => Err(CoordinatorError::UnknownPath(path_id)),
            Some(path) => path
                .milestone(milestone_id)
                .cloned()
                .ok_or(CoordinatorError::UnknownMilestone {
                    path_id,
                    milestone_id,
                }),
        });
        found.map_err(|e| self.fail(e, op))
    }
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("plan_id", &self.plan_id())
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::PlanStatus;
    use crate::store::MemoryStore;

    async fn seeded() -> (Arc<MemoryStore>, MutationCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let plan = store
            .create_plan(&crate::model::NewPlan {
                title: "Marathon".into(),
            })
            .await
            .unwrap();
        let path = store
            .create_path(plan.id, &NewPath::titled("Base miles"))
            .await
            .unwrap();
        for title in ["5k", "10k"] {
            store
                .create_milestone(path.id, &NewMilestone::new(title))
                .await
                .unwrap();
        }
        let coordinator =
            MutationCoordinator::open(store.clone(), plan.id, &CoordinatorConfig::default())
                .await
                .unwrap();
        (store, coordinator)
    }

    #[tokio::test]
    async fn open_derives_and_writes_back_counts() {
        let (store, coordinator) = seeded().await;
        let tree = coordinator.session().snapshot();
        assert_eq!(tree.metrics.total_tasks, 2);
        assert_eq!(tree.status, PlanStatus::Draft);

        let stored = store.plan(tree.id).await.unwrap();
        assert_eq!(stored.metrics.total_tasks, 2);
    }

    #[tokio::test]
    async fn blank_titles_are_rejected_before_the_store() {
        let (store, coordinator) = seeded().await;
        let mut notes = coordinator.session().notifications();

        let err = coordinator.add_path("   ").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidInput(_)));
        assert_eq!(store.plan(coordinator.plan_id()).await.unwrap().paths.len(), 1);
        assert!(matches!(
            notes.recv().await.unwrap(),
            Notification::OperationFailed {
                operation: Operation::AddPath,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_milestone_is_not_found() {
        let (_store, coordinator) = seeded().await;
        let path_id = coordinator.session().snapshot().paths[0].id;
        let err = coordinator
            .toggle_milestone_completion(path_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn title_only_milestone_edit_schedules_no_reload() {
        let (_store, coordinator) = seeded().await;
        let tree = coordinator.session().snapshot();
        let path_id = tree.paths[0].id;
        let milestone_id = tree.paths[0].milestones[0].id;

        coordinator
            .update_milestone(
                path_id,
                milestone_id,
                MilestoneUpdate {
                    title: Some("Parkrun".into()),
                    ..MilestoneUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!(!coordinator.reload_controller().has_pending());
        let tree = coordinator.session().snapshot();
        assert_eq!(tree.paths[0].milestones[0].title, "Parkrun");
    }
}
