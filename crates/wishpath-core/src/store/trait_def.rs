//! The `PlanStore` trait -- the remote persistence collaborator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Milestone, MilestoneUpdate, NewMilestone, NewPath, NewPlan, Path, PathUpdate, Plan,
    PlanFields,
};

/// Opaque create/update/delete service keyed by entity id.
///
/// Every call is an await point; the coordinator treats the interval between
/// issuing a call and receiving its result as the window in which optimistic
/// state is visible. Implementations classify failures into the variants of
/// [`StoreError`] and never retry on their own.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Create an empty draft plan.
    async fn create_plan(&self, fields: &NewPlan) -> Result<Plan, StoreError>;

    /// Fetch a plan with all of its paths and milestones, in stored order.
    ///
    /// Derived fields are returned as stored; callers re-derive them.
    async fn get_plan_tree(&self, plan_id: Uuid) -> Result<Plan, StoreError>;

    /// Update plan columns and return the full updated tree.
    async fn update_plan(&self, plan_id: Uuid, fields: &PlanFields) -> Result<Plan, StoreError>;

    /// Create a path with no milestones, appended after existing paths.
    async fn create_path(&self, plan_id: Uuid, fields: &NewPath) -> Result<Path, StoreError>;

    async fn update_path(&self, path_id: Uuid, fields: &PathUpdate) -> Result<(), StoreError>;

    /// Delete a path together with its milestones.
    async fn delete_path(&self, path_id: Uuid) -> Result<(), StoreError>;

    /// Create an incomplete milestone, appended after existing milestones.
    async fn create_milestone(
        &self,
        path_id: Uuid,
        fields: &NewMilestone,
    ) -> Result<Milestone, StoreError>;

    async fn update_milestone(
        &self,
        milestone_id: Uuid,
        fields: &MilestoneUpdate,
    ) -> Result<(), StoreError>;

    async fn delete_milestone(&self, milestone_id: Uuid) -> Result<(), StoreError>;
}

// Compile-time assertion: PlanStore must be usable as `dyn PlanStore`.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};
