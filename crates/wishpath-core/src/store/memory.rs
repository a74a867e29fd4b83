//! In-process [`PlanStore`] backed by a map of plan trees.
//!
//! Used by tests and for running the engine without a database. Ids are
//! assigned with `Uuid::new_v4`; ordering follows insertion order like the
//! PostgreSQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::trait_def::PlanStore;
use crate::error::{Entity, StoreError};
use crate::model::{
    Milestone, MilestoneUpdate, NewMilestone, NewPath, NewPlan, Path, PathUpdate, Plan,
    PlanFields,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    plans: Mutex<HashMap<Uuid, Plan>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a complete tree, replacing any plan with the same
    /// id.
    pub async fn insert_plan(&self, plan: Plan) {
        self.plans.lock().await.insert(plan.id, plan);
    }

    /// Current stored copy of a plan, if any.
    pub async fn plan(&self, plan_id: Uuid) -> Option<Plan> {
        self.plans.lock().await.get(&plan_id).cloned()
    }
}

fn find_path(plans: &mut HashMap<Uuid, Plan>, path_id: Uuid) -> Option<&mut Path> {
    plans.values_mut().find_map(|plan| plan.path_mut(path_id))
}

fn find_milestone(plans: &mut HashMap<Uuid, Plan>, milestone_id: Uuid) -> Option<&mut Milestone> {
    plans
        .values_mut()
        .flat_map(|plan| plan.paths.iter_mut())
        .flat_map(|path| path.milestones.iter_mut())
        .find(|m| m.id == milestone_id)
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn create_plan(&self, fields: &NewPlan) -> Result<Plan, StoreError> {
        let plan = Plan::new(Uuid::new_v4(), fields.title.clone());
        self.plans.lock().await.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_plan_tree(&self, plan_id: Uuid) -> Result<Plan, StoreError> {
        self.plans
            .lock()
            .await
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Plan, plan_id))
    }

    async fn update_plan(&self, plan_id: Uuid, fields: &PlanFields) -> Result<Plan, StoreError> {
        let mut plans = self.plans.lock().await;
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| StoreError::not_found(Entity::Plan, plan_id))?;
        fields.apply_to(plan);
        Ok(plan.clone())
    }

    async fn create_path(&self, plan_id: Uuid, fields: &NewPath) -> Result<Path, StoreError> {
        let mut plans = self.plans.lock().await;
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| StoreError::not_found(Entity::Plan, plan_id))?;
        let path = Path {
            id: Uuid::new_v4(),
            plan_id,
            title: fields.title.clone(),
            description: fields.description.clone(),
            status: fields.status,
            progress: 0,
            milestones: Vec::new(),
        };
        plan.paths.push(path.clone());
        Ok(path)
    }

    async fn update_path(&self, path_id: Uuid, fields: &PathUpdate) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().await;
        let path = find_path(&mut plans, path_id)
            .ok_or_else(|| StoreError::not_found(Entity::Path, path_id))?;
        fields.apply_to(path);
        Ok(())
    }

    async fn delete_path(&self, path_id: Uuid) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().await;
        for plan in plans.values_mut() {
            if let Some(pos) = plan.paths.iter().position(|p| p.id == path_id) {
                plan.paths.remove(pos);
                return Ok(());
            }
        }
        Err(StoreError::not_found(Entity::Path, path_id))
    }

    async fn create_milestone(
        &self,
        path_id: Uuid,
        fields: &NewMilestone,
    ) -> Result<Milestone, StoreError> {
        let mut plans = self.plans.lock().await;
        let path = find_path(&mut plans, path_id)
            .ok_or_else(|| StoreError::not_found(Entity::Path, path_id))?;
        let milestone = Milestone {
            id: Uuid::new_v4(),
            path_id,
            title: fields.title.clone(),
            date: fields.date,
            completed: false,
            notes: fields.notes.clone(),
        };
        path.milestones.push(milestone.clone());
        Ok(milestone)
    }

    async fn update_milestone(
        &self,
        milestone_id: Uuid,
        fields: &MilestoneUpdate,
    ) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().await;
        let milestone = find_milestone(&mut plans, milestone_id)
            .ok_or_else(|| StoreError::not_found(Entity::Milestone, milestone_id))?;
        fields.apply_to(milestone);
        Ok(())
    }

    async fn delete_milestone(&self, milestone_id: Uuid) -> Result<(), StoreError> {
        let mut plans = self.plans.lock().await;
        for path in plans.values_mut().flat_map(|plan| plan.paths.iter_mut()) {
            if let Some(pos) = path.milestones.iter().position(|m| m.id == milestone_id) {
                path.milestones.remove(pos);
                return Ok(());
            }
        }
        Err(StoreError::not_found(Entity::Milestone, milestone_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn create_and_fetch_tree() {
        let store = MemoryStore::new();
        let plan = store
            .create_plan(&NewPlan {
                title: "Learn Japanese".into(),
            })
            .await
            .unwrap();
        let path = store
            .create_path(plan.id, &NewPath::titled("Vocabulary"))
            .await
            .unwrap();
        let first = store
            .create_milestone(path.id, &NewMilestone::new("Hiragana"))
            .await
            .unwrap();
        store
            .create_milestone(path.id, &NewMilestone::new("Katakana"))
            .await
            .unwrap();

        let tree = store.get_plan_tree(plan.id).await.unwrap();
        assert_eq!(tree.paths.len(), 1);
        let titles: Vec<&str> = tree.paths[0]
            .milestones
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Hiragana", "Katakana"]);
        assert!(!tree.paths[0].milestones[0].completed);
        assert_eq!(tree.paths[0].milestones[0].id, first.id);
    }

    #[tokio::test]
    async fn delete_path_cascades_to_milestones() {
        let store = MemoryStore::new();
        let plan = store
            .create_plan(&NewPlan { title: "p".into() })
            .await
            .unwrap();
        let path = store
            .create_path(plan.id, &NewPath::titled("a"))
            .await
            .unwrap();
        let milestone = store
            .create_milestone(path.id, &NewMilestone::new("m"))
            .await
            .unwrap();

        store.delete_path(path.id).await.unwrap();
        let err = store
            .update_milestone(milestone.id, &MilestoneUpdate::completed(true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert_eq!(
            store.get_plan_tree(id).await.unwrap_err(),
            StoreError::not_found(Entity::Plan, id)
        );
        assert_eq!(
            store.delete_path(id).await.unwrap_err(),
            StoreError::not_found(Entity::Path, id)
        );
        assert_eq!(
            store
                .create_milestone(id, &NewMilestone::new("m"))
                .await
                .unwrap_err(),
            StoreError::not_found(Entity::Path, id)
        );
    }
}
