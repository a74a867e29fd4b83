//! A [`PlanStore`] wrapper for exercising failure and in-flight behaviour.
//!
//! ```ignore
//! let store = FaultyStore::new();
//! store.fail_next(StoreCall::UpdateMilestone, StoreError::Network("reset".into()));
//! store.hold(StoreCall::UpdateMilestone);
//! // ... start an operation, observe optimistic state ...
//! store.wait_for_parked().await;
//! store.release();
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use uuid::Uuid;

use wishpath_core::error::StoreError;
use wishpath_core::model::{
    Milestone, MilestoneUpdate, NewMilestone, NewPath, NewPlan, Path, PathUpdate, Plan, PlanFields,
};
use wishpath_core::store::{MemoryStore, PlanStore};

/// One method of [`PlanStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    CreatePlan,
    GetPlanTree,
    UpdatePlan,
    CreatePath,
    UpdatePath,
    DeletePath,
    CreateMilestone,
    UpdateMilestone,
    DeleteMilestone,
}

/// [`MemoryStore`] plus scripted failures, a call log and a gate.
pub struct FaultyStore {
    inner: MemoryStore,
    next_failures: Mutex<HashMap<StoreCall, VecDeque<StoreError>>>,
    always_failing: Mutex<HashMap<StoreCall, StoreError>>,
    calls: Mutex<Vec<StoreCall>>,
    held: Mutex<HashSet<StoreCall>>,
    gate: watch::Sender<bool>,
    parked: Notify,
}

impl Default for FaultyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultyStore {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: MemoryStore::new(),
            next_failures: Mutex::new(HashMap::new()),
            always_failing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(HashSet::new()),
            gate,
            parked: Notify::new(),
        }
    }

    /// The wrapped store, for seeding and inspecting persisted state.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Make the next call of `call` fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, call: StoreCall, err: StoreError) {
        self.next_failures
            .lock()
            .unwrap()
            .entry(call)
            .or_default()
            .push_back(err);
    }

    /// Make every call of `call` fail with `err` until [`Self::heal`].
    pub fn fail_always(&self, call: StoreCall, err: StoreError) {
        self.always_failing.lock().unwrap().insert(call, err);
    }

    /// Clear every scripted failure.
    pub fn heal(&self) {
        self.next_failures.lock().unwrap().clear();
        self.always_failing.lock().unwrap().clear();
    }

    /// Park calls of `call` until [`Self::release`].
    pub fn hold(&self, call: StoreCall) {
        self.held.lock().unwrap().insert(call);
        self.gate.send_replace(false);
    }

    /// Let every parked call continue and stop holding.
    pub fn release(&self) {
        self.held.lock().unwrap().clear();
        self.gate.send_replace(true);
    }

    /// Resolves once a held call has parked.
    pub async fn wait_for_parked(&self) {
        self.parked.notified().await;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, call: StoreCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    async fn enter(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call);

        let held = self.held.lock().unwrap().contains(&call);
        if held {
            let mut gate = self.gate.subscribe();
            self.parked.notify_one();
            let _ = gate.wait_for(|open| *open).await;
        }

        if let Some(err) = self
            .next_failures
            .lock()
            .unwrap()
            .get_mut(&call)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if let Some(err) = self.always_failing.lock().unwrap().get(&call) {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl PlanStore for FaultyStore {
    async fn create_plan(&self, fields: &NewPlan) -> Result<Plan, StoreError> {
        self.enter(StoreCall::CreatePlan).await?;
        self.inner.create_plan(fields).await
    }

    async fn get_plan_tree(&self, plan_id: Uuid) -> Result<Plan, StoreError> {
        self.enter(StoreCall::GetPlanTree).await?;
        self.inner.get_plan_tree(plan_id).await
    }

    async fn update_plan(&self, plan_id: Uuid, fields: &PlanFields) -> Result<Plan, StoreError> {
        self.enter(StoreCall::UpdatePlan).await?;
        self.inner.update_plan(plan_id, fields).await
    }

    async fn create_path(&self, plan_id: Uuid, fields: &NewPath) -> Result<Path, StoreError> {
        self.enter(StoreCall::CreatePath).await?;
        self.inner.create_path(plan_id, fields).await
    }

    async fn update_path(&self, path_id: Uuid, fields: &PathUpdate) -> Result<(), StoreError> {
        self.enter(StoreCall::UpdatePath).await?;
        self.inner.update_path(path_id, fields).await
    }

    async fn delete_path(&self, path_id: Uuid) -> Result<(), StoreError> {
        self.enter(StoreCall::DeletePath).await?;
        self.inner.delete_path(path_id).await
    }

    async fn create_milestone(
        &self,
        path_id: Uuid,
        fields: &NewMilestone,
    ) -> Result<Milestone, StoreError> {
        self.enter(StoreCall::CreateMilestone).await?;
        self.inner.create_milestone(path_id, fields).await
    }

    async fn update_milestone(
        &self,
        milestone_id: Uuid,
        fields: &MilestoneUpdate,
    ) -> Result<(), StoreError> {
        self.enter(StoreCall::UpdateMilestone).await?;
        self.inner.update_milestone(milestone_id, fields).await
    }

    async fn delete_milestone(&self, milestone_id: Uuid) -> Result<(), StoreError> {
        self.enter(StoreCall::DeleteMilestone).await?;
        self.inner.delete_milestone(milestone_id).await
    }
}
