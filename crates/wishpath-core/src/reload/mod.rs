//! Reload/resync controller.
//!
//! Refetches the authoritative tree from the store, re-derives every
//! progress/status/metrics field locally and replaces the session's tree
//! wholesale. This is the only way plan-level fields change after a
//! structural edit or a confirmed completion change.
//!
//! Completion toggles go through [`ReloadController::schedule_reload`],
//! which waits for a quiet period so a burst of toggles costs one refetch.
//! Other confirmed mutations reload immediately.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::refresh_derived;
use crate::error::StoreError;
use crate::model::{Plan, PlanFields};
use crate::session::{Notification, PlanSession};
use crate::store::PlanStore;

/// Fetch a plan tree and re-derive its fields.
///
/// Returns the tree plus, when the stored plan-level aggregates disagree
/// with the derived ones, the fields that need writing back.
pub async fn fetch_tree(
    store: &dyn PlanStore,
    plan_id: Uuid,
) -> Result<(Plan, Option<PlanFields>), StoreError> {
    let mut plan = store.get_plan_tree(plan_id).await?;
    let stored = (plan.status, plan.progress, plan.metrics.clone());
    refresh_derived(&mut plan);

    let write_back = if stored != (plan.status, plan.progress, plan.metrics.clone()) {
        Some(PlanFields {
            status: Some(plan.status),
            progress: Some(plan.progress),
            total_tasks: Some(plan.metrics.total_tasks),
            completed_tasks: Some(plan.metrics.completed_tasks),
            ..PlanFields::default()
        })
    } else {
        None
    };

    Ok((plan, write_back))
}

struct Inner {
    store: Arc<dyn PlanStore>,
    session: PlanSession,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    /// The reload a `settle` call has taken out of `pending` and is awaiting.
    settling: Mutex<Option<AbortHandle>>,
    shutdown: CancellationToken,
}

impl Inner {
    async fn reload_now(&self) -> Result<(), StoreError> {
        let plan_id = self.session.plan_id();
        let (plan, write_back) = fetch_tree(self.store.as_ref(), plan_id).await?;

        tracing::info!(
            plan_id = %plan_id,
            status = %plan.status,
            progress = plan.progress,
            total_tasks = plan.metrics.total_tasks,
            "plan reloaded"
        );
        self.session.replace(plan);

        if let Some(fields) = write_back {
            self.write_back(plan_id, &fields).await;
        }
        Ok(())
    }

    /// Persist re-derived plan aggregates. A failure leaves the stored row
    /// stale but does not touch the freshly loaded local tree.
    async fn write_back(&self, plan_id: Uuid, fields: &PlanFields) {
        match self.store.update_plan(plan_id, fields).await {
            Ok(_) => {
                tracing::debug!(plan_id = %plan_id, "derived plan fields written back");
            }
            Err(e) => {
                tracing::warn!(
                    plan_id = %plan_id,
                    error = %e,
                    "failed to write back derived plan fields"
                );
                self.session.notify(Notification::stale(e.kind()));
            }
        }
    }

    async fn refresh_after_commit(&self) {
        if let Err(e) = self.reload_now().await {
            tracing::warn!(
                plan_id = %self.session.plan_id(),
                error = %e,
                "reload after confirmed mutation failed; local data may be stale"
            );
            self.session.notify(Notification::stale(e.kind()));
        }
    }

    fn take_pending(&self) -> Option<JoinHandle<()>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_settling(&self, handle: Option<AbortHandle>) -> Option<AbortHandle> {
        std::mem::replace(
            &mut *self.settling.lock().unwrap_or_else(PoisonError::into_inner),
            handle,
        )
    }
}

/// Reloads the session's tree from the store. Cheap to clone.
#[derive(Clone)]
pub struct ReloadController {
    inner: Arc<Inner>,
}

impl ReloadController {
    pub fn new(store: Arc<dyn PlanStore>, session: PlanSession, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                session,
                debounce,
                pending: Mutex::new(None),
                settling: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Refetch and replace the tree right away.
    pub async fn reload_now(&self) -> Result<(), StoreError> {
        self.inner.reload_now().await
    }

    /// Persist derived plan fields computed outside a reload, e.g. when a
    /// session is first opened.
    pub(crate) async fn write_back(&self, fields: &PlanFields) {
        self.inner
            .write_back(self.inner.session.plan_id(), fields)
            .await;
    }

    /// Reload after a mutation the store already confirmed. Failure is
    /// reported as stale data rather than returned.
    pub async fn refresh_after_commit(&self) {
        self.inner.refresh_after_commit().await;
    }

    /// Reload once the debounce window passes without another call.
    pub fn schedule_reload(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {
                    tracing::debug!(plan_id = %inner.session.plan_id(), "pending reload cancelled");
                }
                _ = tokio::time::sleep(inner.debounce) => {
                    inner.refresh_after_commit().await;
                }
            }
        });

        let previous = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(settling) = self.inner.set_settling(None) {
            settling.abort();
        }
        if let Some(previous) = previous {
            previous.abort();
            tracing::debug!(
                plan_id = %self.inner.session.plan_id(),
                "debounced reload rescheduled"
            );
        }
    }

    /// Whether a debounced reload is waiting or running.
    pub fn has_pending(&self) -> bool {
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        pending
            || self
                .inner
                .settling
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait until no debounced reload is outstanding.
    pub async fn settle(&self) {
        while let Some(handle) = self.inner.take_pending() {
            self.inner.set_settling(Some(handle.abort_handle()));
            // An aborted handle means it was superseded by a newer one,
            // which the next iteration picks up.
            let _ = handle.await;
            self.inner.set_settling(None);
        }
    }

    /// Cancel any pending debounced reload and refuse new ones.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.take_pending() {
            handle.abort();
        }
        if let Some(settling) = self.inner.set_settling(None) {
            settling.abort();
        }
    }
}

impl std::fmt::Debug for ReloadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadController")
            .field("plan_id", &self.inner.session.plan_id())
            .field("debounce", &self.inner.debounce)
            .field("pending", &self.has_pending())
            .finish()
    }
}
