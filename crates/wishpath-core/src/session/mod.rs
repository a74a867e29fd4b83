//! The plan session: the single shared, observable copy of a plan tree.
//!
//! A [`PlanSession`] owns the local tree inside a `watch` channel so callers
//! can render the current (possibly optimistic) state and react to every
//! change. Failures are published on a separate `broadcast` side channel as
//! [`Notification`]s.
//!
//! Only the coordinator and the reload controller may change the tree, so
//! every mutating method here is crate-private. Cloning a session yields
//! another handle to the same tree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::error::{CoordinatorError, ErrorKind, Operation};
use crate::model::Plan;

/// Message published on the notification side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// An operation failed; any optimistic change was already rolled back.
    OperationFailed {
        operation: Operation,
        kind: ErrorKind,
        message: String,
    },
    /// A mutation was confirmed but the follow-up reload failed, so the
    /// displayed plan may not match the server.
    StaleData { message: String },
}

impl Notification {
    pub fn failed(operation: Operation, err: &CoordinatorError) -> Self {
        Self::OperationFailed {
            operation,
            kind: err.kind(),
            message: err.user_message(),
        }
    }

    pub fn stale(kind: ErrorKind) -> Self {
        Self::StaleData {
            message: format!(
                "Your change was saved, but the plan could not be refreshed and may be out of date. {}",
                kind.user_message()
            ),
        }
    }

    /// The human-readable text of this notification.
    pub fn message(&self) -> &str {
        match self {
            Self::OperationFailed { message, .. } | Self::StaleData { message } => message,
        }
    }
}

/// Shared handle to one plan's local state.
#[derive(Debug, Clone)]
pub struct PlanSession {
    plan_id: Uuid,
    tree: Arc<watch::Sender<Plan>>,
    notifications: broadcast::Sender<Notification>,
}

impl PlanSession {
    /// Start a session around an already-loaded tree.
    pub fn new(plan: Plan, notification_capacity: usize) -> Self {
        let plan_id = plan.id;
        let (tree, _) = watch::channel(plan);
        let (notifications, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            plan_id,
            tree: Arc::new(tree),
            notifications,
        }
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    /// A clone of the current tree.
    pub fn snapshot(&self) -> Plan {
        self.tree.borrow().clone()
    }

    /// Run `f` against the current tree without cloning it.
    pub fn with_plan<R>(&self, f: impl FnOnce(&Plan) -> R) -> R {
        f(&self.tree.borrow())
    }

    /// Receiver that observes every replacement or edit of the tree.
    pub fn subscribe(&self) -> watch::Receiver<Plan> {
        self.tree.subscribe()
    }

    /// The tree as a stream, starting with the current value.
    pub fn updates(&self) -> WatchStream<Plan> {
        WatchStream::new(self.tree.subscribe())
    }

    /// Receiver for failure and stale-data notifications published after
    /// this call.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Edit the tree in place. Subscribers are notified only when `f`
    /// reports a change; the return value is that report.
    pub(crate) fn modify(&self, f: impl FnOnce(&mut Plan) -> bool) -> bool {
        let mut changed = false;
        self.tree.send_if_modified(|plan| {
            changed = f(plan);
            changed
        });
        changed
    }

    /// Replace the whole tree, returning the previous one.
    pub(crate) fn replace(&self, plan: Plan) -> Plan {
        self.tree.send_replace(plan)
    }

    pub(crate) fn notify(&self, notification: Notification) {
        tracing::debug!(
            plan_id = %self.plan_id,
            message = notification.message(),
            "publishing notification"
        );
        // No subscriber is not an error: the failure is also returned to the
        // caller and logged.
        let _ = self.notifications.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::model::PlanStatus;

    #[tokio::test]
    async fn subscribers_see_modifications() {
        let session = PlanSession::new(Plan::new(Uuid::new_v4(), "Garden"), 8);
        let mut rx = session.subscribe();

        assert!(session.modify(|plan| {
            plan.status = PlanStatus::Review;
            true
        }));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status, PlanStatus::Review);
    }

    #[tokio::test]
    async fn unchanged_modify_does_not_wake_subscribers() {
        let session = PlanSession::new(Plan::new(Uuid::new_v4(), "Garden"), 8);
        let rx = session.subscribe();
        assert!(!session.modify(|_| false));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn replace_returns_previous_tree() {
        let plan = Plan::new(Uuid::new_v4(), "Garden");
        let session = PlanSession::new(plan.clone(), 8);
        let mut next = plan.clone();
        next.title = "Vegetable garden".into();

        let previous = session.replace(next);
        assert_eq!(previous, plan);
        assert_eq!(session.snapshot().title, "Vegetable garden");
    }

    #[tokio::test]
    async fn updates_stream_starts_with_current_value() {
        let session = PlanSession::new(Plan::new(Uuid::new_v4(), "Garden"), 8);
        let mut stream = session.updates();
        let first = stream.next().await.unwrap();
        assert_eq!(first.title, "Garden");
    }

    #[tokio::test]
    async fn notifications_reach_subscribers() {
        let session = PlanSession::new(Plan::new(Uuid::new_v4(), "Garden"), 8);
        let mut rx = session.notifications();
        session.notify(Notification::stale(ErrorKind::Network));
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Notification::StaleData { .. }));
        assert!(received.message().contains("may be out of date"));
    }

    #[test]
    fn notifications_serialize_with_type_tag() {
        let json = serde_json::to_value(Notification::stale(ErrorKind::Network)).unwrap();
        assert_eq!(json["type"], "stale_data");

        let err = CoordinatorError::store(
            Operation::DeletePath,
            crate::error::StoreError::Permission("rls".into()),
        );
        let json = serde_json::to_value(Notification::failed(Operation::DeletePath, &err)).unwrap();
        assert_eq!(json["type"], "operation_failed");
        assert_eq!(json["operation"], "delete_path");
        assert_eq!(json["kind"], "permission");
    }

    #[test]
    fn notify_without_subscribers_is_harmless() {
        let session = PlanSession::new(Plan::new(Uuid::new_v4(), "Garden"), 8);
        session.notify(Notification::stale(ErrorKind::Unknown));
    }
}
