//! Error taxonomy for the engine.
//!
//! [`StoreError`] is what a [`crate::store::PlanStore`] returns. The
//! coordinator wraps it into a [`CoordinatorError`] together with the
//! operation that failed. Both classify into an [`ErrorKind`], which is what
//! callers use to pick a user-facing message.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Cause classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Stale or invalid session.
    Authentication,
    /// Insufficient rights.
    Permission,
    /// The entity vanished server-side (or was never there).
    NotFound,
    /// Transport failure or timeout.
    Network,
    Unknown,
}

impl ErrorKind {
    /// Message suitable for showing to the person editing the plan.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication => "Your session has expired. Please sign in again.",
            Self::Permission => "You do not have permission to change this plan.",
            Self::NotFound => "This item no longer exists. It may have been deleted.",
            Self::Network => "Could not reach the server. Check your connection and try again.",
            Self::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
            Self::Network => "network",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Plan,
    Path,
    Milestone,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plan => "plan",
            Self::Path => "path",
            Self::Milestone => "milestone",
        };
        f.write_str(s)
    }
}

/// Errors returned by a persistence backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    #[error("network failure: {0}")]
    Network(String),

    #[error("store error: {0}")]
    Unknown(String),
}

impl StoreError {
    pub fn not_found(entity: Entity, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Permission(_) => ErrorKind::Permission,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Network(_) => ErrorKind::Network,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// A coordinator operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AddPath,
    UpdatePath,
    DeletePath,
    AddMilestone,
    ToggleMilestone,
    UpdateMilestone,
    DeleteMilestone,
    UpdatePlan,
    Reload,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AddPath => "add path",
            Self::UpdatePath => "update path",
            Self::DeletePath => "delete path",
            Self::AddMilestone => "add milestone",
            Self::ToggleMilestone => "toggle milestone",
            Self::UpdateMilestone => "update milestone",
            Self::DeleteMilestone => "delete milestone",
            Self::UpdatePlan => "update plan",
            Self::Reload => "reload",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by [`crate::coordinator::MutationCoordinator`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("{operation} failed: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StoreError,
    },

    #[error("path {0} is not part of this plan")]
    UnknownPath(Uuid),

    #[error("milestone {milestone_id} is not part of path {path_id}")]
    UnknownMilestone { path_id: Uuid, milestone_id: Uuid },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} already has an operation in flight")]
    Busy { entity: Entity, id: Uuid },
}

impl CoordinatorError {
    pub fn store(operation: Operation, source: StoreError) -> Self {
        Self::Store { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store { source, .. } => source.kind(),
            Self::UnknownPath(_) | Self::UnknownMilestone { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) | Self::Busy { .. } => ErrorKind::Unknown,
        }
    }

    /// Human-readable message for the notification channel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store { operation, source } => {
                format!("Could not {operation}. {}", source.kind().user_message())
            }
            Self::UnknownPath(_) | Self::UnknownMilestone { .. } => {
                ErrorKind::NotFound.user_message().to_string()
            }
            Self::InvalidInput(reason) => format!("Invalid input: {reason}."),
            Self::Busy { entity, .. } => {
                format!("This {entity} is still being saved. Please wait a moment.")
            }
        }
    }
}
