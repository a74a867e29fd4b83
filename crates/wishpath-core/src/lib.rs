//! Plan progress aggregation and optimistic mutation engine.
//!
//! A plan is a tree of paths, each holding milestones. Completion of
//! milestones rolls up into path progress and plan progress/status through
//! [`aggregate`]. Edits go through a [`MutationCoordinator`] bound to one
//! [`PlanSession`]; the [`reload`] controller keeps the session in step with
//! the [`store`].

pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod reload;
pub mod session;
pub mod store;

pub use config::CoordinatorConfig;
pub use coordinator::MutationCoordinator;
pub use error::{CoordinatorError, Entity, ErrorKind, Operation, StoreError};
pub use reload::ReloadController;
pub use session::{Notification, PlanSession};
pub use store::{MemoryStore, PgPlanStore, PlanStore};
