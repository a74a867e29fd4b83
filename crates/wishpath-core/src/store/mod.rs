//! Persistence collaborator interface and its implementations.
//!
//! The engine never talks to a database directly. Everything goes through
//! the object-safe [`PlanStore`] trait so the coordinator can be driven by
//! PostgreSQL in production and by an in-memory map in tests.
//!
//! ```text
//! MutationCoordinator / ReloadController
//!     |
//!     v
//! Arc<dyn PlanStore>
//!     |-- PgPlanStore   (wishpath-db queries, sqlx error classification)
//!     `-- MemoryStore   (HashMap-backed, no I/O)
//! ```

pub mod memory;
pub mod postgres;
pub mod trait_def;

pub use memory::MemoryStore;
pub use postgres::PgPlanStore;
pub use trait_def::PlanStore;
