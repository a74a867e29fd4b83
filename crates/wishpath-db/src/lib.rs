//! PostgreSQL persistence for wishpath: row models, connection pool,
//! embedded migrations and query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
