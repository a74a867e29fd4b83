//! Query functions, one module per table.

pub mod milestones;
pub mod paths;
pub mod plans;
