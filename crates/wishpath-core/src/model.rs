//! Entity model: the in-memory Plan → Path → Milestone tree and the field
//! sets used to create and edit its entities.
//!
//! A [`Plan`] is the aggregation root. Its `progress` and the task counts in
//! [`PlanMetrics`] are derived from the milestones underneath it and are
//! only ever written by [`crate::aggregate::refresh_derived`].

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use wishpath_db::models::{PathStatus, PlanStatus};

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Plan-level counters. Task counts are derived; budgets are user data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub total_budget: Option<f64>,
    pub spent_budget: Option<f64>,
}

/// A plan together with all of its paths and milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub title: String,
    pub status: PlanStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub metrics: PlanMetrics,
    pub paths: Vec<Path>,
}

impl Plan {
    /// An empty draft plan.
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: PlanStatus::Draft,
            progress: 0,
            metrics: PlanMetrics::default(),
            paths: Vec::new(),
        }
    }

    pub fn path(&self, path_id: Uuid) -> Option<&Path> {
        self.paths.iter().find(|p| p.id == path_id)
    }

    pub fn path_mut(&mut self, path_id: Uuid) -> Option<&mut Path> {
        self.paths.iter_mut().find(|p| p.id == path_id)
    }

    pub fn milestone(&self, path_id: Uuid, milestone_id: Uuid) -> Option<&Milestone> {
        self.path(path_id)?.milestone(milestone_id)
    }

    pub fn milestone_mut(&mut self, path_id: Uuid, milestone_id: Uuid) -> Option<&mut Milestone> {
        self.path_mut(path_id)?
            .milestones
            .iter_mut()
            .find(|m| m.id == milestone_id)
    }

    /// Total number of milestones across all paths.
    pub fn milestone_count(&self) -> usize {
        self.paths.iter().map(|p| p.milestones.len()).sum()
    }
}

/// An execution track within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: PathStatus,
    /// Percentage in `0..=100`, derived from `milestones`.
    pub progress: u8,
    pub milestones: Vec<Milestone>,
}

impl Path {
    pub fn milestone(&self, milestone_id: Uuid) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }

    pub fn completed_count(&self) -> usize {
        self.milestones.iter().filter(|m| m.completed).count()
    }
}

/// The atomic unit of completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub path_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Field sets
// ---------------------------------------------------------------------------

/// Fields for creating a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlan {
    pub title: String,
}

/// Fields for creating a path. Progress always starts at 0 with no
/// milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPath {
    pub title: String,
    pub description: String,
    pub status: PathStatus,
}

impl NewPath {
    /// A path in `planning` status with an empty description.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: PathStatus::Planning,
        }
    }
}

/// Fields for creating a milestone. Milestones are always created
/// incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub title: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl NewMilestone {
    /// A milestone dated today (UTC) with no notes.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: Utc::now().date_naive(),
            notes: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of a path's user-editable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<PathStatus>,
}

impl PathUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    pub fn apply_to(&self, path: &mut Path) {
        if let Some(title) = &self.title {
            path.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            path.description.clone_from(description);
        }
        if let Some(status) = self.status {
            path.status = status;
        }
    }
}

/// Partial update of a milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl MilestoneUpdate {
    /// An update that only sets the completion flag.
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none() && self.notes.is_none() && self.completed.is_none()
    }

    pub fn apply_to(&self, milestone: &mut Milestone) {
        if let Some(title) = &self.title {
            milestone.title.clone_from(title);
        }
        if let Some(date) = self.date {
            milestone.date = date;
        }
        if let Some(notes) = &self.notes {
            milestone.notes = Some(notes.clone());
        }
        if let Some(completed) = self.completed {
            milestone.completed = completed;
        }
    }
}

/// User-facing plan edit. Progress and task counts are deliberately absent:
/// they can only be derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub status: Option<PlanStatus>,
    pub total_budget: Option<f64>,
    pub spent_budget: Option<f64>,
}

impl PlanUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.total_budget.is_none()
            && self.spent_budget.is_none()
    }
}

/// Store-level plan column update, covering both user edits and the derived
/// fields written back after a reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFields {
    pub title: Option<String>,
    pub status: Option<PlanStatus>,
    pub progress: Option<u8>,
    pub total_tasks: Option<u32>,
    pub completed_tasks: Option<u32>,
    pub total_budget: Option<f64>,
    pub spent_budget: Option<f64>,
}

impl PlanFields {
    /// Apply every present field to a plan header. Paths are untouched.
    pub fn apply_to(&self, plan: &mut Plan) {
        if let Some(title) = &self.title {
            plan.title.clone_from(title);
        }
        if let Some(status) = self.status {
            plan.status = status;
        }
        if let Some(progress) = self.progress {
            plan.progress = progress;
        }
        if let Some(total) = self.total_tasks {
            plan.metrics.total_tasks = total;
        }
        if let Some(completed) = self.completed_tasks {
            plan.metrics.completed_tasks = completed;
        }
        if self.total_budget.is_some() {
            plan.metrics.total_budget = self.total_budget;
        }
        if self.spent_budget.is_some() {
            plan.metrics.spent_budget = self.spent_budget;
        }
    }
}

impl From<&PlanUpdate> for PlanFields {
    fn from(update: &PlanUpdate) -> Self {
        Self {
            title: update.title.clone(),
            status: update.status,
            total_budget: update.total_budget,
            spent_budget: update.spent_budget,
            ..Self::default()
        }
    }
}
