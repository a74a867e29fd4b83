//! Derived plan state.
//!
//! Pure functions computing path progress and plan status/progress/metrics
//! from the current milestone tree. Nothing here touches the store or the
//! session; the coordinator and the reload controller call
//! [`refresh_derived`] after every change to the tree.
//!
//! Plan status rules:
//!
//! ```text
//! progress == 100                        -> completed
//! progress  > 0 and status in {draft, review} -> active
//! otherwise                              -> unchanged
//! ```
//!
//! `completed` is a one-way ratchet: a completed plan whose progress later
//! drops below 100 stays completed.

use crate::model::{Path, Plan, PlanMetrics, PlanStatus};

/// Derived plan-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanProgress {
    pub status: PlanStatus,
    pub progress: u8,
    pub metrics: PlanMetrics,
}

/// `round(100 * done / total)` with half-up rounding, or 0 when `total` is 0.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as u64;
    let total = total as u64;
    ((200 * done + total) / (2 * total)) as u8
}

/// Progress of a single path.
pub fn compute_path_progress(path: &Path) -> u8 {
    percent(path.completed_count(), path.milestones.len())
}

/// Status, progress and metrics of a plan as implied by its tree.
pub fn compute_plan_status_and_progress(plan: &Plan) -> PlanProgress {
    let total = plan.milestone_count();
    let budgets = PlanMetrics {
        total_budget: plan.metrics.total_budget,
        spent_budget: plan.metrics.spent_budget,
        ..PlanMetrics::default()
    };

    if total == 0 {
        return PlanProgress {
            status: plan.status,
            progress: 0,
            metrics: budgets,
        };
    }

    let completed: usize = plan.paths.iter().map(Path::completed_count).sum();
    let progress = percent(completed, total);

    PlanProgress {
        status: next_status(plan.status, progress),
        progress,
        metrics: PlanMetrics {
            total_tasks: total as u32,
            completed_tasks: completed as u32,
            ..budgets
        },
    }
}

/// Apply the status transition rules for a freshly computed progress value.
pub fn next_status(current: PlanStatus, progress: u8) -> PlanStatus {
    if progress == 100 {
        PlanStatus::Completed
    } else if progress > 0 && matches!(current, PlanStatus::Draft | PlanStatus::Review) {
        PlanStatus::Active
    } else {
        current
    }
}

/// Recompute every derived field of `plan` in place.
///
/// Returns `true` when anything changed.
pub fn refresh_derived(plan: &mut Plan) -> bool {
    let mut changed = false;

    for path in &mut plan.paths {
        let progress = compute_path_progress(path);
        if path.progress != progress {
            path.progress = progress;
            changed = true;
        }
    }

    let derived = compute_plan_status_and_progress(plan);
    if plan.status != derived.status
        || plan.progress != derived.progress
        || plan.metrics != derived.metrics
    {
        plan.status = derived.status;
        plan.progress = derived.progress;
        plan.metrics = derived.metrics;
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::model::{Milestone, PathStatus};

    fn path_with(flags: &[bool]) -> Path {
        let id = Uuid::new_v4();
        Path {
            id,
            plan_id: Uuid::nil(),
            title: "path".to_string(),
            description: String::new(),
            status: PathStatus::Planning,
            progress: 0,
            milestones: flags
                .iter()
                .map(|&completed| Milestone {
                    id: Uuid::new_v4(),
                    path_id: id,
                    title: "m".to_string(),
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    completed,
                    notes: None,
                })
                .collect(),
        }
    }

    fn plan_with(status: PlanStatus, paths: Vec<Path>) -> Plan {
        let mut plan = Plan::new(Uuid::new_v4(), "plan");
        plan.status = status;
        plan.paths = paths;
        plan
    }

    #[test]
    fn empty_path_has_zero_progress() {
        assert_eq!(compute_path_progress(&path_with(&[])), 0);
    }

    #[test]
    fn path_progress_rounds_half_up() {
        assert_eq!(compute_path_progress(&path_with(&[true, false])), 50);
        assert_eq!(compute_path_progress(&path_with(&[true, false, false])), 33);
        assert_eq!(compute_path_progress(&path_with(&[true, true, false])), 67);
        // 100 * 1 / 8 = 12.5 -> 13
        let mut flags = vec![false; 8];
        flags[0] = true;
        assert_eq!(compute_path_progress(&path_with(&flags)), 13);
        assert_eq!(compute_path_progress(&path_with(&[true, true])), 100);
    }

    #[test]
    fn path_progress_matches_formula_for_small_trees() {
        for n in 1..=12usize {
            for k in 0..=n {
                let flags: Vec<bool> = (0..n).map(|i| i < k).collect();
                let expected = (100.0 * k as f64 / n as f64).round() as u8;
                assert_eq!(compute_path_progress(&path_with(&flags)), expected, "k={k} n={n}");
            }
        }
    }

    #[test]
    fn plan_without_milestones_keeps_status() {
        let plan = plan_with(PlanStatus::Review, vec![path_with(&[]), path_with(&[])]);
        let derived = compute_plan_status_and_progress(&plan);
        assert_eq!(derived.progress, 0);
        assert_eq!(derived.status, PlanStatus::Review);
        assert_eq!(derived.metrics.total_tasks, 0);
        assert_eq!(derived.metrics.completed_tasks, 0);
    }

    #[test]
    fn plan_progress_spans_all_paths() {
        let plan = plan_with(
            PlanStatus::Draft,
            vec![path_with(&[true, false]), path_with(&[true, true, false, false])],
        );
        let derived = compute_plan_status_and_progress(&plan);
        assert_eq!(derived.metrics.total_tasks, 6);
        assert_eq!(derived.metrics.completed_tasks, 3);
        assert_eq!(derived.progress, 50);
        assert_eq!(derived.status, PlanStatus::Active);
    }

    #[test]
    fn full_progress_completes_plan() {
        for status in [
            PlanStatus::Draft,
            PlanStatus::Review,
            PlanStatus::Active,
            PlanStatus::Archived,
        ] {
            let plan = plan_with(status, vec![path_with(&[true, true])]);
            assert_eq!(
                compute_plan_status_and_progress(&plan).status,
                PlanStatus::Completed
            );
        }
    }

    #[test]
    fn partial_progress_does_not_touch_archived_or_active() {
        let archived = plan_with(PlanStatus::Archived, vec![path_with(&[true, false])]);
        assert_eq!(
            compute_plan_status_and_progress(&archived).status,
            PlanStatus::Archived
        );
        let active = plan_with(PlanStatus::Active, vec![path_with(&[false, false])]);
        assert_eq!(
            compute_plan_status_and_progress(&active).status,
            PlanStatus::Active
        );
    }

    #[test]
    fn zero_progress_leaves_draft_alone() {
        let plan = plan_with(PlanStatus::Draft, vec![path_with(&[false, false])]);
        let derived = compute_plan_status_and_progress(&plan);
        assert_eq!(derived.status, PlanStatus::Draft);
        assert_eq!(derived.progress, 0);
        assert_eq!(derived.metrics.total_tasks, 2);
    }

    #[test]
    fn completed_status_is_a_ratchet() {
        let mut plan = plan_with(PlanStatus::Draft, vec![path_with(&[true])]);
        refresh_derived(&mut plan);
        assert_eq!(plan.status, PlanStatus::Completed);

        // Adding an incomplete milestone drops progress but not the status.
        plan.paths.push(path_with(&[false]));
        refresh_derived(&mut plan);
        assert_eq!(plan.progress, 50);
        assert_eq!(plan.status, PlanStatus::Completed);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let plan = plan_with(
            PlanStatus::Review,
            vec![path_with(&[true, false, false]), path_with(&[true])],
        );
        let first = compute_plan_status_and_progress(&plan);
        let second = compute_plan_status_and_progress(&plan);
        assert_eq!(first, second);
    }

    #[test]
    fn budgets_are_carried_over() {
        let mut plan = plan_with(PlanStatus::Active, vec![path_with(&[true, false])]);
        plan.metrics.total_budget = Some(1200.0);
        plan.metrics.spent_budget = Some(300.5);
        let derived = compute_plan_status_and_progress(&plan);
        assert_eq!(derived.metrics.total_budget, Some(1200.0));
        assert_eq!(derived.metrics.spent_budget, Some(300.5));
    }

    #[test]
    fn refresh_derived_reports_changes() {
        let mut plan = plan_with(PlanStatus::Draft, vec![path_with(&[true, false])]);
        assert!(refresh_derived(&mut plan));
        assert_eq!(plan.paths[0].progress, 50);
        assert_eq!(plan.progress, 50);
        assert_eq!(plan.status, PlanStatus::Active);
        assert!(!refresh_derived(&mut plan));
    }
}
