//! Terminal output for plans and notifications.

use wishpath_core::Notification;
use wishpath_core::model::Plan;
use wishpath_db::models::PlanRow;

/// Print a plan tree with derived progress.
pub fn print_tree(plan: &Plan) {
    println!("Plan: {} ({})", plan.title, plan.id);
    println!(
        "  Status: {}   Progress: {}%   Tasks: {}/{}",
        plan.status, plan.progress, plan.metrics.completed_tasks, plan.metrics.total_tasks
    );
    match (plan.metrics.spent_budget, plan.metrics.total_budget) {
        (Some(spent), Some(total)) => println!("  Budget: {spent:.2} of {total:.2}"),
        (None, Some(total)) => println!("  Budget: {total:.2}"),
        (Some(spent), None) => println!("  Spent: {spent:.2}"),
        (None, None) => {}
    }

    if plan.paths.is_empty() {
        println!();
        println!("No paths yet. Use `wishpath path add {} <title>`.", plan.id);
        return;
    }

    for path in &plan.paths {
        println!();
        println!(
            "  [{}] {} {}% ({})",
            path.status, path.title, path.progress, path.id
        );
        if !path.description.is_empty() {
            println!("      {}", path.description);
        }
        for milestone in &path.milestones {
            let mark = if milestone.completed { "x" } else { " " };
            println!(
                "    [{mark}] {}  {} ({})",
                milestone.date, milestone.title, milestone.id
            );
            if let Some(notes) = &milestone.notes {
                println!("          {notes}");
            }
        }
    }
}

/// Print the plan list table.
pub fn print_plan_table(plans: &[PlanRow]) {
    let id_w = 36;
    let title_w = plans.iter().map(|p| p.title.len()).max().unwrap_or(5).max(5);
    let status_w = 9;

    println!(
        "{:<id_w$}  {:<title_w$}  {:<status_w$}  {:>8}  {:>7}  UPDATED",
        "ID", "TITLE", "STATUS", "PROGRESS", "TASKS",
    );
    for plan in plans {
        let tasks = format!("{}/{}", plan.completed_tasks, plan.total_tasks);
        println!(
            "{:<id_w$}  {:<title_w$}  {:<status_w$}  {:>7}%  {:>7}  {}",
            plan.id,
            plan.title,
            plan.status,
            plan.progress,
            tasks,
            plan.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

pub fn print_notification(notification: &Notification) {
    match notification {
        Notification::OperationFailed { kind, message, .. } => {
            eprintln!("error ({kind}): {message}");
        }
        Notification::StaleData { message } => eprintln!("warning: {message}"),
    }
}
