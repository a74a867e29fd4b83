//! Plan tree fixtures.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use wishpath_core::model::{Milestone, Path, PathStatus, Plan};

use crate::faulty::FaultyStore;

/// Date given to every fixture milestone.
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
}

/// A draft plan with one path per entry of `paths`, each holding one
/// milestone per flag (`true` = completed).
///
/// Derived fields are left at zero; the engine is expected to compute them.
pub fn plan_with_milestones(title: &str, paths: &[&[bool]]) -> Plan {
    let mut plan = Plan::new(Uuid::new_v4(), title);
    for (i, flags) in paths.iter().enumerate() {
        let path_id = Uuid::new_v4();
        let milestones = flags
            .iter()
            .enumerate()
            .map(|(j, completed)| Milestone {
                id: Uuid::new_v4(),
                path_id,
                title: format!("Milestone {}.{}", i + 1, j + 1),
                date: fixture_date(),
                completed: *completed,
                notes: None,
            })
            .collect();
        plan.paths.push(Path {
            id: path_id,
            plan_id: plan.id,
            title: format!("Path {}", i + 1),
            description: String::new(),
            status: PathStatus::Planning,
            progress: 0,
            milestones,
        });
    }
    plan
}

/// A [`FaultyStore`] seeded with [`plan_with_milestones`]. Returns the store
/// and the seeded tree.
pub async fn seeded_store(paths: &[&[bool]]) -> (Arc<FaultyStore>, Plan) {
    let store = Arc::new(FaultyStore::new());
    let plan = plan_with_milestones("Fixture plan", paths);
    store.inner().insert_plan(plan.clone()).await;
    (store, plan)
}
