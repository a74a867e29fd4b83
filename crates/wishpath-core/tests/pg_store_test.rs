//! Integration tests for `PgPlanStore` and a coordinator running on it.
//!
//! Each test gets its own database on the shared PostgreSQL server from
//! `wishpath-test-utils`.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use wishpath_core::error::{Entity, ErrorKind, StoreError};
use wishpath_core::model::{
    MilestoneUpdate, NewMilestone, NewPath, NewPlan, PathStatus, PathUpdate, PlanFields,
    PlanStatus,
};
use wishpath_core::store::{PgPlanStore, PlanStore};
use wishpath_core::{CoordinatorConfig, MutationCoordinator};
use wishpath_test_utils::{create_test_db, drop_test_db};

fn title(s: &str) -> NewPlan {
    NewPlan { title: s.into() }
}

#[tokio::test]
async fn tree_round_trips_in_position_order() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());

    let plan = store.create_plan(&title("Move to Lisbon")).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Draft);
    assert_eq!(plan.progress, 0);

    let housing = store
        .create_path(plan.id, &NewPath::titled("Housing"))
        .await
        .unwrap();
    let paperwork = store
        .create_path(plan.id, &NewPath::titled("Paperwork"))
        .await
        .unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
    for name in ["Shortlist areas", "Book viewings"] {
        store
            .create_milestone(housing.id, &NewMilestone::new(name).with_date(date))
            .await
            .unwrap();
    }
    let nif = store
        .create_milestone(
            paperwork.id,
            &NewMilestone::new("Get NIF").with_notes("bring passport"),
        )
        .await
        .unwrap();
    assert!(!nif.completed);

    let tree = store.get_plan_tree(plan.id).await.unwrap();
    let path_titles: Vec<&str> = tree.paths.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(path_titles, vec!["Housing", "Paperwork"]);
    let housing_titles: Vec<&str> = tree.paths[0]
        .milestones
        .iter()
        .map(|m| m.title.as_str())
        .collect();
    assert_eq!(housing_titles, vec!["Shortlist areas", "Book viewings"]);
    assert_eq!(tree.paths[0].milestones[0].date, date);
    assert_eq!(
        tree.paths[1].milestones[0].notes.as_deref(),
        Some("bring passport")
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn partial_updates_leave_other_columns_alone() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());

    let plan = store.create_plan(&title("Run a marathon")).await.unwrap();
    let path = store
        .create_path(plan.id, &NewPath::titled("Training"))
        .await
        .unwrap();
    let milestone = store
        .create_milestone(path.id, &NewMilestone::new("Half marathon"))
        .await
        .unwrap();

    store
        .update_path(
            path.id,
            &PathUpdate {
                status: Some(PathStatus::InProgress),
                ..PathUpdate::default()
            },
        )
        .await
        .unwrap();
    store
        .update_milestone(milestone.id, &MilestoneUpdate::completed(true))
        .await
        .unwrap();

    let updated = store
        .update_plan(
            plan.id,
            &PlanFields {
                progress: Some(100),
                total_tasks: Some(1),
                completed_tasks: Some(1),
                total_budget: Some(250.0),
                ..PlanFields::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Run a marathon");
    assert_eq!(updated.status, PlanStatus::Draft);
    assert_eq!(updated.progress, 100);
    assert_eq!(updated.metrics.total_tasks, 1);
    assert_eq!(updated.metrics.total_budget, Some(250.0));
    assert_eq!(updated.metrics.spent_budget, None);
    assert_eq!(updated.paths[0].title, "Training");
    assert_eq!(updated.paths[0].status, PathStatus::InProgress);
    assert!(updated.paths[0].milestones[0].completed);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn missing_rows_classify_as_not_found() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());
    let ghost = Uuid::new_v4();

    assert_eq!(
        store.get_plan_tree(ghost).await.unwrap_err(),
        StoreError::not_found(Entity::Plan, ghost)
    );
    assert_eq!(
        store.delete_milestone(ghost).await.unwrap_err(),
        StoreError::not_found(Entity::Milestone, ghost)
    );
    // Foreign key violation on insert.
    let err = store
        .create_path(ghost, &NewPath::titled("Orphan"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_a_path_cascades() {
    let (pool, db_name) = create_test_db().await;
    let store = PgPlanStore::new(pool.clone());

    let plan = store.create_plan(&title("Garden")).await.unwrap();
    let path = store
        .create_path(plan.id, &NewPath::titled("Beds"))
        .await
        .unwrap();
    let milestone = store
        .create_milestone(path.id, &NewMilestone::new("Dig"))
        .await
        .unwrap();

    store.delete_path(path.id).await.unwrap();
    let err = store
        .update_milestone(milestone.id, &MilestoneUpdate::completed(true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(store.get_plan_tree(plan.id).await.unwrap().paths.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn coordinator_persists_derived_fields() {
    let (pool, db_name) = create_test_db().await;
    let store = Arc::new(PgPlanStore::new(pool.clone()));

    let plan = store.create_plan(&title("Learn piano")).await.unwrap();
    let path = store
        .create_path(plan.id, &NewPath::titled("Scales"))
        .await
        .unwrap();
    for name in ["C major", "G major"] {
        store
            .create_milestone(path.id, &NewMilestone::new(name))
            .await
            .unwrap();
    }

    let coordinator =
        MutationCoordinator::open(store.clone(), plan.id, &CoordinatorConfig::default())
            .await
            .unwrap();
    let milestone_id = coordinator.session().snapshot().paths[0].milestones[0].id;
    coordinator
        .toggle_milestone_completion(path.id, milestone_id)
        .await
        .unwrap();
    coordinator.settle().await;

    let tree = coordinator.session().snapshot();
    assert_eq!(tree.progress, 50);
    assert_eq!(tree.status, PlanStatus::Active);

    let stored = wishpath_db::queries::plans::get_plan(&pool, plan.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.progress, 50);
    assert_eq!(stored.status, PlanStatus::Active);
    assert_eq!(stored.total_tasks, 2);
    assert_eq!(stored.completed_tasks, 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}
