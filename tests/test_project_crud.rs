//! Integration tests for project CRUD operations.
//!
//! Tests cover:
//! - Creating projects with defaults (company, status)
//! - Querying and listing projects
//! - Address search
//! - Partial info updates
//! - Deleting projects

mod common;

use common::*;
use time::macros::date;

#[tokio::test]
async fn test_create_project_defaults() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;

    let project = create_test_project(&store).await;

    assert!(project.id > 0);
    assert_eq!(project.address, "123 Main St");
    assert_eq!(project.company, "Chargie");
    assert_eq!(project.start_date, date!(2026 - 01 - 15));
    assert_eq!(project.project_type.as_deref(), Some("commercial"));
    assert_eq!(project.status, ProjectStatus::Started);

    let fetched = store.get_project(project.id).await?.expect("project exists");
    assert_eq!(fetched.address, project.address);
    assert_eq!(fetched.status, ProjectStatus::Started);

    Ok(())
}

#[tokio::test]
async fn test_create_project_with_company() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;

    let project = store
        .create_project(NewProject {
            address: "9 Harbor Way".to_string(),
            company: Some("Voltic".to_string()),
            start_date: date!(2026 - 03 - 01),
            project_type: None,
        })
        .await?;

    assert_eq!(project.company, "Voltic");
    assert_eq!(project.project_type, None);

    Ok(())
}

#[tokio::test]
async fn test_list_projects_overview() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    // Before any submissions: no charger or summary figures.
    let overview = store.list_projects().await?;
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].id, project.id);
    assert_eq!(overview[0].status, "started");
    assert_eq!(overview[0].chargers_count, None);
    assert_eq!(overview[0].approval, None);
    assert_eq!(overview[0].total_submitted, None);

    // After the labor step the charger count shows up in the listing.
    submit_all_steps(&store, project.id).await;
    let overview = store.list_projects().await?;
    assert_eq!(overview[0].status, "labor_cost_submitted");
    assert_eq!(overview[0].chargers_count, Some(5));
    assert_eq!(overview[0].approval, None);

    Ok(())
}

#[tokio::test]
async fn test_search_projects_by_address() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;

    store
        .create_project(NewProject {
            address: "123 Main St".to_string(),
            company: None,
            start_date: date!(2026 - 01 - 15),
            project_type: None,
        })
        .await?;
    store
        .create_project(NewProject {
            address: "55 Oak Ave".to_string(),
            company: None,
            start_date: date!(2026 - 02 - 01),
            project_type: None,
        })
        .await?;

    let hits = store.search_projects("main").await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].address, "123 Main St");

    let hits = store.search_projects("nowhere").await?;
    assert!(hits.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_update_project_info_partial() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    let updated = store
        .update_project_info(
            &project,
            &ProjectInfoUpdate {
                address: Some("456 Elm St".to_string()),
                company: None,
                start_date: None,
                project_type: None,
            },
        )
        .await?;

    // Only the named field changes.
    assert_eq!(updated.address, "456 Elm St");
    assert_eq!(updated.company, project.company);
    assert_eq!(updated.start_date, project.start_date);
    assert_eq!(updated.status, project.status);

    Ok(())
}

#[tokio::test]
async fn test_delete_project() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;
    let project_id = project.id;

    store.delete_project(project).await?;

    assert!(store.get_project(project_id).await?.is_none());
    assert!(store.list_projects().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_user_lookup() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let user = db
        .add_user(NewUser {
            email: "bob@example.com".to_string(),
            username: "Bob".to_string(),
        })
        .await?;

    let by_email = db.get_user_by_email("bob@example.com").await?;
    assert_eq!(by_email.map(|u| u.id), Some(user.id));

    let by_id = db.get_user_by_id(user.id).await?;
    assert_eq!(by_id.map(|u| u.email), Some("bob@example.com".to_string()));

    assert!(db.get_user_by_email("nobody@example.com").await?.is_none());

    Ok(())
}
