//! Integration tests for the three estimation steps.
//!
//! Tests cover:
//! - Server-side recomputation of subtotals and totals
//! - Snapshot replacement on resubmission
//! - Review-page entry edits
//! - Payload validation

mod common;

use common::*;

#[tokio::test]
async fn test_submit_wire_conduit_derives_totals() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    // Declared totals in the payload are garbage; the store must re-derive.
    let mut submission = wire_submission();
    submission.awg_data[0].subtotal = 999999.0;
    submission.grand_total = 1.0;

    let estimation = store.submit_wire_conduit(project.id, submission).await?;

    assert_eq!(estimation.awg_total, 250.0);
    assert_eq!(estimation.conduit_total, 200.0);
    assert_eq!(estimation.tax_amount, 45.0);
    assert_eq!(estimation.grand_total, 495.0);

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.awg.len(), 1);
    assert_eq!(review.conduit.len(), 1);
    assert_eq!(review.awg[0].kind, WireKind::Awg);
    assert_eq!(review.awg[0].subtotal, 250.0);
    assert_eq!(review.conduit[0].subtotal, 200.0);

    Ok(())
}

#[tokio::test]
async fn test_resubmit_replaces_snapshot() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    let first = store.submit_wire_conduit(project.id, wire_submission()).await?;

    let mut second = wire_submission();
    second.conduit_data.clear();
    second.awg_data[0].cost = 12.0;
    let replacement = store.submit_wire_conduit(project.id, second).await?;

    // Same snapshot row, new figures, old entries gone.
    assert_eq!(replacement.id, first.id);
    assert_eq!(replacement.awg_total, 300.0);
    assert_eq!(replacement.conduit_total, 0.0);

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.awg.len(), 1);
    assert!(review.conduit.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_wire_submission_requires_entries() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    // Rejected submissions on a fresh project must not create a snapshot
    // or move the workflow.
    let result = store
        .submit_wire_conduit(project.id, WireConduitSubmission::default())
        .await;
    assert!(result.is_err(), "empty submission should be rejected");
    assert!(store.get_wire_conduit(project.id).await?.is_none());

    let mut bad_tax = wire_submission();
    bad_tax.tax = 250.0;
    let result = store.submit_wire_conduit(project.id, bad_tax).await;
    assert!(result.is_err(), "tax above 100% should be rejected");
    assert!(store.get_wire_conduit(project.id).await?.is_none());
    let p = store.get_project(project.id).await?.expect("project exists");
    assert_eq!(p.status, ProjectStatus::Started);

    // With a snapshot in place, a rejected resubmission leaves it untouched.
    store.submit_wire_conduit(project.id, wire_submission()).await?;
    let mut bad_tax = wire_submission();
    bad_tax.tax = 250.0;
    let result = store.submit_wire_conduit(project.id, bad_tax).await;
    assert!(result.is_err(), "tax above 100% should be rejected");

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.estimation.tax_percentage, 10.0);
    assert_eq!(review.estimation.grand_total, 495.0);
    assert_eq!(review.awg.len() + review.conduit.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_update_wire_entries() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;
    store.submit_wire_conduit(project.id, wire_submission()).await?;

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    let awg_id = review.awg[0].id;

    let estimation = store
        .update_wire_entries(
            project.id,
            EntryEdits {
                entries: vec![LineEdit {
                    id: awg_id,
                    cost: 20.0,
                    quantity: 10.0,
                }],
                tax_percentage: 0.0,
            },
        )
        .await?;

    // 20 × 10 = 200 AWG, conduit untouched at 200, no tax.
    assert_eq!(estimation.awg_total, 200.0);
    assert_eq!(estimation.conduit_total, 200.0);
    assert_eq!(estimation.tax_amount, 0.0);
    assert_eq!(estimation.grand_total, 400.0);

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.awg[0].cost, 20.0);
    assert_eq!(review.awg[0].length, 10.0);
    assert_eq!(review.awg[0].subtotal, 200.0);

    Ok(())
}

#[tokio::test]
async fn test_update_wire_entries_unknown_id() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;
    store.submit_wire_conduit(project.id, wire_submission()).await?;

    let before = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");

    let result = store
        .update_wire_entries(
            project.id,
            EntryEdits {
                entries: vec![LineEdit {
                    id: 99999,
                    cost: 1.0,
                    quantity: 1.0,
                }],
                tax_percentage: 0.0,
            },
        )
        .await;
    assert!(result.is_err(), "edit for unknown entry id should fail");

    // The rejected edit must not have touched the stored snapshot.
    let after = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(after.estimation.tax_percentage, before.estimation.tax_percentage);
    assert_eq!(after.estimation.grand_total, before.estimation.grand_total);
    assert_eq!(after.awg[0].cost, before.awg[0].cost);
    assert_eq!(after.awg[0].subtotal, before.awg[0].subtotal);
    assert_eq!(after.conduit[0].subtotal, before.conduit[0].subtotal);

    Ok(())
}

#[tokio::test]
async fn test_submit_misc_equipment() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    let estimation = store
        .submit_misc_equipment(project.id, misc_submission())
        .await?;

    assert_eq!(estimation.misc_total, 60.0);
    assert_eq!(estimation.equipment_total, 1000.0);
    assert_eq!(estimation.grand_total, 1060.0);

    let review = store
        .get_misc_equipment(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.misc.len(), 1);
    assert_eq!(review.equipment.len(), 1);
    assert_eq!(review.equipment[0].subtotal, 1000.0);

    Ok(())
}

#[tokio::test]
async fn test_submit_labor_drops_blank_rows() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;

    // The labor grid always posts its empty rows; only the filled one counts.
    let mut submission = labor_submission();
    submission.labor_data.push(LaborItem::default());
    submission.labor_data.push(LaborItem::default());

    let estimation = store.submit_labor(project.id, submission).await?;

    assert_eq!(estimation.labor_total, 2400.0);
    assert_eq!(estimation.low_voltage_total, 500.0);
    assert_eq!(estimation.grand_total, 2900.0);
    assert_eq!(estimation.chargers_count, 5);

    let review = store.get_labor(project.id).await?.expect("snapshot exists");
    assert_eq!(review.entries.len(), 1);
    assert_eq!(review.entries[0].position, "Electrician");
    assert_eq!(review.entries[0].subtotal, 2400.0);

    Ok(())
}

#[tokio::test]
async fn test_update_labor_entries() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;
    store.submit_labor(project.id, labor_submission()).await?;

    let review = store.get_labor(project.id).await?.expect("snapshot exists");
    let entry_id = review.entries[0].id;

    let estimation = store
        .update_labor_entries(
            project.id,
            LaborEdits {
                entries: vec![LaborLineEdit {
                    id: entry_id,
                    rate: 60.0,
                    workers: 1,
                    hours: 10.0,
                    days: 2.0,
                }],
                chargers_count: 4,
                charger_price: 150.0,
            },
        )
        .await?;

    // 60 × (1 × 10 × 2) = 1200; low voltage 4 × 150 = 600.
    assert_eq!(estimation.labor_total, 1200.0);
    assert_eq!(estimation.low_voltage_total, 600.0);
    assert_eq!(estimation.grand_total, 1800.0);
    assert_eq!(estimation.chargers_count, 4);

    Ok(())
}

#[tokio::test]
async fn test_submit_to_missing_project_fails() -> anyhow::Result<()> {
    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;

    let result = store.submit_wire_conduit(424242, wire_submission()).await;
    assert!(result.is_err(), "submission to a missing project should fail");

    Ok(())
}

#[tokio::test]
async fn test_submission_notes_keys_are_snake_case() -> anyhow::Result<()> {
    // The form body mixes camelCase data keys with snake_case notes keys.
    let raw = r#"{
        "awgData": [{"name": "6 AWG copper", "cost": 10.0, "length": 25.0}],
        "conduitData": [{"name": "3/4 EMT", "cost": 4.0, "length": 50.0}],
        "tax": 10.0,
        "notes_awg": "two runs",
        "notes_conduit": "ceiling mount"
    }"#;
    let submission: WireConduitSubmission = serde_json::from_str(raw)?;
    assert_eq!(submission.notes_awg.as_deref(), Some("two runs"));
    assert_eq!(submission.notes_conduit.as_deref(), Some("ceiling mount"));

    let (db, _temp_dir) = create_test_store().await;
    let store = create_test_contractor(&db, "alice@example.com").await;
    let project = create_test_project(&store).await;
    store.submit_wire_conduit(project.id, submission).await?;

    let review = store
        .get_wire_conduit(project.id)
        .await?
        .expect("snapshot exists");
    assert_eq!(review.awg[0].notes.as_deref(), Some("two runs"));
    assert_eq!(review.conduit[0].notes.as_deref(), Some("ceiling mount"));

    // The misc step posts the same mix of key styles.
    let raw = r#"{
        "miscData": [{"name": "Breaker lugs", "cost": 20.0, "quantity": 3.0}],
        "tax": 0.0,
        "notes_misc": "per panel",
        "notes_equip": "pedestal anchors included"
    }"#;
    let submission: MiscEquipmentSubmission = serde_json::from_str(raw)?;
    assert_eq!(submission.notes_misc.as_deref(), Some("per panel"));
    assert_eq!(
        submission.notes_equip.as_deref(),
        Some("pedestal anchors included")
    );

    Ok(())
}
