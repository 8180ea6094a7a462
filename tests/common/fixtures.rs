use evquote::core::db::{
    ContractorDb, EstimateDb, NewProject, NewUser, Project, ProjectRepository, UserRepository,
};
use evquote::payload::{
    LaborItem, LaborSubmission, LowVoltageInfo, MiscEquipmentSubmission, MiscItem,
    WireConduitSubmission, WireItem,
};
use time::macros::date;

/// Creates an EstimateDb backed by a temporary store file.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_store() -> (EstimateDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("test.evquote.db");
    let db = EstimateDb::open(&path)
        .await
        .expect("Failed to create test store");
    (db, dir)
}

/// Registers a user and returns a store handle bound to them.
pub async fn create_test_contractor(db: &EstimateDb, email: &str) -> ContractorDb {
    let user = db
        .add_user(NewUser {
            email: email.to_string(),
            username: "Test User".to_string(),
        })
        .await
        .expect("Failed to register test user");
    db.contractor(&user)
}

pub async fn create_test_project(store: &ContractorDb) -> Project {
    store
        .create_project(NewProject {
            address: "123 Main St".to_string(),
            company: None,
            start_date: date!(2026 - 01 - 15),
            project_type: Some("commercial".to_string()),
        })
        .await
        .expect("Failed to create test project")
}

/// AWG 10.00 × 25 = 250.00, conduit 4.00 × 50 = 200.00, tax 10% on the
/// combined 450.00, grand total 495.00.
pub fn wire_submission() -> WireConduitSubmission {
    WireConduitSubmission {
        awg_data: vec![WireItem {
            name: "6 AWG copper".to_string(),
            cost: 10.0,
            length: 25.0,
            subtotal: 0.0,
        }],
        conduit_data: vec![WireItem {
            name: "3/4 EMT".to_string(),
            cost: 4.0,
            length: 50.0,
            subtotal: 0.0,
        }],
        tax: 10.0,
        ..WireConduitSubmission::default()
    }
}

/// Misc 20.00 × 3 = 60.00, equipment 500.00 × 2 = 1000.00, no tax.
pub fn misc_submission() -> MiscEquipmentSubmission {
    MiscEquipmentSubmission {
        misc_data: vec![MiscItem {
            name: "Breaker lugs".to_string(),
            cost: 20.0,
            quantity: 3.0,
            subtotal: 0.0,
        }],
        equipment_data: vec![MiscItem {
            name: "Charger pedestal".to_string(),
            cost: 500.0,
            quantity: 2.0,
            subtotal: 0.0,
        }],
        tax: 0.0,
        ..MiscEquipmentSubmission::default()
    }
}

/// One crew: 50.00 × (2 × 8 × 3) = 2400.00; low voltage 5 × 100.00 = 500.00.
pub fn labor_submission() -> LaborSubmission {
    LaborSubmission {
        labor_data: vec![LaborItem {
            position: "Electrician".to_string(),
            rate: 50.0,
            workers: 2,
            hours: 8.0,
            days: 3.0,
            subtotal: 0.0,
            notes: None,
        }],
        low_voltage_data: LowVoltageInfo {
            chargers_count: 5,
            charger_price: 100.0,
        },
        ..LaborSubmission::default()
    }
}

/// Runs all three estimation steps on the project with the standard fixtures.
pub async fn submit_all_steps(store: &ContractorDb, project_id: i64) {
    use evquote::core::db::{
        LaborEstimationRepository, MiscEstimationRepository, WireEstimationRepository,
    };
    store
        .submit_wire_conduit(project_id, wire_submission())
        .await
        .expect("Failed to submit wire & conduit");
    store
        .submit_misc_equipment(project_id, misc_submission())
        .await
        .expect("Failed to submit misc & equipment");
    store
        .submit_labor(project_id, labor_submission())
        .await
        .expect("Failed to submit labor");
}
