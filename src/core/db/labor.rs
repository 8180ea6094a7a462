use time::OffsetDateTime;

use crate::error::Result;
use crate::estimate::CostedLine;
use crate::payload::{LaborEdits, LaborSubmission};

/// One stored labor line item; subtotal is `rate × workers × hours × days`.
#[derive(Debug, Clone)]
pub struct LaborEntry {
    pub id: i64,
    pub position: String,
    pub rate: f64,
    pub workers: i64,
    pub hours: f64,
    pub days: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
    pub(super) _guard: (),
}

impl CostedLine for LaborEntry {
    fn unit_cost(&self) -> f64 {
        self.rate
    }

    fn unit_count(&self) -> f64 {
        self.workers as f64 * self.hours * self.days
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// The current labor snapshot of a project, including the charger figures
/// that feed the low-voltage total.
#[derive(Debug, Clone)]
pub struct LaborEstimation {
    pub id: i64,
    pub project_id: i64,
    pub chargers_count: i64,
    pub charger_price: f64,
    pub labor_total: f64,
    pub low_voltage_total: f64,
    pub grand_total: f64,
    pub created_at: OffsetDateTime,
    pub(super) _guard: (),
}

#[derive(Debug, Clone)]
pub struct LaborReview {
    pub estimation: LaborEstimation,
    pub entries: Vec<LaborEntry>,
}

pub trait LaborEstimationRepository {
    fn submit_labor(
        &self,
        project_id: i64,
        submission: LaborSubmission,
    ) -> impl Future<Output = Result<LaborEstimation>>;
    fn get_labor(&self, project_id: i64) -> impl Future<Output = Result<Option<LaborReview>>>;
    fn update_labor_entries(
        &self,
        project_id: i64,
        edits: LaborEdits,
    ) -> impl Future<Output = Result<LaborEstimation>>;
}
