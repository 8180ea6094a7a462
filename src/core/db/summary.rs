use serde::Serialize;
use time::OffsetDateTime;

use crate::error::Result;
use crate::payload::SummaryInput;
use crate::summary::{Approval, SummarySheet};

/// The persisted summary of a project: the derivable sheet plus the
/// bookkeeping fields the back office tracks alongside it.
#[derive(Debug, Clone)]
pub struct SummaryRecord {
    pub id: i64,
    pub project_id: i64,
    pub sheet: SummarySheet,
    pub approval: Approval,
    pub price_per_charger_submitted: f64,
    pub total_submitted: f64,
    pub approved_amount: f64,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub(super) _guard: (),
}

/// Current per-category totals across the three estimation steps, the
/// numbers that seed the summary's base costs.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryTotals {
    pub awg_total: f64,
    pub conduit_total: f64,
    pub misc_total: f64,
    pub equipment_total: f64,
    pub labor_total: f64,
    pub low_voltage_total: f64,
    pub chargers_count: i64,
}

pub trait SummaryRepository {
    /// Current totals of all three steps; an error if any step has not been
    /// submitted yet.
    fn category_totals(&self, project_id: i64) -> impl Future<Output = Result<CategoryTotals>>;
    /// The summary sheet for review, created lazily on first call with base
    /// costs seeded from [`SummaryRepository::category_totals`].
    fn review_summary(&self, project_id: i64) -> impl Future<Output = Result<SummaryRecord>>;
    fn get_summary(&self, project_id: i64) -> impl Future<Output = Result<Option<SummaryRecord>>>;
    /// Apply validated markups/percentages, recalculate, persist and mark
    /// the project `completed`.
    fn save_summary(
        &self,
        project_id: i64,
        input: SummaryInput,
    ) -> impl Future<Output = Result<SummaryRecord>>;
    /// Review-page edit of an existing summary: recalculate and persist
    /// without touching the workflow status.
    fn update_summary(
        &self,
        project_id: i64,
        input: SummaryInput,
    ) -> impl Future<Output = Result<SummaryRecord>>;
}
