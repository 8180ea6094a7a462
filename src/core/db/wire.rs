use time::OffsetDateTime;

use crate::error::{EstimateError, Result};
use crate::estimate::CostedLine;
use crate::payload::{EntryEdits, WireConduitSubmission};

/// Whether a wire entry prices wire (by AWG size) or conduit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Awg,
    Conduit,
}

impl WireKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            WireKind::Awg => "AWG",
            WireKind::Conduit => "Conduit",
        }
    }
}

impl TryFrom<&str> for WireKind {
    type Error = EstimateError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "AWG" => Ok(WireKind::Awg),
            "Conduit" => Ok(WireKind::Conduit),
            other => Err(EstimateError::validation(
                "kind",
                format!("unknown wire entry kind {other:?}"),
            )),
        }
    }
}

/// One stored wire or conduit line item.
#[derive(Debug, Clone)]
pub struct WireEntry {
    pub id: i64,
    pub kind: WireKind,
    pub name: String,
    pub cost: f64,
    pub length: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
    pub(super) _guard: (),
}

impl CostedLine for WireEntry {
    fn unit_cost(&self) -> f64 {
        self.cost
    }

    fn unit_count(&self) -> f64 {
        self.length
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// The current wire & conduit snapshot of a project.
#[derive(Debug, Clone)]
pub struct WireConduitEstimation {
    pub id: i64,
    pub project_id: i64,
    pub tax_percentage: f64,
    pub tax_amount: f64,
    pub awg_total: f64,
    pub conduit_total: f64,
    pub grand_total: f64,
    pub created_at: OffsetDateTime,
    pub(super) _guard: (),
}

/// Snapshot plus its entries, split by kind, as the review page shows them.
#[derive(Debug, Clone)]
pub struct WireConduitReview {
    pub estimation: WireConduitEstimation,
    pub awg: Vec<WireEntry>,
    pub conduit: Vec<WireEntry>,
}

pub trait WireEstimationRepository {
    /// Validate, recompute all subtotals, replace the project's current
    /// snapshot and advance the workflow, in one transaction.
    fn submit_wire_conduit(
        &self,
        project_id: i64,
        submission: WireConduitSubmission,
    ) -> impl Future<Output = Result<WireConduitEstimation>>;
    fn get_wire_conduit(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Option<WireConduitReview>>>;
    /// Apply review-page edits to the current snapshot's entries and
    /// re-derive every total. Status is unchanged.
    fn update_wire_entries(
        &self,
        project_id: i64,
        edits: EntryEdits,
    ) -> impl Future<Output = Result<WireConduitEstimation>>;
}
