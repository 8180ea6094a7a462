use time::OffsetDateTime;

use crate::error::{EstimateError, Result};
use crate::estimate::CostedLine;
use crate::payload::{EntryEdits, MiscEquipmentSubmission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscKind {
    Miscellaneous,
    Equipment,
}

impl MiscKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MiscKind::Miscellaneous => "Miscellaneous",
            MiscKind::Equipment => "Equipment",
        }
    }
}

impl TryFrom<&str> for MiscKind {
    type Error = EstimateError;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "Miscellaneous" => Ok(MiscKind::Miscellaneous),
            "Equipment" => Ok(MiscKind::Equipment),
            other => Err(EstimateError::validation(
                "kind",
                format!("unknown misc entry kind {other:?}"),
            )),
        }
    }
}

/// One stored miscellaneous or equipment line item.
#[derive(Debug, Clone)]
pub struct MiscEntry {
    pub id: i64,
    pub kind: MiscKind,
    pub name: String,
    pub cost: f64,
    pub quantity: f64,
    pub subtotal: f64,
    pub notes: Option<String>,
    pub(super) _guard: (),
}

impl CostedLine for MiscEntry {
    fn unit_cost(&self) -> f64 {
        self.cost
    }

    fn unit_count(&self) -> f64 {
        self.quantity
    }

    fn set_subtotal(&mut self, subtotal: f64) {
        self.subtotal = subtotal;
    }
}

/// The current miscellaneous & equipment snapshot of a project.
#[derive(Debug, Clone)]
pub struct MiscEquipmentEstimation {
    pub id: i64,
    pub project_id: i64,
    pub tax_percentage: f64,
    pub tax_amount: f64,
    pub misc_total: f64,
    pub equipment_total: f64,
    pub grand_total: f64,
    pub created_at: OffsetDateTime,
    pub(super) _guard: (),
}

#[derive(Debug, Clone)]
pub struct MiscEquipmentReview {
    pub estimation: MiscEquipmentEstimation,
    pub misc: Vec<MiscEntry>,
    pub equipment: Vec<MiscEntry>,
}

pub trait MiscEstimationRepository {
    fn submit_misc_equipment(
        &self,
        project_id: i64,
        submission: MiscEquipmentSubmission,
    ) -> impl Future<Output = Result<MiscEquipmentEstimation>>;
    fn get_misc_equipment(
        &self,
        project_id: i64,
    ) -> impl Future<Output = Result<Option<MiscEquipmentReview>>>;
    fn update_misc_entries(
        &self,
        project_id: i64,
        edits: EntryEdits,
    ) -> impl Future<Output = Result<MiscEquipmentEstimation>>;
}
