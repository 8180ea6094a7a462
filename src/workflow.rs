//! Project workflow state: the ordered estimation submission pipeline.

use crate::error::EstimateError;

/// Status of a project within the fixed submission sequence.
///
/// Variants are declared in pipeline order so `Ord` reflects progress;
/// status only ever moves forward (see [`ProjectStatus::advance_to`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectStatus {
    Started,
    WireConduitSubmitted,
    MiscEquipmentSubmitted,
    LaborCostSubmitted,
    Completed,
}

/// The entry point a contractor lands on when resuming a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationStep {
    WireConduit,
    MiscEquipment,
    LaborCost,
    SummaryReview,
}

impl ProjectStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Started => "started",
            ProjectStatus::WireConduitSubmitted => "wire_conduit_submitted",
            ProjectStatus::MiscEquipmentSubmitted => "misc_equipment_submitted",
            ProjectStatus::LaborCostSubmitted => "labor_cost_submitted",
            ProjectStatus::Completed => "completed",
        }
    }

    /// Monotonic transition: moves to `target` only if it is further along
    /// the pipeline than the current status. Re-submitting an earlier step
    /// never regresses a project.
    pub fn advance_to(self, target: ProjectStatus) -> ProjectStatus {
        self.max(target)
    }

    /// Map the current status to the next incomplete step's entry point.
    ///
    /// `Completed` is an idempotent terminal state: resuming lands on the
    /// summary review, which may be re-entered and re-edited.
    pub fn resume(self) -> EstimationStep {
        match self {
            ProjectStatus::Started => EstimationStep::WireConduit,
            ProjectStatus::WireConduitSubmitted => EstimationStep::MiscEquipment,
            ProjectStatus::MiscEquipmentSubmitted => EstimationStep::LaborCost,
            ProjectStatus::LaborCostSubmitted | ProjectStatus::Completed => {
                EstimationStep::SummaryReview
            }
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = EstimateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "started" => Ok(ProjectStatus::Started),
            "wire_conduit_submitted" => Ok(ProjectStatus::WireConduitSubmitted),
            "misc_equipment_submitted" => Ok(ProjectStatus::MiscEquipmentSubmitted),
            "labor_cost_submitted" => Ok(ProjectStatus::LaborCostSubmitted),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(EstimateError::validation(
                "status",
                format!("unknown project status {other:?}"),
            )),
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EstimationStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            EstimationStep::WireConduit => "wire_conduit",
            EstimationStep::MiscEquipment => "misc_equipment",
            EstimationStep::LaborCost => "labor_cost",
            EstimationStep::SummaryReview => "summary_review",
        }
    }
}

impl std::fmt::Display for EstimationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
