mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from evquote for tests
pub use evquote::core::db::{
    ContractorDb, EstimateDb, LaborEstimationRepository, MiscEstimationRepository, NewProject,
    NewUser, Project, ProjectInfoUpdate, ProjectRepository, SummaryRepository, UserRepository,
    WireEstimationRepository, WireKind,
};
pub use evquote::payload::{
    EntryEdits, LaborEdits, LaborItem, LaborLineEdit, LaborSubmission, LineEdit,
    LowVoltageInfo, MiscEquipmentSubmission, MiscItem, SummaryInput, WireConduitSubmission,
    WireItem,
};
pub use evquote::{Approval, EstimationStep, ProjectStatus, SummaryCategory};
