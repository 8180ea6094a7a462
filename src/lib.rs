pub mod core;
pub mod error;
pub mod estimate;
pub mod logging;
pub mod payload;
pub mod summary;
pub mod workflow;

pub use crate::core::db::{ContractorDb, EstimateDb};
pub use error::{EstimateError, Result};
pub use summary::{Approval, SummaryCategory, SummarySheet};
pub use workflow::{EstimationStep, ProjectStatus};
