use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::error::Result;
use crate::summary::Approval;
use crate::workflow::ProjectStatus;

/// An EV-charger installation project owned by one user.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub address: String,
    pub company: String,
    pub start_date: Date,
    pub project_type: Option<String>,
    pub status: ProjectStatus,
    pub created_at: OffsetDateTime,
    pub(super) _guard: (),
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub address: String,
    /// Defaults to the installing company when not given.
    pub company: Option<String>,
    pub start_date: Date,
    pub project_type: Option<String>,
}

/// Basic-info edit from the review page; does not touch the workflow status.
#[derive(Debug, Clone, Default)]
pub struct ProjectInfoUpdate {
    pub address: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<Date>,
    pub project_type: Option<String>,
}

/// One row of the project listing: the project plus the summary figures the
/// listing page shows alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    pub id: i64,
    pub address: String,
    pub company: String,
    pub status: String,
    pub project_type: Option<String>,
    pub chargers_count: Option<i64>,
    pub approval: Option<Approval>,
    pub total_submitted: Option<f64>,
    pub approved_amount: Option<f64>,
}

pub trait ProjectRepository {
    fn create_project(&self, project: NewProject) -> impl Future<Output = Result<Project>>;
    fn get_project(&self, id: i64) -> impl Future<Output = Result<Option<Project>>>;
    /// All of the caller's projects, newest start date first.
    fn list_projects(&self) -> impl Future<Output = Result<Vec<ProjectOverview>>>;
    /// The caller's projects whose address contains `fragment`.
    fn search_projects(&self, fragment: &str) -> impl Future<Output = Result<Vec<Project>>>;
    fn update_project_info(
        &self,
        project: &Project,
        update: &ProjectInfoUpdate,
    ) -> impl Future<Output = Result<Project>>;
    /// Deletes the project and, by cascade, all of its estimations, entries
    /// and summary.
    fn delete_project(&self, project: Project) -> impl Future<Output = Result<()>>;
}
