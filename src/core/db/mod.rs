mod labor;
mod misc;
mod project;
mod state;
mod summary;
mod user;
mod wire;

use std::{path::Path, sync::Arc};

use sqlx::{Row, sqlite::SqliteRow};
use time::{Date, macros::format_description};
use tracing::info;

use crate::error::{EstimateError, Result};
use crate::estimate::{recompute_subtotals, round2, snapshot_totals};
use crate::payload::{
    EntryEdits, LaborEdits, LaborItem, LaborSubmission, MiscEquipmentSubmission, SummaryInput,
    Validate, WireConduitSubmission,
};
use crate::summary::{Approval, CategoryLine, SummaryCategory, SummarySheet};
use crate::workflow::ProjectStatus;

pub use labor::{LaborEntry, LaborEstimation, LaborEstimationRepository, LaborReview};
pub use misc::{
    MiscEntry, MiscEquipmentEstimation, MiscEquipmentReview, MiscEstimationRepository, MiscKind,
};
pub use project::{NewProject, Project, ProjectInfoUpdate, ProjectOverview, ProjectRepository};
pub use summary::{CategoryTotals, SummaryRecord, SummaryRepository};
pub use user::{NewUser, User, UserRepository};
pub use wire::{
    WireConduitEstimation, WireConduitReview, WireEntry, WireEstimationRepository, WireKind,
};

/// Company filled in when a new project does not name one.
const DEFAULT_COMPANY: &str = "Chargie";

const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

fn format_date(date: Date) -> Result<String> {
    Ok(date.format(&DATE_FORMAT)?)
}

fn parse_date(value: &str) -> Result<Date> {
    Ok(Date::parse(value, &DATE_FORMAT)?)
}

/// Handle to an estimation store file.
#[derive(Debug, Clone)]
pub struct EstimateDb {
    state: Arc<state::StoreState>,
}

impl EstimateDb {
    /// Open (or create) the store at the given path and run migrations.
    pub async fn open<P: AsRef<Path>>(db_file: P) -> Result<Self> {
        Ok(Self {
            state: Arc::new(state::StoreState::open(db_file).await?),
        })
    }

    /// Bind a handle to one tenant. Every project operation goes through the
    /// returned handle, so queries always carry the owner's id: another
    /// tenant's project behaves exactly like a missing one.
    pub fn contractor(&self, user: &User) -> ContractorDb {
        self.contractor_for(user.id)
    }

    pub fn contractor_for(&self, user_id: i64) -> ContractorDb {
        ContractorDb {
            state: self.state.clone(),
            user_id,
        }
    }
}

/// Store handle scoped to one authenticated user.
#[derive(Debug, Clone)]
pub struct ContractorDb {
    state: Arc<state::StoreState>,
    user_id: i64,
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.try_get("created_at")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        created_at: state::parse_timestamp(&created_at)?,
        _guard: (),
    })
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    let start_date: String = row.try_get("start_date")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Project {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        address: row.try_get("address")?,
        company: row.try_get("company")?,
        start_date: parse_date(&start_date)?,
        project_type: row.try_get("project_type")?,
        status: ProjectStatus::try_from(status.as_str())?,
        created_at: state::parse_timestamp(&created_at)?,
        _guard: (),
    })
}

impl UserRepository for EstimateDb {
    async fn add_user(&self, user: NewUser) -> Result<User> {
        let created_at = state::now_rfc3339()?;
        let row = sqlx::query(
            "INSERT INTO users (email, username, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&created_at)
        .fetch_one(self.state.pool())
        .await?;
        Ok(User {
            id: row.try_get("id")?,
            email: user.email,
            username: user.username,
            created_at: state::parse_timestamp(&created_at)?,
            _guard: (),
        })
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, username, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.state.pool())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, username, created_at FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.state.pool())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

impl ContractorDb {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// The project by id, owned by this user, or not-found.
    async fn fetch_project(&self, id: i64) -> Result<Project> {
        self.get_project(id)
            .await?
            .ok_or(EstimateError::not_found("project"))
    }

    async fn advance_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        project: &Project,
        target: ProjectStatus,
    ) -> Result<ProjectStatus> {
        let status = project.status.advance_to(target);
        sqlx::query("UPDATE projects SET status = ? WHERE id = ? AND user_id = ?")
            .bind(status.as_str())
            .bind(project.id)
            .bind(self.user_id)
            .execute(&mut **tx)
            .await?;
        Ok(status)
    }

    /// Everything the review page shows for one project.
    pub async fn project_review(&self, project_id: i64) -> Result<ProjectReview> {
        let project = self.fetch_project(project_id).await?;
        Ok(ProjectReview {
            wire_conduit: self.get_wire_conduit(project_id).await?,
            misc_equipment: self.get_misc_equipment(project_id).await?,
            labor: self.get_labor(project_id).await?,
            summary: self.get_summary(project_id).await?,
            project,
        })
    }
}

/// Aggregate view of a project and all of its submitted figures.
#[derive(Debug, Clone)]
pub struct ProjectReview {
    pub project: Project,
    pub wire_conduit: Option<WireConduitReview>,
    pub misc_equipment: Option<MiscEquipmentReview>,
    pub labor: Option<LaborReview>,
    pub summary: Option<SummaryRecord>,
}

impl ProjectRepository for ContractorDb {
    async fn create_project(&self, project: NewProject) -> Result<Project> {
        let company = project
            .company
            .unwrap_or_else(|| DEFAULT_COMPANY.to_string());
        let start_date = format_date(project.start_date)?;
        let created_at = state::now_rfc3339()?;
        let row = sqlx::query(
            "INSERT INTO projects (user_id, address, company, start_date, project_type, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(self.user_id)
        .bind(&project.address)
        .bind(&company)
        .bind(&start_date)
        .bind(&project.project_type)
        .bind(ProjectStatus::Started.as_str())
        .bind(&created_at)
        .fetch_one(self.state.pool())
        .await?;
        info!(user_id = self.user_id, address = %project.address, "project created");
        Ok(Project {
            id: row.try_get("id")?,
            user_id: self.user_id,
            address: project.address,
            company,
            start_date: project.start_date,
            project_type: project.project_type,
            status: ProjectStatus::Started,
            created_at: state::parse_timestamp(&created_at)?,
            _guard: (),
        })
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, user_id, address, company, start_date, project_type, status, created_at \
             FROM projects WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        row.as_ref().map(project_from_row).transpose()
    }

    async fn list_projects(&self) -> Result<Vec<ProjectOverview>> {
        let rows = sqlx::query(
            "SELECT p.id, p.address, p.company, p.status, p.project_type, \
                    le.chargers_count AS chargers_count, \
                    ps.approval AS approval, \
                    ps.total_submitted AS total_submitted, \
                    ps.approved_amount AS approved_amount \
             FROM projects p \
             LEFT JOIN labor_estimations le ON le.project_id = p.id \
             LEFT JOIN project_summaries ps ON ps.project_id = p.id \
             WHERE p.user_id = ? \
             ORDER BY p.start_date DESC, p.id DESC",
        )
        .bind(self.user_id)
        .fetch_all(self.state.pool())
        .await?;
        rows.into_iter()
            .map(|row| {
                let approval: Option<i64> = row.try_get("approval")?;
                Ok(ProjectOverview {
                    id: row.try_get("id")?,
                    address: row.try_get("address")?,
                    company: row.try_get("company")?,
                    status: row.try_get("status")?,
                    project_type: row.try_get("project_type")?,
                    chargers_count: row.try_get("chargers_count")?,
                    approval: approval.map(Approval::try_from).transpose()?,
                    total_submitted: row.try_get("total_submitted")?,
                    approved_amount: row.try_get("approved_amount")?,
                })
            })
            .collect()
    }

    async fn search_projects(&self, fragment: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT id, user_id, address, company, start_date, project_type, status, created_at \
             FROM projects \
             WHERE user_id = ? AND address LIKE '%' || ? || '%' \
             ORDER BY start_date DESC, id DESC",
        )
        .bind(self.user_id)
        .bind(fragment)
        .fetch_all(self.state.pool())
        .await?;
        rows.iter().map(project_from_row).collect()
    }

    async fn update_project_info(
        &self,
        project: &Project,
        update: &ProjectInfoUpdate,
    ) -> Result<Project> {
        let start_date = update.start_date.map(format_date).transpose()?;
        let row = sqlx::query(
            "UPDATE projects SET \
                address = COALESCE(?, address), \
                company = COALESCE(?, company), \
                start_date = COALESCE(?, start_date), \
                project_type = COALESCE(?, project_type) \
             WHERE id = ? AND user_id = ? \
             RETURNING id, user_id, address, company, start_date, project_type, status, created_at",
        )
        .bind(&update.address)
        .bind(&update.company)
        .bind(&start_date)
        .bind(&update.project_type)
        .bind(project.id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        let row = row.ok_or(EstimateError::not_found("project"))?;
        project_from_row(&row)
    }

    async fn delete_project(&self, project: Project) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
            .bind(project.id)
            .bind(self.user_id)
            .execute(self.state.pool())
            .await?;
        info!(user_id = self.user_id, project_id = project.id, "project deleted");
        Ok(())
    }
}

fn wire_entry_from_row(row: &SqliteRow) -> Result<WireEntry> {
    let kind: String = row.try_get("kind")?;
    Ok(WireEntry {
        id: row.try_get("id")?,
        kind: WireKind::try_from(kind.as_str())?,
        name: row.try_get("name")?,
        cost: row.try_get("cost")?,
        length: row.try_get("length")?,
        subtotal: row.try_get("subtotal")?,
        notes: row.try_get("notes")?,
        _guard: (),
    })
}

fn wire_estimation_from_row(row: &SqliteRow) -> Result<WireConduitEstimation> {
    let created_at: String = row.try_get("created_at")?;
    Ok(WireConduitEstimation {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        tax_percentage: row.try_get("tax_percentage")?,
        tax_amount: row.try_get("tax_amount")?,
        awg_total: row.try_get("awg_total")?,
        conduit_total: row.try_get("conduit_total")?,
        grand_total: row.try_get("grand_total")?,
        created_at: state::parse_timestamp(&created_at)?,
        _guard: (),
    })
}

impl WireEstimationRepository for ContractorDb {
    async fn submit_wire_conduit(
        &self,
        project_id: i64,
        submission: WireConduitSubmission,
    ) -> Result<WireConduitEstimation> {
        submission.validate()?;
        let project = self.fetch_project(project_id).await?;

        let WireConduitSubmission {
            mut awg_data,
            mut conduit_data,
            tax,
            notes_awg,
            notes_conduit,
            ..
        } = submission;
        let awg_total = recompute_subtotals(&mut awg_data);
        let conduit_total = recompute_subtotals(&mut conduit_data);
        let totals = snapshot_totals(awg_total + conduit_total, tax);
        let created_at = state::now_rfc3339()?;

        let mut tx = self.state.pool().begin().await?;
        let row = sqlx::query(
            "INSERT INTO wire_conduit_estimations \
                (project_id, tax_percentage, tax_amount, awg_total, conduit_total, grand_total, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
                tax_percentage = excluded.tax_percentage, \
                tax_amount = excluded.tax_amount, \
                awg_total = excluded.awg_total, \
                conduit_total = excluded.conduit_total, \
                grand_total = excluded.grand_total, \
                created_at = excluded.created_at \
             RETURNING id",
        )
        .bind(project.id)
        .bind(tax)
        .bind(totals.tax_amount)
        .bind(awg_total)
        .bind(conduit_total)
        .bind(totals.grand_total)
        .bind(&created_at)
        .fetch_one(&mut *tx)
        .await?;
        let estimation_id: i64 = row.try_get("id")?;

        sqlx::query("DELETE FROM wire_entries WHERE estimation_id = ?")
            .bind(estimation_id)
            .execute(&mut *tx)
            .await?;
        for (kind, items, notes) in [
            (WireKind::Awg, &awg_data, &notes_awg),
            (WireKind::Conduit, &conduit_data, &notes_conduit),
        ] {
            for item in items {
                sqlx::query(
                    "INSERT INTO wire_entries (estimation_id, kind, name, cost, length, subtotal, notes) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(estimation_id)
                .bind(kind.as_str())
                .bind(&item.name)
                .bind(item.cost)
                .bind(item.length)
                .bind(item.subtotal)
                .bind(notes.as_deref())
                .execute(&mut *tx)
                .await?;
            }
        }
        self.advance_status(&mut tx, &project, ProjectStatus::WireConduitSubmitted)
            .await?;
        tx.commit().await?;
        info!(project_id = project.id, step = "wire_conduit", "estimation submitted");
        Ok(WireConduitEstimation {
            id: estimation_id,
            project_id: project.id,
            tax_percentage: tax,
            tax_amount: totals.tax_amount,
            awg_total,
            conduit_total,
            grand_total: totals.grand_total,
            created_at: state::parse_timestamp(&created_at)?,
            _guard: (),
        })
    }

    async fn get_wire_conduit(&self, project_id: i64) -> Result<Option<WireConduitReview>> {
        let row = sqlx::query(
            "SELECT e.id, e.project_id, e.tax_percentage, e.tax_amount, e.awg_total, \
                    e.conduit_total, e.grand_total, e.created_at \
             FROM wire_conduit_estimations e \
             JOIN projects p ON p.id = e.project_id \
             WHERE e.project_id = ? AND p.user_id = ?",
        )
        .bind(project_id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let estimation = wire_estimation_from_row(&row)?;
        let rows = sqlx::query(
            "SELECT id, kind, name, cost, length, subtotal, notes \
             FROM wire_entries WHERE estimation_id = ? ORDER BY id ASC",
        )
        .bind(estimation.id)
        .fetch_all(self.state.pool())
        .await?;
        let entries: Vec<WireEntry> = rows
            .iter()
            .map(wire_entry_from_row)
            .collect::<Result<_>>()?;
        let (awg, conduit) = entries
            .into_iter()
            .partition(|entry| entry.kind == WireKind::Awg);
        Ok(Some(WireConduitReview {
            estimation,
            awg,
            conduit,
        }))
    }

    async fn update_wire_entries(
        &self,
        project_id: i64,
        edits: EntryEdits,
    ) -> Result<WireConduitEstimation> {
        edits.validate()?;
        let review = self
            .get_wire_conduit(project_id)
            .await?
            .ok_or(EstimateError::not_found("wire & conduit estimation"))?;

        let mut entries: Vec<WireEntry> =
            review.awg.into_iter().chain(review.conduit).collect();
        for edit in &edits.entries {
            let entry = entries
                .iter_mut()
                .find(|entry| entry.id == edit.id)
                .ok_or_else(|| {
                    EstimateError::validation("entries", format!("unknown entry id {}", edit.id))
                })?;
            entry.cost = edit.cost;
            entry.length = edit.quantity;
        }
        let (mut awg, mut conduit): (Vec<WireEntry>, Vec<WireEntry>) = entries
            .into_iter()
            .partition(|entry| entry.kind == WireKind::Awg);
        let awg_total = recompute_subtotals(&mut awg);
        let conduit_total = recompute_subtotals(&mut conduit);
        let totals = snapshot_totals(awg_total + conduit_total, edits.tax_percentage);

        let mut tx = self.state.pool().begin().await?;
        for entry in awg.iter().chain(conduit.iter()) {
            sqlx::query(
                "UPDATE wire_entries SET cost = ?, length = ?, subtotal = ? \
                 WHERE id = ? AND estimation_id = ?",
            )
            .bind(entry.cost)
            .bind(entry.length)
            .bind(entry.subtotal)
            .bind(entry.id)
            .bind(review.estimation.id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "UPDATE wire_conduit_estimations SET \
                tax_percentage = ?, tax_amount = ?, awg_total = ?, conduit_total = ?, grand_total = ? \
             WHERE id = ?",
        )
        .bind(edits.tax_percentage)
        .bind(totals.tax_amount)
        .bind(awg_total)
        .bind(conduit_total)
        .bind(totals.grand_total)
        .bind(review.estimation.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(WireConduitEstimation {
            tax_percentage: edits.tax_percentage,
            tax_amount: totals.tax_amount,
            awg_total,
            conduit_total,
            grand_total: totals.grand_total,
            ..review.estimation
        })
    }
}

fn misc_entry_from_row(row: &SqliteRow) -> Result<MiscEntry> {
    let kind: String = row.try_get("kind")?;
    Ok(MiscEntry {
        id: row.try_get("id")?,
        kind: MiscKind::try_from(kind.as_str())?,
        name: row.try_get("name")?,
        cost: row.try_get("cost")?,
        quantity: row.try_get("quantity")?,
        subtotal: row.try_get("subtotal")?,
        notes: row.try_get("notes")?,
        _guard: (),
    })
}

fn misc_estimation_from_row(row: &SqliteRow) -> Result<MiscEquipmentEstimation> {
    let created_at: String = row.try_get("created_at")?;
    Ok(MiscEquipmentEstimation {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        tax_percentage: row.try_get("tax_percentage")?,
        tax_amount: row.try_get("tax_amount")?,
        misc_total: row.try_get("misc_total")?,
        equipment_total: row.try_get("equipment_total")?,
        grand_total: row.try_get("grand_total")?,
        created_at: state::parse_timestamp(&created_at)?,
        _guard: (),
    })
}

impl MiscEstimationRepository for ContractorDb {
    async fn submit_misc_equipment(
        &self,
        project_id: i64,
        submission: MiscEquipmentSubmission,
    ) -> Result<MiscEquipmentEstimation> {
        submission.validate()?;
        let project = self.fetch_project(project_id).await?;

        let MiscEquipmentSubmission {
            mut misc_data,
            mut equipment_data,
            tax,
            notes_misc,
            notes_equip,
            ..
        } = submission;
        let misc_total = recompute_subtotals(&mut misc_data);
        let equipment_total = recompute_subtotals(&mut equipment_data);
        let totals = snapshot_totals(misc_total + equipment_total, tax);
        let created_at = state::now_rfc3339()?;

        let mut tx = self.state.pool().begin().await?;
        let row = sqlx::query(
            "INSERT INTO misc_equipment_estimations \
                (project_id, tax_percentage, tax_amount, misc_total, equipment_total, grand_total, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
                tax_percentage = excluded.tax_percentage, \
                tax_amount = excluded.tax_amount, \
                misc_total = excluded.misc_total, \
                equipment_total = excluded.equipment_total, \
                grand_total = excluded.grand_total, \
                created_at = excluded.created_at \
             RETURNING id",
        )
        .bind(project.id)
        .bind(tax)
        .bind(totals.tax_amount)
        .bind(misc_total)
        .bind(equipment_total)
        .bind(totals.grand_total)
        .bind(&created_at)
        .fetch_one(&mut *tx)
        .await?;
        let estimation_id: i64 = row.try_get("id")?;

        sqlx::query("DELETE FROM misc_entries WHERE estimation_id = ?")
            .bind(estimation_id)
            .execute(&mut *tx)
            .await?;
        for (kind, items, notes) in [
            (MiscKind::Miscellaneous, &misc_data, &notes_misc),
            (MiscKind::Equipment, &equipment_data, &notes_equip),
        ] {
            for item in items {
                sqlx::query(
                    "INSERT INTO misc_entries (estimation_id, kind, name, cost, quantity, subtotal, notes) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(estimation_id)
                .bind(kind.as_str())
                .bind(&item.name)
                .bind(item.cost)
                .bind(item.quantity)
                .bind(item.subtotal)
                .bind(notes.as_deref())
                .execute(&mut *tx)
                .await?;
            }
        }
        self.advance_status(&mut tx, &project, ProjectStatus::MiscEquipmentSubmitted)
            .await?;
        tx.commit().await?;
        info!(project_id = project.id, step = "misc_equipment", "estimation submitted");
        Ok(MiscEquipmentEstimation {
            id: estimation_id,
            project_id: project.id,
            tax_percentage: tax,
            tax_amount: totals.tax_amount,
            misc_total,
            equipment_total,
            grand_total: totals.grand_total,
            created_at: state::parse_timestamp(&created_at)?,
            _guard: (),
        })
    }

    async fn get_misc_equipment(&self, project_id: i64) -> Result<Option<MiscEquipmentReview>> {
        let row = sqlx::query(
            "SELECT e.id, e.project_id, e.tax_percentage, e.tax_amount, e.misc_total, \
                    e.equipment_total, e.grand_total, e.created_at \
             FROM misc_equipment_estimations e \
             JOIN projects p ON p.id = e.project_id \
             WHERE e.project_id = ? AND p.user_id = ?",
        )
        .bind(project_id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let estimation = misc_estimation_from_row(&row)?;
        let rows = sqlx::query(
            "SELECT id, kind, name, cost, quantity, subtotal, notes \
             FROM misc_entries WHERE estimation_id = ? ORDER BY id ASC",
        )
        .bind(estimation.id)
        .fetch_all(self.state.pool())
        .await?;
        let entries: Vec<MiscEntry> = rows
            .iter()
            .map(misc_entry_from_row)
            .collect::<Result<_>>()?;
        let (misc, equipment) = entries
            .into_iter()
            .partition(|entry| entry.kind == MiscKind::Miscellaneous);
        Ok(Some(MiscEquipmentReview {
            estimation,
            misc,
            equipment,
        }))
    }

    async fn update_misc_entries(
        &self,
        project_id: i64,
        edits: EntryEdits,
    ) -> Result<MiscEquipmentEstimation> {
        edits.validate()?;
        let review = self
            .get_misc_equipment(project_id)
            .await?
            .ok_or(EstimateError::not_found("misc & equipment estimation"))?;

        let mut entries: Vec<MiscEntry> =
            review.misc.into_iter().chain(review.equipment).collect();
        for edit in &edits.entries {
            let entry = entries
                .iter_mut()
                .find(|entry| entry.id == edit.id)
                .ok_or_else(|| {
                    EstimateError::validation("entries", format!("unknown entry id {}", edit.id))
                })?;
            entry.cost = edit.cost;
            entry.quantity = edit.quantity;
        }
        let (mut misc, mut equipment): (Vec<MiscEntry>, Vec<MiscEntry>) = entries
            .into_iter()
            .partition(|entry| entry.kind == MiscKind::Miscellaneous);
        let misc_total = recompute_subtotals(&mut misc);
        let equipment_total = recompute_subtotals(&mut equipment);
        let totals = snapshot_totals(misc_total + equipment_total, edits.tax_percentage);

        let mut tx = self.state.pool().begin().await?;
        for entry in misc.iter().chain(equipment.iter()) {
            sqlx::query(
                "UPDATE misc_entries SET cost = ?, quantity = ?, subtotal = ? \
                 WHERE id = ? AND estimation_id = ?",
            )
            .bind(entry.cost)
            .bind(entry.quantity)
            .bind(entry.subtotal)
            .bind(entry.id)
            .bind(review.estimation.id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "UPDATE misc_equipment_estimations SET \
                tax_percentage = ?, tax_amount = ?, misc_total = ?, equipment_total = ?, grand_total = ? \
             WHERE id = ?",
        )
        .bind(edits.tax_percentage)
        .bind(totals.tax_amount)
        .bind(misc_total)
        .bind(equipment_total)
        .bind(totals.grand_total)
        .bind(review.estimation.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(MiscEquipmentEstimation {
            tax_percentage: edits.tax_percentage,
            tax_amount: totals.tax_amount,
            misc_total,
            equipment_total,
            grand_total: totals.grand_total,
            ..review.estimation
        })
    }
}

fn labor_entry_from_row(row: &SqliteRow) -> Result<LaborEntry> {
    Ok(LaborEntry {
        id: row.try_get("id")?,
        position: row.try_get("position")?,
        rate: row.try_get("rate")?,
        workers: row.try_get("workers")?,
        hours: row.try_get("hours")?,
        days: row.try_get("days")?,
        subtotal: row.try_get("subtotal")?,
        notes: row.try_get("notes")?,
        _guard: (),
    })
}

fn labor_estimation_from_row(row: &SqliteRow) -> Result<LaborEstimation> {
    let created_at: String = row.try_get("created_at")?;
    Ok(LaborEstimation {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        chargers_count: row.try_get("chargers_count")?,
        charger_price: row.try_get("charger_price")?,
        labor_total: row.try_get("labor_total")?,
        low_voltage_total: row.try_get("low_voltage_total")?,
        grand_total: row.try_get("grand_total")?,
        created_at: state::parse_timestamp(&created_at)?,
        _guard: (),
    })
}

impl LaborEstimationRepository for ContractorDb {
    async fn submit_labor(
        &self,
        project_id: i64,
        submission: LaborSubmission,
    ) -> Result<LaborEstimation> {
        submission.validate()?;
        let project = self.fetch_project(project_id).await?;

        // Blank grid rows are dropped rather than stored.
        let mut labor_data: Vec<LaborItem> = submission
            .labor_data
            .into_iter()
            .filter(|item| !item.is_blank())
            .collect();
        let labor_total = recompute_subtotals(&mut labor_data);
        let low_voltage = submission.low_voltage_data;
        let low_voltage_total =
            round2(low_voltage.chargers_count as f64 * low_voltage.charger_price);
        let grand_total = round2(labor_total + low_voltage_total);
        let created_at = state::now_rfc3339()?;

        let mut tx = self.state.pool().begin().await?;
        let row = sqlx::query(
            "INSERT INTO labor_estimations \
                (project_id, chargers_count, charger_price, labor_total, low_voltage_total, grand_total, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (project_id) DO UPDATE SET \
                chargers_count = excluded.chargers_count, \
                charger_price = excluded.charger_price, \
                labor_total = excluded.labor_total, \
                low_voltage_total = excluded.low_voltage_total, \
                grand_total = excluded.grand_total, \
                created_at = excluded.created_at \
             RETURNING id",
        )
        .bind(project.id)
        .bind(low_voltage.chargers_count)
        .bind(low_voltage.charger_price)
        .bind(labor_total)
        .bind(low_voltage_total)
        .bind(grand_total)
        .bind(&created_at)
        .fetch_one(&mut *tx)
        .await?;
        let estimation_id: i64 = row.try_get("id")?;

        sqlx::query("DELETE FROM labor_entries WHERE estimation_id = ?")
            .bind(estimation_id)
            .execute(&mut *tx)
            .await?;
        for item in &labor_data {
            sqlx::query(
                "INSERT INTO labor_entries (estimation_id, position, rate, workers, hours, days, subtotal, notes) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(estimation_id)
            .bind(&item.position)
            .bind(item.rate)
            .bind(item.workers)
            .bind(item.hours)
            .bind(item.days)
            .bind(item.subtotal)
            .bind(item.notes.as_deref())
            .execute(&mut *tx)
            .await?;
        }
        self.advance_status(&mut tx, &project, ProjectStatus::LaborCostSubmitted)
            .await?;
        tx.commit().await?;
        info!(project_id = project.id, step = "labor_cost", "estimation submitted");
        Ok(LaborEstimation {
            id: estimation_id,
            project_id: project.id,
            chargers_count: low_voltage.chargers_count,
            charger_price: low_voltage.charger_price,
            labor_total,
            low_voltage_total,
            grand_total,
            created_at: state::parse_timestamp(&created_at)?,
            _guard: (),
        })
    }

    async fn get_labor(&self, project_id: i64) -> Result<Option<LaborReview>> {
        let row = sqlx::query(
            "SELECT e.id, e.project_id, e.chargers_count, e.charger_price, e.labor_total, \
                    e.low_voltage_total, e.grand_total, e.created_at \
             FROM labor_estimations e \
             JOIN projects p ON p.id = e.project_id \
             WHERE e.project_id = ? AND p.user_id = ?",
        )
        .bind(project_id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let estimation = labor_estimation_from_row(&row)?;
        let rows = sqlx::query(
            "SELECT id, position, rate, workers, hours, days, subtotal, notes \
             FROM labor_entries WHERE estimation_id = ? ORDER BY id ASC",
        )
        .bind(estimation.id)
        .fetch_all(self.state.pool())
        .await?;
        let entries = rows
            .iter()
            .map(labor_entry_from_row)
            .collect::<Result<_>>()?;
        Ok(Some(LaborReview { estimation, entries }))
    }

    async fn update_labor_entries(
        &self,
        project_id: i64,
        edits: LaborEdits,
    ) -> Result<LaborEstimation> {
        edits.validate()?;
        let review = self
            .get_labor(project_id)
            .await?
            .ok_or(EstimateError::not_found("labor estimation"))?;

        let mut entries = review.entries;
        for edit in &edits.entries {
            let entry = entries
                .iter_mut()
                .find(|entry| entry.id == edit.id)
                .ok_or_else(|| {
                    EstimateError::validation("entries", format!("unknown entry id {}", edit.id))
                })?;
            entry.rate = edit.rate;
            entry.workers = edit.workers;
            entry.hours = edit.hours;
            entry.days = edit.days;
        }
        let labor_total = recompute_subtotals(&mut entries);
        let low_voltage_total = round2(edits.chargers_count as f64 * edits.charger_price);
        let grand_total = round2(labor_total + low_voltage_total);

        let mut tx = self.state.pool().begin().await?;
        for entry in &entries {
            sqlx::query(
                "UPDATE labor_entries SET rate = ?, workers = ?, hours = ?, days = ?, subtotal = ? \
                 WHERE id = ? AND estimation_id = ?",
            )
            .bind(entry.rate)
            .bind(entry.workers)
            .bind(entry.hours)
            .bind(entry.days)
            .bind(entry.subtotal)
            .bind(entry.id)
            .bind(review.estimation.id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "UPDATE labor_estimations SET \
                chargers_count = ?, charger_price = ?, labor_total = ?, low_voltage_total = ?, grand_total = ? \
             WHERE id = ?",
        )
        .bind(edits.chargers_count)
        .bind(edits.charger_price)
        .bind(labor_total)
        .bind(low_voltage_total)
        .bind(grand_total)
        .bind(review.estimation.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(LaborEstimation {
            chargers_count: edits.chargers_count,
            charger_price: edits.charger_price,
            labor_total,
            low_voltage_total,
            grand_total,
            ..review.estimation
        })
    }
}

impl ContractorDb {
    async fn load_summary(&self, project_id: i64) -> Result<Option<SummaryRecord>> {
        let row = sqlx::query(
            "SELECT s.id, s.project_id, s.tax_percentage, s.tax_subtotal, s.overhead_percentage, \
                    s.overhead_subtotal, s.grand_subtotal, s.grand_total, s.chargers_count, \
                    s.price_per_charger, s.price_per_charger_submitted, s.total_submitted, \
                    s.approved_amount, s.approval, s.notes, s.created_at, s.updated_at \
             FROM project_summaries s \
             JOIN projects p ON p.id = s.project_id \
             WHERE s.project_id = ? AND p.user_id = ?",
        )
        .bind(project_id)
        .bind(self.user_id)
        .fetch_optional(self.state.pool())
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let summary_id: i64 = row.try_get("id")?;

        let mut sheet = SummarySheet {
            tax_percentage: row.try_get("tax_percentage")?,
            tax_subtotal: row.try_get("tax_subtotal")?,
            overhead_percentage: row.try_get("overhead_percentage")?,
            overhead_subtotal: row.try_get("overhead_subtotal")?,
            grand_subtotal: row.try_get("grand_subtotal")?,
            grand_total: row.try_get("grand_total")?,
            chargers_count: row.try_get("chargers_count")?,
            price_per_charger: row.try_get("price_per_charger")?,
            ..SummarySheet::default()
        };
        let line_rows = sqlx::query(
            "SELECT category, base_cost, markup, subtotal, profit \
             FROM summary_lines WHERE summary_id = ? ORDER BY category ASC",
        )
        .bind(summary_id)
        .fetch_all(self.state.pool())
        .await?;
        for line_row in &line_rows {
            let category = SummaryCategory::try_from(line_row.try_get::<i64, _>("category")?)?;
            *sheet.line_mut(category) = CategoryLine {
                base_cost: line_row.try_get("base_cost")?,
                markup: line_row.try_get("markup")?,
                subtotal: line_row.try_get("subtotal")?,
                profit: line_row.try_get("profit")?,
            };
        }

        let approval: i64 = row.try_get("approval")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        Ok(Some(SummaryRecord {
            id: summary_id,
            project_id: row.try_get("project_id")?,
            sheet,
            approval: Approval::try_from(approval)?,
            price_per_charger_submitted: row.try_get("price_per_charger_submitted")?,
            total_submitted: row.try_get("total_submitted")?,
            approved_amount: row.try_get("approved_amount")?,
            notes: row.try_get("notes")?,
            created_at: state::parse_timestamp(&created_at)?,
            updated_at: state::parse_timestamp(&updated_at)?,
            _guard: (),
        }))
    }

    /// Overwrite the sheet's base costs (permits excepted) and charger count
    /// with the current estimation totals.
    fn seed_base_costs(sheet: &mut SummarySheet, totals: &CategoryTotals) {
        sheet.line_mut(SummaryCategory::Awg).base_cost = totals.awg_total;
        sheet.line_mut(SummaryCategory::Conduit).base_cost = totals.conduit_total;
        sheet.line_mut(SummaryCategory::Misc).base_cost = totals.misc_total;
        sheet.line_mut(SummaryCategory::Equipment).base_cost = totals.equipment_total;
        sheet.line_mut(SummaryCategory::Labor).base_cost = totals.labor_total;
        sheet.line_mut(SummaryCategory::LowVoltage).base_cost = totals.low_voltage_total;
        sheet.chargers_count = totals.chargers_count;
    }

    fn apply_summary_input(record: &mut SummaryRecord, input: &SummaryInput) {
        for category in SummaryCategory::ALL {
            record.sheet.line_mut(category).markup = input.markup(category);
        }
        record.sheet.line_mut(SummaryCategory::Permits).base_cost = input.permits_base_cost;
        record.sheet.tax_percentage = input.tax_percentage;
        record.sheet.overhead_percentage = input.overhead_percentage;
        record.approval = input.approval;
        record.price_per_charger_submitted = input.price_per_charger_submitted;
        record.total_submitted = input.total_submitted;
        record.approved_amount = input.approved_amount;
        record.notes = input.notes.clone();
    }

    async fn persist_summary(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        record: &SummaryRecord,
        updated_at: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE project_summaries SET \
                tax_percentage = ?, tax_subtotal = ?, overhead_percentage = ?, overhead_subtotal = ?, \
                grand_subtotal = ?, grand_total = ?, chargers_count = ?, price_per_charger = ?, \
                price_per_charger_submitted = ?, total_submitted = ?, approved_amount = ?, \
                approval = ?, notes = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(record.sheet.tax_percentage)
        .bind(record.sheet.tax_subtotal)
        .bind(record.sheet.overhead_percentage)
        .bind(record.sheet.overhead_subtotal)
        .bind(record.sheet.grand_subtotal)
        .bind(record.sheet.grand_total)
        .bind(record.sheet.chargers_count)
        .bind(record.sheet.price_per_charger)
        .bind(record.price_per_charger_submitted)
        .bind(record.total_submitted)
        .bind(record.approved_amount)
        .bind(i64::from(record.approval))
        .bind(record.notes.as_deref())
        .bind(updated_at)
        .bind(record.id)
        .execute(&mut **tx)
        .await?;
        for category in SummaryCategory::ALL {
            let line = record.sheet.line(category);
            sqlx::query(
                "UPDATE summary_lines SET base_cost = ?, markup = ?, subtotal = ?, profit = ? \
                 WHERE summary_id = ? AND category = ?",
            )
            .bind(line.base_cost)
            .bind(line.markup)
            .bind(line.subtotal)
            .bind(line.profit)
            .bind(record.id)
            .bind(i64::from(category))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Insert a fresh sheet seeded from the current estimation totals with
    /// neutral markups, as part of the caller's transaction.
    async fn insert_summary(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        project_id: i64,
        totals: &CategoryTotals,
        created_at: &str,
    ) -> Result<SummaryRecord> {
        let mut sheet = SummarySheet::default();
        Self::seed_base_costs(&mut sheet, totals);
        sheet.recalculate();

        let row = sqlx::query(
            "INSERT INTO project_summaries \
                (project_id, tax_percentage, tax_subtotal, overhead_percentage, overhead_subtotal, \
                 grand_subtotal, grand_total, chargers_count, price_per_charger, \
                 price_per_charger_submitted, total_submitted, approved_amount, approval, notes, \
                 created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, ?, NULL, ?, ?) \
             RETURNING id",
        )
        .bind(project_id)
        .bind(sheet.tax_percentage)
        .bind(sheet.tax_subtotal)
        .bind(sheet.overhead_percentage)
        .bind(sheet.overhead_subtotal)
        .bind(sheet.grand_subtotal)
        .bind(sheet.grand_total)
        .bind(sheet.chargers_count)
        .bind(sheet.price_per_charger)
        .bind(i64::from(Approval::Pending))
        .bind(created_at)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await?;
        let summary_id: i64 = row.try_get("id")?;
        for category in SummaryCategory::ALL {
            let line = sheet.line(category);
            sqlx::query(
                "INSERT INTO summary_lines (summary_id, category, base_cost, markup, subtotal, profit) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(summary_id)
            .bind(i64::from(category))
            .bind(line.base_cost)
            .bind(line.markup)
            .bind(line.subtotal)
            .bind(line.profit)
            .execute(&mut **tx)
            .await?;
        }

        let created = state::parse_timestamp(created_at)?;
        Ok(SummaryRecord {
            id: summary_id,
            project_id,
            sheet,
            approval: Approval::Pending,
            price_per_charger_submitted: 0.0,
            total_submitted: 0.0,
            approved_amount: 0.0,
            notes: None,
            created_at: created,
            updated_at: created,
            _guard: (),
        })
    }
}

impl SummaryRepository for ContractorDb {
    async fn category_totals(&self, project_id: i64) -> Result<CategoryTotals> {
        self.fetch_project(project_id).await?;
        let wire = self
            .get_wire_conduit(project_id)
            .await?
            .ok_or(EstimateError::not_found("wire & conduit estimation"))?;
        let misc = self
            .get_misc_equipment(project_id)
            .await?
            .ok_or(EstimateError::not_found("misc & equipment estimation"))?;
        let labor = self
            .get_labor(project_id)
            .await?
            .ok_or(EstimateError::not_found("labor estimation"))?;
        Ok(CategoryTotals {
            awg_total: wire.estimation.awg_total,
            conduit_total: wire.estimation.conduit_total,
            misc_total: misc.estimation.misc_total,
            equipment_total: misc.estimation.equipment_total,
            labor_total: labor.estimation.labor_total,
            low_voltage_total: labor.estimation.low_voltage_total,
            chargers_count: labor.estimation.chargers_count,
        })
    }

    async fn review_summary(&self, project_id: i64) -> Result<SummaryRecord> {
        if let Some(record) = self.get_summary(project_id).await? {
            return Ok(record);
        }

        // First visit: seed a sheet from the current estimation totals.
        let totals = self.category_totals(project_id).await?;
        let created_at = state::now_rfc3339()?;
        let mut tx = self.state.pool().begin().await?;
        let record = self
            .insert_summary(&mut tx, project_id, &totals, &created_at)
            .await?;
        tx.commit().await?;
        info!(project_id, "summary sheet created");
        Ok(record)
    }

    async fn get_summary(&self, project_id: i64) -> Result<Option<SummaryRecord>> {
        self.load_summary(project_id).await
    }

    async fn save_summary(&self, project_id: i64, input: SummaryInput) -> Result<SummaryRecord> {
        input.validate()?;
        let project = self.fetch_project(project_id).await?;

        // The submit path works against the latest estimation figures even
        // if a step was resubmitted since the sheet was created.
        let totals = self.category_totals(project_id).await?;
        let existing = self.get_summary(project_id).await?;
        let updated_at = state::now_rfc3339()?;

        // Create-or-update and the status advance share one transaction: a
        // failed save leaves no half-created sheet behind.
        let mut tx = self.state.pool().begin().await?;
        let mut record = match existing {
            Some(record) => record,
            None => {
                self.insert_summary(&mut tx, project_id, &totals, &updated_at)
                    .await?
            }
        };
        Self::seed_base_costs(&mut record.sheet, &totals);
        Self::apply_summary_input(&mut record, &input);
        record.sheet.recalculate();
        self.persist_summary(&mut tx, &record, &updated_at).await?;
        self.advance_status(&mut tx, &project, ProjectStatus::Completed)
            .await?;
        tx.commit().await?;
        record.updated_at = state::parse_timestamp(&updated_at)?;
        info!(project_id, approval = record.approval.as_str(), "summary saved");
        Ok(record)
    }

    async fn update_summary(&self, project_id: i64, input: SummaryInput) -> Result<SummaryRecord> {
        input.validate()?;
        self.fetch_project(project_id).await?;
        let mut record = self
            .get_summary(project_id)
            .await?
            .ok_or(EstimateError::not_found("project summary"))?;

        // Review-page edit: stored base costs stay, only markups and the
        // bookkeeping fields move. Workflow status is left alone.
        Self::apply_summary_input(&mut record, &input);
        record.sheet.recalculate();

        let updated_at = state::now_rfc3339()?;
        let mut tx = self.state.pool().begin().await?;
        self.persist_summary(&mut tx, &record, &updated_at).await?;
        tx.commit().await?;
        record.updated_at = state::parse_timestamp(&updated_at)?;
        Ok(record)
    }
}
