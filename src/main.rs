use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use time::{Date, macros::format_description};

use anyhow::Context;
use evquote::core::db::{
    ContractorDb, EstimateDb, LaborEstimationRepository, MiscEstimationRepository, NewProject,
    NewUser, ProjectInfoUpdate, ProjectRepository, SummaryRepository, User, UserRepository,
    WireEstimationRepository,
};
use evquote::payload::{
    EntryEdits, LaborEdits, LaborSubmission, MiscEquipmentSubmission, SummaryInput,
    WireConduitSubmission,
};

#[derive(Parser)]
#[command(name = "evquote")]
#[command(about = "Cost estimation workbook for EV charger installation projects")]
struct Cli {
    /// Path to the estimation store
    #[arg(long, value_name = "FILE", default_value = "evquote.db")]
    db: PathBuf,

    /// Acting user's email (required by every project command)
    #[arg(short, long, value_name = "EMAIL", global = true)]
    user: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a user
    AddUser {
        email: String,
        username: String,
    },
    /// Create a project
    NewProject {
        address: String,
        /// Project start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        start_date: Date,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        project_type: Option<String>,
    },
    /// List the user's projects with summary figures
    List,
    /// Search the user's projects by address fragment
    Search { fragment: String },
    /// Show one project with everything submitted so far
    Show { project_id: i64 },
    /// Print the estimation step to continue with
    Resume { project_id: i64 },
    /// Update project details
    EditProject {
        project_id: i64,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        start_date: Option<Date>,
        #[arg(long)]
        project_type: Option<String>,
    },
    /// Delete a project and all of its estimations
    Delete { project_id: i64 },
    /// Submit an estimation step from a JSON payload file
    Submit {
        project_id: i64,
        step: Step,
        /// JSON payload file
        payload: PathBuf,
    },
    /// Edit the current snapshot of a step from a JSON payload file
    Edit {
        project_id: i64,
        step: Step,
        payload: PathBuf,
    },
    /// Current per-category totals across the three steps
    Totals { project_id: i64 },
    /// Show the summary sheet, creating it on first use
    SummaryReview { project_id: i64 },
    /// Apply a summary payload and mark the project completed
    SummarySave {
        project_id: i64,
        payload: PathBuf,
    },
    /// Apply a summary payload without touching the workflow status
    SummaryUpdate {
        project_id: i64,
        payload: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Step {
    WireConduit,
    MiscEquipment,
    Labor,
}

fn parse_date_arg(value: &str) -> Result<Date, String> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value, &format).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn read_payload<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading payload file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing payload file {}", path.display()))
}

async fn require_user(db: &EstimateDb, cli: &Cli) -> anyhow::Result<User> {
    let email = cli
        .user
        .as_deref()
        .context("this command needs --user <EMAIL>")?;
    db.get_user_by_email(email)
        .await?
        .with_context(|| format!("no user registered as {email}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    evquote::logging::init_cli_logger(cli.verbose);

    let db = EstimateDb::open(&cli.db).await?;

    match &cli.command {
        Command::AddUser { email, username } => {
            let user = db
                .add_user(NewUser {
                    email: email.clone(),
                    username: username.clone(),
                })
                .await?;
            println!("registered {} ({}) as #{}", user.username, user.email, user.id);
            return Ok(());
        }
        _ => {}
    }

    let user = require_user(&db, &cli).await?;
    let store = db.contractor(&user);

    match cli.command {
        Command::AddUser { .. } => unreachable!("handled above"),
        Command::NewProject {
            address,
            start_date,
            company,
            project_type,
        } => {
            let project = store
                .create_project(NewProject {
                    address,
                    company,
                    start_date,
                    project_type,
                })
                .await?;
            println!("created project #{}: {}", project.id, project.address);
        }
        Command::List => {
            let projects = store.list_projects().await?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        Command::Search { fragment } => {
            for project in store.search_projects(&fragment).await? {
                println!(
                    "#{} {} ({}) [{}]",
                    project.id, project.address, project.company, project.status
                );
            }
        }
        Command::Show { project_id } => {
            show_project(&store, project_id).await?;
        }
        Command::Resume { project_id } => {
            let project = store
                .get_project(project_id)
                .await?
                .context("project not found")?;
            println!("{}", project.status.resume());
        }
        Command::EditProject {
            project_id,
            address,
            company,
            start_date,
            project_type,
        } => {
            let project = store
                .get_project(project_id)
                .await?
                .context("project not found")?;
            let project = store
                .update_project_info(
                    &project,
                    &ProjectInfoUpdate {
                        address,
                        company,
                        start_date,
                        project_type,
                    },
                )
                .await?;
            println!("updated project #{}: {}", project.id, project.address);
        }
        Command::Delete { project_id } => {
            let project = store
                .get_project(project_id)
                .await?
                .context("project not found")?;
            store.delete_project(project).await?;
            println!("deleted project #{project_id}");
        }
        Command::Submit {
            project_id,
            step,
            payload,
        } => match step {
            Step::WireConduit => {
                let submission: WireConduitSubmission = read_payload(&payload)?;
                let estimation = store.submit_wire_conduit(project_id, submission).await?;
                println!(
                    "wire & conduit submitted: awg {:.2} + conduit {:.2} + tax {:.2} = {:.2}",
                    estimation.awg_total,
                    estimation.conduit_total,
                    estimation.tax_amount,
                    estimation.grand_total
                );
            }
            Step::MiscEquipment => {
                let submission: MiscEquipmentSubmission = read_payload(&payload)?;
                let estimation = store.submit_misc_equipment(project_id, submission).await?;
                println!(
                    "misc & equipment submitted: misc {:.2} + equipment {:.2} + tax {:.2} = {:.2}",
                    estimation.misc_total,
                    estimation.equipment_total,
                    estimation.tax_amount,
                    estimation.grand_total
                );
            }
            Step::Labor => {
                let submission: LaborSubmission = read_payload(&payload)?;
                let estimation = store.submit_labor(project_id, submission).await?;
                println!(
                    "labor submitted: labor {:.2} + low voltage {:.2} = {:.2}",
                    estimation.labor_total, estimation.low_voltage_total, estimation.grand_total
                );
            }
        },
        Command::Edit {
            project_id,
            step,
            payload,
        } => match step {
            Step::WireConduit => {
                let edits: EntryEdits = read_payload(&payload)?;
                let estimation = store.update_wire_entries(project_id, edits).await?;
                println!("wire & conduit now totals {:.2}", estimation.grand_total);
            }
            Step::MiscEquipment => {
                let edits: EntryEdits = read_payload(&payload)?;
                let estimation = store.update_misc_entries(project_id, edits).await?;
                println!("misc & equipment now totals {:.2}", estimation.grand_total);
            }
            Step::Labor => {
                let edits: LaborEdits = read_payload(&payload)?;
                let estimation = store.update_labor_entries(project_id, edits).await?;
                println!("labor now totals {:.2}", estimation.grand_total);
            }
        },
        Command::Totals { project_id } => {
            let totals = store.category_totals(project_id).await?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        Command::SummaryReview { project_id } => {
            let record = store.review_summary(project_id).await?;
            println!("{}", serde_json::to_string_pretty(&record.sheet)?);
        }
        Command::SummarySave { project_id, payload } => {
            let input: SummaryInput = read_payload(&payload)?;
            let record = store.save_summary(project_id, input).await?;
            println!(
                "summary saved: grand total {:.2}, price per charger {:.2} ({})",
                record.sheet.grand_total,
                record.sheet.price_per_charger,
                record.approval.as_str()
            );
        }
        Command::SummaryUpdate { project_id, payload } => {
            let input: SummaryInput = read_payload(&payload)?;
            let record = store.update_summary(project_id, input).await?;
            println!(
                "summary updated: grand total {:.2}, price per charger {:.2} ({})",
                record.sheet.grand_total,
                record.sheet.price_per_charger,
                record.approval.as_str()
            );
        }
    }

    Ok(())
}

async fn show_project(store: &ContractorDb, project_id: i64) -> anyhow::Result<()> {
    let review = store.project_review(project_id).await?;
    let project = &review.project;
    println!(
        "#{} {} ({}) starting {} [{}]",
        project.id, project.address, project.company, project.start_date, project.status
    );
    if let Some(kind) = &project.project_type {
        println!("  type: {kind}");
    }

    match &review.wire_conduit {
        Some(wire) => {
            println!(
                "  wire & conduit: awg {:.2}, conduit {:.2}, tax {:.2}, total {:.2} ({} entries)",
                wire.estimation.awg_total,
                wire.estimation.conduit_total,
                wire.estimation.tax_amount,
                wire.estimation.grand_total,
                wire.awg.len() + wire.conduit.len()
            );
        }
        None => println!("  wire & conduit: not submitted"),
    }
    match &review.misc_equipment {
        Some(misc) => {
            println!(
                "  misc & equipment: misc {:.2}, equipment {:.2}, tax {:.2}, total {:.2} ({} entries)",
                misc.estimation.misc_total,
                misc.estimation.equipment_total,
                misc.estimation.tax_amount,
                misc.estimation.grand_total,
                misc.misc.len() + misc.equipment.len()
            );
        }
        None => println!("  misc & equipment: not submitted"),
    }
    match &review.labor {
        Some(labor) => {
            println!(
                "  labor: labor {:.2}, low voltage {:.2} ({} chargers @ {:.2}), total {:.2}",
                labor.estimation.labor_total,
                labor.estimation.low_voltage_total,
                labor.estimation.chargers_count,
                labor.estimation.charger_price,
                labor.estimation.grand_total
            );
        }
        None => println!("  labor: not submitted"),
    }
    match &review.summary {
        Some(summary) => {
            println!(
                "  summary: grand total {:.2}, price per charger {:.2} ({})",
                summary.sheet.grand_total,
                summary.sheet.price_per_charger,
                summary.approval.as_str()
            );
        }
        None => println!("  summary: not created"),
    }
    Ok(())
}
