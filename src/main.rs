use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod config;
mod daily;
mod db;
mod evaluate;
mod graph;
mod models;
mod providers;
mod report;
mod snapshot;
mod summary;

use config::GraphSettings;
use providers::ProviderSet;

#[derive(Parser)]
#[command(name = "dailysync-monitor")]
#[command(about = "Daily standup compliance monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample projects
    Seed,
    /// Evaluate all active projects for one date and persist the results
    DailyCheck {
        /// Business date to check, defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Compliance summary for all projects with logs in a date range
    WeeklySummary {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compliance summary for a single project
    ProjectSummary {
        #[arg(long)]
        project_id: i64,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate a markdown compliance report
    Report {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::DailyCheck { date } => {
            let standup_date = date.unwrap_or_else(|| Utc::now().date_naive());
            let providers = ProviderSet::from_settings(&GraphSettings::from_env());
            let result = daily::run_daily_check(&pool, &providers, standup_date).await?;

            println!(
                "Evaluated {} projects for {} ({} logs written):",
                result.total_projects_evaluated, result.standup_date, result.logs_created
            );
            for entry in &result.entries {
                println!(
                    "- project {} at {}: {} ({} attendees, {:.1} min)",
                    entry.project_id,
                    entry.scheduled_time,
                    entry.status,
                    entry.attendance_count,
                    entry.duration_minutes
                );
            }
        }
        Commands::WeeklySummary { start, end, json } => {
            let summary = summary::compute_weekly_summary(&pool, start, end).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.projects.is_empty() {
                println!("No standup logs between {start} and {end}.");
            } else {
                println!("Compliance from {start} to {end}:");
                for project in &summary.projects {
                    println!(
                        "- {} ({}): {:.2}% over {} days",
                        project.project_name,
                        project.project_key,
                        project.compliance_pct,
                        project.total_days
                    );
                }
            }
        }
        Commands::ProjectSummary {
            project_id,
            start,
            end,
            json,
        } => {
            let project =
                summary::compute_project_summary(&pool, project_id, start, end).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                println!(
                    "{} ({}) from {start} to {end}: {:.2}% compliance over {} days \
                     (happened {}, missed {}, cancelled {}, no data {}, errors {})",
                    project.project_name,
                    project.project_key,
                    project.compliance_pct,
                    project.total_days,
                    project.happened_count,
                    project.missed_count,
                    project.cancelled_count,
                    project.no_data_count,
                    project.error_count
                );
            }
        }
        Commands::Report { start, end, out } => {
            let summary = summary::compute_weekly_summary(&pool, start, end).await?;
            let report = report::build_weekly_report(&summary);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
