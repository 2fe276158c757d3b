use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::evaluate::evaluate;
use crate::models::{DailyCheckSummary, MeetingSnapshot, Project};
use crate::providers::ProviderSet;
use crate::snapshot::build_snapshot;

/// Run the standup compliance check for every active project on one date.
///
/// Each project is evaluated independently; provider trouble for one project
/// never aborts the batch. All log rows are written in a single transaction,
/// so a persistence failure leaves nothing behind.
pub async fn run_daily_check(
    pool: &PgPool,
    providers: &ProviderSet,
    standup_date: NaiveDate,
) -> anyhow::Result<DailyCheckSummary> {
    let projects = db::list_active_projects(pool).await?;
    info!(
        date = %standup_date,
        projects = projects.len(),
        configured = providers.is_configured(),
        "starting daily standup check"
    );

    let mut tx = pool
        .begin()
        .await
        .context("failed to open transaction for daily check")?;

    let mut entries = Vec::with_capacity(projects.len());

    for project in &projects {
        let snapshot = resolve_snapshot(providers, project, standup_date).await;
        let status = evaluate(snapshot.as_ref());

        let attendance_count = snapshot.as_ref().map_or(0, |s| s.non_organizer_count);
        let duration_minutes = snapshot.as_ref().map_or(0.0, |s| s.duration_minutes);
        let raw_metadata = snapshot
            .as_ref()
            .and_then(|s| s.raw.as_ref())
            .map(|raw| serde_json::Value::Object(raw.clone()).to_string());

        let entry = db::upsert_log(
            &mut tx,
            project,
            standup_date,
            status,
            attendance_count,
            duration_minutes,
            raw_metadata.as_deref(),
        )
        .await?;

        info!(project = %project.project_key, status = %status, "standup evaluated");
        entries.push(entry);
    }

    tx.commit()
        .await
        .context("failed to commit daily check batch")?;

    Ok(DailyCheckSummary {
        standup_date,
        total_projects_evaluated: projects.len(),
        logs_created: entries.len(),
        entries,
    })
}

/// Resolve provider data for one project and merge it into a snapshot.
///
/// Returns None when no providers are configured or when either lookup
/// fails outright; the evaluator turns that into NO_DATA. Failures the
/// providers absorbed themselves arrive as error markers inside the
/// snapshot's raw payload instead.
pub async fn resolve_snapshot(
    providers: &ProviderSet,
    project: &Project,
    standup_date: NaiveDate,
) -> Option<MeetingSnapshot> {
    let ProviderSet::Configured {
        occurrence,
        attendance,
    } = providers
    else {
        return None;
    };

    let occurrence = match occurrence.resolve(&project.meeting_id, standup_date).await {
        Ok(occurrence) => occurrence,
        Err(err) => {
            warn!(project = %project.project_key, error = %err, "occurrence lookup failed");
            return None;
        }
    };

    let attendance = match attendance.resolve(&project.meeting_id).await {
        Ok(attendance) => attendance,
        Err(err) => {
            warn!(project = %project.project_key, error = %err, "attendance lookup failed");
            return None;
        }
    };

    Some(build_snapshot(Some(&occurrence), Some(&attendance)))
}
