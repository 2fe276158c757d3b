use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::PgPool;
use thiserror::Error;

use crate::db;
use crate::models::{LogRow, Project, ProjectComplianceSummary, StandupStatus, WeeklySummary};

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("project {0} not found")]
    ProjectNotFound(i64),
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// Per-project compliance over an inclusive date range, one entry per
/// project that has at least one log in the window.
pub async fn compute_weekly_summary(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<WeeklySummary, SummaryError> {
    ensure_valid_range(start_date, end_date)?;

    let rows = db::fetch_logs_in_range(pool, start_date, end_date).await?;
    let projects = group_and_summarize(rows, start_date, end_date);

    Ok(WeeklySummary {
        start_date,
        end_date,
        projects,
    })
}

/// Compliance for a single project. Unlike the range summary, a project
/// with no logs in the window yields a zeroed summary rather than being
/// omitted; an unknown project id is an error.
pub async fn compute_project_summary(
    pool: &PgPool,
    project_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<ProjectComplianceSummary, SummaryError> {
    ensure_valid_range(start_date, end_date)?;

    let project = db::get_project(pool, project_id)
        .await?
        .ok_or(SummaryError::ProjectNotFound(project_id))?;

    let rows = db::fetch_project_logs_in_range(pool, project_id, start_date, end_date).await?;
    Ok(summarize_project(&project, &rows, start_date, end_date))
}

fn ensure_valid_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), SummaryError> {
    if end_date < start_date {
        return Err(SummaryError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }
    Ok(())
}

/// Group joined log rows by project and summarize each group. Rows arrive
/// per-project from the query; the map keeps project-id order stable.
fn group_and_summarize(
    rows: Vec<LogRow>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<ProjectComplianceSummary> {
    let mut groups: BTreeMap<i64, Vec<LogRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.project_id).or_default().push(row);
    }

    groups
        .into_values()
        .map(|logs| {
            let first = &logs[0];
            summarize_rows(
                first.project_id,
                first.project_key.clone(),
                first.project_name.clone(),
                &logs,
                start_date,
                end_date,
            )
        })
        .collect()
}

fn summarize_project(
    project: &Project,
    rows: &[LogRow],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ProjectComplianceSummary {
    summarize_rows(
        project.id,
        project.project_key.clone(),
        project.name.clone(),
        rows,
        start_date,
        end_date,
    )
}

fn summarize_rows(
    project_id: i64,
    project_key: String,
    project_name: String,
    rows: &[LogRow],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ProjectComplianceSummary {
    let mut happened_count = 0;
    let mut missed_count = 0;
    let mut cancelled_count = 0;
    let mut no_data_count = 0;
    let mut error_count = 0;

    for row in rows {
        // Unknown stored strings count as NO_DATA rather than failing the report.
        match StandupStatus::from_stored(&row.status) {
            StandupStatus::Happened => happened_count += 1,
            StandupStatus::Missed => missed_count += 1,
            StandupStatus::Cancelled => cancelled_count += 1,
            StandupStatus::NoData => no_data_count += 1,
            StandupStatus::Error => error_count += 1,
        }
    }

    let total_days = rows.len();
    let compliance_pct = if total_days > 0 {
        round2(happened_count as f64 / total_days as f64 * 100.0)
    } else {
        0.0
    };

    ProjectComplianceSummary {
        project_id,
        project_key,
        project_name,
        start_date,
        end_date,
        total_days,
        happened_count,
        missed_count,
        cancelled_count,
        no_data_count,
        error_count,
        compliance_pct,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(project_id: i64, key: &str, day: u32, status: &str) -> LogRow {
        LogRow {
            project_id,
            project_key: key.to_string(),
            project_name: format!("{key} Platform"),
            standup_date: NaiveDate::from_ymd_opt(2025, 11, day).expect("valid date"),
            status: status.to_string(),
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date"),
            NaiveDate::from_ymd_opt(2025, 11, 14).expect("valid date"),
        )
    }

    #[test]
    fn rejects_inverted_range() {
        let (start, end) = range();
        assert!(matches!(
            ensure_valid_range(end, start),
            Err(SummaryError::InvalidRange { .. })
        ));
        assert!(ensure_valid_range(start, start).is_ok());
        assert!(ensure_valid_range(start, end).is_ok());
    }

    #[test]
    fn five_day_mix_gives_forty_percent_compliance() {
        let (start, end) = range();
        let rows: Vec<LogRow> = ["HAPPENED", "MISSED", "HAPPENED", "ERROR", "NO_DATA"]
            .iter()
            .enumerate()
            .map(|(idx, status)| row(1, "OCS", 10 + idx as u32, status))
            .collect();

        let summary = summarize_rows(1, "OCS".into(), "OCS Platform".into(), &rows, start, end);

        assert_eq!(summary.total_days, 5);
        assert_eq!(summary.happened_count, 2);
        assert_eq!(summary.missed_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.no_data_count, 1);
        assert_eq!(summary.cancelled_count, 0);
        assert_eq!(summary.compliance_pct, 40.0);
    }

    #[test]
    fn unknown_status_counts_as_no_data() {
        let (start, end) = range();
        let rows = vec![row(1, "OCS", 10, "SOMETHING_NEW"), row(1, "OCS", 11, "HAPPENED")];

        let summary = summarize_rows(1, "OCS".into(), "OCS Platform".into(), &rows, start, end);

        assert_eq!(summary.no_data_count, 1);
        assert_eq!(summary.happened_count, 1);
        assert_eq!(summary.compliance_pct, 50.0);
    }

    #[test]
    fn empty_rows_give_zeroed_summary() {
        let (start, end) = range();
        let summary = summarize_rows(7, "IDLE".into(), "Idle".into(), &[], start, end);

        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.compliance_pct, 0.0);
        assert_eq!(summary.happened_count, 0);
    }

    #[test]
    fn compliance_is_rounded_to_two_decimals() {
        let (start, end) = range();
        let rows = vec![
            row(1, "OCS", 10, "HAPPENED"),
            row(1, "OCS", 11, "MISSED"),
            row(1, "OCS", 12, "MISSED"),
        ];

        let summary = summarize_rows(1, "OCS".into(), "OCS Platform".into(), &rows, start, end);
        // 1/3 => 33.333... rounds to 33.33
        assert_eq!(summary.compliance_pct, 33.33);
    }

    #[test]
    fn grouping_splits_rows_per_project_and_never_emits_empty_groups() {
        let (start, end) = range();
        let rows = vec![
            row(1, "OCS", 10, "HAPPENED"),
            row(2, "VOICE_AI", 10, "MISSED"),
            row(1, "OCS", 11, "MISSED"),
            row(2, "VOICE_AI", 11, "HAPPENED"),
            row(1, "OCS", 12, "HAPPENED"),
        ];

        let summaries = group_and_summarize(rows, start, end);

        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.total_days > 0));

        let ocs = summaries.iter().find(|s| s.project_key == "OCS").unwrap();
        assert_eq!(ocs.total_days, 3);
        assert_eq!(ocs.compliance_pct, 66.67);

        let voice = summaries
            .iter()
            .find(|s| s.project_key == "VOICE_AI")
            .unwrap();
        assert_eq!(voice.total_days, 2);
        assert_eq!(voice.compliance_pct, 50.0);
    }
}
