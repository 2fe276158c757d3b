use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::models::{LogEntry, LogRow, Project, StandupStatus};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS dailysync")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dailysync.projects (
            id BIGSERIAL PRIMARY KEY,
            project_key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            meeting_id TEXT NOT NULL,
            standup_time TIME NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dailysync.standup_logs (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL
                REFERENCES dailysync.projects(id) ON DELETE CASCADE,
            standup_date DATE NOT NULL,
            scheduled_time TIME NOT NULL,
            status TEXT NOT NULL DEFAULT 'NO_DATA',
            attendance_count INT NOT NULL DEFAULT 0,
            duration_minutes DOUBLE PRECISION NOT NULL DEFAULT 0,
            raw_metadata TEXT,
            UNIQUE (project_id, standup_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_standup_logs_date \
         ON dailysync.standup_logs (standup_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let projects = vec![
        (
            "OCS",
            "OCS Platform",
            "m-ocs-standup",
            NaiveTime::from_hms_opt(10, 30, 0).context("invalid time")?,
        ),
        (
            "TATVA",
            "Tatva Services",
            "m-tatva-standup",
            NaiveTime::from_hms_opt(11, 0, 0).context("invalid time")?,
        ),
        (
            "VOICE_AI",
            "Voice AI",
            "m-voice-standup",
            NaiveTime::from_hms_opt(9, 45, 0).context("invalid time")?,
        ),
    ];

    for (key, name, meeting_id, standup_time) in projects {
        sqlx::query(
            r#"
            INSERT INTO dailysync.projects (project_key, name, meeting_id, standup_time, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (project_key) DO UPDATE
            SET name = EXCLUDED.name,
                meeting_id = EXCLUDED.meeting_id,
                standup_time = EXCLUDED.standup_time
            "#,
        )
        .bind(key)
        .bind(name)
        .bind(meeting_id)
        .bind(standup_time)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn list_active_projects(pool: &PgPool) -> anyhow::Result<Vec<Project>> {
    let rows = sqlx::query(
        "SELECT id, project_key, name, meeting_id, standup_time, is_active \
         FROM dailysync.projects \
         WHERE is_active = TRUE \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| project_from_row(&row)).collect())
}

pub async fn get_project(pool: &PgPool, project_id: i64) -> anyhow::Result<Option<Project>> {
    let row = sqlx::query(
        "SELECT id, project_key, name, meeting_id, standup_time, is_active \
         FROM dailysync.projects \
         WHERE id = $1",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| project_from_row(&row)))
}

fn project_from_row(row: &sqlx::postgres::PgRow) -> Project {
    Project {
        id: row.get("id"),
        project_key: row.get("project_key"),
        name: row.get("name"),
        meeting_id: row.get("meeting_id"),
        standup_time: row.get("standup_time"),
        is_active: row.get("is_active"),
    }
}

/// Insert or refresh the single log row for (project, date).
///
/// The conflict clause is what makes repeated and concurrent runs safe: a
/// second run for the same date lands on the unique pair and turns into an
/// update of the same row.
pub async fn upsert_log(
    tx: &mut Transaction<'_, Postgres>,
    project: &Project,
    standup_date: NaiveDate,
    status: StandupStatus,
    attendance_count: i32,
    duration_minutes: f64,
    raw_metadata: Option<&str>,
) -> anyhow::Result<LogEntry> {
    let row = sqlx::query(
        r#"
        INSERT INTO dailysync.standup_logs
        (project_id, standup_date, scheduled_time, status, attendance_count,
         duration_minutes, raw_metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (project_id, standup_date) DO UPDATE
        SET scheduled_time = EXCLUDED.scheduled_time,
            status = EXCLUDED.status,
            attendance_count = EXCLUDED.attendance_count,
            duration_minutes = EXCLUDED.duration_minutes,
            raw_metadata = EXCLUDED.raw_metadata
        RETURNING id
        "#,
    )
    .bind(project.id)
    .bind(standup_date)
    .bind(project.standup_time)
    .bind(status.as_str())
    .bind(attendance_count)
    .bind(duration_minutes)
    .bind(raw_metadata)
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("failed to upsert standup log for project {}", project.id))?;

    Ok(LogEntry {
        id: row.get("id"),
        project_id: project.id,
        standup_date,
        scheduled_time: project.standup_time,
        status,
        attendance_count,
        duration_minutes,
    })
}

/// All logs in the inclusive range, joined to their project.
pub async fn fetch_logs_in_range(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<Vec<LogRow>> {
    let rows = sqlx::query(
        "SELECT l.project_id, p.project_key, p.name, l.standup_date, l.status \
         FROM dailysync.standup_logs l \
         JOIN dailysync.projects p ON p.id = l.project_id \
         WHERE l.standup_date >= $1 AND l.standup_date <= $2 \
         ORDER BY l.project_id, l.standup_date",
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| log_row_from_row(&row)).collect())
}

/// Logs for one project in the inclusive range.
pub async fn fetch_project_logs_in_range(
    pool: &PgPool,
    project_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<Vec<LogRow>> {
    let rows = sqlx::query(
        "SELECT l.project_id, p.project_key, p.name, l.standup_date, l.status \
         FROM dailysync.standup_logs l \
         JOIN dailysync.projects p ON p.id = l.project_id \
         WHERE l.project_id = $1 AND l.standup_date >= $2 AND l.standup_date <= $3 \
         ORDER BY l.standup_date",
    )
    .bind(project_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| log_row_from_row(&row)).collect())
}

fn log_row_from_row(row: &sqlx::postgres::PgRow) -> LogRow {
    LogRow {
        project_id: row.get("project_id"),
        project_key: row.get("project_key"),
        project_name: row.get("name"),
        standup_date: row.get("standup_date"),
        status: row.get("status"),
    }
}
