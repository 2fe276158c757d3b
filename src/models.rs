use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A project being monitored, linked to one recurring standup meeting.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub project_key: String,
    pub name: String,
    pub meeting_id: String,
    pub standup_time: NaiveTime,
    pub is_active: bool,
}

/// Outcome of a daily standup check. Stored as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandupStatus {
    Happened,
    Missed,
    Cancelled,
    NoData,
    Error,
}

impl StandupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StandupStatus::Happened => "HAPPENED",
            StandupStatus::Missed => "MISSED",
            StandupStatus::Cancelled => "CANCELLED",
            StandupStatus::NoData => "NO_DATA",
            StandupStatus::Error => "ERROR",
        }
    }

    /// Decode a stored status string. Unknown values fall back to NoData
    /// rather than failing the read.
    pub fn from_stored(value: &str) -> StandupStatus {
        match value {
            "HAPPENED" => StandupStatus::Happened,
            "MISSED" => StandupStatus::Missed,
            "CANCELLED" => StandupStatus::Cancelled,
            "NO_DATA" => StandupStatus::NoData,
            "ERROR" => StandupStatus::Error,
            _ => StandupStatus::NoData,
        }
    }
}

impl std::fmt::Display for StandupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resolved occurrence of a recurring meeting for a business date.
#[derive(Debug, Clone)]
pub struct MeetingOccurrence {
    pub meeting_id: String,
    pub start_time_utc: Option<DateTime<Utc>>,
    pub end_time_utc: Option<DateTime<Utc>>,
    pub is_cancelled: bool,
    pub raw: Option<Value>,
}

/// Normalized attendance metrics for one meeting.
#[derive(Debug, Clone)]
pub struct AttendanceSummary {
    pub meeting_id: String,
    pub non_organizer_count: i32,
    pub duration_minutes: f64,
    pub has_data: bool,
    pub raw: Option<Value>,
}

/// Merged occurrence + attendance view, the sole input to evaluation.
#[derive(Debug, Clone)]
pub struct MeetingSnapshot {
    pub cancelled: bool,
    pub non_organizer_count: i32,
    pub duration_minutes: f64,
    pub raw: Option<Map<String, Value>>,
}

/// Persisted check result for one (project, date) pair.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub project_id: i64,
    pub standup_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: StandupStatus,
    pub attendance_count: i32,
    pub duration_minutes: f64,
}

/// Result of one daily check run across all active projects.
#[derive(Debug, Clone, Serialize)]
pub struct DailyCheckSummary {
    pub standup_date: NaiveDate,
    pub total_projects_evaluated: usize,
    pub logs_created: usize,
    pub entries: Vec<LogEntry>,
}

/// One log row joined with its project, as fetched for aggregation.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub project_id: i64,
    pub project_key: String,
    pub project_name: String,
    pub standup_date: NaiveDate,
    pub status: String,
}

/// Per-project compliance statistics over a date range.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectComplianceSummary {
    pub project_id: i64,
    pub project_key: String,
    pub project_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: usize,
    pub happened_count: usize,
    pub missed_count: usize,
    pub cancelled_count: usize,
    pub no_data_count: usize,
    pub error_count: usize,
    pub compliance_pct: f64,
}

/// Range summary across all projects that have logs in the window.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub projects: Vec<ProjectComplianceSummary>,
}
