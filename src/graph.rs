use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::GraphSettings;
use crate::models::{AttendanceSummary, MeetingOccurrence};
use crate::providers::{AttendanceProvider, OccurrenceProvider, ProviderError};

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com";
const TOKEN_SCOPE: &str = "https://graph.microsoft.com/.default";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Refresh the token slightly before its real expiry.
const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to obtain graph token: {0}")]
    Token(String),
    #[error("graph api returned status {status}: {body}")]
    Api { status: u16, body: String },
}

struct TokenState {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Minimal Microsoft Graph client using the OAuth2 client-credentials flow.
/// The access token is cached in memory for the lifetime of the client.
pub struct GraphClient {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    base_url: String,
    token: Mutex<Option<TokenState>>,
}

impl GraphClient {
    pub fn from_settings(settings: &GraphSettings) -> Result<GraphClient, GraphError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(GraphClient {
            http,
            tenant_id: settings.tenant_id.clone().unwrap_or_default(),
            client_id: settings.client_id.clone().unwrap_or_default(),
            client_secret: settings.client_secret.clone().unwrap_or_default(),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            token: Mutex::new(None),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }

    async fn fetch_token(&self) -> Result<TokenState, GraphError> {
        let resp = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphError::Token(format!("status={status}: {body}")));
        }

        let payload: Value = resp.json().await?;
        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| GraphError::Token("token response missing access_token".to_string()))?
            .to_string();
        let expires_in = payload
            .get("expires_in")
            .and_then(Value::as_f64)
            .ok_or_else(|| GraphError::Token("token response missing expires_in".to_string()))?;

        let expires_at =
            Utc::now() + Duration::seconds(expires_in as i64 - TOKEN_SAFETY_MARGIN_SECS);

        Ok(TokenState {
            access_token,
            expires_at,
        })
    }

    async fn access_token(&self) -> Result<String, GraphError> {
        let mut guard = self.token.lock().await;
        if let Some(state) = guard.as_ref() {
            if state.expires_at > Utc::now() {
                return Ok(state.access_token.clone());
            }
        }

        let state = self.fetch_token().await?;
        let token = state.access_token.clone();
        *guard = Some(state);
        Ok(token)
    }

    /// Authenticated GET returning the response body as JSON.
    pub async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, GraphError> {
        let token = self.access_token().await?;
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        };

        debug!(%url, "graph GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }
}

/// Resolves the concrete calendar occurrence of a recurring meeting by
/// scanning the organizer's calendar view for the business date.
pub struct GraphOccurrenceResolver {
    client: Arc<GraphClient>,
    organizer_user_id: String,
}

impl GraphOccurrenceResolver {
    pub fn new(client: Arc<GraphClient>, organizer_user_id: String) -> Self {
        GraphOccurrenceResolver {
            client,
            organizer_user_id,
        }
    }

    async fn fetch_day_window(&self, standup_date: NaiveDate) -> Result<Value, GraphError> {
        let day_start = standup_date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        let path = format!("/v1.0/users/{}/calendarView", self.organizer_user_id);
        self.client
            .get_json(
                &path,
                &[
                    ("startDateTime", day_start.to_rfc3339()),
                    ("endDateTime", day_end.to_rfc3339()),
                ],
            )
            .await
    }
}

#[async_trait]
impl OccurrenceProvider for GraphOccurrenceResolver {
    async fn resolve(
        &self,
        meeting_id: &str,
        standup_date: NaiveDate,
    ) -> Result<MeetingOccurrence, ProviderError> {
        let payload = match self.fetch_day_window(standup_date).await {
            Ok(payload) => payload,
            // Graph failures become an embedded error marker so the run can
            // keep going and the evaluator lands on ERROR for this project.
            Err(err) => {
                return Ok(MeetingOccurrence {
                    meeting_id: meeting_id.to_string(),
                    start_time_utc: None,
                    end_time_utc: None,
                    is_cancelled: false,
                    raw: Some(json!({ "error": err.to_string() })),
                })
            }
        };

        let Some(event) = find_event(&payload, meeting_id) else {
            // No occurrence on this date; downstream evaluates as NO_DATA.
            return Ok(MeetingOccurrence {
                meeting_id: meeting_id.to_string(),
                start_time_utc: None,
                end_time_utc: None,
                is_cancelled: false,
                raw: None,
            });
        };

        let is_cancelled = event
            .get("isCancelled")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(MeetingOccurrence {
            meeting_id: meeting_id.to_string(),
            start_time_utc: event.get("start").and_then(parse_graph_datetime),
            end_time_utc: event.get("end").and_then(parse_graph_datetime),
            is_cancelled,
            raw: Some(event.clone()),
        })
    }
}

/// Resolves attendance via the communications attendance-report endpoint.
pub struct GraphAttendanceResolver {
    client: Arc<GraphClient>,
}

impl GraphAttendanceResolver {
    pub fn new(client: Arc<GraphClient>) -> Self {
        GraphAttendanceResolver { client }
    }
}

#[async_trait]
impl AttendanceProvider for GraphAttendanceResolver {
    async fn resolve(&self, meeting_id: &str) -> Result<AttendanceSummary, ProviderError> {
        let path = format!("/v1.0/communications/onlineMeetings/{meeting_id}/attendanceReports");
        let payload = match self.client.get_json(&path, &[]).await {
            Ok(payload) => payload,
            Err(err) => {
                return Ok(AttendanceSummary {
                    meeting_id: meeting_id.to_string(),
                    non_organizer_count: 0,
                    duration_minutes: 0.0,
                    has_data: false,
                    raw: Some(json!({ "error": err.to_string() })),
                })
            }
        };

        let first_report = payload
            .get("value")
            .and_then(Value::as_array)
            .and_then(|reports| reports.first());

        let Some(report) = first_report else {
            return Ok(AttendanceSummary {
                meeting_id: meeting_id.to_string(),
                non_organizer_count: 0,
                duration_minutes: 0.0,
                has_data: false,
                raw: Some(payload),
            });
        };

        let (non_organizer_count, duration_minutes) = attendance_metrics(
            report
                .get("attendanceRecords")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        );

        Ok(AttendanceSummary {
            meeting_id: meeting_id.to_string(),
            non_organizer_count,
            duration_minutes,
            has_data: true,
            raw: Some(payload),
        })
    }
}

/// Find the event in a calendarView payload matching the configured meeting
/// id, by either the event id or its online-meeting id.
fn find_event<'a>(payload: &'a Value, meeting_id: &str) -> Option<&'a Value> {
    payload
        .get("value")
        .and_then(Value::as_array)?
        .iter()
        .find(|event| {
            event.get("id").and_then(Value::as_str) == Some(meeting_id)
                || event.get("onlineMeetingId").and_then(Value::as_str) == Some(meeting_id)
        })
}

/// Compute (non-organizer count, duration minutes) from attendance records.
///
/// A participant counts when their role is not organizer and they logged
/// positive attendance time. Duration spans the earliest join to the latest
/// leave across records carrying both timestamps.
fn attendance_metrics(records: &[Value]) -> (i32, f64) {
    let mut non_organizer_count = 0;
    let mut join_times: Vec<DateTime<Utc>> = Vec::new();
    let mut leave_times: Vec<DateTime<Utc>> = Vec::new();

    for record in records {
        let role = record
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let total_secs = record
            .get("totalAttendanceInSeconds")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        if role != "organizer" && total_secs > 0.0 {
            non_organizer_count += 1;
        }

        if let Some(joined) = record
            .get("joinDateTime")
            .and_then(Value::as_str)
            .and_then(parse_iso_utc)
        {
            join_times.push(joined);
        }
        if let Some(left) = record
            .get("leaveDateTime")
            .and_then(Value::as_str)
            .and_then(parse_iso_utc)
        {
            leave_times.push(left);
        }
    }

    let duration_minutes = match (join_times.iter().min(), leave_times.iter().max()) {
        (Some(start), Some(end)) => ((*end - *start).num_seconds() as f64 / 60.0).max(0.0),
        _ => 0.0,
    };

    (non_organizer_count, duration_minutes)
}

/// Parse a Graph `{"dateTime": ..., "timeZone": ...}` object into UTC.
/// Graph omits the offset on these, so naive values are taken as UTC.
fn parse_graph_datetime(dt_obj: &Value) -> Option<DateTime<Utc>> {
    let dt_str = dt_obj.get("dateTime").and_then(Value::as_str)?;
    parse_iso_utc(dt_str)
}

/// Parse an ISO-8601 timestamp, accepting both offset-carrying and naive
/// forms, normalized to UTC. Returns None when unparseable.
fn parse_iso_utc(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
