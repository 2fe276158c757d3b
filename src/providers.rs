use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GraphSettings;
use crate::graph::{GraphAttendanceResolver, GraphClient, GraphOccurrenceResolver};
use crate::models::{AttendanceSummary, MeetingOccurrence};

/// A meeting-data lookup failed in a way the provider could not absorb.
/// Callers downgrade this to a missing snapshot for the affected project.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("meeting provider request failed: {0}")]
    Transport(String),
    #[error("meeting provider returned an unusable payload: {0}")]
    BadPayload(String),
}

/// Resolves the occurrence of a recurring meeting on a business date.
#[async_trait]
pub trait OccurrenceProvider: Send + Sync {
    async fn resolve(
        &self,
        meeting_id: &str,
        standup_date: NaiveDate,
    ) -> Result<MeetingOccurrence, ProviderError>;
}

/// Resolves normalized attendance metrics for a meeting.
#[async_trait]
pub trait AttendanceProvider: Send + Sync {
    async fn resolve(&self, meeting_id: &str) -> Result<AttendanceSummary, ProviderError>;
}

/// The providers available to a daily check run, resolved once up front.
/// Missing credentials put the whole run into the degraded no-data mode
/// instead of failing it.
pub enum ProviderSet {
    Configured {
        occurrence: Box<dyn OccurrenceProvider>,
        attendance: Box<dyn AttendanceProvider>,
    },
    Unconfigured,
}

impl ProviderSet {
    pub fn from_settings(settings: &GraphSettings) -> ProviderSet {
        if !settings.is_complete() {
            info!("graph credentials incomplete, daily check will record NO_DATA");
            return ProviderSet::Unconfigured;
        }

        match GraphClient::from_settings(settings) {
            Ok(client) => {
                let client = Arc::new(client);
                let organizer = settings
                    .organizer_user_id
                    .clone()
                    .unwrap_or_default();
                ProviderSet::Configured {
                    occurrence: Box::new(GraphOccurrenceResolver::new(
                        Arc::clone(&client),
                        organizer,
                    )),
                    attendance: Box::new(GraphAttendanceResolver::new(client)),
                }
            }
            Err(err) => {
                warn!(error = %err, "could not construct graph client, falling back to NO_DATA");
                ProviderSet::Unconfigured
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, ProviderSet::Configured { .. })
    }
}
