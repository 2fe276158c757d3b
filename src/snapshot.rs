use serde_json::Map;

use crate::models::{AttendanceSummary, MeetingOccurrence, MeetingSnapshot};

/// Merge an occurrence and an attendance summary into one snapshot.
///
/// Total over its inputs: either side may be absent.
///
/// The raw merge keeps the historical shape: under the occurrence branch the
/// attendance payload piggybacks on the occurrence payload, and attendance
/// with real data attaches its payload on its own. The net keys are
/// "occurrence" iff the occurrence carried a payload, and "attendance" iff
/// (occurrence present and attendance payload present) or (has_data and
/// attendance payload present). An empty merge is stored as None.
pub fn build_snapshot(
    occurrence: Option<&MeetingOccurrence>,
    attendance: Option<&AttendanceSummary>,
) -> MeetingSnapshot {
    let mut cancelled = false;
    let mut raw = Map::new();

    if let Some(occurrence) = occurrence {
        cancelled = occurrence.is_cancelled;
        if let Some(payload) = &occurrence.raw {
            raw.insert("occurrence".to_string(), payload.clone());
        }
        if let Some(payload) = attendance.and_then(|a| a.raw.as_ref()) {
            raw.insert("attendance".to_string(), payload.clone());
        }
    }

    let mut non_organizer_count = 0;
    let mut duration_minutes = 0.0;

    if let Some(attendance) = attendance {
        if attendance.has_data {
            non_organizer_count = attendance.non_organizer_count;
            duration_minutes = attendance.duration_minutes;
            if let Some(payload) = &attendance.raw {
                raw.insert("attendance".to_string(), payload.clone());
            }
        }
    }

    MeetingSnapshot {
        cancelled,
        non_organizer_count,
        duration_minutes,
        raw: if raw.is_empty() { None } else { Some(raw) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn occurrence(cancelled: bool, raw: Option<serde_json::Value>) -> MeetingOccurrence {
        MeetingOccurrence {
            meeting_id: "m-1".to_string(),
            start_time_utc: None,
            end_time_utc: None,
            is_cancelled: cancelled,
            raw,
        }
    }

    fn attendance(
        count: i32,
        minutes: f64,
        has_data: bool,
        raw: Option<serde_json::Value>,
    ) -> AttendanceSummary {
        AttendanceSummary {
            meeting_id: "m-1".to_string(),
            non_organizer_count: count,
            duration_minutes: minutes,
            has_data,
            raw,
        }
    }

    #[test]
    fn combines_occurrence_and_attendance() {
        let occ = occurrence(false, Some(json!({"id": "ev-1"})));
        let att = attendance(3, 12.5, true, Some(json!({"value": []})));

        let snap = build_snapshot(Some(&occ), Some(&att));

        assert!(!snap.cancelled);
        assert_eq!(snap.non_organizer_count, 3);
        assert_eq!(snap.duration_minutes, 12.5);
        let raw = snap.raw.expect("raw should be populated");
        assert_eq!(raw["occurrence"], json!({"id": "ev-1"}));
        assert_eq!(raw["attendance"], json!({"value": []}));
    }

    #[test]
    fn missing_attendance_defaults_to_zero() {
        let occ = occurrence(true, Some(json!({"id": "ev-2"})));

        let snap = build_snapshot(Some(&occ), None);

        assert!(snap.cancelled);
        assert_eq!(snap.non_organizer_count, 0);
        assert_eq!(snap.duration_minutes, 0.0);
        let raw = snap.raw.expect("occurrence payload kept");
        assert!(raw.contains_key("occurrence"));
        assert!(!raw.contains_key("attendance"));
    }

    #[test]
    fn attendance_without_data_keeps_zero_metrics_but_payload_rides_occurrence() {
        let occ = occurrence(false, None);
        let att = attendance(4, 20.0, false, Some(json!({"value": []})));

        let snap = build_snapshot(Some(&occ), Some(&att));

        // has_data=false means metrics are not trusted
        assert_eq!(snap.non_organizer_count, 0);
        assert_eq!(snap.duration_minutes, 0.0);
        let raw = snap.raw.expect("attendance payload attached via occurrence");
        assert!(raw.contains_key("attendance"));
        assert!(!raw.contains_key("occurrence"));
    }

    #[test]
    fn attendance_payload_without_occurrence_needs_has_data() {
        let att_no_data = attendance(0, 0.0, false, Some(json!({"value": []})));
        let snap = build_snapshot(None, Some(&att_no_data));
        assert!(snap.raw.is_none());

        let att_with_data = attendance(2, 9.0, true, Some(json!({"value": []})));
        let snap = build_snapshot(None, Some(&att_with_data));
        let raw = snap.raw.expect("has_data attaches the payload");
        assert!(raw.contains_key("attendance"));
    }

    #[test]
    fn missing_everything_yields_empty_snapshot() {
        let snap = build_snapshot(None, None);

        assert!(!snap.cancelled);
        assert_eq!(snap.non_organizer_count, 0);
        assert_eq!(snap.duration_minutes, 0.0);
        assert!(snap.raw.is_none());
    }
}
