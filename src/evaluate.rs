use serde_json::Value;

use crate::models::{MeetingSnapshot, StandupStatus};

/// Minimum number of non-organizer attendees for a standup to count.
pub const MIN_ATTENDEES: i32 = 2;

/// Meetings at or below this duration are treated as not having happened.
pub const MAX_TRIVIAL_DURATION_MINUTES: f64 = 3.0;

/// Apply the compliance rules to a normalized snapshot.
///
/// Decision order, first match wins:
/// 1. no snapshot at all             => NO_DATA
/// 2. raw payload carries an error   => ERROR
/// 3. occurrence cancelled           => CANCELLED
/// 4. too few non-organizer people   => MISSED
/// 5. meeting too short              => MISSED
/// 6. otherwise                      => HAPPENED
pub fn evaluate(snapshot: Option<&MeetingSnapshot>) -> StandupStatus {
    let Some(snapshot) = snapshot else {
        return StandupStatus::NoData;
    };

    if raw_has_error(snapshot) {
        return StandupStatus::Error;
    }

    if snapshot.cancelled {
        return StandupStatus::Cancelled;
    }

    if snapshot.non_organizer_count < MIN_ATTENDEES {
        return StandupStatus::Missed;
    }

    if snapshot.duration_minutes <= MAX_TRIVIAL_DURATION_MINUTES {
        return StandupStatus::Missed;
    }

    StandupStatus::Happened
}

/// An error marker is an "error" key at the top level of the merged raw
/// payload, or inside any of its direct object values (the per-provider
/// sub-payloads embed failures that way).
fn raw_has_error(snapshot: &MeetingSnapshot) -> bool {
    let Some(raw) = &snapshot.raw else {
        return false;
    };

    if raw.contains_key("error") {
        return true;
    }

    raw.values().any(|value| match value {
        Value::Object(map) => map.contains_key("error"),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn snapshot(cancelled: bool, count: i32, minutes: f64) -> MeetingSnapshot {
        MeetingSnapshot {
            cancelled,
            non_organizer_count: count,
            duration_minutes: minutes,
            raw: None,
        }
    }

    fn raw_from(value: serde_json::Value) -> Option<Map<String, serde_json::Value>> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn healthy_meeting_happened() {
        let snap = snapshot(false, 3, 10.0);
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Happened);
    }

    #[test]
    fn missing_snapshot_is_no_data() {
        assert_eq!(evaluate(None), StandupStatus::NoData);
    }

    #[test]
    fn too_few_attendees_missed() {
        let snap = snapshot(false, 1, 30.0);
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Missed);
    }

    #[test]
    fn duration_boundary_is_missed() {
        // exactly 3.0 minutes still counts as trivial
        let snap = snapshot(false, 5, MAX_TRIVIAL_DURATION_MINUTES);
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Missed);
    }

    #[test]
    fn cancelled_wins_over_attendance_rules() {
        let snap = snapshot(true, 5, 30.0);
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Cancelled);
    }

    #[test]
    fn nested_error_marker_wins_over_everything() {
        let mut snap = snapshot(true, 5, 30.0);
        snap.raw = raw_from(json!({"occurrence": {"error": "x"}}));
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Error);
    }

    #[test]
    fn top_level_error_marker_detected() {
        let mut snap = snapshot(false, 5, 30.0);
        snap.raw = raw_from(json!({"error": "token fetch failed"}));
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Error);
    }

    #[test]
    fn non_object_raw_values_are_not_errors() {
        let mut snap = snapshot(false, 5, 30.0);
        snap.raw = raw_from(json!({"occurrence": "opaque"}));
        assert_eq!(evaluate(Some(&snap)), StandupStatus::Happened);
    }
}
