//! Derives the dashboard state from the event log. Nothing here is stored;
//! every refresh recomputes from the full log.

use chrono::{DateTime, Utc};

use crate::db::models::device_status;
use crate::models::access::{AccessEvent, DoorState, MotionCode};
use crate::services::timeline::Timeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancySummary {
    pub door: DoorState,
    /// Entries minus exits, never below zero.
    pub occupancy: u64,
    pub system_ok: bool,
    /// `None` until the first entry, exit or door reading.
    pub last_activity: Option<DateTime<Utc>>,
    pub timeline: Timeline,
}

/// Reconstruct the summary from `events` in any order. "Most recent" is
/// decided by `(time, id)`.
pub fn reconstruct(events: &[AccessEvent], device_status: Option<i32>, now: DateTime<Utc>) -> OccupancySummary {
    let mut ordered: Vec<&AccessEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.time, e.id));

    // -1 door codes carry no state and are skipped
    let door = ordered
        .iter()
        .rev()
        .find_map(|e| e.door.state())
        .unwrap_or_default();

    let (entries, exits) = ordered.iter().fold((0i64, 0i64), |(n, x), e| match e.motion {
        MotionCode::Entry => (n + 1, x),
        MotionCode::Exit => (n, x + 1),
        MotionCode::Idle | MotionCode::Unknown => (n, x),
    });
    let occupancy = (entries - exits).max(0) as u64;

    let last_activity = ordered.iter().rev().find(|e| e.is_activity()).map(|e| e.time);

    OccupancySummary {
        door,
        occupancy,
        system_ok: device_status == Some(device_status::OK),
        last_activity,
        timeline: Timeline::build(ordered.iter().copied(), now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access::DoorCode;
    use chrono::{Duration, TimeZone};

    fn t(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn ev(id: i64, min: i64, motion: MotionCode, door: DoorCode) -> AccessEvent {
        AccessEvent {
            id,
            time: t(min),
            motion,
            door,
        }
    }

    #[test]
    fn empty_log_defaults() {
        let s = reconstruct(&[], None, t(0));
        assert_eq!(s.door, DoorState::Closed);
        assert_eq!(s.occupancy, 0);
        assert!(!s.system_ok);
        assert_eq!(s.last_activity, None);
        assert!(s.timeline.is_empty());
    }

    #[test]
    fn occupancy_is_entries_minus_exits_clamped() {
        let log = [
            ev(1, 1, MotionCode::Entry, DoorCode::Unknown),
            ev(2, 2, MotionCode::Exit, DoorCode::Unknown),
            ev(3, 3, MotionCode::Entry, DoorCode::Unknown),
        ];
        let s = reconstruct(&log, Some(1), t(10));
        assert_eq!(s.occupancy, 1);
        let values: Vec<i64> = s.timeline.points().iter().map(|p| p.occupancy).collect();
        assert_eq!(values, vec![1, 0, 1, 1]);

        let exits_only = [
            ev(1, 1, MotionCode::Exit, DoorCode::Unknown),
            ev(2, 2, MotionCode::Exit, DoorCode::Unknown),
        ];
        assert_eq!(reconstruct(&exits_only, Some(1), t(10)).occupancy, 0);
    }

    #[test]
    fn unknown_door_codes_do_not_change_state() {
        let log = [
            ev(1, 1, MotionCode::Idle, DoorCode::Open),
            ev(2, 2, MotionCode::Entry, DoorCode::Unknown),
            ev(3, 3, MotionCode::Idle, DoorCode::Unknown),
        ];
        assert_eq!(reconstruct(&log, Some(1), t(10)).door, DoorState::Open);

        let closed_later = [
            ev(1, 1, MotionCode::Idle, DoorCode::Open),
            ev(2, 2, MotionCode::Idle, DoorCode::Closed),
            ev(3, 3, MotionCode::Idle, DoorCode::Unknown),
        ];
        assert_eq!(reconstruct(&closed_later, Some(1), t(10)).door, DoorState::Closed);
    }

    #[test]
    fn input_order_does_not_matter() {
        let ascending = [
            ev(1, 1, MotionCode::Entry, DoorCode::Open),
            ev(2, 2, MotionCode::Idle, DoorCode::Closed),
            ev(3, 3, MotionCode::Exit, DoorCode::Unknown),
        ];
        let mut descending = ascending.clone();
        descending.reverse();
        assert_eq!(
            reconstruct(&ascending, Some(1), t(10)),
            reconstruct(&descending, Some(1), t(10))
        );
    }

    #[test]
    fn same_timestamp_breaks_ties_by_id() {
        let log = [
            ev(5, 1, MotionCode::Idle, DoorCode::Closed),
            ev(4, 1, MotionCode::Idle, DoorCode::Open),
        ];
        assert_eq!(reconstruct(&log, Some(1), t(10)).door, DoorState::Closed);
    }

    #[test]
    fn last_activity_skips_no_information_rows() {
        let log = [
            ev(1, 1, MotionCode::Idle, DoorCode::Closed),
            ev(2, 2, MotionCode::Exit, DoorCode::Unknown),
            ev(3, 3, MotionCode::Unknown, DoorCode::Unknown),
            ev(4, 4, MotionCode::Idle, DoorCode::Unknown),
        ];
        assert_eq!(reconstruct(&log, Some(1), t(10)).last_activity, Some(t(2)));
    }

    #[test]
    fn system_ok_follows_device_status() {
        assert!(reconstruct(&[], Some(1), t(0)).system_ok);
        assert!(!reconstruct(&[], Some(0), t(0)).system_ok);
        assert!(!reconstruct(&[], Some(3), t(0)).system_ok);
    }

    #[test]
    fn reconstruction_is_repeatable() {
        let log = [
            ev(1, 1, MotionCode::Entry, DoorCode::Open),
            ev(2, 5, MotionCode::Exit, DoorCode::Closed),
        ];
        let first = reconstruct(&log, Some(1), t(9));
        let second = reconstruct(&log, Some(1), t(9));
        assert_eq!(first, second);
    }
}
