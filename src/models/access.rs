//! Domain codes carried by every access event.
//!
//! The integer values are the stored representation and are shared with the
//! embedded sensors' reports, so they must not be renumbered.

use chrono::{DateTime, Utc};
use core::fmt;

use crate::db::models::Event;

/// Movement classification of a single report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionCode {
    /// Motion label present but not recognised.
    Unknown,
    /// No motion reported.
    Idle,
    Entry,
    Exit,
}

impl MotionCode {
    pub fn code(self) -> i32 {
        match self {
            MotionCode::Unknown => -1,
            MotionCode::Idle => 0,
            MotionCode::Entry => 1,
            MotionCode::Exit => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(MotionCode::Unknown),
            0 => Some(MotionCode::Idle),
            1 => Some(MotionCode::Entry),
            2 => Some(MotionCode::Exit),
            _ => None,
        }
    }

    /// Change in head count contributed by this report.
    pub fn delta(self) -> i64 {
        match self {
            MotionCode::Entry => 1,
            MotionCode::Exit => -1,
            MotionCode::Idle | MotionCode::Unknown => 0,
        }
    }

    pub fn is_movement(self) -> bool {
        matches!(self, MotionCode::Entry | MotionCode::Exit)
    }
}

/// Door sensor classification of a single report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorCode {
    /// No door data, or a value outside {0, 1}. Means "no change".
    Unknown,
    Closed,
    Open,
}

impl DoorCode {
    pub fn code(self) -> i32 {
        match self {
            DoorCode::Unknown => -1,
            DoorCode::Closed => 0,
            DoorCode::Open => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(DoorCode::Unknown),
            0 => Some(DoorCode::Closed),
            1 => Some(DoorCode::Open),
            _ => None,
        }
    }

    /// The door state this report asserts, if any.
    pub fn state(self) -> Option<DoorState> {
        match self {
            DoorCode::Closed => Some(DoorState::Closed),
            DoorCode::Open => Some(DoorState::Open),
            DoorCode::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DoorState {
    #[default]
    Closed,
    Open,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorState::Closed => write!(f, "closed"),
            DoorState::Open => write!(f, "open"),
        }
    }
}

/// The pair of codes stored for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCodes {
    pub motion: MotionCode,
    pub door: DoorCode,
}

/// A decoded row of the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub id: i64,
    pub time: DateTime<Utc>,
    pub motion: MotionCode,
    pub door: DoorCode,
}

impl AccessEvent {
    /// Whether this event counts as activity (a movement or a door reading).
    pub fn is_activity(&self) -> bool {
        self.motion.is_movement() || self.door.state().is_some()
    }
}

impl TryFrom<&Event> for AccessEvent {
    type Error = String;

    fn try_from(row: &Event) -> Result<Self, Self::Error> {
        let motion = MotionCode::from_code(row.motion_code)
            .ok_or_else(|| format!("event {} has motion_code {} outside -1..=2", row.id, row.motion_code))?;
        let door = DoorCode::from_code(row.door_code)
            .ok_or_else(|| format!("event {} has door_code {} outside -1..=1", row.id, row.door_code))?;
        Ok(AccessEvent {
            id: row.id,
            time: row.created_at,
            motion,
            door,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(motion_code: i32, door_code: i32) -> Event {
        Event {
            id: 7,
            room_id: 1,
            sensor_id: None,
            motion_code,
            door_code,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn codes_survive_storage_representation() {
        for motion in [MotionCode::Unknown, MotionCode::Idle, MotionCode::Entry, MotionCode::Exit] {
            assert_eq!(MotionCode::from_code(motion.code()), Some(motion));
        }
        for door in [DoorCode::Unknown, DoorCode::Closed, DoorCode::Open] {
            assert_eq!(DoorCode::from_code(door.code()), Some(door));
        }
    }

    #[test]
    fn decodes_valid_row() {
        let ev = AccessEvent::try_from(&row(2, -1)).expect("valid row");
        assert_eq!(ev.motion, MotionCode::Exit);
        assert_eq!(ev.door, DoorCode::Unknown);
        assert!(ev.is_activity());
    }

    #[test]
    fn rejects_out_of_domain_codes() {
        assert!(AccessEvent::try_from(&row(3, 0)).is_err());
        assert!(AccessEvent::try_from(&row(0, 2)).is_err());
    }

    #[test]
    fn idle_unknown_row_is_not_activity() {
        let ev = AccessEvent::try_from(&row(-1, -1)).expect("valid row");
        assert!(!ev.is_activity());
        assert_eq!(ev.motion.delta(), 0);
    }
}
