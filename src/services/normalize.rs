//! Turns the raw fields of a sensor report into the two stored codes.

use std::num::IntErrorKind;

use crate::models::access::{DoorCode, EventCodes, MotionCode};

const ENTRY_LABEL: &str = "entrada";
const EXIT_LABEL: &str = "salida";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("report carries neither a door state nor a motion label")]
    NothingToRecord,
    #[error("door state {0:?} is not an integer")]
    InvalidDoorValue(String),
}

/// Normalize a report. Fails when both fields are absent or when a present
/// door field does not parse as an integer; an unrecognised motion label is
/// stored as `MotionCode::Unknown` instead.
pub fn normalize(door: Option<&str>, motion: Option<&str>) -> Result<EventCodes, NormalizeError> {
    if door.is_none() && motion.is_none() {
        return Err(NormalizeError::NothingToRecord);
    }

    let door = match door {
        Some(raw) => parse_door(raw)?,
        None => DoorCode::Unknown,
    };
    let motion = motion.map(classify_motion).unwrap_or(MotionCode::Idle);

    Ok(EventCodes { motion, door })
}

fn parse_door(raw: &str) -> Result<DoorCode, NormalizeError> {
    match raw.trim().parse::<i64>() {
        Ok(0) => Ok(DoorCode::Closed),
        Ok(1) => Ok(DoorCode::Open),
        Ok(_) => Ok(DoorCode::Unknown),
        // still an integer, just not one we know
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Ok(DoorCode::Unknown)
        }
        Err(_) => Err(NormalizeError::InvalidDoorValue(raw.to_string())),
    }
}

fn classify_motion(raw: &str) -> MotionCode {
    let label = raw.trim().to_lowercase();
    match label.as_str() {
        ENTRY_LABEL => MotionCode::Entry,
        EXIT_LABEL => MotionCode::Exit,
        _ => MotionCode::Unknown,
    }
}
