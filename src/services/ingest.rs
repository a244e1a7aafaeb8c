use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::db::models::{Event, NewEvent};
use crate::db::store::{Store, StoreError};
use crate::models::access::{DoorCode, EventCodes, MotionCode};
use crate::services::normalize::{normalize, NormalizeError};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Rejected(#[from] NormalizeError),
    #[error("storing event failed: {0}")]
    Storage(#[from] StoreError),
}

/// Normalize one raw sensor report and append it to the event log.
/// Nothing is written when the report is rejected.
pub fn submit_report(
    store: &dyn Store,
    room_id: i64,
    door: Option<&str>,
    motion: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Event, IngestError> {
    let codes = normalize(door, motion).inspect_err(|e| warn!("Rejected report: {}", e))?;
    if let Some(line) = door_log_line(door, codes.door) {
        info!("{}", line);
    }
    log_motion(codes.motion);
    Ok(append_event(store, room_id, codes, now)?)
}

pub fn append_event(
    store: &dyn Store,
    room_id: i64,
    codes: EventCodes,
    now: DateTime<Utc>,
) -> Result<Event, StoreError> {
    let row = NewEvent {
        room_id,
        sensor_id: None,
        motion_code: codes.motion.code(),
        door_code: codes.door.code(),
        created_at: now,
    };
    store.append_event(&row)
}

/// Door line for a report; absent door fields are not logged.
fn door_log_line(raw: Option<&str>, code: DoorCode) -> Option<String> {
    let raw = raw?;
    Some(match code {
        DoorCode::Open => "Door: open".to_string(),
        DoorCode::Closed => "Door: closed".to_string(),
        DoorCode::Unknown => format!("Door: unknown state {:?}, stored as unknown", raw.trim()),
    })
}

fn log_motion(motion: MotionCode) {
    match motion {
        MotionCode::Entry => info!("Motion: someone entered"),
        MotionCode::Exit => info!("Motion: someone left"),
        MotionCode::Unknown => warn!("Motion: unrecognised label, stored as unknown"),
        MotionCode::Idle => {}
    }
}
