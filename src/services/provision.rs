use log::{debug, info};

use crate::db::models::{device_status, NewDevice, NewRoom, NewSensor, NewUser, FIXED_SENSORS};
use crate::db::store::Store;

/// Names identifying this installation's reference rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationSettings {
    pub user_name: String,
    pub room_name: String,
}

/// Resolved ids of the reference rows, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installation {
    pub user_id: i64,
    pub room_id: i64,
    pub device_id: i64,
}

/// Create the user, room, device and fixed sensor rows if they do not exist
/// yet, and return their ids. Safe to call repeatedly and concurrently: every
/// insert is a no-op on its unique key and is followed by a re-select.
pub fn provision(store: &dyn Store, settings: &InstallationSettings) -> Result<Installation, String> {
    info!(
        "Provisioning installation (user={}, room={})",
        settings.user_name, settings.room_name
    );
    let user_id = ensure_user(store, &settings.user_name)?;
    let room_id = ensure_room(store, user_id, &settings.room_name)?;
    let device_id = ensure_device(store, room_id)?;
    let created_sensors = ensure_sensors(store, device_id)?;
    info!(
        "Provisioning complete (user_id={}, room_id={}, device_id={}, new_sensors={})",
        user_id, room_id, device_id, created_sensors
    );
    Ok(Installation {
        user_id,
        room_id,
        device_id,
    })
}

fn ensure_user(store: &dyn Store, name: &str) -> Result<i64, String> {
    if let Some(id) = store.find_user(name).map_err(|e| format!("fetch user failed: {}", e))? {
        debug!("Provision: user {} already present (id={})", name, id);
        return Ok(id);
    }
    store
        .insert_user(&NewUser { name: name.to_string() })
        .map_err(|e| format!("insert user failed: {}", e))?;
    store
        .find_user(name)
        .map_err(|e| format!("fetch user failed: {}", e))?
        .ok_or_else(|| format!("user {} missing after insert", name))
}

fn ensure_room(store: &dyn Store, user_id: i64, name: &str) -> Result<i64, String> {
    if let Some(id) = store
        .find_room(user_id, name)
        .map_err(|e| format!("fetch room failed: {}", e))?
    {
        debug!("Provision: room {} already present (id={})", name, id);
        return Ok(id);
    }
    store
        .insert_room(&NewRoom {
            user_id,
            name: name.to_string(),
        })
        .map_err(|e| format!("insert room failed: {}", e))?;
    store
        .find_room(user_id, name)
        .map_err(|e| format!("fetch room failed: {}", e))?
        .ok_or_else(|| format!("room {} missing after insert", name))
}

fn ensure_device(store: &dyn Store, room_id: i64) -> Result<i64, String> {
    if let Some(id) = store
        .find_device(room_id)
        .map_err(|e| format!("fetch device failed: {}", e))?
    {
        debug!("Provision: device for room {} already present (id={})", room_id, id);
        return Ok(id);
    }
    store
        .insert_device(&NewDevice {
            room_id,
            status: device_status::OK,
        })
        .map_err(|e| format!("insert device failed: {}", e))?;
    store
        .find_device(room_id)
        .map_err(|e| format!("fetch device failed: {}", e))?
        .ok_or_else(|| format!("device for room {} missing after insert", room_id))
}

fn ensure_sensors(store: &dyn Store, device_id: i64) -> Result<usize, String> {
    let mut created = 0;
    for (kind, pin) in FIXED_SENSORS {
        let existing = store
            .find_sensor(device_id, kind, pin)
            .map_err(|e| format!("fetch sensor {}/{} failed: {}", kind, pin, e))?;
        if existing.is_some() {
            continue;
        }
        store
            .insert_sensor(&NewSensor {
                device_id,
                kind: kind.to_string(),
                pin: pin.to_string(),
            })
            .map_err(|e| format!("insert sensor {}/{} failed: {}", kind, pin, e))?;
        created += 1;
    }
    Ok(created)
}
