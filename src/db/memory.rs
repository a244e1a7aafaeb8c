//! In-memory `Store` used by tests. Enforces the same unique keys as the
//! migrations so provisioning behaves as it would against Postgres.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::db::models::{Device, Event, NewDevice, NewEvent, NewRoom, NewSensor, NewUser, Room, Sensor, User};
use crate::db::store::{Store, StoreError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    rooms: Vec<Room>,
    devices: Vec<Device>,
    sensors: Vec<Sensor>,
    events: Vec<Event>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub users: usize,
    pub rooms: usize,
    pub devices: usize,
    pub sensors: usize,
    pub events: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<VecDeque<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next store call returns `err` instead of touching the tables.
    pub fn fail_next(&self, err: StoreError) {
        self.failures.lock().push_back(err);
    }

    /// Insert a row verbatim, bypassing the code checks the schema would apply.
    pub fn insert_raw_event(&self, row: Event) {
        self.tables.lock().events.push(row);
    }

    pub fn set_device_status(&self, status: i32) {
        if let Some(device) = self.tables.lock().devices.last_mut() {
            device.status = status;
        }
    }

    pub fn counts(&self) -> RowCounts {
        let t = self.tables.lock();
        RowCounts {
            users: t.users.len(),
            rooms: t.rooms.len(),
            devices: t.devices.len(),
            sensors: t.sensors.len(),
            events: t.events.len(),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn find_user(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().users.iter().find(|u| u.name == name).map(|u| u.id))
    }

    fn insert_user(&self, row: &NewUser) -> Result<(), StoreError> {
        self.check()?;
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.name == row.name) {
            return Ok(());
        }
        let id = t.next_id();
        t.users.push(User {
            id,
            name: row.name.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn find_room(&self, user_id: i64, name: &str) -> Result<Option<i64>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .rooms
            .iter()
            .find(|r| r.user_id == user_id && r.name == name)
            .map(|r| r.id))
    }

    fn insert_room(&self, row: &NewRoom) -> Result<(), StoreError> {
        self.check()?;
        let mut t = self.tables.lock();
        if t.rooms.iter().any(|r| r.user_id == row.user_id && r.name == row.name) {
            return Ok(());
        }
        let id = t.next_id();
        t.rooms.push(Room {
            id,
            user_id: row.user_id,
            name: row.name.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn find_device(&self, room_id: i64) -> Result<Option<i64>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().devices.iter().find(|d| d.room_id == room_id).map(|d| d.id))
    }

    fn insert_device(&self, row: &NewDevice) -> Result<(), StoreError> {
        self.check()?;
        let mut t = self.tables.lock();
        if t.devices.iter().any(|d| d.room_id == row.room_id) {
            return Ok(());
        }
        let id = t.next_id();
        t.devices.push(Device {
            id,
            room_id: row.room_id,
            status: row.status,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn find_sensor(&self, device_id: i64, kind: &str, pin: &str) -> Result<Option<i64>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .sensors
            .iter()
            .find(|s| s.device_id == device_id && s.kind == kind && s.pin == pin)
            .map(|s| s.id))
    }

    fn insert_sensor(&self, row: &NewSensor) -> Result<(), StoreError> {
        self.check()?;
        let mut t = self.tables.lock();
        if t
            .sensors
            .iter()
            .any(|s| s.device_id == row.device_id && s.kind == row.kind && s.pin == row.pin)
        {
            return Ok(());
        }
        let id = t.next_id();
        t.sensors.push(Sensor {
            id,
            device_id: row.device_id,
            kind: row.kind.clone(),
            pin: row.pin.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn append_event(&self, row: &NewEvent) -> Result<Event, StoreError> {
        self.check()?;
        let mut t = self.tables.lock();
        let id = t.next_id();
        let event = Event {
            id,
            room_id: row.room_id,
            sensor_id: row.sensor_id,
            motion_code: row.motion_code,
            door_code: row.door_code,
            created_at: row.created_at,
        };
        t.events.push(event.clone());
        Ok(event)
    }

    fn load_events(&self) -> Result<Vec<Event>, StoreError> {
        self.check()?;
        let mut rows = self.tables.lock().events.clone();
        rows.sort_by_key(|e| (e.created_at, e.id));
        Ok(rows)
    }

    fn device_status(&self) -> Result<Option<i32>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().devices.iter().max_by_key(|d| d.id).map(|d| d.status))
    }
}
