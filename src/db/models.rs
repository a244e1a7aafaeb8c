//! Diesel model structs for the reference rows and the append-only event log.
//!
//! Reference rows (`users`, `rooms`, `devices`, `sensors`) are written once by
//! provisioning. `events` only ever receives inserts.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

pub mod device_status {
    pub const OK: i32 = 1;
}

/// The fixed sensor set every device is provisioned with, as `(kind, pin)`.
pub const FIXED_SENSORS: [(&str, &str); 3] = [
    ("magnetic", "GPIO23"),
    ("ultrasonic_inside", "GPIO19"),
    ("ultrasonic_outside", "GPIO18"),
];

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::users)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::rooms)]
#[diesel(belongs_to(User))]
pub struct Room {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::rooms)]
pub struct NewRoom {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::devices)]
#[diesel(belongs_to(Room))]
pub struct Device {
    pub id: i64,
    pub room_id: i64,
    pub status: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::devices)]
pub struct NewDevice {
    pub room_id: i64,
    pub status: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
#[diesel(belongs_to(Device))]
pub struct Sensor {
    pub id: i64,
    pub device_id: i64,
    pub kind: String,
    pub pin: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensors)]
pub struct NewSensor {
    pub device_id: i64,
    pub kind: String,
    pub pin: String,
}

// Append-only: motion_code in {-1, 0, 1, 2}, door_code in {-1, 0, 1}
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::events)]
#[diesel(belongs_to(Room))]
#[diesel(belongs_to(Sensor))]
pub struct Event {
    pub id: i64,
    pub room_id: i64,
    pub sensor_id: Option<i64>,
    pub motion_code: i32,
    pub door_code: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::events)]
pub struct NewEvent {
    pub room_id: i64,
    pub sensor_id: Option<i64>,
    pub motion_code: i32,
    pub door_code: i32,
    pub created_at: DateTime<Utc>,
}
