//! Storage seam shared by the ingestion service and the dashboard.
//!
//! `PgStore` is the production implementation on top of an r2d2 pool of diesel
//! Postgres connections. Every method is blocking; async callers go through
//! `tokio::task::spawn_blocking`.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use std::time::Duration;

use crate::db::models::{Event, NewDevice, NewEvent, NewRoom, NewSensor, NewUser};
use crate::schema;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("malformed result: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Errors that will not go away by polling again.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Malformed(_) | StoreError::Query(diesel::result::Error::DeserializationError(_))
        )
    }
}

pub trait Store: Send + Sync {
    fn find_user(&self, name: &str) -> Result<Option<i64>, StoreError>;
    /// No-op when a user with the same name already exists.
    fn insert_user(&self, row: &NewUser) -> Result<(), StoreError>;

    fn find_room(&self, user_id: i64, name: &str) -> Result<Option<i64>, StoreError>;
    /// No-op when the user already owns a room with the same name.
    fn insert_room(&self, row: &NewRoom) -> Result<(), StoreError>;

    fn find_device(&self, room_id: i64) -> Result<Option<i64>, StoreError>;
    /// No-op when the room already has a device.
    fn insert_device(&self, row: &NewDevice) -> Result<(), StoreError>;

    fn find_sensor(&self, device_id: i64, kind: &str, pin: &str) -> Result<Option<i64>, StoreError>;
    /// No-op when the device already has this `(kind, pin)` sensor.
    fn insert_sensor(&self, row: &NewSensor) -> Result<(), StoreError>;

    fn append_event(&self, row: &NewEvent) -> Result<Event, StoreError>;
    /// The whole log, ascending by `(created_at, id)`.
    fn load_events(&self) -> Result<Vec<Event>, StoreError>;
    /// Health flag of the most recently created device.
    fn device_status(&self) -> Result<Option<i32>, StoreError>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Build a pool and fail fast if the database cannot be reached.
    pub fn connect(database_url: &str, max_size: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(PgStore { pool })
    }

    /// Build a pool without opening connections up front; failures surface on
    /// first use instead.
    pub fn connect_lazy(database_url: &str, max_size: u32) -> Self {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build_unchecked(manager);
        PgStore { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl Store for PgStore {
    fn find_user(&self, name: &str) -> Result<Option<i64>, StoreError> {
        use schema::users::dsl as U;

        let mut conn = self.conn()?;
        let id = U::users
            .filter(U::name.eq(name))
            .select(U::id)
            .first::<i64>(&mut conn)
            .optional()?;
        Ok(id)
    }

    fn insert_user(&self, row: &NewUser) -> Result<(), StoreError> {
        use schema::users::dsl as U;

        let mut conn = self.conn()?;
        diesel::insert_into(U::users)
            .values(row)
            .on_conflict(U::name)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_room(&self, user_id: i64, name: &str) -> Result<Option<i64>, StoreError> {
        use schema::rooms::dsl as R;

        let mut conn = self.conn()?;
        let id = R::rooms
            .filter(R::user_id.eq(user_id).and(R::name.eq(name)))
            .select(R::id)
            .first::<i64>(&mut conn)
            .optional()?;
        Ok(id)
    }

    fn insert_room(&self, row: &NewRoom) -> Result<(), StoreError> {
        use schema::rooms::dsl as R;

        let mut conn = self.conn()?;
        diesel::insert_into(R::rooms)
            .values(row)
            .on_conflict((R::user_id, R::name))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_device(&self, room_id: i64) -> Result<Option<i64>, StoreError> {
        use schema::devices::dsl as D;

        let mut conn = self.conn()?;
        let id = D::devices
            .filter(D::room_id.eq(room_id))
            .select(D::id)
            .first::<i64>(&mut conn)
            .optional()?;
        Ok(id)
    }

    fn insert_device(&self, row: &NewDevice) -> Result<(), StoreError> {
        use schema::devices::dsl as D;

        let mut conn = self.conn()?;
        diesel::insert_into(D::devices)
            .values(row)
            .on_conflict(D::room_id)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_sensor(&self, device_id: i64, kind: &str, pin: &str) -> Result<Option<i64>, StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn()?;
        let id = S::sensors
            .filter(S::device_id.eq(device_id).and(S::kind.eq(kind)).and(S::pin.eq(pin)))
            .select(S::id)
            .first::<i64>(&mut conn)
            .optional()?;
        Ok(id)
    }

    fn insert_sensor(&self, row: &NewSensor) -> Result<(), StoreError> {
        use schema::sensors::dsl as S;

        let mut conn = self.conn()?;
        diesel::insert_into(S::sensors)
            .values(row)
            .on_conflict((S::device_id, S::kind, S::pin))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn append_event(&self, row: &NewEvent) -> Result<Event, StoreError> {
        use schema::events::dsl as E;

        let mut conn = self.conn()?;
        let event = diesel::insert_into(E::events)
            .values(row)
            .returning(Event::as_returning())
            .get_result(&mut conn)?;
        Ok(event)
    }

    fn load_events(&self) -> Result<Vec<Event>, StoreError> {
        use schema::events::dsl as E;

        let mut conn = self.conn()?;
        let rows = E::events
            .order((E::created_at.asc(), E::id.asc()))
            .select(Event::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn device_status(&self) -> Result<Option<i32>, StoreError> {
        use schema::devices::dsl as D;

        let mut conn = self.conn()?;
        let status = D::devices
            .order(D::id.desc())
            .select(D::status)
            .first::<i32>(&mut conn)
            .optional()?;
        Ok(status)
    }
}
