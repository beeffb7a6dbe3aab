use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::Result;

pub type DbPool = Pool<Sqlite>;

/// The snapshot schema.
///
/// `service_days` and `stop_route_types` are derived tables: they are fully
/// recomputed on every build and never independently edited.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
  key TEXT PRIMARY KEY,
  value TEXT
);

CREATE TABLE IF NOT EXISTS stops (
  stop_id TEXT PRIMARY KEY,
  stop_name TEXT NOT NULL,
  stop_desc TEXT,
  stop_lat REAL NOT NULL,
  stop_lon REAL NOT NULL,
  location_type INTEGER DEFAULT 0,
  parent_station TEXT,
  wheelchair_boarding INTEGER DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_stops_lat_lon ON stops(stop_lat, stop_lon);
CREATE INDEX IF NOT EXISTS idx_stops_name_nocase
  ON stops(stop_name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_stops_parent ON stops(parent_station);

CREATE TABLE IF NOT EXISTS routes (
  route_id TEXT PRIMARY KEY,
  short_name TEXT,
  long_name TEXT,
  type INTEGER
);

CREATE TABLE IF NOT EXISTS trips (
  trip_id TEXT PRIMARY KEY,
  route_id TEXT,
  service_id TEXT,
  headsign TEXT,
  direction_id INTEGER,
  shape_id TEXT
);

CREATE TABLE IF NOT EXISTS stop_times (
  trip_id TEXT,
  arrival_time TEXT,
  departure_time TEXT,
  stop_id TEXT,
  stop_sequence INTEGER,
  pickup_type INTEGER,
  drop_off_type INTEGER
);
CREATE INDEX IF NOT EXISTS idx_stop_times_stop ON stop_times(stop_id);
CREATE INDEX IF NOT EXISTS idx_stop_times_trip ON stop_times(trip_id);

CREATE TABLE IF NOT EXISTS calendar (
  service_id TEXT PRIMARY KEY,
  monday INTEGER,
  tuesday INTEGER,
  wednesday INTEGER,
  thursday INTEGER,
  friday INTEGER,
  saturday INTEGER,
  sunday INTEGER,
  start_date TEXT,
  end_date TEXT
);

CREATE TABLE IF NOT EXISTS calendar_dates (
  service_id TEXT,
  date TEXT,
  exception_type INTEGER
);

CREATE TABLE IF NOT EXISTS service_days (
  service_id TEXT,
  service_date TEXT,
  PRIMARY KEY (service_id, service_date)
);

CREATE TABLE IF NOT EXISTS stop_route_types (
  stop_id TEXT,
  route_type INTEGER,
  PRIMARY KEY (stop_id, route_type)
);
CREATE INDEX IF NOT EXISTS idx_stop_route_stop
  ON stop_route_types(stop_id);
"#;

/// Open the staging database file, creating it if needed.
///
/// A single connection is enough: the build owns the store exclusively and
/// runs its phases sequentially.
pub async fn open(path: &Path) -> Result<DbPool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Open an in-memory database. The pool is pinned to one connection that is
/// never recycled, otherwise the database would vanish between queries.
pub async fn open_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::new().in_memory(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_schema(pool: &DbPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
