//! Base-table imports. Every function writes through an explicit store
//! transaction supplied by the orchestrator; `stop_times` is the exception
//! and manages its own bounded batches.

use sqlx::{Sqlite, Transaction};

use gtfs_seed_feed::{
    CalendarDateRecord, CalendarRecord, RouteRecord, StopRecord, StopTimeRecord, TripRecord,
};

use crate::db::DbPool;
use crate::error::Result;

/// Rows per `stop_times` transaction. The table is by far the largest in a
/// feed, so it is committed in bounded batches.
pub const STOP_TIME_BATCH: usize = 2000;

/// Imports report the rows present in the table afterwards, not the records
/// processed: upserts collapse duplicate natural keys.
async fn table_count(tx: &mut Transaction<'_, Sqlite>, table: &str) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut **tx)
        .await?;
    Ok(count as u64)
}

pub async fn import_stops(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[StopRecord],
) -> Result<u64> {
    for record in records {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO stops (
                stop_id, stop_name, stop_desc, stop_lat, stop_lon,
                location_type, parent_station, wheelchair_boarding
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.stop_id)
        .bind(&record.name)
        .bind(record.description.as_deref())
        .bind(record.lat)
        .bind(record.lon)
        .bind(record.location_type)
        .bind(record.parent_station.as_deref())
        .bind(record.wheelchair_boarding)
        .execute(&mut **tx)
        .await?;
    }
    table_count(tx, "stops").await
}

pub async fn import_routes(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[RouteRecord],
) -> Result<u64> {
    for record in records {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO routes (route_id, short_name, long_name, type)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&record.route_id)
        .bind(record.short_name.as_deref())
        .bind(record.long_name.as_deref())
        .bind(record.route_type)
        .execute(&mut **tx)
        .await?;
    }
    table_count(tx, "routes").await
}

pub async fn import_trips(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[TripRecord],
) -> Result<u64> {
    for record in records {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO trips (
                trip_id, route_id, service_id, headsign, direction_id, shape_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&record.trip_id)
        .bind(&record.route_id)
        .bind(&record.service_id)
        .bind(record.headsign.as_deref())
        .bind(record.direction_id)
        .bind(record.shape_id.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    table_count(tx, "trips").await
}

/// Import `stop_times` in batches of [`STOP_TIME_BATCH`] rows, each batch
/// its own transaction. Batching only bounds transaction size; once the
/// import returns, the full set is present.
pub async fn import_stop_times(pool: &DbPool, records: &[StopTimeRecord]) -> Result<u64> {
    for batch in records.chunks(STOP_TIME_BATCH) {
        let mut tx = pool.begin().await?;
        for record in batch {
            sqlx::query(
                r#"
                INSERT INTO stop_times (
                    trip_id, arrival_time, departure_time,
                    stop_id, stop_sequence, pickup_type, drop_off_type
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&record.trip_id)
            .bind(record.arrival_time.as_deref())
            .bind(record.departure_time.as_deref())
            .bind(&record.stop_id)
            .bind(record.stop_sequence)
            .bind(record.pickup_type)
            .bind(record.drop_off_type)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
    }
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stop_times")
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}

pub async fn import_calendar(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[CalendarRecord],
) -> Result<u64> {
    for record in records {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO calendar (
                service_id, monday, tuesday, wednesday, thursday,
                friday, saturday, sunday, start_date, end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.service_id)
        .bind(record.monday)
        .bind(record.tuesday)
        .bind(record.wednesday)
        .bind(record.thursday)
        .bind(record.friday)
        .bind(record.saturday)
        .bind(record.sunday)
        .bind(record.start_date.as_deref())
        .bind(record.end_date.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    table_count(tx, "calendar").await
}

pub async fn import_calendar_dates(
    tx: &mut Transaction<'_, Sqlite>,
    records: &[CalendarDateRecord],
) -> Result<u64> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO calendar_dates (service_id, date, exception_type)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&record.service_id)
        .bind(&record.date)
        .bind(record.exception_type)
        .execute(&mut **tx)
        .await?;
    }
    table_count(tx, "calendar_dates").await
}
