//! The load orchestrator.
//!
//! Builds the whole snapshot into a staging file next to the published
//! location and renames it into place only after every phase succeeds, so a
//! failed run can never corrupt a previously published snapshot.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use gtfs_seed_feed::{
    CalendarDateRecord, CalendarRecord, FeedArchive, RouteRecord, StopRecord, StopTimeRecord,
    TripRecord,
};

use crate::calendar;
use crate::db::{self, DbPool};
use crate::error::Result;
use crate::import;
use crate::route_types;

pub const GTFS_VERSION_KEY: &str = "gtfs_version";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Canonical location of the published snapshot.
    pub output_path: PathBuf,
    /// Version label recorded under the `gtfs_version` metadata key.
    pub feed_version: String,
}

/// Rows present per table after each phase; upserts collapse duplicate
/// natural keys, so these are table counts rather than record counts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub stops: u64,
    pub routes: u64,
    pub trips: u64,
    pub stop_times: u64,
    pub calendar_rules: u64,
    pub calendar_exceptions: u64,
    pub service_days: u64,
    pub stop_route_types: u64,
}

/// Run the full pipeline against `feed` and atomically publish the result
/// at `options.output_path`.
///
/// Publication replaces an existing snapshot via `std::fs::rename`, which
/// overwrites the destination on Unix but fails on Windows when the target
/// exists.
pub async fn build_snapshot(
    feed: &mut FeedArchive,
    options: &BuildOptions,
) -> Result<BuildReport> {
    let staging = staging_path(&options.output_path);
    if staging.exists() {
        // Leftover from a crashed run; it was never published.
        std::fs::remove_file(&staging)?;
    }
    if let Some(parent) = options.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = db::open(&staging).await?;
    let result = populate(&pool, feed, &options.feed_version).await;
    pool.close().await;
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            // Discard the partially built staging file; the published
            // snapshot stays as it was.
            let _ = std::fs::remove_file(&staging);
            return Err(err);
        }
    };

    std::fs::rename(&staging, &options.output_path)?;
    info!(output = %options.output_path.display(), "published snapshot");

    Ok(report)
}

/// Staging file in the same directory as the output, so the final rename is
/// an atomic same-filesystem replace.
fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

/// Sequence the phases: schema, base tables in dependency order, then the
/// two derived builders, then metadata. Each phase is its own transaction.
async fn populate(
    pool: &DbPool,
    feed: &mut FeedArchive,
    feed_version: &str,
) -> Result<BuildReport> {
    db::init_schema(pool).await?;

    let mut report = BuildReport::default();

    let stops: Vec<StopRecord> = feed.records()?;
    let mut tx = pool.begin().await?;
    report.stops = import::import_stops(&mut tx, &stops).await?;
    tx.commit().await?;
    info!(rows = report.stops, "imported stops");

    let routes: Vec<RouteRecord> = feed.records()?;
    let mut tx = pool.begin().await?;
    report.routes = import::import_routes(&mut tx, &routes).await?;
    tx.commit().await?;
    info!(rows = report.routes, "imported routes");

    let trips: Vec<TripRecord> = feed.records()?;
    let mut tx = pool.begin().await?;
    report.trips = import::import_trips(&mut tx, &trips).await?;
    tx.commit().await?;
    info!(rows = report.trips, "imported trips");

    let stop_times: Vec<StopTimeRecord> = feed.records()?;
    report.stop_times = import::import_stop_times(pool, &stop_times).await?;
    info!(rows = report.stop_times, "imported stop times");

    let calendar_rules: Vec<CalendarRecord> = feed.records()?;
    let mut tx = pool.begin().await?;
    report.calendar_rules = import::import_calendar(&mut tx, &calendar_rules).await?;
    tx.commit().await?;
    info!(rows = report.calendar_rules, "imported calendar rules");

    let calendar_dates: Vec<CalendarDateRecord> = feed.records()?;
    let mut tx = pool.begin().await?;
    report.calendar_exceptions = import::import_calendar_dates(&mut tx, &calendar_dates).await?;
    tx.commit().await?;
    info!(
        rows = report.calendar_exceptions,
        "imported calendar exceptions"
    );

    let mut tx = pool.begin().await?;
    report.service_days = calendar::rebuild_service_days(&mut tx).await?;
    tx.commit().await?;
    info!(rows = report.service_days, "expanded service days");

    let mut tx = pool.begin().await?;
    report.stop_route_types = route_types::rebuild_stop_route_types(&mut tx).await?;
    tx.commit().await?;
    info!(rows = report.stop_route_types, "built stop route-type index");

    sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)")
        .bind(GTFS_VERSION_KEY)
        .bind(feed_version)
        .execute(pool)
        .await?;

    Ok(report)
}
