use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::Result;
use gtfs_seed_core::db::{self, DbPool};
use gtfs_seed_core::pipeline::{build_snapshot, BuildOptions};
use gtfs_seed_feed::FeedArchive;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

fn feed_zip(tables: &[(&str, &str)]) -> FeedArchive {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in tables {
        writer.start_file(*name, options).expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    let bytes = writer.finish().expect("finish zip").into_inner();
    FeedArchive::from_bytes(bytes).expect("open feed archive")
}

fn small_feed() -> FeedArchive {
    feed_zip(&[
        (
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon\n\
             S1,Hauptbahnhof,48.78,9.18\n\
             S2,Rathaus,48.77,9.17\n\
             S3,No Position,,\n",
        ),
        (
            "routes.txt",
            "route_id,route_short_name,route_type\n\
             BUS,42,3\n\
             MYSTERY,X,\n",
        ),
        (
            "trips.txt",
            "trip_id,route_id,service_id\n\
             T1,BUS,WD\n\
             T2,MYSTERY,WD\n",
        ),
        (
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:30,S1,1\n\
             T1,08:05:00,08:05:30,S2,2\n\
             T2,09:00:00,09:00:30,S1,1\n",
        ),
        (
            "calendar.txt",
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             WD,1,1,1,1,1,0,0,20250101,20250107\n",
        ),
        (
            "calendar_dates.txt",
            "service_id,date,exception_type\n\
             WD,20250104,1\n\
             WD,20250102,2\n",
        ),
    ])
}

async fn published(path: &Path) -> Result<DbPool> {
    Ok(db::open(path).await?)
}

async fn count(pool: &DbPool, table: &str) -> Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn feed_version(pool: &DbPool) -> Result<String> {
    let value = sqlx::query_scalar("SELECT value FROM metadata WHERE key = 'gtfs_version'")
        .fetch_one(pool)
        .await?;
    Ok(value)
}

async fn service_days(pool: &DbPool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query_as(
        "SELECT service_id, service_date FROM service_days ORDER BY service_id, service_date",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[tokio::test]
async fn full_build_publishes_expected_snapshot() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("gtfs_seed.sqlite");

    let report = build_snapshot(
        &mut small_feed(),
        &BuildOptions {
            output_path: output.clone(),
            feed_version: "20250101-test".into(),
        },
    )
    .await?;

    // The positionless stop is dropped on import.
    assert_eq!(report.stops, 2);
    assert_eq!(report.stop_times, 3);
    assert!(output.exists());
    assert!(!dir.path().join("gtfs_seed.sqlite.tmp").exists());

    let pool = published(&output).await?;
    assert_eq!(count(&pool, "stops").await?, 2);
    assert_eq!(feed_version(&pool).await?, "20250101-test");

    // Weekdays minus the removed 2nd, plus the added Saturday the 4th.
    let days: Vec<String> = service_days(&pool)
        .await?
        .into_iter()
        .map(|(_, date)| date)
        .collect();
    assert_eq!(
        days,
        vec!["20250101", "20250103", "20250104", "20250106", "20250107"]
    );

    // The typeless route contributes nothing to the index.
    let index: Vec<(String, i64)> = sqlx::query_as(
        "SELECT stop_id, route_type FROM stop_route_types ORDER BY stop_id, route_type",
    )
    .fetch_all(&pool)
    .await?;
    assert_eq!(index, vec![("S1".to_string(), 3), ("S2".to_string(), 3)]);

    Ok(())
}

#[tokio::test]
async fn rebuilding_twice_yields_identical_derived_tables() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("gtfs_seed.sqlite");
    let options = BuildOptions {
        output_path: output.clone(),
        feed_version: "v1".into(),
    };

    let mut feed = small_feed();
    let first_report = build_snapshot(&mut feed, &options).await?;
    let pool = published(&output).await?;
    let first_days = service_days(&pool).await?;
    let first_index = count(&pool, "stop_route_types").await?;
    pool.close().await;

    let second_report = build_snapshot(&mut feed, &options).await?;
    let pool = published(&output).await?;

    assert_eq!(first_report.service_days, second_report.service_days);
    assert_eq!(service_days(&pool).await?, first_days);
    assert_eq!(count(&pool, "stop_route_types").await?, first_index);
    assert_eq!(count(&pool, "stop_times").await?, second_report.stop_times as i64);
    Ok(())
}

#[tokio::test]
async fn failed_build_leaves_published_snapshot_untouched() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("gtfs_seed.sqlite");

    build_snapshot(
        &mut small_feed(),
        &BuildOptions {
            output_path: output.clone(),
            feed_version: "good".into(),
        },
    )
    .await?;

    // A stop_times row with more fields than the header makes the CSV reader
    // fail partway through the run, after base tables have been staged.
    let mut broken = feed_zip(&[
        ("stops.txt", "stop_id,stop_name,stop_lat,stop_lon\nS1,A,1.0,2.0\n"),
        ("stop_times.txt", "trip_id,stop_id\nT1,S1,extra\n"),
    ]);
    let result = build_snapshot(
        &mut broken,
        &BuildOptions {
            output_path: output.clone(),
            feed_version: "bad".into(),
        },
    )
    .await;
    assert!(result.is_err());
    assert!(!dir.path().join("gtfs_seed.sqlite.tmp").exists());

    let pool = published(&output).await?;
    assert_eq!(feed_version(&pool).await?, "good");
    assert_eq!(count(&pool, "stops").await?, 2);
    pool.close().await;

    // A later run against the same location still succeeds.
    build_snapshot(
        &mut small_feed(),
        &BuildOptions {
            output_path: output.clone(),
            feed_version: "good-again".into(),
        },
    )
    .await?;
    let pool = published(&output).await?;
    assert_eq!(feed_version(&pool).await?, "good-again");
    Ok(())
}

#[tokio::test]
async fn absent_tables_build_an_empty_but_valid_snapshot() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("gtfs_seed.sqlite");

    let report = build_snapshot(
        &mut feed_zip(&[("stops.txt", "stop_id,stop_name,stop_lat,stop_lon\nS1,A,1.0,2.0\n")]),
        &BuildOptions {
            output_path: output.clone(),
            feed_version: "sparse".into(),
        },
    )
    .await?;

    assert_eq!(report.stops, 1);
    assert_eq!(report.trips, 0);
    assert_eq!(report.service_days, 0);
    assert_eq!(report.stop_route_types, 0);

    let pool = published(&output).await?;
    assert_eq!(count(&pool, "service_days").await?, 0);
    assert_eq!(feed_version(&pool).await?, "sparse");
    Ok(())
}
