//! Service-day expansion.
//!
//! GTFS describes when a service runs as a weekly pattern over an inclusive
//! date range, overlaid with per-date exceptions. The lookup app wants the
//! opposite shape: an explicit `(service_id, service_date)` fact per active
//! day. This module rebuilds that table from scratch on every run.

use chrono::{Datelike, NaiveDate};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use crate::error::Result;

/// Lazy inclusive scan over calendar dates. Empty when `start > end`.
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DateRange {
    pub fn inclusive(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = if current < self.end {
            current.succ_opt()
        } else {
            None
        };
        Some(current)
    }
}

/// Parse a GTFS `YYYYMMDD` service date: exactly eight digits naming a valid
/// calendar date.
pub fn parse_service_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn format_service_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[derive(Debug, sqlx::FromRow)]
struct CalendarRule {
    service_id: String,
    monday: i64,
    tuesday: i64,
    wednesday: i64,
    thursday: i64,
    friday: i64,
    saturday: i64,
    sunday: i64,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl CalendarRule {
    /// Weekly flag for the date, Monday first to match the ISO weekday order.
    fn runs_on(&self, date: NaiveDate) -> bool {
        let flags = [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ];
        flags[date.weekday().num_days_from_monday() as usize] != 0
    }

    fn date_range(&self) -> Option<DateRange> {
        let start = parse_service_date(self.start_date.as_deref()?)?;
        let end = parse_service_date(self.end_date.as_deref()?)?;
        Some(DateRange::inclusive(start, end))
    }
}

/// Rebuild `service_days` from `calendar` and `calendar_dates`.
///
/// Exceptions are applied in two passes, additions before removals, so a
/// removal wins over both the weekly pattern and an addition for the same
/// key. Rules whose date range does not parse lose their weekly
/// contribution but their exceptions still apply.
pub async fn rebuild_service_days(tx: &mut Transaction<'_, Sqlite>) -> Result<u64> {
    sqlx::query("DELETE FROM service_days")
        .execute(&mut **tx)
        .await?;

    let rules: Vec<CalendarRule> = sqlx::query_as(
        r#"
        SELECT service_id, monday, tuesday, wednesday, thursday,
               friday, saturday, sunday, start_date, end_date
        FROM calendar
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    for rule in &rules {
        let Some(range) = rule.date_range() else {
            warn!(
                service_id = %rule.service_id,
                "skipping calendar rule with unparseable date range"
            );
            continue;
        };
        for date in range {
            if rule.runs_on(date) {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO service_days (service_id, service_date)
                    VALUES (?1, ?2)
                    "#,
                )
                .bind(&rule.service_id)
                .bind(format_service_date(date))
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    // Additions may land outside any weekly rule or its date range.
    let added = sqlx::query(
        r#"
        INSERT OR REPLACE INTO service_days (service_id, service_date)
        SELECT service_id, date FROM calendar_dates WHERE exception_type = 1
        "#,
    )
    .execute(&mut **tx)
    .await?
    .rows_affected();

    // Removals run last so they also cancel additions for the same key.
    let removed = sqlx::query(
        r#"
        DELETE FROM service_days
        WHERE EXISTS (
            SELECT 1 FROM calendar_dates cd
            WHERE cd.exception_type = 2
              AND cd.service_id = service_days.service_id
              AND cd.date = service_days.service_date
        )
        "#,
    )
    .execute(&mut **tx)
    .await?
    .rows_affected();

    debug!(added, removed, "applied calendar exceptions");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_days")
        .fetch_one(&mut **tx)
        .await?;
    Ok(count as u64)
}
