//! Stop-to-route-type index.
//!
//! For every stop, the set of transit mode codes that serve it, derived by
//! joining stop_times through trips to routes. Lets the lookup app filter
//! stops by mode without touching the big tables.

use sqlx::{Sqlite, Transaction};

use crate::error::Result;

/// Rebuild `stop_route_types` from scratch. Routes without a declared type
/// are excluded; duplicates collapse via DISTINCT rather than a key
/// conflict.
pub async fn rebuild_stop_route_types(tx: &mut Transaction<'_, Sqlite>) -> Result<u64> {
    sqlx::query("DELETE FROM stop_route_types")
        .execute(&mut **tx)
        .await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO stop_route_types (stop_id, route_type)
        SELECT DISTINCT st.stop_id, r.type
        FROM stop_times st
        JOIN trips t ON t.trip_id = st.trip_id
        JOIN routes r ON r.route_id = t.route_id
        WHERE r.type IS NOT NULL
        "#,
    )
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(inserted)
}
