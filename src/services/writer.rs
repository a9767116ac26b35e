//! Bulk inserts for raw readings and aggregate metrics.
//!
//! Both inserts skip rows that collide with an existing primary key, so
//! re-ingesting a file the store has already seen changes nothing. The
//! caller runs them inside one transaction; there is no retry here, any
//! failure rolls the whole file back.

use crate::db::models::{NewAggregateMetric, NewSensorReading};
use crate::error::PipelineError;
use crate::schema;
use diesel::PgConnection;
use diesel::prelude::*;

/// Insert raw readings, skipping natural-key duplicates. Returns the number
/// of rows actually written.
pub fn insert_raw_readings(
    conn: &mut PgConnection,
    rows: &[NewSensorReading],
) -> Result<usize, PipelineError> {
    if rows.is_empty() {
        return Ok(0);
    }

    use schema::raw_sensor_data::dsl as R;

    diesel::insert_into(R::raw_sensor_data)
        .values(rows)
        .on_conflict((R::ts, R::device))
        .do_nothing()
        .execute(conn)
        .map_err(PipelineError::from)
}

/// Insert aggregate metrics, skipping (file, device, sensor type) duplicates.
pub fn insert_aggregates(
    conn: &mut PgConnection,
    rows: &[NewAggregateMetric],
) -> Result<usize, PipelineError> {
    if rows.is_empty() {
        return Ok(0);
    }

    use schema::aggregated_metrics::dsl as A;

    diesel::insert_into(A::aggregated_metrics)
        .values(rows)
        .on_conflict((A::file_id, A::device, A::sensor_type))
        .do_nothing()
        .execute(conn)
        .map_err(PipelineError::from)
}
