//! Diesel model structs for the ingest store.
//!
//! `raw_sensor_data` and `aggregated_metrics` are append-only: rows are
//! inserted with conflict-skip semantics and never updated afterwards.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

// The fixed set of per-device series we derive summary statistics for.
pub mod sensor_types {
    pub const TEMP: &str = "temp";
    pub const HUMIDITY: &str = "humidity";
    pub const CO: &str = "co";
    pub const LPG: &str = "lpg";
    pub const SMOKE: &str = "smoke";

    pub const ALL: [&str; 5] = [TEMP, HUMIDITY, CO, LPG, SMOKE];
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::files)]
pub struct FileRecord {
    pub id: i64,
    pub file_name: String,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::files)]
pub struct NewFileRecord {
    pub file_name: String,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::raw_sensor_data)]
pub struct NewSensorReading {
    pub ts: DateTime<Utc>,
    pub device: String,
    pub temp: f64,
    pub humidity: Option<f64>,
    pub co: Option<f64>,
    pub lpg: Option<f64>,
    pub smoke: Option<f64>,
    pub motion: Option<bool>,
    pub light: Option<bool>,
    pub file_name: String,
    pub file_id: i64,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::aggregated_metrics)]
pub struct NewAggregateMetric {
    pub file_id: i64,
    pub device: String,
    pub sensor_type: String,
    pub min_value: f64,
    pub max_value: f64,
    pub avg_value: f64,
    pub std_value: Option<f64>,
    pub processed_at: DateTime<Utc>,
}
