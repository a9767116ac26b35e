//! Wire-format models for sensor batch drop files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header columns every drop file must carry, in wire order.
pub const COLUMNS: [&str; 9] = [
    "ts", "device", "temp", "humidity", "co", "lpg", "smoke", "motion", "light",
];

/// One record as it appears in a drop file.
///
/// Every field keeps the original text (blank fields arrive as `None`) so
/// quarantined rows can be written back out verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub ts: Option<String>,
    pub device: Option<String>,
    pub temp: Option<String>,
    pub humidity: Option<String>,
    pub co: Option<String>,
    pub lpg: Option<String>,
    pub smoke: Option<String>,
    pub motion: Option<String>,
    pub light: Option<String>,
}

/// A present cell value, treating blanks and the literal `NaN` as null.
pub fn cell(field: &Option<String>) -> Option<&str> {
    match field.as_deref() {
        Some(s) if !s.is_empty() && s != "NaN" => Some(s),
        _ => None,
    }
}

/// A row that survived every validation stage, normalized for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReading {
    pub ts: DateTime<Utc>,
    pub device: String,
    pub temp: f64,
    pub humidity: Option<f64>,
    pub co: Option<f64>,
    pub lpg: Option<f64>,
    pub smoke: Option<f64>,
    pub motion: Option<bool>,
    pub light: Option<bool>,
}

impl CleanReading {
    /// Value of the named sensor series, if this reading carries one.
    pub fn sensor_value(&self, sensor_type: &str) -> Option<f64> {
        use crate::db::models::sensor_types as st;
        match sensor_type {
            st::TEMP => Some(self.temp),
            st::HUMIDITY => self.humidity,
            st::CO => self.co,
            st::LPG => self.lpg,
            st::SMOKE => self.smoke,
            _ => None,
        }
    }
}
