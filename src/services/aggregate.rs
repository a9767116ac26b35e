//! Per-device summary statistics over one file's clean rows.

use crate::db::models::{NewAggregateMetric, sensor_types};
use crate::models::reading::CleanReading;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

struct SeriesStats {
    min: f64,
    max: f64,
    mean: f64,
    /// Sample standard deviation; undefined for a single value.
    stddev: Option<f64>,
}

impl SeriesStats {
    fn compute(values: &[f64]) -> Option<SeriesStats> {
        let n = values.len();
        if n == 0 {
            return None;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum / n as f64;

        let stddev = if n >= 2 {
            let squared_deviations: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            Some((squared_deviations / (n - 1) as f64).sqrt())
        } else {
            None
        };

        Some(SeriesStats { min, max, mean, stddev })
    }
}

/// Compute min/max/mean/sample-stddev per device and sensor type. Pairs with
/// no contributing values emit nothing; `processed_at` is shared by every
/// metric of the file.
pub fn aggregate(
    rows: &[CleanReading],
    file_id: i64,
    processed_at: DateTime<Utc>,
) -> Vec<NewAggregateMetric> {
    let mut by_device: BTreeMap<&str, Vec<&CleanReading>> = BTreeMap::new();
    for row in rows {
        by_device.entry(row.device.as_str()).or_default().push(row);
    }

    let mut metrics = Vec::new();
    for (device, device_rows) in by_device {
        for sensor_type in sensor_types::ALL {
            let values: Vec<f64> = device_rows.iter().filter_map(|r| r.sensor_value(sensor_type)).collect();
            let Some(stats) = SeriesStats::compute(&values) else {
                continue;
            };
            metrics.push(NewAggregateMetric {
                file_id,
                device: device.to_string(),
                sensor_type: sensor_type.to_string(),
                min_value: stats.min,
                max_value: stats.max,
                avg_value: stats.mean,
                std_value: stats.stddev,
                processed_at,
            });
        }
    }
    metrics
}
